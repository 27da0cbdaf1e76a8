//! Mock adapters for testing

use async_trait::async_trait;
use rollcall_api::{CheckInSubmission, SubmissionReceipt};
use rollcall_util::{GeoPoint, SessionId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    AttendanceBackend, BackendError, BackendResult, LocationError, LocationProvider,
    LocationRequest, LocationResult,
};

/// Mock location source that counts how often it is asked
pub struct MockLocation {
    position: Mutex<LocationResult<GeoPoint>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<LocationRequest>>,

    /// Delay before answering (simulates a slow GPS fix)
    pub delay: Arc<Mutex<Option<Duration>>>,
}

impl MockLocation {
    pub fn new(position: GeoPoint) -> Self {
        Self::with_result(Ok(position))
    }

    pub fn failing(error: LocationError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: LocationResult<GeoPoint>) -> Self {
        Self {
            position: Mutex::new(result),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Change the reported position
    pub fn set_position(&self, position: GeoPoint) {
        *self.position.lock().unwrap() = Ok(position);
    }

    /// Set answer delay
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Number of position requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LocationRequest> {
        *self.last_request.lock().unwrap()
    }
}

#[async_trait]
impl LocationProvider for MockLocation {
    async fn current_position(&self, request: LocationRequest) -> LocationResult<GeoPoint> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.position.lock().unwrap().clone()
    }
}

/// Mock attendance backend that records what it receives
#[derive(Default)]
pub struct MockBackend {
    submissions: Mutex<Vec<CheckInSubmission>>,
    toggles: Mutex<Vec<(SessionId, bool)>>,

    /// When set, submissions are rejected with this message
    pub reject_with: Arc<Mutex<Option<String>>>,

    /// When true, every call fails at the transport level
    pub offline: Arc<Mutex<bool>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject subsequent submissions with the given message (None to accept again)
    pub fn set_reject(&self, message: Option<&str>) {
        *self.reject_with.lock().unwrap() = message.map(str::to_string);
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Submissions accepted so far
    pub fn submissions(&self) -> Vec<CheckInSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn toggles(&self) -> Vec<(SessionId, bool)> {
        self.toggles.lock().unwrap().clone()
    }

    fn check_online(&self) -> BackendResult<()> {
        if *self.offline.lock().unwrap() {
            return Err(BackendError::Transport("Mock backend offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttendanceBackend for MockBackend {
    async fn submit_check_in(&self, submission: &CheckInSubmission) -> BackendResult<SubmissionReceipt> {
        self.check_online()?;

        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(BackendError::Rejected {
                status: 422,
                message: Some(message),
            });
        }

        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(submission.clone());

        Ok(SubmissionReceipt {
            record_id: Some(format!("mock-{}", submissions.len())),
            message: Some("Check-in recorded".into()),
        })
    }

    async fn set_attendance_open(&self, session_id: &SessionId, open: bool) -> BackendResult<()> {
        self.check_online()?;
        self.toggles.lock().unwrap().push((session_id.clone(), open));
        Ok(())
    }
}
