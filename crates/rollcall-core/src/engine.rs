//! Check-in engine

use chrono::{DateTime, Local, Utc};
use rollcall_api::{
    CheckInDecision, CheckInSubmission, ReasonCode, SessionRecord, SessionView, SubmissionReceipt,
};
use rollcall_config::Policy;
use rollcall_host_api::{AttendanceBackend, BackendResult, LocationProvider, LocationRequest};
use rollcall_store::{AuditEvent, AuditEventType, Store, StoreResult};
use rollcall_util::{AttemptId, GeoPoint, SessionId, StudentId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{CoreEvent, check_availability, evaluate_check_in, needs_location};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one check-in attempt
#[derive(Debug, Clone)]
pub enum CheckInOutcome {
    /// Submitted, accepted and recorded locally
    CheckedIn {
        attempt_id: AttemptId,
        receipt: SubmissionReceipt,
        distance_meters: Option<f64>,
    },
    Denied {
        attempt_id: AttemptId,
        reason: ReasonCode,
    },
}

impl CheckInOutcome {
    pub fn is_checked_in(&self) -> bool {
        matches!(self, Self::CheckedIn { .. })
    }

    pub fn reason(&self) -> Option<&ReasonCode> {
        match self {
            Self::CheckedIn { .. } => None,
            Self::Denied { reason, .. } => Some(reason),
        }
    }

    pub fn attempt_id(&self) -> &AttemptId {
        match self {
            Self::CheckedIn { attempt_id, .. } | Self::Denied { attempt_id, .. } => attempt_id,
        }
    }
}

/// Coordinates a check-in: duplicate check, availability, location,
/// geofence, submission, and recording on success
pub struct CheckInEngine {
    policy: Policy,
    store: Arc<dyn Store>,
    location: Arc<dyn LocationProvider>,
    backend: Arc<dyn AttendanceBackend>,
    events: broadcast::Sender<CoreEvent>,
}

impl CheckInEngine {
    pub fn new(
        policy: Policy,
        store: Arc<dyn Store>,
        location: Arc<dyn LocationProvider>,
        backend: Arc<dyn AttendanceBackend>,
    ) -> Self {
        info!(
            radius_meters = policy.geofence.radius_meters,
            location_timeout = ?policy.location.timeout,
            "Check-in engine initialized"
        );

        let _ = store.append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
            radius_meters: policy.geofence.radius_meters,
        }));

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            policy,
            store,
            location,
            backend,
            events,
        }
    }

    /// Receive engine events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Attempt a check-in for `student_id` at `now`.
    ///
    /// The device location is requested only after the session has passed
    /// the open and schedule checks, and only if it declares a target.
    pub async fn request_check_in(
        &self,
        session: &SessionRecord,
        student_id: &StudentId,
        now: DateTime<Local>,
    ) -> CheckInOutcome {
        let attempt_id = AttemptId::new();
        debug!(attempt_id = %attempt_id, session_id = %session.id, "Check-in requested");

        if self.is_checked(&session.id) {
            return self.deny(attempt_id, &session.id, ReasonCode::AlreadyCheckedIn);
        }

        if let Err(reason) = check_availability(session, &now) {
            return self.deny(attempt_id, &session.id, reason);
        }

        let device_location = if needs_location(session) {
            self.fetch_location(&session.id).await
        } else {
            None
        };

        let distance_meters =
            match evaluate_check_in(session, device_location, &now, &self.policy.geofence) {
                CheckInDecision::Eligible { distance_meters } => distance_meters,
                CheckInDecision::Denied(reason) => {
                    return self.deny(attempt_id, &session.id, reason);
                }
            };

        let submission = CheckInSubmission {
            session_id: session.id.clone(),
            student_id: student_id.clone(),
            timestamp: now.with_timezone(&Utc),
            status: self.policy.submission.status,
        };

        let receipt = match self.backend.submit_check_in(&submission).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(attempt_id = %attempt_id, session_id = %session.id, error = %e, "Check-in submission failed");
                let reason = ReasonCode::SubmissionFailed {
                    message: e.user_message(),
                };
                return self.deny(attempt_id, &session.id, reason);
            }
        };

        // The backend already has the record; a local write failure only
        // loses duplicate prevention for this session
        if let Err(e) = self.store.mark_checked(&session.id) {
            warn!(session_id = %session.id, error = %e, "Failed to record checked session");
        }

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::CheckInSubmitted {
            attempt_id: attempt_id.clone(),
            session_id: session.id.clone(),
            distance_meters,
        }));

        info!(
            attempt_id = %attempt_id,
            session_id = %session.id,
            distance_meters = ?distance_meters,
            "Check-in recorded"
        );

        let _ = self.events.send(CoreEvent::CheckedIn {
            attempt_id: attempt_id.clone(),
            session_id: session.id.clone(),
            distance_meters,
            receipt: receipt.clone(),
        });

        CheckInOutcome::CheckedIn {
            attempt_id,
            receipt,
            distance_meters,
        }
    }

    /// Per-session view for listing
    pub fn list_sessions(&self, sessions: &[SessionRecord], now: DateTime<Local>) -> Vec<SessionView> {
        sessions
            .iter()
            .map(|session| self.view_session(session, &now))
            .collect()
    }

    fn view_session(&self, session: &SessionRecord, now: &DateTime<Local>) -> SessionView {
        let in_progress = session.schedule.contains(now);
        let already_checked = self.is_checked(&session.id);

        SessionView {
            session_id: session.id.clone(),
            title: session.title.clone(),
            course_code: session.course_code.clone(),
            open: session.is_attendance_open,
            in_progress,
            already_checked,
            can_check_in: session.is_attendance_open && in_progress && !already_checked,
            closes_in: if in_progress {
                session.schedule.remaining(now)
            } else {
                None
            },
        }
    }

    /// Sessions checked into from this device, oldest first
    pub fn checked_sessions(&self) -> StoreResult<Vec<SessionId>> {
        self.store.checked_sessions()
    }

    /// Forget every checked session
    pub fn clear_history(&self) -> StoreResult<usize> {
        let removed = self.store.clear_checked()?;

        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::HistoryCleared { removed }));

        info!(removed, "Checked-session history cleared");
        let _ = self.events.send(CoreEvent::HistoryCleared { removed });

        Ok(removed)
    }

    /// Open or close attendance for a session on the backend
    pub async fn toggle_attendance(&self, session_id: &SessionId, open: bool) -> BackendResult<()> {
        self.backend.set_attendance_open(session_id, open).await?;

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::AttendanceToggled {
            session_id: session_id.clone(),
            open,
        }));

        info!(session_id = %session_id, open, "Attendance toggled");
        let _ = self.events.send(CoreEvent::AttendanceToggled {
            session_id: session_id.clone(),
            open,
        });

        Ok(())
    }

    fn is_checked(&self, session_id: &SessionId) -> bool {
        match self.store.is_checked(session_id) {
            Ok(checked) => checked,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Failed to read checked sessions");
                false
            }
        }
    }

    /// One position fix, bounded by the configured timeout. Any failure is
    /// reported as `None`.
    async fn fetch_location(&self, session_id: &SessionId) -> Option<GeoPoint> {
        let request = LocationRequest {
            high_accuracy: self.policy.location.high_accuracy,
            timeout: self.policy.location.timeout,
        };

        let error = match tokio::time::timeout(request.timeout, self.location.current_position(request)).await {
            Ok(Ok(point)) => {
                debug!(
                    session_id = %session_id,
                    latitude = point.latitude,
                    longitude = point.longitude,
                    "Device location obtained"
                );
                return Some(point);
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no fix within {:?}", request.timeout),
        };

        warn!(session_id = %session_id, error = %error, "Device location unavailable");
        let _ = self.events.send(CoreEvent::LocationFailed {
            session_id: session_id.clone(),
            error,
        });

        None
    }

    fn deny(&self, attempt_id: AttemptId, session_id: &SessionId, reason: ReasonCode) -> CheckInOutcome {
        info!(attempt_id = %attempt_id, session_id = %session_id, reason = reason.code(), "Check-in denied");

        let _ = self.store.append_audit(AuditEvent::new(AuditEventType::CheckInDenied {
            attempt_id: attempt_id.clone(),
            session_id: session_id.clone(),
            reason: reason.code().to_string(),
        }));

        let _ = self.events.send(CoreEvent::CheckInDenied {
            attempt_id: attempt_id.clone(),
            session_id: session_id.clone(),
            reason: reason.clone(),
        });

        CheckInOutcome::Denied { attempt_id, reason }
    }
}
