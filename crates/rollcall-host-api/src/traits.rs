//! Adapter traits

use async_trait::async_trait;
use rollcall_api::{CheckInSubmission, SubmissionReceipt};
use rollcall_util::{GeoPoint, SessionId};
use std::time::Duration;
use thiserror::Error;

/// Errors from the device location source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Location is not supported on this device")]
    Unsupported,

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Timed out waiting for a location fix after {0:?}")]
    Timeout(Duration),
}

pub type LocationResult<T> = Result<T, LocationError>;

/// Errors from the attendance backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status
    #[error("Backend rejected request ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected { status: u16, message: Option<String> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Human-readable message to show alongside a failed submission
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Transport(e) | Self::InvalidUrl(e) => Some(e.clone()),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Parameters for a location request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Ask the device for its most precise fix
    pub high_accuracy: bool,
    /// Upper bound on how long the caller will wait
    pub timeout: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Source of the device's current position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Obtain one position fix.
    ///
    /// Implementations should honor `request.timeout`; callers enforce it
    /// independently as well.
    async fn current_position(&self, request: LocationRequest) -> LocationResult<GeoPoint>;
}

/// The attendance REST backend
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// Submit a check-in record
    async fn submit_check_in(&self, submission: &CheckInSubmission) -> BackendResult<SubmissionReceipt>;

    /// Open or close attendance for a session (teacher role)
    async fn set_attendance_open(&self, session_id: &SessionId, open: bool) -> BackendResult<()>;
}
