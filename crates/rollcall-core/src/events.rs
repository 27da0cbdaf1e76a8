//! Core events emitted by the engine

use rollcall_api::{ReasonCode, SubmissionReceipt};
use rollcall_util::{AttemptId, SessionId};

/// Events emitted by the check-in engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// The backend accepted a check-in and the session is now marked
    CheckedIn {
        attempt_id: AttemptId,
        session_id: SessionId,
        distance_meters: Option<f64>,
        receipt: SubmissionReceipt,
    },

    /// A check-in attempt was refused
    CheckInDenied {
        attempt_id: AttemptId,
        session_id: SessionId,
        reason: ReasonCode,
    },

    /// The device could not produce a position in time
    LocationFailed {
        session_id: SessionId,
        error: String,
    },

    /// Checked-session history was cleared
    HistoryCleared {
        removed: usize,
    },

    /// Attendance opened or closed for a session
    AttendanceToggled {
        session_id: SessionId,
        open: bool,
    },
}
