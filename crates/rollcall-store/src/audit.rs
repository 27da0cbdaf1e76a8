//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use rollcall_util::{AttemptId, SessionId};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Configuration loaded
    ConfigLoaded { radius_meters: f64 },

    /// Check-in accepted by the backend
    CheckInSubmitted {
        attempt_id: AttemptId,
        session_id: SessionId,
        distance_meters: Option<f64>,
    },

    /// Check-in refused, locally or by the backend
    CheckInDenied {
        attempt_id: AttemptId,
        session_id: SessionId,
        reason: String,
    },

    /// Checked-session history cleared by the user
    HistoryCleared { removed: usize },

    /// Attendance opened or closed for a session (teacher action)
    AttendanceToggled { session_id: SessionId, open: bool },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: rollcall_util::now(),
            event,
        }
    }
}
