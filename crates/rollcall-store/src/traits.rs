//! Store trait definitions

use rollcall_util::SessionId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Checked-session history

    /// Whether a check-in for this session already succeeded
    fn is_checked(&self, session_id: &SessionId) -> StoreResult<bool>;

    /// Record a successful check-in. Marking twice is a no-op.
    fn mark_checked(&self, session_id: &SessionId) -> StoreResult<()>;

    /// All checked sessions, oldest first
    fn checked_sessions(&self) -> StoreResult<Vec<SessionId>>;

    /// Forget every checked session; returns how many were removed
    fn clear_checked(&self) -> StoreResult<usize>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
