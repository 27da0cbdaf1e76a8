//! In-memory store, for embedding and tests

use rollcall_util::SessionId;
use std::sync::{Mutex, MutexGuard};

use crate::{AuditEvent, Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    checked: Vec<SessionId>,
    audit: Vec<AuditEvent>,
}

/// Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Store for MemoryStore {
    fn is_checked(&self, session_id: &SessionId) -> StoreResult<bool> {
        Ok(self.state()?.checked.contains(session_id))
    }

    fn mark_checked(&self, session_id: &SessionId) -> StoreResult<()> {
        let mut state = self.state()?;
        if !state.checked.contains(session_id) {
            state.checked.push(session_id.clone());
        }
        Ok(())
    }

    fn checked_sessions(&self) -> StoreResult<Vec<SessionId>> {
        Ok(self.state()?.checked.clone())
    }

    fn clear_checked(&self) -> StoreResult<usize> {
        let mut state = self.state()?;
        let removed = state.checked.len();
        state.checked.clear();
        Ok(removed)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let mut state = self.state()?;
        event.id = state.audit.len() as i64 + 1;
        state.audit.push(event);
        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        Ok(self.state()?.audit.iter().rev().take(limit).cloned().collect())
    }

    fn is_healthy(&self) -> bool {
        self.state.lock().is_ok()
    }
}
