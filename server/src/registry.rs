//! Active session directory

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::EngineError;
use crate::session::SessionHandle;

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<Uuid, SessionHandle>,
    by_identity: HashMap<String, Uuid>,
}

/// Live sessions and the identities bound to them.
///
/// An identity is bound to at most one live session; `reserve` checks and
/// binds all participants under one lock.
#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and bind its participants
    pub fn reserve(&self, handle: SessionHandle) -> Result<(), EngineError> {
        let mut state = self.state.lock().map_err(|_| EngineError::Closed)?;

        if let Some(busy) = handle
            .participants()
            .find(|identity| state.by_identity.contains_key(*identity))
        {
            return Err(EngineError::AlreadyInBattle(busy.to_string()));
        }

        for identity in handle.participants() {
            state.by_identity.insert(identity.to_string(), handle.id);
        }
        state.sessions.insert(handle.id, handle);
        Ok(())
    }

    pub fn get(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.state.lock().ok()?.sessions.get(&session_id).cloned()
    }

    /// Live session an identity is bound to
    pub fn session_of(&self, identity: &str) -> Option<SessionHandle> {
        let state = self.state.lock().ok()?;
        let id = state.by_identity.get(identity)?;
        state.sessions.get(id).cloned()
    }

    pub fn is_engaged(&self, identity: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.by_identity.contains_key(identity))
            .unwrap_or(false)
    }

    /// Remove an ended session and free its participants
    pub fn release(&self, session_id: Uuid) {
        if let Ok(mut state) = self.state.lock()
            && let Some(handle) = state.sessions.remove(&session_id)
        {
            for identity in handle.participants() {
                if state.by_identity.get(identity) == Some(&session_id) {
                    state.by_identity.remove(identity);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every handle; session actors stop once their inbox closes
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.sessions.clear();
            state.by_identity.clear();
        }
    }
}
