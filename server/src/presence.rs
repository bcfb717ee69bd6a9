//! Connected links and disconnect grace timers

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use arena_protocol::ServerEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Id of one transport link
pub type LinkId = u64;

pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

struct Link {
    identity: String,
    display_name: String,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

/// A seat whose link dropped and may still come back
struct Grace {
    session_id: Uuid,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct PresenceState {
    links: HashMap<LinkId, Link>,
    by_identity: HashMap<String, LinkId>,
    grace: HashMap<String, Grace>,
}

/// Tracks which link carries each identity.
///
/// At most one link per identity; a newer link replaces the older one, whose
/// event channel then closes.
pub struct Presence {
    next_id: AtomicU64,
    state: Mutex<PresenceState>,
}

impl Presence {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(PresenceState::default()),
        }
    }

    /// Bind a new link to an identity, replacing any previous link
    pub fn attach(&self, identity: &str, display_name: &str) -> (LinkId, EventReceiver) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(mut state) = self.state.lock() {
            if let Some(old) = state.by_identity.insert(identity.to_string(), id) {
                state.links.remove(&old);
            }
            state.links.insert(
                id,
                Link {
                    identity: identity.to_string(),
                    display_name: display_name.to_string(),
                    tx,
                },
            );
        }

        (id, rx)
    }

    /// Drop a link. Returns its identity if it was the identity's current link.
    pub fn detach(&self, link: LinkId) -> Option<String> {
        let mut state = self.state.lock().ok()?;
        let removed = state.links.remove(&link)?;

        if state.by_identity.get(&removed.identity) == Some(&link) {
            state.by_identity.remove(&removed.identity);
            Some(removed.identity)
        } else {
            None
        }
    }

    /// Identity and display name bound to a link
    pub fn identity_of(&self, link: LinkId) -> Option<(String, String)> {
        let state = self.state.lock().ok()?;
        state
            .links
            .get(&link)
            .map(|l| (l.identity.clone(), l.display_name.clone()))
    }

    pub fn is_online(&self, identity: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.by_identity.contains_key(identity))
            .unwrap_or(false)
    }

    pub fn display_name(&self, identity: &str) -> Option<String> {
        let state = self.state.lock().ok()?;
        let link = state.by_identity.get(identity)?;
        state.links.get(link).map(|l| l.display_name.clone())
    }

    /// Push an event to an identity's current link. False if it is offline.
    pub fn send_to(&self, identity: &str, event: ServerEvent) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        state
            .by_identity
            .get(identity)
            .and_then(|link| state.links.get(link))
            .is_some_and(|l| l.tx.send(event).is_ok())
    }

    pub fn send_to_link(&self, link: LinkId, event: ServerEvent) -> bool {
        let Ok(state) = self.state.lock() else {
            return false;
        };
        state
            .links
            .get(&link)
            .is_some_and(|l| l.tx.send(event).is_ok())
    }

    /// Register a running grace timer for a disconnected identity
    pub fn start_grace(&self, identity: &str, session_id: Uuid, timer: JoinHandle<()>) {
        if let Ok(mut state) = self.state.lock()
            && let Some(previous) = state
                .grace
                .insert(identity.to_string(), Grace { session_id, timer })
        {
            previous.timer.abort();
        }
    }

    /// Stop a pending grace timer. Returns the session it was guarding.
    pub fn cancel_grace(&self, identity: &str) -> Option<Uuid> {
        let grace = self.state.lock().ok()?.grace.remove(identity)?;
        grace.timer.abort();
        Some(grace.session_id)
    }

    /// Claim an expired grace period.
    ///
    /// Only one of expiry and reconnect can claim the entry, so a seat that
    /// came back in time is never forfeited.
    pub fn claim_expired_grace(&self, identity: &str) -> Option<Uuid> {
        let grace = self.state.lock().ok()?.grace.remove(identity)?;
        Some(grace.session_id)
    }

    /// Abort every grace timer and drop every link
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            for (_, grace) in state.grace.drain() {
                grace.timer.abort();
            }
            state.links.clear();
            state.by_identity.clear();
        }
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}
