//! PvP challenge handshake

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

#[derive(Debug, Clone)]
pub struct Challenge {
    pub id: Uuid,
    pub from_identity: String,
    pub from_display_name: String,
    pub to_identity: String,
    pub created_at: Instant,
    pub status: ChallengeStatus,
    /// Expired, but the challenger has not been told yet
    unannounced: bool,
}

/// Pending and recently resolved challenges.
///
/// Every transition out of `Pending` happens under one lock, so a challenge
/// is accepted, declined or expired exactly once.
pub struct Matchmaking {
    timeout: Duration,
    challenges: Mutex<HashMap<Uuid, Challenge>>,
}

impl Matchmaking {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            challenges: Mutex::new(HashMap::new()),
        }
    }

    fn is_overdue(&self, challenge: &Challenge, now: Instant) -> bool {
        now.saturating_duration_since(challenge.created_at) >= self.timeout
    }

    /// Create a challenge from one identity to another
    pub fn issue(
        &self,
        from_identity: &str,
        from_display_name: &str,
        to_identity: &str,
    ) -> Result<Challenge, EngineError> {
        if from_identity == to_identity {
            return Err(EngineError::SelfChallenge);
        }

        let now = Instant::now();
        let mut challenges = self.challenges.lock().map_err(|_| EngineError::Closed)?;
        let duplicate = challenges.values().any(|c| {
            c.status == ChallengeStatus::Pending
                && !self.is_overdue(c, now)
                && c.from_identity == from_identity
                && c.to_identity == to_identity
        });
        if duplicate {
            return Err(EngineError::AlreadyChallenging(to_identity.to_string()));
        }

        let challenge = Challenge {
            id: Uuid::new_v4(),
            from_identity: from_identity.to_string(),
            from_display_name: from_display_name.to_string(),
            to_identity: to_identity.to_string(),
            created_at: now,
            status: ChallengeStatus::Pending,
            unannounced: false,
        };
        challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    /// Resolve a pending challenge on behalf of its addressee.
    ///
    /// A challenge past its timeout is expired here even if no sweep has
    /// run yet; the next sweep tells the challenger.
    pub fn respond(
        &self,
        challenge_id: Uuid,
        responder: &str,
        accept: bool,
    ) -> Result<Challenge, EngineError> {
        let now = Instant::now();
        let mut challenges = self.challenges.lock().map_err(|_| EngineError::Closed)?;
        let challenge = challenges
            .get_mut(&challenge_id)
            .filter(|c| c.status == ChallengeStatus::Pending)
            .ok_or(EngineError::ChallengeNotFound(challenge_id))?;

        if challenge.to_identity != responder {
            return Err(EngineError::NotAddressee);
        }

        if self.is_overdue(challenge, now) {
            challenge.status = ChallengeStatus::Expired;
            challenge.unannounced = true;
            return Err(EngineError::ChallengeNotFound(challenge_id));
        }

        challenge.status = if accept {
            ChallengeStatus::Accepted
        } else {
            ChallengeStatus::Declined
        };
        Ok(challenge.clone())
    }

    /// Turn an accepted challenge into a declined one (the battle could not start)
    pub fn revoke(&self, challenge_id: Uuid) {
        if let Ok(mut challenges) = self.challenges.lock()
            && let Some(challenge) = challenges.get_mut(&challenge_id)
        {
            challenge.status = ChallengeStatus::Declined;
        }
    }

    pub fn status(&self, challenge_id: Uuid) -> Option<ChallengeStatus> {
        self.challenges
            .lock()
            .ok()?
            .get(&challenge_id)
            .map(|c| c.status)
    }

    /// Expire pending challenges past the timeout and forget resolved ones.
    ///
    /// Returns the challenges that just expired.
    pub fn sweep(&self, now: Instant) -> Vec<Challenge> {
        let Ok(mut challenges) = self.challenges.lock() else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        challenges.retain(|_, challenge| {
            let newly_expired =
                challenge.status == ChallengeStatus::Pending && self.is_overdue(challenge, now);
            if newly_expired || challenge.unannounced {
                challenge.status = ChallengeStatus::Expired;
                challenge.unannounced = false;
                expired.push(challenge.clone());
                return true;
            }
            // Resolved entries are kept for one more timeout window
            !(challenge.status != ChallengeStatus::Pending
                && now.saturating_duration_since(challenge.created_at) >= self.timeout * 2)
        });
        expired
    }
}
