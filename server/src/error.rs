//! Engine errors surfaced to clients as `battle.error`

use arena_battle::{IntentError, SetupError};
use arena_protocol::ServerEvent;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Not your turn: {0}")]
    NotYourTurn(String),

    #[error("Only the challenged player can respond to this challenge")]
    NotAddressee,

    #[error("{0} is already in a battle")]
    AlreadyInBattle(String),

    #[error("A challenge to {0} is already pending")]
    AlreadyChallenging(String),

    #[error("You cannot challenge yourself")]
    SelfChallenge,

    #[error("{0} is not online")]
    PlayerOffline(String),

    #[error("Battle {0} not found, resync required")]
    SessionNotFound(Uuid),

    #[error("Challenge {0} not found")]
    ChallengeNotFound(Uuid),

    #[error("Link is not authenticated")]
    NotAuthenticated,

    #[error("Link is already authenticated")]
    AlreadyAuthenticated,

    #[error("{0} has no creature able to battle")]
    NoUsableCombatant(String),

    #[error("No {0} left")]
    InsufficientItem(String),

    #[error("Battle could not be set up: {0}")]
    InvalidSetup(String),

    #[error("Store request failed: {0}")]
    Store(String),

    #[error("Server is shutting down")]
    Closed,
}

impl EngineError {
    /// Whether the client may correct the request and send it again
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidIntent(_)
                | EngineError::NotYourTurn(_)
                | EngineError::InsufficientItem(_)
                | EngineError::Store(_)
        )
    }

    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.to_string(), self.retryable())
    }

    /// Map a battle rejection for the given session
    pub fn from_intent(session_id: Uuid, err: IntentError) -> Self {
        match err {
            IntentError::InvalidIntent(msg) => EngineError::InvalidIntent(msg),
            IntentError::NotYourTurn(msg) => EngineError::NotYourTurn(msg),
            IntentError::SessionEnded => EngineError::SessionNotFound(session_id),
        }
    }

    /// Map a setup failure for the identity whose party was rejected
    pub fn from_setup(identity: &str, err: SetupError) -> Self {
        match err {
            SetupError::EmptyParty | SetupError::NoUsableCombatant => {
                EngineError::NoUsableCombatant(identity.to_string())
            }
            other => EngineError::InvalidSetup(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Store(format!("{:#}", err))
    }
}
