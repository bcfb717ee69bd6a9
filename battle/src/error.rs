//! Errors raised by battle setup and intent handling

use arena_protocol::BattleMode;
use thiserror::Error;

/// An intent was refused. The session is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// Unknown move or roster slot, fainted switch target, or an action the
    /// battle mode does not allow
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Not your turn: {0}")]
    NotYourTurn(String),

    #[error("Battle has already ended")]
    SessionEnded,
}

impl IntentError {
    /// Whether the client may correct and resend
    pub fn retryable(&self) -> bool {
        !matches!(self, IntentError::SessionEnded)
    }
}

/// A battle could not be set up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("Party is empty")]
    EmptyParty,

    #[error("Party has {0} members, at most 6 allowed")]
    PartyTooLarge(usize),

    #[error("Party has no combatant able to battle")]
    NoUsableCombatant,

    #[error("Seats do not fit a {0} battle: {1}")]
    ModeMismatch(BattleMode, String),
}
