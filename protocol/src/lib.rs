use thiserror::Error;

pub mod client;
pub mod server;
mod types;

pub use client::{ClientCommand, parse_client_frame};
pub use server::{
    CombatantView, MoveView, PartialCombatantView, ServerEvent, parse_server_frame,
};
pub use types::{BallKind, BattleMode, EndReason, Intent, IntentKind, IntentPayload, Seat};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Empty message")]
    EmptyMessage,
}
