//! Battle adjudication for the creature arena.
//!
//! This crate holds the authoritative rules: combat formulas, the combatant
//! and party model, and the session state machine that turns intents into
//! resolved turns. It does no I/O; the server drives it and persists what it
//! reports.
//!
//! # Overview
//!
//! `arena-battle` sits between `arena-protocol` (wire format) and the server:
//!
//! ```text
//! arena-protocol (wire format)
//!        │
//!        ▼
//! arena-battle (rules + sessions) ← THIS CRATE
//!        │
//!        └─> arena-server (transport, matchmaking, persistence)
//! ```
//!
//! # Main Types
//!
//! ## Domain Types
//! - [`Combatant`] - One creature's battle stats
//! - [`Move`], [`MoveEffect`] - Move slots and zero-power effects
//! - [`Status`] - Burn and paralysis
//! - [`PartyRoster`] - A side's ordered party with one active member
//!
//! ## Sessions
//! - [`BattleSession`] - One battle from creation to its outcome
//! - [`BattleOutcome`] - The terminal record handed to the reporter
//!
//! # Example Usage
//!
//! ```ignore
//! use arena_battle::{BattleSession, Combatant, Move, PartyRoster, SeatState};
//! use arena_protocol::{BattleMode, Intent, Seat};
//!
//! let hero = Combatant::new("charmander", 39, 7).with_moves(vec![Move::new("scratch", 40, 100, 35)]);
//! let wild = Combatant::new("pidgey", 40, 3);
//!
//! let mut battle = BattleSession::new(
//!     uuid::Uuid::new_v4(),
//!     BattleMode::Wild,
//!     SeatState::human("ash", "Ash", PartyRoster::single(hero)?),
//!     SeatState::wild(wild)?,
//!     seed,
//! )?;
//! battle.start();
//!
//! let outcome = battle.submit(Seat::A, Intent::Move { slot: 0 })?;
//! ```

pub mod error;
pub mod math;
pub mod outcome;
pub mod session;
pub mod types;

pub use error::{IntentError, SetupError};
pub use outcome::BattleOutcome;
pub use session::{
    BattleSession, SeatOwner, SeatState, SessionState, SubmitOutcome, SwitchReport, TurnReport,
};
pub use types::{
    Combatant, DEFAULT_SPEED, HpCheckpoint, MAX_LEVEL, MAX_PARTY_SIZE, Move, MoveEffect, PartyRoster,
    Status,
};

// Re-export protocol types used in the public API
pub use arena_protocol::{BallKind, BattleMode, EndReason, Intent, Seat};
