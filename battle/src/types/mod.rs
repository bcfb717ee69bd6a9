//! Domain types for battle participants

mod combatant;
mod moves;
mod roster;
mod status;

pub use combatant::{Combatant, DEFAULT_SPEED, MAX_LEVEL};
pub use moves::{MIN_STAGE, Move, MoveEffect, STRUGGLE_POWER};
pub use roster::{HpCheckpoint, MAX_PARTY_SIZE, PartyRoster};
pub use status::Status;
