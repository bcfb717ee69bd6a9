//! Battle session state machine and turn resolution

mod battle;
mod policy;
mod resolve;


pub use battle::{
    BattleSession, SeatOwner, SeatState, SessionState, SubmitOutcome, SwitchReport, TurnReport,
};
pub use policy::{acting_order, scripted_intent};
