//! Acting order and the scripted opponent

use arena_protocol::{BattleMode, Intent, Seat};
use rand::Rng;
use rand::seq::SliceRandom;

use super::battle::SeatState;
use crate::types::Combatant;

/// Decide which seat acts first this turn.
///
/// In trainer and wild battles the player (seat A) holds the initiative.
/// In PvP the order is computed here rather than trusted from a client:
/// switches, captures and flees go before moves, then higher effective
/// speed, and a tie goes to seat A (the seat registered first).
pub fn acting_order(
    mode: BattleMode,
    intents: &[Option<Intent>; 2],
    seats: &[SeatState; 2],
) -> [Seat; 2] {
    if mode != BattleMode::Pvp {
        return [Seat::A, Seat::B];
    }

    let key = |seat: Seat| {
        let priority = match intents[seat.index()] {
            Some(Intent::Move { .. }) | None => 0,
            Some(_) => 1,
        };
        (priority, seats[seat.index()].active().effective_speed())
    };

    if key(Seat::B) > key(Seat::A) {
        [Seat::B, Seat::A]
    } else {
        [Seat::A, Seat::B]
    }
}

/// Pick the scripted side's action: a random move that still has PP.
///
/// Falls back to slot 0, which resolves as Struggle once PP runs out.
pub fn scripted_intent<R: Rng + ?Sized>(active: &Combatant, rng: &mut R) -> Intent {
    let usable = active.usable_move_slots();
    let slot = usable.choose(rng).copied().unwrap_or(0);
    Intent::Move { slot }
}
