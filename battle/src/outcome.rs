//! Terminal outcome of a battle session

use arena_protocol::{BattleMode, EndReason};
use uuid::Uuid;

use crate::types::Combatant;

/// The single record emitted when a session ends.
///
/// This is everything the persistence and leveling service needs; XP and
/// currency are computed there, not here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BattleOutcome {
    pub session_id: Uuid,
    pub mode: BattleMode,

    /// Winning human identity; None for draws, flees, and PvE losses
    pub winner_identity: Option<String>,

    /// Every human identity that took part
    pub participants: Vec<String>,

    pub end_reason: EndReason,
    pub turn_number: u32,
    pub captured: bool,

    /// The wild creature, as caught, when `captured` is set
    #[cfg_attr(feature = "serde", serde(default))]
    pub captured_combatant: Option<Combatant>,
}

impl BattleOutcome {
    /// Whether the given identity lost (took part and did not win)
    pub fn is_loss_for(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p == identity)
            && self.winner_identity.as_deref() != Some(identity)
            && !matches!(self.end_reason, EndReason::Flee)
    }
}
