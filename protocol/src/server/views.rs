//! Combatant snapshots carried by battle events

use serde::{Deserialize, Serialize};

/// One move slot as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveView {
    pub id: String,
    pub power: u32,
    pub accuracy: u32,
    pub pp_remaining: u32,
}

/// Full view of an active combatant, sent with `battle.start`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantView {
    pub creature_kind: String,
    pub level: u32,
    pub current_hp: u32,
    pub max_hp: u32,
    /// Protocol status code ("brn", "par"), absent when healthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub moves: Vec<MoveView>,
}

/// Per-turn view of an active combatant, sent with `battle.turn.resolved`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialCombatantView {
    pub creature_kind: String,
    pub level: u32,
    pub current_hp: u32,
    pub max_hp: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub fainted: bool,
}
