//! External roster and inventory services

mod http;
mod memory;

use anyhow::Result;
use arena_battle::{BattleOutcome, Combatant};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpStore;
pub use memory::MemoryStore;

/// What the persistence service granted one participant for a finished battle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardReceipt {
    pub identity: String,
    pub xp: u32,
    pub level: u32,
    pub currency: u32,
}

/// Result of spending one inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    Ok,
    Insufficient,
}

/// Read/write access to players' parties.
///
/// The live session is the writer of record for HP while a battle runs;
/// `set_active_hp` receives its checkpoints.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Party in roster order
    async fn get_roster(&self, identity: &str) -> Result<Vec<Combatant>>;

    async fn set_active_hp(&self, identity: &str, slot: usize, current_hp: u32) -> Result<()>;

    /// Hand over a terminal outcome; XP and currency are computed by the store
    async fn record_battle_outcome(&self, outcome: &BattleOutcome) -> Result<Vec<RewardReceipt>>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn consume_item(&self, identity: &str, item_kind: &str) -> Result<Consumed>;
}
