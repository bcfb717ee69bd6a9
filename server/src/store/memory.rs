use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use anyhow::{Result, anyhow};
use arena_battle::{BattleOutcome, Combatant, MAX_PARTY_SIZE};
use async_trait::async_trait;

use super::{Consumed, InventoryStore, RewardReceipt, RosterStore};

/// In-process roster and inventory, for local runs and tests
#[derive(Default)]
pub struct MemoryStore {
    rosters: RwLock<HashMap<String, Vec<Combatant>>>,
    items: Mutex<HashMap<(String, String), u32>>,
    outcomes: Mutex<Vec<BattleOutcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a player's party
    pub fn set_roster(&self, identity: &str, members: Vec<Combatant>) {
        if let Ok(mut rosters) = self.rosters.write() {
            rosters.insert(identity.to_string(), members);
        }
    }

    pub fn roster(&self, identity: &str) -> Vec<Combatant> {
        self.rosters
            .read()
            .ok()
            .and_then(|r| r.get(identity).cloned())
            .unwrap_or_default()
    }

    pub fn give_items(&self, identity: &str, item_kind: &str, count: u32) {
        if let Ok(mut items) = self.items.lock() {
            *items
                .entry((identity.to_string(), item_kind.to_string()))
                .or_default() += count;
        }
    }

    pub fn item_count(&self, identity: &str, item_kind: &str) -> u32 {
        self.items
            .lock()
            .ok()
            .and_then(|i| i.get(&(identity.to_string(), item_kind.to_string())).copied())
            .unwrap_or(0)
    }

    /// Outcomes handed over so far, oldest first
    pub fn outcomes(&self) -> Vec<BattleOutcome> {
        self.outcomes
            .lock()
            .map(|o| o.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn get_roster(&self, identity: &str) -> Result<Vec<Combatant>> {
        Ok(self.roster(identity))
    }

    async fn set_active_hp(&self, identity: &str, slot: usize, current_hp: u32) -> Result<()> {
        let mut rosters = self
            .rosters
            .write()
            .map_err(|_| anyhow!("Roster lock poisoned"))?;
        let member = rosters
            .get_mut(identity)
            .and_then(|members| members.get_mut(slot))
            .ok_or_else(|| anyhow!("No roster slot {} for {}", slot, identity))?;

        member.current_hp = current_hp.min(member.max_hp);
        Ok(())
    }

    async fn record_battle_outcome(&self, outcome: &BattleOutcome) -> Result<Vec<RewardReceipt>> {
        if let (Some(winner), Some(caught)) =
            (&outcome.winner_identity, &outcome.captured_combatant)
        {
            let mut rosters = self
                .rosters
                .write()
                .map_err(|_| anyhow!("Roster lock poisoned"))?;
            let party = rosters.entry(winner.clone()).or_default();
            if party.len() < MAX_PARTY_SIZE {
                let mut caught = caught.clone();
                caught.lead = false;
                party.push(caught);
            }
        }

        self.outcomes
            .lock()
            .map_err(|_| anyhow!("Outcome lock poisoned"))?
            .push(outcome.clone());

        Ok(outcome
            .participants
            .iter()
            .map(|identity| RewardReceipt {
                identity: identity.clone(),
                ..RewardReceipt::default()
            })
            .collect())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn consume_item(&self, identity: &str, item_kind: &str) -> Result<Consumed> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| anyhow!("Inventory lock poisoned"))?;

        match items.get_mut(&(identity.to_string(), item_kind.to_string())) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(Consumed::Ok)
            }
            _ => Ok(Consumed::Insufficient),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_battle::{BattleMode, EndReason};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_consume_until_empty() {
        let store = MemoryStore::new();
        store.give_items("ash", "poke_ball", 1);

        assert_eq!(store.consume_item("ash", "poke_ball").await.unwrap(), Consumed::Ok);
        assert_eq!(
            store.consume_item("ash", "poke_ball").await.unwrap(),
            Consumed::Insufficient
        );
        assert_eq!(store.item_count("ash", "poke_ball"), 0);
    }

    #[tokio::test]
    async fn test_set_active_hp() {
        let store = MemoryStore::new();
        store.set_roster("ash", vec![Combatant::new("pikachu", 35, 10)]);

        store.set_active_hp("ash", 0, 3).await.unwrap();
        assert_eq!(store.roster("ash")[0].current_hp, 3);

        assert!(store.set_active_hp("ash", 4, 3).await.is_err());
    }

    #[tokio::test]
    async fn test_capture_joins_the_winner_party() {
        let store = MemoryStore::new();
        store.set_roster("ash", vec![Combatant::new("pikachu", 35, 10)]);

        let outcome = BattleOutcome {
            session_id: Uuid::new_v4(),
            mode: BattleMode::Wild,
            winner_identity: Some("ash".to_string()),
            participants: vec!["ash".to_string()],
            end_reason: EndReason::Capture,
            turn_number: 2,
            captured: true,
            captured_combatant: Some(Combatant::new("pidgey", 40, 4)),
        };
        let receipts = store.record_battle_outcome(&outcome).await.unwrap();

        assert_eq!(receipts.len(), 1);
        assert_eq!(store.roster("ash").len(), 2);
        assert_eq!(store.outcomes().len(), 1);
    }
}
