use anyhow::{Context, Result, anyhow, bail};
use arena_battle::{BattleOutcome, Combatant};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;

use super::{Consumed, InventoryStore, RewardReceipt, RosterStore};

/// Roster and inventory backed by the remote persistence service
pub struct HttpStore {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid store URL {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Store URL {} cannot take a path", base_url);
        }

        Ok(Self { client, base_url })
    }

    /// Endpoint under the base URL. Each segment is percent-encoded, so an
    /// identity can never add path segments or a query.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Store URL {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RosterStore for HttpStore {
    async fn get_roster(&self, identity: &str) -> Result<Vec<Combatant>> {
        let response = self
            .client
            .get(self.url(&["roster", identity])?)
            .send()
            .await
            .context("Failed to send roster request")?
            .error_for_status()
            .context("Roster request rejected")?;

        let mut members: Vec<Combatant> = response
            .json()
            .await
            .context("Failed to parse roster response")?;

        // Max HP is derived here, never trusted from the record
        for member in &mut members {
            member.normalize();
        }
        Ok(members)
    }

    async fn set_active_hp(&self, identity: &str, slot: usize, current_hp: u32) -> Result<()> {
        self.client
            .put(self.url(&["roster", identity, slot.to_string().as_str(), "hp"])?)
            .json(&json!({ "currentHp": current_hp }))
            .send()
            .await
            .context("Failed to send HP checkpoint")?
            .error_for_status()
            .context("HP checkpoint rejected")?;
        Ok(())
    }

    async fn record_battle_outcome(&self, outcome: &BattleOutcome) -> Result<Vec<RewardReceipt>> {
        let receipts = self
            .client
            .post(self.url(&["outcomes"])?)
            .json(outcome)
            .send()
            .await
            .context("Failed to send battle outcome")?
            .error_for_status()
            .context("Battle outcome rejected")?
            .json()
            .await
            .context("Failed to parse reward receipts")?;
        Ok(receipts)
    }
}

#[async_trait]
impl InventoryStore for HttpStore {
    async fn consume_item(&self, identity: &str, item_kind: &str) -> Result<Consumed> {
        let response = self
            .client
            .post(self.url(&["inventory", identity, "consume"])?)
            .json(&json!({ "itemKind": item_kind }))
            .send()
            .await
            .context("Failed to send consume request")?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(Consumed::Insufficient);
        }
        response
            .error_for_status()
            .context("Consume request rejected")?;
        Ok(Consumed::Ok)
    }
}
