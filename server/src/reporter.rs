//! Terminal outcome reporting

use std::sync::Arc;

use arena_battle::BattleOutcome;
use tracing::{info, warn};

use crate::store::RosterStore;

/// Hands finished battles to the persistence service.
///
/// Each session yields its outcome once (`BattleSession::take_outcome`), so
/// the reporter keeps no record of its own.
pub struct OutcomeReporter {
    store: Arc<dyn RosterStore>,
}

impl OutcomeReporter {
    pub fn new(store: Arc<dyn RosterStore>) -> Self {
        Self { store }
    }

    /// Log an outcome and record it. Store failures are logged, not retried.
    pub async fn report(&self, outcome: &BattleOutcome) {
        info!(
            session_id = %outcome.session_id,
            mode = %outcome.mode,
            winner = ?outcome.winner_identity,
            end_reason = %outcome.end_reason,
            turn = outcome.turn_number,
            captured = outcome.captured,
            "Battle ended"
        );

        match self.store.record_battle_outcome(outcome).await {
            Ok(receipts) => {
                for receipt in receipts {
                    info!(
                        session_id = %outcome.session_id,
                        identity = %receipt.identity,
                        xp = receipt.xp,
                        level = receipt.level,
                        currency = receipt.currency,
                        "Rewards granted"
                    );
                }
            }
            Err(e) => {
                warn!(session_id = %outcome.session_id, error = %e, "Failed to record outcome");
            }
        }
    }
}
