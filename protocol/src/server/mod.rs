mod views;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;
use crate::types::{BattleMode, EndReason, Seat};

pub use views::{CombatantView, MoveView, PartialCombatantView};

/// Events the server pushes to a connected link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "challenge.sent", rename_all = "camelCase")]
    ChallengeSent { challenge_id: Uuid },

    #[serde(rename = "challenge.incoming", rename_all = "camelCase")]
    ChallengeIncoming {
        challenge_id: Uuid,
        from_identity: String,
        from_display_name: String,
    },

    /// Sent to the challenger on decline, on an implicit decline at accept
    /// time, and on expiry (`expired = true`)
    #[serde(rename = "challenge.declined", rename_all = "camelCase")]
    ChallengeDeclined {
        challenge_id: Uuid,
        by_display_name: String,
        expired: bool,
    },

    #[serde(rename = "battle.start", rename_all = "camelCase")]
    BattleStart {
        session_id: Uuid,
        mode: BattleMode,
        /// Seat occupied by the receiving link
        seat: Seat,
        seat_a: CombatantView,
        seat_b: CombatantView,
    },

    #[serde(rename = "battle.intent.ack", rename_all = "camelCase")]
    IntentAck { session_id: Uuid },

    #[serde(rename = "battle.turn.resolved", rename_all = "camelCase")]
    TurnResolved {
        session_id: Uuid,
        log: Vec<String>,
        seat_a: PartialCombatantView,
        seat_b: PartialCombatantView,
        turn_number: u32,
        awaiting_switch: Vec<Seat>,
    },

    /// A replacement switch out of the pending-switch state; not a turn
    #[serde(rename = "battle.switched", rename_all = "camelCase")]
    Switched {
        session_id: Uuid,
        seat: Seat,
        log: Vec<String>,
        seat_a: PartialCombatantView,
        seat_b: PartialCombatantView,
    },

    #[serde(rename = "battle.opponent.disconnected", rename_all = "camelCase")]
    OpponentDisconnected { display_name: String, grace_ms: u64 },

    #[serde(rename = "battle.opponent.reconnected", rename_all = "camelCase")]
    OpponentReconnected { display_name: String },

    #[serde(rename = "battle.end", rename_all = "camelCase")]
    BattleEnd {
        session_id: Uuid,
        winner_identity: Option<String>,
        end_reason: EndReason,
        turn_number: u32,
        captured: bool,
    },

    #[serde(rename = "battle.error", rename_all = "camelCase")]
    Error { message: String, retryable: bool },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>, retryable: bool) -> Self {
        ServerEvent::Error {
            message: message.into(),
            retryable,
        }
    }

    /// Wire name of the event (the `type` field)
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ChallengeSent { .. } => "challenge.sent",
            ServerEvent::ChallengeIncoming { .. } => "challenge.incoming",
            ServerEvent::ChallengeDeclined { .. } => "challenge.declined",
            ServerEvent::BattleStart { .. } => "battle.start",
            ServerEvent::IntentAck { .. } => "battle.intent.ack",
            ServerEvent::TurnResolved { .. } => "battle.turn.resolved",
            ServerEvent::Switched { .. } => "battle.switched",
            ServerEvent::OpponentDisconnected { .. } => "battle.opponent.disconnected",
            ServerEvent::OpponentReconnected { .. } => "battle.opponent.reconnected",
            ServerEvent::BattleEnd { .. } => "battle.end",
            ServerEvent::Error { .. } => "battle.error",
        }
    }

    /// Serialize event to its JSON text frame
    pub fn to_wire_format(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Parse a complete text frame pushed by the server
pub fn parse_server_frame(frame: &str) -> Result<ServerEvent> {
    let frame = frame.trim();
    if frame.is_empty() {
        return Err(ParseError::EmptyMessage.into());
    }

    let event =
        serde_json::from_str(frame).map_err(|e| ParseError::InvalidFormat(e.to_string()))?;
    Ok(event)
}
