//! Shared vocabulary for session protocol messages

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// One of the two sides of a battle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" | "a" => Some(Seat::A),
            "B" | "b" => Some(Seat::B),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::A => "A",
            Seat::B => "B",
        }
    }

    /// The seat across the field
    pub fn other(&self) -> Seat {
        match self {
            Seat::A => Seat::B,
            Seat::B => Seat::A,
        }
    }

    /// Array index (A = 0, B = 1)
    pub fn index(&self) -> usize {
        match self {
            Seat::A => 0,
            Seat::B => 1,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of encounter a session adjudicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleMode {
    Pvp,
    Trainer,
    Wild,
}

impl BattleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleMode::Pvp => "pvp",
            BattleMode::Trainer => "trainer",
            BattleMode::Wild => "wild",
        }
    }
}

impl fmt::Display for BattleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// A side's entire roster fainted
    Whiteout,
    Capture,
    Forfeit,
    Flee,
    /// PvP seat failed to act before the per-turn deadline
    Timeout,
    /// Grace period expired without a reconnect
    Disconnect,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Whiteout => "whiteout",
            EndReason::Capture => "capture",
            EndReason::Forfeit => "forfeit",
            EndReason::Flee => "flee",
            EndReason::Timeout => "timeout",
            EndReason::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capture device used by a capture intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallKind {
    Poke,
    Great,
    Ultra,
}

impl BallKind {
    /// Inventory item identifier consumed by one throw
    pub fn item_kind(&self) -> &'static str {
        match self {
            BallKind::Poke => "poke_ball",
            BallKind::Great => "great_ball",
            BallKind::Ultra => "ultra_ball",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BallKind::Poke => "Poke Ball",
            BallKind::Great => "Great Ball",
            BallKind::Ultra => "Ultra Ball",
        }
    }
}

/// Discriminant of a `battle.intent` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Move,
    Switch,
    Capture,
    Forfeit,
    Flee,
}

/// Loose payload of a `battle.intent` frame; which fields are required
/// depends on the kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<BallKind>,
}

/// A client-submitted action for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Use the move at this index of the active combatant's move list
    Move { slot: usize },
    /// Bring in the roster member at this index
    Switch { slot: usize },
    Capture { ball: BallKind },
    Forfeit,
    Flee,
}

impl Intent {
    /// Build a typed intent from its wire kind and payload
    pub fn from_wire(kind: IntentKind, payload: &IntentPayload) -> Result<Self, ParseError> {
        match kind {
            IntentKind::Move => payload
                .slot
                .map(|slot| Intent::Move { slot })
                .ok_or_else(|| ParseError::MissingField("payload.slot".to_string())),
            IntentKind::Switch => payload
                .slot
                .map(|slot| Intent::Switch { slot })
                .ok_or_else(|| ParseError::MissingField("payload.slot".to_string())),
            IntentKind::Capture => Ok(Intent::Capture {
                ball: payload.ball.unwrap_or(BallKind::Poke),
            }),
            IntentKind::Forfeit => Ok(Intent::Forfeit),
            IntentKind::Flee => Ok(Intent::Flee),
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Move { .. } => IntentKind::Move,
            Intent::Switch { .. } => IntentKind::Switch,
            Intent::Capture { .. } => IntentKind::Capture,
            Intent::Forfeit => IntentKind::Forfeit,
            Intent::Flee => IntentKind::Flee,
        }
    }

    pub fn payload(&self) -> IntentPayload {
        match self {
            Intent::Move { slot } | Intent::Switch { slot } => IntentPayload {
                slot: Some(*slot),
                ball: None,
            },
            Intent::Capture { ball } => IntentPayload {
                slot: None,
                ball: Some(*ball),
            },
            Intent::Forfeit | Intent::Flee => IntentPayload::default(),
        }
    }
}
