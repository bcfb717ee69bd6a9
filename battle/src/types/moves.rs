//! Moves and their non-damaging effects

use arena_protocol::MoveView;

use super::combatant::Combatant;
use super::status::Status;

/// Power of the fallback move used once every move slot is out of PP
pub const STRUGGLE_POWER: u32 = 50;

/// Lowest stat stage a combatant can be driven to
pub const MIN_STAGE: i8 = -6;

/// Effect applied by a move with zero power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "kind", content = "payload", rename_all = "camelCase")
)]
pub enum MoveEffect {
    #[default]
    None,
    /// Inflict a status condition unless the target already has one
    Inflict(Status),
    /// Lower the target's speed stage
    StatDrop { stages: u8 },
}

impl MoveEffect {
    /// Apply the effect to the target and describe what happened
    pub fn apply(&self, target: &mut Combatant) -> String {
        match *self {
            MoveEffect::None => "But nothing happened!".to_string(),
            MoveEffect::Inflict(status) => {
                if target.inflict(status) {
                    format!("{} {}!", target.name(), status.inflicted_verb())
                } else {
                    format!("It doesn't affect {}...", target.name())
                }
            }
            MoveEffect::StatDrop { stages } => {
                let dropped = target.lower_speed(stages);
                if dropped == 0 {
                    format!("{}'s speed won't go any lower!", target.name())
                } else if dropped == 1 {
                    format!("{}'s speed fell!", target.name())
                } else {
                    format!("{}'s speed harshly fell!", target.name())
                }
            }
        }
    }
}

/// One move slot of a combatant
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Move {
    pub id: String,

    /// Base power; zero means the move applies `effect` instead of damage
    pub power: u32,

    /// Hit chance in percent (1-100)
    pub accuracy: u32,

    pub pp_remaining: u32,

    #[cfg_attr(feature = "serde", serde(default))]
    pub effect: MoveEffect,
}

impl Move {
    /// Create a damaging move
    pub fn new(id: impl Into<String>, power: u32, accuracy: u32, pp: u32) -> Self {
        Self {
            id: id.into(),
            power,
            accuracy,
            pp_remaining: pp,
            effect: MoveEffect::None,
        }
    }

    /// Create a zero-power move that applies an effect
    pub fn status(id: impl Into<String>, effect: MoveEffect, accuracy: u32, pp: u32) -> Self {
        Self {
            id: id.into(),
            power: 0,
            accuracy,
            pp_remaining: pp,
            effect,
        }
    }

    /// The move used when no slot has PP left
    pub fn struggle() -> Self {
        Self::new("struggle", STRUGGLE_POWER, 100, 0)
    }

    pub fn is_damaging(&self) -> bool {
        self.power > 0
    }

    pub fn has_pp(&self) -> bool {
        self.pp_remaining > 0
    }

    pub fn to_view(&self) -> MoveView {
        MoveView {
            id: self.id.clone(),
            power: self.power,
            accuracy: self.accuracy,
            pp_remaining: self.pp_remaining,
        }
    }
}
