//! Non-volatile status conditions

use crate::math;

/// Status condition that persists on a combatant until cured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    Burn,
    Paralysis,
}

impl Status {
    /// Convert to protocol format
    pub fn to_protocol(&self) -> &'static str {
        match self {
            Status::Burn => "brn",
            Status::Paralysis => "par",
        }
    }

    /// Get display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Burn => "Burn",
            Status::Paralysis => "Paralysis",
        }
    }

    /// HP lost at the end of each turn while afflicted
    pub fn residual_damage(&self, max_hp: u32) -> u32 {
        match self {
            Status::Burn => math::burn_residual(max_hp),
            Status::Paralysis => 0,
        }
    }

    /// Chance the afflicted combatant loses its action this turn
    pub fn skip_chance(&self) -> f64 {
        match self {
            Status::Burn => 0.0,
            Status::Paralysis => math::PARALYSIS_SKIP_CHANCE,
        }
    }

    /// Phrase used when the status takes hold, e.g. "was burned"
    pub fn inflicted_verb(&self) -> &'static str {
        match self {
            Status::Burn => "was burned",
            Status::Paralysis => "is paralyzed! It may be unable to move",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_protocol_codes() {
        assert_eq!(Status::Burn.to_protocol(), "brn");
        assert_eq!(Status::Paralysis.to_protocol(), "par");
    }

    #[test]
    fn test_burn_residual() {
        assert_eq!(Status::Burn.residual_damage(160), 10);
        // Never less than one HP
        assert_eq!(Status::Burn.residual_damage(12), 1);
        assert_eq!(Status::Paralysis.residual_damage(160), 0);
    }
}
