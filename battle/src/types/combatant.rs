//! Combatant state types

use arena_protocol::{CombatantView, PartialCombatantView};

use super::moves::{MIN_STAGE, Move};
use super::status::Status;
use crate::math;

/// Speed used when a record does not carry one
pub const DEFAULT_SPEED: u32 = 50;

pub const MAX_LEVEL: u32 = 100;

/// One creature's battle stats.
///
/// HP is kept within `0..=max_hp` by every mutator; `current_hp == 0` is the
/// fainted state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Combatant {
    /// Species id
    pub creature_kind: String,

    /// Level (1-100)
    pub level: u32,

    /// Species base HP stat, the input to the max HP formula
    pub base_hp: u32,

    pub max_hp: u32,

    pub current_hp: u32,

    #[cfg_attr(feature = "serde", serde(default = "default_speed"))]
    pub speed: u32,

    /// Speed stage modifier (-6 to 0), cleared on switch out
    #[cfg_attr(feature = "serde", serde(skip))]
    pub speed_stage: i8,

    /// Ordered move slots
    pub moves: Vec<Move>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub status: Option<Status>,

    #[cfg_attr(feature = "serde", serde(default))]
    pub legendary: bool,

    /// Party lead flag, preferred when picking the first active member
    #[cfg_attr(feature = "serde", serde(default))]
    pub lead: bool,
}

#[cfg(feature = "serde")]
fn default_speed() -> u32 {
    DEFAULT_SPEED
}

impl Combatant {
    /// Create a combatant at full HP for its level
    pub fn new(creature_kind: impl Into<String>, base_hp: u32, level: u32) -> Self {
        let level = level.clamp(1, MAX_LEVEL);
        let max_hp = math::max_hp_at_level(base_hp, level);
        Self {
            creature_kind: creature_kind.into(),
            level,
            base_hp,
            max_hp,
            current_hp: max_hp,
            speed: DEFAULT_SPEED,
            speed_stage: 0,
            moves: Vec::new(),
            status: None,
            legendary: false,
            lead: false,
        }
    }

    pub fn with_moves(mut self, moves: Vec<Move>) -> Self {
        self.moves = moves;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    /// Start below full HP (clamped to `max_hp`)
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.current_hp = hp.min(self.max_hp);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn legendary(mut self) -> Self {
        self.legendary = true;
        self
    }

    pub fn lead(mut self) -> Self {
        self.lead = true;
        self
    }

    /// Re-derive `max_hp` and clamp HP after loading from an external record
    pub fn normalize(&mut self) {
        self.level = self.level.clamp(1, MAX_LEVEL);
        self.max_hp = math::max_hp_at_level(self.base_hp, self.level);
        self.current_hp = self.current_hp.min(self.max_hp);
        self.speed_stage = 0;
    }

    /// Get display name
    pub fn name(&self) -> &str {
        &self.creature_kind
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_fainted()
    }

    /// Remove HP, clamping at zero.
    ///
    /// Returns true only on the edge where this call caused the faint.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        let was_alive = self.is_alive();
        self.current_hp = self.current_hp.saturating_sub(amount);
        was_alive && self.is_fainted()
    }

    /// Restore HP, clamping at `max_hp`
    pub fn heal(&mut self, amount: u32) {
        self.current_hp = self.current_hp.saturating_add(amount).min(self.max_hp);
    }

    pub fn heal_full(&mut self) {
        self.current_hp = self.max_hp;
    }

    /// Remaining HP as a fraction of max (0.0-1.0)
    pub fn hp_fraction(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        self.current_hp as f64 / self.max_hp as f64
    }

    /// Give the combatant a status; false if it already has one
    pub fn inflict(&mut self, status: Status) -> bool {
        if self.status.is_some() || self.is_fainted() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Lower the speed stage, returning how many stages actually dropped
    pub fn lower_speed(&mut self, stages: u8) -> u8 {
        let before = self.speed_stage;
        let stages = i8::try_from(stages).unwrap_or(i8::MAX);
        self.speed_stage = before.saturating_sub(stages).max(MIN_STAGE);
        (before - self.speed_stage) as u8
    }

    /// Speed after stage and paralysis modifiers
    pub fn effective_speed(&self) -> u32 {
        math::effective_speed(
            self.speed,
            self.speed_stage,
            self.status == Some(Status::Paralysis),
        )
    }

    /// Whether any move slot still has PP
    pub fn has_usable_move(&self) -> bool {
        self.moves.iter().any(Move::has_pp)
    }

    /// Indices of move slots with PP left
    pub fn usable_move_slots(&self) -> Vec<usize> {
        self.moves
            .iter()
            .enumerate()
            .filter(|(_, m)| m.has_pp())
            .map(|(i, _)| i)
            .collect()
    }

    /// Called when this combatant leaves the field
    pub fn on_switch_out(&mut self) {
        self.speed_stage = 0;
    }

    pub fn to_view(&self) -> CombatantView {
        CombatantView {
            creature_kind: self.creature_kind.clone(),
            level: self.level,
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            status: self.status.map(|s| s.to_protocol().to_string()),
            moves: self.moves.iter().map(Move::to_view).collect(),
        }
    }

    pub fn to_partial_view(&self) -> PartialCombatantView {
        PartialCombatantView {
            creature_kind: self.creature_kind.clone(),
            level: self.level,
            current_hp: self.current_hp,
            max_hp: self.max_hp,
            status: self.status.map(|s| s.to_protocol().to_string()),
            fainted: self.is_fainted(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_combatant_new() {
        let c = Combatant::new("charmander", 39, 7);
        assert_eq!(c.max_hp, 22);
        assert_eq!(c.current_hp, 22);
        assert!(c.is_alive());
        assert_eq!(c.speed, DEFAULT_SPEED);
    }

    #[test]
    fn test_level_floor() {
        let c = Combatant::new("magikarp", 20, 0);
        assert_eq!(c.level, 1);
    }

    #[test]
    fn test_normalize_caps_stored_level() {
        let mut c = Combatant::new("mewtwo", 106, 70);
        c.level = u32::MAX;
        c.base_hp = u32::MAX;
        c.current_hp = u32::MAX;

        c.normalize();

        assert_eq!(c.level, MAX_LEVEL);
        assert_eq!(c.max_hp, math::max_hp_at_level(u32::MAX, MAX_LEVEL));
        assert_eq!(c.current_hp, c.max_hp);
        assert_eq!(Combatant::new("mew", 100, 250).level, MAX_LEVEL);
    }

    #[test]
    fn test_apply_damage_reports_faint_edge_once() {
        let mut c = Combatant::new("pidgey", 40, 5);
        let max = c.max_hp;

        assert!(!c.apply_damage(max - 1));
        assert_eq!(c.current_hp, 1);

        assert!(c.apply_damage(100));
        assert_eq!(c.current_hp, 0);
        assert!(c.is_fainted());

        // Already fainted: no second edge
        assert!(!c.apply_damage(5));
        assert_eq!(c.current_hp, 0);
    }

    #[test]
    fn test_heal_clamps() {
        let mut c = Combatant::new("pidgey", 40, 5).with_hp(3);
        c.heal(2);
        assert_eq!(c.current_hp, 5);

        c.heal(u32::MAX);
        assert_eq!(c.current_hp, c.max_hp);

        c.apply_damage(4);
        c.heal_full();
        assert_eq!(c.current_hp, c.max_hp);
    }

    #[test]
    fn test_with_hp_clamps() {
        let c = Combatant::new("pidgey", 40, 5).with_hp(10_000);
        assert_eq!(c.current_hp, c.max_hp);
    }

    #[test]
    fn test_normalize_rederives_max_hp() {
        let mut c = Combatant::new("charmander", 39, 7);
        c.max_hp = 999;
        c.current_hp = 500;
        c.speed_stage = -3;

        c.normalize();

        assert_eq!(c.max_hp, 22);
        assert_eq!(c.current_hp, 22);
        assert_eq!(c.speed_stage, 0);
    }

    #[test]
    fn test_paralysis_halves_speed() {
        let c = Combatant::new("pikachu", 35, 10).with_speed(90);
        assert_eq!(c.effective_speed(), 90);

        let c = c.with_status(Status::Paralysis);
        assert_eq!(c.effective_speed(), 45);
    }

    #[test]
    fn test_usable_moves() {
        let mut c = Combatant::new("pikachu", 35, 10).with_moves(vec![
            Move::new("tackle", 40, 100, 1),
            Move::new("thundershock", 40, 100, 0),
        ]);
        assert_eq!(c.usable_move_slots(), vec![0]);

        c.moves[0].pp_remaining = 0;
        assert!(!c.has_usable_move());
    }

    #[test]
    fn test_partial_view() {
        let c = Combatant::new("pikachu", 35, 10)
            .with_hp(0)
            .with_status(Status::Burn);
        let view = c.to_partial_view();

        assert!(view.fainted);
        assert_eq!(view.current_hp, 0);
        assert_eq!(view.status.as_deref(), Some("brn"));
    }

    proptest! {
        #[test]
        fn prop_hp_stays_in_bounds(
            level in 1u32..=100,
            base_hp in 1u32..=255,
            ops in proptest::collection::vec((any::<bool>(), 0u32..1_000), 0..64),
        ) {
            let mut c = Combatant::new("missingno", base_hp, level);
            for (is_damage, amount) in ops {
                if is_damage {
                    c.apply_damage(amount);
                } else {
                    c.heal(amount);
                }
                prop_assert!(c.current_hp <= c.max_hp);
                prop_assert_eq!(c.is_fainted(), c.current_hp == 0);
            }
        }
    }
}
