//! Combat formulas.
//!
//! Pure functions with no state. Every random input is passed in as a
//! uniform roll in `[0, 1)` so results are reproducible from a seeded stream.
//! Callers validate inputs (level >= 1) before calling.

use arena_protocol::BallKind;

/// Chance a paralyzed combatant loses its action
pub const PARALYSIS_SKIP_CHANCE: f64 = 0.25;

/// Wild level lead over the player's active level beyond which capture is harder
pub const CAPTURE_LEVEL_GAP: u32 = 5;

/// `floor((2·baseHp·level)/100 + level + 10)`
pub fn max_hp_at_level(base_hp: u32, level: u32) -> u32 {
    (2u32.saturating_mul(base_hp).saturating_mul(level) / 100)
        .saturating_add(level)
        .saturating_add(10)
}

/// Damage dealt by one hit.
///
/// `roll` is drawn once per attack. A move with zero power deals no damage;
/// any damaging move deals at least one point.
pub fn damage(attacker_level: u32, move_power: u32, roll: f64) -> u32 {
    if move_power == 0 {
        return 0;
    }

    let level = attacker_level as f64;
    let power = move_power as f64;
    let base = ((2.0 * level / 5.0 + 2.0) * power / 50.0 + 2.0).floor();
    let scaled = (base * (0.85 + 0.15 * roll)).floor() as u32;

    scaled.max(1)
}

/// Whether the wild creature out-levels the player's active combatant enough
/// to halve the capture chance
pub fn level_gap_penalty_applies(wild_level: u32, player_level: u32) -> bool {
    wild_level > player_level.saturating_add(CAPTURE_LEVEL_GAP)
}

/// Probability a capture attempt succeeds, clamped to `[0, 1]`
pub fn capture_chance(
    target_hp_fraction: f64,
    ball_bonus: f64,
    level_gap_penalty: bool,
    legendary: bool,
) -> f64 {
    let hp_fraction = target_hp_fraction.clamp(0.0, 1.0);
    let mut chance = 0.3 + (1.0 - hp_fraction) * 0.5 + ball_bonus;

    if level_gap_penalty {
        chance *= 0.5;
    }
    if legendary {
        chance *= 0.3;
    }

    chance.clamp(0.0, 1.0)
}

/// Additive capture bonus of each ball
pub fn ball_bonus(ball: BallKind) -> f64 {
    match ball {
        BallKind::Poke => 0.0,
        BallKind::Great => 0.15,
        BallKind::Ultra => 0.3,
    }
}

/// Probability of escaping a wild battle
pub fn flee_chance(runner_level: u32, opponent_level: u32) -> f64 {
    let diff = runner_level as f64 - opponent_level as f64;
    (0.5 + 0.05 * diff).clamp(0.1, 1.0)
}

/// End-of-turn burn damage
pub fn burn_residual(max_hp: u32) -> u32 {
    (max_hp / 16).max(1)
}

/// Speed after stage multiplier (2/(2-n) when lowered) and paralysis halving
pub fn effective_speed(speed: u32, stage: i8, paralyzed: bool) -> u32 {
    let stage = stage.clamp(-6, 6) as i32;
    let (num, den) = if stage >= 0 {
        (2 + stage, 2)
    } else {
        (2, 2 - stage)
    };
    let staged = (u64::from(speed) * num as u64 / den as u64).min(u64::from(u32::MAX)) as u32;

    if paralyzed { staged / 2 } else { staged }
}

/// A uniform roll succeeds when it falls below the chance
pub fn roll_succeeds(chance: f64, roll: f64) -> bool {
    roll < chance
}
