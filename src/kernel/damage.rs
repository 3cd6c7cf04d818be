//! Damage scaling, hitstop, and the pushback/launch/bounce effects of a
//! confirmed hit or block (`spec.md` §4.3.6).

use crate::kernel::moves::{BounceData, MoveData};
use crate::kernel::state::Character;

/// First-hit combo scalar.
const COMBO_SCALING_START: f32 = 0.8;
/// Per-subsequent-hit combo scalar exponent base.
const COMBO_SCALING_STEP: f32 = 0.9;

/// Minimum juggle scalar once the defender's juggle points exceed a move's
/// juggle limit and no finer per-index table is declared.
const JUGGLE_SCALING_FLOOR: f32 = 0.25;

/// Multiplier applied to a hit that lands while the defender is in `startup`
/// (a true counter-hit, per `spec.md` §4.3.6).
const COUNTER_HIT_MULTIPLIER: f32 = 1.2;

/// Fraction of base damage a blocked hit still deals as chip damage.
const CHIP_DAMAGE_FRACTION: f32 = 0.10;
/// Fraction of base damage subtracted from guard meter on a blocked hit.
const GUARD_COST_FRACTION: f32 = 0.50;
/// Bonus chip damage applied when a block breaks guard.
const GUARD_CRUSH_BONUS_CHIP: f32 = 10.0;

/// Result of resolving a blocked hit against the defender's guard meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockOutcome {
    /// Total chip damage to apply to health.
    pub chip_damage: f32,
    /// `true` if guard meter was depleted, breaking guard.
    pub guard_crushed: bool,
}

/// Combo-scaling multiplier for the `hit_index`-th hit in a string
/// (0-indexed: the first hit passes `hit_index = 0`), per `spec.md` §4.3.6:
/// "first hit 1.0; subsequent hits multiply by `comboScalingStart ·
/// comboScalingStep^(n-1)`".
#[must_use]
pub fn combo_scalar(hit_index: u32) -> f32 {
    if hit_index == 0 {
        1.0
    } else {
        COMBO_SCALING_START * COMBO_SCALING_STEP.powi(hit_index as i32 - 1)
    }
}

/// Juggle-scaling multiplier for the defender's current juggle point total:
/// a move's own per-index table takes priority, falling back to the flat
/// 0.25-floor rule once `juggle_points >= juggle_limit`.
#[must_use]
pub fn juggle_scalar(mv: &MoveData, juggle_points: f32) -> f32 {
    if !mv.juggle_table.is_empty() {
        let idx = (juggle_points / mv.juggle_add.max(1.0)).floor() as usize;
        let entry = mv
            .juggle_table
            .get(idx)
            .copied()
            .unwrap_or_else(|| *mv.juggle_table.last().unwrap());
        return entry.max(JUGGLE_SCALING_FLOOR);
    }
    if juggle_points >= mv.juggle_limit {
        JUGGLE_SCALING_FLOOR
    } else {
        1.0
    }
}

/// Final damage for a confirmed hit: `max(1, floor(base · combo · juggle ·
/// counter))` (`spec.md` §4.3.6).
#[must_use]
pub fn scaled_hit_damage(mv: &MoveData, defender: &Character, is_counter_hit: bool) -> f32 {
    let mut damage = mv.damage;
    damage *= combo_scalar(defender.combo_hits);
    if defender.airborne {
        damage *= juggle_scalar(mv, defender.juggle_points);
    }
    if is_counter_hit {
        damage *= COUNTER_HIT_MULTIPLIER;
    }
    damage.floor().max(1.0)
}

/// Hitstop applied on a confirmed hit: `min(14, 4 + floor(damage/12) +
/// counter?1:0)` (`spec.md` §4.3.6), computed from the already-scaled
/// `final_damage`.
#[must_use]
pub fn hitstop_for_hit(final_damage: f32, is_counter_hit: bool) -> u16 {
    let base = 4.0 + (final_damage / 12.0).floor() + if is_counter_hit { 1.0 } else { 0.0 };
    base.min(14.0) as u16
}

/// Resolves a blocked hit's chip damage and guard cost against the
/// defender's current guard meter, per `spec.md` §4.3.6.
#[must_use]
pub fn resolve_block(mv: &MoveData, guard_meter: &mut f32) -> BlockOutcome {
    let chip = (mv.damage * CHIP_DAMAGE_FRACTION).floor().max(0.0);
    let cost = (mv.damage * GUARD_COST_FRACTION).floor().max(1.0);
    if *guard_meter <= cost {
        *guard_meter = 100.0;
        BlockOutcome {
            chip_damage: chip + GUARD_CRUSH_BONUS_CHIP,
            guard_crushed: true,
        }
    } else {
        *guard_meter -= cost;
        BlockOutcome {
            chip_damage: chip,
            guard_crushed: false,
        }
    }
}

/// Applies the move's bounce/launch metadata to the defender on a confirmed
/// hit: sets them airborne with the appropriate vertical velocity, or
/// reflects their existing fall into a bounce if they were already airborne.
pub fn apply_launch(defender: &mut Character, bounce: BounceData) {
    if defender.airborne && bounce.causes_bounce {
        defender.vy = bounce.launch_vy.max(defender.vy.abs() * 0.5);
    } else if !defender.airborne && bounce.launch_vy > 0.0 {
        defender.airborne = true;
        defender.vy = bounce.launch_vy;
    }
}

/// Applies horizontal pushback away from the attacker on a confirmed hit or
/// block.
pub fn apply_pushback(defender: &mut Character, attacker_facing: i8, amount: f32) {
    defender.x += attacker_facing as f32 * amount;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::moves::default_move_table;

    #[test]
    fn combo_scaling_first_hit_is_full() {
        assert_eq!(combo_scalar(0), 1.0);
    }

    #[test]
    fn combo_scaling_decreases_per_hit() {
        let second = combo_scalar(1);
        let third = combo_scalar(2);
        assert!((second - 0.8).abs() < 1e-5);
        assert!(third < second);
    }

    #[test]
    fn counter_hit_increases_damage() {
        let table = default_move_table();
        let mv = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let defender = Character::new("b", 0.0, -1, 100.0);
        let normal = scaled_hit_damage(mv, &defender, false);
        let counter = scaled_hit_damage(mv, &defender, true);
        assert!(counter > normal);
    }

    #[test]
    fn juggle_scalar_floors_past_limit() {
        let table = default_move_table();
        let mv = table.get(crate::kernel::moves::MoveId::HeavyPunch).unwrap();
        let mut defender = Character::new("b", 0.0, -1, 100.0);
        defender.airborne = true;
        defender.juggle_points = 0.0;
        let first = scaled_hit_damage(mv, &defender, false);
        defender.juggle_points = 1000.0;
        let later = scaled_hit_damage(mv, &defender, false);
        assert!(later < first);
    }

    #[test]
    fn hitstop_caps_at_fourteen() {
        assert_eq!(hitstop_for_hit(1000.0, true), 14);
    }

    #[test]
    fn hitstop_small_hit_is_baseline_four() {
        assert_eq!(hitstop_for_hit(1.0, false), 4);
    }

    #[test]
    fn block_consumes_guard_and_deals_chip() {
        let table = default_move_table();
        let mv = table.get(crate::kernel::moves::MoveId::MediumPunch).unwrap();
        let mut guard = 100.0;
        let outcome = resolve_block(mv, &mut guard);
        assert!(!outcome.guard_crushed);
        assert!(guard < 100.0);
        assert!(outcome.chip_damage > 0.0);
    }

    #[test]
    fn block_breaks_guard_when_meter_too_low() {
        let table = default_move_table();
        let mv = table.get(crate::kernel::moves::MoveId::HeavyKick).unwrap();
        let mut guard = 1.0;
        let outcome = resolve_block(mv, &mut guard);
        assert!(outcome.guard_crushed);
        assert_eq!(guard, 100.0);
        assert!(outcome.chip_damage >= GUARD_CRUSH_BONUS_CHIP);
    }

    #[test]
    fn launch_sets_airborne_with_bounce_velocity() {
        let mut defender = Character::new("b", 0.0, -1, 100.0);
        apply_launch(&mut defender, BounceData { launch_vy: 5.0, causes_bounce: false });
        assert!(defender.airborne);
        assert_eq!(defender.vy, 5.0);
    }

    #[test]
    fn pushback_moves_defender_away_from_attacker() {
        let mut defender = Character::new("b", 0.0, -1, 100.0);
        apply_pushback(&mut defender, 1, 0.5);
        assert_eq!(defender.x, 0.5);
    }
}
