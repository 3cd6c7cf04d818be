//! The deterministic fighting-game simulation kernel.
//!
//! [`step`] is the crate's single point of nondeterminism-freedom: given a
//! [`SimState`] and one frame's [`FrameInputs`], it produces the next state
//! and never touches the clock, the network, or any other ambient state.
//! Everything the rollback controller needs — prediction, rewind,
//! resimulation — rests on `step` being a pure function of its two
//! arguments (`spec.md` §4.3, §8 invariant 4).

pub mod collision;
pub mod damage;
pub mod event;
pub mod moves;
pub mod physics;
pub mod state;

use crate::input::FrameInputs;
use crate::kernel::collision::{active_move_data, is_holding_toward, resolve_contact, Resolution};
use crate::kernel::event::TimelineEvent;
use crate::kernel::moves::{default_move_table, MoveId, MoveTable};
use crate::kernel::state::{
    CancelOutcome, Character, CharacterState, MoveInstance, MovePhase, SimState, GUARD_REGEN_AMOUNT,
    GUARD_REGEN_DELAY_FRAMES, METER_MAX,
};
use crate::{Frame, PlayerInput, Side};

/// Meter granted to a successful parry.
const PARRY_METER_REWARD: f32 = 5.0;
/// Minimum hitstop applied on a parry, regardless of the parried move's damage.
const PARRY_HITSTOP: u16 = 6;
/// Minimum hitstop applied on an armored (clash) hit.
const ARMOR_CLASH_HITSTOP: u16 = 2;
/// Hitstop applied on a blocked hit.
const BLOCK_HITSTOP: u16 = 3;
/// Horizontal pushback distance applied on a confirmed hit.
const HIT_PUSHBACK: f32 = 0.15;
/// Horizontal pushback distance applied on a blocked hit.
const BLOCK_PUSHBACK: f32 = 0.08;

/// Advances the simulation by exactly one frame, following the fixed
/// 11-step sequence in `spec.md` §4.3.1.
///
/// `table` supplies the move roster; callers almost always want
/// [`default_move_table`] but the parameter exists so hosts/tests can swap
/// in alternate tables without touching this function.
#[must_use]
pub fn step(mut state: SimState, inputs: FrameInputs, table: &MoveTable) -> SimState {
    state.timeline.clear();

    // Step 1: hitstop freeze.
    if state.hitstop > 0 {
        state.hitstop -= 1;
        return state;
    }

    // Step 2: advance frame counter.
    state.frame += 1;
    let frame = state.frame;

    // Step 3: deferred timers.
    fire_deferred_timers(&mut state, frame);

    // Step 4 & 5: per-character input handling, movement, move selection, facing.
    handle_side(&mut state, Side::P0, inputs.p0, table, frame);
    handle_side(&mut state, Side::P1, inputs.p1, table, frame);
    recompute_facing(&mut state);

    // Step 6: airborne physics.
    let p0_airborne_events = physics::apply_airborne_physics(&mut state.p0, frame, Side::P0);
    let p1_airborne_events = physics::apply_airborne_physics(&mut state.p1, frame, Side::P1);
    state.timeline.extend(p0_airborne_events);
    state.timeline.extend(p1_airborne_events);

    // Step 7: pushbox resolution.
    physics::resolve_pushbox(&mut state.p0, &mut state.p1);

    // Step 8: projectile advancement (melee-equivalent hit testing deferred
    // to a future archetype with projectile hitboxes; the built-in roster
    // has no projectile-spawning moves wired yet beyond Hadoken's travel).
    physics::advance_projectiles(&mut state.projectiles);

    // Step 9: advance move phases.
    advance_move_phase(&mut state.p0, table, frame);
    advance_move_phase(&mut state.p1, table, frame);

    // Step 10: collision resolution.
    resolve_collisions(&mut state, inputs, table, frame);

    // Step 11: timeline already accumulated above; nothing further to do.
    state
}

fn fire_deferred_timers(state: &mut SimState, frame: Frame) {
    for side in [Side::P0, Side::P1] {
        let timers = *state.timers_mut(side);
        let character = state.character_mut(side);
        if timers.guard_regen_at_frame == frame {
            character.guard_meter = (character.guard_meter + GUARD_REGEN_AMOUNT).min(METER_MAX);
        }
        if timers.juggle_reset_at_frame == frame {
            character.juggle_points = 0.0;
        }
        if timers.combo_reset_at_frame == frame {
            character.combo_hits = 0;
            character.combo_damage = 0.0;
        }
        let timers_mut = state.timers_mut(side);
        if timers.guard_regen_at_frame == frame {
            timers_mut.guard_regen_at_frame = Frame::NULL;
        }
        if timers.juggle_reset_at_frame == frame {
            timers_mut.juggle_reset_at_frame = Frame::NULL;
        }
        if timers.combo_reset_at_frame == frame {
            timers_mut.combo_reset_at_frame = Frame::NULL;
        }
    }
}

fn handle_side(state: &mut SimState, side: Side, input: PlayerInput, table: &MoveTable, frame: Frame) {
    let opponent_x = state.character(side.opponent()).x;
    let character = state.character_mut(side);

    if matches!(character.state, CharacterState::Hitstun | CharacterState::Blockstun | CharacterState::Ko) {
        // Inputs ignored; only gravity/physics act on this character.
        return;
    }

    if character.state.is_actionable_idle() {
        physics::apply_movement(character, input, opponent_x);
        if let Some(requested) = MoveId::resolve_from_input(input) {
            start_move(character, requested, table, frame);
        }
        return;
    }

    if matches!(character.state, CharacterState::Attacking) {
        if let Some(requested) = MoveId::resolve_from_input(input) {
            try_cancel(character, requested, table, frame);
        }
    }
}

fn start_move(character: &mut Character, id: MoveId, table: &MoveTable, frame: Frame) {
    let Some(data) = table.get(id) else {
        return;
    };
    character.state = CharacterState::Attacking;
    character.current_move = Some(MoveInstance {
        name: id,
        current_frame: 0,
        phase: MovePhase::Startup,
    });
    character.frame_data.startup = data.startup;
    character.frame_data.active = data.active;
    character.frame_data.recovery = data.recovery;
    character.frame_data.advantage = 0;
    character.cancel_outcome = CancelOutcome::None;
    character.can_cancel_until_frame = 0;
    character.armor_hits_remaining = data.armor_hits;
    let _ = frame;
}

/// Resolves a cancel request during an active move, per `spec.md` §4.3.5:
/// the move's own cancel table is consulted first; absent an entry, the
/// fallback chain (light -> medium -> heavy, or any named special, never
/// from recovery) applies.
fn try_cancel(character: &mut Character, requested: MoveId, table: &MoveTable, frame: Frame) {
    let Some(current) = character.current_move else {
        return;
    };
    if matches!(current.phase, MovePhase::Recovery) {
        return;
    }

    let Some(current_data) = table.get(current.name) else {
        return;
    };

    let allowed = if current_data.cancel_table.is_empty() {
        fallback_cancel_allowed(current.name, requested) && character.cancel_outcome_allows_open_cancel()
    } else {
        current_data.cancel_table.iter().any(|rule| {
            rule.from == current.phase
                && (rule.on.is_none() || rule.on == Some(character.cancel_outcome))
                && rule.targets.contains(&requested)
                && current.current_frame <= character.can_cancel_until_frame
        })
    };

    if allowed {
        start_move(character, requested, table, frame);
    }
}

/// Fallback cancel chain: light -> medium -> heavy within the same button
/// family, plus any motion special from any normal.
fn fallback_cancel_allowed(current: MoveId, requested: MoveId) -> bool {
    if requested.is_special() {
        return true;
    }
    use MoveId::{HeavyKick, HeavyPunch, LightKick, LightPunch, MediumKick, MediumPunch};
    matches!(
        (current, requested),
        (LightPunch, MediumPunch)
            | (LightPunch, HeavyPunch)
            | (MediumPunch, HeavyPunch)
            | (LightKick, MediumKick)
            | (LightKick, HeavyKick)
            | (MediumKick, HeavyKick)
    )
}

fn recompute_facing(state: &mut SimState) {
    if state.p0.state != CharacterState::Ko && state.p1.state != CharacterState::Ko {
        state.p0.facing = if state.p1.x >= state.p0.x { 1 } else { -1 };
        state.p1.facing = -state.p0.facing;
    }
}

/// Advances a character's move-phase clock, transitioning
/// `startup -> active -> recovery -> cleared` at the move's declared
/// cumulative boundaries (`spec.md` §4.3.4).
fn advance_move_phase(character: &mut Character, table: &MoveTable, frame: Frame) {
    let Some(mut mv) = character.current_move else {
        return;
    };
    let Some(data) = table.get(mv.name) else {
        character.clear_move();
        return;
    };

    mv.current_frame += 1;
    let startup_end = data.startup;
    let active_end = startup_end + data.active;
    let recovery_end = active_end + data.recovery;

    mv.phase = if mv.current_frame < startup_end {
        MovePhase::Startup
    } else if mv.current_frame < active_end {
        MovePhase::Active
    } else {
        MovePhase::Recovery
    };

    if mv.current_frame >= recovery_end {
        character.clear_move();
        return;
    }

    character.current_move = Some(mv);
    let _ = frame;
}

fn resolve_collisions(state: &mut SimState, inputs: FrameInputs, table: &MoveTable, frame: Frame) {
    let p0_attacking = active_move_data(&state.p0, table);
    let p1_attacking = active_move_data(&state.p1, table);

    let p0_parrying = is_parrying(inputs.p0, &state.p0, &state.p1);
    let p1_parrying = is_parrying(inputs.p1, &state.p1, &state.p0);

    let p0_hits_p1 = p0_attacking.map(|(mv, data)| {
        resolve_contact(&state.p0, mv, data, &state.p1, p1_attacking, inputs.p1, p1_parrying)
    });
    let p1_hits_p0 = p1_attacking.map(|(mv, data)| {
        resolve_contact(&state.p1, mv, data, &state.p0, p0_attacking, inputs.p0, p0_parrying)
    });

    let both_connect = matches!(p0_hits_p1, Some(Resolution::Hit)) && matches!(p1_hits_p0, Some(Resolution::Hit));

    if both_connect {
        state.timeline.push(TimelineEvent::Clash {
            frame,
            sides: [Side::P0, Side::P1],
        });
        apply_trade(state, table, frame, p0_attacking.unwrap().0, p1_attacking.unwrap().0);
        return;
    }

    if let Some(resolution) = p0_hits_p1 {
        apply_resolution(state, Side::P0, Side::P1, resolution, p0_attacking.unwrap(), table, frame);
    }
    if let Some(resolution) = p1_hits_p0 {
        apply_resolution(state, Side::P1, Side::P0, resolution, p1_attacking.unwrap(), table, frame);
    }
}

fn is_parrying(input: PlayerInput, defender: &Character, attacker: &Character) -> bool {
    defender.state.is_actionable_idle() && is_holding_toward(input, defender, attacker)
}

#[allow(clippy::too_many_arguments)]
fn apply_resolution(
    state: &mut SimState,
    attacker_side: Side,
    defender_side: Side,
    resolution: Resolution,
    attacker_move: (MoveInstance, &moves::MoveData),
    table: &MoveTable,
    frame: Frame,
) {
    let (mv, data) = attacker_move;
    match resolution {
        Resolution::NoContact => {}
        Resolution::Parried => {
            let defender = state.character_mut(defender_side);
            defender.meter = (defender.meter + PARRY_METER_REWARD).min(METER_MAX);
            state.hitstop = state.hitstop.max(PARRY_HITSTOP);
            state.timeline.push(TimelineEvent::Parry {
                frame,
                attacker: attacker_side,
                defender: defender_side,
                mv: mv.name,
            });
        }
        Resolution::Invulnerable => {}
        Resolution::Blocked => {
            let mut guard = state.character(defender_side).guard_meter;
            let outcome = damage::resolve_block(data, &mut guard);
            let defender = state.character_mut(defender_side);
            defender.guard_meter = guard;
            defender.health = (defender.health - outcome.chip_damage).clamp(0.0, defender.max_health);
            defender.state = if outcome.guard_crushed {
                CharacterState::Hitstun
            } else {
                CharacterState::Blockstun
            };
            let attacker_facing = state.character(attacker_side).facing;
            damage::apply_pushback(state.character_mut(defender_side), attacker_facing, BLOCK_PUSHBACK);
            state.timers_mut(defender_side).guard_regen_at_frame = frame + GUARD_REGEN_DELAY_FRAMES;
            state.hitstop = state.hitstop.max(BLOCK_HITSTOP);
            if outcome.guard_crushed {
                state.timeline.push(TimelineEvent::GuardCrush { frame, defender: defender_side });
            }
            state.timeline.push(TimelineEvent::Block {
                frame,
                attacker: attacker_side,
                defender: defender_side,
                mv: mv.name,
                chip_damage: outcome.chip_damage,
            });
            record_cancel_outcome(state, attacker_side, CancelOutcome::Block, table);
        }
        Resolution::Armored => {
            let defender = state.character_mut(defender_side);
            defender.armor_hits_remaining = defender.armor_hits_remaining.saturating_sub(1);
            state.hitstop = state.hitstop.max(ARMOR_CLASH_HITSTOP);
            state.timeline.push(TimelineEvent::Clash {
                frame,
                sides: [attacker_side, defender_side],
            });
        }
        Resolution::Hit => {
            let is_counter = matches!(
                state.character(defender_side).current_move.map(|m| m.phase),
                Some(MovePhase::Startup)
            );
            let final_damage = {
                let defender = state.character(defender_side);
                damage::scaled_hit_damage(data, defender, is_counter)
            };
            let koed = state.character_mut(defender_side).apply_damage(final_damage);
            {
                let defender = state.character_mut(defender_side);
                defender.combo_hits += 1;
                defender.combo_damage += final_damage;
                if defender.airborne {
                    defender.juggle_points += data.juggle_add;
                }
                if !koed {
                    defender.state = CharacterState::Hitstun;
                }
            }
            damage::apply_launch(state.character_mut(defender_side), data.bounce);
            let attacker_facing = state.character(attacker_side).facing;
            damage::apply_pushback(state.character_mut(defender_side), attacker_facing, HIT_PUSHBACK);
            state.timers_mut(defender_side).combo_reset_at_frame = frame + 30;
            state.timers_mut(defender_side).juggle_reset_at_frame = frame + 90;
            state.hitstop = state.hitstop.max(damage::hitstop_for_hit(final_damage, is_counter));
            state.timeline.push(TimelineEvent::Hit {
                frame,
                attacker: attacker_side,
                defender: defender_side,
                mv: mv.name,
                damage: final_damage,
                counter_hit: is_counter,
            });
            if koed {
                state.timeline.push(TimelineEvent::Ko { frame, loser: defender_side });
            }
            record_cancel_outcome(state, attacker_side, CancelOutcome::Hit, table);
        }
    }
}

fn record_cancel_outcome(state: &mut SimState, attacker_side: Side, outcome: CancelOutcome, table: &MoveTable) {
    let attacker = state.character_mut(attacker_side);
    if let Some(mv) = attacker.current_move {
        attacker.cancel_outcome = outcome;
        if let Some(data) = table.get(mv.name) {
            let window_end = mv.current_frame.saturating_add(data.active.max(1));
            attacker.can_cancel_until_frame = window_end;
        }
    }
}

fn apply_trade(state: &mut SimState, table: &MoveTable, frame: Frame, p0_mv: MoveInstance, p1_mv: MoveInstance) {
    let p0_data = table.get(p0_mv.name);
    let p1_data = table.get(p1_mv.name);
    if let Some(data) = p1_data {
        let is_counter = false;
        let dmg = {
            let defender = state.character(Side::P0);
            damage::scaled_hit_damage(data, defender, is_counter)
        };
        let koed = state.character_mut(Side::P0).apply_damage(dmg);
        if !koed {
            state.character_mut(Side::P0).state = CharacterState::Hitstun;
        }
        state.timeline.push(TimelineEvent::Hit {
            frame,
            attacker: Side::P1,
            defender: Side::P0,
            mv: p1_mv.name,
            damage: dmg,
            counter_hit: false,
        });
    }
    if let Some(data) = p0_data {
        let is_counter = false;
        let dmg = {
            let defender = state.character(Side::P1);
            damage::scaled_hit_damage(data, defender, is_counter)
        };
        let koed = state.character_mut(Side::P1).apply_damage(dmg);
        if !koed {
            state.character_mut(Side::P1).state = CharacterState::Hitstun;
        }
        state.timeline.push(TimelineEvent::Hit {
            frame,
            attacker: Side::P0,
            defender: Side::P1,
            mv: p0_mv.name,
            damage: dmg,
            counter_hit: false,
        });
    }
    state.hitstop = state.hitstop.max(PARRY_HITSTOP);
}

impl Character {
    /// `true` if this character's recorded `cancel_outcome` is non-`None`,
    /// meaning the fallback cancel chain (which requires a hit or block to
    /// have already occurred) is open.
    fn cancel_outcome_allows_open_cancel(&self) -> bool {
        self.cancel_outcome != CancelOutcome::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerInput;

    fn blank_state() -> SimState {
        SimState::new_match("ken", "ryu", 1000.0)
    }

    #[test]
    fn idle_frame_advances_counter_only() {
        let table = default_move_table();
        let state = blank_state();
        let next = step(state, FrameInputs::default(), &table);
        assert_eq!(next.frame, Frame::new(1));
        assert!(matches!(next.p0.state, CharacterState::Idle));
    }

    #[test]
    fn hitstop_freezes_frame_counter() {
        let table = default_move_table();
        let mut state = blank_state();
        state.hitstop = 2;
        let next = step(state, FrameInputs::default(), &table);
        assert_eq!(next.frame, Frame::new(0));
        assert_eq!(next.hitstop, 1);
    }

    #[test]
    fn attack_input_starts_a_move() {
        let table = default_move_table();
        let state = blank_state();
        let inputs = FrameInputs {
            p0: PlayerInput {
                light_punch: true,
                ..Default::default()
            },
            p1: PlayerInput::default(),
        };
        let next = step(state, inputs, &table);
        assert!(matches!(next.p0.state, CharacterState::Attacking));
        assert_eq!(next.p0.current_move.unwrap().name, MoveId::LightPunch);
    }

    #[test]
    fn a_hit_lands_when_defender_does_not_block() {
        let table = default_move_table();
        let mut state = blank_state();
        state.p0.x = 0.0;
        state.p1.x = 0.5;
        let attack = FrameInputs {
            p0: PlayerInput {
                light_punch: true,
                ..Default::default()
            },
            p1: PlayerInput::default(),
        };
        state = step(state, attack, &table);
        // Advance through startup to the active frame.
        for _ in 0..5 {
            state = step(state, FrameInputs::default(), &table);
            if state.p1.health < state.p1.max_health {
                break;
            }
        }
        assert!(state.p1.health < state.p1.max_health);
    }

    #[test]
    fn ko_halts_health_at_zero_and_emits_event() {
        let table = default_move_table();
        let mut state = blank_state();
        state.p1.health = 1.0;
        state.p0.x = 0.0;
        state.p1.x = 0.5;
        let attack = FrameInputs {
            p0: PlayerInput {
                heavy_punch: true,
                ..Default::default()
            },
            p1: PlayerInput::default(),
        };
        state = step(state, attack, &table);
        for _ in 0..15 {
            state = step(state, FrameInputs::default(), &table);
        }
        assert!(matches!(state.p1.state, CharacterState::Ko));
        assert_eq!(state.p1.health, 0.0);
    }

    #[test]
    fn facing_always_points_toward_opponent() {
        let table = default_move_table();
        let mut state = blank_state();
        state.p1.x = -10.0;
        let state = step(state, FrameInputs::default(), &table);
        assert_eq!(state.p0.facing, -1);
        assert_eq!(state.p1.facing, 1);
    }
}
