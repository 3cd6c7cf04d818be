//! Movement and airborne physics (`spec.md` §4.3.1 steps 2–3, §4.3.7).

use crate::kernel::event::TimelineEvent;
use crate::kernel::state::{
    Character, CharacterState, Projectile, AIR_FRICTION, BOUNCE_FACTOR, GRAVITY,
    GROUND_BOUNCE_LANDING_THRESHOLD, STAGE_HALF_WIDTH, WALK_SPEED,
};
use crate::{Frame, PlayerInput, Side};

/// Applies one frame of ground/air movement from held directional input.
///
/// Only actionable characters (`Idle`/`Walking`) respond to directional
/// input; attacking, stunned, or KO'd characters keep their existing
/// velocity and simply integrate position (`spec.md` §4.3.1 step 2: "movement
/// only applies while idle or walking").
pub fn apply_movement(character: &mut Character, input: PlayerInput, opponent_x: f32) {
    if character.state.is_actionable_idle() && !character.airborne {
        let moving_left = input.left && !input.right;
        let moving_right = input.right && !input.left;
        character.vx = if moving_right {
            WALK_SPEED
        } else if moving_left {
            -WALK_SPEED
        } else {
            0.0
        };
        character.state = if moving_left || moving_right {
            CharacterState::Walking
        } else {
            CharacterState::Idle
        };
        // Face the opponent whenever idle or walking, per spec.md's
        // "characters always face each other while grounded and neutral".
        character.facing = if opponent_x >= character.x { 1 } else { -1 };
    }
    character.x += character.vx;
    character.x = character.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);
}

/// Applies gravity, air friction, and ground/wall bounce resolution to an
/// airborne character (`spec.md` §4.3.7).
///
/// Returns the events generated (currently only a landing produces no event;
/// reserved for future wall-bounce telemetry).
pub fn apply_airborne_physics(character: &mut Character, frame: Frame, side: Side) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    if !character.airborne {
        return events;
    }

    character.vy -= GRAVITY;
    character.vx *= AIR_FRICTION;
    character.y += character.vy;
    character.x += character.vx;

    if character.x <= -STAGE_HALF_WIDTH || character.x >= STAGE_HALF_WIDTH {
        character.x = character.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);
        character.vx = -character.vx * BOUNCE_FACTOR;
    }

    if character.y <= 0.0 {
        character.y = 0.0;
        if character.vy.abs() < GROUND_BOUNCE_LANDING_THRESHOLD {
            character.vy = 0.0;
            character.airborne = false;
            if matches!(character.state, CharacterState::Hitstun) {
                character.state = CharacterState::Idle;
            }
        } else {
            character.vy = -character.vy * BOUNCE_FACTOR;
            events.push(TimelineEvent::Warning {
                frame,
                message: "ground bounce",
            });
        }
    }
    let _ = side;
    events
}

/// Resolves pushbox overlap between the two characters, per the
/// wall-priority rule: whichever character is closer to the stage edge it is
/// being pushed toward does not move; the other absorbs the full separation.
pub fn resolve_pushbox(p0: &mut Character, p1: &mut Character) {
    const MIN_SEPARATION: f32 = 1.0;
    let gap = p1.x - p0.x;
    let overlap = MIN_SEPARATION - gap.abs();
    if overlap <= 0.0 || p0.state == CharacterState::Ko || p1.state == CharacterState::Ko {
        return;
    }
    let push = overlap / 2.0;
    let p0_room = (p0.x - (-STAGE_HALF_WIDTH)).max(0.0);
    let p1_room = (STAGE_HALF_WIDTH - p1.x).max(0.0);

    if p0_room < push {
        // p0 pinned to the wall; p1 absorbs the full separation.
        p1.x += overlap - p0_room;
        p0.x = (-STAGE_HALF_WIDTH).max(p0.x);
    } else if p1_room < push {
        p0.x -= overlap - p1_room;
        p1.x = STAGE_HALF_WIDTH.min(p1.x);
    } else {
        p0.x -= push;
        p1.x += push;
    }
    p0.x = p0.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);
    p1.x = p1.x.clamp(-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH);
}

/// Advances all in-flight projectiles, removing any that have expired or
/// left the stage (`spec.md` §4.3.6 projectile lifecycle).
pub fn advance_projectiles(projectiles: &mut Vec<Projectile>) {
    for p in projectiles.iter_mut() {
        p.x += p.speed * p.dir as f32;
        p.lifetime = p.lifetime.saturating_sub(1);
    }
    projectiles.retain(|p| p.lifetime > 0 && p.x.abs() <= STAGE_HALF_WIDTH + 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_idle_character_does_not_drift() {
        let mut c = Character::new("a", 0.0, 1, 100.0);
        apply_movement(&mut c, PlayerInput::default(), 2.5);
        assert_eq!(c.x, 0.0);
        assert!(matches!(c.state, CharacterState::Idle));
    }

    #[test]
    fn holding_right_walks_and_faces_opponent() {
        let mut c = Character::new("a", 0.0, 1, 100.0);
        let input = PlayerInput {
            right: true,
            ..Default::default()
        };
        apply_movement(&mut c, input, 5.0);
        assert!(c.x > 0.0);
        assert!(matches!(c.state, CharacterState::Walking));
        assert_eq!(c.facing, 1);
    }

    #[test]
    fn movement_clamped_to_stage_bounds() {
        let mut c = Character::new("a", STAGE_HALF_WIDTH - 0.1, 1, 100.0);
        let input = PlayerInput {
            right: true,
            ..Default::default()
        };
        for _ in 0..10 {
            apply_movement(&mut c, input, STAGE_HALF_WIDTH);
        }
        assert!(c.x <= STAGE_HALF_WIDTH);
    }

    #[test]
    fn airborne_character_falls_and_lands() {
        let mut c = Character::new("a", 0.0, 1, 100.0);
        c.airborne = true;
        c.y = 1.0;
        c.vy = 0.0;
        for _ in 0..200 {
            apply_airborne_physics(&mut c, Frame::new(0), Side::P0);
            if !c.airborne {
                break;
            }
        }
        assert!(!c.airborne);
        assert_eq!(c.y, 0.0);
    }

    #[test]
    fn pushbox_separates_overlapping_characters() {
        let mut p0 = Character::new("a", 0.0, 1, 100.0);
        let mut p1 = Character::new("b", 0.5, -1, 100.0);
        resolve_pushbox(&mut p0, &mut p1);
        assert!((p1.x - p0.x).abs() >= 1.0 - 1e-4);
    }

    #[test]
    fn projectile_expires_after_lifetime() {
        let mut projectiles = vec![Projectile {
            owner: Side::P0,
            x: 0.0,
            y: 0.5,
            dir: 1,
            speed: 0.2,
            damage: 10.0,
            lifetime: 1,
        }];
        advance_projectiles(&mut projectiles);
        assert!(projectiles.is_empty());
    }
}
