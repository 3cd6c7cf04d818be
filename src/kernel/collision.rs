//! Hit resolution: the ordered parry -> invulnerability -> block -> armor ->
//! hit pass run once per frame (`spec.md` §4.3.6).

use crate::kernel::moves::{Aabb, MoveData, MoveTable};
use crate::kernel::state::{Character, CharacterState, MoveInstance, MovePhase};
use crate::{PlayerInput, Side};

/// The resolved outcome of one character's active hitbox meeting the other's
/// hurtbox this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The defender had no overlapping hitbox/hurtbox this frame; nothing happened.
    NoContact,
    /// The defender parried (held guard during the parry window and the
    /// attack's first active frame).
    Parried,
    /// The attacker's hit was absorbed entirely by the defender's invulnerability.
    Invulnerable,
    /// The defender was holding guard away from the attacker and blocked.
    Blocked,
    /// The defender's armor absorbed the hit without interrupting their move.
    Armored,
    /// The hit connected.
    Hit,
}

/// `true` if `defender` is holding a direction consistent with blocking
/// `attacker` (holding back relative to `attacker`'s position), per
/// `spec.md` §4.3.6's block condition.
#[must_use]
pub fn is_holding_guard(defender_input: PlayerInput, defender: &Character, attacker: &Character) -> bool {
    let attacker_is_to_the_right = attacker.x > defender.x;
    if attacker_is_to_the_right {
        defender_input.left
    } else {
        defender_input.right
    }
}

/// `true` if `defender` is pressing the direction **toward** `attacker`,
/// the parry input (`spec.md` §4.3.3 step 1, §8 scenario 1, glossary
/// "Parry: pressing the forward direction"). This is the mirror image of
/// [`is_holding_guard`], not an alias of it: parrying and blocking are
/// opposite directional inputs, and a defender cannot do both at once.
#[must_use]
pub fn is_holding_toward(defender_input: PlayerInput, defender: &Character, attacker: &Character) -> bool {
    let attacker_is_to_the_right = attacker.x > defender.x;
    if attacker_is_to_the_right {
        defender_input.right
    } else {
        defender_input.left
    }
}

/// Determines whether the attacker's currently-active move's hitbox
/// overlaps the defender's hurtbox this frame.
#[must_use]
pub fn hitbox_overlaps(attacker: &Character, attacker_move: &MoveData, defender: &Character, defender_move: Option<&MoveData>) -> bool {
    let hitbox = attacker_move.hitbox.unwrap_or(Aabb::COARSE);
    let hurtbox = defender_move.and_then(|m| m.hurtbox).unwrap_or(Aabb::COARSE);
    hitbox.overlaps(attacker.x, attacker.y, attacker.facing, hurtbox, defender.x, defender.y, defender.facing)
}

/// Resolves one potential attacker-to-defender contact for the current
/// frame, applying the fixed priority order from `spec.md` §4.3.6:
/// parry > invulnerability > block > armor > hit.
#[must_use]
pub fn resolve_contact(
    attacker: &Character,
    attacker_mv: MoveInstance,
    attacker_move_data: &MoveData,
    defender: &Character,
    defender_move: Option<(MoveInstance, &MoveData)>,
    defender_input: PlayerInput,
    defender_is_parrying: bool,
) -> Resolution {
    if attacker_mv.phase != MovePhase::Active {
        return Resolution::NoContact;
    }
    let defender_move_data = defender_move.map(|(_, data)| data);
    if !hitbox_overlaps(attacker, attacker_move_data, defender, defender_move_data) {
        return Resolution::NoContact;
    }

    if defender_is_parrying {
        return Resolution::Parried;
    }

    if let Some((mv, data)) = defender_move {
        if let Some((start, end)) = data.invuln_frames {
            if mv.current_frame >= start && mv.current_frame <= end {
                return Resolution::Invulnerable;
            }
        }
    }

    if matches!(defender.state, CharacterState::Idle | CharacterState::Walking | CharacterState::Blockstun)
        && is_holding_guard(defender_input, defender, attacker)
    {
        return Resolution::Blocked;
    }

    if defender.armor_hits_remaining > 0 {
        return Resolution::Armored;
    }

    Resolution::Hit
}

/// Looks up the attacker's active move data if they are currently attacking.
#[must_use]
pub fn active_move_data<'a>(character: &Character, table: &'a MoveTable) -> Option<(MoveInstance, &'a MoveData)> {
    let mv = character.current_move?;
    table.get(mv.name).map(|data| (mv, data))
}

/// Both sides attacked and connected on the very same frame: `spec.md`
/// §4.3.6's clash rule resolves to mutual interruption, no damage exchanged.
#[must_use]
pub fn is_mutual_clash(p0_hits: bool, p1_hits: bool) -> bool {
    p0_hits && p1_hits
}

/// Identifies which side, if either, is on the receiving end of a contact,
/// used by the kernel's orchestration step to know whose damage/hitstun to apply.
#[must_use]
pub const fn other_side(side: Side) -> Side {
    side.opponent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::moves::default_move_table;

    #[test]
    fn no_contact_when_not_active() {
        let table = default_move_table();
        let data = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let attacker = Character::new("a", -1.0, 1, 100.0);
        let defender = Character::new("b", 1.0, -1, 100.0);
        let mv = MoveInstance {
            name: crate::kernel::moves::MoveId::LightPunch,
            current_frame: 0,
            phase: MovePhase::Startup,
        };
        let result = resolve_contact(&attacker, mv, data, &defender, None, PlayerInput::default(), false);
        assert_eq!(result, Resolution::NoContact);
    }

    #[test]
    fn parry_takes_priority_over_block() {
        let table = default_move_table();
        let data = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let attacker = Character::new("a", 0.0, 1, 100.0);
        let defender = Character::new("b", 0.3, -1, 100.0);
        let mv = MoveInstance {
            name: crate::kernel::moves::MoveId::LightPunch,
            current_frame: 3,
            phase: MovePhase::Active,
        };
        let input = PlayerInput {
            left: true,
            ..Default::default()
        };
        let result = resolve_contact(&attacker, mv, data, &defender, None, input, true);
        assert_eq!(result, Resolution::Parried);
    }

    #[test]
    fn block_when_holding_away_and_not_parrying() {
        let table = default_move_table();
        let data = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let attacker = Character::new("a", 0.0, 1, 100.0);
        let defender = Character::new("b", 0.3, -1, 100.0);
        let mv = MoveInstance {
            name: crate::kernel::moves::MoveId::LightPunch,
            current_frame: 3,
            phase: MovePhase::Active,
        };
        let input = PlayerInput {
            left: true,
            ..Default::default()
        };
        let result = resolve_contact(&attacker, mv, data, &defender, None, input, false);
        assert_eq!(result, Resolution::Blocked);
    }

    #[test]
    fn hit_when_not_guarding() {
        let table = default_move_table();
        let data = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let attacker = Character::new("a", 0.0, 1, 100.0);
        let defender = Character::new("b", 0.3, -1, 100.0);
        let mv = MoveInstance {
            name: crate::kernel::moves::MoveId::LightPunch,
            current_frame: 3,
            phase: MovePhase::Active,
        };
        let result = resolve_contact(&attacker, mv, data, &defender, None, PlayerInput::default(), false);
        assert_eq!(result, Resolution::Hit);
    }

    #[test]
    fn armor_absorbs_before_hit() {
        let table = default_move_table();
        let data = table.get(crate::kernel::moves::MoveId::LightPunch).unwrap();
        let attacker = Character::new("a", 0.0, 1, 100.0);
        let mut defender = Character::new("b", 0.3, -1, 100.0);
        defender.armor_hits_remaining = 1;
        let mv = MoveInstance {
            name: crate::kernel::moves::MoveId::LightPunch,
            current_frame: 3,
            phase: MovePhase::Active,
        };
        let result = resolve_contact(&attacker, mv, data, &defender, None, PlayerInput::default(), false);
        assert_eq!(result, Resolution::Armored);
    }

    #[test]
    fn mutual_clash_requires_both_sides_hitting() {
        assert!(is_mutual_clash(true, true));
        assert!(!is_mutual_clash(true, false));
    }
}
