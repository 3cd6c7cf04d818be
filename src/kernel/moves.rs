//! Move data tables.
//!
//! `spec.md` §9 ("Open questions in the source") leaves the parry, cancel,
//! and juggle tables as implementer-documented inputs: "this spec fixes the
//! algorithm but leaves the tables as inputs. Implementers MUST document the
//! exact tables they adopt." The concrete roster and every table value
//! adopted here are recorded in `DESIGN.md` under "Open Question decisions".

use serde::{Deserialize, Serialize};

use crate::kernel::state::{CancelOutcome, MovePhase};

/// Identifies one move in the roster. A plain enum rather than a string:
/// moves are a small, closed, build-time-known set, and the kernel's cancel
/// and juggle tables index by this type directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum MoveId {
    /// Light punch — fast poke, safe on block.
    LightPunch,
    /// Medium punch — mid-speed, combo starter.
    MediumPunch,
    /// Heavy punch — slow, high damage, launches airborne on counter-hit.
    HeavyPunch,
    /// Light kick — fast, good anti-air.
    LightKick,
    /// Medium kick — mid-speed sweep, knocks down.
    MediumKick,
    /// Heavy kick — slow, high damage, strong pushback.
    HeavyKick,
    /// Hadoken — projectile special.
    Hadoken,
    /// Shoryuken — rising uppercut special, invulnerable on startup, launches on hit.
    Shoryuken,
    /// Tatsumaki — spinning kick special, hits airborne opponents, armored on startup.
    Tatsumaki,
}

impl MoveId {
    /// Resolves the move the given (already-decoded) input selects, in the
    /// fixed priority order from `spec.md` §4.3.2: "heavy > medium > light,
    /// punch before kick only as a tie-break", with motion specials taking
    /// priority over normals since they require a harder-to-execute input.
    #[must_use]
    pub fn resolve_from_input(input: crate::input::PlayerInput) -> Option<MoveId> {
        if input.hadoken {
            return Some(MoveId::Hadoken);
        }
        if input.shoryuken {
            return Some(MoveId::Shoryuken);
        }
        if input.tatsumaki {
            return Some(MoveId::Tatsumaki);
        }
        if input.heavy_punch {
            return Some(MoveId::HeavyPunch);
        }
        if input.heavy_kick {
            return Some(MoveId::HeavyKick);
        }
        if input.medium_punch {
            return Some(MoveId::MediumPunch);
        }
        if input.medium_kick {
            return Some(MoveId::MediumKick);
        }
        if input.light_punch {
            return Some(MoveId::LightPunch);
        }
        if input.light_kick {
            return Some(MoveId::LightKick);
        }
        None
    }

    /// `true` for the three normals that fall under the fallback cancel
    /// chain light -> medium -> heavy (`spec.md` §4.3.5).
    #[must_use]
    pub const fn is_punch_normal(self) -> bool {
        matches!(self, MoveId::LightPunch | MoveId::MediumPunch | MoveId::HeavyPunch)
    }

    /// `true` for the three kick normals.
    #[must_use]
    pub const fn is_kick_normal(self) -> bool {
        matches!(self, MoveId::LightKick | MoveId::MediumKick | MoveId::HeavyKick)
    }

    /// `true` for the three motion specials.
    #[must_use]
    pub const fn is_special(self) -> bool {
        matches!(self, MoveId::Hadoken | MoveId::Shoryuken | MoveId::Tatsumaki)
    }
}

/// Axis-aligned hit or hurt box, relative to the owning character's `(x, y)`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Horizontal half-extent.
    pub half_width: f32,
    /// Vertical half-extent.
    pub half_height: f32,
    /// Horizontal offset from the character's origin, mirrored by facing.
    pub offset_x: f32,
    /// Vertical offset from the character's origin.
    pub offset_y: f32,
}

impl Aabb {
    /// The coarse fallback box used when a move declares no per-frame data
    /// (`spec.md` §4.3.3).
    pub const COARSE: Aabb = Aabb {
        half_width: crate::kernel::state::COARSE_HALF_WIDTH,
        half_height: crate::kernel::state::COARSE_HALF_HEIGHT,
        offset_x: 0.0,
        offset_y: crate::kernel::state::COARSE_HALF_HEIGHT,
    };

    /// World-space center of this box for a character at `(x, y)` facing `facing`.
    #[must_use]
    pub fn center(self, x: f32, y: f32, facing: i8) -> (f32, f32) {
        (x + self.offset_x * facing as f32, y + self.offset_y)
    }

    /// `true` if two boxes, anchored at the given character positions and
    /// facings, overlap.
    #[must_use]
    pub fn overlaps(self, x_a: f32, y_a: f32, facing_a: i8, other: Aabb, x_b: f32, y_b: f32, facing_b: i8) -> bool {
        let (ax, ay) = self.center(x_a, y_a, facing_a);
        let (bx, by) = other.center(x_b, y_b, facing_b);
        (ax - bx).abs() < self.half_width + other.half_width
            && (ay - by).abs() < self.half_height + other.half_height
    }
}

/// Per-index juggle damage scalar, looked up by `floor(juggle_points / juggle_add)`.
/// The last entry is reused for any index beyond the table's length.
pub type JuggleScalingTable = &'static [f32];

/// One entry in a move's cancel table (`spec.md` §4.3.5).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRule {
    /// The phase the attacker must be in to cancel.
    pub from: MovePhase,
    /// The outcome (hit/block) that must have occurred, or "any" via
    /// `on: None` meaning the rule applies regardless of `cancel_outcome`.
    pub on: Option<CancelOutcome>,
    /// Moves this rule allows canceling into.
    pub targets: &'static [MoveId],
}

/// Launch/bounce behavior applied on a successful hit (`spec.md` §4.3.6).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BounceData {
    /// Upward velocity imparted when this hit launches the defender airborne.
    pub launch_vy: f32,
    /// `true` if a hit while the defender is already airborne triggers a
    /// ground/wall bounce instead of simply continuing the fall.
    pub causes_bounce: bool,
}

/// All static data describing one move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    /// Startup frame count.
    pub startup: u16,
    /// Active frame count.
    pub active: u16,
    /// Recovery frame count.
    pub recovery: u16,
    /// Base damage before scaling.
    pub damage: f32,
    /// Hitbox active while in the `Active` phase. `None` means the coarse AABB.
    pub hitbox: Option<Aabb>,
    /// Hurtbox for the owner while executing this move. `None` means the coarse AABB.
    pub hurtbox: Option<Aabb>,
    /// Frames (relative to `current_frame`, inclusive range) during which
    /// the owner is invulnerable to being hit, e.g. Shoryuken's rising startup.
    pub invuln_frames: Option<(u16, u16)>,
    /// Number of hits this move's armor absorbs, if it grants armor at all.
    pub armor_hits: u8,
    /// Juggle points added to the defender if this hit connects while they're airborne.
    pub juggle_add: f32,
    /// Juggle point threshold beyond which the minimum 0.25 scalar applies
    /// (`spec.md` §4.3.6) absent a more specific table entry.
    pub juggle_limit: f32,
    /// Optional finer-grained per-index juggle scaling table.
    pub juggle_table: JuggleScalingTable,
    /// This move's cancel table. Empty means "use the fallback rule"
    /// (`spec.md` §4.3.5: light->medium->heavy chain plus any special, never from recovery).
    pub cancel_table: &'static [CancelRule],
    /// Launch/bounce metadata applied on hit.
    pub bounce: BounceData,
}

/// A full table of move data, keyed by [`MoveId`].
pub struct MoveTable {
    entries: Vec<(MoveId, MoveData)>,
}

impl MoveTable {
    /// Looks up a move's static data.
    #[must_use]
    pub fn get(&self, id: MoveId) -> Option<&MoveData> {
        self.entries.iter().find(|(k, _)| *k == id).map(|(_, v)| v)
    }
}

const EMPTY_CANCELS: &[CancelRule] = &[];
const EMPTY_JUGGLE_TABLE: JuggleScalingTable = &[];

const SHORYUKEN_CANCELS: &[CancelRule] = &[CancelRule {
    from: MovePhase::Startup,
    on: None,
    targets: &[],
}];

/// The built-in move roster shared by both characters.
///
/// Values below are this implementation's concrete choice for the tables
/// `spec.md` leaves open; see `DESIGN.md`. Frame counts and damage are
/// chosen to be internally consistent (heavier moves are slower and deal
/// more damage; specials are slower still but carry unique properties)
/// rather than sourced from any specific real fighting game.
#[must_use]
pub fn default_move_table() -> MoveTable {
    MoveTable {
        entries: vec![
            (
                MoveId::LightPunch,
                MoveData {
                    startup: 3,
                    active: 2,
                    recovery: 6,
                    damage: 20.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 1.0,
                    juggle_limit: 4.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData::default(),
                },
            ),
            (
                MoveId::MediumPunch,
                MoveData {
                    startup: 6,
                    active: 3,
                    recovery: 10,
                    damage: 45.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 1.0,
                    juggle_limit: 4.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData::default(),
                },
            ),
            (
                MoveId::HeavyPunch,
                MoveData {
                    startup: 10,
                    active: 4,
                    recovery: 18,
                    damage: 90.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 2.0,
                    juggle_limit: 3.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData { launch_vy: 3.5, causes_bounce: false },
                },
            ),
            (
                MoveId::LightKick,
                MoveData {
                    startup: 4,
                    active: 2,
                    recovery: 7,
                    damage: 22.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 1.0,
                    juggle_limit: 4.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData::default(),
                },
            ),
            (
                MoveId::MediumKick,
                MoveData {
                    startup: 7,
                    active: 3,
                    recovery: 12,
                    damage: 48.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 1.0,
                    juggle_limit: 4.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData::default(),
                },
            ),
            (
                MoveId::HeavyKick,
                MoveData {
                    startup: 11,
                    active: 4,
                    recovery: 20,
                    damage: 95.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 2.0,
                    juggle_limit: 3.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData { launch_vy: 2.0, causes_bounce: true },
                },
            ),
            (
                MoveId::Hadoken,
                MoveData {
                    startup: 13,
                    active: 2,
                    recovery: 24,
                    damage: 60.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 0,
                    juggle_add: 1.0,
                    juggle_limit: 4.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData::default(),
                },
            ),
            (
                MoveId::Shoryuken,
                MoveData {
                    startup: 3,
                    active: 8,
                    recovery: 28,
                    damage: 110.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: Some((0, 5)),
                    armor_hits: 0,
                    juggle_add: 3.0,
                    juggle_limit: 2.0,
                    juggle_table: &[1.0, 0.6, 0.4],
                    cancel_table: SHORYUKEN_CANCELS,
                    bounce: BounceData { launch_vy: 5.0, causes_bounce: false },
                },
            ),
            (
                MoveId::Tatsumaki,
                MoveData {
                    startup: 8,
                    active: 10,
                    recovery: 16,
                    damage: 70.0,
                    hitbox: None,
                    hurtbox: None,
                    invuln_frames: None,
                    armor_hits: 1,
                    juggle_add: 1.5,
                    juggle_limit: 3.0,
                    juggle_table: EMPTY_JUGGLE_TABLE,
                    cancel_table: EMPTY_CANCELS,
                    bounce: BounceData { launch_vy: 1.0, causes_bounce: true },
                },
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PlayerInput;

    #[test]
    fn priority_heavy_beats_medium_beats_light() {
        let input = PlayerInput {
            light_punch: true,
            medium_punch: true,
            heavy_punch: true,
            ..Default::default()
        };
        assert_eq!(MoveId::resolve_from_input(input), Some(MoveId::HeavyPunch));
    }

    #[test]
    fn priority_punch_before_kick_tiebreak() {
        let input = PlayerInput {
            light_punch: true,
            light_kick: true,
            ..Default::default()
        };
        assert_eq!(MoveId::resolve_from_input(input), Some(MoveId::LightPunch));
    }

    #[test]
    fn specials_outrank_normals() {
        let input = PlayerInput {
            heavy_punch: true,
            hadoken: true,
            ..Default::default()
        };
        assert_eq!(MoveId::resolve_from_input(input), Some(MoveId::Hadoken));
    }

    #[test]
    fn no_input_resolves_to_none() {
        assert_eq!(MoveId::resolve_from_input(PlayerInput::default()), None);
    }

    #[test]
    fn default_table_has_all_nine_moves() {
        let table = default_move_table();
        for id in [
            MoveId::LightPunch,
            MoveId::MediumPunch,
            MoveId::HeavyPunch,
            MoveId::LightKick,
            MoveId::MediumKick,
            MoveId::HeavyKick,
            MoveId::Hadoken,
            MoveId::Shoryuken,
            MoveId::Tatsumaki,
        ] {
            assert!(table.get(id).is_some(), "missing move data for {id:?}");
        }
    }

    #[test]
    fn heavier_normals_deal_more_damage_than_lighter() {
        let table = default_move_table();
        let light = table.get(MoveId::LightPunch).unwrap().damage;
        let medium = table.get(MoveId::MediumPunch).unwrap().damage;
        let heavy = table.get(MoveId::HeavyPunch).unwrap().damage;
        assert!(light < medium);
        assert!(medium < heavy);
    }

    #[test]
    fn aabb_overlap_detects_touching_characters() {
        let a = Aabb::COARSE;
        assert!(a.overlaps(0.0, 0.0, 1, a, 1.0, 0.0, -1));
        assert!(!a.overlaps(0.0, 0.0, 1, a, 10.0, 0.0, -1));
    }
}
