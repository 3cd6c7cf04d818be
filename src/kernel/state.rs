//! The authoritative per-frame simulation state (`spec.md` §3).

use serde::{Deserialize, Serialize};

use crate::kernel::event::TimelineEvent;
use crate::kernel::moves::MoveId;
use crate::{Frame, Side};

/// Half-width of the coarse AABB used when a move doesn't declare its own
/// hit/hurtboxes (`spec.md` §4.3.3).
pub const COARSE_HALF_WIDTH: f32 = 0.6;
/// Half-height of the coarse AABB.
pub const COARSE_HALF_HEIGHT: f32 = 1.0;

/// Horizontal half-extent of the stage. Characters are clamped to
/// `[-STAGE_HALF_WIDTH, STAGE_HALF_WIDTH]`.
pub const STAGE_HALF_WIDTH: f32 = 8.0;

/// Per-frame walk speed in stage units, divided by 60 per `spec.md` §4.3.2.
pub const WALK_SPEED: f32 = 4.0;

/// Gravity applied to airborne characters each frame (`vy -= GRAVITY`).
pub const GRAVITY: f32 = 0.2;
/// Horizontal air friction multiplier applied to airborne `vx` each frame.
pub const AIR_FRICTION: f32 = 0.98;
/// Scalar applied to `vx` on a wall bounce.
pub const BOUNCE_FACTOR: f32 = 0.6;
/// `vy` magnitude below which a ground bounce becomes a landing instead.
pub const GROUND_BOUNCE_LANDING_THRESHOLD: f32 = 0.5;

/// Frames after a blocked hit before guard regeneration begins.
pub const GUARD_REGEN_DELAY_FRAMES: i32 = 24;
/// Guard points restored per regen tick.
pub const GUARD_REGEN_AMOUNT: f32 = 5.0;
/// Maximum value of `guard_meter` / `meter`.
pub const METER_MAX: f32 = 100.0;

/// A character's current high-level action state (`spec.md` §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterState {
    /// Standing still, free to act.
    Idle,
    /// Walking, free to act.
    Walking,
    /// Executing a move (see [`MoveInstance`]).
    Attacking,
    /// Staggered by a confirmed hit; inputs ignored until the stun ends.
    Hitstun,
    /// Staggered by a blocked hit; inputs ignored until the stun ends.
    Blockstun,
    /// Defeated. Terminal: `spec.md` §4.3.7 — once entered, never left.
    Ko,
}

impl CharacterState {
    /// `Idle` or `Walking` — the two states from which movement and new
    /// moves may be initiated (`spec.md` §4.3.1 step 4).
    #[must_use]
    pub const fn is_actionable_idle(self) -> bool {
        matches!(self, CharacterState::Idle | CharacterState::Walking)
    }
}

/// Which phase of its lifecycle a move is currently in (`spec.md` §4.3.4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePhase {
    /// Before the move's hitbox becomes active.
    Startup,
    /// The move's hitbox is active and can connect.
    Active,
    /// After the hitbox deactivates, before the character can act again.
    Recovery,
}

/// What kind of outcome a defender's cancel table may react to (`spec.md` §4.3.5).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// No cancel-triggering outcome has occurred yet this move.
    None,
    /// The move connected as a hit.
    Hit,
    /// The move was blocked.
    Block,
}

/// The move a character is currently executing.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveInstance {
    /// Which move is being executed.
    pub name: MoveId,
    /// Frames elapsed since the move started (strictly increasing while attacking).
    pub current_frame: u16,
    /// The move's current lifecycle phase.
    pub phase: MovePhase,
}

/// Derived startup/active/recovery/advantage info for the active move,
/// recomputed each frame for external observers (`spec.md` §3 "derived frameData").
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameData {
    /// Startup frame count of the active move, if any.
    pub startup: u16,
    /// Active frame count of the active move, if any.
    pub active: u16,
    /// Recovery frame count of the active move, if any.
    pub recovery: u16,
    /// On-hit or on-block frame advantage, computed once the move resolves.
    pub advantage: i16,
}

/// One combatant's full state for a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identity for this character across the match.
    pub id: String,
    /// `+1` facing right, `-1` facing left.
    pub facing: i8,
    /// World-space position.
    pub x: f32,
    /// World-space position (height above ground).
    pub y: f32,
    /// World-space position (depth; unused by 2D collision, carried for parity with `spec.md`).
    pub z: f32,
    /// Horizontal velocity.
    pub vx: f32,
    /// Vertical velocity.
    pub vy: f32,
    /// `true` while `y > 0` or the character has not yet landed from a launch.
    pub airborne: bool,
    /// Current health, `0..=max_health`.
    pub health: f32,
    /// Maximum health.
    pub max_health: f32,
    /// Special meter, `0..=100`.
    pub meter: f32,
    /// Guard (chip/block) meter, `0..=100`.
    pub guard_meter: f32,
    /// High-level action state.
    pub state: CharacterState,
    /// The move being executed, if `state == Attacking`.
    pub current_move: Option<MoveInstance>,
    /// Derived frame data for UI/AI observers.
    pub frame_data: FrameData,
    /// Hits landed in the current combo.
    pub combo_hits: u32,
    /// Total damage dealt in the current combo.
    pub combo_damage: f32,
    /// Juggle points accumulated against this character while airborne.
    pub juggle_points: f32,
    /// Remaining hits this character's active armor will absorb.
    pub armor_hits_remaining: u8,
    /// What outcome the active move has produced so far, for cancel eligibility.
    pub cancel_outcome: CancelOutcome,
    /// The latest frame at which a cancel into a follow-up move is still legal.
    pub can_cancel_until_frame: u16,
}

impl Character {
    /// Creates a fresh, full-health character at the given starting position and facing.
    #[must_use]
    pub fn new(id: impl Into<String>, x: f32, facing: i8, max_health: f32) -> Self {
        Character {
            id: id.into(),
            facing,
            x,
            y: 0.0,
            z: 0.0,
            vx: 0.0,
            vy: 0.0,
            airborne: false,
            health: max_health,
            max_health,
            meter: 0.0,
            guard_meter: METER_MAX,
            state: CharacterState::Idle,
            current_move: None,
            frame_data: FrameData::default(),
            combo_hits: 0,
            combo_damage: 0.0,
            juggle_points: 0.0,
            armor_hits_remaining: 0,
            cancel_outcome: CancelOutcome::None,
            can_cancel_until_frame: 0,
        }
    }

    /// Clears the active move and returns the character to `Idle`
    /// (`spec.md` §4.3.4 "Clearing sets state <- idle and currentMove <- null").
    pub fn clear_move(&mut self) {
        self.current_move = None;
        self.frame_data = FrameData::default();
        self.cancel_outcome = CancelOutcome::None;
        self.can_cancel_until_frame = 0;
        if !matches!(self.state, CharacterState::Ko) {
            self.state = CharacterState::Idle;
        }
    }

    /// Applies damage, clamping health to `[0, max_health]` and transitioning
    /// to `Ko` on death (`spec.md` §3 invariant, §4.3.7).
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        self.health = (self.health - amount).clamp(0.0, self.max_health);
        if self.health <= 0.0 && !matches!(self.state, CharacterState::Ko) {
            self.state = CharacterState::Ko;
            self.current_move = None;
            true
        } else {
            false
        }
    }
}

/// Timers deferred to a future frame, keyed implicitly by side (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeferredTimers {
    /// Frame at which guard regen next ticks, or `Frame::NULL` if none scheduled.
    pub guard_regen_at_frame: Frame,
    /// Frame at which juggle points reset to zero, or `Frame::NULL` if none scheduled.
    pub juggle_reset_at_frame: Frame,
    /// Frame at which combo counters reset, or `Frame::NULL` if none scheduled.
    pub combo_reset_at_frame: Frame,
}

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Which side fired this projectile (it can only hit the opponent).
    pub owner: Side,
    /// Current horizontal position.
    pub x: f32,
    /// Current vertical position.
    pub y: f32,
    /// Direction of travel, `+1` or `-1`.
    pub dir: i8,
    /// Horizontal speed in units/frame.
    pub speed: f32,
    /// Damage on hit.
    pub damage: f32,
    /// Remaining lifetime in frames.
    pub lifetime: u16,
}

/// The complete authoritative state at a frame (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Monotone non-negative frame counter.
    pub frame: Frame,
    /// Remaining frames the simulation is paused for hit-feedback.
    pub hitstop: u16,
    /// Player 0's character.
    pub p0: Character,
    /// Player 1's character.
    pub p1: Character,
    /// Deferred timers, per side.
    pub timers: [DeferredTimers; 2],
    /// Projectiles currently in flight.
    pub projectiles: Vec<Projectile>,
    /// Events accumulated during the most recent `step`, consumed by external observers.
    pub timeline: Vec<TimelineEvent>,
}

impl SimState {
    /// Returns a fresh starting state: both characters at the default
    /// distance, facing each other, full health, frame 0.
    #[must_use]
    pub fn new_match(p0_id: impl Into<String>, p1_id: impl Into<String>, max_health: f32) -> Self {
        SimState {
            frame: Frame::new(0),
            hitstop: 0,
            p0: Character::new(p0_id, -2.5, Side::P0.starting_facing(), max_health),
            p1: Character::new(p1_id, 2.5, Side::P1.starting_facing(), max_health),
            timers: [DeferredTimers::default(); 2],
            projectiles: Vec::new(),
            timeline: Vec::new(),
        }
    }

    /// Mutable access to one side's character.
    #[must_use]
    pub fn character_mut(&mut self, side: Side) -> &mut Character {
        match side {
            Side::P0 => &mut self.p0,
            Side::P1 => &mut self.p1,
        }
    }

    /// Immutable access to one side's character.
    #[must_use]
    pub fn character(&self, side: Side) -> &Character {
        match side {
            Side::P0 => &self.p0,
            Side::P1 => &self.p1,
        }
    }

    /// Mutable access to one side's deferred timers.
    #[must_use]
    pub fn timers_mut(&mut self, side: Side) -> &mut DeferredTimers {
        match side {
            Side::P0 => &mut self.timers[0],
            Side::P1 => &mut self.timers[1],
        }
    }
}
