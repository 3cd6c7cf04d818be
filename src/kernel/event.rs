//! Per-frame timeline events emitted by [`crate::kernel::step`] (`spec.md` §4.3.6).
//!
//! Events are an observation channel, not a control channel: the kernel
//! never reads its own timeline back, so `step` can append freely without
//! affecting determinism of the next call.

use serde::{Deserialize, Serialize};

use crate::kernel::moves::MoveId;
use crate::{Frame, Side};

/// One noteworthy thing that happened during a single call to
/// [`crate::kernel::step`].
///
/// `#[non_exhaustive]` so that new event kinds (e.g. a future throw or
/// wakeup-invulnerability system) can be added without breaking hosts that
/// match on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TimelineEvent {
    /// `attacker`'s move connected against `defender` as a confirmed hit.
    Hit {
        /// Frame the hit occurred on.
        frame: Frame,
        /// The side whose move connected.
        attacker: Side,
        /// The side that was hit.
        defender: Side,
        /// Which move connected.
        mv: MoveId,
        /// Damage actually applied, after all scaling.
        damage: f32,
        /// `true` if this hit landed while `defender` had no prior combo hits this string.
        counter_hit: bool,
    },
    /// `attacker`'s move was blocked by `defender`.
    Block {
        /// Frame the block occurred on.
        frame: Frame,
        /// The side whose move was blocked.
        attacker: Side,
        /// The side that blocked.
        defender: Side,
        /// Which move was blocked.
        mv: MoveId,
        /// Chip damage applied to `defender`'s guard meter or health.
        chip_damage: f32,
    },
    /// `defender` parried `attacker`'s move during the parry window.
    Parry {
        /// Frame the parry occurred on.
        frame: Frame,
        /// The side whose move was parried.
        attacker: Side,
        /// The side that parried.
        defender: Side,
        /// Which move was parried.
        mv: MoveId,
    },
    /// Both characters' active hitboxes connected on the same frame.
    Clash {
        /// Frame the clash occurred on.
        frame: Frame,
        /// The two sides involved (order is not meaningful).
        sides: [Side; 2],
    },
    /// `defender`'s guard meter was depleted by a blocked hit, breaking guard.
    GuardCrush {
        /// Frame the guard crush occurred on.
        frame: Frame,
        /// The side whose guard broke.
        defender: Side,
    },
    /// `loser`'s health reached zero.
    Ko {
        /// Frame the KO occurred on.
        frame: Frame,
        /// The side that was defeated.
        loser: Side,
    },
    /// A non-fatal condition worth surfacing to the host without aborting
    /// the simulation, e.g. a replay input gap filled by repeating the last
    /// known input (`spec.md` §6: replay gaps are warnings, not errors).
    Warning {
        /// Frame the condition was observed on.
        frame: Frame,
        /// Human-readable description of the condition.
        message: &'static str,
    },
}

impl TimelineEvent {
    /// The frame this event was recorded on, regardless of variant.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        match self {
            TimelineEvent::Hit { frame, .. }
            | TimelineEvent::Block { frame, .. }
            | TimelineEvent::Parry { frame, .. }
            | TimelineEvent::Clash { frame, .. }
            | TimelineEvent::GuardCrush { frame, .. }
            | TimelineEvent::Ko { frame, .. }
            | TimelineEvent::Warning { frame, .. } => *frame,
        }
    }
}
