//! # Brawlback
//!
//! Brawlback is a deterministic rollback netcode engine for a 2D fighting
//! game: a fixed-timestep combat simulation kernel, an input codec, a
//! snapshot save/restore codec, and the peer-to-peer transport that carries
//! inputs between two players over a lossy, jittery channel.
//!
//! The crate is organized around the five components described in the
//! design documents, leaves first:
//!
//! - [`input`] — total bijection between [`input::PlayerInput`] and a 32-bit mask.
//! - [`snapshot`] — compact binary serialization of rollback-relevant state.
//! - [`kernel`] — the deterministic fighting-game state machine.
//! - [`network`] — the unreliable, jitter-tolerant peer transport.
//! - [`rollback`] — the frame clock, input history, and predict/rewind loop.
//!
//! [`session`] ties the above together behind a small host-facing API
//! (`NetcodeService`).
//!
//! Everything in this crate is pure, synchronous Rust: [`kernel::step`] never
//! suspends, and the only suspension points live in the transport's socket
//! adapter.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use error::NetcodeError;
pub use input::PlayerInput;
pub use kernel::event::TimelineEvent;
pub use kernel::state::{CancelOutcome, CharacterState, MovePhase, SimState};
pub use network::NonBlockingSocket;
pub use replay::{PlaybackResult, Replay, ReplayFrame, ReplayMeta, ReplayRecorder};
pub use rollback::controller::{RollbackController, RollbackStats};
pub use session::{NetcodeService, NetcodeServiceBuilder};
pub use snapshot::SnapshotBlob;

pub mod error;
pub mod input;
pub mod kernel;
pub mod network;
pub mod replay;
pub mod rollback;
pub mod session;
pub mod snapshot;
pub mod telemetry;

/// Internal module exposing implementation details for testing and
/// benchmarking.
///
/// # ⚠️ No Stability Guarantees
///
/// This module is not part of the public API and exists so that `tests/` and
/// `benches/` can exercise internal components (the resequencer, the input
/// queue, the snapshot ring) directly rather than only through
/// [`NetcodeService`]. Do not depend on it in game code.
#[doc(hidden)]
pub mod __internal {
    pub use crate::network::pacer::TokenBucket;
    pub use crate::network::resequencer::Resequencer;
    pub use crate::rollback::input_queue::InputQueue;
    pub use crate::rollback::snapshot_ring::SnapshotRing;
}

/// Internally, -1 represents no frame / uninitialized frame.
pub const NULL_FRAME: i32 = -1;

/// A frame is a single 1/60 s step of game execution.
///
/// `Frame` is a newtype around `i32` rather than a bare integer so that the
/// compiler catches places where a frame number is accidentally used as a
/// plain array index, input-queue slot, or duration. The special value
/// [`Frame::NULL`] represents "no frame" (e.g. a disconnected player's last
/// frame, or an as-yet-unconfirmed remote input).
///
/// # Examples
///
/// ```
/// use brawlback::Frame;
///
/// let frame = Frame::new(0);
/// assert!(frame.is_valid());
/// assert!(Frame::NULL.is_null());
///
/// let next = frame + 1;
/// assert_eq!(next.as_i32(), 1);
/// ```
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub struct Frame(i32);

impl Frame {
    /// The null frame constant, representing "no frame".
    pub const NULL: Frame = Frame(NULL_FRAME);

    /// Creates a new `Frame` from an `i32`. Does not validate the value;
    /// use [`Frame::is_valid`] to check.
    #[inline]
    #[must_use]
    pub const fn new(frame: i32) -> Self {
        Frame(frame)
    }

    /// Returns the underlying `i32`.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// `true` if this is [`Frame::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == NULL_FRAME
    }

    /// `true` if this frame is non-negative (a real, addressable frame).
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "NULL_FRAME")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl std::ops::Add<i32> for Frame {
    type Output = Frame;
    #[inline]
    fn add(self, rhs: i32) -> Self::Output {
        Frame(self.0 + rhs)
    }
}

impl std::ops::AddAssign<i32> for Frame {
    #[inline]
    fn add_assign(&mut self, rhs: i32) {
        self.0 += rhs;
    }
}

impl std::ops::Sub<i32> for Frame {
    type Output = Frame;
    #[inline]
    fn sub(self, rhs: i32) -> Self::Output {
        Frame(self.0 - rhs)
    }
}

impl std::ops::Sub<Frame> for Frame {
    type Output = i32;
    #[inline]
    fn sub(self, rhs: Frame) -> Self::Output {
        self.0 - rhs.0
    }
}

impl From<i32> for Frame {
    #[inline]
    fn from(value: i32) -> Self {
        Frame(value)
    }
}

impl From<Frame> for i32 {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

impl PartialEq<i32> for Frame {
    #[inline]
    fn eq(&self, other: &i32) -> bool {
        self.0 == *other
    }
}

/// Identifies one of the two players in a session.
///
/// Unlike a generic rollback library, Brawlback's kernel assumes exactly two
/// combatants (`spec.md` Non-goals: "more than two players"), so `Side` is a
/// closed two-variant enum rather than an open handle type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Side {
    /// Player 0 (conventionally the session's offerer in a WebRTC-style handshake).
    P0,
    /// Player 1 (conventionally the session's answerer).
    P1,
}

impl Side {
    /// Returns the opposing side.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Side {
        match self {
            Side::P0 => Side::P1,
            Side::P1 => Side::P0,
        }
    }

    /// Returns the starting facing direction for this side: `+1` for `P0`, `-1` for `P1`.
    #[inline]
    #[must_use]
    pub const fn starting_facing(self) -> i8 {
        match self {
            Side::P0 => 1,
            Side::P1 => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_null_is_negative_one() {
        assert_eq!(Frame::NULL.as_i32(), -1);
        assert!(Frame::NULL.is_null());
        assert!(!Frame::NULL.is_valid());
    }

    #[test]
    fn frame_arithmetic() {
        let f = Frame::new(10);
        assert_eq!((f + 5).as_i32(), 15);
        assert_eq!((f - 3).as_i32(), 7);
        assert_eq!(Frame::new(10) - Frame::new(4), 6);
    }

    #[test]
    fn frame_add_assign() {
        let mut f = Frame::new(1);
        f += 9;
        assert_eq!(f, Frame::new(10));
    }

    #[test]
    fn side_opponent_and_facing() {
        assert_eq!(Side::P0.opponent(), Side::P1);
        assert_eq!(Side::P1.opponent(), Side::P0);
        assert_eq!(Side::P0.starting_facing(), 1);
        assert_eq!(Side::P1.starting_facing(), -1);
    }
}
