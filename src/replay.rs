//! Replay recording and playback (`spec.md` §6 "Replay format").
//!
//! A replay is a flat, versioned list of `(frame, p0, p1)` input triples.
//! Unlike the rollback controller's own input maps, a replay is meant to
//! outlive the session it was recorded in — it is the thing a host writes
//! to disk and feeds back into [`kernel::step`](crate::kernel::step)
//! directly, with no transport, prediction, or rewind involved.
//!
//! Frame numbers are expected to form a strict arithmetic progression (each
//! entry one frame after the last). `spec.md` is explicit that a gap is a
//! *warning*, not an error: [`Replay::play`] fills any gap by repeating the
//! last known inputs and appends a [`TimelineEvent::Warning`] to the
//! returned timeline, rather than failing the playback.

use serde::{Deserialize, Serialize};

use crate::error::{InvalidFrameReason, NetcodeError};
use crate::input::{FrameInputs, PlayerInput};
use crate::kernel::event::TimelineEvent;
use crate::kernel::moves::{default_move_table, MoveTable};
use crate::kernel::state::SimState;
use crate::{kernel, Frame};

/// Current replay format version. Bump this if the on-disk shape changes;
/// old replays remain loadable for as long as [`Replay::from_json`] keeps
/// matching on the old `version` value.
pub const REPLAY_VERSION: u8 = 1;

/// Free-form, host-supplied metadata about the recorded match
/// (`spec.md` §6 `meta:{date, characters, duration}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMeta {
    /// ISO-8601 date string, or whatever format the host's recorder used.
    pub date: String,
    /// The two characters' stable ids, in `(p0, p1)` order.
    pub characters: (String, String),
    /// Match duration in frames.
    pub duration_frames: u32,
}

/// One recorded frame's worth of both players' inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// The frame this input pair was sampled on.
    pub frame: Frame,
    /// Player 0's input.
    pub p0: PlayerInput,
    /// Player 1's input.
    pub p1: PlayerInput,
}

/// A recorded match: metadata plus the full input log
/// (`spec.md` §6 `{version, meta, frames}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Format version this replay was written with.
    pub version: u8,
    /// Host-supplied descriptive metadata.
    pub meta: ReplayMeta,
    /// The recorded `(frame, p0, p1)` triples, in frame order.
    pub frames: Vec<ReplayFrame>,
}

/// Builder that accumulates recorded frames during a live match, for
/// writing out once the match ends.
///
/// Grounded on the controller's own input bookkeeping
/// (`spec.md` §3 `localInputs`/`remoteInputs`): a recorder just mirrors
/// those confirmed pairs into a flat log instead of a frame-keyed map.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    meta: ReplayMeta,
    frames: Vec<ReplayFrame>,
}

impl ReplayRecorder {
    /// Starts a new recording with the given metadata. `duration_frames` in
    /// `meta` is provisional; [`ReplayRecorder::finish`] overwrites it with
    /// the actual recorded length.
    #[must_use]
    pub fn new(meta: ReplayMeta) -> Self {
        ReplayRecorder { meta, frames: Vec::new() }
    }

    /// Appends one frame's confirmed inputs to the recording. Callers are
    /// expected to push frames in increasing order, but this is not
    /// enforced here — [`Replay::play`] is what validates and tolerates
    /// gaps.
    pub fn record(&mut self, frame: Frame, p0: PlayerInput, p1: PlayerInput) {
        self.frames.push(ReplayFrame { frame, p0, p1 });
    }

    /// Number of frames recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// `true` if no frames have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Finalizes the recording into a [`Replay`], stamping `meta.duration_frames`.
    #[must_use]
    pub fn finish(mut self) -> Replay {
        self.meta.duration_frames = self.frames.len() as u32;
        Replay {
            version: REPLAY_VERSION,
            meta: self.meta,
            frames: self.frames,
        }
    }
}

/// Outcome of playing a [`Replay`] through the kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackResult {
    /// The state reached after the last recorded frame.
    pub final_state: SimState,
    /// Every timeline event emitted across all stepped frames, in order.
    pub timeline: Vec<TimelineEvent>,
    /// Number of non-arithmetic frame-number gaps encountered and papered
    /// over with repeated inputs (`spec.md` §6: "gap → warning, not error").
    pub gaps_filled: u32,
}

impl Replay {
    /// Parses a replay from its JSON wire form (`spec.md` §6; the textual
    /// form is the reference encoding per `SPEC_FULL.md` design notes).
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::SnapshotDecode`] if `json` does not parse as
    /// a `Replay`, mirroring the host-programmer-error taxonomy in
    /// `spec.md` §7 (decoder overflow / malformed input never panics).
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, NetcodeError> {
        serde_json::from_str(json).map_err(|_| NetcodeError::SnapshotDecode(crate::error::SnapshotDecodeReason::InvalidJson))
    }

    /// Serializes this replay to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::SnapshotDecode`] if serialization somehow
    /// fails (should not happen for well-formed `Replay` values).
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, NetcodeError> {
        serde_json::to_string(self).map_err(|_| NetcodeError::SnapshotDecode(crate::error::SnapshotDecodeReason::InvalidJson))
    }

    /// Plays this replay's input log into [`kernel::step`] directly from
    /// `initial_state`, using the built-in [`default_move_table`].
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::InvalidFrame`] if the first recorded frame
    /// is not strictly after `initial_state.frame` (a host programmer
    /// error per `spec.md` §7 — the replay cannot resume *before* its
    /// starting state).
    pub fn play(&self, initial_state: SimState) -> Result<PlaybackResult, NetcodeError> {
        self.play_with_table(initial_state, &default_move_table())
    }

    /// As [`Replay::play`], but with a caller-supplied [`MoveTable`] rather
    /// than the built-in roster.
    ///
    /// # Errors
    ///
    /// See [`Replay::play`].
    pub fn play_with_table(&self, initial_state: SimState, table: &MoveTable) -> Result<PlaybackResult, NetcodeError> {
        let mut state = initial_state;
        let mut timeline = Vec::new();
        let mut gaps_filled = 0u32;
        let mut last_inputs = FrameInputs::default();

        for entry in &self.frames {
            if entry.frame <= state.frame {
                return Err(NetcodeError::InvalidFrame {
                    frame: entry.frame,
                    reason: InvalidFrameReason::NotInPast { current_frame: state.frame },
                });
            }

            // Fill any gap between the last stepped frame and this entry by
            // repeating the last known inputs, one frame at a time, so the
            // kernel still sees the fixed one-frame cadence it expects.
            while state.frame + 1 < entry.frame {
                state = kernel::step(state, last_inputs, table);
                state.timeline.push(TimelineEvent::Warning {
                    frame: state.frame,
                    message: "replay frame gap: repeated last known inputs",
                });
                timeline.extend(state.timeline.drain(..));
                gaps_filled += 1;
            }

            last_inputs = FrameInputs { p0: entry.p0, p1: entry.p1 };
            state = kernel::step(state, last_inputs, table);
            timeline.extend(state.timeline.drain(..));
        }

        Ok(PlaybackResult {
            final_state: state,
            timeline,
            gaps_filled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ReplayMeta {
        ReplayMeta {
            date: "2026-01-01".to_string(),
            characters: ("ken".to_string(), "ryu".to_string()),
            duration_frames: 0,
        }
    }

    #[test]
    fn recorder_stamps_duration_on_finish() {
        let mut recorder = ReplayRecorder::new(meta());
        for f in 1..=5 {
            recorder.record(Frame::new(f), PlayerInput::default(), PlayerInput::default());
        }
        let replay = recorder.finish();
        assert_eq!(replay.meta.duration_frames, 5);
        assert_eq!(replay.version, REPLAY_VERSION);
    }

    #[test]
    fn play_strict_progression_has_no_gaps() {
        let mut recorder = ReplayRecorder::new(meta());
        for f in 1..=10 {
            recorder.record(Frame::new(f), PlayerInput::default(), PlayerInput::default());
        }
        let replay = recorder.finish();
        let result = replay.play(SimState::new_match("ken", "ryu", 1000.0)).unwrap();
        assert_eq!(result.gaps_filled, 0);
        assert_eq!(result.final_state.frame, Frame::new(10));
    }

    #[test]
    fn play_fills_gaps_with_warning_and_repeated_input() {
        let mut recorder = ReplayRecorder::new(meta());
        let mut held = PlayerInput::default();
        held.right = true;
        recorder.record(Frame::new(1), held, PlayerInput::default());
        // Skip frames 2..4, jump straight to 5.
        recorder.record(Frame::new(5), held, PlayerInput::default());
        let replay = recorder.finish();

        let result = replay.play(SimState::new_match("ken", "ryu", 1000.0)).unwrap();
        assert_eq!(result.gaps_filled, 3);
        assert_eq!(result.final_state.frame, Frame::new(5));
        assert!(result
            .timeline
            .iter()
            .any(|e| matches!(e, TimelineEvent::Warning { .. })));
    }

    #[test]
    fn play_rejects_non_increasing_frame() {
        let mut recorder = ReplayRecorder::new(meta());
        recorder.record(Frame::new(5), PlayerInput::default(), PlayerInput::default());
        recorder.record(Frame::new(5), PlayerInput::default(), PlayerInput::default());
        let replay = recorder.finish();

        let err = replay.play(SimState::new_match("ken", "ryu", 1000.0)).unwrap_err();
        assert!(matches!(err, NetcodeError::InvalidFrame { .. }));
    }

    #[test]
    fn play_rejects_frame_not_after_initial_state() {
        let mut recorder = ReplayRecorder::new(meta());
        recorder.record(Frame::new(0), PlayerInput::default(), PlayerInput::default());
        let replay = recorder.finish();

        // `SimState::new_match` starts at frame 0; a replay entry at frame 0
        // is not strictly in the future of that state.
        let err = replay.play(SimState::new_match("ken", "ryu", 1000.0)).unwrap_err();
        assert!(matches!(err, NetcodeError::InvalidFrame { .. }));
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_round_trip() {
        let mut recorder = ReplayRecorder::new(meta());
        recorder.record(Frame::new(1), PlayerInput::default(), PlayerInput::default());
        let replay = recorder.finish();

        let json = replay.to_json().unwrap();
        let decoded = Replay::from_json(&json).unwrap();
        assert_eq!(replay, decoded);
    }

    #[cfg(feature = "json")]
    #[test]
    fn from_json_rejects_garbage() {
        assert!(Replay::from_json("not json").is_err());
    }
}
