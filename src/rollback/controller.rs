//! The Rollback Controller (`spec.md` §4.5): owns the frame clock, input
//! history, snapshot ring, and the predict/confirm/rewind loop.
//!
//! [`RollbackController`] drives [`crate::kernel::step`] but never the
//! transport directly — [`crate::session::NetcodeService`] polls the
//! transport and feeds confirmed remote inputs in via
//! [`RollbackController::ingest_remote_input`], matching `spec.md` §5's
//! "the transport only writes to a staging area that the controller drains
//! at the start of each `advance`".

use std::sync::Arc;

use crate::error::{InvalidFrameReason, NetcodeError};
use crate::input::{FrameInputs, PlayerInput};
use crate::kernel::moves::MoveTable;
use crate::kernel::state::SimState;
use crate::rollback::input_queue::InputQueue;
use crate::rollback::snapshot_ring::SnapshotRing;
use crate::snapshot::{self, SnapshotBlob};
use crate::telemetry::{EventObserver, NetcodeEvent, TracingObserver};
use crate::{Frame, Side};

/// Upper bound on `frame_delay`, regardless of how it was set (`spec.md`
/// §4.5 "frameDelay is clamped to `[0, 10]`").
pub const MAX_FRAME_DELAY: u32 = 10;
/// Upper bound on the *adaptively computed* frame delay (`spec.md` §4.5
/// "Adaptive frame delay ... clamped to `[desiredDelay, 8]`").
pub const MAX_ADAPTIVE_FRAME_DELAY: u32 = 8;
/// Divisor used to convert milliseconds of RTT/jitter into whole frames in
/// the adaptive delay formula (`spec.md` §4.5: "round(rtt/50 ms)").
const MS_PER_FRAME_BUCKET: f64 = 50.0;

/// Read-only statistics about the controller's rollback behavior (`spec.md`
/// §4.5 "Statistics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollbackStats {
    /// The current frame delay applied to locally committed inputs.
    pub frame_delay: u32,
    /// Total number of rollbacks executed so far.
    pub rollbacks: u64,
    /// Sum of frames resimulated across all rollbacks.
    pub total_rollback_frames: u64,
    /// The longest single rewind span observed so far, in frames.
    pub max_rollback_span: u32,
    /// The frame the controller is about to simulate next.
    pub current_frame: Frame,
    /// The highest frame for which a confirmed remote input has arrived.
    pub confirmed_remote_frame: Frame,
}

/// The frame-synchronous predict/confirm/rewind loop described in
/// `spec.md` §4.5.
pub struct RollbackController {
    state: SimState,
    current_frame: Frame,
    confirmed_remote_frame: Frame,
    last_confirmed_remote_bits: u32,
    frame_delay: u32,
    desired_delay: u32,
    max_rollback: usize,
    jitter_buffer_frames: u32,
    local_side: Side,
    inputs: InputQueue,
    snapshots: SnapshotRing,
    move_table: MoveTable,
    observer: Arc<dyn EventObserver>,
    rollbacks: u64,
    total_rollback_frames: u64,
    max_rollback_span: u32,
}

impl RollbackController {
    /// Creates a controller starting from `initial_state`.
    ///
    /// `local_side` says which of `initial_state`'s two characters this
    /// instance's local player controls; the other side's inputs come from
    /// the remote peer. `max_rollback` sizes the snapshot ring and bounds
    /// how far back a mispredict scan and rewind may reach.
    #[must_use]
    pub fn new(
        initial_state: SimState,
        local_side: Side,
        max_rollback: usize,
        desired_delay: u32,
        jitter_buffer_frames: u32,
        move_table: MoveTable,
    ) -> Self {
        let current_frame = initial_state.frame;
        let mut controller = RollbackController {
            state: initial_state,
            current_frame,
            confirmed_remote_frame: Frame::NULL,
            last_confirmed_remote_bits: 0,
            frame_delay: desired_delay.min(MAX_FRAME_DELAY),
            desired_delay: desired_delay.min(MAX_FRAME_DELAY),
            max_rollback,
            jitter_buffer_frames,
            local_side,
            inputs: InputQueue::new(),
            snapshots: SnapshotRing::new(max_rollback.max(1)),
            move_table,
            observer: Arc::new(TracingObserver),
            rollbacks: 0,
            total_rollback_frames: 0,
            max_rollback_span: 0,
        };
        controller.save_current_snapshot();
        controller
    }

    /// Installs a custom event observer (replacing the default
    /// [`TracingObserver`]), e.g. a [`crate::telemetry::CollectingObserver`] in tests.
    pub fn set_observer(&mut self, observer: Arc<dyn EventObserver>) {
        self.observer = observer;
    }

    /// The frame the controller is about to simulate next.
    #[must_use]
    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    /// A read-only view of the controller's current authoritative state.
    #[must_use]
    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// The controller's current rollback statistics.
    #[must_use]
    pub fn stats(&self) -> RollbackStats {
        RollbackStats {
            frame_delay: self.frame_delay,
            rollbacks: self.rollbacks,
            total_rollback_frames: self.total_rollback_frames,
            max_rollback_span: self.max_rollback_span,
            current_frame: self.current_frame,
            confirmed_remote_frame: self.confirmed_remote_frame,
        }
    }

    /// Assigns `bits` to `current_frame + frame_delay` and returns that
    /// frame, so the caller can hand the same `(frame, bits)` to the
    /// transport (`spec.md` §4.5 "pushLocal").
    pub fn push_local(&mut self, bits: u32) -> Frame {
        let frame = self.current_frame + self.frame_delay as i32;
        self.inputs.set_local(frame, bits);
        frame
    }

    /// Records a confirmed remote input arriving from the transport
    /// (`spec.md` §5: the transport "writes to a staging area that the
    /// controller drains at the start of each `advance`" — in this design
    /// the host calls this once per delivered frame before calling
    /// [`RollbackController::advance`]).
    pub fn ingest_remote_input(&mut self, frame: Frame, bits: u32) {
        self.inputs.set_remote_confirmed(frame, bits);
        if self.confirmed_remote_frame.is_null() || frame > self.confirmed_remote_frame {
            self.confirmed_remote_frame = frame;
            self.last_confirmed_remote_bits = bits;
        }
    }

    /// Adjusts `frame_delay` from transport RTT/jitter (`spec.md` §4.5
    /// "Adaptive frame delay"), clamped to `[desired_delay, 8]`.
    pub fn adjust_frame_delay(&mut self, rtt_ms: f64, jitter_ms: f64) {
        let rtt_frames = (rtt_ms / MS_PER_FRAME_BUCKET).round().max(0.0) as u32;
        let jitter_frames = (jitter_ms / MS_PER_FRAME_BUCKET).round().max(0.0) as u32;
        let frames = rtt_frames + jitter_frames.min(self.jitter_buffer_frames);
        self.frame_delay = frames.clamp(self.desired_delay, MAX_ADAPTIVE_FRAME_DELAY);
    }

    /// Advances the simulation by exactly one frame, following `spec.md`
    /// §4.5's `advance` algorithm: snapshot, read inputs, step, then scan
    /// for and resolve any mispredicted remote input.
    pub fn advance(&mut self) {
        self.save_current_snapshot();
        self.prune_old_entries();

        let frame = self.current_frame;
        let local_bits = self.inputs.local(frame).unwrap_or(0);
        let (remote_bits, _is_prediction) =
            self.inputs.resolve_remote(frame, self.last_confirmed_remote_bits);

        self.state = crate::kernel::step(
            std::mem::replace(&mut self.state, SimState::new_match("", "", 0.0)),
            self.frame_inputs(local_bits, remote_bits),
            &self.move_table,
        );
        self.current_frame += 1;

        self.resolve_mispredictions();
    }

    fn frame_inputs(&self, local_bits: u32, remote_bits: u32) -> FrameInputs {
        let local_input = PlayerInput::decode(local_bits);
        let remote_input = PlayerInput::decode(remote_bits);
        match self.local_side {
            Side::P0 => FrameInputs { p0: local_input, p1: remote_input },
            Side::P1 => FrameInputs { p0: remote_input, p1: local_input },
        }
    }

    fn resolve_mispredictions(&mut self) {
        let window_start = Frame::new((self.current_frame.as_i32() - self.max_rollback as i32).max(0));
        if let Some(mismatch_frame) = self.inputs.earliest_mispredict(window_start, self.current_frame) {
            self.rollback(mismatch_frame);
        }
    }

    /// Restores the snapshot at `from` and resimulates every frame up to
    /// (but not including) `current_frame`, using confirmed inputs wherever
    /// they are now available (`spec.md` §4.5 "Rollback procedure").
    fn rollback(&mut self, from: Frame) {
        let Some(cell) = self.snapshots.get(from) else {
            tracing::error!(%from, "rollback target missing from snapshot ring; skipping rollback");
            return;
        };
        let Ok(mut state) = snapshot::load(&cell.bytes) else {
            tracing::error!(%from, "rollback snapshot failed to decode; skipping rollback");
            return;
        };

        let span = (self.current_frame - from).max(0) as u32;
        let mut frame = from;
        while frame < self.current_frame {
            let bytes = snapshot::save(&state);
            let checksum = snapshot::checksum(&bytes);
            self.snapshots.save(frame, bytes, checksum);

            let local_bits = self.inputs.local(frame).unwrap_or(0);
            let (remote_bits, _) = self.inputs.resolve_remote(frame, self.last_confirmed_remote_bits);
            if self.inputs.remote_confirmed(frame).is_some() {
                self.inputs.clear_predicted(frame);
            }

            state = crate::kernel::step(state, self.frame_inputs(local_bits, remote_bits), &self.move_table);
            frame += 1;
        }
        self.state = state;

        self.rollbacks += 1;
        self.total_rollback_frames += u64::from(span);
        self.max_rollback_span = self.max_rollback_span.max(span);
        self.observer.on_event(NetcodeEvent::RollbackOccurred { from_frame: from, span });
    }

    fn save_current_snapshot(&mut self) {
        let bytes = snapshot::save(&self.state);
        let checksum = snapshot::checksum(&bytes);
        self.snapshots.save(self.current_frame, bytes, checksum);
    }

    fn prune_old_entries(&mut self) {
        let cutoff = Frame::new((self.current_frame.as_i32() - self.max_rollback as i32).max(0));
        self.inputs.prune_before(cutoff);
    }

    /// Returns the snapshot saved for `frame`, for replay/test harnesses
    /// (`spec.md` §6 "saveState(frame)").
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::InvalidFrame`] if `frame` has already left
    /// the rollback window (its snapshot was evicted or never saved).
    pub fn save_state(&self, frame: Frame) -> Result<SnapshotBlob, NetcodeError> {
        self.snapshots
            .get(frame)
            .map(super::snapshot_ring::SnapshotCell::as_blob)
            .ok_or(NetcodeError::InvalidFrame {
                frame,
                reason: InvalidFrameReason::OutsideRollbackWindow {
                    current_frame: self.current_frame,
                    max_rollback: self.max_rollback,
                },
            })
    }

    /// Replaces the controller's authoritative state with `blob`, resetting
    /// `current_frame` to match (`spec.md` §6 "loadState(blob)").
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::SnapshotDecode`] if `blob` fails to decode.
    pub fn load_state(&mut self, blob: &SnapshotBlob) -> Result<(), NetcodeError> {
        let bytes = blob.as_binary().ok_or(NetcodeError::SnapshotDecode(
            crate::error::SnapshotDecodeReason::InvalidJson,
        ))?;
        let state = snapshot::load(bytes)?;
        self.current_frame = state.frame;
        self.state = state;
        self.save_current_snapshot();
        Ok(())
    }

    /// Advances the kernel directly with explicit inputs, bypassing all
    /// rollback bookkeeping (`spec.md` §6: the controller exposes
    /// `step(frame, p0, p1)` "only for replay and test harnesses").
    pub fn step_direct(&mut self, p0: PlayerInput, p1: PlayerInput) -> &SimState {
        self.state = crate::kernel::step(
            std::mem::replace(&mut self.state, SimState::new_match("", "", 0.0)),
            FrameInputs { p0, p1 },
            &self.move_table,
        );
        self.current_frame = self.state.frame;
        &self.state
    }
}
