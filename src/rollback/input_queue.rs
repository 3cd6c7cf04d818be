//! Local/remote/predicted input bookkeeping for the rollback controller
//! (`spec.md` §3 "Rollback State": `localInputs`, `remoteInputs`,
//! `predictedRemote`).
//!
//! Three frame-keyed maps, one struct, because the controller always reads
//! and writes them together (`spec.md` §4.5 step 2–3) and because pruning
//! (bounding memory to the rollback window) applies uniformly to all three.

use std::collections::BTreeMap;

use crate::Frame;

/// The three frame-keyed input maps a rollback controller needs.
#[derive(Debug, Default)]
pub struct InputQueue {
    local: BTreeMap<Frame, u32>,
    remote_confirmed: BTreeMap<Frame, u32>,
    predicted_remote: BTreeMap<Frame, u32>,
}

impl InputQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a locally committed input for `frame`.
    pub fn set_local(&mut self, frame: Frame, bits: u32) {
        self.local.insert(frame, bits);
    }

    /// The local input for `frame`, or `None` if not yet committed.
    #[must_use]
    pub fn local(&self, frame: Frame) -> Option<u32> {
        self.local.get(&frame).copied()
    }

    /// Records a confirmed remote input for `frame`, arriving from the
    /// transport.
    pub fn set_remote_confirmed(&mut self, frame: Frame, bits: u32) {
        self.remote_confirmed.insert(frame, bits);
    }

    /// The confirmed remote input for `frame`, if the peer has sent it.
    #[must_use]
    pub fn remote_confirmed(&self, frame: Frame) -> Option<u32> {
        self.remote_confirmed.get(&frame).copied()
    }

    /// Records a guessed remote input for `frame` pending confirmation.
    pub fn set_predicted(&mut self, frame: Frame, bits: u32) {
        self.predicted_remote.insert(frame, bits);
    }

    /// The predicted remote input for `frame`, if one was recorded.
    #[must_use]
    pub fn predicted(&self, frame: Frame) -> Option<u32> {
        self.predicted_remote.get(&frame).copied()
    }

    /// Removes the prediction recorded for `frame` (`spec.md` §4.5
    /// rollback procedure: "clear predictedRemote[g] if confirmed").
    pub fn clear_predicted(&mut self, frame: Frame) {
        self.predicted_remote.remove(&frame);
    }

    /// Resolves the remote input to use for `frame`: confirmed if present,
    /// else the existing prediction, else `fallback` (typically the last
    /// confirmed bits, else 0) — recording the fallback as a fresh
    /// prediction (`spec.md` §4.5 step 3).
    ///
    /// Returns `(bits, is_prediction)`.
    pub fn resolve_remote(&mut self, frame: Frame, fallback: u32) -> (u32, bool) {
        if let Some(bits) = self.remote_confirmed(frame) {
            return (bits, false);
        }
        let guess = self.predicted(frame).unwrap_or(fallback);
        self.set_predicted(frame, guess);
        (guess, true)
    }

    /// Finds the smallest frame in `[from, to)` where both a confirmed and a
    /// predicted remote input exist and disagree (`spec.md` §4.5 step 6).
    #[must_use]
    pub fn earliest_mispredict(&self, from: Frame, to: Frame) -> Option<Frame> {
        self.remote_confirmed
            .range(from..to)
            .find_map(|(&frame, &confirmed)| {
                self.predicted(frame).filter(|&predicted| predicted != confirmed).map(|_| frame)
            })
    }

    /// Drops entries older than `frame - max_rollback` from all three maps,
    /// bounding memory use (`spec.md` §3 "snapshots: ... bounded ring of up
    /// to N frames"; the same bound applies to the input maps).
    pub fn prune_before(&mut self, cutoff: Frame) {
        self.local = self.local.split_off(&cutoff);
        self.remote_confirmed = self.remote_confirmed.split_off(&cutoff);
        self.predicted_remote = self.predicted_remote.split_off(&cutoff);
    }
}
