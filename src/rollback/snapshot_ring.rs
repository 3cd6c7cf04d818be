//! Fixed-capacity snapshot ring (`spec.md` §3 "snapshots: ... bounded ring
//! of up to N frames (N ≥ maxRollback, typically 120–180 ≈ 2–3 s at 60 Hz)").
//!
//! Grounded in the teacher's `SavedStates<T>` ring buffer of
//! `GameStateCell<T>`: a `Vec` indexed by `frame % capacity`, so saving a new
//! frame automatically evicts whatever frame previously lived at that slot
//! once it falls more than `capacity` frames behind.

use crate::snapshot::SnapshotBlob;
use crate::Frame;

/// One saved frame: its bytes and the checksum computed over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCell {
    /// The frame this cell was saved for.
    pub frame: Frame,
    /// FNV-1a checksum of `bytes` (`crate::snapshot::checksum`).
    pub checksum: u32,
    /// The dense binary snapshot blob.
    pub bytes: Vec<u8>,
}

impl SnapshotCell {
    /// Wraps this cell's bytes as a [`SnapshotBlob::Binary`].
    #[must_use]
    pub fn as_blob(&self) -> SnapshotBlob {
        SnapshotBlob::Binary(self.bytes.clone())
    }
}

/// A ring buffer of [`SnapshotCell`]s indexed by `frame % capacity`.
#[derive(Debug)]
pub struct SnapshotRing {
    capacity: usize,
    cells: Vec<Option<SnapshotCell>>,
}

impl SnapshotRing {
    /// Creates a ring with room for `capacity` distinct frames.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "snapshot ring capacity must be positive");
        SnapshotRing { capacity, cells: vec![None; capacity] }
    }

    /// The ring's capacity, in frames.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Saves `bytes`/`checksum` for `frame`, evicting whatever previously
    /// occupied that slot.
    pub fn save(&mut self, frame: Frame, bytes: Vec<u8>, checksum: u32) {
        let idx = self.index(frame);
        self.cells[idx] = Some(SnapshotCell { frame, checksum, bytes });
    }

    /// Returns the cell for `frame`, if it is still present in the ring
    /// (not yet overwritten by a later frame landing on the same slot).
    #[must_use]
    pub fn get(&self, frame: Frame) -> Option<&SnapshotCell> {
        let idx = self.index(frame);
        self.cells[idx].as_ref().filter(|cell| cell.frame == frame)
    }

    fn index(&self, frame: Frame) -> usize {
        frame.as_i32().rem_euclid(self.capacity as i32) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_get_round_trips_within_capacity() {
        let mut ring = SnapshotRing::new(4);
        ring.save(Frame::new(0), vec![1, 2, 3], 42);
        let cell = ring.get(Frame::new(0)).unwrap();
        assert_eq!(cell.bytes, vec![1, 2, 3]);
        assert_eq!(cell.checksum, 42);
    }

    #[test]
    fn get_returns_none_for_never_saved_frame() {
        let ring = SnapshotRing::new(4);
        assert!(ring.get(Frame::new(0)).is_none());
    }

    #[test]
    fn old_frame_is_evicted_once_wrapped() {
        let mut ring = SnapshotRing::new(4);
        ring.save(Frame::new(0), vec![0], 0);
        ring.save(Frame::new(4), vec![4], 4);
        // Frame 4 landed on the same slot as frame 0 and overwrote it.
        assert!(ring.get(Frame::new(0)).is_none());
        assert_eq!(ring.get(Frame::new(4)).unwrap().bytes, vec![4]);
    }

    #[test]
    fn distinct_frames_within_capacity_do_not_collide() {
        let mut ring = SnapshotRing::new(4);
        for f in 0..4 {
            ring.save(Frame::new(f), vec![f as u8], f as u32);
        }
        for f in 0..4 {
            assert_eq!(ring.get(Frame::new(f)).unwrap().checksum, f as u32);
        }
    }
}
