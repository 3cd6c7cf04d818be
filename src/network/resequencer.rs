//! Jitter buffer / resequencer for the input channel (`spec.md` §4.4 "Resequencer").
//!
//! Input datagrams can arrive out of order or with gaps. The resequencer's
//! job is to turn that into a monotonically non-decreasing stream of
//! `(frame, bits)` deliveries for the rollback controller, filling small
//! gaps by packet-loss concealment (PLC) rather than stalling.

use std::collections::BTreeMap;

use crate::Frame;

/// Pending buffer above this size is flushed rather than grown further
/// (`spec.md` §4.4: "The pending buffer is bounded (≤64) and flushed on
/// overflow").
const MAX_PENDING_FRAMES: usize = 64;

/// One frame's worth of input handed to the controller by [`Resequencer::on_datagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// The frame this input applies to.
    pub frame: Frame,
    /// The delivered bits: either the datagram's own payload, or (when
    /// concealed) the last delivered bits repeated.
    pub bits: u32,
    /// `true` if these bits were substituted by packet-loss concealment
    /// rather than actually received for this frame.
    pub concealed: bool,
}

/// Resequences input datagrams into an ordered delivery stream, concealing
/// small gaps and bounding out-of-order buffering.
#[derive(Debug)]
pub struct Resequencer {
    delivered_frame: Frame,
    last_recv_frame: Frame,
    last_delivered_bits: u32,
    pending: BTreeMap<Frame, u32>,
    jitter_window_frames: u32,
    out_of_order_count: u64,
    loss_suspect_count: u64,
}

impl Resequencer {
    /// Creates a resequencer with the given jitter window, in frames.
    #[must_use]
    pub fn new(jitter_window_frames: u32) -> Self {
        Resequencer {
            delivered_frame: Frame::NULL,
            last_recv_frame: Frame::NULL,
            last_delivered_bits: 0,
            pending: BTreeMap::new(),
            jitter_window_frames,
            out_of_order_count: 0,
            loss_suspect_count: 0,
        }
    }

    /// The highest frame delivered so far, or [`Frame::NULL`] if none yet.
    #[must_use]
    pub fn delivered_frame(&self) -> Frame {
        self.delivered_frame
    }

    /// Count of datagrams received with `frame <= last_recv_frame` (`spec.md` §4.4).
    #[must_use]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    /// Sum of arrival gaps greater than one frame, across all arrivals (`spec.md` §4.4).
    #[must_use]
    pub fn loss_suspect_count(&self) -> u64 {
        self.loss_suspect_count
    }

    /// Number of frames currently buffered awaiting a contiguous predecessor.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feeds one received `Input(frame, bits)` datagram and returns every
    /// frame that becomes deliverable as a result, in frame order.
    pub fn on_datagram(&mut self, frame: Frame, bits: u32) -> Vec<Delivery> {
        self.track_arrival_order(frame);

        let mut out = Vec::new();
        if self.delivered_frame.is_null() || frame <= self.delivered_frame + 1 {
            self.deliver(frame, bits, false, &mut out);
            self.drain_contiguous(&mut out);
            return out;
        }

        let gap = frame - self.delivered_frame;
        if (gap as u32) <= self.jitter_window_frames {
            self.pending.insert(frame, bits);
            if self.pending.len() > MAX_PENDING_FRAMES {
                self.flush_pending(&mut out);
            }
            return out;
        }

        // Anti-stall: conceal every frame strictly between what we've
        // delivered and what just arrived, then deliver the arrival itself.
        let mut gap_frame = self.delivered_frame + 1;
        while gap_frame < frame {
            self.deliver(gap_frame, self.last_delivered_bits, true, &mut out);
            gap_frame += 1;
        }
        let concealed = bits == 0 && self.last_delivered_bits != 0;
        let effective_bits = if concealed { self.last_delivered_bits } else { bits };
        self.deliver(frame, effective_bits, concealed, &mut out);
        self.drain_contiguous(&mut out);
        out
    }

    fn track_arrival_order(&mut self, frame: Frame) {
        if !self.last_recv_frame.is_null() {
            if frame <= self.last_recv_frame {
                self.out_of_order_count += 1;
            } else {
                let gap = frame - self.last_recv_frame;
                if gap > 1 {
                    self.loss_suspect_count += (gap - 1) as u64;
                }
            }
        }
        if self.last_recv_frame.is_null() || frame > self.last_recv_frame {
            self.last_recv_frame = frame;
        }
    }

    fn deliver(&mut self, frame: Frame, bits: u32, concealed: bool, out: &mut Vec<Delivery>) {
        self.delivered_frame = frame;
        self.last_delivered_bits = bits;
        out.push(Delivery { frame, bits, concealed });
    }

    fn drain_contiguous(&mut self, out: &mut Vec<Delivery>) {
        loop {
            let next = self.delivered_frame + 1;
            match self.pending.remove(&next) {
                Some(bits) => self.deliver(next, bits, false, out),
                None => break,
            }
        }
    }

    fn flush_pending(&mut self, out: &mut Vec<Delivery>) {
        let drained: Vec<(Frame, u32)> = std::mem::take(&mut self.pending).into_iter().collect();
        for (frame, bits) in drained {
            if frame > self.delivered_frame {
                self.deliver(frame, bits, false, out);
            }
        }
    }
}
