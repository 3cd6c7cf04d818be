//! Connection-quality statistics exposed to the host (`spec.md` §4.5 "Statistics").
//!
//! Grounded directly in the teacher's `NetworkStats` struct: a plain,
//! `Copy`, read-only snapshot the host polls rather than subscribes to.

/// Read-only snapshot of one peer link's transport-level statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[must_use = "TransportStats should be inspected after being queried"]
pub struct TransportStats {
    /// EWMA round-trip time estimate, in milliseconds.
    pub rtt_ms: f64,
    /// EWMA jitter estimate (`spec.md` §4.4 Ping), in milliseconds.
    pub jitter_ms: f64,
    /// Total bytes sent on this link.
    pub bytes_tx: u64,
    /// Total bytes received on this link.
    pub bytes_rx: u64,
    /// Frames received with `frame <= last_recv_frame` (`spec.md` §4.4).
    pub out_of_order_count: u64,
    /// Sum of arrival gaps greater than one frame (`spec.md` §4.4).
    pub loss_suspect_count: u64,
    /// Estimated outgoing bandwidth, in kilobits per second, grounded in the
    /// teacher's `NetworkStats::kbps_sent`.
    pub kbps_sent: f64,
    /// Number of queued-but-not-yet-sent outbound messages, grounded in the
    /// teacher's `NetworkStats::send_queue_len`.
    pub send_queue_len: usize,
}

impl TransportStats {
    /// Creates a zeroed stats snapshot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_zero() {
        let stats = TransportStats::default();
        assert_eq!(stats.rtt_ms, 0.0);
        assert_eq!(stats.bytes_tx, 0);
        assert_eq!(stats.send_queue_len, 0);
    }

    #[test]
    fn new_matches_default() {
        assert_eq!(TransportStats::new(), TransportStats::default());
    }
}
