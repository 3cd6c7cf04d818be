//! Peer link: the transport-agnostic protocol state sitting on top of a
//! [`crate::network::NonBlockingSocket`] (`spec.md` §4.4).
//!
//! [`PeerLink`] owns everything the wire format needs that isn't "bytes on a
//! socket": the resequencer, the outgoing pacer, RTT/jitter estimation from
//! [`PingMessage`] echoes, loss/out-of-order counters, and renegotiation
//! bookkeeping. It does not itself touch a socket — [`crate::session`] polls
//! a [`crate::network::NonBlockingSocket`] and feeds what arrives into
//! [`PeerLink::on_message`], then drains [`PeerLink::drain_outgoing`] back
//! out through the same socket. This mirrors the teacher's split between
//! `UdpProtocol` (pure protocol state) and its socket adapters.

use std::collections::VecDeque;

use web_time::{Duration, Instant};

use crate::network::messages::{ChecksumReportMessage, ClockMessage, ClockPhase, InputMessage, Message, PingMessage};
use crate::network::network_stats::TransportStats;
use crate::network::pacer::TokenBucket;
use crate::network::resequencer::{Delivery, Resequencer};
use crate::Frame;

/// How often to send a [`PingMessage`] probe (`spec.md` §4.4: "~2 Hz").
pub const PING_INTERVAL: Duration = Duration::from_millis(500);

/// EWMA smoothing factor for the jitter estimate (`spec.md` §4.4).
const JITTER_ALPHA: f64 = 0.25;

/// Lifecycle state of a [`PeerLink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerLinkState {
    /// No datagram has been exchanged yet.
    Connecting,
    /// Inputs are flowing normally.
    Running,
    /// No datagram received within the disconnect timeout; a renegotiation
    /// is in flight.
    Interrupted,
    /// The host called [`crate::session::NetcodeService::disable`], or
    /// renegotiation retries were exhausted.
    Closed,
}

/// Something the caller (the session/controller) should react to after
/// feeding a message into [`PeerLink::on_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum PeerLinkEvent {
    /// One or more input frames became deliverable.
    InputsDelivered(Vec<Delivery>),
    /// The peer asked us to reopen the input channel.
    RenegotiateRequested,
    /// The peer reported a checksum for a confirmed frame
    /// (`spec.md` §7 "Desync").
    ChecksumReported {
        /// The frame the checksum applies to.
        frame: Frame,
        /// The peer's checksum for that frame.
        checksum: u32,
    },
    /// Nothing actionable; the message was protocol bookkeeping (a ping
    /// echo, a clock-sync leg) fully handled internally.
    Handled,
}

/// Protocol state for one peer-to-peer link.
pub struct PeerLink {
    state: PeerLinkState,
    resequencer: Resequencer,
    pacer: TokenBucket,
    send_queue: VecDeque<Message>,
    rtt_ms: f64,
    jitter_ms: f64,
    bytes_tx: u64,
    bytes_rx: u64,
    last_recv: Option<Instant>,
    last_ping_sent: Option<Instant>,
    disconnect_timeout: Duration,
    renegotiation_attempts: u32,
    max_renegotiation_attempts: u32,
}

impl PeerLink {
    /// Creates a fresh peer link.
    ///
    /// `jitter_window_frames` is handed to the [`Resequencer`];
    /// `disconnect_timeout` is how long without any datagram before the link
    /// is declared interrupted (`spec.md` §7 "Peer unreachable").
    #[must_use]
    pub fn new(jitter_window_frames: u32, disconnect_timeout: Duration) -> Self {
        PeerLink {
            state: PeerLinkState::Connecting,
            resequencer: Resequencer::new(jitter_window_frames),
            pacer: TokenBucket::default(),
            send_queue: VecDeque::new(),
            rtt_ms: 0.0,
            jitter_ms: 0.0,
            bytes_tx: 0,
            bytes_rx: 0,
            last_recv: None,
            last_ping_sent: None,
            disconnect_timeout,
            renegotiation_attempts: 0,
            max_renegotiation_attempts: 5,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PeerLinkState {
        self.state
    }

    /// The frame most recently delivered by the resequencer.
    #[must_use]
    pub fn delivered_frame(&self) -> Frame {
        self.resequencer.delivered_frame()
    }

    /// A read-only snapshot of this link's transport statistics.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        TransportStats {
            rtt_ms: self.rtt_ms,
            jitter_ms: self.jitter_ms,
            bytes_tx: self.bytes_tx,
            bytes_rx: self.bytes_rx,
            out_of_order_count: self.resequencer.out_of_order_count(),
            loss_suspect_count: self.resequencer.loss_suspect_count(),
            kbps_sent: self.pacer.available().into(),
            send_queue_len: self.send_queue.len(),
        }
    }

    /// Enqueues a local input for sending. Per `spec.md` §4.4 "Input is
    /// never dropped locally", this always succeeds; if the pacer is empty
    /// it simply drains on a later tick.
    pub fn send_input(&mut self, frame: Frame, bits: u32) {
        self.send_queue.push_back(Message::Input(InputMessage { frame, bits }));
    }

    /// Sends a ping probe if `PING_INTERVAL` has elapsed since the last one.
    pub fn maybe_send_ping(&mut self, now: Instant) {
        let due = self.last_ping_sent.is_none_or(|last| now.duration_since(last) >= PING_INTERVAL);
        if due {
            self.last_ping_sent = Some(now);
            self.send_queue.push_back(Message::Ping(PingMessage {
                ts_millis: instant_to_millis(now),
                echo: false,
            }));
        }
    }

    /// Asks the peer to reopen the input channel after an apparent stall.
    ///
    /// # Errors
    ///
    /// Returns `Err` once `max_renegotiation_attempts` consecutive attempts
    /// have been made without the link recovering to [`PeerLinkState::Running`].
    pub fn renegotiate(&mut self) -> Result<(), u32> {
        self.renegotiation_attempts += 1;
        if self.renegotiation_attempts > self.max_renegotiation_attempts {
            self.state = PeerLinkState::Closed;
            return Err(self.renegotiation_attempts);
        }
        self.state = PeerLinkState::Interrupted;
        self.send_queue.push_back(Message::Renegotiate);
        Ok(())
    }

    /// Feeds one message received from the socket into the protocol state.
    pub fn on_message(&mut self, msg: Message, now: Instant) -> PeerLinkEvent {
        self.last_recv = Some(now);
        if self.state == PeerLinkState::Connecting || self.state == PeerLinkState::Interrupted {
            self.state = PeerLinkState::Running;
            self.renegotiation_attempts = 0;
        }
        match msg {
            Message::Input(InputMessage { frame, bits }) => {
                let delivered = self.resequencer.on_datagram(frame, bits);
                if delivered.is_empty() {
                    PeerLinkEvent::Handled
                } else {
                    PeerLinkEvent::InputsDelivered(delivered)
                }
            }
            Message::Ping(PingMessage { ts_millis, echo }) => {
                if echo {
                    self.update_rtt_jitter(now, ts_millis);
                } else {
                    self.send_queue.push_back(Message::Ping(PingMessage { ts_millis, echo: true }));
                }
                PeerLinkEvent::Handled
            }
            Message::Clock(ClockMessage { phase, ts, .. }) => {
                if phase == ClockPhase::Req {
                    self.send_queue.push_back(Message::Clock(ClockMessage {
                        phase: ClockPhase::Resp,
                        ts,
                        now: instant_to_millis(now),
                    }));
                }
                PeerLinkEvent::Handled
            }
            Message::Renegotiate => PeerLinkEvent::RenegotiateRequested,
            Message::ChecksumReport(report) => {
                PeerLinkEvent::ChecksumReported { frame: report.frame, checksum: report.checksum }
            }
        }
    }

    /// `true` if no datagram has arrived within the configured disconnect
    /// timeout.
    #[must_use]
    pub fn is_disconnect_timed_out(&self, now: Instant) -> bool {
        match self.last_recv {
            Some(last) => now.duration_since(last) >= self.disconnect_timeout,
            None => false,
        }
    }

    /// Refills the pacer for `elapsed` and returns every message ready to
    /// send this tick, lowest priority (`Ping`) dropped first under
    /// congestion.
    pub fn drain_outgoing(&mut self, elapsed: Duration) -> Vec<Message> {
        self.pacer.refill(elapsed);
        let mut ready = Vec::new();
        let mut requeue = VecDeque::new();
        while let Some(msg) = self.send_queue.pop_front() {
            let size = estimated_size(&msg);
            if self.pacer.try_consume(size) {
                self.bytes_tx += u64::from(size);
                ready.push(msg);
            } else if matches!(msg, Message::Ping(_)) {
                // Lowest priority: drop rather than queue under congestion.
                continue;
            } else {
                requeue.push_back(msg);
            }
        }
        self.send_queue = requeue;
        ready
    }

    /// Records bytes received for `bytes_rx` accounting (called by the
    /// socket adapter once per received datagram).
    pub fn note_received(&mut self, bytes: usize) {
        self.bytes_rx += bytes as u64;
    }

    fn update_rtt_jitter(&mut self, now: Instant, sent_ts_millis: f64) {
        let rtt = (instant_to_millis(now) - sent_ts_millis).max(0.0);
        let delta = (rtt - self.rtt_ms).abs();
        self.jitter_ms += JITTER_ALPHA * (delta - self.jitter_ms);
        self.rtt_ms = rtt;
    }
}

/// A monotonic millisecond timestamp suitable for embedding in outgoing
/// [`PingMessage`]/[`ClockMessage`] payloads.
///
/// `web_time::Instant` has no public epoch, so we measure relative to
/// process start; only deltas between two timestamps from the same process
/// are meaningful, which is exactly how RTT/jitter use them.
fn instant_to_millis(instant: Instant) -> f64 {
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = *START.get_or_init(|| instant);
    instant
        .checked_duration_since(start)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
        * 1000.0
}

fn estimated_size(msg: &Message) -> u32 {
    crate::network::codec::encode(msg).map(|bytes| bytes.len() as u32).unwrap_or(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_link_starts_connecting() {
        let link = PeerLink::new(2, Duration::from_secs(5));
        assert_eq!(link.state(), PeerLinkState::Connecting);
    }

    #[test]
    fn receiving_any_message_transitions_to_running() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        let now = Instant::now();
        link.on_message(Message::Ping(PingMessage { ts_millis: 0.0, echo: false }), now);
        assert_eq!(link.state(), PeerLinkState::Running);
    }

    #[test]
    fn input_message_delivers_via_resequencer() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        let now = Instant::now();
        let event = link.on_message(Message::Input(InputMessage { frame: Frame::new(0), bits: 7 }), now);
        assert!(matches!(event, PeerLinkEvent::InputsDelivered(_)));
    }

    #[test]
    fn ping_echo_updates_rtt() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        let t0 = Instant::now();
        link.maybe_send_ping(t0);
        let sent = link.drain_outgoing(Duration::ZERO);
        assert_eq!(sent.len(), 1);
        let Message::Ping(ping) = sent[0] else { panic!("expected ping") };
        assert!(!ping.echo);

        let echoed = Message::Ping(PingMessage { ts_millis: ping.ts_millis, echo: true });
        link.on_message(echoed, t0 + Duration::from_millis(30));
        assert!(link.stats().rtt_ms >= 0.0);
    }

    #[test]
    fn renegotiate_fails_after_max_attempts() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        link.max_renegotiation_attempts = 2;
        assert!(link.renegotiate().is_ok());
        assert!(link.renegotiate().is_ok());
        assert!(link.renegotiate().is_err());
        assert_eq!(link.state(), PeerLinkState::Closed);
    }

    #[test]
    fn renegotiate_resets_on_recovery() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        link.renegotiate().unwrap();
        assert_eq!(link.state(), PeerLinkState::Interrupted);
        link.on_message(Message::Ping(PingMessage { ts_millis: 0.0, echo: false }), Instant::now());
        assert_eq!(link.state(), PeerLinkState::Running);
    }

    #[test]
    fn disconnect_timeout_detected() {
        let mut link = PeerLink::new(2, Duration::from_millis(10));
        let t0 = Instant::now();
        link.on_message(Message::Ping(PingMessage { ts_millis: 0.0, echo: false }), t0);
        assert!(!link.is_disconnect_timed_out(t0 + Duration::from_millis(1)));
        assert!(link.is_disconnect_timed_out(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn congestion_drops_pings_before_inputs() {
        let mut link = PeerLink::new(2, Duration::from_secs(5));
        link.pacer = TokenBucket::new(8, 0);
        link.send_queue.push_back(Message::Ping(PingMessage { ts_millis: 0.0, echo: false }));
        link.send_input(Frame::new(0), 1);
        let sent = link.drain_outgoing(Duration::ZERO);
        // Tiny bucket: neither message likely fits, but the input must
        // survive in the queue rather than being dropped.
        assert!(sent.iter().all(|m| !matches!(m, Message::Renegotiate)));
        assert!(link.send_queue.iter().any(|m| matches!(m, Message::Input(_))));
    }
}
