//! The unreliable, jitter-tolerant peer transport (`spec.md` §4.4).
//!
//! [`NonBlockingSocket`] is the seam between this crate and whatever actually
//! moves bytes (a UDP socket, a WebRTC data channel, an in-memory channel for
//! tests). Everything above that trait — resequencing, pacing, ping/jitter
//! estimation, optional encryption — is transport-agnostic and lives in
//! [`protocol`].

use crate::network::messages::Message;

pub mod codec;
pub mod messages;
pub mod network_stats;
pub mod pacer;
pub mod protocol;
pub mod resequencer;

#[cfg(feature = "encryption")]
pub mod encryption;
#[cfg(feature = "udp")]
pub mod udp_socket;

pub use network_stats::TransportStats;
pub use protocol::PeerLink;

/// A non-blocking message transport, addressed by peer identity `A`.
///
/// Implementations must never block in either method: [`send_to`] enqueues
/// or fires-and-forgets, and [`receive_all_messages`] drains whatever has
/// arrived so far and returns immediately. This is the same contract the
/// teacher's socket trait documents, and is what lets the rollback
/// controller's single cooperative worker poll the transport without ever
/// suspending.
///
/// [`send_to`]: NonBlockingSocket::send_to
/// [`receive_all_messages`]: NonBlockingSocket::receive_all_messages
pub trait NonBlockingSocket<A> {
    /// Sends one message to `addr`. Delivery is not guaranteed.
    fn send_to(&mut self, msg: &Message, addr: &A);

    /// Returns every message that has arrived since the last call, paired
    /// with the address it arrived from.
    fn receive_all_messages(&mut self) -> Vec<(A, Message)>;
}
