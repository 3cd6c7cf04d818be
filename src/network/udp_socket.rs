//! A concrete [`crate::network::NonBlockingSocket`] backed by
//! `std::net::UdpSocket`, gated behind the `udp` feature (`SPEC_FULL.md`
//! §4.4, §6: "the crate only requires an implementation of a
//! `NonBlockingSocket`-style trait; one concrete `std::net::UdpSocket`-backed
//! adapter is provided as the default").

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use crate::network::codec;
use crate::network::messages::Message;
use crate::network::NonBlockingSocket;

const RECV_BUFFER_SIZE: usize = 4096;
const SEND_BUFFER_SIZE: usize = 1024;

/// A non-blocking UDP socket adapter, bound to `0.0.0.0:port`.
///
/// Maintains reusable send/receive buffers to keep the hot per-frame path
/// allocation-free for typically-sized input datagrams; unusually large
/// messages fall back to an allocating encode with a warning.
#[derive(Debug)]
pub struct UdpNonBlockingSocket {
    socket: UdpSocket,
    recv_buffer: [u8; RECV_BUFFER_SIZE],
    send_buffer: [u8; SEND_BUFFER_SIZE],
}

impl UdpNonBlockingSocket {
    /// Binds to `0.0.0.0:port` in non-blocking mode.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `bind` or `set_nonblocking`.
    pub fn bind_to_port(port: u16) -> std::io::Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(UdpNonBlockingSocket {
            socket,
            recv_buffer: [0; RECV_BUFFER_SIZE],
            send_buffer: [0; SEND_BUFFER_SIZE],
        })
    }

    fn send_encoded(&self, bytes: &[u8], addr: &SocketAddr) {
        if let Err(err) = self.socket.send_to(bytes, addr) {
            tracing::warn!(%err, %addr, "udp send_to failed");
        }
    }
}

impl NonBlockingSocket<SocketAddr> for UdpNonBlockingSocket {
    fn send_to(&mut self, msg: &Message, addr: &SocketAddr) {
        match codec::encode_into(msg, &mut self.send_buffer) {
            Ok(len) => {
                let bytes = self.send_buffer[..len].to_vec();
                self.send_encoded(&bytes, addr);
            }
            Err(codec::CodecError::BufferTooSmall { provided }) => {
                tracing::warn!(provided, "message exceeds send buffer, falling back to allocation");
                match codec::encode(msg) {
                    Ok(bytes) => self.send_encoded(&bytes, addr),
                    Err(err) => tracing::error!(%err, "failed to encode outgoing message"),
                }
            }
            Err(err) => tracing::error!(%err, "failed to encode outgoing message"),
        }
    }

    fn receive_all_messages(&mut self) -> Vec<(SocketAddr, Message)> {
        let mut received = Vec::new();
        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((len, addr)) => match codec::decode_value::<Message>(&self.recv_buffer[..len]) {
                    Ok(msg) => received.push((addr, msg)),
                    Err(err) => tracing::warn!(%err, %addr, "dropping malformed datagram"),
                },
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) => {
                    tracing::warn!(%err, "udp recv_from failed");
                    break;
                }
            }
        }
        received
    }
}
