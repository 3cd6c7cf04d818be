//! Error types for Brawlback.
//!
//! Per the taxonomy in the design notes, transient network conditions
//! (packet loss, reordering, brief disconnects) never surface here — the
//! transport absorbs them silently and counts them (see
//! [`crate::network::network_stats::NetworkStats`]). [`NetcodeError`] covers
//! only the conditions that are terminal for the host, or that are host
//! programmer errors.
//!
//! `DesyncDetected` is deliberately *not* a variant of this type: per
//! `spec.md` §7 its policy is host-defined (log, end the match, or force a
//! resync), so it is surfaced as a [`crate::telemetry::NetcodeEvent`]
//! instead of an error the host must handle via `Result`.

use std::fmt;

use crate::Frame;

/// Why a frame number passed to the controller or replay player was invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum InvalidFrameReason {
    /// The frame was [`Frame::NULL`].
    NullFrame,
    /// The frame was negative (other than `NULL_FRAME`).
    Negative,
    /// The requested frame is not in the past relative to `current_frame`.
    NotInPast {
        /// The controller's current frame at the time of the request.
        current_frame: Frame,
    },
    /// The requested frame has already left the rollback window and its
    /// snapshot has been evicted.
    OutsideRollbackWindow {
        /// The controller's current frame at the time of the request.
        current_frame: Frame,
        /// The configured `max_rollback` window size.
        max_rollback: usize,
    },
}

impl fmt::Display for InvalidFrameReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullFrame => write!(f, "frame is NULL_FRAME"),
            Self::Negative => write!(f, "frame is negative"),
            Self::NotInPast { current_frame } => {
                write!(f, "frame is not in the past (current frame: {current_frame})")
            }
            Self::OutsideRollbackWindow {
                current_frame,
                max_rollback,
            } => write!(
                f,
                "frame is outside the {max_rollback}-frame rollback window (current frame: {current_frame})"
            ),
        }
    }
}

/// Why a snapshot blob failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SnapshotDecodeReason {
    /// The buffer was shorter than the fixed-width header.
    TruncatedHeader {
        /// Bytes actually present.
        got: usize,
        /// Bytes required for the header.
        want: usize,
    },
    /// The buffer ended partway through a character record.
    TruncatedCharacter {
        /// Index of the character record that ran out of bytes.
        index: usize,
    },
    /// A character's `state` byte did not map to a known [`crate::kernel::state::CharacterState`].
    UnknownStateTag(u8),
    /// A move's `phase` byte did not map to a known [`crate::kernel::state::MovePhase`].
    UnknownPhaseTag(u8),
    /// The character count in the header exceeds the protocol maximum (2).
    TooManyCharacters(u8),
    /// The `json` fallback form failed to parse.
    InvalidJson,
}

impl fmt::Display for SnapshotDecodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader { got, want } => {
                write!(f, "snapshot buffer truncated: got {got} bytes, need at least {want}")
            }
            Self::TruncatedCharacter { index } => {
                write!(f, "snapshot buffer truncated while reading character {index}")
            }
            Self::UnknownStateTag(tag) => write!(f, "unknown character state tag {tag}"),
            Self::UnknownPhaseTag(tag) => write!(f, "unknown move phase tag {tag}"),
            Self::TooManyCharacters(count) => write!(f, "snapshot declares {count} characters, maximum is 2"),
            Self::InvalidJson => write!(f, "snapshot json fallback failed to parse"),
        }
    }
}

/// Why a peer was declared unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SessionLostReason {
    /// Renegotiation was attempted and failed this many times in a row.
    RenegotiationRetriesExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },
    /// No datagram of any kind was received within the disconnect timeout.
    DisconnectTimeout {
        /// The configured timeout, in milliseconds.
        timeout_ms: u128,
    },
    /// The host explicitly called [`crate::session::NetcodeService::disable`].
    HostDisabled,
}

impl fmt::Display for SessionLostReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenegotiationRetriesExhausted { attempts } => {
                write!(f, "renegotiation failed after {attempts} attempts")
            }
            Self::DisconnectTimeout { timeout_ms } => {
                write!(f, "no packets received within {timeout_ms}ms disconnect timeout")
            }
            Self::HostDisabled => write!(f, "session was disabled by the host"),
        }
    }
}

/// The error type returned by fallible Brawlback operations.
///
/// Construction is allocation-free: every variant stores typed context
/// fields rather than a formatted string, and [`fmt::Display`] formats
/// lazily only when the error is actually printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NetcodeError {
    /// A frame number supplied by the host was invalid for the requested operation.
    InvalidFrame {
        /// The offending frame.
        frame: Frame,
        /// Why it was rejected.
        reason: InvalidFrameReason,
    },
    /// A snapshot blob could not be decoded.
    SnapshotDecode(SnapshotDecodeReason),
    /// The peer is unreachable and the session cannot continue.
    SessionLost(SessionLostReason),
    /// `frame_delay` or `jitter_buffer_frames` was set to a value outside its valid range.
    InvalidConfig {
        /// Name of the rejected field.
        field: &'static str,
        /// The rejected value.
        value: i64,
    },
}

impl fmt::Display for NetcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrame { frame, reason } => {
                write!(f, "invalid frame {frame}: {reason}")
            }
            Self::SnapshotDecode(reason) => write!(f, "snapshot decode failed: {reason}"),
            Self::SessionLost(reason) => write!(f, "session lost: {reason}"),
            Self::InvalidConfig { field, value } => {
                write!(f, "invalid configuration: {field} = {value}")
            }
        }
    }
}

impl std::error::Error for NetcodeError {}
