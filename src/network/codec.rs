//! Binary codec for network message serialization.
//!
//! Centralizes the `bincode` configuration so every send/receive path in
//! the transport serializes the same way. Fixed-width integer encoding
//! keeps message sizes deterministic, which matters for the token-bucket
//! pacer's byte accounting.

use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Errors that can occur during encoding or decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The encoding operation failed.
    EncodeError(String),
    /// The decoding operation failed.
    DecodeError(String),
    /// The provided buffer was too small for encoding.
    BufferTooSmall {
        /// The actual buffer size provided.
        provided: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodeError(msg) => write!(f, "encoding failed: {msg}"),
            Self::DecodeError(msg) => write!(f, "decoding failed: {msg}"),
            Self::BufferTooSmall { provided } => {
                write!(f, "buffer too small: only {provided} bytes provided")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a value into a new `Vec<u8>`.
///
/// # Errors
///
/// Returns [`CodecError::EncodeError`] if `bincode` rejects the value
/// (should not happen for this crate's message types).
pub fn encode<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, config()).map_err(|e| CodecError::EncodeError(e.to_string()))
}

/// Encodes a value into an existing byte slice, returning the number of
/// bytes written.
///
/// # Errors
///
/// Returns [`CodecError::BufferTooSmall`] if `buffer` is not large enough.
pub fn encode_into<T: Serialize>(value: &T, buffer: &mut [u8]) -> CodecResult<usize> {
    bincode::serde::encode_into_slice(value, buffer, config()).map_err(|e| {
        let msg = e.to_string();
        if msg.contains("UnexpectedEnd") || msg.contains("not enough") {
            CodecError::BufferTooSmall { provided: buffer.len() }
        } else {
            CodecError::EncodeError(msg)
        }
    })
}

/// Decodes a value from a byte slice, returning the value and the number
/// of bytes consumed.
///
/// # Errors
///
/// Returns [`CodecError::DecodeError`] if `bytes` does not contain a valid
/// encoding of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<(T, usize)> {
    bincode::serde::decode_from_slice(bytes, config()).map_err(|e| CodecError::DecodeError(e.to_string()))
}

/// Decodes a value from a byte slice, discarding the consumed-byte count.
///
/// # Errors
///
/// Returns [`CodecError::DecodeError`] if `bytes` does not contain a valid
/// encoding of `T`.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    decode(bytes).map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::messages::{InputMessage, Message};
    use crate::Frame;

    #[test]
    fn roundtrip_primitive() {
        let bytes = encode(&42u32).unwrap();
        let (decoded, len): (u32, _) = decode(&bytes).unwrap();
        assert_eq!(decoded, 42);
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn roundtrip_message() {
        let msg = Message::Input(InputMessage {
            frame: Frame::new(9),
            bits: 0xBEEF,
        });
        let bytes = encode(&msg).unwrap();
        let decoded: Message = decode_value(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn encode_into_buffer_too_small_reports_error() {
        let mut buf = [0u8; 1];
        let result = encode_into(&0x1234_5678_9abc_def0u64, &mut buf);
        assert!(result.is_err());
    }

    #[test]
    fn encoding_is_deterministic() {
        let msg = Message::Renegotiate;
        assert_eq!(encode(&msg).unwrap(), encode(&msg).unwrap());
    }

    #[test]
    fn decode_invalid_data_errors() {
        let invalid = [0xFFu8; 3];
        let result: CodecResult<(Message, usize)> = decode(&invalid);
        assert!(result.is_err());
    }
}
