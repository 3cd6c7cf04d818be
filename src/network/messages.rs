//! Wire message types carried over the input and control channels
//! (`spec.md` §4.4, §6).
//!
//! [`Message`] is what [`crate::network::NonBlockingSocket`] implementations
//! send and receive. The binary wire form (the default, and the only one
//! produced by [`crate::network::codec`]) is a plain `serde` derive over
//! this enum, which `bincode` encodes as a tag discriminant plus fields —
//! compact and, crucially, supported by a non-self-describing format.
//!
//! The `json` feature additionally exposes [`Message::to_json_tagged`] /
//! [`Message::from_json_tagged`], which produce exactly the
//! `{"t": "i", "f": ..., "b": ...}` shape `spec.md` §6 specifies for the
//! textual reference encoding. That shape uses internal tagging
//! (`#[serde(tag = "t")]`), which `serde_json` supports fine but `bincode`
//! does not, so it is kept as a separate mapping rather than the derive on
//! `Message` itself.

use serde::{Deserialize, Serialize};

use crate::Frame;

/// The sole high-rate message: one player's input for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputMessage {
    /// The frame this input applies to.
    pub frame: Frame,
    /// The encoded [`crate::input::PlayerInput`] bitmask.
    pub bits: u32,
}

/// A periodic liveness/latency probe. The receiver echoes it back with
/// `echo = true`; the originator uses the round trip to update RTT and
/// jitter estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingMessage {
    /// Milliseconds since an arbitrary epoch, as observed by the sender.
    pub ts_millis: f64,
    /// `true` if this is a reply to an earlier ping.
    pub echo: bool,
}

/// Which leg of the clock-sync request/response exchange a [`ClockMessage`]
/// represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockPhase {
    /// The initial probe.
    Req,
    /// The peer's reply to a probe.
    Resp,
    /// The originator's final measurement, informational only.
    Final,
}

/// One leg of the informational one-way-delay clock sync exchange
/// (`spec.md` §4.4 "Clock sync").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockMessage {
    /// Which leg of the exchange this is.
    pub phase: ClockPhase,
    /// Timestamp the probe was sent at.
    pub ts: f64,
    /// Timestamp the peer observed on receipt (set for `Resp`/`Final`).
    pub now: f64,
}

/// A peer's reported checksum for a confirmed frame, exchanged only when
/// [`crate::session::DesyncDetection::On`] is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumReportMessage {
    /// The frame the checksum was computed for.
    pub frame: Frame,
    /// The FNV-1a checksum of that frame's snapshot blob.
    pub checksum: u32,
}

/// Every message type that can cross the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Message {
    /// An input datagram on the input channel.
    Input(InputMessage),
    /// A ping or ping reply on the control channel.
    Ping(PingMessage),
    /// A clock-sync probe, reply, or final measurement.
    Clock(ClockMessage),
    /// A request to reopen the input channel after an apparent stall.
    Renegotiate,
    /// An optional desync-detection checksum report.
    ChecksumReport(ChecksumReportMessage),
}

#[cfg(feature = "json")]
mod json {
    use serde::{Deserialize, Serialize};
    use serde_json::Error as JsonError;

    use super::{
        ChecksumReportMessage, ClockMessage, ClockPhase, InputMessage, Message, PingMessage,
    };
    use crate::Frame;

    /// Mirrors `spec.md` §6's exact JSON-tagged wire shapes. Kept separate
    /// from [`Message`] because `#[serde(tag = "t")]` (internal tagging)
    /// only works with self-describing formats; `bincode` needs the plain
    /// externally-tagged derive on `Message` instead.
    #[derive(Serialize, Deserialize)]
    #[serde(tag = "t")]
    enum Tagged {
        #[serde(rename = "i")]
        Input { f: u32, b: u32 },
        #[serde(rename = "p")]
        Ping { ts: f64, echo: bool },
        #[serde(rename = "clock")]
        Clock {
            phase: TaggedClockPhase,
            ts: f64,
            now: f64,
        },
        #[serde(rename = "renegotiate")]
        Renegotiate,
        #[serde(rename = "checksum")]
        ChecksumReport { frame: u32, checksum: u32 },
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum TaggedClockPhase {
        Req,
        Resp,
        Final,
    }

    impl From<ClockPhase> for TaggedClockPhase {
        fn from(phase: ClockPhase) -> Self {
            match phase {
                ClockPhase::Req => TaggedClockPhase::Req,
                ClockPhase::Resp => TaggedClockPhase::Resp,
                ClockPhase::Final => TaggedClockPhase::Final,
            }
        }
    }

    impl From<TaggedClockPhase> for ClockPhase {
        fn from(phase: TaggedClockPhase) -> Self {
            match phase {
                TaggedClockPhase::Req => ClockPhase::Req,
                TaggedClockPhase::Resp => ClockPhase::Resp,
                TaggedClockPhase::Final => ClockPhase::Final,
            }
        }
    }

    impl From<Message> for Tagged {
        fn from(msg: Message) -> Self {
            match msg {
                Message::Input(InputMessage { frame, bits }) => Tagged::Input {
                    f: frame.as_i32() as u32,
                    b: bits,
                },
                Message::Ping(PingMessage { ts_millis, echo }) => Tagged::Ping {
                    ts: ts_millis,
                    echo,
                },
                Message::Clock(ClockMessage { phase, ts, now }) => Tagged::Clock {
                    phase: phase.into(),
                    ts,
                    now,
                },
                Message::Renegotiate => Tagged::Renegotiate,
                Message::ChecksumReport(ChecksumReportMessage { frame, checksum }) => {
                    Tagged::ChecksumReport {
                        frame: frame.as_i32() as u32,
                        checksum,
                    }
                }
            }
        }
    }

    impl From<Tagged> for Message {
        fn from(tagged: Tagged) -> Self {
            match tagged {
                Tagged::Input { f, b } => Message::Input(InputMessage {
                    frame: Frame::new(f as i32),
                    bits: b,
                }),
                Tagged::Ping { ts, echo } => Message::Ping(PingMessage { ts_millis: ts, echo }),
                Tagged::Clock { phase, ts, now } => Message::Clock(ClockMessage {
                    phase: phase.into(),
                    ts,
                    now,
                }),
                Tagged::Renegotiate => Message::Renegotiate,
                Tagged::ChecksumReport { frame, checksum } => {
                    Message::ChecksumReport(ChecksumReportMessage {
                        frame: Frame::new(frame as i32),
                        checksum,
                    })
                }
            }
        }
    }

    impl Message {
        /// Serializes this message into the `{"t": ..., ...}` textual shape
        /// `spec.md` §6 specifies for the reference encoding.
        ///
        /// # Errors
        ///
        /// Returns an error if `serde_json` fails to serialize (should not
        /// happen for this type).
        pub fn to_json_tagged(self) -> Result<String, JsonError> {
            serde_json::to_string(&Tagged::from(self))
        }

        /// Parses a message previously produced by
        /// [`Message::to_json_tagged`].
        ///
        /// # Errors
        ///
        /// Returns an error if `text` is not valid JSON or does not match
        /// one of the tagged shapes.
        pub fn from_json_tagged(text: &str) -> Result<Message, JsonError> {
            serde_json::from_str::<Tagged>(text).map(Message::from)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn input_round_trips_through_tagged_json() {
            let msg = Message::Input(InputMessage {
                frame: Frame::new(42),
                bits: 0x1234,
            });
            let text = msg.to_json_tagged().unwrap();
            assert!(text.contains("\"t\":\"i\""));
            let back = Message::from_json_tagged(&text).unwrap();
            assert_eq!(msg, back);
        }

        #[test]
        fn renegotiate_has_exact_tag() {
            let text = Message::Renegotiate.to_json_tagged().unwrap();
            assert_eq!(text, r#"{"t":"renegotiate"}"#);
        }

        #[test]
        fn checksum_report_round_trips() {
            let msg = Message::ChecksumReport(ChecksumReportMessage {
                frame: Frame::new(7),
                checksum: 0xdead_beef,
            });
            let text = msg.to_json_tagged().unwrap();
            let back = Message::from_json_tagged(&text).unwrap();
            assert_eq!(msg, back);
        }

        #[test]
        fn clock_phase_round_trips() {
            let msg = Message::Clock(ClockMessage {
                phase: ClockPhase::Resp,
                ts: 1.0,
                now: 2.0,
            });
            let text = msg.to_json_tagged().unwrap();
            let back = Message::from_json_tagged(&text).unwrap();
            assert_eq!(msg, back);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_message_equality() {
        let a = Message::Input(InputMessage {
            frame: Frame::new(1),
            bits: 5,
        });
        let b = Message::Input(InputMessage {
            frame: Frame::new(1),
            bits: 5,
        });
        assert_eq!(a, b);
    }

    #[test]
    fn renegotiate_is_zero_sized_variant() {
        assert_eq!(Message::Renegotiate, Message::Renegotiate);
    }
}
