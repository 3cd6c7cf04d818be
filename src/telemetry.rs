//! Host-facing diagnostic events.
//!
//! Unlike [`crate::error::NetcodeError`], which covers conditions that are
//! terminal or caller mistakes, [`NetcodeEvent`] carries conditions whose
//! *policy* is host-defined (`spec.md` §7: "policy is host-defined (log, end
//! match, or force resync)"). The controller and transport emit these
//! through a small observer so a host can log them, surface them in a debug
//! overlay, or collect them in tests — mirroring the teacher's structured
//! violation-reporting pipeline, scaled down to the handful of conditions
//! this crate actually needs to report.

use parking_lot::Mutex;

use crate::Frame;

/// A diagnostic condition raised by the transport or rollback controller
/// that does not stop the session but that a host may want to react to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum NetcodeEvent {
    /// A confirmed remote state checksum disagreed with the local checksum
    /// at the same frame (`spec.md` §7 "Desync").
    DesyncDetected {
        /// The frame the mismatch was observed on.
        frame: Frame,
        /// The checksum computed locally for this frame.
        local_checksum: u32,
        /// The checksum the peer reported for this frame.
        remote_checksum: u32,
    },
    /// The resequencer filled a gap by repeating the last delivered input
    /// bits rather than waiting (`spec.md` §4.4 packet-loss concealment).
    PacketLossConcealed {
        /// The frame that was filled in.
        frame: Frame,
    },
    /// A renegotiation attempt was started after the control channel or
    /// input channel appeared to stall.
    RenegotiationAttempted {
        /// Which attempt this is, counting from 1.
        attempt: u32,
    },
    /// The controller rewound and resimulated frames after a remote input
    /// prediction was corrected.
    RollbackOccurred {
        /// The earliest frame that was resimulated.
        from_frame: Frame,
        /// How many frames were resimulated.
        span: u32,
    },
}

/// Receives [`NetcodeEvent`]s as they are emitted.
///
/// The default observer used by [`crate::session::NetcodeService`] logs via
/// `tracing`; tests typically install a [`CollectingObserver`] instead.
pub trait EventObserver: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: NetcodeEvent);
}

/// An observer that logs every event through `tracing` at a level
/// appropriate to its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn on_event(&self, event: NetcodeEvent) {
        match event {
            NetcodeEvent::DesyncDetected {
                frame,
                local_checksum,
                remote_checksum,
            } => {
                tracing::error!(
                    %frame,
                    local_checksum,
                    remote_checksum,
                    "desync detected: local and remote checksums disagree"
                );
            }
            NetcodeEvent::PacketLossConcealed { frame } => {
                tracing::warn!(%frame, "packet loss concealed by repeating last input");
            }
            NetcodeEvent::RenegotiationAttempted { attempt } => {
                tracing::info!(attempt, "attempting channel renegotiation");
            }
            NetcodeEvent::RollbackOccurred { from_frame, span } => {
                tracing::debug!(%from_frame, span, "rollback resimulated frames");
            }
        }
    }
}

/// An observer that records every event it receives, for assertions in
/// tests.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<NetcodeEvent>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every event recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<NetcodeEvent> {
        self.events.lock().clone()
    }

    /// Clears all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventObserver for CollectingObserver {
    fn on_event(&self, event: NetcodeEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_observer_records_events() {
        let observer = CollectingObserver::new();
        observer.on_event(NetcodeEvent::PacketLossConcealed { frame: Frame::new(5) });
        observer.on_event(NetcodeEvent::RenegotiationAttempted { attempt: 1 });
        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], NetcodeEvent::PacketLossConcealed { .. }));
    }

    #[test]
    fn clear_empties_the_collector() {
        let observer = CollectingObserver::new();
        observer.on_event(NetcodeEvent::RenegotiationAttempted { attempt: 1 });
        observer.clear();
        assert!(observer.events().is_empty());
    }

    #[test]
    fn tracing_observer_does_not_panic_on_any_variant() {
        let observer = TracingObserver;
        observer.on_event(NetcodeEvent::DesyncDetected {
            frame: Frame::new(1),
            local_checksum: 1,
            remote_checksum: 2,
        });
        observer.on_event(NetcodeEvent::RollbackOccurred {
            from_frame: Frame::new(1),
            span: 3,
        });
    }
}
