//! Outward notifications and their best-effort delivery.

use crossbeam_channel::{Receiver, Sender, bounded};
use spectap_core::{CaptureBytes, CaptureFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, cheaply clonable player id.
pub type PlayerId = Arc<str>;

/// A notification for listeners (and whatever bridge forwards them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// New waveform bytes for `id`.
    WaveformChanged {
        /// Player id.
        id: PlayerId,
        /// One byte per captured frame.
        bytes: CaptureBytes,
    },
    /// New spectrum bytes for `id`.
    SpectrumChanged {
        /// Player id.
        id: PlayerId,
        /// Quantized spectrum, real/imaginary byte pairs.
        bytes: CaptureBytes,
    },
    /// The state of `id` changed; query it for details.
    StateChanged {
        /// Player id.
        id: PlayerId,
    },
}

impl PlayerEvent {
    /// Id of the player this event belongs to.
    pub fn id(&self) -> &str {
        match self {
            PlayerEvent::WaveformChanged { id, .. }
            | PlayerEvent::SpectrumChanged { id, .. }
            | PlayerEvent::StateChanged { id } => &**id,
        }
    }
}

/// Non-blocking sender side of the event channel.
///
/// Delivery is fire-and-forget: when the channel is full the event is
/// dropped and counted. Sending never allocates, so the sink is safe to use
/// from the audio thread.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<PlayerEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Creates a sink with room for `capacity` undelivered events.
    pub fn new(capacity: usize) -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    fn send(&self, event: PlayerEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Publishes a captured frame as a waveform event then a spectrum event.
    pub fn capture(&self, id: &PlayerId, frame: &CaptureFrame) {
        self.send(PlayerEvent::WaveformChanged {
            id: Arc::clone(id),
            bytes: frame.waveform,
        });
        self.send(PlayerEvent::SpectrumChanged {
            id: Arc::clone(id),
            bytes: frame.spectrum,
        });
    }

    /// Publishes a state change.
    pub fn state_changed(&self, id: &PlayerId) {
        self.send(PlayerEvent::StateChanged { id: Arc::clone(id) });
    }

    /// Number of events dropped because nobody was draining the channel.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.tx.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_channel_drops_and_counts() {
        let (sink, rx) = EventSink::new(2);
        let id: PlayerId = Arc::from("p1");
        sink.state_changed(&id);
        sink.capture(&id, &CaptureFrame::silent(8));
        assert_eq!(rx.len(), 2);
        assert_eq!(sink.dropped(), 1);

        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::StateChanged { id: id.clone() });
        match rx.try_recv().unwrap() {
            PlayerEvent::WaveformChanged { id, bytes } => {
                assert_eq!(&*id, "p1");
                assert_eq!(bytes.len(), 8);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disconnected_receiver_is_not_an_error() {
        let (sink, rx) = EventSink::new(4);
        drop(rx);
        sink.state_changed(&Arc::from("gone"));
        assert_eq!(sink.dropped(), 1);
    }
}
