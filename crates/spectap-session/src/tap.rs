//! Capture tap: the session's hook into the engine's buffer callback.

use crate::events::{EventSink, PlayerId};
use spectap_core::CaptureProcessor;
use spectap_io::{AudioBlock, MediaEngine};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One session's capture registration.
///
/// While enabled, every engine buffer is turned into a capture frame and
/// published, but only while the session's playing flag is set. The
/// processor is allocated here on the control thread and moved into the
/// callback, so the audio thread only computes and sends.
pub(crate) struct CaptureTap {
    player: PlayerId,
    capture_size: usize,
    sink: EventSink,
    playing: Arc<AtomicBool>,
    enabled: bool,
}

impl CaptureTap {
    pub(crate) fn new(player: PlayerId, capture_size: usize, sink: EventSink) -> Self {
        Self {
            player,
            capture_size,
            sink,
            playing: Arc::new(AtomicBool::new(false)),
            enabled: false,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Installs the callback on `engine`; a no-op when already enabled.
    pub(crate) fn enable(&mut self, engine: &mut dyn MediaEngine) {
        if self.enabled {
            return;
        }
        let mut processor = Box::new(CaptureProcessor::new(self.capture_size));
        let sink = self.sink.clone();
        let player = Arc::clone(&self.player);
        let playing = Arc::clone(&self.playing);

        engine.install_tap(Box::new(move |block: &AudioBlock<'_>| {
            if !playing.load(Ordering::Acquire) {
                return;
            }
            let frame = processor.process(block.samples, block.channels);
            sink.capture(&player, &frame);
        }));
        self.enabled = true;
        tracing::debug!(player = %self.player, capture_size = self.capture_size, "capture tap enabled");
    }

    /// Removes the callback from `engine`; a no-op when not enabled.
    pub(crate) fn disable(&mut self, engine: &mut dyn MediaEngine) {
        if !self.enabled {
            return;
        }
        engine.remove_tap();
        self.enabled = false;
        tracing::debug!(player = %self.player, "capture tap disabled");
    }

    /// Updates the flag the audio thread checks before forwarding.
    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayerEvent;
    use crossbeam_channel::bounded;
    use spectap_io::{EngineCall, ScriptedEngine};

    #[test]
    fn enable_and_disable_are_idempotent() {
        let (tx, _rx) = bounded(4);
        let (mut engine, handle) = ScriptedEngine::new(tx);
        let (sink, _events) = EventSink::new(8);
        let mut tap = CaptureTap::new(Arc::from("p"), 16, sink);

        tap.disable(&mut engine);
        tap.enable(&mut engine);
        tap.enable(&mut engine);
        tap.disable(&mut engine);
        tap.disable(&mut engine);

        assert_eq!(handle.calls(), vec![EngineCall::InstallTap, EngineCall::RemoveTap]);
    }

    #[test]
    fn forwards_only_while_playing() {
        let (tx, _rx) = bounded(4);
        let (mut engine, handle) = ScriptedEngine::new(tx);
        let (sink, events) = EventSink::new(8);
        let mut tap = CaptureTap::new(Arc::from("p"), 4, sink);
        tap.enable(&mut engine);

        assert!(handle.push_buffer(&[0.5; 8], 2));
        assert!(events.try_recv().is_err());

        tap.set_playing(true);
        assert!(handle.push_buffer(&[0.5; 8], 2));
        match events.try_recv().unwrap() {
            PlayerEvent::WaveformChanged { bytes, .. } => assert_eq!(bytes.as_slice(), &[64; 4]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            events.try_recv().unwrap(),
            PlayerEvent::SpectrumChanged { .. }
        ));
    }
}
