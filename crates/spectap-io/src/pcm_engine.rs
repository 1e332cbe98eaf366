//! PCM playback engine on top of an [`AudioBackend`].
//!
//! Sources are decoded on a loader thread, then rendered by a
//! [`PlaybackProcessor`] that lives inside the output callback. The control
//! side talks to the audio thread only through a command channel drained at
//! the top of every buffer and a pair of atomics; the callback never locks.
//! Taps the callback lets go of travel back over a bounded channel and are
//! dropped on the next control call, so the callback never frees memory.

use crate::backend::{AudioBackend, BackendStreamConfig, StreamHandle};
use crate::engine::{AudioBlock, BufferCallback, EngineEvent, EngineFactory, LoadToken, MediaEngine, MediaInfo};
use crate::{AssetResolver, CpalBackend, DecodedAudio, Error, Result, SourceLocator, codes, read_wav};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Removed taps the audio thread can hold before the control side collects them.
const RETIRED_TAP_CAPACITY: usize = 8;

/// Output settings shared by every engine a factory creates.
#[derive(Debug, Clone)]
pub struct PcmOptions {
    /// Substring of the output device name (system default if `None`).
    pub device_name: Option<String>,
    /// Preferred output buffer size in frames.
    pub buffer_size: u32,
    /// Output channel count.
    pub channels: u16,
    /// Resolver for `asset://` sources.
    pub assets: AssetResolver,
}

impl Default for PcmOptions {
    fn default() -> Self {
        Self {
            device_name: None,
            buffer_size: 1024,
            channels: 2,
            assets: AssetResolver::default(),
        }
    }
}

/// Commands from the control thread to the audio thread.
enum StreamCommand {
    InstallTap(BufferCallback),
    RemoveTap,
    Rewind,
}

/// Flags written by one side and read by the other.
#[derive(Default)]
struct Shared {
    playing: AtomicBool,
    clock: AtomicU64,
}

struct PendingLoad {
    token: LoadToken,
    audio: Arc<DecodedAudio>,
}

/// Audio-thread renderer for one decoded source.
///
/// Steps through the source at `source_rate / device_rate` frames per
/// output frame (nearest sample), maps source channels onto output
/// channels round-robin, and hands each rendered buffer to the tap.
pub(crate) struct PlaybackProcessor {
    audio: Arc<DecodedAudio>,
    total_frames: f64,
    cursor: f64,
    step: f64,
    out_channels: usize,
    shared: Arc<Shared>,
    commands: Receiver<StreamCommand>,
    events: Sender<EngineEvent>,
    tap: Option<BufferCallback>,
    retired: Sender<BufferCallback>,
    completion_pending: bool,
}

impl PlaybackProcessor {
    fn new(
        audio: Arc<DecodedAudio>,
        device_rate: u32,
        out_channels: usize,
        shared: Arc<Shared>,
        commands: Receiver<StreamCommand>,
        events: Sender<EngineEvent>,
        retired: Sender<BufferCallback>,
    ) -> Self {
        let step = if device_rate > 0 {
            f64::from(audio.sample_rate) / f64::from(device_rate)
        } else {
            1.0
        };
        Self {
            total_frames: audio.frames() as f64,
            audio,
            cursor: 0.0,
            step,
            out_channels: out_channels.max(1),
            shared,
            commands,
            events,
            tap: None,
            retired,
            completion_pending: false,
        }
    }

    /// Process one output buffer: drain commands, render, feed the tap.
    pub(crate) fn process_buffer(&mut self, data: &mut [f32]) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                StreamCommand::InstallTap(tap) => {
                    if let Some(old) = self.tap.replace(tap) {
                        self.retire(old);
                    }
                }
                StreamCommand::RemoveTap => {
                    if let Some(old) = self.tap.take() {
                        self.retire(old);
                    }
                }
                StreamCommand::Rewind => {
                    self.cursor = 0.0;
                    self.completion_pending = false;
                }
            }
        }
        self.announce_completion();

        if !self.shared.playing.load(Ordering::Acquire) {
            data.fill(0.0);
            return;
        }

        let src_channels = usize::from(self.audio.channels.max(1));
        for frame in data.chunks_exact_mut(self.out_channels) {
            if self.cursor >= self.total_frames {
                frame.fill(0.0);
                continue;
            }
            let base = self.cursor as usize * src_channels;
            for (c, out) in frame.iter_mut().enumerate() {
                *out = self.audio.samples[base + c % src_channels];
            }
            self.cursor += self.step;
        }

        self.shared
            .clock
            .store(self.cursor.min(self.total_frames) as u64, Ordering::Release);

        if let Some(tap) = self.tap.as_mut() {
            tap(&AudioBlock {
                samples: data,
                channels: self.out_channels,
            });
        }

        // Restarting while parked at the end completes again, repeating a
        // completion the session ignored while paused.
        if self.cursor >= self.total_frames {
            self.shared.playing.store(false, Ordering::Release);
            self.completion_pending = true;
            self.announce_completion();
        }
    }

    /// Sends a pending `Completed`, retrying on later buffers while the queue is full.
    fn announce_completion(&mut self) {
        if self.completion_pending
            && !matches!(
                self.events.try_send(EngineEvent::Completed),
                Err(TrySendError::Full(_))
            )
        {
            self.completion_pending = false;
        }
    }

    /// Hands a tap back to the control side to be dropped there.
    fn retire(&self, tap: BufferCallback) {
        // Full only if the control side has stopped collecting.
        let _ = self.retired.try_send(tap);
    }
}

/// Decodes WAV sources and plays them through an [`AudioBackend`].
pub struct PcmEngine {
    player: String,
    backend: Box<dyn AudioBackend>,
    options: PcmOptions,
    events: Sender<EngineEvent>,
    shared: Arc<Shared>,
    commands_tx: Sender<StreamCommand>,
    commands_rx: Receiver<StreamCommand>,
    retired_tx: Sender<BufferCallback>,
    retired_rx: Receiver<BufferCallback>,
    pending: Arc<Mutex<Option<PendingLoad>>>,
    requested: Arc<AtomicU64>,
    token: Option<LoadToken>,
    audio: Option<Arc<DecodedAudio>>,
    stream: Option<StreamHandle>,
}

impl PcmEngine {
    /// Creates an idle engine for `player`.
    pub fn new(
        player: impl Into<String>,
        backend: Box<dyn AudioBackend>,
        options: PcmOptions,
        events: Sender<EngineEvent>,
    ) -> Self {
        let (commands_tx, commands_rx) = unbounded();
        let (retired_tx, retired_rx) = bounded(RETIRED_TAP_CAPACITY);
        Self {
            player: player.into(),
            backend,
            options,
            events,
            shared: Arc::new(Shared::default()),
            commands_tx,
            commands_rx,
            retired_tx,
            retired_rx,
            pending: Arc::new(Mutex::new(None)),
            requested: Arc::new(AtomicU64::new(0)),
            token: None,
            audio: None,
            stream: None,
        }
    }

    fn send_command(&self, cmd: StreamCommand) {
        self.collect_retired_taps();
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.commands_tx.send(cmd);
    }

    /// Drops taps the audio thread has handed back.
    fn collect_retired_taps(&self) {
        let dropped = self.retired_rx.try_iter().count();
        if dropped > 0 {
            tracing::debug!(player = %self.player, dropped, "retired capture taps dropped");
        }
    }

    fn report_load_failure(&self, token: LoadToken, err: &Error) {
        tracing::warn!(player = %self.player, error = %err, "source load failed");
        let event = EngineEvent::LoadFailed {
            token,
            code: err.code(),
            message: "failed to load audio source".to_string(),
            detail: Some(err.to_string()),
        };
        if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
            tracing::warn!(player = %self.player, "engine event queue full, load failure dropped");
        }
    }

    /// Moves a finished load for the current token into place.
    fn adopt_pending(&mut self) {
        let Some(pending) = self.pending.lock().take() else {
            return;
        };
        if Some(pending.token) == self.token {
            self.audio = Some(pending.audio);
            self.stream = None;
        }
    }

    fn open_stream(&self, audio: Arc<DecodedAudio>) -> Result<StreamHandle> {
        let requested = BackendStreamConfig {
            sample_rate: audio.sample_rate,
            buffer_size: self.options.buffer_size,
            channels: self.options.channels.max(1),
            device_name: self.options.device_name.clone(),
        };
        let config = BackendStreamConfig {
            sample_rate: self.backend.actual_sample_rate(&requested),
            ..requested
        };

        let mut processor = PlaybackProcessor::new(
            audio,
            config.sample_rate,
            usize::from(config.channels),
            Arc::clone(&self.shared),
            self.commands_rx.clone(),
            self.events.clone(),
            self.retired_tx.clone(),
        );
        let events = self.events.clone();

        tracing::debug!(
            player = %self.player,
            backend = self.backend.name(),
            sample_rate = config.sample_rate,
            "opening output stream"
        );
        self.backend.build_output_stream(
            &config,
            Box::new(move |data: &mut [f32]| processor.process_buffer(data)),
            Box::new(move |message: &str| {
                let _ = events.try_send(EngineEvent::Fault {
                    code: codes::STREAM_ERROR,
                    detail: message.to_string(),
                });
            }),
        )
    }
}

impl MediaEngine for PcmEngine {
    fn name(&self) -> &str {
        "pcm"
    }

    fn load(&mut self, source: &SourceLocator, token: LoadToken) {
        self.reset();
        self.token = Some(token);
        self.requested.store(token.get(), Ordering::Release);

        let path = match self.options.assets.local_path(source) {
            Ok(path) => path,
            Err(e) => {
                self.report_load_failure(token, &e);
                return;
            }
        };

        let pending = Arc::clone(&self.pending);
        let requested = Arc::clone(&self.requested);
        let events = self.events.clone();
        let player = self.player.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("spectap-load-{}", self.player))
            .spawn(move || match read_wav(&path) {
                Ok(audio) => {
                    let info = MediaInfo {
                        frames: audio.frames(),
                        sample_rate: f64::from(audio.sample_rate),
                        channels: audio.channels,
                    };
                    tracing::info!(
                        player = %player,
                        path = %path.display(),
                        frames = info.frames,
                        sample_rate = info.sample_rate,
                        "source decoded"
                    );
                    {
                        let mut slot = pending.lock();
                        // A newer load or a reset superseded this one.
                        if requested.load(Ordering::Acquire) != token.get() {
                            tracing::debug!(player = %player, token = token.get(), "discarding superseded load");
                            return;
                        }
                        *slot = Some(PendingLoad {
                            token,
                            audio: Arc::new(audio),
                        });
                    }
                    let _ = events.send(EngineEvent::Prepared { token, info });
                }
                Err(e) => {
                    tracing::warn!(player = %player, error = %e, "source decode failed");
                    let _ = events.send(EngineEvent::LoadFailed {
                        token,
                        code: codes::AUDIO_LOAD_ERROR,
                        message: "failed to decode audio source".to_string(),
                        detail: Some(e.to_string()),
                    });
                }
            });

        if let Err(e) = spawned {
            self.report_load_failure(token, &Error::Io(e));
        }
    }

    fn start(&mut self) -> Result<()> {
        self.collect_retired_taps();
        self.adopt_pending();
        let audio = self.audio.clone().ok_or(Error::NotPrepared)?;
        if self.stream.is_none() {
            self.stream = Some(self.open_stream(audio)?);
        }
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.collect_retired_taps();
    }

    fn stop(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.seek_to_zero();
    }

    fn seek_to_zero(&mut self) {
        self.send_command(StreamCommand::Rewind);
        self.shared.clock.store(0, Ordering::Release);
    }

    fn reset(&mut self) {
        self.shared.playing.store(false, Ordering::Release);
        self.stream = None;
        self.audio = None;
        self.token = None;
        self.requested.store(0, Ordering::Release);
        self.pending.lock().take();
        while self.commands_rx.try_recv().is_ok() {}
        self.collect_retired_taps();
        self.shared.clock.store(0, Ordering::Release);
    }

    fn release(&mut self) {
        self.reset();
        tracing::debug!(player = %self.player, "pcm engine released");
    }

    fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    fn render_clock(&self) -> u64 {
        self.shared.clock.load(Ordering::Acquire)
    }

    fn install_tap(&mut self, callback: BufferCallback) {
        self.send_command(StreamCommand::InstallTap(callback));
    }

    fn remove_tap(&mut self) {
        self.send_command(StreamCommand::RemoveTap);
    }
}

type BackendConstructor = Box<dyn Fn() -> Box<dyn AudioBackend> + Send + Sync>;

/// Creates a [`PcmEngine`] per player, each with its own backend.
pub struct PcmEngineFactory {
    options: PcmOptions,
    backend: BackendConstructor,
}

impl PcmEngineFactory {
    /// Engines playing through cpal.
    pub fn cpal(options: PcmOptions) -> Self {
        Self::with_backend(options, || Box::new(CpalBackend::new()))
    }

    /// Engines playing through backends built by `backend`.
    pub fn with_backend<F>(options: PcmOptions, backend: F) -> Self
    where
        F: Fn() -> Box<dyn AudioBackend> + Send + Sync + 'static,
    {
        Self {
            options,
            backend: Box::new(backend),
        }
    }
}

impl EngineFactory for PcmEngineFactory {
    fn create(&self, player: &str, events: Sender<EngineEvent>) -> Result<Box<dyn MediaEngine>> {
        Ok(Box::new(PcmEngine::new(
            player,
            (self.backend)(),
            self.options.clone(),
            events,
        )))
    }
}
