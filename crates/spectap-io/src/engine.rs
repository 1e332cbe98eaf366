//! The media engine interface driven by playback sessions.
//!
//! A [`MediaEngine`] decodes and renders one source. Control calls come
//! from the session's control context; everything the engine learns
//! asynchronously (load finished, playback ended, stream died) comes back
//! as an [`EngineEvent`] over the channel handed to
//! [`EngineFactory::create`].

use crate::{Result, SourceLocator};
use crossbeam_channel::Sender;

/// Identifies one `load` request.
///
/// Sessions bump the token on every new load or reset, so late completions
/// of a superseded load can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    /// The token of the first load.
    pub const fn first() -> Self {
        Self(1)
    }

    /// The token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Raw token value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// What a successful load learned about the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Length in frames (samples per channel).
    pub frames: u64,
    /// Source sample rate in Hz.
    pub sample_rate: f64,
    /// Channel count.
    pub channels: u16,
}

impl MediaInfo {
    /// Duration in whole milliseconds, truncated.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate > 0.0 {
            (self.frames as f64 / self.sample_rate * 1000.0) as u64
        } else {
            0
        }
    }
}

/// Asynchronous notifications from an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The load tagged `token` finished and the source is ready to start.
    Prepared {
        /// Token of the completed load.
        token: LoadToken,
        /// Source description.
        info: MediaInfo,
    },
    /// The load tagged `token` failed.
    LoadFailed {
        /// Token of the failed load.
        token: LoadToken,
        /// Stable code from [`crate::codes`].
        code: &'static str,
        /// Human-readable summary.
        message: String,
        /// Underlying cause, if any.
        detail: Option<String>,
    },
    /// Rendering reached the end of the source.
    Completed,
    /// The engine failed while running.
    Fault {
        /// Stable code from [`crate::codes`].
        code: &'static str,
        /// Human-readable cause.
        detail: String,
    },
}

/// One buffer handed to a capture tap.
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    /// Interleaved samples, `frames * channels` long.
    pub samples: &'a [f32],
    /// Channel count.
    pub channels: usize,
}

impl AudioBlock<'_> {
    /// Frame count of this block.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Capture tap callback, run on the audio thread for every rendered buffer.
pub type BufferCallback = Box<dyn FnMut(&AudioBlock<'_>) + Send>;

/// A black-box decoder and renderer for one player.
pub trait MediaEngine: Send {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Starts loading `source`; completion arrives as
    /// [`EngineEvent::Prepared`] or [`EngineEvent::LoadFailed`] tagged `token`.
    fn load(&mut self, source: &SourceLocator, token: LoadToken);

    /// Starts or resumes rendering.
    fn start(&mut self) -> Result<()>;

    /// Pauses rendering, keeping the position.
    fn pause(&mut self);

    /// Stops rendering and rewinds to the start.
    fn stop(&mut self);

    /// Rewinds to the start without changing the running state.
    fn seek_to_zero(&mut self);

    /// Drops the loaded source and returns to the freshly created state.
    fn reset(&mut self);

    /// Releases all resources; the engine is not used afterwards.
    fn release(&mut self);

    /// Whether the engine is currently rendering.
    fn is_playing(&self) -> bool;

    /// Source frames rendered since the last rewind.
    fn render_clock(&self) -> u64;

    /// Installs the capture tap, replacing any previous one.
    fn install_tap(&mut self, callback: BufferCallback);

    /// Removes the capture tap if one is installed.
    fn remove_tap(&mut self);
}

/// Creates one engine per player.
pub trait EngineFactory: Send {
    /// Builds the engine for `player`, reporting asynchronously on `events`.
    fn create(&self, player: &str, events: Sender<EngineEvent>) -> Result<Box<dyn MediaEngine>>;
}
