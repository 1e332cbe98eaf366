//! Media engine layer for spectap.
//!
//! This crate provides:
//!
//! - **Engine interface**: the [`MediaEngine`] trait and its [`EngineEvent`]s,
//!   which the playback session drives and listens to
//! - **Source resolution**: [`SourceLocator`] parsing and [`AssetResolver`]
//! - **WAV decoding**: [`read_wav`] and [`write_wav`] via hound
//! - **Audio output**: the pluggable [`AudioBackend`] with a cpal implementation
//! - **Engines**: [`PcmEngine`] for real playback, [`ScriptedEngine`] for
//!   deterministic tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crossbeam_channel::bounded;
//! use spectap_io::{EngineFactory, LoadToken, PcmEngineFactory, SourceLocator};
//!
//! let (tx, rx) = bounded(64);
//! let mut engine = PcmEngineFactory::cpal(Default::default()).create("main", tx)?;
//! engine.load(&SourceLocator::parse("file:///tmp/song.wav")?, LoadToken::first());
//! // wait for EngineEvent::Prepared on `rx`, then:
//! engine.start()?;
//! ```

pub mod backend;
pub mod codes;
pub mod cpal_backend;
mod devices;
mod engine;
mod locator;
pub mod pcm_engine;
pub mod scripted;
mod wav;

pub use backend::{AudioBackend, BackendStreamConfig, StreamHandle};
pub use cpal_backend::CpalBackend;
pub use devices::{AudioDevice, default_output_device, list_devices};
pub use engine::{
    AudioBlock, BufferCallback, EngineEvent, EngineFactory, LoadToken, MediaEngine, MediaInfo,
};
pub use locator::{AssetResolver, SourceLocator};
pub use pcm_engine::{PcmEngine, PcmEngineFactory, PcmOptions};
pub use scripted::{EngineCall, ScriptedEngine, ScriptedFactory, ScriptedHandle};
pub use wav::{DecodedAudio, WavSpec, read_wav, write_wav};

use std::path::PathBuf;

/// Error types for media engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A source locator could not be parsed.
    #[error("Invalid source locator: {0}")]
    InvalidLocator(String),

    /// An `asset://` locator named a file missing from the asset root.
    #[error("Asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    /// The engine cannot play this kind of source.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// `start` was called before a load completed.
    #[error("No source has been prepared")]
    NotPrepared,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code reported alongside this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidLocator(_) => codes::INVALID_URL,
            Error::AssetNotFound(_) => codes::ASSET_NOT_FOUND,
            Error::Stream(_) | Error::NoDevice | Error::DeviceNotFound(_) | Error::NotPrepared => {
                codes::ENGINE_START_ERROR
            }
            Error::Wav(_) | Error::UnsupportedSource(_) | Error::Io(_) => codes::AUDIO_LOAD_ERROR,
        }
    }
}

/// Convenience result type for media engine operations.
pub type Result<T> = std::result::Result<T, Error>;
