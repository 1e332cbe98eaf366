//! spectap Session - playback sessions and their registry
//!
//! A [`SessionRegistry`] owns one [`PlaybackSession`] per player id. Each
//! session drives a [`spectap_io::MediaEngine`] through the
//! `Unknown → Ready → Playing ⇄ Paused → Stopped` lifecycle, installs a
//! capture tap while playing, and publishes [`PlayerEvent`]s: waveform and
//! spectrum frames from the audio thread, state changes from the control
//! context.
//!
//! Engines report asynchronously. Their events queue up per session and
//! are applied by [`SessionRegistry::pump`], which also runs loop re-arms
//! once their delay has passed. Every registry operation pumps its session
//! first.
//!
//! # Example
//!
//! ```rust
//! use spectap_io::{MediaInfo, ScriptedFactory};
//! use spectap_session::{PlaybackStatus, SessionConfig, SessionRegistry};
//!
//! let factory = ScriptedFactory::new();
//! let mut registry = SessionRegistry::new(factory.clone(), SessionConfig::default());
//! registry.initialize("a").unwrap();
//! registry.set_data_source("a", "asset://loop.wav").unwrap();
//!
//! let engine = factory.handle("a").unwrap();
//! engine.complete_load(MediaInfo { frames: 44100, sample_rate: 44100.0, channels: 2 });
//!
//! let state = registry.get_state("a").unwrap();
//! assert_eq!(state.status, PlaybackStatus::Ready);
//! assert_eq!(state.duration_ms, 1000);
//! ```

mod error;
mod events;
mod registry;
mod session;
mod state;
mod status;
mod tap;

pub use error::{PlaybackError, PlaybackErrorKind, PlayerError, Result};
pub use events::{EventSink, PlayerEvent, PlayerId};
pub use registry::{SessionConfig, SessionRegistry};
pub use session::PlaybackSession;
pub use state::PlayerState;
pub use status::PlaybackStatus;
