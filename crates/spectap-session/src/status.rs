//! Playback status.

use serde::Serialize;
use std::fmt;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing loaded; initial state and the state after `reset`.
    #[default]
    Unknown,
    /// Source loaded, not started.
    Ready,
    /// Rendering, including the short gap while a loop re-arms.
    Playing,
    /// Paused with the position retained.
    Paused,
    /// Stopped explicitly or at the end of a non-looping source.
    Stopped,
    /// A load or engine error; left only by `setDataSource` or `reset`.
    Error,
}

impl PlaybackStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Unknown => "unknown",
            PlaybackStatus::Ready => "ready",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
            PlaybackStatus::Error => "error",
        }
    }

    /// Whether `play` applies from this status.
    pub fn can_play(self) -> bool {
        matches!(
            self,
            PlaybackStatus::Ready | PlaybackStatus::Paused | PlaybackStatus::Stopped
        )
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
