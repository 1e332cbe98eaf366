//! Error types for sessions and the registry.

use serde::Serialize;

/// Caller errors returned synchronously by the registry.
///
/// These never change any session's state.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// `initialize` was called twice for the same id.
    #[error("player '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// The id has not been initialized, or was released.
    #[error("player '{0}' is not initialized")]
    NotInitialized(String),

    /// The media engine for a new player could not be created.
    #[error("failed to create media engine: {0}")]
    Engine(#[from] spectap_io::Error),
}

impl PlayerError {
    /// Stable machine-readable code for the bridge layer.
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::AlreadyInitialized(_) => "PLAYER_ALREADY_INITIALIZED",
            PlayerError::NotInitialized(_) => "PLAYER_NOT_INITIALIZED",
            PlayerError::Engine(e) => e.code(),
        }
    }
}

/// Convenience result type for registry operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Which side of the engine failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackErrorKind {
    /// The source could not be resolved, opened or decoded.
    SourceLoad,
    /// The engine failed after the source was loaded.
    EngineFault,
}

/// Error stored in a session and reported through its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct PlaybackError {
    /// Which side failed.
    pub kind: PlaybackErrorKind,
    /// Stable code, e.g. `AUDIO_LOAD_ERROR`.
    pub code: String,
    /// Human-readable summary.
    pub message: String,
    /// Underlying cause, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PlaybackError {
    /// A failed load.
    pub fn source_load(code: &str, message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind: PlaybackErrorKind::SourceLoad,
            code: code.to_string(),
            message: message.into(),
            detail,
        }
    }

    /// A runtime engine fault.
    pub fn engine_fault(code: &str, message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind: PlaybackErrorKind::EngineFault,
            code: code.to_string(),
            message: message.into(),
            detail,
        }
    }
}
