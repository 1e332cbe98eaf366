//! Settings for spectap.
//!
//! One TOML file holds the tunables of the capture pipeline and the
//! playback sessions, plus where to find assets and which output device to
//! use. Every field has a default.
//!
//! # Example
//!
//! ```rust,no_run
//! use spectap_config::{Settings, default_config_path, load_or_default};
//!
//! let settings = load_or_default(None).unwrap();
//! let session = settings.session_config();
//! assert!(spectap_core::is_valid_capture_size(session.capture_size));
//!
//! Settings::default().save(default_config_path()).unwrap();
//! ```

mod error;
mod settings;

/// Platform-specific configuration paths.
pub mod paths;

pub use error::ConfigError;
pub use paths::{default_config_path, load_or_default, user_config_dir};
pub use settings::Settings;
