//! The spectap settings file.

use serde::{Deserialize, Serialize};
use spectap_io::{AssetResolver, PcmOptions};
use spectap_session::SessionConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Runtime settings, stored as TOML.
///
/// Every field has a default, so an empty file is valid.
///
/// # TOML Format
///
/// ```toml
/// capture_size = 1024
/// loop_rearm_delay_ms = 250
/// default_sample_rate = 44100.0
/// event_capacity = 64
/// asset_root = "/usr/share/spectap/assets"
/// output_device = "USB"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Capture window in frames; a power of two in `2..=1024`.
    pub capture_size: usize,

    /// Silence between loop iterations, in milliseconds.
    pub loop_rearm_delay_ms: u64,

    /// Sample rate assumed before a source is loaded.
    pub default_sample_rate: f64,

    /// Capacity of the outward event channel.
    pub event_capacity: usize,

    /// Directory `asset://` locators resolve against (current directory if unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_root: Option<PathBuf>,

    /// Substring of the output device name (system default if unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            capture_size: session.capture_size,
            loop_rearm_delay_ms: session.loop_rearm_delay.as_millis() as u64,
            default_sample_rate: session.default_sample_rate,
            event_capacity: session.event_capacity,
            asset_root: None,
            output_device: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file and validate them.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parse settings from a TOML string and validate them.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save the settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !spectap_core::is_valid_capture_size(self.capture_size) {
            return Err(ConfigError::invalid(
                "capture_size",
                format!(
                    "must be a power of two in 2..={}, got {}",
                    spectap_core::MAX_FFT_SIZE,
                    self.capture_size
                ),
            ));
        }
        if !(self.default_sample_rate.is_finite() && self.default_sample_rate > 0.0) {
            return Err(ConfigError::invalid(
                "default_sample_rate",
                format!("must be positive, got {}", self.default_sample_rate),
            ));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::invalid("event_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Session tunables derived from these settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capture_size: self.capture_size,
            loop_rearm_delay: Duration::from_millis(self.loop_rearm_delay_ms),
            default_sample_rate: self.default_sample_rate,
            event_capacity: self.event_capacity,
        }
    }

    /// Resolver for `asset://` locators.
    pub fn asset_resolver(&self) -> AssetResolver {
        match &self.asset_root {
            Some(root) => AssetResolver::new(root),
            None => AssetResolver::default(),
        }
    }

    /// Options for the PCM engine built from these settings.
    pub fn pcm_options(&self) -> PcmOptions {
        PcmOptions {
            device_name: self.output_device.clone(),
            assets: self.asset_resolver(),
            ..PcmOptions::default()
        }
    }
}
