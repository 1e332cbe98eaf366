//! Stable error codes carried by load failures and engine faults.

/// The source could not be opened or decoded.
pub const AUDIO_LOAD_ERROR: &str = "AUDIO_LOAD_ERROR";

/// An `asset://` source does not exist under the asset root.
pub const ASSET_NOT_FOUND: &str = "ASSET_NOT_FOUND";

/// The locator is neither an asset, a file, nor a well-formed URL.
pub const INVALID_URL: &str = "INVALID_URL";

/// The output stream could not be opened or started.
pub const ENGINE_START_ERROR: &str = "ENGINE_START_ERROR";

/// The output stream failed while running.
pub const STREAM_ERROR: &str = "STREAM_ERROR";
