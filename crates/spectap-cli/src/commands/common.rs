//! Helpers shared by commands.

use std::path::Path;

/// Turns a command-line source into a locator.
///
/// Anything with a scheme passes through; an existing local path becomes a
/// `file://` locator with an absolute path.
pub fn source_locator(source: &str) -> String {
    if source.contains("://") {
        return source.to_string();
    }
    let path = Path::new(source);
    match std::fs::canonicalize(path) {
        Ok(abs) => format!("file://{}", abs.display()),
        Err(_) => source.to_string(),
    }
}

/// Peak level of a waveform frame in `0.0..=1.0`.
///
/// Waveform bytes hold `round(v * 127)` in two's complement.
pub fn peak_level(waveform: &[u8]) -> f32 {
    let peak = waveform
        .iter()
        .map(|&b| (b as i8).unsigned_abs())
        .max()
        .unwrap_or(0);
    (f32::from(peak) / 127.0).min(1.0)
}

/// A fixed-width bar for `level` in `0.0..=1.0`.
pub fn meter(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}
