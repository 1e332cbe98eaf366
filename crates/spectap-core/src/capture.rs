//! Capture processing: interleaved float buffers to waveform and spectrum bytes.
//!
//! A [`CaptureProcessor`] is sized once for a capture window and then runs
//! on every audio buffer without allocating. Its output, a
//! [`CaptureFrame`], is a pair of fixed-capacity byte arrays that can be
//! copied across threads as plain values.

use core::ops::Deref;

use crate::fixed_fft::MAX_FFT_SIZE;
use crate::quantize::SpectrumQuantizer;

/// Converts a normalized amplitude to an unsigned capture byte.
///
/// The value is scaled by 127 and rounded half away from zero. Negative
/// results wrap into `128..=255` (two's-complement style) and the result is
/// then clamped into `0..=255`, so `0.0` maps to `0`, `-1.0` to `129` and
/// anything below about `-2.0` clamps to `0`.
#[inline]
pub fn amplitude_to_byte(amplitude: f32) -> u8 {
    let mut n = libm::roundf(amplitude * 127.0);
    if n < 0.0 {
        n += 256.0;
    }
    n.clamp(0.0, 255.0) as u8
}

/// Fixed-capacity byte sequence holding one capture window.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CaptureBytes {
    len: usize,
    data: [u8; MAX_FFT_SIZE],
}

impl CaptureBytes {
    /// Returns `len` zero bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len > MAX_FFT_SIZE`.
    pub const fn zeroed(len: usize) -> Self {
        assert!(len <= MAX_FFT_SIZE, "capture window exceeds MAX_FFT_SIZE");
        Self {
            len,
            data: [0; MAX_FFT_SIZE],
        }
    }

    /// Copies `bytes` into a new sequence.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is longer than `MAX_FFT_SIZE`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut out = Self::zeroed(bytes.len());
        out.data[..bytes.len()].copy_from_slice(bytes);
        out
    }

    /// The bytes as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The bytes as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }
}

impl Deref for CaptureBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for CaptureBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl core::fmt::Debug for CaptureBytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureBytes")
            .field("len", &self.len)
            .field("head", &&self.as_slice()[..self.len.min(8)])
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CaptureBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.as_slice())
    }
}

/// Waveform and spectrum bytes derived from one audio buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CaptureFrame {
    /// Channel-averaged signed amplitude, one byte per frame.
    pub waveform: CaptureBytes,
    /// Quantized spectrum of the channel-averaged absolute amplitude.
    pub spectrum: CaptureBytes,
}

impl CaptureFrame {
    /// A frame of zero bytes, used to clear listeners' displays.
    pub const fn silent(capture_size: usize) -> Self {
        Self {
            waveform: CaptureBytes::zeroed(capture_size),
            spectrum: CaptureBytes::zeroed(capture_size),
        }
    }
}

/// Turns interleaved multi-channel buffers into [`CaptureFrame`]s.
///
/// # Example
///
/// ```rust
/// use spectap_core::CaptureProcessor;
///
/// let mut capture = CaptureProcessor::new(256);
/// let stereo = [0.25f32; 512];
/// let frame = capture.process(&stereo, 2);
/// assert_eq!(frame.waveform.len(), 256);
/// assert_eq!(frame.waveform[0], 32);
/// ```
pub struct CaptureProcessor {
    capture_size: usize,
    level: [u8; MAX_FFT_SIZE],
    quantizer: SpectrumQuantizer,
}

impl CaptureProcessor {
    /// Creates a processor for windows of `capture_size` frames.
    ///
    /// # Panics
    ///
    /// Panics unless `capture_size` is a power of two in `2..=MAX_FFT_SIZE`.
    pub fn new(capture_size: usize) -> Self {
        assert!(
            is_valid_capture_size(capture_size),
            "capture size must be a power of two in 2..={MAX_FFT_SIZE}, got {capture_size}"
        );
        Self {
            capture_size,
            level: [0; MAX_FFT_SIZE],
            quantizer: SpectrumQuantizer::new(),
        }
    }

    /// Window length in frames (and output bytes).
    pub fn capture_size(&self) -> usize {
        self.capture_size
    }

    /// Processes one interleaved buffer of `channels` channels.
    ///
    /// Reads at most `capture_size` frames; a shorter buffer leaves the tail
    /// of both outputs at zero, and `channels == 0` yields a silent frame.
    pub fn process(&mut self, samples: &[f32], channels: usize) -> CaptureFrame {
        let mut frame = CaptureFrame::silent(self.capture_size);
        if channels == 0 {
            return frame;
        }

        let frames = (samples.len() / channels).min(self.capture_size);
        let scale = 1.0 / channels as f32;
        let level = &mut self.level[..self.capture_size];
        level.fill(0);

        let waveform = frame.waveform.as_mut_slice();
        for (i, chunk) in samples.chunks_exact(channels).take(frames).enumerate() {
            let (sum, abs_sum) = chunk
                .iter()
                .fold((0.0f32, 0.0f32), |(s, a), &x| (s + x, a + libm::fabsf(x)));
            waveform[i] = amplitude_to_byte(sum * scale);
            level[i] = amplitude_to_byte(abs_sum * scale);
        }

        self.quantizer
            .quantize(level, frame.spectrum.as_mut_slice());
        frame
    }
}

impl core::fmt::Debug for CaptureProcessor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CaptureProcessor")
            .field("capture_size", &self.capture_size)
            .finish_non_exhaustive()
    }
}

/// Whether `size` is a capture window the FFT can take.
pub const fn is_valid_capture_size(size: usize) -> bool {
    size.is_power_of_two() && size >= 2 && size <= MAX_FFT_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_rule_wraps_negatives() {
        assert_eq!(amplitude_to_byte(0.0), 0);
        assert_eq!(amplitude_to_byte(-0.0), 0);
        assert_eq!(amplitude_to_byte(1.0), 127);
        assert_eq!(amplitude_to_byte(-1.0), 129);
        assert_eq!(amplitude_to_byte(0.5), 64);
        assert_eq!(amplitude_to_byte(-0.5), 192);
        assert_eq!(amplitude_to_byte(-0.001), 0);
        assert_eq!(amplitude_to_byte(3.0), 255);
        assert_eq!(amplitude_to_byte(-3.0), 0);
        assert_eq!(amplitude_to_byte(f32::NAN), 0);
    }

    #[test]
    fn capture_sizes() {
        assert!(is_valid_capture_size(2));
        assert!(is_valid_capture_size(1024));
        assert!(!is_valid_capture_size(1));
        assert!(!is_valid_capture_size(0));
        assert!(!is_valid_capture_size(768));
        assert!(!is_valid_capture_size(2048));
    }

    #[test]
    fn averages_channels() {
        let mut capture = CaptureProcessor::new(4);
        // Two frames of stereo: (0.5, -0.5) and (1.0, 0.0).
        let frame = capture.process(&[0.5, -0.5, 1.0, 0.0], 2);
        assert_eq!(frame.waveform.as_slice(), &[0, 64, 0, 0]);
    }

    #[test]
    fn short_buffer_is_zero_padded() {
        let mut capture = CaptureProcessor::new(8);
        let frame = capture.process(&[0.5; 3], 1);
        assert_eq!(frame.waveform.as_slice(), &[64, 64, 64, 0, 0, 0, 0, 0]);
        assert_eq!(frame.spectrum.len(), 8);
    }

    #[test]
    fn long_buffer_is_truncated() {
        let mut capture = CaptureProcessor::new(4);
        let samples: Vec<f32> = (0..16).map(|i| i as f32 / 127.0).collect();
        let frame = capture.process(&samples, 1);
        assert_eq!(frame.waveform.as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn no_channels_is_silent() {
        let mut capture = CaptureProcessor::new(16);
        assert_eq!(capture.process(&[1.0; 32], 0), CaptureFrame::silent(16));
    }

    #[test]
    fn zero_signal_is_deterministic() {
        let mut capture = CaptureProcessor::new(1024);
        let first = capture.process(&[0.0; 2048], 2);
        assert!(first.waveform.iter().all(|&b| b == 0));
        // Byte 0 is not the quantizer's silent midpoint, so only the
        // waveform is guaranteed to be zero.
        for _ in 0..3 {
            assert_eq!(capture.process(&[0.0; 2048], 2), first);
        }
    }

    #[test]
    fn capture_bytes_views() {
        let bytes = CaptureBytes::from_slice(&[1, 2, 3]);
        assert_eq!(bytes.len(), 3);
        assert_eq!(&bytes[..], &[1, 2, 3]);
        assert_eq!(CaptureBytes::zeroed(0).as_slice(), &[] as &[u8]);
    }

    #[test]
    #[should_panic]
    fn rejects_bad_capture_size() {
        let _ = CaptureProcessor::new(100);
    }
}
