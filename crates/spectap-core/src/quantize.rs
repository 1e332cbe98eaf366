//! Spectrum quantizer: 8-bit capture samples in, 8-bit spectrum bytes out.
//!
//! The byte layout follows the long-standing visualizer capture format:
//! output bytes `2k` and `2k + 1` are the real and imaginary parts of
//! bin `k`, except for bin 0 where byte 0 is the DC term and byte 1 the
//! Nyquist term.

use crate::fixed_fft::{self, MAX_FFT_SIZE};

/// Shift applied to the high (real) half before range fitting.
const REAL_SHIFT: u32 = 21;

/// Shift applied to the sign-extended low (imaginary) half before range fitting.
const IMAG_SHIFT: u32 = 5;

/// Arithmetic-shifts `v` right until it fits in `i8`.
#[inline]
pub fn shift_into_i8(mut v: i32) -> i8 {
    while v > i32::from(i8::MAX) || v < i32::from(i8::MIN) {
        v >>= 1;
    }
    v as i8
}

/// Packs two unsigned capture bytes into one transform lane.
///
/// Each byte is re-centred by flipping its top bit, then placed in the top
/// byte of its 16-bit half.
#[inline]
pub fn pack_capture_pair(even: u8, odd: u8) -> i32 {
    ((u32::from(even ^ 0x80) << 24) | (u32::from(odd ^ 0x80) << 8)) as i32
}

/// Runs the fixed-point real FFT over capture bytes.
///
/// Owns its transform workspace, so a quantizer can live inside a real-time
/// callback and be reused for every buffer without allocating.
pub struct SpectrumQuantizer {
    workspace: [i32; MAX_FFT_SIZE / 2],
}

impl SpectrumQuantizer {
    /// Creates a quantizer with a zeroed workspace.
    pub const fn new() -> Self {
        Self {
            workspace: [0; MAX_FFT_SIZE / 2],
        }
    }

    /// Writes the spectrum of `samples` into `spectrum`.
    ///
    /// Both slices must have the same power-of-two length in
    /// `2..=MAX_FFT_SIZE`; that length is the capture size. When every
    /// packed lane is zero the transform is skipped and `spectrum` is
    /// filled with zeros.
    ///
    /// # Panics
    ///
    /// Panics on a length mismatch or an unsupported capture size.
    pub fn quantize(&mut self, samples: &[u8], spectrum: &mut [u8]) {
        let capture_size = samples.len();
        assert_eq!(
            capture_size,
            spectrum.len(),
            "spectrum length must match the capture size"
        );
        assert!(
            capture_size.is_power_of_two() && (2..=MAX_FFT_SIZE).contains(&capture_size),
            "capture size must be a power of two in 2..={MAX_FFT_SIZE}, got {capture_size}"
        );

        let lanes = &mut self.workspace[..capture_size / 2];
        let mut nonzero = 0i32;
        for (lane, pair) in lanes.iter_mut().zip(samples.chunks_exact(2)) {
            *lane = pack_capture_pair(pair[0], pair[1]);
            nonzero |= *lane;
        }

        if nonzero != 0 {
            fixed_fft::transform_real_in_place(lanes);
        }

        for (&lane, out) in lanes.iter().zip(spectrum.chunks_exact_mut(2)) {
            out[0] = shift_into_i8(lane >> REAL_SHIFT) as u8;
            out[1] = shift_into_i8(i32::from(lane as i16) >> IMAG_SHIFT) as u8;
        }
    }
}

impl Default for SpectrumQuantizer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SpectrumQuantizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpectrumQuantizer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_bytes_pack_to_zero() {
        assert_eq!(pack_capture_pair(0x80, 0x80), 0);
        assert_eq!(pack_capture_pair(0xff, 0x00), (0x7f << 24) | (0x80 << 8));
    }

    #[test]
    fn shift_into_i8_halves_until_in_range() {
        assert_eq!(shift_into_i8(0), 0);
        assert_eq!(shift_into_i8(127), 127);
        assert_eq!(shift_into_i8(-128), -128);
        assert_eq!(shift_into_i8(128), 64);
        assert_eq!(shift_into_i8(1000), 125);
        assert_eq!(shift_into_i8(-129), -65);
        assert_eq!(shift_into_i8(i32::MIN), -128);
    }

    #[test]
    fn silence_skips_the_transform() {
        let mut q = SpectrumQuantizer::new();
        let samples = [0x80u8; 1024];
        let mut spectrum = [0xaau8; 1024];
        q.quantize(&samples, &mut spectrum);
        assert!(spectrum.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_bytes_are_not_silence() {
        // Byte 0 re-centres to -128, a full-scale negative DC level.
        let mut q = SpectrumQuantizer::new();
        let samples = [0u8; 256];
        let mut spectrum = [0u8; 256];
        q.quantize(&samples, &mut spectrum);
        assert_ne!(spectrum[0], 0);
        assert!(spectrum[2..].iter().all(|&b| b == 0 || b == 0xff));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let n = 512;
        let k = 32;
        let mut samples = [0u8; 512];
        for (t, s) in samples.iter_mut().enumerate() {
            let phase = 2.0 * core::f32::consts::PI * (k * t) as f32 / n as f32;
            *s = (libm::roundf(100.0 * libm::sinf(phase)) as i32 + 128) as u8;
        }
        let mut spectrum = [0u8; 512];
        SpectrumQuantizer::new().quantize(&samples, &mut spectrum);

        let energy = |bin: usize| {
            let re = i32::from(spectrum[2 * bin] as i8);
            let im = i32::from(spectrum[2 * bin + 1] as i8);
            re * re + im * im
        };
        let peak = (1..n / 2).max_by_key(|&b| energy(b)).unwrap_or(0);
        assert!(peak == k || peak == n / 2 - k, "peak at bin {peak}");
    }

    #[test]
    #[should_panic]
    fn rejects_mismatched_lengths() {
        SpectrumQuantizer::new().quantize(&[0u8; 64], &mut [0u8; 32]);
    }

    #[test]
    #[should_panic]
    fn rejects_unsupported_capture_size() {
        SpectrumQuantizer::new().quantize(&[0u8; 2048], &mut [0u8; 2048]);
    }
}
