//! spectap Core - fixed-point spectrum capture
//!
//! This crate holds the numeric half of spectap: everything that runs
//! inside the audio callback. All of it is allocation-free and works on
//! caller-owned, pre-sized buffers.
//!
//! # Modules
//!
//! - [`fixed_fft`] - packed 16.16 complex radix-2 FFT with a real-input path
//! - [`quantize`] - 8-bit capture samples to 8-bit spectrum bytes
//! - [`capture`] - float buffers to waveform and spectrum [`CaptureFrame`]s
//!
//! # Example
//!
//! ```rust
//! use spectap_core::{CaptureProcessor, MAX_FFT_SIZE};
//!
//! let mut capture = CaptureProcessor::new(MAX_FFT_SIZE);
//! let buffer = vec![0.0f32; 2 * MAX_FFT_SIZE];
//! let frame = capture.process(&buffer, 2);
//! assert_eq!(frame.spectrum.len(), MAX_FFT_SIZE);
//! ```
//!
//! # no_std Support
//!
//! Disable the default `std` feature for embedded targets:
//!
//! ```toml
//! [dependencies]
//! spectap-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod capture;
pub mod fixed_fft;
pub mod quantize;

pub use capture::{
    CaptureBytes, CaptureFrame, CaptureProcessor, amplitude_to_byte, is_valid_capture_size,
};
pub use fixed_fft::{
    LOG_FFT_SIZE, MAX_FFT_SIZE, bit_reverse_permute, transform_in_place, transform_real_in_place,
};
pub use quantize::SpectrumQuantizer;
