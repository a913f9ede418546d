//! Cast DSP - Digital Signal Processing Module
//!
//! Numeric building blocks for the Cast sample pipeline:
//! - Biquad filter design from the RBJ cookbook, with per-channel state
//! - Filter banks cascading several bands per channel
//! - Radix-2 FFT with linear or pseudo-logarithmic magnitude axes
//! - RMS level metering that never lets NaN escape
//!
//! # Architecture
//!
//! This crate knows nothing about sample formats or buffers. It works on
//! `f64` slices and plain parameters; `cast_core` maps its planar buffers
//! onto these primitives.

mod bank;
mod error;
mod fft;
mod filter;
pub mod level;
mod presets;
mod window;

pub use bank::FilterBank;
pub use error::{DspError, DspResult};
pub use fft::{frequency_to_bin, log_bucket_count, Axis, Fft, LOG_AXIS_EXPONENT};
pub use filter::{
    is_band_frequency_valid, Coefficients, Filter, FilterParams, FilterType, Slope,
    DEFAULT_BANDWIDTH, MAX_BAND_FREQUENCY, MIN_BAND_FREQUENCY,
};
pub use level::LevelMeter;
pub use presets::{preset, Preset, OCTAVE_BANDS, PRESETS};
pub use window::{hann, HannWindow};
