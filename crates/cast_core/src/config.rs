//! Pipeline Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::Format;

/// Configuration of one output line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Audio covered by one pass, in milliseconds (lower = less latency)
    pub buffer_duration_ms: u32,

    /// Output format; bits are forced to the internal width
    pub format: Format,

    /// Spectrum FFT window in samples (power of two)
    pub spectrum_window: usize,

    /// Pseudo-logarithmic spectrum bins instead of linear ones
    pub spectrum_log_axis: bool,

    /// Volume curve base; 1.0 is linear
    pub volume_base: f64,

    /// Volume at start-up (0.0 - 1.0)
    pub initial_volume: f64,

    /// Run every mixer source through its own resample element
    pub mixer_resample: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_duration_ms: 10,
            format: Format::default(),
            spectrum_window: 2048,
            spectrum_log_axis: true,
            volume_base: 1.0,
            initial_volume: 0.5,
            mixer_resample: false,
        }
    }
}

impl PipelineConfig {
    pub fn buffer_duration(&self) -> Duration {
        Duration::from_millis(self.buffer_duration_ms as u64)
    }

    /// Samples per channel in one pass
    pub fn samples_per_pass(&self) -> usize {
        self.format.rate.samples_for(self.buffer_duration())
    }

    /// Latency of one pass in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.samples_per_pass() as f32 / self.format.rate.hz() as f32) * 1000.0
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=1000).contains(&self.buffer_duration_ms) {
            return Err(format!("Invalid buffer duration: {}ms", self.buffer_duration_ms));
        }
        if !self.format.is_valid() {
            return Err(format!("Invalid format: {}", self.format));
        }
        if !self.spectrum_window.is_power_of_two() || !(64..=16384).contains(&self.spectrum_window) {
            return Err(format!("Invalid spectrum window: {}", self.spectrum_window));
        }
        if !self.volume_base.is_finite() || self.volume_base <= 0.0 {
            return Err(format!("Invalid volume base: {}", self.volume_base));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(format!("Invalid initial volume: {}", self.initial_volume));
        }
        Ok(())
    }

    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            buffer_duration_ms: 2, // 96 samples at 48kHz
            spectrum_window: 1024,
            ..Default::default()
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            buffer_duration_ms: 40,
            spectrum_window: 4096,
            mixer_resample: true,
            ..Default::default()
        }
    }
}
