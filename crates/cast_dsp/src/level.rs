//! Level Meter
//!
//! RMS loudness estimates clamped to `[0, 1]`. A NaN anywhere in the input
//! yields 0 rather than propagating into a mix chain or a visualization.

use crate::error::{DspError, DspResult};

/// Clamp a level into `[0, 1]`, mapping NaN to 0
#[inline]
pub fn clamp_level(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// RMS of every sample
pub fn rms(samples: &[f64]) -> f64 {
    rms_decimated(samples, 1)
}

/// RMS over every `step`-th sample
pub fn rms_decimated(samples: &[f64], step: usize) -> f64 {
    let mut meter = LevelMeter::new();
    for &s in samples.iter().step_by(step.max(1)) {
        meter.push(s);
    }
    meter.level()
}

/// RMS over little-endian signed integer PCM of `width` bytes per sample
///
/// `step` skips samples the same way [`rms_decimated`] does.
pub fn rms_pcm(data: &[u8], width: usize, step: usize) -> DspResult<f64> {
    let scale = match width {
        1 => 128.0,
        2 => 32768.0,
        3 => 8_388_608.0,
        4 => 2_147_483_648.0,
        _ => return Err(DspError::UnsupportedWidth(width)),
    };

    let mut meter = LevelMeter::new();
    for chunk in data.chunks_exact(width).step_by(step.max(1)) {
        meter.push(decode_le(chunk) as f64 / scale);
    }
    Ok(meter.level())
}

/// Sign-extended little-endian integer of 1..=4 bytes
fn decode_le(bytes: &[u8]) -> i32 {
    if bytes.len() == 1 {
        // 8-bit PCM is unsigned around 0x80
        return bytes[0] as i32 - 128;
    }
    let mut raw = [0u8; 4];
    raw[4 - bytes.len()..].copy_from_slice(bytes);
    // Bytes sit in the high end so the shift sign-extends
    i32::from_le_bytes(raw) >> (8 * (4 - bytes.len()))
}

/// Running sum of squares
///
/// A NaN resets the accumulator instead of poisoning it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelMeter {
    sum: f64,
    count: usize,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, sample: f64) {
        self.sum += sample * sample;
        self.count += 1;
        if self.sum.is_nan() {
            self.sum = 0.0;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// RMS over the pushed samples
    pub fn level(&self) -> f64 {
        self.level_over(self.count)
    }

    /// RMS with an explicit divisor, for windows that normalize by a fixed length
    pub fn level_over(&self, divisor: usize) -> f64 {
        if divisor == 0 {
            return 0.0;
        }
        clamp_level((self.sum / divisor as f64).sqrt())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-12);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_clamped() {
        assert_eq!(rms(&[4.0; 16]), 1.0);
    }

    #[test]
    fn test_nan_is_zeroed() {
        assert_eq!(clamp_level(f64::NAN), 0.0);
        let level = rms(&[f64::NAN, f64::NAN]);
        assert!(!level.is_nan());
        assert_eq!(level, 0.0);
    }

    #[test]
    fn test_decimation_visits_every_step() {
        let data = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        assert_eq!(rms_decimated(&data, 2), 1.0);
        assert_eq!(rms_decimated(&data, 0), rms(&data));
    }

    #[test]
    fn test_pcm_widths() {
        // s16 half scale: 0x4000
        let s16: Vec<u8> = std::iter::repeat([0x00, 0x40]).take(8).flatten().collect();
        assert!((rms_pcm(&s16, 2, 1).unwrap() - 0.5).abs() < 1e-9);

        // s16 negative half scale: 0xC000
        let neg: Vec<u8> = std::iter::repeat([0x00, 0xC0]).take(8).flatten().collect();
        assert!((rms_pcm(&neg, 2, 1).unwrap() - 0.5).abs() < 1e-9);

        // s24 quarter scale: 0x200000
        let s24: Vec<u8> = std::iter::repeat([0x00, 0x00, 0x20]).take(4).flatten().collect();
        assert!((rms_pcm(&s24, 3, 1).unwrap() - 0.25).abs() < 1e-9);

        // u8 silence sits at 0x80
        assert_eq!(rms_pcm(&[0x80; 10], 1, 1).unwrap(), 0.0);

        assert_eq!(rms_pcm(&[0; 10], 5, 1), Err(DspError::UnsupportedWidth(5)));
    }
}
