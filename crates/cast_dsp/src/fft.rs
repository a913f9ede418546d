//! Radix-2 FFT
//!
//! Iterative bit-reversal permutation followed by in-place Cooley-Tukey
//! butterflies over a power-of-two window. The permutation table and the
//! twiddle factors are computed once per window length so that a spectrum
//! pass never allocates.
//!
//! # Axis modes
//!
//! `Axis::Linear` yields one magnitude per bin up to Nyquist. `Axis::Log`
//! groups bins `k..=floor(k^1.01)` and keeps the peak of each group, which
//! packs the high end together roughly the way hearing does.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};

/// Growth exponent of the pseudo-logarithmic bucketing
pub const LOG_AXIS_EXPONENT: f64 = 1.01;

/// Frequency axis of a magnitude spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Linear,
    #[default]
    Log,
}

/// Forward transform over a fixed window length
pub struct Fft {
    size: usize,
    reversed: Vec<usize>,
    twiddles: Vec<Complex<f64>>,
    work: Vec<Complex<f64>>,
    magnitudes: Vec<f64>,
}

impl Fft {
    pub fn new(size: usize) -> DspResult<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(DspError::WindowNotPowerOfTwo(size));
        }
        let bits = size.trailing_zeros();
        let reversed = (0..size)
            .map(|i| i.reverse_bits() >> (usize::BITS - bits))
            .collect();
        let twiddles = (0..size / 2)
            .map(|k| Complex::from_polar(1.0, -2.0 * PI * k as f64 / size as f64))
            .collect();

        Ok(Self {
            size,
            reversed,
            twiddles,
            work: vec![Complex::new(0.0, 0.0); size],
            magnitudes: Vec::with_capacity(size / 2),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Complex spectrum of a real input window
    pub fn transform(&mut self, input: &[f64]) -> DspResult<&[Complex<f64>]> {
        if input.len() != self.size {
            return Err(DspError::BufferSizeMismatch {
                expected: self.size,
                got: input.len(),
            });
        }

        for (slot, &from) in self.work.iter_mut().zip(&self.reversed) {
            *slot = Complex::new(input[from], 0.0);
        }

        let n = self.size;
        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for j in 0..half {
                    let w = self.twiddles[j * stride];
                    let a = self.work[start + j];
                    let b = self.work[start + j + half] * w;
                    self.work[start + j] = a + b;
                    self.work[start + j + half] = a - b;
                }
            }
            len <<= 1;
        }

        Ok(&self.work)
    }

    /// Magnitude spectrum up to Nyquist, bucketed along `axis`
    pub fn spectrum(&mut self, input: &[f64], axis: Axis) -> DspResult<&[f64]> {
        self.transform(input)?;

        let half = self.size / 2;
        self.magnitudes.clear();
        match axis {
            Axis::Linear => {
                self.magnitudes
                    .extend(self.work[..half].iter().map(|c| c.norm()));
            }
            Axis::Log => {
                let mut k = 0;
                while k < half {
                    let j = log_bucket_end(k);
                    if j >= half {
                        break;
                    }
                    let peak = self.work[k..=j]
                        .iter()
                        .map(|c| c.norm())
                        .fold(0.0, f64::max);
                    self.magnitudes.push(peak);
                    k = j + 1;
                }
            }
        }
        Ok(&self.magnitudes)
    }
}

/// Last bin index grouped with bin `k` on the log axis
#[inline]
fn log_bucket_end(k: usize) -> usize {
    ((k as f64).powf(LOG_AXIS_EXPONENT) as usize).max(k)
}

/// Number of magnitudes `Axis::Log` produces for a window length
pub fn log_bucket_count(size: usize) -> usize {
    let half = size / 2;
    let mut k = 0;
    let mut count = 0;
    while k < half {
        let j = log_bucket_end(k);
        if j >= half {
            break;
        }
        count += 1;
        k = j + 1;
    }
    count
}

/// Bin index whose center frequency is closest to `frequency`
pub fn frequency_to_bin(frequency: f64, sample_rate: f64, size: usize) -> usize {
    (frequency * size as f64 / sample_rate).round() as usize
}
