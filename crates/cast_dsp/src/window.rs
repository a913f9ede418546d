//! Analysis windows

use std::f64::consts::PI;

/// Hann window coefficient for index `n` of a `size`-point window
pub fn hann(n: usize, size: usize) -> f64 {
    if size <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - (2.0 * PI * n as f64 / (size - 1) as f64).cos())
}

/// Pre-computed Hann window lookup table
#[derive(Debug, Clone)]
pub struct HannWindow {
    coeffs: Vec<f64>,
}

impl HannWindow {
    pub fn new(size: usize) -> Self {
        Self {
            coeffs: (0..size).map(|i| hann(i, size)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Weight `sample` by the coefficient at `index`; indices past the end weigh 0
    #[inline]
    pub fn apply(&self, sample: f64, index: usize) -> f64 {
        self.coeffs.get(index).map_or(0.0, |c| sample * c)
    }
}
