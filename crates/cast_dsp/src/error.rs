//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while designing filters or running transforms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("Frequency {frequency}Hz is outside (0, {nyquist}Hz)")]
    InvalidFrequency { frequency: f64, nyquist: f64 },

    #[error("Filter slope must be positive and finite, got {0}")]
    InvalidSlope(f64),

    #[error("FFT window length must be a power of two >= 2, got {0}")]
    WindowNotPowerOfTwo(usize),

    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    #[error("Unsupported PCM sample width: {0} bytes")]
    UnsupportedWidth(usize),
}

/// Result alias for DSP operations
pub type DspResult<T> = Result<T, DspError>;
