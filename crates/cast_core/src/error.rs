//! Core Error Types

use thiserror::Error;

use crate::audio::{Bits, Format};

/// Errors from parsing or building catalog values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unknown {kind} name: {name}")]
    UnknownName { kind: &'static str, name: String },

    #[error("Unknown {kind} code: {code}")]
    UnknownCode { kind: &'static str, code: u32 },

    #[error("{kind} list too large: {len} entries, at most {max}")]
    TooLarge {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{kind} code {code} does not fit in the mask")]
    CodeOutOfRange { kind: &'static str, code: u8 },
}

/// Per-call faults of a `Samples` buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SamplesError {
    #[error("Capacity exceeded: need {needed} samples per channel, have {available}")]
    CapacityExceeded { needed: usize, available: usize },

    #[error("Source too short: need {needed} bytes, got {got}")]
    ShortSource { needed: usize, got: usize },

    #[error("Destination too short: need {needed} bytes, got {got}")]
    ShortDestination { needed: usize, got: usize },

    #[error("Invalid format: {0}")]
    InvalidFormat(Format),

    #[error("Samples are {0}, float view requires f64le")]
    NotFloat(Bits),

    #[error("Cannot convert samples to or from {0}")]
    UnsupportedConversion(Bits),
}

/// Failure of one element during one pipeline pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("Samples error: {0}")]
    Samples(#[from] SamplesError),

    #[error("DSP error: {0}")]
    Dsp(#[from] cast_dsp::DspError),

    #[error("Resample formats invalid: from {from} to {to}")]
    InvalidResample { from: Format, to: Format },

    #[error("No resample backend for {from} -> {to}")]
    NoBackend { from: Format, to: Format },

    #[error("Resample backend failed: {0}")]
    Backend(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Band frequency {0} Hz outside 20 - 20000 Hz")]
    InvalidBand(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors reported by a `SourceStreamer`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Seek not supported")]
    SeekUnsupported,

    #[error("Seek position {position_ms}ms beyond end ({length_ms}ms)")]
    SeekOutOfRange { position_ms: u64, length_ms: u64 },

    #[error("Source closed")]
    Closed,

    #[error("Source failed: {0}")]
    Other(String),
}

pub type FormatResult<T> = Result<T, FormatError>;
pub type SamplesResult<T> = Result<T, SamplesError>;
pub type ElementResult<T> = Result<T, ElementError>;
pub type SourceResult<T> = Result<T, SourceError>;
