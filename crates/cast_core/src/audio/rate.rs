//! Sample rates

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// Supported sample rates, totally ordered by frequency
///
/// Codes start at 1 and are stable: they index bits of [`RateMask`](super::RateMask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u8)]
pub enum Rate {
    R44100 = 1,
    R48000 = 2,
    R96000 = 3,
    R192000 = 4,
    R384000 = 5,
}

impl Rate {
    pub const ALL: [Rate; 5] = [
        Rate::R44100,
        Rate::R48000,
        Rate::R96000,
        Rate::R192000,
        Rate::R384000,
    ];

    /// Highest assigned code
    pub const MAX_CODE: u8 = 5;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> FormatResult<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or(FormatError::UnknownCode {
                kind: "rate",
                code: code as u32,
            })
    }

    pub const fn hz(self) -> u32 {
        match self {
            Rate::R44100 => 44_100,
            Rate::R48000 => 48_000,
            Rate::R96000 => 96_000,
            Rate::R192000 => 192_000,
            Rate::R384000 => 384_000,
        }
    }

    pub fn from_hz(hz: u32) -> FormatResult<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.hz() == hz)
            .ok_or(FormatError::UnknownCode { kind: "rate", code: hz })
    }

    /// Samples per channel covering `duration`
    pub fn samples_for(self, duration: Duration) -> usize {
        (self.hz() as u128 * duration.as_micros() / 1_000_000) as usize
    }

    /// Wall time covered by `samples` samples per channel
    pub fn duration_of(self, samples: usize) -> Duration {
        Duration::from_micros(samples as u64 * 1_000_000 / self.hz() as u64)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hz())
    }
}

impl FromStr for Rate {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix("Hz")
            .or_else(|| trimmed.strip_suffix("hz"))
            .unwrap_or(trimmed)
            .trim();
        digits
            .parse::<u32>()
            .ok()
            .and_then(|hz| Rate::from_hz(hz).ok())
            .ok_or_else(|| FormatError::UnknownName {
                kind: "rate",
                name: s.to_string(),
            })
    }
}

impl TryFrom<u32> for Rate {
    type Error = FormatError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Rate::from_hz(hz)
    }
}

impl From<Rate> for u32 {
    fn from(rate: Rate) -> Self {
        rate.hz()
    }
}
