//! Sample encodings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// Sample encoding and width
///
/// All integer encodings are little-endian and signed except `U8`.
/// Codes start at 1 and are stable: they index bits of [`BitsMask`](super::BitsMask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Bits {
    U8 = 1,
    S16 = 2,
    S24 = 3,
    S32 = 4,
    F32 = 5,
    F64 = 6,
    F16 = 7,
    F24 = 8,
}

impl Bits {
    pub const ALL: [Bits; 8] = [
        Bits::U8,
        Bits::S16,
        Bits::S24,
        Bits::S32,
        Bits::F32,
        Bits::F64,
        Bits::F16,
        Bits::F24,
    ];

    pub const MAX_CODE: u8 = 8;

    /// Encoding every element processes in
    pub const INTERNAL: Bits = Bits::F64;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> FormatResult<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.code() == code)
            .ok_or(FormatError::UnknownCode {
                kind: "bits",
                code: code as u32,
            })
    }

    /// Integer encoding of the given bit width
    pub fn from_width(bits: u32) -> FormatResult<Self> {
        match bits {
            8 => Ok(Bits::U8),
            16 => Ok(Bits::S16),
            24 => Ok(Bits::S24),
            32 => Ok(Bits::S32),
            _ => Err(FormatError::UnknownCode { kind: "bits", code: bits }),
        }
    }

    pub const fn width(self) -> u32 {
        match self {
            Bits::U8 => 8,
            Bits::S16 | Bits::F16 => 16,
            Bits::S24 | Bits::F24 => 24,
            Bits::S32 | Bits::F32 => 32,
            Bits::F64 => 64,
        }
    }

    /// Bytes per sample
    pub const fn size(self) -> usize {
        (self.width() / 8) as usize
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Bits::F16 | Bits::F24 | Bits::F32 | Bits::F64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Bits::U8 => "u8",
            Bits::S16 => "s16le",
            Bits::S24 => "s24le",
            Bits::S32 => "s32le",
            Bits::F32 => "f32le",
            Bits::F64 => "f64le",
            Bits::F16 => "f16le",
            Bits::F24 => "f24le",
        }
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bits {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = match s.trim().to_ascii_lowercase().as_str() {
            "u8" | "8" => Bits::U8,
            "s16le" | "s16" | "16" => Bits::S16,
            "s24le" | "s24" | "24" => Bits::S24,
            "s32le" | "s32" | "32" => Bits::S32,
            "f16le" | "f16" | "16f" => Bits::F16,
            "f24le" | "f24" | "24f" => Bits::F24,
            "f32le" | "f32" | "32f" => Bits::F32,
            "f64le" | "f64" | "64f" => Bits::F64,
            _ => {
                return Err(FormatError::UnknownName {
                    kind: "bits",
                    name: s.to_string(),
                })
            }
        };
        Ok(bits)
    }
}

impl TryFrom<String> for Bits {
    type Error = FormatError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Bits> for String {
    fn from(bits: Bits) -> Self {
        bits.name().to_string()
    }
}
