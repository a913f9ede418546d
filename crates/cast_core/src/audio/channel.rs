//! Physical channel roles

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::mask::ChannelMask;
use crate::error::{FormatError, FormatResult};

/// Physical speaker role
///
/// The role table is append-only. Codes (and therefore mask bit
/// positions, `bit = code - 1`) are part of the device protocol and may
/// never be renumbered; new roles go after `TopBackRight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Channel {
    FrontLeft = 1,
    FrontRight = 2,
    FrontCenter = 3,
    FrontLeftOfCenter = 4,
    FrontRightOfCenter = 5,
    LowFrequency = 6,
    BackLeft = 7,
    BackRight = 8,
    BackCenter = 9,
    SideLeft = 10,
    SideRight = 11,
    TopCenter = 12,
    TopFrontLeft = 13,
    TopFrontCenter = 14,
    TopFrontRight = 15,
    TopBackLeft = 16,
    TopBackCenter = 17,
    TopBackRight = 18,
}

/// Number of assigned roles
pub const CHANNEL_COUNT: usize = 18;

impl Channel {
    /// Every role in code order
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::FrontLeft,
        Channel::FrontRight,
        Channel::FrontCenter,
        Channel::FrontLeftOfCenter,
        Channel::FrontRightOfCenter,
        Channel::LowFrequency,
        Channel::BackLeft,
        Channel::BackRight,
        Channel::BackCenter,
        Channel::SideLeft,
        Channel::SideRight,
        Channel::TopCenter,
        Channel::TopFrontLeft,
        Channel::TopFrontCenter,
        Channel::TopFrontRight,
        Channel::TopBackLeft,
        Channel::TopBackCenter,
        Channel::TopBackRight,
    ];

    pub const MAX_CODE: u8 = CHANNEL_COUNT as u8;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> FormatResult<Self> {
        if code == 0 || code > Self::MAX_CODE {
            return Err(FormatError::UnknownCode {
                kind: "channel",
                code: code as u32,
            });
        }
        Ok(Self::ALL[code as usize - 1])
    }

    /// Mask bit position of this role
    pub const fn bit_index(self) -> u32 {
        self as u32 - 1
    }

    /// Role stored at mask bit `index`
    pub fn from_bit_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Single-role mask
    pub const fn mask(self) -> ChannelMask {
        match self {
            Channel::FrontLeft => ChannelMask::FRONT_LEFT,
            Channel::FrontRight => ChannelMask::FRONT_RIGHT,
            Channel::FrontCenter => ChannelMask::FRONT_CENTER,
            Channel::FrontLeftOfCenter => ChannelMask::FRONT_LEFT_OF_CENTER,
            Channel::FrontRightOfCenter => ChannelMask::FRONT_RIGHT_OF_CENTER,
            Channel::LowFrequency => ChannelMask::LOW_FREQUENCY,
            Channel::BackLeft => ChannelMask::BACK_LEFT,
            Channel::BackRight => ChannelMask::BACK_RIGHT,
            Channel::BackCenter => ChannelMask::BACK_CENTER,
            Channel::SideLeft => ChannelMask::SIDE_LEFT,
            Channel::SideRight => ChannelMask::SIDE_RIGHT,
            Channel::TopCenter => ChannelMask::TOP_CENTER,
            Channel::TopFrontLeft => ChannelMask::TOP_FRONT_LEFT,
            Channel::TopFrontCenter => ChannelMask::TOP_FRONT_CENTER,
            Channel::TopFrontRight => ChannelMask::TOP_FRONT_RIGHT,
            Channel::TopBackLeft => ChannelMask::TOP_BACK_LEFT,
            Channel::TopBackCenter => ChannelMask::TOP_BACK_CENTER,
            Channel::TopBackRight => ChannelMask::TOP_BACK_RIGHT,
        }
    }

    /// Short code as used in layout names and configuration
    pub const fn short_name(self) -> &'static str {
        match self {
            Channel::FrontLeft => "FL",
            Channel::FrontRight => "FR",
            Channel::FrontCenter => "FC",
            Channel::FrontLeftOfCenter => "FLC",
            Channel::FrontRightOfCenter => "FRC",
            Channel::LowFrequency => "LFE",
            Channel::BackLeft => "BL",
            Channel::BackRight => "BR",
            Channel::BackCenter => "BC",
            Channel::SideLeft => "SL",
            Channel::SideRight => "SR",
            Channel::TopCenter => "TC",
            Channel::TopFrontLeft => "TFL",
            Channel::TopFrontCenter => "TFC",
            Channel::TopFrontRight => "TFR",
            Channel::TopBackLeft => "TBL",
            Channel::TopBackCenter => "TBC",
            Channel::TopBackRight => "TBR",
        }
    }

    /// Human-readable role
    pub const fn name(self) -> &'static str {
        match self {
            Channel::FrontLeft => "Front Left",
            Channel::FrontRight => "Front Right",
            Channel::FrontCenter => "Front Center",
            Channel::FrontLeftOfCenter => "Front Left Of Center",
            Channel::FrontRightOfCenter => "Front Right Of Center",
            Channel::LowFrequency => "Subwoofer",
            Channel::BackLeft => "Rear Left",
            Channel::BackRight => "Rear Right",
            Channel::BackCenter => "Rear Center",
            Channel::SideLeft => "Side Left",
            Channel::SideRight => "Side Right",
            Channel::TopCenter => "Top Center",
            Channel::TopFrontLeft => "Top Front Left",
            Channel::TopFrontCenter => "Top Front Center",
            Channel::TopFrontRight => "Top Front Right",
            Channel::TopBackLeft => "Top Rear Left",
            Channel::TopBackCenter => "Top Rear Center",
            Channel::TopBackRight => "Top Rear Right",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Channel {
    type Err = FormatError;

    /// Accepts the short code or the long name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ch| {
                ch.short_name().eq_ignore_ascii_case(wanted) || ch.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| FormatError::UnknownName {
                kind: "channel",
                name: s.to_string(),
            })
    }
}

impl TryFrom<String> for Channel {
    type Error = FormatError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

impl From<Channel> for String {
    fn from(ch: Channel) -> Self {
        ch.short_name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_display_roundtrip() {
        for ch in Channel::ALL {
            assert_eq!(ch.to_string().parse::<Channel>(), Ok(ch));
            assert_eq!(ch.name().parse::<Channel>(), Ok(ch));
            assert_eq!(Channel::from_code(ch.code()), Ok(ch));
        }
        assert_eq!("subwoofer".parse::<Channel>(), Ok(Channel::LowFrequency));
        assert_eq!("tbr".parse::<Channel>(), Ok(Channel::TopBackRight));
        assert!("XL".parse::<Channel>().is_err());
    }

    #[test]
    fn test_bit_index_table() {
        // Fixed assignments, never renumbered
        assert_eq!(Channel::FrontLeft.bit_index(), 0);
        assert_eq!(Channel::LowFrequency.bit_index(), 5);
        assert_eq!(Channel::TopBackRight.bit_index(), 17);

        for ch in Channel::ALL {
            assert_eq!(Channel::from_bit_index(ch.bit_index()), Some(ch));
            assert_eq!(ch.mask().bits(), 1 << ch.bit_index());
        }
        assert_eq!(Channel::from_bit_index(18), None);
    }

    #[test]
    fn test_code_bounds() {
        assert!(Channel::from_code(0).is_err());
        assert!(Channel::from_code(19).is_err());
    }
}
