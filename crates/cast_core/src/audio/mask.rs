//! Capability masks
//!
//! Typed flag sets over the catalog enums. Bit `i` always stands for the
//! member with code `i + 1`; the assignments below are the only place that
//! mapping is written down.

use bitflags::bitflags;

use super::{Bits, Channel, Rate};
use crate::error::{FormatError, FormatResult};

bitflags! {
    /// Set of supported sample rates (bit = code - 1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RateMask: u16 {
        const R44100 = 1 << 0;
        const R48000 = 1 << 1;
        const R96000 = 1 << 2;
        const R192000 = 1 << 3;
        const R384000 = 1 << 4;
    }

    /// Set of supported sample encodings (bit = code - 1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BitsMask: u16 {
        const U8 = 1 << 0;
        const S16 = 1 << 1;
        const S24 = 1 << 2;
        const S32 = 1 << 3;
        const F32 = 1 << 4;
        const F64 = 1 << 5;
        const F16 = 1 << 6;
        const F24 = 1 << 7;
    }

    /// Set of channel roles (bit = code - 1)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u32 {
        const FRONT_LEFT = 1 << 0;
        const FRONT_RIGHT = 1 << 1;
        const FRONT_CENTER = 1 << 2;
        const FRONT_LEFT_OF_CENTER = 1 << 3;
        const FRONT_RIGHT_OF_CENTER = 1 << 4;
        const LOW_FREQUENCY = 1 << 5;
        const BACK_LEFT = 1 << 6;
        const BACK_RIGHT = 1 << 7;
        const BACK_CENTER = 1 << 8;
        const SIDE_LEFT = 1 << 9;
        const SIDE_RIGHT = 1 << 10;
        const TOP_CENTER = 1 << 11;
        const TOP_FRONT_LEFT = 1 << 12;
        const TOP_FRONT_CENTER = 1 << 13;
        const TOP_FRONT_RIGHT = 1 << 14;
        const TOP_BACK_LEFT = 1 << 15;
        const TOP_BACK_CENTER = 1 << 16;
        const TOP_BACK_RIGHT = 1 << 17;
    }
}

impl Rate {
    pub const fn mask(self) -> RateMask {
        match self {
            Rate::R44100 => RateMask::R44100,
            Rate::R48000 => RateMask::R48000,
            Rate::R96000 => RateMask::R96000,
            Rate::R192000 => RateMask::R192000,
            Rate::R384000 => RateMask::R384000,
        }
    }
}

impl Bits {
    pub const fn mask(self) -> BitsMask {
        match self {
            Bits::U8 => BitsMask::U8,
            Bits::S16 => BitsMask::S16,
            Bits::S24 => BitsMask::S24,
            Bits::S32 => BitsMask::S32,
            Bits::F32 => BitsMask::F32,
            Bits::F64 => BitsMask::F64,
            Bits::F16 => BitsMask::F16,
            Bits::F24 => BitsMask::F24,
        }
    }
}

macro_rules! code_mask {
    ($mask:ident, $raw:ty, $item:ident, $kind:literal) => {
        impl $mask {
            /// Most codes a list may carry
            pub const CAPACITY: usize = <$raw>::BITS as usize;

            /// Build from a list of member codes
            ///
            /// Fails with `TooLarge` when the list is longer than the mask is wide.
            pub fn from_codes(codes: &[u8]) -> FormatResult<Self> {
                if codes.len() > Self::CAPACITY {
                    return Err(FormatError::TooLarge {
                        kind: $kind,
                        len: codes.len(),
                        max: Self::CAPACITY,
                    });
                }
                let mut raw: $raw = 0;
                for &code in codes {
                    raw |= Self::code_bit(code).ok_or(FormatError::CodeOutOfRange {
                        kind: $kind,
                        code,
                    })?;
                }
                Ok(Self::from_bits_retain(raw))
            }

            fn code_bit(code: u8) -> Option<$raw> {
                if code == 0 || code as usize > Self::CAPACITY {
                    None
                } else {
                    Some((1 as $raw) << (code - 1))
                }
            }

            pub fn has_code(self, code: u8) -> bool {
                Self::code_bit(code).is_some_and(|bit| self.bits() & bit != 0)
            }

            /// True if every code in `codes` is set
            pub fn has_codes(self, codes: &[u8]) -> bool {
                codes.iter().all(|&c| self.has_code(c))
            }

            /// OR the codes in, skipping codes that do not fit; true if non-empty after
            pub fn combine_codes(&mut self, codes: &[u8]) -> bool {
                for bit in codes.iter().filter_map(|&c| Self::code_bit(c)) {
                    *self |= Self::from_bits_retain(bit);
                }
                !self.is_empty()
            }

            /// AND with the given codes
            pub fn intersect_codes(self, codes: &[u8]) -> Self {
                let mut other = Self::empty();
                other.combine_codes(codes);
                self & other
            }

            /// Non-empty with no bit above the highest assigned code
            pub fn is_valid(self) -> bool {
                !self.is_empty() && (self.bits() >> $item::MAX_CODE) == 0
            }

            pub fn has(self, item: $item) -> bool {
                self.contains(item.mask())
            }

            /// Members in code order
            pub fn members(self) -> impl Iterator<Item = $item> {
                $item::ALL.into_iter().filter(move |m| self.contains(m.mask()))
            }

            pub fn names(self) -> Vec<String> {
                self.members().map(|m| m.to_string()).collect()
            }
        }

        impl FromIterator<$item> for $mask {
            fn from_iter<I: IntoIterator<Item = $item>>(iter: I) -> Self {
                iter.into_iter()
                    .fold(Self::empty(), |mask, item| mask | item.mask())
            }
        }
    };
}

code_mask!(RateMask, u16, Rate, "rate");
code_mask!(BitsMask, u16, Bits, "bits");
code_mask!(ChannelMask, u32, Channel, "channel");

impl RateMask {
    /// Highest supported rate
    pub fn max(self) -> Option<Rate> {
        self.members().max()
    }
}

impl BitsMask {
    /// Widest supported encoding, float before integer at equal width
    pub fn max(self) -> Option<Bits> {
        self.members().max_by_key(|b| (b.width(), b.is_float()))
    }
}

impl ChannelMask {
    pub const fn count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_codes() {
        let mask = RateMask::from_codes(&[1, 2]).unwrap();
        assert_eq!(mask, RateMask::R44100 | RateMask::R48000);
        assert!(mask.has(Rate::R48000));
        assert!(!mask.has(Rate::R96000));
        assert!(mask.has_codes(&[1, 2]));
        assert!(!mask.has_codes(&[1, 3]));
    }

    #[test]
    fn test_too_large() {
        let codes = [1u8; 17];
        assert_eq!(
            RateMask::from_codes(&codes),
            Err(FormatError::TooLarge {
                kind: "rate",
                len: 17,
                max: 16
            })
        );
        assert!(matches!(
            BitsMask::from_codes(&codes),
            Err(FormatError::TooLarge { .. })
        ));
        assert!(ChannelMask::from_codes(&[1u8; 32]).is_ok());
        let err = ChannelMask::from_codes(&[1u8; 33]).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_code_out_of_range() {
        assert_eq!(
            BitsMask::from_codes(&[0]),
            Err(FormatError::CodeOutOfRange { kind: "bits", code: 0 })
        );
        assert!(RateMask::from_codes(&[17]).is_err());
    }

    #[test]
    fn test_validity() {
        assert!(!RateMask::empty().is_valid());
        assert!(RateMask::all().is_valid());
        // Code 6 fits the u16 but no rate owns it
        assert!(!RateMask::from_codes(&[6]).unwrap().is_valid());
        assert!(ChannelMask::from_codes(&[18]).unwrap().is_valid());
        assert!(!ChannelMask::from_codes(&[19]).unwrap().is_valid());
    }

    #[test]
    fn test_combine_and_intersect() {
        let mut mask = BitsMask::empty();
        assert!(!mask.combine_codes(&[]));
        assert!(mask.combine_codes(&[2, 6, 40]));
        assert_eq!(mask, BitsMask::S16 | BitsMask::F64);
        assert_eq!(mask.intersect_codes(&[6, 5]), BitsMask::F64);
    }

    #[test]
    fn test_members_and_max() {
        let mask: RateMask = [Rate::R96000, Rate::R44100].into_iter().collect();
        assert_eq!(mask.members().collect::<Vec<_>>(), vec![Rate::R44100, Rate::R96000]);
        assert_eq!(mask.max(), Some(Rate::R96000));
        assert_eq!(mask.names(), vec!["44100", "96000"]);

        let bits = BitsMask::S32 | BitsMask::F32 | BitsMask::S16;
        assert_eq!(bits.max(), Some(Bits::F32));
        assert_eq!(RateMask::empty().max(), None);
    }

    #[test]
    fn test_channel_count() {
        let mask = ChannelMask::FRONT_LEFT | ChannelMask::FRONT_RIGHT | ChannelMask::LOW_FREQUENCY;
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.names(), vec!["FL", "FR", "LFE"]);
    }
}
