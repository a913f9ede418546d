//! Stream formats

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Bits, ChannelIndex, ChannelLayout, Rate};

/// Rate, encoding and channel layout of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Format {
    pub rate: Rate,
    pub bits: Bits,
    pub layout: ChannelLayout,
}

impl Format {
    pub const fn new(rate: Rate, bits: Bits, layout: ChannelLayout) -> Self {
        Self { rate, bits, layout }
    }

    /// Format at the pipeline's internal float width
    pub const fn internal(rate: Rate, layout: ChannelLayout) -> Self {
        Self::new(rate, Bits::INTERNAL, layout)
    }

    pub const fn with_internal_bits(self) -> Self {
        Self::new(self.rate, Bits::INTERNAL, self.layout)
    }

    pub fn is_internal(&self) -> bool {
        self.bits == Bits::INTERNAL
    }

    /// Rate and bits are valid by construction; the layout must be non-empty
    /// and its cached count must match its mask
    pub fn is_valid(&self) -> bool {
        self.layout.is_valid()
    }

    /// Bytes per frame (one sample on every channel)
    pub fn size(&self) -> usize {
        self.layout.count() * self.bits.size()
    }

    /// Bytes for `samples` samples per channel
    pub fn samples_size(&self, samples: usize) -> usize {
        samples * self.size()
    }

    pub fn channel_index(&self) -> ChannelIndex {
        ChannelIndex::new(self.layout)
    }

    /// Order by channel count, then bit depth, then rate
    pub fn richness_cmp(&self, other: &Format) -> Ordering {
        self.layout
            .count()
            .cmp(&other.layout.count())
            .then_with(|| {
                (self.bits.width(), self.bits.is_float())
                    .cmp(&(other.bits.width(), other.bits.is_float()))
            })
            .then_with(|| self.rate.cmp(&other.rate))
    }

    /// The richer of two formats; `self` on ties
    pub fn richer(self, other: Format) -> Format {
        if other.richness_cmp(&self) == Ordering::Greater {
            other
        } else {
            self
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Self::internal(Rate::R48000, ChannelLayout::STEREO)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.rate, self.layout.count(), self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Channel;

    #[test]
    fn test_size_is_count_times_width() {
        for rate in Rate::ALL {
            for bits in Bits::ALL {
                for (_, layout) in crate::audio::LAYOUTS {
                    let f = Format::new(rate, bits, layout);
                    assert!(f.is_valid());
                    assert_eq!(f.size(), layout.count() * bits.size());
                }
            }
        }
    }

    #[test]
    fn test_invalid_without_channels() {
        let f = Format::new(Rate::R48000, Bits::S16, ChannelLayout::EMPTY);
        assert!(!f.is_valid());
        assert_eq!(f.size(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Format::default().to_string(), "48000/2/f64le");
        let f = Format::new(Rate::R44100, Bits::S16, ChannelLayout::L5_1);
        assert_eq!(f.to_string(), "44100/6/s16le");
        assert_eq!(f.samples_size(10), 120);
    }

    #[test]
    fn test_richness_priority() {
        let stereo_hi = Format::new(Rate::R192000, Bits::F64, ChannelLayout::STEREO);
        let surround_lo = Format::new(Rate::R44100, Bits::U8, ChannelLayout::L5_1);
        // Channel count wins over everything else
        assert_eq!(surround_lo.richness_cmp(&stereo_hi), Ordering::Greater);

        let a = Format::new(Rate::R192000, Bits::S16, ChannelLayout::STEREO);
        let b = Format::new(Rate::R44100, Bits::S24, ChannelLayout::STEREO);
        // Then bit depth
        assert_eq!(b.richness_cmp(&a), Ordering::Greater);

        let c = Format::new(Rate::R96000, Bits::S24, ChannelLayout::STEREO);
        // Then rate
        assert_eq!(c.richer(b), c);
        assert_eq!(b.richer(c), c);
    }

    #[test]
    fn test_internal_bits() {
        let f = Format::new(Rate::R48000, Bits::S24, ChannelLayout::MONO).with_internal_bits();
        assert!(f.is_internal());
        assert_eq!(f.channel_index().slot(Channel::FrontCenter), Some(0));
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let json = serde_json::to_value(Format::default()).unwrap();
        assert_eq!(json["rate"], 48000);
        assert_eq!(json["bits"], "f64le");
        assert_eq!(json["layout"], 3);
    }
}
