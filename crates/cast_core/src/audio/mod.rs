//! Format Catalog
//!
//! Closed enumerations for sample rate, sample encoding and channel role,
//! their capability masks, channel layouts and the combined `Format`.
//!
//! Every enumeration has a stable numeric code starting at 1. Mask bit `i`
//! belongs to code `i + 1`; that mapping is spelled out once, in `mask.rs`.

mod bits;
mod channel;
mod format;
mod layout;
mod mask;
mod rate;

pub use bits::Bits;
pub use channel::{Channel, CHANNEL_COUNT};
pub use format::Format;
pub use layout::{ChannelIndex, ChannelLayout, LAYOUTS};
pub use mask::{BitsMask, ChannelMask, RateMask};
pub use rate::Rate;

/// Many source channels summed into one destination channel
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelRoute {
    pub to: Channel,
    pub from: Vec<Channel>,
}

impl ChannelRoute {
    pub fn new(to: Channel, from: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            to,
            from: from.into_iter().collect(),
        }
    }
}
