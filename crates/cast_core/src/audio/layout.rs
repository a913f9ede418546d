//! Channel layouts
//!
//! A layout is a channel mask plus its cached population count. Layouts
//! compare by exact mask equality, and the canonical named layouts live in
//! one const registry built by extending smaller layouts, so there is no
//! start-up ordering between them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::channel::{Channel, CHANNEL_COUNT};
use super::mask::ChannelMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ChannelLayout {
    mask: ChannelMask,
    count: usize,
}

impl ChannelLayout {
    pub const EMPTY: ChannelLayout = ChannelLayout::from_mask(ChannelMask::empty());

    pub const MONO: ChannelLayout = Self::EMPTY.with(Channel::FrontCenter);
    pub const STEREO: ChannelLayout = Self::EMPTY
        .with(Channel::FrontLeft)
        .with(Channel::FrontRight);
    pub const L2_1: ChannelLayout = Self::STEREO.with(Channel::LowFrequency);
    pub const L3_0: ChannelLayout = Self::STEREO.with(Channel::FrontCenter);
    pub const L3_1: ChannelLayout = Self::L3_0.with(Channel::LowFrequency);
    pub const L4_0: ChannelLayout = Self::L3_0.with(Channel::BackCenter);
    pub const L4_1: ChannelLayout = Self::L4_0.with(Channel::LowFrequency);
    pub const L5_0: ChannelLayout = Self::L3_0
        .with(Channel::SideLeft)
        .with(Channel::SideRight);
    pub const L5_1: ChannelLayout = Self::L5_0.with(Channel::LowFrequency);
    pub const L6_1: ChannelLayout = Self::L5_1.with(Channel::BackCenter);
    pub const L7_0: ChannelLayout = Self::L5_0
        .with(Channel::BackLeft)
        .with(Channel::BackRight);
    pub const L7_1: ChannelLayout = Self::L7_0.with(Channel::LowFrequency);
    pub const L5_1_2: ChannelLayout = Self::L5_1
        .with(Channel::TopFrontLeft)
        .with(Channel::TopFrontRight);
    pub const L5_1_4: ChannelLayout = Self::L5_1_2
        .with(Channel::TopBackLeft)
        .with(Channel::TopBackRight);
    pub const L7_1_2: ChannelLayout = Self::L7_1
        .with(Channel::TopFrontLeft)
        .with(Channel::TopFrontRight);
    pub const L7_1_4: ChannelLayout = Self::L7_1_2
        .with(Channel::TopBackLeft)
        .with(Channel::TopBackRight);

    pub const fn from_mask(mask: ChannelMask) -> Self {
        Self {
            mask,
            count: mask.count(),
        }
    }

    /// Layout holding exactly `channels`, in any order
    pub fn new(channels: &[Channel]) -> Self {
        Self::from_mask(channels.iter().copied().collect())
    }

    /// This layout plus one role
    pub const fn with(self, channel: Channel) -> Self {
        Self::from_mask(self.mask.union(channel.mask()))
    }

    pub const fn mask(&self) -> ChannelMask {
        self.mask
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.mask.contains(channel.mask())
    }

    /// Roles in code order, which is also slot order in a planar buffer
    pub fn channels(&self) -> impl Iterator<Item = Channel> {
        self.mask.members()
    }

    pub fn is_valid(&self) -> bool {
        self.count > 0 && self.count == self.mask.count() && self.mask.is_valid()
    }

    /// Canonical name, matched by exact mask equality only
    pub fn name(&self) -> Option<&'static str> {
        LAYOUTS
            .iter()
            .find(|(_, layout)| layout.mask == self.mask)
            .map(|(name, _)| *name)
    }

    pub fn by_name(name: &str) -> Option<Self> {
        LAYOUTS
            .iter()
            .find(|(n, _)| *n == name.trim())
            .map(|(_, layout)| *layout)
    }

    /// Canonical layout for a bare channel count (1 = mono, 2 = stereo, ...)
    pub fn default_for_count(count: usize) -> Option<Self> {
        let layout = match count {
            1 => Self::MONO,
            2 => Self::STEREO,
            3 => Self::L2_1,
            4 => Self::L4_0,
            5 => Self::L5_0,
            6 => Self::L5_1,
            7 => Self::L6_1,
            8 => Self::L7_1,
            _ => return None,
        };
        Some(layout)
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::STEREO
    }
}

/// Canonical named layouts
pub const LAYOUTS: [(&str, ChannelLayout); 16] = [
    ("1.0", ChannelLayout::MONO),
    ("2.0", ChannelLayout::STEREO),
    ("2.1", ChannelLayout::L2_1),
    ("3.0", ChannelLayout::L3_0),
    ("3.1", ChannelLayout::L3_1),
    ("4.0", ChannelLayout::L4_0),
    ("4.1", ChannelLayout::L4_1),
    ("5.0", ChannelLayout::L5_0),
    ("5.1", ChannelLayout::L5_1),
    ("6.1", ChannelLayout::L6_1),
    ("7.0", ChannelLayout::L7_0),
    ("7.1", ChannelLayout::L7_1),
    ("5.1.2", ChannelLayout::L5_1_2),
    ("5.1.4", ChannelLayout::L5_1_4),
    ("7.1.2", ChannelLayout::L7_1_2),
    ("7.1.4", ChannelLayout::L7_1_4),
];

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => {
                let names: Vec<_> = self.channels().map(|c| c.short_name()).collect();
                write!(f, "{}ch({})", self.count, names.join("+"))
            }
        }
    }
}

impl From<u32> for ChannelLayout {
    fn from(bits: u32) -> Self {
        Self::from_mask(ChannelMask::from_bits_retain(bits))
    }
}

impl From<ChannelLayout> for u32 {
    fn from(layout: ChannelLayout) -> Self {
        layout.mask.bits()
    }
}

/// Channel role to planar slot table for one layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelIndex {
    slots: [Option<u8>; CHANNEL_COUNT],
    channels: Vec<Channel>,
}

impl ChannelIndex {
    pub fn new(layout: ChannelLayout) -> Self {
        let mut slots = [None; CHANNEL_COUNT];
        let channels: Vec<Channel> = layout.channels().collect();
        for (slot, ch) in channels.iter().enumerate() {
            slots[ch.bit_index() as usize] = Some(slot as u8);
        }
        Self { slots, channels }
    }

    /// Planar slot carrying `channel`, if the layout has it
    #[inline]
    pub fn slot(&self, channel: Channel) -> Option<usize> {
        self.slots[channel.bit_index() as usize].map(usize::from)
    }

    /// Role carried by planar slot `slot`
    pub fn channel(&self, slot: usize) -> Option<Channel> {
        self.channels.get(slot).copied()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelIndex {
    fn default() -> Self {
        Self::new(ChannelLayout::EMPTY)
    }
}
