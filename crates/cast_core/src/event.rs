//! Mixer Notifications
//!
//! Events flow from the mixer to whoever subscribed: encoders that must
//! follow the output format, and control surfaces listing sources.

use serde::{Deserialize, Serialize};

use crate::audio::{ChannelIndex, Format};
use crate::source::SourceId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MixerEvent {
    /// Renegotiation changed the output format
    FormatChanged {
        format: Format,
        channel_index: ChannelIndex,
    },

    SourceAdded { id: SourceId },

    /// A source left the mix
    /// `detached` is true when it ended on its own rather than being removed
    SourceRemoved { id: SourceId, detached: bool },
}

impl MixerEvent {
    pub fn format_changed(format: Format) -> Self {
        Self::FormatChanged {
            format,
            channel_index: format.channel_index(),
        }
    }
}
