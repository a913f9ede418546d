//! Upstream Source Contract
//!
//! Decoders, network receivers and renderers feed the mixer through
//! [`SourceStreamer`]. Anything blocking lives behind this trait; `stream`
//! only copies what is already available.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::audio::Format;
use crate::error::SourceResult;
use crate::samples::Samples;

pub trait SourceStreamer: Send {
    /// Fill as much of `samples` as is available and return the samples per
    /// channel written. The buffer arrives silenced with its format set to
    /// [`SourceStreamer::out_format`].
    fn stream(&mut self, samples: &mut Samples) -> usize;

    fn close(&mut self) -> SourceResult<()>;

    fn seek(&mut self, position: Duration) -> SourceResult<()>;

    /// Format of the underlying media
    fn audio_format(&self) -> Format;

    /// Format `stream` writes in
    fn out_format(&self) -> Format;

    fn is_playing(&self) -> bool;

    /// Whether a zero-length pass means end of stream
    fn can_remove(&self) -> bool {
        !self.is_playing()
    }

    fn name(&self) -> &str {
        "source"
    }
}

/// A source shared between the mixer and its owner
pub type SharedSource = Arc<Mutex<dyn SourceStreamer>>;

pub fn shared<S: SourceStreamer + 'static>(source: S) -> SharedSource {
    Arc::new(Mutex::new(source))
}

/// Handle the mixer hands out for an added source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}
