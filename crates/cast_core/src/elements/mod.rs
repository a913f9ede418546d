//! Built-in stream elements

pub mod equalizer;
pub mod player;
pub mod resample;
pub mod router;
pub mod spectrum;
pub mod volume;

pub use equalizer::{Equalizer, EqualizerState, EQUALIZER_DELAY_MAX};
pub use player::Player;
pub use resample::{BackendFactory, BitDepthConverter, Resample, ResampleBackend};
pub use router::ChannelRouter;
pub use spectrum::{Spectrum, SpectrumSnapshot};
pub use volume::{SampleVolume, Volume};
