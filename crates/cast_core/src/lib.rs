//! Cast Core - Sample Pipeline
//!
//! This crate provides the real-time core of the Cast audio server:
//! - Format catalog: rates, sample widths, channel roles, masks and layouts
//! - `Samples`, a planar buffer with float and raw byte views over one region
//! - The `Element` contract and the `Pipeline` that runs elements in order
//! - A `Mixer` combining independently clocked sources into one stream
//! - Stream elements: volume, equalizer, spectrum, resample, channel router, clip player
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Control Plane                           │
//! │  add/remove sources, volume, EQ edits, format overrides     │
//! └─────────────────────────────────────────────────────────────┘
//!            │ short locks / atomics        ▲ crossbeam-channel
//!            ▼                              │ MixerEvent
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Pipeline Worker (timer)                   │
//! │  Sources ──▶ Mixer ──▶ Equalizer ──▶ Spectrum ──▶ Volume ─▶ │
//! │    ▲                                                        │
//! │    └── rtrb ring ◀── network receivers                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ processed Samples
//!                              ▼
//!                      external encoder / pusher
//! ```
//!
//! The core does no I/O of its own: sources come in through
//! [`SourceStreamer`] and the output buffer is handed on untouched.

pub mod audio;
mod config;
pub mod convert;
mod element;
pub mod elements;
mod error;
mod event;
mod mixer;
mod pipeline;
mod ring;
mod samples;
mod source;

use std::sync::Arc;

pub use audio::{
    Bits, BitsMask, Channel, ChannelIndex, ChannelLayout, ChannelMask, ChannelRoute, Format, Rate,
    RateMask, LAYOUTS,
};
pub use config::PipelineConfig;
pub use element::{Element, ElementKind, Switch};
pub use elements::{
    BackendFactory, BitDepthConverter, ChannelRouter, Equalizer, EqualizerState, Player, Resample,
    ResampleBackend, SampleVolume, Spectrum, SpectrumSnapshot, Volume, EQUALIZER_DELAY_MAX,
};
pub use error::{
    ElementError, ElementResult, FormatError, FormatResult, SamplesError, SamplesResult,
    SourceError, SourceResult,
};
pub use event::MixerEvent;
pub use mixer::Mixer;
pub use pipeline::{PassReport, Pipeline, StageStats};
pub use ring::{ring, RingSource, RingWriter};
pub use samples::Samples;
pub use source::{shared, SharedSource, SourceId, SourceStreamer};

// Re-export DSP types for convenience
pub use cast_dsp::{Axis, FilterParams, FilterType, Slope};

/// Build the standard output line: mixer, equalizer, spectrum, volume
///
/// Returns the pipeline plus handles to each element for the control plane.
pub fn standard_pipeline(config: &PipelineConfig) -> Result<StandardLine, ElementError> {
    config.validate().map_err(ElementError::InvalidConfig)?;

    let mixer = Arc::new(Mixer::with_format(config.format));
    mixer.set_resample(config.mixer_resample);
    let equalizer = Arc::new(Equalizer::new());
    let axis = if config.spectrum_log_axis { Axis::Log } else { Axis::Linear };
    let spectrum = Arc::new(Spectrum::new(config.spectrum_window, axis)?);
    let volume = Arc::new(Volume::with_base(config.initial_volume, config.volume_base));

    let pipeline = Pipeline::new();
    pipeline.append(mixer.clone());
    pipeline.append(equalizer.clone());
    pipeline.append(spectrum.clone());
    pipeline.append(volume.clone());
    pipeline.set_buffer(Samples::new(config.samples_per_pass(), config.format.with_internal_bits()));

    Ok(StandardLine {
        pipeline,
        mixer,
        equalizer,
        spectrum,
        volume,
    })
}

/// One output line and its element handles
pub struct StandardLine {
    pub pipeline: Pipeline,
    pub mixer: Arc<Mixer>,
    pub equalizer: Arc<Equalizer>,
    pub spectrum: Arc<Spectrum>,
    pub volume: Arc<Volume>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = PipelineConfig::default();
        let _samples = Samples::new(16, Format::default());
    }

    #[test]
    fn test_standard_pipeline_pass() {
        let line = standard_pipeline(&PipelineConfig::default()).unwrap();
        assert_eq!(line.pipeline.names(), vec!["Mixer", "Equalizer", "Spectrum", "Volume"]);

        let ramp = source::testing::RampSource::new(Format::default(), 1000);
        line.mixer.add(shared(ramp));
        let report = line.pipeline.stream_owned().unwrap();
        assert!(report.is_ok());
        assert_eq!(report.delivered, 480);
        // Volume 0.5 on a linear curve
        let first = line.pipeline.with_buffer(|b| b.plane(0).unwrap()[2]).unwrap();
        assert_eq!(first, 1.0);
    }

    #[test]
    fn test_standard_pipeline_rejects_bad_config() {
        let config = PipelineConfig {
            spectrum_window: 3,
            ..Default::default()
        };
        assert!(standard_pipeline(&config).is_err());
    }
}
