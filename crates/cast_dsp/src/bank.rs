//! Per-Channel Filter Bank
//!
//! A cascade of biquad sections, one independent copy per channel. A bank
//! is immutable in shape: changing the band list or the channel count means
//! building a new bank, which starts every section from silent history.

use crate::error::DspResult;
use crate::filter::{Filter, FilterParams};

pub struct FilterBank {
    bands: Vec<FilterParams>,
    channels: Vec<Vec<Filter>>,
    sample_rate: f64,
}

impl FilterBank {
    /// Design `bands` for `channels` channels at `sample_rate`
    ///
    /// Fails on the first band that cannot be designed.
    pub fn new(bands: &[FilterParams], channels: usize, sample_rate: f64) -> DspResult<Self> {
        let mut per_channel = Vec::with_capacity(channels);
        for _ in 0..channels {
            let chain = bands
                .iter()
                .map(|band| Filter::new(*band, sample_rate))
                .collect::<DspResult<Vec<_>>>()?;
            per_channel.push(chain);
        }

        Ok(Self {
            bands: bands.to_vec(),
            channels: per_channel,
            sample_rate,
        })
    }

    pub fn bands(&self) -> &[FilterParams] {
        &self.bands
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Run one sample of channel `channel` through every band
    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f64) -> f64 {
        match self.channels.get_mut(channel) {
            Some(chain) => chain.iter_mut().fold(input, |x, f| f.process(x)),
            None => input,
        }
    }

    /// Filter a planar channel in place; unknown channels pass through
    pub fn process_channel(&mut self, channel: usize, samples: &mut [f64]) {
        if let Some(chain) = self.channels.get_mut(channel) {
            for filter in chain.iter_mut() {
                filter.process_slice(samples);
            }
        }
    }

    pub fn reset(&mut self) {
        for filter in self.channels.iter_mut().flatten() {
            filter.reset();
        }
    }
}
