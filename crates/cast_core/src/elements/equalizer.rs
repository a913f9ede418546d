//! Equalizer Element
//!
//! A cascade of biquad bands applied to every channel, each channel with its
//! own filter history.
//!
//! # Reconfiguration
//!
//! ```text
//! control plane                         pipeline worker
//! set()/set_bands() ──▶ config (gen+1)
//!        │
//!        └─ build FilterBank ──▶ pending ──take on next pass──▶ active bank
//! ```
//!
//! Edits never touch the bank a pass is running on. The replacement is built
//! beside it and swapped in at the start of the next pass, so no pass is
//! skipped while the control plane is busy. Any swap or rebuild starts every
//! band from silent history.
//!
//! The configured delay is a distance-compensation value that is stored and
//! reported here; padding the stream with it happens downstream.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use cast_dsp::{is_band_frequency_valid, FilterBank, FilterParams, FilterType, Preset};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::Rate;
use crate::element::{Element, Switch};
use crate::error::{ElementError, ElementResult};
use crate::samples::Samples;

/// Upper bound of the distance-compensation delay
pub const EQUALIZER_DELAY_MAX: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EqualizerState {
    /// No bands configured; samples pass through
    Idle,
    /// Running the configured bands
    Active,
    /// A replacement bank is waiting for the next pass
    Reconfiguring,
}

type Shape = (usize, Rate);

struct Config {
    filter_type: FilterType,
    bands: Vec<FilterParams>,
    generation: u64,
    // Channels and rate of the last pass
    shape: Option<Shape>,
}

struct Built {
    bank: FilterBank,
    generation: u64,
    shape: Shape,
}

fn build(bands: &[FilterParams], shape: Shape, generation: u64) -> ElementResult<Built> {
    let bank = FilterBank::new(bands, shape.0, shape.1.hz() as f64)?;
    Ok(Built {
        bank,
        generation,
        shape,
    })
}

pub struct Equalizer {
    enabled: AtomicBool,
    delay_us: AtomicU64,
    config: Mutex<Config>,
    pending: Mutex<Option<Built>>,
    active: Mutex<Option<Built>>,
}

impl Equalizer {
    /// Equalizer without bands, using peaking sections for `set`
    pub fn new() -> Self {
        Self::with_filter_type(FilterType::Peaking)
    }

    pub fn with_filter_type(filter_type: FilterType) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            delay_us: AtomicU64::new(0),
            config: Mutex::new(Config {
                filter_type,
                bands: Vec::new(),
                generation: 0,
                shape: None,
            }),
            pending: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> EqualizerState {
        if self.pending.lock().is_some() {
            return EqualizerState::Reconfiguring;
        }
        if self.config.lock().bands.is_empty() {
            EqualizerState::Idle
        } else {
            EqualizerState::Active
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.config.lock().filter_type
    }

    /// Set the type of every band, rebuilding the bank
    pub fn set_filter_type(&self, filter_type: FilterType) -> ElementResult<()> {
        self.edit(|config| {
            config.filter_type = filter_type;
            for band in &mut config.bands {
                band.kind = filter_type;
            }
            Ok(())
        })
    }

    pub fn bands(&self) -> Vec<FilterParams> {
        self.config.lock().bands.clone()
    }

    pub fn count(&self) -> usize {
        self.config.lock().bands.len()
    }

    /// Replace the whole band list
    pub fn set_bands(&self, bands: &[FilterParams]) -> ElementResult<()> {
        if let Some(bad) = bands.iter().find(|b| !is_band_frequency_valid(b.frequency)) {
            warn!(frequency = bad.frequency, "equalizer band refused");
            return Err(ElementError::InvalidBand(bad.frequency));
        }
        self.edit(|config| {
            config.bands = bands.to_vec();
            Ok(())
        })
    }

    pub fn apply_preset(&self, preset: &Preset) -> ElementResult<()> {
        debug!(preset = preset.name, "equalizer preset");
        self.set_bands(&preset.bands())
    }

    /// Update the band at `frequency`, or add one with the current filter type
    pub fn set(&self, frequency: f64, gain_db: f64, q: f64) -> ElementResult<()> {
        if !is_band_frequency_valid(frequency) {
            warn!(frequency, "equalizer band refused");
            return Err(ElementError::InvalidBand(frequency));
        }
        self.edit(|config| {
            match config.bands.iter_mut().find(|b| b.frequency == frequency) {
                Some(band) => {
                    band.gain_db = gain_db;
                    band.slope = cast_dsp::Slope::Q(q);
                }
                None => {
                    let kind = config.filter_type;
                    config.bands.push(FilterParams::new(kind, frequency, gain_db, q));
                }
            }
            Ok(())
        })
    }

    /// Drop every band; the next pass is a passthrough
    pub fn clear(&self) {
        // Cannot fail: an empty list always builds
        let _ = self.edit(|config| {
            config.bands.clear();
            Ok(())
        });
    }

    /// Store the distance-compensation delay, clamped to [`EQUALIZER_DELAY_MAX`]
    pub fn set_delay(&self, delay: Duration) -> Duration {
        let delay = delay.min(EQUALIZER_DELAY_MAX);
        self.delay_us.store(delay.as_micros() as u64, Ordering::Relaxed);
        delay
    }

    pub fn delay(&self) -> Duration {
        Duration::from_micros(self.delay_us.load(Ordering::Relaxed))
    }

    /// Apply `change` to a copy of the config, build its bank off to the
    /// side and only then commit both
    fn edit(&self, change: impl FnOnce(&mut Config) -> ElementResult<()>) -> ElementResult<()> {
        let mut config = self.config.lock();
        let mut next = Config {
            filter_type: config.filter_type,
            bands: config.bands.clone(),
            generation: config.generation + 1,
            shape: config.shape,
        };
        change(&mut next)?;

        // Before the first pass the stream rate is unknown; the slowest rate
        // has the lowest Nyquist limit, so a band valid there is valid anywhere
        let rate = next.shape.map_or(Rate::R44100, |(_, rate)| rate);
        for band in &next.bands {
            band.validate(rate.hz() as f64)?;
        }

        let built = match next.shape {
            Some(shape) => Some(build(&next.bands, shape, next.generation)?),
            None => None,
        };
        *config = next;
        *self.pending.lock() = built;
        debug!(
            bands = config.bands.len(),
            generation = config.generation,
            "equalizer reconfigured"
        );
        Ok(())
    }

    /// Bank matching the current config and `shape`, swapping or rebuilding as needed
    fn refresh(&self, active: &mut Option<Built>, shape: Shape) -> ElementResult<()> {
        let (generation, bands) = {
            let mut config = self.config.lock();
            config.shape = Some(shape);
            let current = active
                .as_ref()
                .is_some_and(|b| b.generation == config.generation && b.shape == shape);
            if current {
                return Ok(());
            }
            (config.generation, config.bands.clone())
        };

        if let Some(ready) = self.pending.lock().take() {
            if ready.generation == generation && ready.shape == shape {
                debug!(generation, "equalizer bank swapped in");
                *active = Some(ready);
                return Ok(());
            }
        }

        debug!(channels = shape.0, rate = %shape.1, "equalizer bank rebuilt for stream format");
        *active = Some(build(&bands, shape, generation)?);
        Ok(())
    }
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Switch for Equalizer {
    fn on(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    fn off(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn is_on(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Element for Equalizer {
    fn name(&self) -> &str {
        "Equalizer"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        if !self.is_on() {
            return Ok(());
        }
        let shape = (samples.channels(), samples.format().rate);
        let mut active = self.active.lock();
        self.refresh(&mut active, shape)?;

        let Some(built) = active.as_mut() else {
            return Ok(());
        };
        if built.bank.is_empty() {
            return Ok(());
        }
        let delivered = samples.delivered();
        for (ch, plane) in samples.planes_mut()?.enumerate() {
            built.bank.process_channel(ch, &mut plane[..delivered]);
        }
        Ok(())
    }

    fn close(&self) {
        *self.active.lock() = None;
        *self.pending.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Format;

    fn impulse(len: usize) -> Samples {
        let mut s = Samples::new(len, Format::default());
        for plane in s.planes_mut().unwrap() {
            plane[0] = 1.0;
        }
        s.set_delivered(len);
        s
    }

    #[test]
    fn test_idle_is_passthrough() {
        let eq = Equalizer::new();
        assert_eq!(eq.state(), EqualizerState::Idle);
        let mut s = impulse(8);
        eq.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap()[0], 1.0);
        assert!(s.plane(0).unwrap()[1..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_set_adds_then_updates() {
        let eq = Equalizer::new();
        eq.set(1000.0, 6.0, 1.0).unwrap();
        eq.set(100.0, -3.0, 0.7).unwrap();
        eq.set(1000.0, 2.0, 2.0).unwrap();
        assert_eq!(eq.count(), 2);
        let bands = eq.bands();
        assert_eq!(bands[0].gain_db, 2.0);
        assert_eq!(bands[0].slope, cast_dsp::Slope::Q(2.0));
        assert_eq!(bands[1].kind, FilterType::Peaking);
        assert_eq!(eq.state(), EqualizerState::Active);

        eq.clear();
        assert_eq!(eq.count(), 0);
    }

    #[test]
    fn test_band_range_enforced() {
        let eq = Equalizer::new();
        assert_eq!(eq.set(10.0, 1.0, 1.0), Err(ElementError::InvalidBand(10.0)));
        assert!(eq.set(25_000.0, 1.0, 1.0).is_err());
        let bands = [FilterParams::new(FilterType::LowPass, 5.0, 0.0, 0.7)];
        assert!(eq.set_bands(&bands).is_err());
        assert_eq!(eq.count(), 0);
    }

    #[test]
    fn test_invalid_slope_refused_before_first_pass() {
        let eq = Equalizer::new();
        eq.set(1000.0, 6.0, 1.0).unwrap();
        let err = eq.set(2000.0, 6.0, 0.0).unwrap_err();
        assert!(matches!(err, ElementError::Dsp(cast_dsp::DspError::InvalidSlope(_))));
        assert_eq!(eq.count(), 1);
        assert_eq!(eq.bands()[0].frequency, 1000.0);

        let mut s = impulse(16);
        eq.stream(&mut s).unwrap();
        // Same refusal once the stream shape is known
        assert!(eq.set(2000.0, 6.0, 0.0).is_err());
        assert_eq!(eq.count(), 1);
    }

    #[test]
    fn test_edits_from_control_thread_during_passes() {
        let eq = Equalizer::new();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..50 {
                    let gain = (i % 12) as f64;
                    eq.set(1000.0, gain, 1.0).unwrap();
                    eq.set(250.0 + i as f64, -gain, 0.7).unwrap();
                }
            });
            for _ in 0..50 {
                let mut s = impulse(64);
                eq.stream(&mut s).unwrap();
                assert!(s.plane(0).unwrap().iter().all(|x| x.is_finite()));
            }
        });
        assert_eq!(eq.count(), 51);

        // The final config is in force on the next pass
        let mut s = impulse(64);
        eq.stream(&mut s).unwrap();
        assert_eq!(eq.state(), EqualizerState::Active);
        let active = eq.active.lock();
        assert_eq!(active.as_ref().unwrap().generation, eq.config.lock().generation);
    }

    #[test]
    fn test_replacement_swapped_on_next_pass() {
        let eq = Equalizer::new();
        eq.set(1000.0, 12.0, 1.0).unwrap();
        // Shape unknown before the first pass, so the bank is built inline
        assert_eq!(eq.state(), EqualizerState::Active);
        let mut s = impulse(64);
        eq.stream(&mut s).unwrap();
        let boosted = s.plane(0).unwrap().to_vec();
        assert_ne!(&boosted[1..4], &[0.0; 3]);

        eq.set(1000.0, 0.0, 1.0).unwrap();
        assert_eq!(eq.state(), EqualizerState::Reconfiguring);
        let mut s = impulse(64);
        eq.stream(&mut s).unwrap();
        assert_eq!(eq.state(), EqualizerState::Active);
        // Flat peaking band is an identity
        assert!((s.plane(1).unwrap()[0] - 1.0).abs() < 1e-12);
        assert!(s.plane(1).unwrap()[1..].iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn test_channels_filtered_alike() {
        let eq = Equalizer::new();
        eq.apply_preset(cast_dsp::preset("Bass Boost").unwrap()).unwrap();
        assert_eq!(eq.count(), 10);
        let mut s = impulse(32);
        eq.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), s.plane(1).unwrap());
    }

    #[test]
    fn test_format_change_rebuilds_bank() {
        let eq = Equalizer::new();
        eq.set(500.0, 6.0, 1.0).unwrap();
        let mut s = impulse(16);
        eq.stream(&mut s).unwrap();

        let mut mono = Samples::new(16, Format::internal(Rate::R96000, crate::audio::ChannelLayout::MONO));
        mono.plane_mut(0).unwrap()[0] = 1.0;
        mono.set_delivered(16);
        eq.stream(&mut mono).unwrap();
        let active = eq.active.lock();
        let built = active.as_ref().unwrap();
        assert_eq!(built.bank.channel_count(), 1);
        assert_eq!(built.bank.sample_rate(), 96_000.0);
    }

    #[test]
    fn test_filter_type_applies_to_all_bands() {
        let eq = Equalizer::new();
        eq.set(200.0, 3.0, 0.7).unwrap();
        eq.set(4000.0, 3.0, 0.7).unwrap();
        eq.set_filter_type(FilterType::HighShelf).unwrap();
        assert!(eq.bands().iter().all(|b| b.kind == FilterType::HighShelf));
        assert_eq!(eq.filter_type(), FilterType::HighShelf);
    }

    #[test]
    fn test_delay_clamped() {
        let eq = Equalizer::new();
        assert_eq!(eq.set_delay(Duration::from_millis(120)), Duration::from_millis(120));
        assert_eq!(eq.delay(), Duration::from_millis(120));
        assert_eq!(eq.set_delay(Duration::from_secs(2)), EQUALIZER_DELAY_MAX);
        assert_eq!(eq.delay(), EQUALIZER_DELAY_MAX);
    }

    #[test]
    fn test_switched_off() {
        let eq = Equalizer::new();
        eq.set(1000.0, 12.0, 1.0).unwrap();
        eq.off();
        let mut s = impulse(8);
        eq.stream(&mut s).unwrap();
        assert!(s.plane(0).unwrap()[1..].iter().all(|&x| x == 0.0));
    }
}
