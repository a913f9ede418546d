//! Spectrum Element
//!
//! Read-only analysis for visualizations. Every delivered sample is
//! down-mixed to mono (channel average), Hann-windowed into a rolling
//! buffer, and each full window becomes one FFT magnitude snapshot. A level
//! meter runs over the same down-mixed input.
//!
//! Both outputs drop to zero as soon as a pass delivers nothing, so a
//! stopped stream never leaves a frozen spectrum behind.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cast_dsp::{Axis, DspResult, Fft, HannWindow, LevelMeter};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::element::{Element, Switch};
use crate::error::ElementResult;
use crate::samples::Samples;

/// Latest published analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpectrumSnapshot {
    pub magnitudes: Vec<f64>,
    pub level: f64,
    /// Completed FFT windows so far
    pub frames: u64,
}

struct Analyzer {
    fft: Fft,
    window: HannWindow,
    axis: Axis,
    rolling: Vec<f64>,
    meter: LevelMeter,
}

impl Analyzer {
    fn new(size: usize, axis: Axis) -> DspResult<Self> {
        Ok(Self {
            fft: Fft::new(size)?,
            window: HannWindow::new(size),
            axis,
            rolling: Vec::with_capacity(size),
            meter: LevelMeter::new(),
        })
    }

    fn idle(&mut self) {
        self.rolling.clear();
        self.meter.reset();
    }
}

pub struct Spectrum {
    enabled: AtomicBool,
    frames: AtomicU64,
    analyzer: Mutex<Analyzer>,
    output: RwLock<SpectrumSnapshot>,
}

impl Spectrum {
    /// `size` must be a power of two
    pub fn new(size: usize, axis: Axis) -> DspResult<Self> {
        Ok(Self {
            enabled: AtomicBool::new(true),
            frames: AtomicU64::new(0),
            analyzer: Mutex::new(Analyzer::new(size, axis)?),
            output: RwLock::new(SpectrumSnapshot::default()),
        })
    }

    pub fn window_size(&self) -> usize {
        self.analyzer.lock().fft.size()
    }

    /// Change the window; the rolling buffer restarts
    pub fn set_window_size(&self, size: usize) -> ElementResult<()> {
        let mut analyzer = self.analyzer.lock();
        let axis = analyzer.axis;
        *analyzer = Analyzer::new(size, axis)?;
        Ok(())
    }

    pub fn axis(&self) -> Axis {
        self.analyzer.lock().axis
    }

    pub fn set_axis(&self, axis: Axis) {
        self.analyzer.lock().axis = axis;
    }

    /// Magnitudes of the last full window
    pub fn spectrum(&self) -> Vec<f64> {
        self.output.read().magnitudes.clone()
    }

    pub fn level(&self) -> f64 {
        self.output.read().level
    }

    pub fn snapshot(&self) -> SpectrumSnapshot {
        self.output.read().clone()
    }

    fn zero_outputs(&self) {
        let mut out = self.output.write();
        out.magnitudes.iter_mut().for_each(|m| *m = 0.0);
        out.level = 0.0;
    }
}

impl Switch for Spectrum {
    fn on(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    fn off(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        self.analyzer.lock().idle();
        self.zero_outputs();
    }

    fn is_on(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Element for Spectrum {
    fn name(&self) -> &str {
        "Spectrum"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        if !self.is_on() {
            return Ok(());
        }
        let mut analyzer = self.analyzer.lock();
        let delivered = samples.delivered();
        let channels = samples.channels();
        if delivered == 0 || channels == 0 {
            analyzer.idle();
            drop(analyzer);
            self.zero_outputs();
            return Ok(());
        }

        // Level meter decimation: about 20 points per second of audio per pass
        let step = (20 * delivered / samples.format().rate.hz() as usize).max(1);
        let planes: Vec<&[f64]> = samples.planes()?.collect();
        let scale = 1.0 / channels as f64;
        let size = analyzer.fft.size();
        let mut latest: Option<Vec<f64>> = None;

        for i in 0..delivered {
            let mono = planes.iter().map(|p| p[i]).sum::<f64>() * scale;
            if i % step == 0 {
                analyzer.meter.push(mono);
            }
            let at = analyzer.rolling.len();
            let windowed = analyzer.window.apply(mono, at);
            analyzer.rolling.push(windowed);

            if analyzer.rolling.len() == size {
                let Analyzer { fft, rolling, axis, .. } = &mut *analyzer;
                let norm = 2.0 / size as f64;
                let magnitudes = fft.spectrum(rolling, *axis)?;
                latest = Some(
                    magnitudes
                        .iter()
                        .map(|m| if m.is_finite() { m * norm } else { 0.0 })
                        .collect(),
                );
                rolling.clear();
                self.frames.fetch_add(1, Ordering::Relaxed);
            }
        }

        let level = analyzer.meter.level();
        analyzer.meter.reset();
        drop(analyzer);

        let mut out = self.output.write();
        out.level = level;
        if let Some(magnitudes) = latest {
            out.magnitudes = magnitudes;
        }
        out.frames = self.frames.load(Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Format;
    use std::f64::consts::PI;

    fn tone(len: usize, bin: usize, size: usize) -> Samples {
        let mut s = Samples::new(len, Format::default());
        for plane in s.planes_mut().unwrap() {
            for (i, x) in plane.iter_mut().enumerate() {
                *x = (2.0 * PI * bin as f64 * i as f64 / size as f64).sin();
            }
        }
        s.set_delivered(len);
        s
    }

    #[test]
    fn test_snapshot_after_full_window() {
        let spectrum = Spectrum::new(256, Axis::Linear).unwrap();
        let mut s = tone(128, 16, 256);
        spectrum.stream(&mut s).unwrap();
        assert!(spectrum.spectrum().is_empty());
        assert!(spectrum.level() > 0.0);

        spectrum.stream(&mut s).unwrap();
        let magnitudes = spectrum.spectrum();
        assert_eq!(magnitudes.len(), 128);
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak.abs_diff(16) <= 1);
        assert_eq!(spectrum.snapshot().frames, 1);
    }

    #[test]
    fn test_sine_level() {
        let spectrum = Spectrum::new(1024, Axis::Log).unwrap();
        let mut s = tone(960, 10, 960);
        spectrum.stream(&mut s).unwrap();
        // RMS of a full-scale sine
        assert!((spectrum.level() - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }

    #[test]
    fn test_idle_pass_zeroes_outputs() {
        let spectrum = Spectrum::new(64, Axis::Linear).unwrap();
        let mut s = tone(64, 4, 64);
        spectrum.stream(&mut s).unwrap();
        assert!(spectrum.spectrum().iter().any(|&m| m > 0.0));

        s.set_delivered(0);
        spectrum.stream(&mut s).unwrap();
        assert_eq!(spectrum.level(), 0.0);
        assert!(spectrum.spectrum().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_nan_never_published() {
        let spectrum = Spectrum::new(64, Axis::Linear).unwrap();
        let mut s = tone(64, 4, 64);
        s.plane_mut(0).unwrap()[3] = f64::NAN;
        spectrum.stream(&mut s).unwrap();
        assert!(spectrum.spectrum().iter().all(|m| m.is_finite()));
        assert!(spectrum.level().is_finite());
    }

    #[test]
    fn test_window_must_be_power_of_two() {
        assert!(Spectrum::new(1000, Axis::Log).is_err());
        let spectrum = Spectrum::new(512, Axis::Log).unwrap();
        assert!(spectrum.set_window_size(300).is_err());
        assert_eq!(spectrum.window_size(), 512);
        spectrum.set_window_size(4096).unwrap();
        assert_eq!(spectrum.window_size(), 4096);
    }

    #[test]
    fn test_off_clears() {
        let spectrum = Spectrum::new(64, Axis::Linear).unwrap();
        let mut s = tone(64, 4, 64);
        spectrum.stream(&mut s).unwrap();
        spectrum.off();
        assert_eq!(spectrum.level(), 0.0);
        spectrum.stream(&mut s).unwrap();
        assert_eq!(spectrum.level(), 0.0);
    }
}
