//! Volume Element
//!
//! gain = base^volume when the base is not 1 (an exponential loudness
//! curve), else the volume itself. Mute or a zero volume writes exact zero,
//! whatever the input held. Switched off, samples pass through untouched.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::element::{Element, ElementKind, Switch};
use crate::error::ElementResult;
use crate::samples::Samples;

pub struct Volume {
    // Rust pattern: AtomicF64 doesn't exist, so f64 values live as their bits
    volume_bits: AtomicU64,
    base_bits: AtomicU64,
    muted: AtomicBool,
    enabled: AtomicBool,
}

impl Volume {
    pub fn new(volume: f64) -> Self {
        let v = Self {
            volume_bits: AtomicU64::new(0),
            base_bits: AtomicU64::new(1.0_f64.to_bits()),
            muted: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        };
        v.set_volume(volume);
        v
    }

    /// Volume with an exponential curve of `base`
    pub fn with_base(volume: f64, base: f64) -> Self {
        let v = Self::new(volume);
        v.set_base(base);
        v
    }

    /// Clamped to 0.0 - 1.0; NaN counts as 0
    pub fn set_volume(&self, volume: f64) {
        let v = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume_bits.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f64 {
        f64::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Non-positive or non-finite bases fall back to linear
    pub fn set_base(&self, base: f64) {
        let b = if base.is_finite() && base > 0.0 { base } else { 1.0 };
        self.base_bits.store(b.to_bits(), Ordering::Relaxed);
    }

    pub fn base(&self) -> f64 {
        f64::from_bits(self.base_bits.load(Ordering::Relaxed))
    }

    pub fn set_mute(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Multiplier applied to every sample
    pub fn gain(&self) -> f64 {
        let volume = self.volume();
        if self.is_muted() || volume == 0.0 {
            return 0.0;
        }
        let base = self.base();
        if base != 1.0 {
            base.powf(volume)
        } else {
            volume
        }
    }

    fn apply(&self, x: &mut f64, gain: f64) {
        if gain == 0.0 {
            *x = 0.0;
        } else {
            *x *= gain;
        }
    }
}

impl Switch for Volume {
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

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Element for Volume {
    fn name(&self) -> &str {
        "Volume"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        if !self.is_on() {
            return Ok(());
        }
        let gain = self.gain();
        let delivered = samples.delivered();
        for plane in samples.planes_mut()? {
            if gain == 0.0 {
                // Multiplying would keep NaN and infinities
                plane[..delivered].fill(0.0);
            } else {
                plane[..delivered].iter_mut().for_each(|x| *x *= gain);
            }
        }
        Ok(())
    }
}

/// Same gain, driven through the per-sample hook
pub struct SampleVolume(pub Volume);

impl Element for SampleVolume {
    fn name(&self) -> &str {
        "Volume"
    }

    fn kind(&self) -> ElementKind {
        ElementKind::PerSample
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        self.0.stream(samples)
    }

    fn sample(&self, sample: &mut f64, _channel: usize, _index: usize) {
        if self.0.is_on() {
            self.0.apply(sample, self.0.gain());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Format;
    use crate::pipeline::Pipeline;
    use std::sync::Arc;

    fn loud() -> Samples {
        let mut s = Samples::new(4, Format::default());
        for plane in s.planes_mut().unwrap() {
            plane.copy_from_slice(&[1.0, -1.0, 0.5, f64::MAX]);
        }
        s.set_delivered(4);
        s
    }

    #[test]
    fn test_linear_gain() {
        let volume = Volume::new(0.5);
        let mut s = loud();
        volume.stream(&mut s).unwrap();
        assert_eq!(&s.plane(0).unwrap()[..3], &[0.5, -0.5, 0.25]);
    }

    #[test]
    fn test_exponential_curve() {
        let volume = Volume::with_base(0.5, 100.0);
        assert!((volume.gain() - 10.0).abs() < 1e-12);
        volume.set_volume(1.0);
        assert!((volume.gain() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_and_mute_force_silence() {
        for volume in [Volume::with_base(0.0, 100.0), Volume::new(0.0)] {
            let mut s = loud();
            volume.stream(&mut s).unwrap();
            assert!(s.planes().unwrap().all(|p| p.iter().all(|&x| x == 0.0)));
        }

        let volume = Volume::with_base(0.8, 50.0);
        volume.set_mute(true);
        let mut s = loud();
        volume.stream(&mut s).unwrap();
        assert!(s.planes().unwrap().all(|p| p.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_silence_clears_non_finite_input() {
        let volume = Volume::new(0.7);
        volume.set_mute(true);
        let mut s = Samples::new(3, Format::default());
        for plane in s.planes_mut().unwrap() {
            plane.copy_from_slice(&[f64::INFINITY, f64::NAN, f64::NEG_INFINITY]);
        }
        s.set_delivered(3);
        volume.stream(&mut s).unwrap();
        assert!(s.planes().unwrap().all(|p| p == [0.0, 0.0, 0.0]));

        let pipeline = Pipeline::new();
        pipeline.append(Arc::new(SampleVolume(Volume::new(0.0))));
        let mut s = Samples::new(2, Format::default());
        s.plane_mut(0).unwrap().copy_from_slice(&[f64::NAN, f64::INFINITY]);
        s.set_delivered(2);
        pipeline.stream(&mut s);
        assert_eq!(s.plane(0).unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_switched_off_passes_through() {
        let volume = Volume::new(0.5);
        volume.set_mute(true);
        volume.off();
        assert!(!volume.is_on());
        let mut s = loud();
        volume.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), &[1.0, -1.0, 0.5, f64::MAX]);

        volume.on();
        volume.stream(&mut s).unwrap();
        assert!(s.planes().unwrap().all(|p| p.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_clamps_inputs() {
        let volume = Volume::new(3.0);
        assert_eq!(volume.volume(), 1.0);
        volume.set_volume(f64::NAN);
        assert_eq!(volume.volume(), 0.0);
        volume.set_base(-2.0);
        assert_eq!(volume.base(), 1.0);
    }

    #[test]
    fn test_per_sample_hook_matches_stream() {
        let pipeline = Pipeline::new();
        pipeline.append(Arc::new(SampleVolume(Volume::new(0.25))));
        let mut s = loud();
        pipeline.stream(&mut s);
        assert_eq!(&s.plane(1).unwrap()[..3], &[0.25, -0.25, 0.125]);
    }
}
