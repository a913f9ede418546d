//! Resample Element
//!
//! A switchable element that owns the target-format contract. The actual
//! conversion runs in a pluggable [`ResampleBackend`]; the built-in
//! [`BitDepthConverter`] only changes sample width.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::Format;
use crate::element::{Element, Switch};
use crate::error::{ElementError, ElementResult};
use crate::samples::Samples;

pub trait ResampleBackend: Send {
    /// Convert `samples` from `from` to `to` in place, leaving its format set to `to`
    fn convert(&mut self, from: &Format, to: &Format, samples: &mut Samples) -> ElementResult<()>;
}

/// Builds one backend per resample element
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn ResampleBackend> + Send + Sync>;

/// Width-only conversion; rate or layout changes need a real resampler
#[derive(Debug, Default, Clone, Copy)]
pub struct BitDepthConverter;

impl ResampleBackend for BitDepthConverter {
    fn convert(&mut self, from: &Format, to: &Format, samples: &mut Samples) -> ElementResult<()> {
        if from.rate != to.rate || from.layout != to.layout {
            return Err(ElementError::NoBackend { from: *from, to: *to });
        }
        samples.convert_bits(to.bits)?;
        Ok(())
    }
}

struct State {
    target: Option<Format>,
    backend: Option<Box<dyn ResampleBackend>>,
}

pub struct Resample {
    enabled: AtomicBool,
    state: Mutex<State>,
}

impl Resample {
    /// Enabled, with no target and the bit-depth backend
    pub fn new() -> Self {
        Self::with_backend(Box::new(BitDepthConverter))
    }

    pub fn with_backend(backend: Box<dyn ResampleBackend>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            state: Mutex::new(State {
                target: None,
                backend: Some(backend),
            }),
        }
    }

    /// Element without any backend; conversions fail with `NoBackend`
    pub fn without_backend() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            state: Mutex::new(State {
                target: None,
                backend: None,
            }),
        }
    }

    pub fn set_backend(&self, backend: Box<dyn ResampleBackend>) {
        self.state.lock().backend = Some(backend);
    }

    /// Target format; an invalid one is refused and the old target kept
    pub fn set_format(&self, format: Format) -> bool {
        if !format.is_valid() {
            return false;
        }
        self.state.lock().target = Some(format);
        true
    }

    pub fn format(&self) -> Option<Format> {
        self.state.lock().target
    }

    pub fn clear_format(&self) {
        self.state.lock().target = None;
    }
}

impl Default for Resample {
    fn default() -> Self {
        Self::new()
    }
}

impl Switch for Resample {
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

impl Element for Resample {
    fn name(&self) -> &str {
        "Resample"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        if !self.is_on() {
            return Ok(());
        }
        let mut state = self.state.lock();
        let Some(target) = state.target else {
            return Ok(());
        };
        let from = *samples.format();
        if !from.is_valid() || !target.is_valid() {
            return Err(ElementError::InvalidResample { from, to: target });
        }
        if from == target {
            return Ok(());
        }
        match state.backend.as_mut() {
            Some(backend) => backend.convert(&from, &target, samples),
            None => Err(ElementError::NoBackend { from, to: target }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{Bits, ChannelLayout, Rate};

    fn s16_stereo() -> Format {
        Format::new(Rate::R48000, Bits::S16, ChannelLayout::STEREO)
    }

    #[test]
    fn test_bit_depth_to_internal() {
        let pcm: Vec<u8> = [16_384i16, -16_384].iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut s = Samples::from_interleaved(s16_stereo(), &pcm);

        let resample = Resample::new();
        assert!(resample.set_format(s16_stereo().with_internal_bits()));
        resample.stream(&mut s).unwrap();
        assert!(s.format().is_internal());
        assert_eq!(s.plane(0).unwrap(), &[0.5]);
        assert_eq!(s.plane(1).unwrap(), &[-0.5]);
    }

    #[test]
    fn test_rate_change_needs_real_backend() {
        let mut s = Samples::new(4, Format::default());
        let resample = Resample::new();
        let target = Format::internal(Rate::R44100, ChannelLayout::STEREO);
        resample.set_format(target);
        assert_eq!(
            resample.stream(&mut s),
            Err(ElementError::NoBackend {
                from: Format::default(),
                to: target,
            })
        );

        let bare = Resample::without_backend();
        bare.set_format(target);
        assert!(matches!(bare.stream(&mut s), Err(ElementError::NoBackend { .. })));
    }

    #[test]
    fn test_invalid_target_refused() {
        let resample = Resample::new();
        let bad = Format::internal(Rate::R48000, ChannelLayout::EMPTY);
        assert!(!resample.set_format(bad));
        assert_eq!(resample.format(), None);
    }

    #[test]
    fn test_invalid_source_format() {
        let mut s = Samples::new(4, Format::internal(Rate::R48000, ChannelLayout::EMPTY));
        let resample = Resample::new();
        resample.set_format(Format::default());
        assert!(matches!(resample.stream(&mut s), Err(ElementError::InvalidResample { .. })));
    }

    #[test]
    fn test_switched_off_is_passthrough() {
        let mut s = Samples::new(4, s16_stereo());
        let resample = Resample::new();
        resample.set_format(Format::default());
        resample.off();
        resample.stream(&mut s).unwrap();
        assert_eq!(s.format().bits, Bits::S16);
        resample.set_on(true);
        resample.stream(&mut s).unwrap();
        assert_eq!(s.format().bits, Bits::F64);
    }

    struct Tagging;

    impl ResampleBackend for Tagging {
        fn convert(&mut self, _from: &Format, to: &Format, samples: &mut Samples) -> ElementResult<()> {
            samples.set_format(*to)?;
            Ok(())
        }
    }

    #[test]
    fn test_custom_backend() {
        let mut s = Samples::new(4, Format::default());
        let resample = Resample::with_backend(Box::new(Tagging));
        let target = Format::internal(Rate::R96000, ChannelLayout::STEREO);
        resample.set_format(target);
        resample.stream(&mut s).unwrap();
        assert_eq!(s.format(), &target);
    }
}
