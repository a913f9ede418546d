//! Synthetic sources for the demo line

use std::f64::consts::TAU;
use std::time::Duration;

use cast_core::{Format, Samples, SourceError, SourceResult, SourceStreamer};

/// Sine generator with an optional fixed length
pub struct ToneSource {
    format: Format,
    frequency: f64,
    amplitude: f64,
    phase: f64,
    position: usize,
    length: Option<usize>,
    name: String,
}

impl ToneSource {
    pub fn new(format: Format, frequency: f64, amplitude: f64) -> Self {
        Self {
            format,
            frequency,
            amplitude,
            phase: 0.0,
            position: 0,
            length: None,
            name: format!("tone {frequency} Hz"),
        }
    }

    /// Stop after `duration`
    pub fn with_length(mut self, duration: Duration) -> Self {
        self.length = Some(self.format.rate.samples_for(duration));
        self
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    fn remaining(&self) -> usize {
        match self.length {
            Some(length) => length.saturating_sub(self.position),
            None => usize::MAX,
        }
    }
}

impl SourceStreamer for ToneSource {
    fn stream(&mut self, samples: &mut Samples) -> usize {
        let n = samples.len().min(self.remaining());
        let step = self.frequency * TAU / self.format.rate.hz() as f64;
        let start = self.phase;
        if let Ok(planes) = samples.planes_mut() {
            for plane in planes {
                for (i, x) in plane[..n].iter_mut().enumerate() {
                    *x = (start + step * i as f64).sin() * self.amplitude;
                }
            }
        }
        self.phase = (start + step * n as f64) % TAU;
        self.position += n;
        samples.set_delivered(n);
        n
    }

    fn close(&mut self) -> SourceResult<()> {
        self.length = Some(self.position);
        Ok(())
    }

    fn seek(&mut self, position: Duration) -> SourceResult<()> {
        let target = self.format.rate.samples_for(position);
        match self.length {
            Some(length) if target > length => Err(SourceError::SeekOutOfRange {
                position_ms: position.as_millis() as u64,
                length_ms: self.format.rate.duration_of(length).as_millis() as u64,
            }),
            _ => {
                self.position = target;
                Ok(())
            }
        }
    }

    fn audio_format(&self) -> Format {
        self.format
    }

    fn out_format(&self) -> Format {
        self.format
    }

    fn is_playing(&self) -> bool {
        self.remaining() > 0
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Interleaved s16 sine burst, for the clip player
pub fn beep_s16(format: Format, frequency: f64, duration: Duration) -> Vec<u8> {
    let frames = format.rate.samples_for(duration);
    let channels = format.layout.count();
    let step = frequency * TAU / format.rate.hz() as f64;
    (0..frames)
        .flat_map(|i| {
            let v = ((step * i as f64).sin() * 0.25 * i16::MAX as f64) as i16;
            std::iter::repeat(v).take(channels)
        })
        .flat_map(i16::to_le_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cast_core::{Bits, ChannelLayout, Rate};

    #[test]
    fn test_fixed_length_tone_ends() {
        let format = Format::default();
        let mut tone = ToneSource::new(format, 1000.0, 0.5).with_length(Duration::from_millis(15));
        let mut s = Samples::new(480, format);
        assert_eq!(tone.stream(&mut s), 480);
        assert_eq!(tone.stream(&mut s), 240);
        assert!(!tone.is_playing());
        assert_eq!(tone.stream(&mut s), 0);
    }

    #[test]
    fn test_amplitude_bounded() {
        let format = Format::default();
        let mut tone = ToneSource::new(format, 440.0, 0.5);
        let mut s = Samples::new(480, format);
        tone.stream(&mut s);
        assert!(s.plane(0).unwrap().iter().all(|x| x.abs() <= 0.5));
    }

    #[test]
    fn test_beep_size() {
        let format = Format::new(Rate::R48000, Bits::S16, ChannelLayout::STEREO);
        let pcm = beep_s16(format, 880.0, Duration::from_millis(10));
        assert_eq!(pcm.len(), format.samples_size(480));
    }
}
