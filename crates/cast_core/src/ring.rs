//! Push-to-Pull Source Bridge
//!
//! Network receivers push interleaved frames whenever packets arrive; the
//! mixer pulls planar samples on its own clock. An `rtrb` SPSC ring sits in
//! between: [`RingWriter`] lives on the receiver thread, [`RingSource`] is
//! added to a mixer.
//!
//! ```text
//! receiver ──write()──▶ [ rtrb<f64>, interleaved ] ──stream()──▶ planar Samples
//! ```
//!
//! Rust pattern: the ring is lock-free and wait-free on both ends, so the
//! pipeline thread never blocks on a slow producer.

use std::time::Duration;

use rtrb::{Consumer, Producer, RingBuffer};
use tracing::debug;

use crate::audio::Format;
use crate::convert;
use crate::error::{SourceError, SourceResult};
use crate::samples::Samples;
use crate::source::SourceStreamer;

/// Create a bridge holding `frames` frames of `format`
///
/// `format.bits` is the width producers hand to [`RingWriter::write_pcm`];
/// the ring itself always carries internal floats.
pub fn ring(format: Format, frames: usize) -> (RingWriter, RingSource) {
    let channels = format.layout.count().max(1);
    let (producer, consumer) = RingBuffer::<f64>::new(frames * channels);
    (
        RingWriter { producer, format },
        RingSource {
            consumer,
            format,
            closed: false,
            name: format!("ring({format})"),
        },
    )
}

pub struct RingWriter {
    producer: Producer<f64>,
    format: Format,
}

impl RingWriter {
    pub fn format(&self) -> Format {
        self.format
    }

    /// Whole frames of free space
    pub fn free_frames(&self) -> usize {
        self.producer.slots() / self.format.layout.count().max(1)
    }

    /// Push interleaved float frames; returns the frames accepted
    ///
    /// Only whole frames are written. What does not fit is dropped.
    pub fn write(&mut self, interleaved: &[f64]) -> usize {
        let channels = self.format.layout.count().max(1);
        let frames = (interleaved.len() / channels).min(self.free_frames());
        if frames == 0 {
            return 0;
        }
        match self.producer.write_chunk_uninit(frames * channels) {
            Ok(chunk) => chunk.fill_from_iter(interleaved.iter().copied()) / channels,
            Err(_) => 0,
        }
    }

    /// Push interleaved PCM at the writer format's width
    pub fn write_pcm(&mut self, bytes: &[u8]) -> usize {
        let width = self.format.bits.size();
        let channels = self.format.layout.count().max(1);
        let frames = (bytes.len() / (width * channels)).min(self.free_frames());
        if frames == 0 {
            return 0;
        }
        let bits = self.format.bits;
        let values = bytes[..frames * width * channels]
            .chunks_exact(width)
            .map(|s| convert::decode_sample(s, bits));
        match self.producer.write_chunk_uninit(frames * channels) {
            Ok(chunk) => chunk.fill_from_iter(values) / channels,
            Err(_) => 0,
        }
    }

    /// Whether the reading side was dropped
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

pub struct RingSource {
    consumer: Consumer<f64>,
    format: Format,
    closed: bool,
    name: String,
}

impl RingSource {
    /// Whole frames waiting to be streamed
    pub fn available_frames(&self) -> usize {
        self.consumer.slots() / self.format.layout.count().max(1)
    }
}

impl SourceStreamer for RingSource {
    fn stream(&mut self, samples: &mut Samples) -> usize {
        if self.closed {
            return 0;
        }
        let channels = self.format.layout.count();
        if channels == 0 || samples.channels() != channels {
            return 0;
        }
        let frames = self.available_frames().min(samples.len());
        if frames == 0 {
            return 0;
        }
        let Ok(chunk) = self.consumer.read_chunk(frames * channels) else {
            return 0;
        };
        {
            let (first, second) = chunk.as_slices();
            let mut values = first.iter().chain(second.iter());
            for i in 0..frames {
                for slot in 0..channels {
                    let v = values.next().copied().unwrap_or(0.0);
                    if let Some(plane) = samples.plane_mut(slot) {
                        plane[i] = v;
                    }
                }
            }
        }
        chunk.commit_all();
        samples.set_delivered(frames);
        frames
    }

    fn close(&mut self) -> SourceResult<()> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        debug!(source = %self.name, "ring source closed");
        self.closed = true;
        Ok(())
    }

    fn seek(&mut self, _position: Duration) -> SourceResult<()> {
        Err(SourceError::SeekUnsupported)
    }

    fn audio_format(&self) -> Format {
        self.format
    }

    fn out_format(&self) -> Format {
        self.format.with_internal_bits()
    }

    /// Playing while the writer is alive or frames remain
    fn is_playing(&self) -> bool {
        !self.closed && (!self.consumer.is_abandoned() || !self.consumer.is_empty())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
