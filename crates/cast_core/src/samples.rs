//! Planar Sample Buffer
//!
//! `Samples` owns one contiguous region and exposes it per channel, both as
//! `f64` planes and as raw byte planes over the same memory.
//!
//! # Layout
//!
//! ```text
//! bytes: | slot 0: capacity * width | slot 1: capacity * width | ...
//! ```
//!
//! Float views are only handed out while the format's bits are the internal
//! `f64le`; at any other width the bytes must go through a conversion pass
//! first. Each plane exposes `len()` samples (the requested size); `capacity`
//! is what is allocated.
//!
//! Per-call faults are returned and also kept as a sticky `last_error` that a
//! caller can inspect after a whole pass.

use std::time::Duration;

use crate::audio::{Channel, ChannelIndex, ChannelRoute, Format};
use crate::convert;
use crate::error::{SamplesError, SamplesResult};

pub struct Samples {
    // f64 backing keeps the float view aligned; bytes come from bytemuck
    storage: Vec<f64>,
    capacity: usize,
    requested: usize,
    delivered: usize,
    format: Format,
    index: ChannelIndex,
    last_error: Option<SamplesError>,
}

impl Samples {
    /// Buffer for `samples` samples per channel
    ///
    /// An invalid format yields an empty buffer with `InvalidFormat` recorded.
    pub fn new(samples: usize, format: Format) -> Self {
        let mut s = Self {
            storage: Vec::new(),
            capacity: 0,
            requested: 0,
            delivered: 0,
            format,
            index: format.channel_index(),
            last_error: None,
        };
        if !format.is_valid() {
            s.last_error = Some(SamplesError::InvalidFormat(format));
            return s;
        }
        s.storage = vec![0.0; format.layout.count() * samples];
        s.capacity = samples;
        s.requested = samples;
        s
    }

    /// Buffer covering `duration` at the format's rate
    pub fn with_duration(duration: Duration, format: Format) -> Self {
        Self::new(format.rate.samples_for(duration), format)
    }

    /// Buffer holding interleaved PCM `bytes` in `format`, fully delivered
    pub fn from_interleaved(format: Format, bytes: &[u8]) -> Self {
        let frames = if format.size() == 0 { 0 } else { bytes.len() / format.size() };
        let mut s = Self::new(frames, format);
        // Trailing partial frame is left behind and reported
        if s.last_error.is_none() {
            let _ = s.write_interleaved(&bytes[..frames * format.size()], 0);
            if bytes.len() % format.size() != 0 {
                s.last_error = Some(SamplesError::ShortSource {
                    needed: (frames + 1) * format.size(),
                    got: bytes.len(),
                });
            }
        }
        s
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn channel_index(&self) -> &ChannelIndex {
        &self.index
    }

    pub fn channels(&self) -> usize {
        self.format.layout.count()
    }

    /// How many of `roles` this buffer carries
    pub fn channels_count_of(&self, roles: &[Channel]) -> usize {
        roles.iter().filter(|&&ch| self.index.slot(ch).is_some()).count()
    }

    /// Requested samples per channel
    pub fn len(&self) -> usize {
        self.requested
    }

    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }

    /// Allocated samples per channel
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples per channel produced by the last writer
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Clamped to `len()`
    pub fn set_delivered(&mut self, n: usize) {
        self.delivered = n.min(self.requested);
    }

    pub fn last_error(&self) -> Option<&SamplesError> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<SamplesError> {
        self.last_error.take()
    }

    pub fn record_error(&mut self, err: SamplesError) {
        self.last_error = Some(err);
    }

    fn fail<T>(&mut self, err: SamplesError) -> SamplesResult<T> {
        self.last_error = Some(err.clone());
        Err(err)
    }

    /// Request `samples` per channel
    ///
    /// Growing reallocates and keeps every plane's content at its indices.
    /// Shrinking only truncates the visible length.
    pub fn resize(&mut self, samples: usize) {
        if samples > self.capacity {
            self.grow(samples);
        }
        self.requested = samples;
        self.delivered = self.delivered.min(samples);
    }

    /// Request the sample count covering `duration` at the current rate
    pub fn resize_for_duration(&mut self, duration: Duration) {
        self.resize(self.format.rate.samples_for(duration));
    }

    fn grow(&mut self, capacity: usize) {
        let width = self.format.bits.size();
        let channels = self.channels();
        let mut storage = vec![0.0f64; channels * capacity];
        {
            let old: &[u8] = bytemuck::cast_slice(&self.storage);
            let new: &mut [u8] = bytemuck::cast_slice_mut(&mut storage);
            let old_plane = self.capacity * width;
            let new_plane = capacity * width;
            for slot in 0..channels {
                new[slot * new_plane..slot * new_plane + old_plane]
                    .copy_from_slice(&old[slot * old_plane..(slot + 1) * old_plane]);
            }
        }
        self.storage = storage;
        self.capacity = capacity;
    }

    /// Switch format, refusing invalid ones
    ///
    /// Content is not converted; use [`Samples::convert_bits`] for that.
    pub fn set_format(&mut self, format: Format) -> SamplesResult<()> {
        if !format.is_valid() {
            return self.fail(SamplesError::InvalidFormat(format));
        }
        if format == self.format {
            return Ok(());
        }
        let needed = format.layout.count() * self.capacity;
        if needed > self.storage.len() {
            self.storage.resize(needed, 0.0);
        }
        if format.layout != self.format.layout {
            self.index = format.channel_index();
        }
        self.format = format;
        Ok(())
    }

    /// Re-encode every plane in place to `bits`
    pub fn convert_bits(&mut self, bits: crate::audio::Bits) -> SamplesResult<()> {
        let from = self.format.bits;
        if from == bits {
            return Ok(());
        }
        let elements = self.channels() * self.capacity;
        let result = convert::convert_region(bytemuck::cast_slice_mut(&mut self.storage), elements, from, bits);
        match result {
            Ok(()) => {
                self.format.bits = bits;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    fn float_ready(&self) -> bool {
        self.format.is_internal()
    }

    /// Float plane of `slot`, `None` at a foreign width
    pub fn plane(&self, slot: usize) -> Option<&[f64]> {
        if !self.float_ready() || slot >= self.channels() {
            return None;
        }
        let start = slot * self.capacity;
        Some(&self.storage[start..start + self.requested])
    }

    pub fn plane_mut(&mut self, slot: usize) -> Option<&mut [f64]> {
        if !self.float_ready() || slot >= self.channels() {
            return None;
        }
        let start = slot * self.capacity;
        Some(&mut self.storage[start..start + self.requested])
    }

    /// Float plane carrying `channel`
    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        self.index.slot(channel).and_then(|slot| self.plane(slot))
    }

    pub fn channel_mut(&mut self, channel: Channel) -> Option<&mut [f64]> {
        let slot = self.index.slot(channel)?;
        self.plane_mut(slot)
    }

    /// All float planes in slot order
    pub fn planes(&self) -> SamplesResult<impl Iterator<Item = &[f64]>> {
        if !self.float_ready() {
            return Err(SamplesError::NotFloat(self.format.bits));
        }
        let len = self.requested;
        Ok(self
            .storage
            .chunks(self.capacity.max(1))
            .take(self.channels())
            .map(move |plane| &plane[..len]))
    }

    pub fn planes_mut(&mut self) -> SamplesResult<impl Iterator<Item = &mut [f64]>> {
        if !self.float_ready() {
            let err = SamplesError::NotFloat(self.format.bits);
            return self.fail(err);
        }
        let len = self.requested;
        let channels = self.channels();
        Ok(self
            .storage
            .chunks_mut(self.capacity.max(1))
            .take(channels)
            .map(move |plane| &mut plane[..len]))
    }

    /// Raw bytes of `slot` at the current width
    pub fn raw_plane(&self, slot: usize) -> Option<&[u8]> {
        if slot >= self.channels() {
            return None;
        }
        let width = self.format.bits.size();
        let start = slot * self.capacity * width;
        let bytes: &[u8] = bytemuck::cast_slice(&self.storage);
        Some(&bytes[start..start + self.requested * width])
    }

    pub fn raw_plane_mut(&mut self, slot: usize) -> Option<&mut [u8]> {
        if slot >= self.channels() {
            return None;
        }
        let width = self.format.bits.size();
        let start = slot * self.capacity * width;
        let len = self.requested * width;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        Some(&mut bytes[start..start + len])
    }

    /// Zero every plane
    pub fn silence(&mut self) {
        self.silence_from(0);
    }

    /// Zero every plane from sample `from` on
    pub fn silence_from(&mut self, from: usize) {
        let width = self.format.bits.size();
        let fill = convert::silence_byte(self.format.bits);
        let plane = self.capacity * width;
        let channels = self.channels();
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        for slot in 0..channels {
            let start = slot * plane + (from * width).min(plane);
            bytes[start..(slot + 1) * plane].fill(fill);
        }
    }

    /// Deinterleave PCM frames at the current width into samples `offset..`
    ///
    /// Nothing is copied when the frames do not fit.
    pub fn write_interleaved(&mut self, src: &[u8], offset: usize) -> SamplesResult<usize> {
        let frame = self.format.size();
        if frame == 0 {
            return self.fail(SamplesError::InvalidFormat(self.format));
        }
        if src.len() % frame != 0 {
            let needed = (src.len() / frame + 1) * frame;
            return self.fail(SamplesError::ShortSource {
                needed,
                got: src.len(),
            });
        }
        let frames = src.len() / frame;
        if offset + frames > self.capacity {
            return self.fail(SamplesError::CapacityExceeded {
                needed: offset + frames,
                available: self.capacity,
            });
        }
        if offset + frames > self.requested {
            self.requested = offset + frames;
        }

        let width = self.format.bits.size();
        let plane = self.capacity * width;
        let channels = self.channels();
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        for (i, frame_bytes) in src.chunks_exact(frame).enumerate() {
            for (slot, sample) in frame_bytes.chunks_exact(width).enumerate().take(channels) {
                let at = slot * plane + (offset + i) * width;
                bytes[at..at + width].copy_from_slice(sample);
            }
        }
        self.delivered = offset + frames;
        Ok(frames)
    }

    /// Interleave `count` samples starting at `offset` into `dst`
    pub fn read_interleaved(&mut self, dst: &mut [u8], offset: usize, count: usize) -> SamplesResult<usize> {
        let frame = self.format.size();
        if offset + count > self.delivered {
            return self.fail(SamplesError::ShortSource {
                needed: (offset + count) * frame,
                got: self.delivered * frame,
            });
        }
        if dst.len() < count * frame {
            return self.fail(SamplesError::ShortDestination {
                needed: count * frame,
                got: dst.len(),
            });
        }

        let width = self.format.bits.size();
        let plane = self.capacity * width;
        let bytes: &[u8] = bytemuck::cast_slice(&self.storage);
        for (i, out) in dst.chunks_exact_mut(frame).take(count).enumerate() {
            for (slot, sample) in out.chunks_exact_mut(width).enumerate() {
                let at = slot * plane + (offset + i) * width;
                sample.copy_from_slice(&bytes[at..at + width]);
            }
        }
        Ok(count)
    }

    /// Copy raw bytes at the current width into one plane from sample `offset`
    pub fn write_plane(&mut self, slot: usize, src: &[u8], offset: usize) -> SamplesResult<usize> {
        let width = self.format.bits.size();
        if slot >= self.channels() || width == 0 {
            return self.fail(SamplesError::InvalidFormat(self.format));
        }
        let count = src.len() / width;
        if offset + count > self.capacity {
            return self.fail(SamplesError::CapacityExceeded {
                needed: offset + count,
                available: self.capacity,
            });
        }
        let start = slot * self.capacity * width + offset * width;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        bytes[start..start + count * width].copy_from_slice(&src[..count * width]);
        Ok(count)
    }

    fn mix_count(&self, src: &Samples, dst_offset: usize, src_offset: usize) -> usize {
        src.delivered
            .saturating_sub(src_offset)
            .min(self.requested.saturating_sub(dst_offset))
    }

    fn check_mixable(&mut self, src: &Samples) -> SamplesResult<()> {
        if !self.float_ready() {
            return self.fail(SamplesError::NotFloat(self.format.bits));
        }
        if !src.float_ready() {
            return self.fail(SamplesError::NotFloat(src.format.bits));
        }
        Ok(())
    }

    /// Add `src` into this buffer by channel role
    ///
    /// A role this buffer lacks is spread over every channel when `src` is
    /// mono, folded into the single channel when this buffer is mono, and
    /// dropped otherwise. Returns the samples per channel combined.
    pub fn mix_from(&mut self, src: &Samples, dst_offset: usize, src_offset: usize) -> SamplesResult<usize> {
        self.check_mixable(src)?;
        let count = self.mix_count(src, dst_offset, src_offset);
        if count == 0 {
            return Ok(0);
        }

        let src_channels = src.channels();
        let dst_channels = self.channels();
        for (src_slot, &channel) in src.index.channels().iter().enumerate() {
            let Some(input) = src.plane(src_slot) else { continue };
            let input = &input[src_offset..src_offset + count];

            if let Some(dst_slot) = self.index.slot(channel) {
                if let Some(out) = self.plane_mut(dst_slot) {
                    add_into(&mut out[dst_offset..dst_offset + count], input, 1.0);
                }
            } else if src_channels == 1 {
                for dst_slot in 0..dst_channels {
                    if let Some(out) = self.plane_mut(dst_slot) {
                        add_into(&mut out[dst_offset..dst_offset + count], input, 1.0);
                    }
                }
            } else if dst_channels == 1 {
                if let Some(out) = self.plane_mut(0) {
                    add_into(&mut out[dst_offset..dst_offset + count], input, 1.0 / src_channels as f64);
                }
            }
        }

        self.delivered = self.delivered.max(dst_offset + count);
        Ok(count)
    }

    /// Add `src` into this buffer along explicit routes
    ///
    /// Every route sums its source roles into its destination role; roles
    /// missing on either side are skipped.
    pub fn mix_routes(
        &mut self,
        src: &Samples,
        routes: &[ChannelRoute],
        dst_offset: usize,
        src_offset: usize,
    ) -> SamplesResult<usize> {
        self.check_mixable(src)?;
        let count = self.mix_count(src, dst_offset, src_offset);
        if count == 0 {
            return Ok(0);
        }

        for route in routes {
            let Some(dst_slot) = self.index.slot(route.to) else { continue };
            for &from in &route.from {
                let Some(input) = src.channel(from) else { continue };
                if let Some(out) = self.plane_mut(dst_slot) {
                    add_into(
                        &mut out[dst_offset..dst_offset + count],
                        &input[src_offset..src_offset + count],
                        1.0,
                    );
                }
            }
        }

        self.delivered = self.delivered.max(dst_offset + count);
        Ok(count)
    }
}

#[inline]
fn add_into(out: &mut [f64], input: &[f64], gain: f64) {
    for (o, i) in out.iter_mut().zip(input) {
        *o += i * gain;
    }
}

impl std::fmt::Debug for Samples {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Samples")
            .field("format", &self.format)
            .field("len", &self.requested)
            .field("capacity", &self.capacity)
            .field("delivered", &self.delivered)
            .field("last_error", &self.last_error)
            .finish()
    }
}
