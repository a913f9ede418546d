//! Player Element
//!
//! Plays short PCM clips (test tones, channel identification) on top of
//! whatever the pipeline already carries. Clips are decoded to the internal
//! width when queued and dropped once fully played.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::audio::{Bits, Channel, ChannelRoute, Format};
use crate::element::Element;
use crate::elements::resample::ResampleBackend;
use crate::error::{ElementError, ElementResult};
use crate::samples::Samples;

struct Clip {
    samples: Samples,
    position: usize,
    // Only this destination role, when set
    channel: Option<Channel>,
}

impl Clip {
    fn remaining(&self) -> usize {
        self.samples.delivered().saturating_sub(self.position)
    }
}

#[derive(Default)]
pub struct Player {
    clips: Mutex<VecDeque<Clip>>,
    backend: Mutex<Option<Box<dyn ResampleBackend>>>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend for clips at a rate other than the stream's
    pub fn with_backend(backend: Box<dyn ResampleBackend>) -> Self {
        Self {
            clips: Mutex::new(VecDeque::new()),
            backend: Mutex::new(Some(backend)),
        }
    }

    /// Queue interleaved PCM, mixed by channel role
    pub fn add_pcm(&self, format: Format, bytes: &[u8]) -> ElementResult<()> {
        self.queue(format, bytes, None)
    }

    /// Queue interleaved PCM played on `channel` only
    ///
    /// Every clip channel is summed into that one role.
    pub fn add_pcm_on(&self, channel: Channel, format: Format, bytes: &[u8]) -> ElementResult<()> {
        self.queue(format, bytes, Some(channel))
    }

    fn queue(&self, format: Format, bytes: &[u8], channel: Option<Channel>) -> ElementResult<()> {
        let mut samples = Samples::from_interleaved(format, bytes);
        if let Some(err) = samples.take_error() {
            return Err(err.into());
        }
        samples.convert_bits(Bits::INTERNAL)?;
        debug!(format = %format, samples = samples.delivered(), ?channel, "clip queued");
        self.clips.lock().push_back(Clip {
            samples,
            position: 0,
            channel,
        });
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        !self.clips.lock().is_empty()
    }

    /// Clips waiting or playing
    pub fn len(&self) -> usize {
        self.clips.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every clip
    pub fn stop(&self) {
        self.clips.lock().clear();
    }

    fn match_rate(&self, clip: &mut Clip, target: &Format) -> ElementResult<()> {
        let from = *clip.samples.format();
        if from.rate == target.rate {
            return Ok(());
        }
        let to = Format::internal(target.rate, from.layout);
        match self.backend.lock().as_mut() {
            Some(backend) => backend.convert(&from, &to, &mut clip.samples),
            None => Err(ElementError::NoBackend { from, to }),
        }
    }
}

impl Element for Player {
    fn name(&self) -> &str {
        "Player"
    }

    fn stream(&self, samples: &mut Samples) -> ElementResult<()> {
        let target = *samples.format();
        let mut clips = self.clips.lock();
        let mut result = Ok(());

        clips.retain_mut(|clip| {
            if clip.position == 0 {
                if let Err(err) = self.match_rate(clip, &target) {
                    warn!(error = %err, "clip dropped");
                    result = Err(err);
                    return false;
                }
            }
            let mixed = match clip.channel {
                None => samples.mix_from(&clip.samples, 0, clip.position),
                Some(channel) => {
                    let route = ChannelRoute::new(channel, clip.samples.channel_index().channels().to_vec());
                    samples.mix_routes(&clip.samples, &[route], 0, clip.position)
                }
            };
            match mixed {
                Ok(count) => {
                    clip.position += count;
                    clip.remaining() > 0
                }
                Err(err) => {
                    result = Err(err.into());
                    false
                }
            }
        });
        result
    }

    fn close(&self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ChannelLayout, Rate};

    fn s16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn mono_s16() -> Format {
        Format::new(Rate::R48000, Bits::S16, ChannelLayout::MONO)
    }

    fn out(len: usize) -> Samples {
        Samples::new(len, Format::default())
    }

    #[test]
    fn test_clip_plays_across_passes() {
        let player = Player::new();
        player.add_pcm(mono_s16(), &s16(&[16_384; 5])).unwrap();
        assert!(player.is_playing());

        let mut s = out(3);
        player.stream(&mut s).unwrap();
        // Mono spreads to both channels
        assert_eq!(s.plane(0).unwrap(), &[0.5, 0.5, 0.5]);
        assert_eq!(s.plane(1).unwrap(), &[0.5, 0.5, 0.5]);
        assert_eq!(s.delivered(), 3);
        assert_eq!(player.len(), 1);

        let mut s = out(3);
        player.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), &[0.5, 0.5, 0.0]);
        assert_eq!(s.delivered(), 2);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_on_one_channel() {
        let player = Player::new();
        player
            .add_pcm_on(Channel::FrontRight, mono_s16(), &s16(&[-16_384, -16_384]))
            .unwrap();
        let mut s = out(2);
        player.stream(&mut s).unwrap();
        assert_eq!(s.channel(Channel::FrontLeft).unwrap(), &[0.0, 0.0]);
        assert_eq!(s.channel(Channel::FrontRight).unwrap(), &[-0.5, -0.5]);
    }

    #[test]
    fn test_clips_sum() {
        let player = Player::new();
        player.add_pcm(mono_s16(), &s16(&[8_192; 2])).unwrap();
        player.add_pcm(mono_s16(), &s16(&[8_192; 4])).unwrap();
        let mut s = out(4);
        player.stream(&mut s).unwrap();
        assert_eq!(s.plane(0).unwrap(), &[0.5, 0.5, 0.25, 0.25]);
        assert_eq!(player.len(), 0);
    }

    #[test]
    fn test_partial_frame_rejected() {
        let player = Player::new();
        let err = player.add_pcm(mono_s16(), &[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ElementError::Samples(_)));
        assert!(player.is_empty());
    }

    #[test]
    fn test_foreign_rate_without_backend() {
        let player = Player::new();
        let format = Format::new(Rate::R44100, Bits::S16, ChannelLayout::MONO);
        player.add_pcm(format, &s16(&[1, 2])).unwrap();
        let mut s = out(2);
        assert!(matches!(player.stream(&mut s), Err(ElementError::NoBackend { .. })));
        assert!(!player.is_playing());
    }

    #[test]
    fn test_stop_and_close() {
        let player = Player::new();
        player.add_pcm(mono_s16(), &s16(&[1; 8])).unwrap();
        player.stop();
        assert!(player.is_empty());
        player.add_pcm(mono_s16(), &s16(&[1; 8])).unwrap();
        player.close();
        assert!(player.is_empty());
    }
}
