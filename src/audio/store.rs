use std::time::Duration;

use super::DecodedAudio;
use crate::error::{Result, VizError};

pub const CHANNELS: usize = 2;

/// Fully decoded interleaved stereo audio plus the read cursor.
///
/// The cursor counts interleaved samples, so one video frame moves it by
/// `CHANNELS * samples_per_frame`.
pub struct AudioWindowStore {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
}

impl AudioWindowStore {
    pub fn new(audio: DecodedAudio) -> Result<Self> {
        if audio.channels as usize != CHANNELS {
            return Err(VizError::UnsupportedChannels(audio.channels));
        }
        let mut samples = audio.samples;
        // drop a dangling half frame so the buffer stays channel aligned
        samples.truncate(samples.len() - samples.len() % CHANNELS);
        Ok(Self {
            samples,
            sample_rate: audio.sample_rate,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        CHANNELS
    }

    pub fn duration(&self) -> Duration {
        let frames = (self.samples.len() / CHANNELS) as f64;
        Duration::from_secs_f64(frames / self.sample_rate.max(1) as f64)
    }

    /// Interleaved samples left between the cursor and the end.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }

    /// Enough audio left to hand one full video frame to the playback device.
    pub fn has_playable_window(&self, spf: usize) -> bool {
        self.remaining() >= CHANNELS * spf
    }

    /// Enough audio left for the analyzer. This compares against `spf`
    /// without the channel factor and is deliberately checked on its own,
    /// separately from the playback check.
    pub fn has_analyzable_window(&self, spf: usize) -> bool {
        self.remaining() >= spf
    }

    /// The next `CHANNELS * spf` interleaved samples, clipped at the end.
    pub fn window(&self, spf: usize) -> &[f32] {
        let end = (self.cursor + CHANNELS * spf).min(self.samples.len());
        &self.samples[self.cursor..end]
    }

    pub fn advance(&mut self, spf: usize) -> Result<()> {
        let step = CHANNELS * spf;
        if self.cursor + step > self.samples.len() {
            return Err(VizError::CursorOverrun {
                cursor: self.cursor,
                step,
                len: self.samples.len(),
            });
        }
        self.cursor += step;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(frames: usize) -> DecodedAudio {
        DecodedAudio {
            samples: (0..frames * 2).map(|i| i as f32).collect(),
            sample_rate: 44100,
            channels: 2,
            metadata: Default::default(),
        }
    }

    #[test]
    fn rejects_mono_sources() {
        let audio = DecodedAudio {
            channels: 1,
            ..stereo(10)
        };
        assert!(matches!(AudioWindowStore::new(audio), Err(VizError::UnsupportedChannels(1))));
    }

    #[test]
    fn window_starts_at_cursor() {
        let mut store = AudioWindowStore::new(stereo(10)).unwrap();
        assert_eq!(store.window(2), &[0.0, 1.0, 2.0, 3.0]);
        store.advance(2).unwrap();
        assert_eq!(store.cursor(), 4);
        assert_eq!(store.window(2), &[4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn gates_use_different_granularity() {
        let mut store = AudioWindowStore::new(stereo(5)).unwrap();
        store.advance(3).unwrap();
        // 4 interleaved samples left
        assert_eq!(store.remaining(), 4);
        assert!(!store.has_playable_window(3));
        assert!(store.has_analyzable_window(3));
        assert!(store.has_playable_window(2));
    }

    #[test]
    fn advance_past_end_is_rejected() {
        let mut store = AudioWindowStore::new(stereo(4)).unwrap();
        store.advance(4).unwrap();
        assert_eq!(store.remaining(), 0);
        assert!(matches!(store.advance(1), Err(VizError::CursorOverrun { .. })));
        assert_eq!(store.cursor(), 8);
    }

    #[test]
    fn odd_sample_count_is_trimmed() {
        let mut audio = stereo(3);
        audio.samples.push(99.0);
        let store = AudioWindowStore::new(audio).unwrap();
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let store = AudioWindowStore::new(stereo(44100)).unwrap();
        assert_eq!(store.duration(), Duration::from_secs(1));
    }
}
