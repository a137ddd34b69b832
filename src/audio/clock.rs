use crate::error::{Result, VizError};

/// Converts the output frame rate into a whole number of audio frames
/// (one sample per channel) consumed per video frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    sample_rate: u32,
    frame_rate: u32,
    samples_per_frame: usize,
}

impl FrameClock {
    pub const DEFAULT_FRAME_RATE: u32 = 60;

    pub fn new(sample_rate: u32, frame_rate: u32) -> Result<Self> {
        let mut clock = Self {
            sample_rate,
            frame_rate: 0,
            samples_per_frame: 0,
        };
        clock.set_frame_rate(frame_rate)?;
        Ok(clock)
    }

    /// Recompute samples-per-frame with integer division, so 44100 Hz at
    /// 60 fps gives 735 and fractional rates truncate. A rate that would give
    /// zero samples per frame is rejected and the previous value kept.
    pub fn set_frame_rate(&mut self, fps: u32) -> Result<()> {
        if fps == 0 || fps > self.sample_rate {
            return Err(VizError::InvalidFrameRate {
                fps,
                sample_rate: self.sample_rate,
            });
        }
        self.frame_rate = fps;
        self.samples_per_frame = (self.sample_rate / fps) as usize;
        Ok(())
    }

    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_audio_at_sixty_fps() {
        let clock = FrameClock::new(44100, 60).unwrap();
        assert_eq!(clock.samples_per_frame(), 735);
    }

    #[test]
    fn fractional_rates_truncate() {
        let clock = FrameClock::new(44100, 23).unwrap();
        assert_eq!(clock.samples_per_frame(), 1917);
    }

    #[test]
    fn changing_rate_replaces_previous_value() {
        let mut clock = FrameClock::new(48000, 60).unwrap();
        clock.set_frame_rate(30).unwrap();
        assert_eq!(clock.samples_per_frame(), 1600);
        assert_eq!(clock.frame_rate(), 30);
    }

    #[test]
    fn zero_rate_is_rejected_and_keeps_old_value() {
        let mut clock = FrameClock::new(48000, 60).unwrap();
        assert!(matches!(clock.set_frame_rate(0), Err(VizError::InvalidFrameRate { .. })));
        assert_eq!(clock.samples_per_frame(), 800);
        assert!(clock.set_frame_rate(96000).is_err());
    }
}
