use glam::Vec2;

/// Exponent applied to the loudness-scaled height; keeps quiet passages
/// moving while stopping loud ones from launching particles off screen.
const BIAS_EXPONENT: f32 = 1.0 / 2.666_666_7;

/// Reduces each channel's spectrum snapshot to a bass "speed" and turns the
/// average of the two into the particle velocity bias.
#[derive(Debug, Clone, Copy)]
pub struct MotionSignalDeriver {
    output_height: u32,
}

impl MotionSignalDeriver {
    pub fn new(output_height: u32) -> Self {
        Self { output_height }
    }

    /// Mean of the lowest quarter of the snapshot, or 0 when that quarter is
    /// empty (fewer than four values).
    pub fn channel_speed(spectrum: &[f32]) -> f32 {
        let low = &spectrum[..spectrum.len() / 4];
        if low.is_empty() {
            return 0.0;
        }
        low.iter().sum::<f32>() / low.len() as f32
    }

    pub fn speed_avg(left: f32, right: f32) -> f32 {
        (left + right) / 2.0
    }

    /// Upward bias, so the y component is never positive.
    pub fn velocity_bias(&self, speed_avg: f32) -> Vec2 {
        let magnitude = (self.output_height as f32 * speed_avg.max(0.0)).powf(BIAS_EXPONENT);
        Vec2::new(0.0, -magnitude)
    }
}
