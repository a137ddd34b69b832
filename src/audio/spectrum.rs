use glam::Vec4;

use super::fft::SpectrumAnalyzer;
use crate::config::{AccumulationMethod, ColorMode, FrequencyScale, InterpolationType, SpectrumConfig, WindowFunction};
use crate::render::{BlendMode, Canvas, Rect};

/// Turns one channel of an audio window into a spectrum and draws it.
///
/// Callers `load` a channel, then `render` it into a region; the returned
/// slice is the per-bar magnitude snapshot of that render and stays valid
/// until the next call.
pub trait SpectrumProbe {
    fn load(&mut self, window: &[f32], channel_count: usize, channel_index: usize, interleaved: bool);

    /// `primary` is set for the first channel of a frame.
    fn render(&mut self, target: &mut Canvas, region: Rect, primary: bool) -> &[f32];

    /// Horizontal gap the layout must leave between the two channel regions.
    fn channel_spacing(&self) -> u32;

    /// Called once after a frame is complete.
    fn end_frame(&mut self) {}
}

/// Bar-graph spectrum.
///
/// The primary channel is mirrored so both channels' low frequencies meet
/// at the divider between the regions.
pub struct BarSpectrum {
    config: SpectrumConfig,
    analyzer: SpectrumAnalyzer,
    input: Vec<f32>,
    bars: Vec<f32>,
    known: Vec<bool>,
    wheel_phase: f32,
}

impl BarSpectrum {
    pub fn new(config: SpectrumConfig) -> Self {
        let analyzer = SpectrumAnalyzer::new(config.fft_size, config.window_function);
        Self {
            config,
            analyzer,
            input: Vec::new(),
            bars: Vec::new(),
            known: Vec::new(),
            wheel_phase: 0.0,
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// All analyzer settings; changes apply on the next render.
    pub fn config_mut(&mut self) -> &mut SpectrumConfig {
        &mut self.config
    }

    pub fn set_bar_width(&mut self, width: u32) {
        self.config.bar_width = width.max(1);
    }

    pub fn set_bar_spacing(&mut self, spacing: u32) {
        self.config.bar_spacing = spacing;
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.config.color_mode = mode;
    }

    pub fn set_solid_color(&mut self, rgb: [u8; 3]) {
        self.config.solid_color = rgb;
    }

    pub fn set_color_wheel_rate(&mut self, rate: f32) {
        self.config.color_wheel.rate = rate;
    }

    pub fn set_color_wheel_hsv(&mut self, hsv: [f32; 3]) {
        self.config.color_wheel.hsv = hsv;
    }

    pub fn set_multiplier(&mut self, multiplier: f32) {
        self.config.multiplier = multiplier;
    }

    pub fn set_fft_size(&mut self, fft_size: usize) {
        self.config.fft_size = fft_size;
    }

    pub fn set_interp_type(&mut self, interpolation: InterpolationType) {
        self.config.interpolation = interpolation;
    }

    pub fn set_scale(&mut self, scale: FrequencyScale) {
        self.config.scale = scale;
    }

    pub fn set_nth_root(&mut self, nth_root: u32) {
        self.config.nth_root = nth_root.max(1);
    }

    pub fn set_accum_method(&mut self, method: AccumulationMethod) {
        self.config.accumulation = method;
    }

    pub fn set_window_func(&mut self, function: WindowFunction) {
        self.config.window_function = function;
    }

    /// Snapshot from the latest render.
    pub fn spectrum(&self) -> &[f32] {
        &self.bars
    }

    fn bar_count(&self, region: Rect) -> usize {
        let stride = (self.config.bar_width + self.config.bar_spacing) as i32;
        if region.width <= 0 || stride <= 0 {
            return 0;
        }
        ((region.width + self.config.bar_spacing as i32) / stride).max(0) as usize
    }

    fn compute_bars(&mut self, count: usize) {
        self.analyzer.configure(self.config.fft_size, self.config.window_function);
        let magnitudes = self.analyzer.analyze(&self.input);
        let bins = magnitudes.len();

        self.bars.clear();
        self.known.clear();
        if bins == 0 {
            self.bars.resize(count, 0.0);
            return;
        }

        let (scale, nth_root) = (self.config.scale, self.config.nth_root);
        let position = |t: f32| bin_position(scale, nth_root, t, bins);

        for i in 0..count {
            let start = (position(i as f32 / count as f32) as usize).min(bins - 1);
            let end = (position((i + 1) as f32 / count as f32) as usize).min(bins);

            if end > start {
                let range = &magnitudes[start..end];
                let value = match self.config.accumulation {
                    AccumulationMethod::Sum => range.iter().sum(),
                    AccumulationMethod::Max => range.iter().fold(0.0f32, |a, &b| a.max(b)),
                };
                self.bars.push(value * self.config.multiplier);
                self.known.push(true);
            } else if self.config.interpolation == InterpolationType::None {
                self.bars.push(magnitudes[start] * self.config.multiplier);
                self.known.push(true);
            } else {
                self.bars.push(0.0);
                self.known.push(false);
            }
        }

        interpolate_gaps(&mut self.bars, &self.known, self.config.interpolation);
    }

    fn bar_color(&self, index: usize, count: usize) -> Vec4 {
        let wheel = &self.config.color_wheel;
        let position = index as f32 / count.max(1) as f32;
        match self.config.color_mode {
            ColorMode::Solid => {
                let [r, g, b] = self.config.solid_color;
                Vec4::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
            }
            ColorMode::Wheel => {
                let hue = (wheel.hsv[0] + self.wheel_phase + position).fract();
                hsv_to_rgba(hue, wheel.hsv[1], wheel.hsv[2])
            }
            ColorMode::WheelRanges => {
                let hue = (wheel.hsv[0] + position * 0.25).fract();
                let pulse = 0.5 + 0.5 * (self.wheel_phase * std::f32::consts::TAU).sin();
                hsv_to_rgba(hue, wheel.hsv[1] * pulse, wheel.hsv[2])
            }
        }
    }
}

impl Default for BarSpectrum {
    fn default() -> Self {
        Self::new(SpectrumConfig::default())
    }
}

impl SpectrumProbe for BarSpectrum {
    fn load(&mut self, window: &[f32], channel_count: usize, channel_index: usize, interleaved: bool) {
        let channel_count = channel_count.max(1);
        self.input.clear();
        if interleaved {
            self.input
                .extend(window.iter().skip(channel_index).step_by(channel_count).copied());
        } else {
            let frames = window.len() / channel_count;
            let start = (channel_index * frames).min(window.len());
            let end = (start + frames).min(window.len());
            self.input.extend_from_slice(&window[start..end]);
        }
    }

    fn render(&mut self, target: &mut Canvas, region: Rect, primary: bool) -> &[f32] {
        let count = self.bar_count(region);
        self.compute_bars(count);

        let width = self.config.bar_width as i32;
        let stride = width + self.config.bar_spacing as i32;
        for (i, &value) in self.bars.iter().enumerate() {
            let height = (value.clamp(0.0, 1.0) * region.height as f32) as i32;
            if height == 0 {
                continue;
            }
            let offset = i as i32 * stride;
            let left = if primary {
                region.right() - width - offset
            } else {
                region.left + offset
            };
            let bar = Rect::new(left, region.bottom() - height, width, height);
            target.fill_rect(bar, self.bar_color(i, count), BlendMode::ALPHA);
        }

        &self.bars
    }

    fn channel_spacing(&self) -> u32 {
        self.config.bar_spacing
    }

    fn end_frame(&mut self) {
        self.wheel_phase = (self.wheel_phase + self.config.color_wheel.rate).fract();
    }
}

/// Fractional bin index where normalized position `t` (0..=1) starts.
fn bin_position(scale: FrequencyScale, nth_root: u32, t: f32, bins: usize) -> f32 {
    let bins = bins as f32;
    match scale {
        FrequencyScale::Linear => t * bins,
        // starts at bin 1, skipping DC
        FrequencyScale::Log => bins.powf(t),
        FrequencyScale::Nth => t.powi(nth_root.max(1) as i32) * bins,
    }
}

/// Fill bars that received no bin. Gaps before the first or after the last
/// known bar copy the nearest known value.
fn interpolate_gaps(values: &mut [f32], known: &[bool], method: InterpolationType) {
    let anchors: Vec<usize> = (0..values.len()).filter(|&i| known[i]).collect();
    let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
        return;
    };

    for i in 0..first {
        values[i] = values[first];
    }
    for i in last + 1..values.len() {
        values[i] = values[last];
    }

    for (k, pair) in anchors.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (ya, yb) = (values[a], values[b]);
        // neighbours outside the gap, for the spline tangents
        let y_prev = if k > 0 { values[anchors[k - 1]] } else { ya };
        let y_next = anchors.get(k + 2).map(|&j| values[j]).unwrap_or(yb);

        for i in a + 1..b {
            let t = (i - a) as f32 / (b - a) as f32;
            values[i] = match method {
                InterpolationType::Cspline => catmull_rom(y_prev, ya, yb, y_next, t).max(0.0),
                _ => ya + (yb - ya) * t,
            };
        }
    }
}

fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1 + (-p0 + p2) * t + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2 + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

fn hsv_to_rgba(h: f32, s: f32, v: f32) -> Vec4 {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - (h6 % 2.0 - 1.0).abs());
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    Vec4::new(r + m, g + m, b + m, 1.0)
}
