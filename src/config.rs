use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level visualizer settings.
///
/// Every field has a default, so a config file only needs to name the values
/// it changes:
///
/// ```json
/// { "width": 1280, "height": 720, "spectrum": { "bar_width": 6 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    /// Distance between the frame edge and the spectrum regions, in pixels.
    pub margin: u32,
    pub particle_count: usize,
    pub background: Option<PathBuf>,
    pub spectrum: SpectrumConfig,
    pub blur: BlurConfig,
    pub overlay: OverlayConfig,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 60,
            margin: 10,
            particle_count: 50,
            background: None,
            spectrum: SpectrumConfig::default(),
            blur: BlurConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl VisualizerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Solid,
    /// Hue sweeps across the bars and rotates every frame.
    Wheel,
    /// Like `Wheel`, but each bar keeps its hue band and only the saturation pulses.
    WheelRanges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationType {
    None,
    Linear,
    Cspline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyScale {
    Linear,
    Log,
    Nth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccumulationMethod {
    Sum,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowFunction {
    None,
    Hanning,
    Hamming,
    Blackman,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorWheel {
    /// Hue advance per frame, in turns.
    pub rate: f32,
    /// Starting hue, saturation and value, each 0.0-1.0.
    pub hsv: [f32; 3],
}

impl Default for ColorWheel {
    fn default() -> Self {
        Self {
            rate: 0.005,
            hsv: [0.9, 0.7, 1.0],
        }
    }
}

/// Spectrum analyzer and bar renderer settings. Each field is independent
/// and is picked up on the next rendered frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub bar_width: u32,
    pub bar_spacing: u32,
    pub color_mode: ColorMode,
    pub solid_color: [u8; 3],
    pub color_wheel: ColorWheel,
    pub multiplier: f32,
    pub fft_size: usize,
    pub interpolation: InterpolationType,
    pub scale: FrequencyScale,
    pub nth_root: u32,
    pub accumulation: AccumulationMethod,
    pub window_function: WindowFunction,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            bar_width: 10,
            bar_spacing: 5,
            color_mode: ColorMode::Wheel,
            solid_color: [255, 255, 255],
            color_wheel: ColorWheel::default(),
            multiplier: 4.0,
            fft_size: 3000,
            interpolation: InterpolationType::Cspline,
            scale: FrequencyScale::Log,
            nth_root: 2,
            accumulation: AccumulationMethod::Max,
            window_function: WindowFunction::Blackman,
        }
    }
}

/// Directional blur parameters: horizontal radius, vertical radius, passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurKernel {
    pub h_radius: u32,
    pub v_radius: u32,
    pub passes: u32,
}

impl BlurKernel {
    pub const fn new(h_radius: u32, v_radius: u32, passes: u32) -> Self {
        Self { h_radius, v_radius, passes }
    }

    pub fn is_noop(&self) -> bool {
        self.passes == 0 || (self.h_radius == 0 && self.v_radius == 0)
    }

    /// Kernel with about the same spread on a canvas shrunk by `factor`.
    /// Variance grows linearly with passes and with the square of the scale,
    /// so the radii stay and the pass count is divided by `factor²`.
    pub fn reduced(&self, factor: u32) -> Self {
        if self.is_noop() {
            return *self;
        }
        let area = factor.max(1).pow(2);
        Self {
            passes: self.passes.div_ceil(area).max(1),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    pub spectrum: BlurKernel,
    pub particles: BlurKernel,
    pub background: BlurKernel,
    /// Brightness multiplier applied to the background after blurring.
    pub background_dim: f32,
    /// The spectrum and particle layers are blurred at `1 / downsample` of
    /// the frame size, then scaled back up. 1 blurs at full size.
    pub downsample: u32,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            spectrum: BlurKernel::new(1, 1, 15),
            particles: BlurKernel::new(1, 1, 10),
            background: BlurKernel::new(10, 10, 10),
            background_dim: 0.5,
            downsample: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub font: PathBuf,
    pub cover: PathBuf,
    pub cover_position: [f32; 2],
    pub cover_size: [f32; 2],
    pub title_size: f32,
    pub artist_size: f32,
    pub text_color: [u8; 4],
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font: PathBuf::from("/usr/share/fonts/TTF/Iosevka-Regular.ttc"),
            cover: PathBuf::from("images/cover.jpg"),
            cover_position: [30.0, 30.0],
            cover_size: [150.0, 150.0],
            title_size: 32.0,
            artist_size: 24.0,
            text_color: [255, 255, 255, 150],
        }
    }
}
