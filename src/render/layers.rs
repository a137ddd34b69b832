use glam::Vec2;
use log::info;
use std::path::Path;

use super::{BlendMode, Canvas, Overlay, ParticleFeed, StereoLayout, BLACK, TRANSPARENT};
use crate::audio::{SpectrumProbe, CHANNELS};
use crate::config::{BlurConfig, BlurKernel};
use crate::error::{Result, VizError};

/// Owns the offscreen layers and composites them onto the caller's target.
///
/// All five layers have the configured output size and are reused from frame
/// to frame. The background is prepared once; the other four are cleared and
/// redrawn on every frame.
pub struct LayerCompositor {
    size: (u32, u32),
    margin: u32,
    blur: BlurConfig,
    background: Canvas,
    spectrum: Canvas,
    spectrum_blurred: Canvas,
    particles: Canvas,
    particles_blurred: Canvas,
    /// Reduced-size working copy for the spectrum and particle blurs.
    reduced: Canvas,
    overlay: Overlay,
}

impl LayerCompositor {
    pub fn new(width: u32, height: u32, margin: u32, blur: BlurConfig, overlay: Overlay) -> Self {
        Self {
            size: (width, height),
            margin,
            blur,
            background: Canvas::filled(width, height, BLACK),
            spectrum: Canvas::new(width, height),
            spectrum_blurred: Canvas::new(width, height),
            particles: Canvas::new(width, height),
            particles_blurred: Canvas::new(width, height),
            reduced: Canvas::new(0, 0),
            overlay,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn background(&self) -> &Canvas {
        &self.background
    }

    pub fn load_background<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let image = Canvas::open(path, "background")?;
        info!("Loaded background {:?} ({}x{})", path, image.width(), image.height());
        self.set_background(&image);
        Ok(())
    }

    /// Scale `image` to cover the whole frame, centered, then blur and dim it.
    pub fn set_background(&mut self, image: &Canvas) {
        let (w, h) = (self.size.0 as f32, self.size.1 as f32);
        let (iw, ih) = (image.width().max(1) as f32, image.height().max(1) as f32);
        let scale = (w / iw).max(h / ih);
        let position = Vec2::new((w - iw * scale) / 2.0, (h - ih * scale) / 2.0);

        self.background.clear(BLACK);
        self.background
            .draw_scaled(image, position, Vec2::splat(scale), BlendMode::NONE);
        self.background.blur(self.blur.background);
        self.background.multiply(self.blur.background_dim);
    }

    pub fn check_target(&self, target: &Canvas) -> Result<()> {
        if target.size() != self.size {
            return Err(VizError::TargetSizeMismatch {
                expected: self.size,
                actual: target.size(),
            });
        }
        Ok(())
    }

    /// Channel regions for the current frame size, margin and `spacing`.
    pub fn layout(&self, spacing: u32) -> Result<StereoLayout> {
        StereoLayout::compute(self.size.0, self.size.1, self.margin, spacing)
    }

    pub fn begin_frame(&mut self) {
        self.spectrum.clear(TRANSPARENT);
        self.particles.clear(TRANSPARENT);
    }

    /// Render both channels into the spectrum layer. `reduce` turns each
    /// channel's snapshot into a scalar while it is still borrowed.
    pub fn draw_spectrum<S, F>(&mut self, probe: &mut S, window: &[f32], layout: &StereoLayout, mut reduce: F) -> [f32; CHANNELS]
    where
        S: SpectrumProbe + ?Sized,
        F: FnMut(&[f32]) -> f32,
    {
        let mut out = [0.0; CHANNELS];
        for (channel, region) in [layout.left, layout.right].into_iter().enumerate() {
            probe.load(window, CHANNELS, channel, true);
            out[channel] = reduce(probe.render(&mut self.spectrum, region, channel == 0));
        }
        out
    }

    pub fn draw_particles<P: ParticleFeed + ?Sized>(&mut self, feed: &mut P, velocity_bias: Vec2) {
        feed.draw(&mut self.particles, velocity_bias);
    }

    /// Blur the frame's layers and draw everything onto `target`, finishing
    /// with a crisp redraw of the spectrum and the overlay.
    pub fn composite<S: SpectrumProbe + ?Sized>(
        &mut self,
        target: &mut Canvas,
        probe: &mut S,
        window: &[f32],
        layout: &StereoLayout,
    ) -> Result<()> {
        self.check_target(target)?;

        let factor = self.blur.downsample;
        refresh_blurred(&mut self.spectrum_blurred, &mut self.reduced, &self.spectrum, self.blur.spectrum, factor)?;
        refresh_blurred(&mut self.particles_blurred, &mut self.reduced, &self.particles, self.blur.particles, factor)?;

        target.draw_canvas(&self.background, BlendMode::NONE)?;
        target.draw_canvas(&self.particles_blurred, BlendMode::ADD)?;
        target.draw_canvas(&self.particles, BlendMode::ADD)?;
        target.draw_canvas(&self.spectrum_blurred, BlendMode::INVERT)?;

        // bars straight onto the target so their edges blend with the frame
        // rather than with the layer's transparency
        for (channel, region) in [layout.left, layout.right].into_iter().enumerate() {
            probe.load(window, CHANNELS, channel, true);
            probe.render(target, region, channel == 0);
        }

        self.overlay.draw(target);
        Ok(())
    }
}

/// Redraw `blurred` as a blurred copy of `original`. With `factor > 1` the
/// blur runs on a shrunken copy in `reduced` and is scaled back up.
fn refresh_blurred(
    blurred: &mut Canvas,
    reduced: &mut Canvas,
    original: &Canvas,
    kernel: BlurKernel,
    factor: u32,
) -> Result<()> {
    if factor <= 1 || kernel.is_noop() {
        blurred.clear(TRANSPARENT);
        blurred.draw_canvas(original, BlendMode::ALPHA)?;
        blurred.blur(kernel);
        return Ok(());
    }
    original.downsample_into(reduced, factor, BlendMode::ALPHA);
    reduced.blur(kernel.reduced(factor));
    blurred.upsample_from(reduced, factor);
    Ok(())
}
