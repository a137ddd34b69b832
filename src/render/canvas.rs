use glam::{Vec2, Vec4};
use image::{DynamicImage, RgbaImage};
use rayon::prelude::*;
use std::path::Path;

use super::{BlendMode, Rect};
use crate::config::BlurKernel;
use crate::error::{Result, VizError};

pub const TRANSPARENT: Vec4 = Vec4::ZERO;
pub const BLACK: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// CPU render surface holding straight (non-premultiplied) RGBA in 0.0-1.0.
///
/// Layers, the caller's output target and loaded images all use this type,
/// so every draw goes through the same blend arithmetic.
#[derive(Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Vec4>,
    scratch: Vec<Vec4>,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    pub fn filled(width: u32, height: u32, color: Vec4) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
            scratch: Vec::new(),
        }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let pixels = rgba
            .pixels()
            .map(|p| Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0)
            .collect();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels,
            scratch: Vec::new(),
        }
    }

    /// Load an image file; `what` names the resource in the error.
    pub fn open<P: AsRef<Path>>(path: P, what: &'static str) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| VizError::resource(what, path, e))?;
        Ok(Self::from_image(&image))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[self.index(x, y)]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn clear(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    /// Change the dimensions, leaving the contents unspecified.
    fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width as usize * height as usize, TRANSPARENT);
    }

    /// Blend one pixel; coordinates outside the canvas are ignored.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Vec4, blend: BlendMode) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = self.index(x as u32, y as u32);
        self.pixels[idx] = blend.apply(color, self.pixels[idx]);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Vec4, blend: BlendMode) {
        let x0 = rect.left.max(0);
        let y0 = rect.top.max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend_pixel(x, y, color, blend);
            }
        }
    }

    /// Antialiased disc; edge pixels get fractional coverage in alpha.
    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4, blend: BlendMode) {
        if radius <= 0.0 {
            return;
        }
        let x0 = (center.x - radius - 1.0).floor() as i32;
        let x1 = (center.x + radius + 1.0).ceil() as i32;
        let y0 = (center.y - radius - 1.0).floor() as i32;
        let y1 = (center.y + radius + 1.0).ceil() as i32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color * Vec4::new(1.0, 1.0, 1.0, coverage), blend);
                }
            }
        }
    }

    /// Draw a same-sized canvas at the origin, pixel for pixel.
    pub fn draw_canvas(&mut self, src: &Canvas, blend: BlendMode) -> Result<()> {
        if src.size() != self.size() {
            return Err(VizError::TargetSizeMismatch {
                expected: self.size(),
                actual: src.size(),
            });
        }
        self.pixels
            .par_iter_mut()
            .zip(src.pixels.par_iter())
            .for_each(|(dst, &s)| *dst = blend.apply(s, *dst));
        Ok(())
    }

    /// Draw `src` scaled and placed with its top-left corner at `position`,
    /// bilinearly sampled.
    pub fn draw_scaled(&mut self, src: &Canvas, position: Vec2, scale: Vec2, blend: BlendMode) {
        if src.width == 0 || src.height == 0 || scale.x <= 0.0 || scale.y <= 0.0 {
            return;
        }
        let extent = Vec2::new(src.width as f32, src.height as f32) * scale;
        let x0 = position.x.floor().max(0.0) as i32;
        let y0 = position.y.floor().max(0.0) as i32;
        let x1 = ((position.x + extent.x).ceil() as i32).min(self.width as i32);
        let y1 = ((position.y + extent.y).ceil() as i32).min(self.height as i32);
        for y in y0..y1 {
            for x in x0..x1 {
                let local = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - position) / scale;
                if local.x < 0.0 || local.y < 0.0 || local.x >= src.width as f32 || local.y >= src.height as f32 {
                    continue;
                }
                let color = src.sample(local);
                self.blend_pixel(x, y, color, blend);
            }
        }
    }

    fn sample(&self, at: Vec2) -> Vec4 {
        self.sample_with(at, |p| p)
    }

    fn sample_with(&self, at: Vec2, map: fn(Vec4) -> Vec4) -> Vec4 {
        let fx = (at.x - 0.5).max(0.0);
        let fy = (at.y - 0.5).max(0.0);
        let x0 = (fx as u32).min(self.width - 1);
        let y0 = (fy as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;
        let top = map(self.pixel(x0, y0)).lerp(map(self.pixel(x1, y0)), tx);
        let bottom = map(self.pixel(x0, y1)).lerp(map(self.pixel(x1, y1)), tx);
        top.lerp(bottom, ty)
    }

    /// Iterated box blur: every pass runs a horizontal then a vertical window.
    /// Works in premultiplied space so transparent pixels do not darken edges.
    ///
    /// The two directions are separable, so all horizontal passes run first,
    /// then the canvas is transposed and the vertical passes run along rows.
    pub fn blur(&mut self, kernel: BlurKernel) {
        if kernel.is_noop() || self.pixels.is_empty() {
            return;
        }
        let (w, h) = (self.width as usize, self.height as usize);
        self.pixels.par_iter_mut().for_each(|p| *p = premultiply(*p));

        if kernel.h_radius > 0 {
            blur_rows(&mut self.pixels, w, kernel.h_radius as usize, kernel.passes);
        }
        if kernel.v_radius > 0 {
            self.scratch.resize(self.pixels.len(), Vec4::ZERO);
            transpose(&self.pixels, &mut self.scratch, w, h);
            blur_rows(&mut self.scratch, h, kernel.v_radius as usize, kernel.passes);
            transpose(&self.scratch, &mut self.pixels, h, w);
        }

        self.pixels.par_iter_mut().for_each(|p| *p = unpremultiply(*p));
    }

    /// Shrink into `dst` by averaging `factor` x `factor` blocks; `dst` is
    /// reshaped to fit, with partial blocks at the right and bottom edges.
    /// Each pixel is first drawn with `blend` onto transparency, as
    /// [`Canvas::draw_canvas`] onto a cleared canvas would.
    pub fn downsample_into(&self, dst: &mut Canvas, factor: u32, blend: BlendMode) {
        let factor = factor.max(1);
        dst.reshape(self.width.div_ceil(factor), self.height.div_ceil(factor));
        if dst.pixels.is_empty() {
            return;
        }
        let (w, h, f) = (self.width as usize, self.height as usize, factor as usize);
        let src = &self.pixels;
        dst.pixels
            .par_chunks_mut(dst.width as usize)
            .enumerate()
            .for_each(|(dy, row)| {
                let ys = dy * f..((dy + 1) * f).min(h);
                for (dx, out) in row.iter_mut().enumerate() {
                    let mut sum = Vec4::ZERO;
                    let mut count = 0usize;
                    for y in ys.clone() {
                        for x in dx * f..((dx + 1) * f).min(w) {
                            sum += premultiply(blend.apply(src[y * w + x], TRANSPARENT));
                            count += 1;
                        }
                    }
                    *out = unpremultiply(sum / count as f32);
                }
            });
    }

    /// Replace this canvas with `src` scaled up by `factor`, bilinearly
    /// sampled in premultiplied space.
    pub fn upsample_from(&mut self, src: &Canvas, factor: u32) {
        if src.width == 0 || src.height == 0 {
            self.clear(TRANSPARENT);
            return;
        }
        if self.pixels.is_empty() {
            return;
        }
        let f = factor.max(1) as f32;
        let w = self.width as usize;
        self.pixels.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let at = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) / f;
                *out = unpremultiply(src.sample_with(at, premultiply));
            }
        });
    }

    /// Scale rgb, leaving alpha alone.
    pub fn multiply(&mut self, factor: f32) {
        let scale = Vec4::new(factor, factor, factor, 1.0);
        self.pixels
            .par_iter_mut()
            .for_each(|p| *p = (*p * scale).clamp(Vec4::ZERO, Vec4::ONE));
    }

    /// 8-bit export. With `opaque` every pixel is written with full alpha,
    /// which is how a window presents the frame.
    pub fn to_rgba8(&self, opaque: bool) -> RgbaImage {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            let p = p.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
            bytes.extend_from_slice(&[
                p.x.round() as u8,
                p.y.round() as u8,
                p.z.round() as u8,
                if opaque { 255 } else { p.w.round() as u8 },
            ]);
        }
        // length matches width * height * 4 by construction
        RgbaImage::from_raw(self.width, self.height, bytes).unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

fn premultiply(p: Vec4) -> Vec4 {
    Vec4::new(p.x * p.w, p.y * p.w, p.z * p.w, p.w)
}

fn unpremultiply(p: Vec4) -> Vec4 {
    if p.w <= f32::EPSILON {
        TRANSPARENT
    } else {
        Vec4::new(p.x / p.w, p.y / p.w, p.z / p.w, p.w).clamp(Vec4::ZERO, Vec4::ONE)
    }
}

/// Run `passes` box passes of `radius` along every row of `len` samples.
fn blur_rows(pixels: &mut [Vec4], len: usize, radius: usize, passes: u32) {
    pixels
        .par_chunks_mut(len)
        .for_each_init(|| vec![Vec4::ZERO; len], |line, row| {
            for _ in 0..passes {
                box_line(row, line, radius);
                row.copy_from_slice(line);
            }
        });
}

/// `dst[x][y] = src[y][x]` for a `width` x `height` source.
fn transpose(src: &[Vec4], dst: &mut [Vec4], width: usize, height: usize) {
    dst.par_chunks_mut(height).enumerate().for_each(|(x, column)| {
        for (y, out) in column.iter_mut().enumerate() {
            *out = src[y * width + x];
        }
    });
}

/// Sliding-window mean over one line. The window is cut at the ends and the
/// mean taken over what remains.
fn box_line(src: &[Vec4], dst: &mut [Vec4], radius: usize) {
    let len = src.len();
    if len == 0 {
        return;
    }
    let mut sum = Vec4::ZERO;
    let mut count = 0usize;
    for &p in &src[..=radius.min(len - 1)] {
        sum += p;
        count += 1;
    }
    for i in 0..len {
        dst[i] = sum / count as f32;
        if i + radius + 1 < len {
            sum += src[i + radius + 1];
            count += 1;
        }
        if i >= radius {
            sum -= src[i - radius];
            count -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_keeps_uniform_canvas_uniform() {
        let color = Vec4::new(0.2, 0.4, 0.6, 1.0);
        let mut canvas = Canvas::filled(16, 9, color);
        canvas.blur(BlurKernel::new(2, 2, 3));
        for p in canvas.pixels() {
            assert!((*p - color).abs().max_element() < 1e-4);
        }
    }

    #[test]
    fn blur_spreads_a_point() {
        let mut canvas = Canvas::new(9, 9);
        canvas.blend_pixel(4, 4, Vec4::ONE, BlendMode::NONE);
        canvas.blur(BlurKernel::new(1, 1, 1));

        assert!(canvas.pixel(3, 4).w > 0.0);
        assert!(canvas.pixel(4, 3).w > 0.0);
        assert!(canvas.pixel(4, 4).w < 1.0);
        assert_eq!(canvas.pixel(0, 0).w, 0.0);
        // color survives the premultiplied round trip
        assert!((canvas.pixel(3, 4).x - 1.0).abs() < 1e-5);
    }

    /// Straightforward per-pass horizontal then vertical blur on
    /// premultiplied values.
    fn reference_blur(canvas: &Canvas, kernel: BlurKernel) -> Vec<Vec4> {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        let mut px: Vec<Vec4> = canvas.pixels().iter().map(|&p| premultiply(p)).collect();
        let window = |px: &Vec<Vec4>, x: i32, y: i32, dx: i32, dy: i32, r: i32| {
            let mut sum = Vec4::ZERO;
            let mut n = 0.0;
            for k in -r..=r {
                let (sx, sy) = (x + k * dx, y + k * dy);
                if sx >= 0 && sy >= 0 && sx < w && sy < h {
                    sum += px[(sy * w + sx) as usize];
                    n += 1.0;
                }
            }
            sum / n
        };
        for _ in 0..kernel.passes {
            for (dx, dy, r) in [(1, 0, kernel.h_radius as i32), (0, 1, kernel.v_radius as i32)] {
                if r == 0 {
                    continue;
                }
                let prev = px.clone();
                for y in 0..h {
                    for x in 0..w {
                        px[(y * w + x) as usize] = window(&prev, x, y, dx, dy, r);
                    }
                }
            }
        }
        px.into_iter().map(unpremultiply).collect()
    }

    #[test]
    fn blur_matches_interleaved_passes() {
        let mut canvas = Canvas::new(13, 7);
        canvas.fill_rect(Rect::new(3, 2, 4, 2), Vec4::new(1.0, 0.5, 0.0, 1.0), BlendMode::NONE);
        canvas.fill_rect(Rect::new(9, 0, 2, 7), Vec4::new(0.0, 0.0, 1.0, 0.5), BlendMode::NONE);
        let kernel = BlurKernel::new(2, 1, 3);
        let expected = reference_blur(&canvas, kernel);

        canvas.blur(kernel);
        for (got, want) in canvas.pixels().iter().zip(&expected) {
            assert!((*got - *want).abs().max_element() < 1e-4, "{got} != {want}");
        }
    }

    #[test]
    fn downsample_averages_blocks() {
        let mut canvas = Canvas::new(5, 3);
        canvas.fill_rect(Rect::new(0, 0, 1, 1), Vec4::ONE, BlendMode::NONE);
        canvas.fill_rect(Rect::new(4, 2, 1, 1), Vec4::new(1.0, 0.0, 0.0, 1.0), BlendMode::NONE);
        let mut small = Canvas::new(0, 0);
        canvas.downsample_into(&mut small, 2, BlendMode::NONE);

        assert_eq!(small.size(), (3, 2));
        // one opaque white pixel in a block of four
        assert!((small.pixel(0, 0) - Vec4::new(1.0, 1.0, 1.0, 0.25)).abs().max_element() < 1e-6);
        assert_eq!(small.pixel(1, 0), TRANSPARENT);
        // the corner block holds a single pixel
        assert_eq!(small.pixel(2, 1), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn down_and_up_keeps_uniform_color() {
        let color = Vec4::new(0.3, 0.6, 0.9, 0.8);
        let canvas = Canvas::filled(11, 6, color);
        let mut small = Canvas::new(0, 0);
        canvas.downsample_into(&mut small, 2, BlendMode::NONE);
        let mut restored = Canvas::new(11, 6);
        restored.upsample_from(&small, 2);

        for p in restored.pixels() {
            assert!((*p - color).abs().max_element() < 1e-5);
        }
    }

    #[test]
    fn multiply_darkens_rgb_only() {
        let mut canvas = Canvas::filled(2, 2, Vec4::new(0.8, 0.6, 0.4, 1.0));
        canvas.multiply(0.5);
        let p = canvas.pixel(1, 1);
        assert!((p - Vec4::new(0.4, 0.3, 0.2, 1.0)).abs().max_element() < 1e-6);
    }

    #[test]
    fn draw_canvas_rejects_other_sizes() {
        let mut target = Canvas::new(4, 4);
        assert!(matches!(
            target.draw_canvas(&Canvas::new(4, 5), BlendMode::ALPHA),
            Err(VizError::TargetSizeMismatch { .. })
        ));
    }

    #[test]
    fn fill_rect_clips_to_canvas() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Rect::new(2, 2, 10, 10), BLACK, BlendMode::NONE);
        assert_eq!(canvas.pixel(3, 3), BLACK);
        assert_eq!(canvas.pixel(1, 1), TRANSPARENT);
    }

    #[test]
    fn draw_scaled_covers_target_area() {
        let src = Canvas::filled(2, 2, BLACK);
        let mut target = Canvas::new(8, 8);
        target.draw_scaled(&src, Vec2::new(2.0, 2.0), Vec2::splat(2.0), BlendMode::ALPHA);
        assert_eq!(target.pixel(2, 2), BLACK);
        assert_eq!(target.pixel(5, 5), BLACK);
        assert_eq!(target.pixel(6, 6), TRANSPARENT);
        assert_eq!(target.pixel(1, 1), TRANSPARENT);
    }

    #[test]
    fn opaque_export_forces_alpha() {
        let canvas = Canvas::new(1, 1);
        assert_eq!(canvas.to_rgba8(true).get_pixel(0, 0)[3], 255);
        assert_eq!(canvas.to_rgba8(false).get_pixel(0, 0)[3], 0);
    }
}
