use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use glam::{Vec2, Vec4};
use log::info;
use std::fs;
use std::path::Path;

use super::{BlendMode, Canvas};
use crate::audio::TrackMetadata;
use crate::config::OverlayConfig;
use crate::error::{Result, VizError};

pub struct CoverArt {
    image: Canvas,
    position: Vec2,
    scale: Vec2,
}

impl CoverArt {
    /// Place `image` at `position`, stretched to exactly `size`.
    pub fn new(image: Canvas, position: Vec2, size: Vec2) -> Self {
        let scale = size / Vec2::new(image.width().max(1) as f32, image.height().max(1) as f32);
        Self { image, position, scale }
    }
}

pub struct TextLabel {
    pub text: String,
    pub position: Vec2,
    pub size: f32,
    pub color: Vec4,
}

/// Static cover art plus title/artist text drawn last, on top of the
/// composited frame.
#[derive(Default)]
pub struct Overlay {
    font: Option<FontVec>,
    cover: Option<CoverArt>,
    labels: Vec<TextLabel>,
}

pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontVec> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| VizError::resource("font", path, e))?;
    FontVec::try_from_vec(bytes).map_err(|e| VizError::resource("font", path, e))
}

impl Overlay {
    /// Load the font and cover image named by `config`; either failing is fatal.
    pub fn load(config: &OverlayConfig, metadata: &TrackMetadata) -> Result<Self> {
        let font = load_font(&config.font)?;
        let cover_image = Canvas::open(&config.cover, "album cover")?;
        info!("Loaded font {:?} and cover {:?}", config.font, config.cover);

        let cover_position = Vec2::from(config.cover_position);
        let cover_size = Vec2::from(config.cover_size);
        let cover = CoverArt::new(cover_image, cover_position, cover_size);

        let text_color = Vec4::new(
            config.text_color[0] as f32,
            config.text_color[1] as f32,
            config.text_color[2] as f32,
            config.text_color[3] as f32,
        ) / 255.0;
        let text_origin = Vec2::new(cover_position.x + cover_size.x + 10.0, cover_position.y);

        let mut labels = Vec::new();
        if let Some(title) = &metadata.title {
            labels.push(TextLabel {
                text: title.clone(),
                position: text_origin,
                size: config.title_size,
                color: text_color,
            });
        }
        if let Some(artist) = &metadata.artist {
            labels.push(TextLabel {
                text: artist.clone(),
                position: text_origin + Vec2::new(0.0, config.title_size + 10.0),
                size: config.artist_size,
                color: text_color,
            });
        }

        Ok(Self {
            font: Some(font),
            cover: Some(cover),
            labels,
        })
    }

    pub fn with_cover(mut self, cover: CoverArt) -> Self {
        self.cover = Some(cover);
        self
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Cover first, copied as is including its alpha, then text.
    pub fn draw(&self, target: &mut Canvas) {
        if let Some(cover) = &self.cover {
            target.draw_scaled(&cover.image, cover.position, cover.scale, BlendMode::NONE);
        }
        if let Some(font) = &self.font {
            for label in &self.labels {
                draw_text(target, font, label);
            }
        }
    }
}

fn draw_text(target: &mut Canvas, font: &FontVec, label: &TextLabel) {
    let scale = PxScale::from(label.size);
    let scaled = font.as_scaled(scale);
    let mut caret = point(label.position.x, label.position.y + scaled.ascent());
    let mut previous = None;

    for ch in label.text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = previous {
            caret.x += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, caret);
        caret.x += scaled.h_advance(id);
        previous = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let color = label.color * Vec4::new(1.0, 1.0, 1.0, coverage);
                target.blend_pixel(
                    bounds.min.x as i32 + gx as i32,
                    bounds.min.y as i32 + gy as i32,
                    color,
                    BlendMode::ALPHA,
                );
            });
        }
    }
}
