use crate::error::{Result, VizError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

/// Left and right channel regions of the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StereoLayout {
    pub left: Rect,
    pub right: Rect,
}

impl StereoLayout {
    /// Split the frame into two halves inset by `margin`, separated by exactly
    /// `spacing` pixels. Fractional edges truncate toward zero.
    pub fn compute(width: u32, height: u32, margin: u32, spacing: u32) -> Result<Self> {
        let (w, h, m, s) = (width as f32, height as f32, margin as f32, spacing as f32);

        let half_width = ((w - 2.0 * m) / 2.0 - s / 2.0) as i32;
        let region_height = (h - 2.0 * m) as i32;

        let left = Rect::new(margin as i32, margin as i32, half_width, region_height);
        let right = Rect::new((w / 2.0 + s / 2.0) as i32, margin as i32, half_width, region_height);

        let gap = right.left - left.right();
        if gap != spacing as i32 {
            return Err(VizError::Layout {
                gap,
                spacing: spacing as i32,
            });
        }

        Ok(Self { left, right })
    }
}
