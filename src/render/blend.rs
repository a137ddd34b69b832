use glam::Vec4;

/// Weight applied to a source or destination value before the equation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend rule used when drawing onto a canvas. Color (rgb) and alpha carry
/// separate factor/equation triples, mirroring fixed-function GPU blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendMode {
    pub color_src: Factor,
    pub color_dst: Factor,
    pub color_eq: Equation,
    pub alpha_src: Factor,
    pub alpha_dst: Factor,
    pub alpha_eq: Equation,
}

impl BlendMode {
    /// Standard "over" compositing.
    pub const ALPHA: BlendMode = BlendMode {
        color_src: Factor::SrcAlpha,
        color_dst: Factor::OneMinusSrcAlpha,
        color_eq: Equation::Add,
        alpha_src: Factor::One,
        alpha_dst: Factor::OneMinusSrcAlpha,
        alpha_eq: Equation::Add,
    };

    pub const ADD: BlendMode = BlendMode {
        color_src: Factor::SrcAlpha,
        color_dst: Factor::One,
        color_eq: Equation::Add,
        alpha_src: Factor::One,
        alpha_dst: Factor::One,
        alpha_eq: Equation::Add,
    };

    pub const MULTIPLY: BlendMode = BlendMode {
        color_src: Factor::DstColor,
        color_dst: Factor::Zero,
        color_eq: Equation::Add,
        alpha_src: Factor::DstColor,
        alpha_dst: Factor::Zero,
        alpha_eq: Equation::Add,
    };

    /// Overwrites the destination.
    pub const NONE: BlendMode = BlendMode {
        color_src: Factor::One,
        color_dst: Factor::Zero,
        color_eq: Equation::Add,
        alpha_src: Factor::One,
        alpha_dst: Factor::Zero,
        alpha_eq: Equation::Add,
    };

    /// `dst * dst.a - src * src.a`: subtracts the source from whatever is
    /// already drawn, which reads as a color inversion under bright layers.
    pub const INVERT: BlendMode = BlendMode::uniform(Factor::SrcAlpha, Factor::DstAlpha, Equation::ReverseSubtract);

    /// Same triple for color and alpha.
    pub const fn uniform(src: Factor, dst: Factor, eq: Equation) -> Self {
        Self {
            color_src: src,
            color_dst: dst,
            color_eq: eq,
            alpha_src: src,
            alpha_dst: dst,
            alpha_eq: eq,
        }
    }

    /// Blend straight (non-premultiplied) `src` over `dst`, clamped to 0..=1.
    pub fn apply(&self, src: Vec4, dst: Vec4) -> Vec4 {
        let color_sf = factor(self.color_src, src, dst);
        let color_df = factor(self.color_dst, src, dst);
        let alpha_sf = factor(self.alpha_src, src, dst).w;
        let alpha_df = factor(self.alpha_dst, src, dst).w;

        let rgb = equation(self.color_eq, src * color_sf, dst * color_df, src, dst);
        let a = equation(
            self.alpha_eq,
            Vec4::splat(src.w * alpha_sf),
            Vec4::splat(dst.w * alpha_df),
            Vec4::splat(src.w),
            Vec4::splat(dst.w),
        )
        .w;

        Vec4::new(rgb.x, rgb.y, rgb.z, a).clamp(Vec4::ZERO, Vec4::ONE)
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::ALPHA
    }
}

fn factor(f: Factor, src: Vec4, dst: Vec4) -> Vec4 {
    match f {
        Factor::Zero => Vec4::ZERO,
        Factor::One => Vec4::ONE,
        Factor::SrcColor => src,
        Factor::OneMinusSrcColor => Vec4::ONE - src,
        Factor::DstColor => dst,
        Factor::OneMinusDstColor => Vec4::ONE - dst,
        Factor::SrcAlpha => Vec4::splat(src.w),
        Factor::OneMinusSrcAlpha => Vec4::splat(1.0 - src.w),
        Factor::DstAlpha => Vec4::splat(dst.w),
        Factor::OneMinusDstAlpha => Vec4::splat(1.0 - dst.w),
    }
}

// Min and max ignore the factors, as GPUs do.
fn equation(eq: Equation, weighted_src: Vec4, weighted_dst: Vec4, src: Vec4, dst: Vec4) -> Vec4 {
    match eq {
        Equation::Add => weighted_src + weighted_dst,
        Equation::Subtract => weighted_src - weighted_dst,
        Equation::ReverseSubtract => weighted_dst - weighted_src,
        Equation::Min => src.min(dst),
        Equation::Max => src.max(dst),
    }
}
