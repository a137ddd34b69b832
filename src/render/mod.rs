pub mod blend;
pub mod canvas;
pub mod layers;
pub mod layout;
pub mod overlay;
pub mod particles;

pub use blend::{BlendMode, Equation, Factor};
pub use canvas::{Canvas, BLACK, TRANSPARENT};
pub use layers::LayerCompositor;
pub use layout::{Rect, StereoLayout};
pub use overlay::{load_font, CoverArt, Overlay, TextLabel};
pub use particles::{ParticleFeed, ParticleSystem};
