pub mod engine;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use engine::FramePresenter;
pub use shader::create_present_pipeline;
pub use texture::FrameTexture;
pub use vertex::{letterboxed_quad, Vertex, VertexBuffer};
