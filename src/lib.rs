//! Audio-reactive frame renderer.
//!
//! A [`Visualizer`] walks through a decoded stereo track one video frame at
//! a time. Each call to [`Visualizer::draw_frame`] hands the frame's audio to
//! the playback device, draws a mirrored spectrum and a particle field that
//! rises with the bass, and composites them with the background and overlay
//! into the caller's [`Canvas`].

pub mod audio;
pub mod config;
pub mod error;
pub mod graphics;
pub mod motion;
pub mod render;
pub mod visualizer;

pub use audio::{BarSpectrum, PlaybackDevice, SpectrumProbe};
pub use config::VisualizerConfig;
pub use error::{Result, VizError};
pub use motion::MotionSignalDeriver;
pub use render::{Canvas, ParticleFeed, ParticleSystem};
pub use visualizer::{FrameState, Visualizer};
