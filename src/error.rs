use std::path::PathBuf;
use thiserror::Error;

use crate::audio::PlaybackError;

pub type Result<T, E = VizError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("failed to load {what} '{}': {reason}", path.display())]
    Resource {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("only stereo audio is supported (source has {0} channels)")]
    UnsupportedChannels(u16),

    #[error("frame rate {fps} is not usable with a {sample_rate} Hz source")]
    InvalidFrameRate { fps: u32, sample_rate: u32 },

    #[error("target size {actual:?} must match the configured size {expected:?}")]
    TargetSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("layout gap {gap} does not match bar spacing {spacing}")]
    Layout { gap: i32, spacing: i32 },

    #[error("cursor would move past the end of the audio buffer ({cursor} + {step} > {len})")]
    CursorOverrun { cursor: usize, step: usize, len: usize },

    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VizError {
    pub(crate) fn resource(what: &'static str, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        VizError::Resource {
            what,
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
