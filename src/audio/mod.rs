pub mod clock;
pub mod decoder;
pub mod fft;
pub mod playback;
pub mod spectrum;
pub mod store;

pub use clock::FrameClock;
pub use decoder::{decode_file, DecodedAudio, TrackMetadata};
pub use fft::SpectrumAnalyzer;
pub use playback::{CpalPlayback, PlaybackDevice, PlaybackError, PlaybackFeeder};
pub use spectrum::{BarSpectrum, SpectrumProbe};
pub use store::{AudioWindowStore, CHANNELS};
