use log::{debug, info, warn};
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, StandardTagKey, Tag};
use symphonia::core::probe::Hint;

use super::CHANNELS;
use crate::error::{Result, VizError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl TrackMetadata {
    fn absorb(&mut self, tags: &[Tag]) {
        for tag in tags {
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) if self.title.is_none() => {
                    self.title = Some(tag.value.to_string());
                }
                Some(StandardTagKey::Artist) if self.artist.is_none() => {
                    self.artist = Some(tag.value.to_string());
                }
                _ => {}
            }
        }
    }
}

/// Interleaved `f32` samples of a whole file.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub metadata: TrackMetadata,
}

/// Decode the whole file up front. Anything but stereo is rejected before a
/// single sample is read. Tags are best effort; a file without readable tags
/// decodes with empty metadata.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| VizError::resource("audio", path, e))?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| VizError::resource("audio", path, e))?;

    let sample_rate = source.sample_rate();
    let channels = source.channels();
    if channels as usize != CHANNELS {
        return Err(VizError::UnsupportedChannels(channels));
    }
    let samples: Vec<f32> = source.convert_samples().collect();

    let metadata = match read_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Could not read tags from {:?}: {}", path, e);
            TrackMetadata::default()
        }
    };

    info!(
        "Decoded {:?}: {} Hz, {} channels, {} samples",
        path,
        sample_rate,
        channels,
        samples.len()
    );
    debug!("Track metadata: {:?}", metadata);

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        metadata,
    })
}

fn read_metadata(path: &Path) -> std::result::Result<TrackMetadata, symphonia::core::errors::Error> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut metadata = TrackMetadata::default();
    // container-level tags (e.g. ID3) come first, then format-level ones
    if let Some(probed_meta) = probed.metadata.get() {
        if let Some(revision) = probed_meta.current() {
            metadata.absorb(revision.tags());
        }
    }
    let format_meta = probed.format.metadata();
    if let Some(revision) = format_meta.current() {
        metadata.absorb(revision.tags());
    }
    Ok(metadata)
}
