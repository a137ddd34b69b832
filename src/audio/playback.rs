use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::error::{Result, VizError};

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The device ran dry between writes; the audio it played was silence.
    #[error("output underflowed")]
    Underflow,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream is no longer accepting samples")]
    Disconnected,
}

/// A live output that accepts interleaved samples and may block until it
/// has room for them.
pub trait PlaybackDevice {
    fn write(&mut self, interleaved: &[f32], frames: usize) -> std::result::Result<(), PlaybackError>;
}

/// Forwards frame windows to the device. Underflow is reported and
/// tolerated; anything else is fatal for the session.
#[derive(Debug, Default)]
pub struct PlaybackFeeder {
    underflows: u64,
}

impl PlaybackFeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, device: &mut dyn PlaybackDevice, window: &[f32], frames: usize) -> Result<()> {
        match device.write(window, frames) {
            Ok(()) => Ok(()),
            Err(PlaybackError::Underflow) => {
                self.underflows += 1;
                warn!("output underflowed ({} so far)", self.underflows);
                Ok(())
            }
            Err(e) => Err(VizError::Playback(e)),
        }
    }

    pub fn underflows(&self) -> u64 {
        self.underflows
    }
}

/// Default output device fed through a bounded queue of frame windows.
///
/// `write` blocks once `queue_depth` windows are waiting, which keeps the
/// render loop in step with the sound card.
pub struct CpalPlayback {
    #[allow(dead_code)]
    stream: Stream,
    sender: Sender<Vec<f32>>,
    underflowed: Arc<AtomicBool>,
    device_error: Arc<Mutex<Option<String>>>,
}

impl CpalPlayback {
    pub fn new(sample_rate: u32, channels: u16, queue_depth: usize) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No output device available"))?;

        info!("Using audio device: {}", device.name().unwrap_or_else(|_| "Unknown".to_string()));

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        info!("Creating output stream with {} channels at {} Hz", channels, sample_rate);

        let (sender, receiver) = crossbeam_channel::bounded(queue_depth.max(1));
        let underflowed = Arc::new(AtomicBool::new(false));
        let device_error = Arc::new(Mutex::new(None));

        let stream = Self::create_output_stream(&device, &config, receiver, underflowed.clone(), device_error.clone())?;
        stream.play()?;

        Ok(Self {
            stream,
            sender,
            underflowed,
            device_error,
        })
    }

    fn create_output_stream(
        device: &cpal::Device,
        config: &StreamConfig,
        receiver: Receiver<Vec<f32>>,
        underflowed: Arc<AtomicBool>,
        device_error: Arc<Mutex<Option<String>>>,
    ) -> anyhow::Result<Stream> {
        let mut pending: Vec<f32> = Vec::new();
        let mut offset = 0usize;
        let mut started = false;

        let stream = device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut filled = 0;
                while filled < data.len() {
                    if offset >= pending.len() {
                        match receiver.try_recv() {
                            Ok(next) => {
                                pending = next;
                                offset = 0;
                                started = true;
                                continue;
                            }
                            Err(_) => {
                                // underrun: zero the rest
                                data[filled..].fill(0.0);
                                if started {
                                    underflowed.store(true, Ordering::Relaxed);
                                }
                                return;
                            }
                        }
                    }
                    let n = (pending.len() - offset).min(data.len() - filled);
                    data[filled..filled + n].copy_from_slice(&pending[offset..offset + n]);
                    offset += n;
                    filled += n;
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
                if let Ok(mut slot) = device_error.lock() {
                    *slot = Some(err.to_string());
                }
            },
            None,
        )?;

        Ok(stream)
    }
}

impl PlaybackDevice for CpalPlayback {
    fn write(&mut self, interleaved: &[f32], _frames: usize) -> std::result::Result<(), PlaybackError> {
        if let Some(err) = self.device_error.lock().ok().and_then(|mut slot| slot.take()) {
            return Err(PlaybackError::Device(err));
        }

        // blocks while the queue is full
        self.sender
            .send(interleaved.to_vec())
            .map_err(|_| PlaybackError::Disconnected)?;

        if self.underflowed.swap(false, Ordering::Relaxed) {
            return Err(PlaybackError::Underflow);
        }
        Ok(())
    }
}
