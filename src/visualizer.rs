use log::{debug, info};
use std::path::Path;

use crate::audio::{
    decode_file, AudioWindowStore, BarSpectrum, DecodedAudio, FrameClock, PlaybackDevice, PlaybackFeeder,
    SpectrumProbe, TrackMetadata,
};
use crate::config::VisualizerConfig;
use crate::error::Result;
use crate::motion::MotionSignalDeriver;
use crate::render::{Canvas, LayerCompositor, Overlay, ParticleFeed, ParticleSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// A full frame of audio remains.
    Ready,
    /// Held inside `draw_frame` between the playback write and the analysis
    /// check. It is always replaced before the call returns, so
    /// [`Visualizer::state`] never reports it.
    DrainingPlaybackOnly,
    /// No more frames; every further call returns `false`.
    Exhausted,
}

/// Drives one output frame per call: feeds the audio window to playback,
/// draws the spectrum, particles and overlay, then advances the cursor.
pub struct Visualizer<S: SpectrumProbe = BarSpectrum, P: ParticleFeed = ParticleSystem> {
    store: AudioWindowStore,
    clock: FrameClock,
    spectrum: S,
    particles: P,
    motion: MotionSignalDeriver,
    layers: LayerCompositor,
    feeder: PlaybackFeeder,
    metadata: TrackMetadata,
    state: FrameState,
    frames_rendered: u64,
}

impl Visualizer {
    /// Decode `audio_path`, load the overlay font and cover, and the optional
    /// background. Any of these failing, or non-stereo audio, is fatal.
    pub fn new<P: AsRef<Path>>(config: &VisualizerConfig, audio_path: P) -> Result<Self> {
        let audio = decode_file(audio_path)?;
        let overlay = Overlay::load(&config.overlay, &audio.metadata)?;
        let particles = ParticleSystem::new(config.width, config.height, config.particle_count);
        let spectrum = BarSpectrum::new(config.spectrum.clone());

        let mut visualizer = Self::from_parts(config, audio, overlay, spectrum, particles)?;
        if let Some(background) = &config.background {
            visualizer.set_background(background)?;
        }
        Ok(visualizer)
    }
}

impl<S: SpectrumProbe, P: ParticleFeed> Visualizer<S, P> {
    /// Build from already loaded parts. `config.background` is not read here;
    /// call [`Visualizer::set_background`] for that.
    pub fn from_parts(config: &VisualizerConfig, audio: DecodedAudio, overlay: Overlay, spectrum: S, particles: P) -> Result<Self> {
        let metadata = audio.metadata.clone();
        let store = AudioWindowStore::new(audio)?;
        let clock = FrameClock::new(store.sample_rate(), config.frame_rate)?;
        let layers = LayerCompositor::new(config.width, config.height, config.margin, config.blur.clone(), overlay);

        info!(
            "Visualizer ready: {}x{} at {} fps, {} samples per frame, {:.1}s of audio",
            config.width,
            config.height,
            clock.frame_rate(),
            clock.samples_per_frame(),
            store.duration().as_secs_f32()
        );

        Ok(Self {
            store,
            clock,
            spectrum,
            particles,
            motion: MotionSignalDeriver::new(config.height),
            layers,
            feeder: PlaybackFeeder::new(),
            metadata,
            state: FrameState::Ready,
            frames_rendered: 0,
        })
    }

    /// Produce the next frame into `target`, writing the same audio window to
    /// `playback` when given.
    ///
    /// Returns `Ok(false)` once the audio is exhausted; from then on every
    /// call returns `Ok(false)`. A `target` whose size differs from the
    /// configured size is an error and nothing is drawn or played.
    pub fn draw_frame(&mut self, target: &mut Canvas, playback: Option<&mut dyn PlaybackDevice>) -> Result<bool> {
        self.layers.check_target(target)?;
        if self.state == FrameState::Exhausted {
            return Ok(false);
        }

        let spf = self.clock.samples_per_frame();
        if !self.store.has_playable_window(spf) {
            self.finish("playable");
            return Ok(false);
        }

        if let Some(device) = playback {
            self.feeder.write(device, self.store.window(spf), spf)?;
        }
        self.state = FrameState::DrainingPlaybackOnly;

        // the cursor stays put if this fails
        if !self.store.has_analyzable_window(spf) {
            self.finish("analyzable");
            return Ok(false);
        }

        let window = self.store.window(spf);
        let layout = self.layers.layout(self.spectrum.channel_spacing())?;

        self.layers.begin_frame();
        let [left, right] = self
            .layers
            .draw_spectrum(&mut self.spectrum, window, &layout, MotionSignalDeriver::channel_speed);
        let speed_avg = MotionSignalDeriver::speed_avg(left, right);
        let bias = self.motion.velocity_bias(speed_avg);
        self.layers.draw_particles(&mut self.particles, bias);
        self.layers.composite(target, &mut self.spectrum, window, &layout)?;
        self.spectrum.end_frame();

        self.store.advance(spf)?;
        self.state = FrameState::Ready;
        self.frames_rendered += 1;

        if self.frames_rendered % 600 == 1 {
            debug!(
                "frame {}: cursor {}/{}, speed {:.4}, bias {:.2}, underflows {}",
                self.frames_rendered,
                self.store.cursor(),
                self.store.len(),
                speed_avg,
                bias.y,
                self.feeder.underflows()
            );
        }
        Ok(true)
    }

    fn finish(&mut self, gate: &str) {
        self.state = FrameState::Exhausted;
        info!(
            "Audio exhausted after {} frames ({} window unavailable at cursor {}/{})",
            self.frames_rendered,
            gate,
            self.store.cursor(),
            self.store.len()
        );
    }

    /// Takes effect on the next frame. Rejected rates keep the old one.
    pub fn set_frame_rate(&mut self, fps: u32) -> Result<()> {
        self.clock.set_frame_rate(fps)
    }

    pub fn set_background<Q: AsRef<Path>>(&mut self, path: Q) -> Result<()> {
        self.layers.load_background(path)
    }

    pub fn spectrum(&self) -> &S {
        &self.spectrum
    }

    pub fn spectrum_mut(&mut self) -> &mut S {
        &mut self.spectrum
    }

    pub fn particles_mut(&mut self) -> &mut P {
        &mut self.particles
    }

    pub fn size(&self) -> (u32, u32) {
        self.layers.size()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn samples_per_frame(&self) -> usize {
        self.clock.samples_per_frame()
    }

    pub fn sample_rate(&self) -> u32 {
        self.store.sample_rate()
    }

    pub fn cursor(&self) -> usize {
        self.store.cursor()
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    /// Fraction of the audio consumed, 0.0-1.0.
    pub fn progress(&self) -> f32 {
        if self.store.is_empty() {
            return 1.0;
        }
        self.store.cursor() as f32 / self.store.len() as f32
    }
}
