use audioviz::audio::{BarSpectrum, DecodedAudio, PlaybackDevice, PlaybackError};
use audioviz::render::{Canvas, Overlay, ParticleSystem};
use audioviz::{FrameState, Visualizer, VisualizerConfig, VizError};

/// Records every write and answers with a fixed result.
#[derive(Default)]
struct RecordingDevice {
    writes: Vec<(usize, usize)>,
    first_samples: Vec<f32>,
    fail_with: Option<fn() -> PlaybackError>,
}

impl PlaybackDevice for RecordingDevice {
    fn write(&mut self, interleaved: &[f32], frames: usize) -> Result<(), PlaybackError> {
        self.writes.push((interleaved.len(), frames));
        self.first_samples.push(interleaved.first().copied().unwrap_or_default());
        match self.fail_with {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }
}

fn small_config(fps: u32) -> VisualizerConfig {
    VisualizerConfig {
        width: 64,
        height: 36,
        frame_rate: fps,
        margin: 2,
        particle_count: 8,
        ..VisualizerConfig::default()
    }
}

fn stereo_tone(sample_rate: u32, interleaved_len: usize) -> DecodedAudio {
    let samples = (0..interleaved_len)
        .map(|i| {
            let frame = (i / 2) as f32;
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            sign * 0.5 * (2.0 * std::f32::consts::PI * 110.0 * frame / sample_rate as f32).sin()
        })
        .collect();
    DecodedAudio {
        samples,
        sample_rate,
        channels: 2,
        metadata: Default::default(),
    }
}

fn visualizer(config: &VisualizerConfig, audio: DecodedAudio) -> Visualizer {
    let particles = ParticleSystem::new(config.width, config.height, config.particle_count);
    let spectrum = BarSpectrum::new(config.spectrum.clone());
    Visualizer::from_parts(config, audio, Overlay::default(), spectrum, particles).unwrap()
}

fn frames_until_exhausted(viz: &mut Visualizer, canvas: &mut Canvas) -> u64 {
    let mut frames = 0;
    while viz.draw_frame(canvas, None).unwrap() {
        frames += 1;
    }
    frames
}

#[test]
fn one_frame_of_audio_yields_one_frame() {
    let config = small_config(60);
    let mut viz = visualizer(&config, stereo_tone(44100, 1470));
    let mut canvas = Canvas::new(64, 36);
    assert_eq!(viz.samples_per_frame(), 735);

    assert!(viz.draw_frame(&mut canvas, None).unwrap());
    assert_eq!(viz.cursor(), 1470);
    assert!(!viz.draw_frame(&mut canvas, None).unwrap());
    assert_eq!(viz.state(), FrameState::Exhausted);
    assert_eq!(viz.frames_rendered(), 1);
    assert_eq!(viz.progress(), 1.0);
}

#[test]
fn frame_count_matches_whole_windows() {
    // 1000 Hz at 10 fps: 100 samples per frame, 200 interleaved
    for len in [0usize, 198, 200, 398, 400, 1000, 1234, 2001] {
        let config = small_config(10);
        let mut viz = visualizer(&config, stereo_tone(1000, len));
        let mut canvas = Canvas::new(64, 36);

        let expected = ((len / 2 * 2) / 2 / 100) as u64;
        assert_eq!(frames_until_exhausted(&mut viz, &mut canvas), expected, "len {len}");
    }
}

#[test]
fn exhaustion_is_absorbing() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 500));
    let mut canvas = Canvas::new(64, 36);
    let mut device = RecordingDevice::default();

    assert_eq!(frames_until_exhausted(&mut viz, &mut canvas), 2);
    let cursor = viz.cursor();
    for _ in 0..5 {
        assert!(!viz.draw_frame(&mut canvas, Some(&mut device)).unwrap());
    }
    assert_eq!(viz.cursor(), cursor);
    assert_eq!(viz.state(), FrameState::Exhausted);
    assert!(device.writes.is_empty());
}

#[test]
fn playback_gets_each_window_in_order() {
    let config = small_config(10);
    let audio = stereo_tone(1000, 600);
    let expected_first: Vec<f32> = [0, 200, 400].iter().map(|&i| audio.samples[i]).collect();
    let mut viz = visualizer(&config, audio);
    let mut canvas = Canvas::new(64, 36);
    let mut device = RecordingDevice::default();

    while viz.draw_frame(&mut canvas, Some(&mut device)).unwrap() {}

    assert_eq!(device.writes, vec![(200, 100); 3]);
    assert_eq!(device.first_samples, expected_first);
}

#[test]
fn underflow_still_produces_a_frame() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 400));
    let mut canvas = Canvas::new(64, 36);
    let mut device = RecordingDevice {
        fail_with: Some(|| PlaybackError::Underflow),
        ..Default::default()
    };

    assert!(viz.draw_frame(&mut canvas, Some(&mut device)).unwrap());
    assert_eq!(viz.cursor(), 200);
    // the black background alone would leave every pixel opaque black
    assert!(canvas.pixels().iter().any(|p| p.x > 0.0 || p.y > 0.0 || p.z > 0.0));
}

#[test]
fn device_failure_is_fatal() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 400));
    let mut canvas = Canvas::new(64, 36);
    let mut device = RecordingDevice {
        fail_with: Some(|| PlaybackError::Device("unplugged".into())),
        ..Default::default()
    };

    let err = viz.draw_frame(&mut canvas, Some(&mut device)).unwrap_err();
    assert!(matches!(err, VizError::Playback(PlaybackError::Device(_))));
    assert_eq!(viz.cursor(), 0);
}

#[test]
fn wrong_target_size_fails_before_anything_happens() {
    let config = VisualizerConfig {
        particle_count: 0,
        ..VisualizerConfig::default()
    };
    assert_eq!(config.size(), (1920, 1080));
    let mut viz = visualizer(&config, stereo_tone(44100, 1470));
    let mut target = Canvas::new(1280, 720);
    let mut device = RecordingDevice::default();

    let err = viz.draw_frame(&mut target, Some(&mut device)).unwrap_err();
    assert!(matches!(
        err,
        VizError::TargetSizeMismatch {
            expected: (1920, 1080),
            actual: (1280, 720)
        }
    ));
    assert!(target.pixels().iter().all(|p| p.w == 0.0));
    assert!(device.writes.is_empty());
    assert_eq!(viz.cursor(), 0);
    assert_eq!(viz.state(), FrameState::Ready);
}

#[test]
fn larger_and_smaller_targets_are_rejected() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 400));
    for (w, h) in [(65, 36), (64, 37), (63, 36), (64, 35), (128, 72), (32, 18)] {
        let mut target = Canvas::new(w, h);
        let err = viz.draw_frame(&mut target, None).unwrap_err();
        assert!(matches!(err, VizError::TargetSizeMismatch { .. }), "{w}x{h}");
    }
    assert_eq!(viz.cursor(), 0);
}

#[test]
fn cursor_only_moves_forward() {
    let config = small_config(30);
    let audio = stereo_tone(1000, 3000);
    let len = audio.samples.len();
    let mut viz = visualizer(&config, audio);
    let mut canvas = Canvas::new(64, 36);

    let mut last = viz.cursor();
    while viz.draw_frame(&mut canvas, None).unwrap() {
        assert_eq!(viz.cursor(), last + 2 * viz.samples_per_frame());
        last = viz.cursor();
    }
    assert!(viz.cursor() <= len);
    assert_eq!(viz.cursor(), last);
}

#[test]
fn draining_state_is_never_visible_between_calls() {
    // 550 interleaved samples: two frames, then a short tail
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 550));
    let mut canvas = Canvas::new(64, 36);
    let mut device = RecordingDevice::default();

    let mut seen = vec![viz.state()];
    for _ in 0..4 {
        viz.draw_frame(&mut canvas, Some(&mut device)).unwrap();
        seen.push(viz.state());
    }
    assert_eq!(
        seen,
        vec![
            FrameState::Ready,
            FrameState::Ready,
            FrameState::Ready,
            FrameState::Exhausted,
            FrameState::Exhausted
        ]
    );
}

#[test]
fn frame_rate_changes_take_effect_next_frame() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 1000));
    let mut canvas = Canvas::new(64, 36);

    assert!(viz.draw_frame(&mut canvas, None).unwrap());
    viz.set_frame_rate(20).unwrap();
    assert!(viz.draw_frame(&mut canvas, None).unwrap());
    assert_eq!(viz.cursor(), 200 + 100);

    assert!(matches!(viz.set_frame_rate(0), Err(VizError::InvalidFrameRate { fps: 0, .. })));
    assert_eq!(viz.samples_per_frame(), 50);
}

#[test]
fn spectrum_settings_apply_to_the_next_frame() {
    let config = small_config(10);
    let mut viz = visualizer(&config, stereo_tone(1000, 1000));
    let mut canvas = Canvas::new(64, 36);

    viz.spectrum_mut().set_bar_spacing(9);
    viz.spectrum_mut().set_bar_width(3);
    assert!(viz.draw_frame(&mut canvas, None).unwrap());
    // 25 wide regions: (25 + 9) / (3 + 9) bars
    assert_eq!(viz.spectrum().spectrum().len(), 2);
}

#[test]
fn mono_audio_is_rejected() {
    let config = small_config(60);
    let audio = DecodedAudio {
        channels: 1,
        ..stereo_tone(44100, 1000)
    };
    let spectrum = BarSpectrum::new(config.spectrum.clone());
    let particles = ParticleSystem::new(64, 36, 1);
    let result = Visualizer::from_parts(&config, audio, Overlay::default(), spectrum, particles);
    assert!(matches!(result, Err(VizError::UnsupportedChannels(1))));
}

fn write_wav(name: &str, channels: u16, frames: usize) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("audioviz-driver-{}-{}.wav", name, std::process::id()));
    let spec = hound::WavSpec {
        channels,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..frames * channels as usize {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
    path
}

#[test]
fn missing_font_fails_construction() {
    let path = write_wav("font", 2, 800);
    let mut config = small_config(10);
    config.overlay.font = "/nonexistent/font.ttf".into();
    let result = Visualizer::new(&config, &path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(VizError::Resource { what: "font", .. })));
}

#[test]
fn mono_file_fails_before_overlay_is_loaded() {
    let path = write_wav("mono", 1, 800);
    // a missing font would be reported if decoding carried on
    let mut config = small_config(10);
    config.overlay.font = "/nonexistent/font.ttf".into();
    let result = Visualizer::new(&config, &path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(VizError::UnsupportedChannels(1))));
}
