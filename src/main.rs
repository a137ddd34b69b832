use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use winit::{
    event::{ElementState, Event, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use audioviz::audio::{CpalPlayback, PlaybackDevice, CHANNELS};
use audioviz::graphics::FramePresenter;
use audioviz::{Canvas, Visualizer, VisualizerConfig};

#[derive(Parser)]
#[command(name = "audioviz")]
#[command(about = "Render an audio-reactive spectrum and particle visualization")]
struct Args {
    /// Stereo audio file (WAV, FLAC, MP3, M4A, OGG, ...)
    #[arg()]
    audio: PathBuf,

    /// JSON settings file; missing fields use defaults
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    fps: Option<u32>,

    /// Background image, blurred and dimmed behind everything else
    #[arg(long)]
    background: Option<PathBuf>,

    /// Album cover image
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Font for the title and artist text
    #[arg(long)]
    font: Option<PathBuf>,

    /// Do not open an audio output device
    #[arg(long)]
    no_audio: bool,

    /// Write frames as numbered PNGs into this directory instead of opening a window
    #[arg(long)]
    export: Option<PathBuf>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

impl Args {
    fn load_config(&self) -> Result<VisualizerConfig> {
        let mut config = match &self.config {
            Some(path) => VisualizerConfig::load(path).with_context(|| format!("reading config {:?}", path))?,
            None => VisualizerConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(fps) = self.fps {
            config.frame_rate = fps;
        }
        if let Some(background) = &self.background {
            config.background = Some(background.clone());
        }
        if let Some(cover) = &self.cover {
            config.overlay.cover = cover.clone();
        }
        if let Some(font) = &self.font {
            config.overlay.font = font.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.load_config()?;

    info!("Loading {:?}", args.audio);
    let mut visualizer = Visualizer::new(&config, &args.audio)?;

    let mut playback = if args.no_audio {
        None
    } else {
        match CpalPlayback::new(visualizer.sample_rate(), CHANNELS as u16, 3) {
            Ok(playback) => Some(playback),
            Err(e) => {
                warn!("Audio output unavailable, continuing silently: {}", e);
                None
            }
        }
    };

    match &args.export {
        Some(dir) => export_frames(&mut visualizer, playback.as_mut(), dir, args.max_frames),
        None => run_preview(visualizer, playback, args.max_frames),
    }
}

fn export_frames(
    visualizer: &mut Visualizer,
    mut playback: Option<&mut CpalPlayback>,
    dir: &Path,
    max_frames: Option<u64>,
) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let (width, height) = visualizer.size();
    let mut canvas = Canvas::new(width, height);

    let mut written = 0u64;
    while max_frames.map_or(true, |max| written < max) {
        let device = playback.as_deref_mut().map(|p| p as &mut dyn PlaybackDevice);
        if !visualizer.draw_frame(&mut canvas, device)? {
            break;
        }
        let path = dir.join(format!("frame_{:06}.png", written));
        canvas.to_rgba8(true).save(&path).with_context(|| format!("writing {:?}", path))?;
        written += 1;

        if written % 300 == 0 {
            info!("Exported {} frames ({:.0}%)", written, visualizer.progress() * 100.0);
        }
    }

    info!("Exported {} frames to {:?}", written, dir);
    Ok(())
}

fn run_preview(mut visualizer: Visualizer, mut playback: Option<CpalPlayback>, max_frames: Option<u64>) -> Result<()> {
    let (width, height) = visualizer.size();
    let title = match (&visualizer.metadata().artist, &visualizer.metadata().title) {
        (Some(artist), Some(title)) => format!("{} - {}", artist, title),
        (None, Some(title)) => title.clone(),
        _ => "audioviz".to_string(),
    };

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
            .build(&event_loop)?,
    );

    let mut presenter = pollster::block_on(FramePresenter::new(&window, (width, height)))?;
    let mut canvas = Canvas::new(width, height);
    info!("Preview window open");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) && event.state == ElementState::Pressed {
                    info!("Escape pressed");
                    elwt.exit();
                }
            }
            WindowEvent::Resized(physical_size) => {
                presenter.resize(physical_size);
            }
            WindowEvent::RedrawRequested => {
                if max_frames.is_some_and(|max| visualizer.frames_rendered() >= max) {
                    elwt.exit();
                    return;
                }
                let device = playback.as_mut().map(|p| p as &mut dyn PlaybackDevice);
                match visualizer.draw_frame(&mut canvas, device) {
                    Ok(true) => {
                        if let Err(e) = presenter.present(&canvas) {
                            error!("Present error: {}", e);
                        }
                    }
                    Ok(false) => {
                        info!("Playback finished after {} frames", visualizer.frames_rendered());
                        elwt.exit();
                    }
                    Err(e) => {
                        error!("Frame error: {}", e);
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            window_clone.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}
