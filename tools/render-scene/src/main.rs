use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use resonance::{
    ReflectionProperties, RenderingMode, ReverbProperties, Sample, SampleFormat, Session, SessionConfig, Source,
    SourceKind, buffer,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Render a JSON scene and print per-channel peak and RMS")]
struct Args {
    /// Scene description (see scenes/orbit.json)
    scene: PathBuf,
    /// Number of blocks to render
    #[arg(short, long, default_value_t = 100)]
    blocks: usize,
    #[arg(long, value_enum, default_value_t = Format::F32)]
    format: Format,
    #[arg(long, value_enum, default_value_t = Layout::Interleaved)]
    layout: Layout,
    /// Write the rendered audio as raw little-endian interleaved samples
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    F32,
    I16,
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    Interleaved,
    Planar,
}

#[derive(Deserialize)]
struct Scene {
    #[serde(default)]
    session: SessionConfig,
    #[serde(default = "unity")]
    master_volume: f32,
    #[serde(default)]
    listener: Option<Pose>,
    #[serde(default)]
    room: Option<Room>,
    #[serde(default)]
    sources: Vec<SceneSource>,
}

#[derive(Deserialize)]
struct Pose {
    position: [f32; 3],
    #[serde(default = "identity")]
    rotation: [f32; 4],
}

#[derive(Deserialize)]
struct Room {
    enabled: bool,
    #[serde(default)]
    reflection: ReflectionProperties,
    #[serde(default)]
    reverb: ReverbProperties,
}

#[derive(Deserialize)]
struct SceneSource {
    kind: Kind,
    #[serde(default)]
    position: [f32; 3],
    #[serde(default = "unity")]
    volume: f32,
    signal: Signal,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Kind {
    SoundObject { mode: RenderingMode },
    Stereo { channels: usize },
    Ambisonic { channels: usize },
}

#[derive(Deserialize, Clone, Copy)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Signal {
    Sine { freq_hz: f32, amplitude: f32 },
    Impulse { amplitude: f32 },
    Dc { amplitude: f32 },
    Silence,
}

fn unity() -> f32 {
    1.0
}

fn identity() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Signal {
    /// Sample `n` of the signal, counted from the first rendered frame.
    fn at(self, n: usize, sample_rate_hz: u32) -> f32 {
        match self {
            Signal::Sine { freq_hz, amplitude } => {
                (std::f32::consts::TAU * freq_hz * n as f32 / sample_rate_hz as f32).sin() * amplitude
            }
            Signal::Impulse { amplitude } if n == 0 => amplitude,
            Signal::Impulse { .. } | Signal::Silence => 0.0,
            Signal::Dc { amplitude } => amplitude,
        }
    }
}

struct Feed {
    source: Source,
    signal: Signal,
    block: Vec<f32>,
}

impl Feed {
    /// Queue the block starting at `frame`. Ambisonic sources get the signal on W only.
    fn push(&mut self, frame: usize, num_frames: usize, sample_rate_hz: u32) -> Result<()> {
        let channels = self.source.num_channels();
        let feed_all = !matches!(self.source.kind(), SourceKind::Ambisonic { .. });
        for (i, out) in self.block.chunks_exact_mut(channels).enumerate().take(num_frames) {
            let value = self.signal.at(frame + i, sample_rate_hz);
            for (ch, sample) in out.iter_mut().enumerate() {
                *sample = if ch == 0 || feed_all { value } else { 0.0 };
            }
        }
        self.source.set_interleaved(&self.block).with_context(|| format!("feeding source {}", self.source.id()))
    }
}

#[derive(Default, Clone, Copy)]
struct Level {
    peak: f32,
    sum_sq: f64,
    count: usize,
}

impl Level {
    fn add(&mut self, value: f32) {
        self.peak = self.peak.max(value.abs());
        self.sum_sq += f64::from(value) * f64::from(value);
        self.count += 1;
    }

    fn rms(&self) -> f64 {
        if self.count == 0 { 0.0 } else { (self.sum_sq / self.count as f64).sqrt() }
    }
}

fn build(session: &Session, scene: &Scene) -> Result<Vec<Feed>> {
    session.set_master_volume(scene.master_volume);
    if let Some(pose) = &scene.listener {
        let [x, y, z] = pose.position;
        session.set_head_position(x, y, z);
        let [qx, qy, qz, qw] = pose.rotation;
        session.set_head_rotation(qx, qy, qz, qw);
    }
    if let Some(room) = &scene.room {
        session.enable_room_effects(room.enabled);
        session.set_reflection_properties(&room.reflection);
        session.set_reverb_properties(&room.reverb);
    }

    let frames = session.frames_per_buffer();
    scene
        .sources
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let source = match spec.kind {
                Kind::SoundObject { mode } => session.sound_object(mode),
                Kind::Stereo { channels } => session.stereo_source(channels),
                Kind::Ambisonic { channels } => session.ambisonic_source(channels),
            }
            .with_context(|| format!("source #{index} was rejected"))?;
            let [x, y, z] = spec.position;
            source.set_position(Vec3::new(x, y, z));
            source.set_volume(spec.volume);
            tracing::debug!(index, id = source.id(), kind = ?source.kind(), "source created");
            let block = vec![0.0; source.num_channels() * frames];
            Ok(Feed { source, signal: spec.signal, block })
        })
        .collect()
}

fn render<S: Sample>(session: &Session, feeds: &mut [Feed], args: &Args) -> Result<(Vec<Level>, Vec<f32>)> {
    let channels = session.num_channels();
    let frames = session.frames_per_buffer();
    let rate = session.sample_rate_hz();
    let mut levels = vec![Level::default(); channels];
    let mut captured = Vec::new();
    let mut interleaved = vec![S::default(); channels * frames];
    let mut planar = vec![vec![S::default(); frames]; channels];

    for block in 0..args.blocks {
        for feed in feeds.iter_mut() {
            feed.push(block * frames, frames, rate)?;
        }
        let rendered = match args.layout {
            Layout::Interleaved => session.render_interleaved(channels, frames, &mut interleaved),
            Layout::Planar => {
                let mut regions: Vec<&mut [S]> = planar.iter_mut().map(Vec::as_mut_slice).collect();
                session.render_planar(channels, frames, &mut regions)
            }
        };
        rendered.with_context(|| format!("rendering block {block}"))?;

        if let Layout::Planar = args.layout {
            for (frame, out) in interleaved.chunks_exact_mut(channels).enumerate() {
                for (ch, sample) in out.iter_mut().enumerate() {
                    *sample = planar[ch][frame];
                }
            }
        }
        for out in interleaved.chunks_exact(channels) {
            for (level, sample) in levels.iter_mut().zip(out) {
                level.add(sample.to_f32());
            }
        }
        if args.output.is_some() {
            captured.extend(interleaved.iter().map(|s| s.to_f32()));
        }
    }
    Ok((levels, captured))
}

fn write_raw(path: &PathBuf, samples: &[f32], format: SampleFormat) -> Result<()> {
    let mut bytes = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    for &sample in samples {
        match format {
            SampleFormat::F32 => bytes.extend_from_slice(&sample.to_le_bytes()),
            SampleFormat::I16 => bytes.extend_from_slice(&buffer::f32_to_i16(sample).to_le_bytes()),
        }
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn run<S: Sample>(session: &Session, feeds: &mut [Feed], args: &Args) -> Result<()> {
    let (levels, captured) = render::<S>(session, feeds, args)?;
    let seconds = (args.blocks * session.frames_per_buffer()) as f64 / f64::from(session.sample_rate_hz());
    println!(
        "rendered {} blocks ({seconds:.2}s) as {:?} {}",
        args.blocks,
        S::FORMAT,
        match args.layout {
            Layout::Interleaved => "interleaved",
            Layout::Planar => "planar",
        }
    );
    for (ch, level) in levels.iter().enumerate() {
        println!("  ch{ch}: peak {:.4}  rms {:.4}", level.peak, level.rms());
    }
    if let Some(path) = &args.output {
        write_raw(path, &captured, S::FORMAT)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let fallback = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let text = fs::read_to_string(&args.scene).with_context(|| format!("reading {}", args.scene.display()))?;
    let scene: Scene = serde_json::from_str(&text).with_context(|| format!("parsing {}", args.scene.display()))?;
    if scene.sources.is_empty() {
        bail!("scene has no sources");
    }

    let session = Session::with_config(scene.session.clone()).context("creating session")?;
    let mut feeds = build(&session, &scene)?;
    match args.format {
        Format::F32 => run::<f32>(&session, &mut feeds, &args),
        Format::I16 => run::<i16>(&session, &mut feeds, &args),
    }
}
