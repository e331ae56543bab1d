use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a scene script into a video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Print the codec/container this environment would encode with.
    Codecs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene script JSON.
    #[arg(long = "script")]
    script_path: PathBuf,

    /// Caption font file (TTF/OTF).
    #[arg(long)]
    font: PathBuf,

    /// Output video path; the extension follows the negotiated container.
    #[arg(long)]
    out: PathBuf,

    /// Background audio override (takes precedence over the script's).
    #[arg(long)]
    audio: Option<String>,

    /// Disable background audio monitoring entirely.
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// Background audio monitor volume (0.0 to 1.0).
    #[arg(long, default_value_t = 0.5)]
    volume: f32,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Output frames per second.
    #[arg(long, default_value_t = 25)]
    fps: u32,

    /// Cross-dissolve duration between scenes, in seconds.
    #[arg(long, default_value_t = 0.5)]
    transition: f64,

    /// Render as fast as possible instead of pacing to real time.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Codecs => cmd_codecs(),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let script_bytes = std::fs::read(&args.script_path)
        .with_context(|| format!("read scene script '{}'", args.script_path.display()))?;
    let script: storyreel::StoryScript = serde_json::from_slice(&script_bytes)
        .with_context(|| format!("parse scene script '{}'", args.script_path.display()))?;

    let mut cfg = storyreel::CompositorConfig::new(&args.font);
    cfg.canvas = storyreel::Canvas {
        width: args.width,
        height: args.height,
    };
    cfg.fps = storyreel::Fps::new(args.fps, 1)?;
    cfg.transition_secs = args.transition;
    cfg.monitor_volume = args.volume;

    let background_audio = if args.no_audio {
        None
    } else {
        args.audio.or(script.background_audio)
    };

    let mut compositor = storyreel::Compositor::new(cfg)?;
    let mut images = storyreel::FsImageSource;
    let probe = storyreel::FfmpegProbe;
    let mut sink = storyreel::FfmpegSink::new(storyreel::FfmpegSinkOpts::new(&args.out));
    let mut audio = storyreel::FfplayMonitor::new();

    let mut real_time = storyreel::RealTimePacer::new();
    let mut no_wait = storyreel::NoopPacer;
    let pacer: &mut dyn storyreel::FramePacer = if args.offline {
        &mut no_wait
    } else {
        &mut real_time
    };

    let mut env = storyreel::ComposeEnv {
        images: &mut images,
        probe: &probe,
        sink: &mut sink,
        audio: &mut audio,
        pacer,
    };
    let artifact = compositor.compose(&script.scenes, background_audio.as_deref(), &mut env)?;

    eprintln!(
        "wrote {} ({} bytes, {})",
        artifact.path.display(),
        artifact.len_bytes,
        artifact.container
    );
    Ok(())
}

fn cmd_codecs() -> anyhow::Result<()> {
    let probe = storyreel::FfmpegProbe;
    let spec = storyreel::select_codec(&probe)?;
    println!("{}", spec.label());
    Ok(())
}
