//! gesture_volume — command-line entry point.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use gesture_volume::app::{run, RunOptions, SourceKind};
use gesture_volume::settings::{Settings, SinkKind};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Lock with the left palm, set the volume with the right pinch")]
struct Args {
    /// TOML settings file (default: ./gesture_volume.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Frame source: sim, stdin, file:<path> or leap.
    #[arg(long, default_value = "sim")]
    source: SourceKind,
    /// Run without the HUD window.
    #[arg(long)]
    headless: bool,
    /// Volume output.
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,
    /// Seconds the left palm must stay open to toggle the lock.
    #[arg(long)]
    hold_secs: Option<f32>,
    /// Preferred MIDI output port (substring match).
    #[arg(long)]
    midi_port: Option<String>,
    /// More logging (-v debug, -vv trace).  RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    if !args.headless {
        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║          Gesture Volume — palm lock + pinch control          ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
    }

    if let Err(e) = launch(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn launch(args: Args) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(sink) = args.sink           { settings.sink = sink; }
    if let Some(secs) = args.hold_secs      { settings.hold_secs = secs; }
    if let Some(port) = args.midi_port      { settings.midi_port = Some(port); }
    settings.validate()?;

    run(settings, RunOptions { source: args.source, headless: args.headless })?;
    Ok(())
}
