//! volume_probe — print the volume a pinch distance maps to, and optionally
//! push the last one through a real sink to check it works on this host.

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use volume_map::{AmixerSink, DistanceRange, LogSink, OsascriptSink, VolumeSink};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProbeSink {
    Osascript,
    Amixer,
    Log,
}

#[derive(Parser, Debug)]
#[command(about = "Map thumb–index distances (px) to volume percentages")]
struct Args {
    /// Distance giving 0%.
    #[arg(long, default_value_t = 15.0)]
    min: f32,
    /// Distance giving 100%.
    #[arg(long, default_value_t = 200.0)]
    max: f32,
    /// Apply the last mapped value through this sink.
    #[arg(long, value_enum)]
    apply: Option<ProbeSink>,
    /// Distances to map.
    #[arg(required = true)]
    distances: Vec<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    if !(args.min < args.max) {
        bail!("--min ({}) must be below --max ({})", args.min, args.max);
    }
    let range = DistanceRange::new(args.min, args.max);

    println!("  distance     level  percent");
    let mut last = None;
    for &d in &args.distances {
        let percent = range.percent_for(d);
        println!("  {:>8.1}  {:>7.2}  {:>7}", d, range.level_for(d), percent);
        last = Some(percent);
    }

    if let (Some(kind), Some(percent)) = (args.apply, last) {
        let mut sink: Box<dyn VolumeSink> = match kind {
            ProbeSink::Osascript => Box::new(OsascriptSink),
            ProbeSink::Amixer    => Box::new(AmixerSink::default()),
            ProbeSink::Log       => Box::new(LogSink::default()),
        };
        sink.set_volume(percent)?;
        println!("\n  applied {}% via {}", percent, sink.name());
    }

    Ok(())
}
