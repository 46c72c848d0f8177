use std::{
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use audio_puppet_core::{AppConfig, Session, TestSignal};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const TICK_RATE: f32 = 60.0;

fn main() -> audio_puppet_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            seconds,
            bpm,
            config,
            seed,
            every,
        } => run_simulate(config.as_deref(), seconds, bpm, seed, every),
        Commands::Config { config } => run_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> audio_puppet_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::live_defaults()),
    }
}

fn run_simulate(
    config: Option<&Path>,
    seconds: f32,
    bpm: f32,
    seed: Option<u64>,
    every: usize,
) -> audio_puppet_core::Result<()> {
    let config = load_config(config)?;
    let sample_rate = config.audio.sample_rate as f32;
    let mut session = match seed {
        Some(seed) => Session::with_seed(config, seed)?,
        None => Session::new(config)?,
    };
    tracing::info!(seconds, bpm, "starting simulation");

    let mut signal = TestSignal::new(sample_rate, bpm);
    let block = (sample_rate / TICK_RATE).round() as usize;
    let ticks = (seconds.max(0.0) * TICK_RATE).round() as usize;
    let every = every.max(1);
    let mut history = Vec::new();
    let mut out = BufWriter::new(io::stdout().lock());

    for tick in 0..ticks {
        signal.fill(block, &mut history);
        let output = session.tick_samples(&history, 1.0 / TICK_RATE)?;
        if tick % every == 0 || output.frame.is_beat {
            serde_json::to_writer(&mut out, &output)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    let summary = session.summary();
    tracing::info!(
        frames = summary.frames_analysed,
        beats = summary.beats_detected,
        tempo_bpm = ?summary.tempo_bpm,
        "simulation finished"
    );
    Ok(())
}

fn run_config(config: Option<&Path>) -> audio_puppet_core::Result<()> {
    let config = load_config(config)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-driven articulated figure", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive a session from a synthetic kick-and-tone signal and print ticks as JSON lines.
    Simulate {
        /// Length of the simulation in seconds.
        #[arg(short, long, default_value_t = 8.0)]
        seconds: f32,
        /// Tempo of the synthetic kick drum.
        #[arg(short, long, default_value_t = 120.0)]
        bpm: f32,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seed for reproducible procedural pose choices.
        #[arg(long)]
        seed: Option<u64>,
        /// Print every n-th tick (beat ticks are always printed).
        #[arg(short, long, default_value_t = 15)]
        every: usize,
    },
    /// Print the effective configuration as JSON.
    Config {
        /// Optional JSON configuration file to validate and expand.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
