//! Cadence CLI Application
//!
//! Renders a synthetic sine burst through the effects chain on a dedicated
//! render thread and reports what the chain did to it.

use anyhow::Context;
use cadence_core::domain::{db_to_gain, ControlEvent, ControlMessage, EngineConfig};
use cadence_infra::analysis::{magnitude_spectrum, peak_dbfs, spectral_deviation_db};
use cadence_infra::{control_channel, RealtimeEngine};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Real-time EQ, dynamics and reverb chain", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a sine burst through the chain and print levels
    Render {
        /// Configuration file (defaults to the per-user config when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sine frequency in Hz
        #[arg(long, default_value_t = 1000.0)]
        frequency: f32,

        /// Burst length in seconds
        #[arg(long, default_value_t = 1.0)]
        seconds: f32,

        /// Sine amplitude in dBFS
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        amplitude: f32,

        /// Frames per block (overrides the configuration)
        #[arg(long)]
        block_size: Option<usize>,

        /// Extra JSON control message, applied after the configuration
        #[arg(short, long = "message", value_name = "JSON")]
        messages: Vec<String>,
    },
    /// Print the default configuration, or write it to a file
    Config {
        #[arg(long, value_name = "FILE")]
        write: Option<PathBuf>,
    },
}

/// What the render thread hands back
struct Rendered {
    left: Vec<f32>,
    right: Vec<f32>,
    compressor_gain_reduction_db: f32,
    limiter_gain_reduction_db: f32,
    rejected_messages: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Render {
            config,
            frequency,
            seconds,
            amplitude,
            block_size,
            messages,
        } => {
            let mut config = load_config(config.as_deref()).await?;
            if let Some(block_size) = block_size {
                config.block_size = block_size;
            }
            config.validate()?;
            render(&config, frequency, seconds, amplitude, &messages)
        }
        Command::Config { write } => {
            let config = EngineConfig::default();
            match write {
                Some(path) => {
                    config.save_to_file(&path).await?;
                    info!(path = %path.display(), "Default configuration written");
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
    }
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    if let Some(path) = path {
        return EngineConfig::load_from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()));
    }

    match EngineConfig::default_config_path() {
        Ok(path) if path.exists() => Ok(EngineConfig::load_from_file(&path).await?),
        _ => Ok(EngineConfig::default()),
    }
}

fn render(
    config: &EngineConfig,
    frequency: f32,
    seconds: f32,
    amplitude_db: f32,
    extra: &[String],
) -> anyhow::Result<()> {
    let mut messages = config.to_messages();
    for json in extra {
        let message = ControlMessage::from_json(json).with_context(|| format!("parsing {json}"))?;
        messages.push(message);
    }

    // Everything is queued before the first block, so the queue must hold it all
    let (tx, rx) = control_channel(config.queue_capacity.max(messages.len()));
    for message in messages {
        tx.send(message)?;
    }

    let sample_rate = config.sample_rate as f32;
    let frames = (seconds.max(0.0) * sample_rate) as usize;
    let gain = db_to_gain(amplitude_db);
    let input: Vec<f32> = (0..frames)
        .map(|i| gain * (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate).sin())
        .collect();

    info!(frames, frequency, amplitude_db, block_size = config.block_size, "Rendering");

    let block_size = config.block_size;
    let render_input = input.clone();
    let handle = thread::Builder::new()
        .name("cadence-render".to_string())
        .spawn(move || {
            let mut engine = RealtimeEngine::new(rx);
            let mut left = vec![0.0; render_input.len()];
            let mut right = vec![0.0; render_input.len()];
            for ((block, out_left), out_right) in render_input
                .chunks(block_size)
                .zip(left.chunks_mut(block_size))
                .zip(right.chunks_mut(block_size))
            {
                engine.process(&[block, block], &mut [out_left, out_right]);
            }
            // Messages sent after the last block still get applied
            engine.drain_messages();

            Rendered {
                left,
                right,
                compressor_gain_reduction_db: engine.pipeline().compressor_gain_reduction_db(),
                limiter_gain_reduction_db: engine.pipeline().limiter_gain_reduction_db(),
                rejected_messages: engine.rejected_messages(),
            }
        })
        .context("spawning render thread")?;

    let rendered = handle
        .join()
        .map_err(|_| anyhow::anyhow!("render thread panicked"))?;

    match tx.try_recv_event() {
        Some(ControlEvent::Ready { sample_rate }) => info!(sample_rate, "Chain ready"),
        None => warn!("Chain never became ready; output is unprocessed"),
    }
    if rendered.rejected_messages > 0 {
        warn!(count = rendered.rejected_messages, "Some control messages were rejected");
    }

    let input_spectrum = magnitude_spectrum(&input, sample_rate);
    let output_spectrum = magnitude_spectrum(&rendered.left, sample_rate);

    println!("input peak:        {:>8.2} dBFS", peak_dbfs(&input));
    println!(
        "output peak:       {:>8.2} dBFS (L) {:>8.2} dBFS (R)",
        peak_dbfs(&rendered.left),
        peak_dbfs(&rendered.right)
    );
    println!(
        "dominant freq:     {:>8.1} Hz in, {:.1} Hz out",
        input_spectrum.dominant_frequency(),
        output_spectrum.dominant_frequency()
    );
    println!(
        "spectral change:   {:>8.2} dB (max, bins within 60 dB of peak)",
        spectral_deviation_db(&input_spectrum, &output_spectrum, 60.0)
    );
    println!(
        "gain reduction:    {:>8.2} dB compressor, {:.2} dB limiter",
        rendered.compressor_gain_reduction_db, rendered.limiter_gain_reduction_db
    );

    Ok(())
}
