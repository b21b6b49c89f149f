//! TrendPulse CLI
//!
//! Runs detection cycles over JSON signal batches or generated sample data
//! and prints, exports or saves the ranked opportunity list.

mod render;
mod sample;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pulse_core::HeuristicsConfig;
use pulse_probe::ProbeConfig;
use pulse_runtime::{DetectionEngine, EngineConfig, JsonBatchCollector, StaticCollector};

#[derive(Parser)]
#[command(name = "trendpulse")]
#[command(author, version, about = "TrendPulse: signal fusion and trend intelligence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one detection cycle
    Run {
        /// JSON signal batch files (one array of signals per file)
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Generate a sample batch instead of (or in addition to) inputs
        #[arg(long)]
        sample: bool,

        /// Sample batch size
        #[arg(long, default_value = "40")]
        sample_size: usize,

        /// Seed for reproducible sample batches
        #[arg(long)]
        seed: Option<u64>,

        /// Heuristics TOML overriding the built-in defaults
        #[arg(long, env = "TRENDPULSE_HEURISTICS")]
        heuristics: Option<PathBuf>,

        /// Disable outbound URL probes
        #[arg(long)]
        offline: bool,

        /// Global cycle deadline in milliseconds
        #[arg(long, default_value = "30000")]
        deadline_ms: u64,

        /// Write the full cycle result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// How many opportunities to print
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Generate a sample signal batch as JSON
    Sample {
        /// Number of signals
        #[arg(short, long, default_value = "40")]
        count: usize,

        /// Seed for a reproducible batch
        #[arg(long)]
        seed: Option<u64>,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            input,
            sample,
            sample_size,
            seed,
            heuristics,
            offline,
            deadline_ms,
            output,
            markdown,
            top,
        } => {
            run_cycle(
                input,
                sample,
                sample_size,
                seed,
                heuristics,
                offline,
                deadline_ms,
                output,
                markdown,
                top,
            )
            .await?;
        }
        Commands::Sample {
            count,
            seed,
            output,
        } => {
            let batch = sample::generate(count, seed);
            let json = serde_json::to_string_pretty(&batch)?;
            fs::write(&output, json)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Wrote {} sample signals to {}", batch.len(), output.display());
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    input: Vec<PathBuf>,
    sample: bool,
    sample_size: usize,
    seed: Option<u64>,
    heuristics: Option<PathBuf>,
    offline: bool,
    deadline_ms: u64,
    output: Option<PathBuf>,
    markdown: Option<PathBuf>,
    top: usize,
) -> Result<()> {
    println!("📡 TrendPulse - signal fusion and trend intelligence\n");

    if input.is_empty() && !sample {
        anyhow::bail!("nothing to analyze: pass --input files or --sample");
    }

    let config = EngineConfig {
        heuristics: load_heuristics(heuristics)?,
        probe: ProbeConfig {
            enabled: !offline,
            ..ProbeConfig::default()
        },
        cycle_deadline_ms: deadline_ms,
        ..EngineConfig::default()
    };

    let mut engine = DetectionEngine::new(config);
    for path in &input {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch".to_string());
        engine = engine.with_collector(Arc::new(JsonBatchCollector::new(&name, path.clone())));
    }
    if sample {
        let batch = sample::generate(sample_size, seed);
        println!("🧪 Generated {} sample signals", batch.len());
        engine = engine.with_collector(Arc::new(StaticCollector::new("sample", batch)));
    }

    let result = engine.run_cycle().await;

    println!(
        "✅ Cycle complete in {}ms: {} collected, {} accepted, {} opportunities\n",
        result.elapsed_ms,
        result.report.collected,
        result.report.accepted,
        result.opportunities.len(),
    );

    if result.flags.placeholder {
        println!("⚠️  No validated signals this cycle - placeholder result.");
    }
    if !result.flags.failed_sources.is_empty() {
        println!(
            "⚠️  Degraded collectors: {}",
            result.flags.failed_sources.join(", ")
        );
    }

    for (rank, opp) in result.opportunities.iter().take(top).enumerate() {
        println!(
            "{:>2}. {}  (momentum {:.2}, confidence {:.2}, {:?})",
            rank + 1,
            opp.title,
            opp.momentum,
            opp.confidence,
            opp.timing,
        );
        if !opp.platforms.is_empty() {
            println!("    platforms: {}", opp.platforms.join(", "));
        }
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("\n📄 Full result saved to {}", path.display());
    }
    if let Some(path) = markdown {
        fs::write(&path, render::markdown_report(&result))
            .with_context(|| format!("writing {}", path.display()))?;
        println!("📄 Markdown report saved to {}", path.display());
    }

    Ok(())
}

fn load_heuristics(path: Option<PathBuf>) -> Result<HeuristicsConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading heuristics from {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parsing heuristics from {}", path.display()))
        }
        None => Ok(HeuristicsConfig::default()),
    }
}
