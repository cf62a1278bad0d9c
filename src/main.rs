//! Motion Sentinel - Online Behavioral Motion Classification
//!
//! Demo binary: trains the LVQ classifier on a synthetic motion dataset in
//! the background while classifying angle sequences read from stdin.
//!
//! # Usage
//!
//! ```bash
//! # Classify angle sequences typed as whitespace-separated numbers, one per line
//! cargo run --release
//!
//! # Reproducible synthetic dataset
//! cargo run --release -- --rng-seed 7
//! ```
//!
//! # Environment Variables
//!
//! - `SENTINEL_CONFIG`: Path to a TOML config file (default: ./sentinel.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use motion_sentinel::config::{self, SentinelConfig};
use motion_sentinel::dataset::MemorySource;
use motion_sentinel::features;
use motion_sentinel::trainer::{ClassifyError, RebuildService};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "motion-sentinel")]
#[command(about = "Online behavioral motion classification via LVQ")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides SENTINEL_CONFIG search order)
    #[arg(long)]
    config: Option<String>,

    /// Number of samples generated per synthetic category
    #[arg(long, default_value = "24")]
    samples_per_category: usize,

    /// Length of each synthetic angle sequence
    #[arg(long, default_value = "64")]
    sequence_len: usize,

    /// RNG seed for the synthetic dataset
    #[arg(long, default_value = "41")]
    rng_seed: u64,
}

// ============================================================================
// Synthetic Dataset
// ============================================================================

/// Motion personalities for the synthetic dataset: (name, drift per step,
/// jitter amplitude). "steady" tracks smoothly; "erratic" snaps around the
/// way scripted aiming does.
const PERSONALITIES: [(&str, f64, f64); 3] = [
    ("steady", 0.8, 0.5),
    ("twitchy", 2.5, 6.0),
    ("erratic", 0.0, 25.0),
];

/// Generate one angle sequence with the given motion personality.
fn synthesize_sequence(rng: &mut StdRng, len: usize, drift: f64, jitter: f64) -> Vec<f64> {
    let mut angle = rng.gen_range(-90.0..90.0);
    let mut sequence = Vec::with_capacity(len);
    for _ in 0..len {
        angle += drift + rng.gen_range(-jitter..=jitter);
        sequence.push(angle);
    }
    sequence
}

/// Build an in-memory training set by extracting features from synthetic
/// angle sequences for each personality.
fn synthesize_dataset(args: &CliArgs) -> Result<MemorySource> {
    let mut rng = StdRng::seed_from_u64(args.rng_seed);
    let mut source = MemorySource::default();

    for (name, drift, jitter) in PERSONALITIES {
        let mut samples = Vec::with_capacity(args.samples_per_category);
        for _ in 0..args.samples_per_category {
            let sequence = synthesize_sequence(&mut rng, args.sequence_len, drift, jitter);
            let features = features::extract_features(&sequence)
                .with_context(|| format!("extracting features for category '{name}'"))?;
            samples.push(features);
        }
        source.add_category(name, samples);
    }
    Ok(source)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();

    let sentinel_config = match &args.config {
        Some(path) => SentinelConfig::load_from_file(Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => SentinelConfig::load(),
    };
    sentinel_config
        .engine
        .validate()
        .context("validating engine configuration")?;
    config::init(sentinel_config.clone());

    info!(
        dimension = sentinel_config.engine.dimension,
        step_size = sentinel_config.engine.step_size,
        epochs = sentinel_config.engine.epochs_per_rebuild,
        "Motion Sentinel starting"
    );

    let source = Arc::new(synthesize_dataset(&args)?);
    let service = Arc::new(RebuildService::new(sentinel_config.engine.clone()));

    // Rebuild in the background; stdin classification starts immediately and
    // reports not-ready until the first model is published.
    let rebuild = service.spawn_rebuild(source);

    info!("Reading angle sequences from stdin (whitespace-separated numbers, one sequence per line)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let angles: Result<Vec<f64>, _> = trimmed
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect();
        let angles = match angles {
            Ok(angles) => angles,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable sequence");
                continue;
            }
        };

        match service.classify_sequence(&angles) {
            Ok(prediction) => {
                let name = service
                    .resolve_category(prediction.category)
                    .unwrap_or_else(|| format!("category-{}", prediction.category));
                let output = serde_json::json!({
                    "category": name,
                    "category_id": prediction.category,
                    "distance": prediction.distance,
                    "likelihood": prediction.likelihood,
                });
                println!("{output}");
            }
            Err(ClassifyError::Classifier(e)) => warn!(error = %e, "Classification unavailable"),
            Err(ClassifyError::Feature(e)) => warn!(error = %e, "Rejected input sequence"),
        }
    }

    service.shutdown();
    match rebuild.await {
        Ok(Ok(outcome)) => info!(?outcome, "Background rebuild finished"),
        Ok(Err(e)) => warn!(error = %e, "Background rebuild failed"),
        Err(e) => warn!(error = %e, "Background rebuild task panicked"),
    }

    let status = service.status();
    info!(
        epoch = status.network.epoch,
        training_set = status.network.training_set_size,
        codebook = status.network.codebook_size,
        rebuilds = status.rebuilds_completed,
        "Shutting down"
    );
    Ok(())
}
