//! Offline training: generates a synthetic dataset, dumps it to CSV, trains
//! the price model and writes the artifacts the API server loads at startup.

use anyhow::{Context, Result};
use clap::Parser;
use fresh_model::{create_synthetic_dataset, train_model};
use fresh_store::{ArtifactStore, Config};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train the freshness pricing model on synthetic data", long_about = None)]
struct Args {
    /// Number of synthetic products to generate
    #[arg(short = 'n', long, default_value_t = 15_000)]
    samples: usize,

    /// Seed for dataset generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output directory, defaults to `model.dir` from config
    #[arg(short, long, env = "FRESH_MODEL_DIR")]
    out: Option<PathBuf>,

    /// Skip writing training_data.csv
    #[arg(long)]
    no_csv: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "train=info,fresh_model=info,fresh_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Could not load config ({}), using defaults", e);
        Config::default()
    });
    let store = ArtifactStore::new(args.out.unwrap_or(config.model.dir));

    info!("Creating synthetic dataset of {} products (seed {})", args.samples, args.seed);
    let dataset = create_synthetic_dataset(args.samples, args.seed).context("Failed to generate dataset")?;

    if !args.no_csv {
        let path = store
            .save_training_data(&dataset)
            .context("Failed to write training data")?;
        info!("Training data saved to {}", path.display());
    }

    let trained = train_model(&dataset, &config.model.training).context("Training failed")?;
    store.save(&trained).context("Failed to save model artifacts")?;

    info!(
        "Model saved to {} (test MAE {:.4}, R2 {:.4})",
        store.dir().display(),
        trained.test_metrics.mae,
        trained.test_metrics.r2
    );

    Ok(())
}
