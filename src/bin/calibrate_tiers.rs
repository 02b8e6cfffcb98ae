//! Köppen-stratified calibration pipeline
//!
//! One stage per guild size (default 2 and 7): for each tier, sample random
//! guilds, compute raw scores with the scorer's metric code and write
//! `normalization_params_{size}plant.json` to the calibration directory.

use anyhow::Context;
use clap::Parser;
use guild_scorer::utils::normalization::{profile_file_name, CsrCalibration};
use guild_scorer::{Calibrator, GuildData, ScorerConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Köppen-stratified guild metric calibration", long_about = None)]
struct Cli {
    /// Config JSON (defaults to GUILD_SCORER_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the plant, organism and lookup tables
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Output directory for calibration artifacts
    #[arg(long)]
    calibration_dir: Option<PathBuf>,
    /// Guild sizes to calibrate, comma separated
    #[arg(long, value_delimiter = ',')]
    sizes: Option<Vec<usize>>,
    /// Sampled guilds per tier and size
    #[arg(long)]
    samples: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guild_scorer=info,calibrate_tiers=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ScorerConfig::from_file(path)?,
        None => ScorerConfig::from_env()?,
    };
    config.apply_overrides(cli.data_dir, cli.calibration_dir);
    let settings = &config.calibration;
    let sizes = cli.sizes.unwrap_or_else(|| settings.guild_sizes.clone());
    let samples = cli.samples.unwrap_or(settings.samples_per_tier);
    let seed = cli.seed.unwrap_or(settings.seed);

    let total_start = Instant::now();
    let data = GuildData::load(&config).context("loading guild data")?;

    let csr_path = config.csr_calibration_path();
    let csr_calibration = if csr_path.exists() {
        Some(CsrCalibration::load(&csr_path).context("loading CSR calibration")?)
    } else {
        tracing::warn!(path = %csr_path.display(), "CSR calibration not found - using fixed thresholds");
        None
    };

    let calibrator = Calibrator::new(&data, csr_calibration.as_ref())
        .with_samples(samples)
        .with_seed(seed);

    for size in sizes {
        let stage_start = Instant::now();
        tracing::info!(guild_size = size, samples, seed, "calibration stage started");

        let calibration = calibrator.calibrate(size);
        let output = config.calibration_dir.join(profile_file_name(size));
        calibration
            .save(&output)
            .with_context(|| format!("writing {}", output.display()))?;

        tracing::info!(
            guild_size = size,
            tiers = calibration.tier_count(),
            path = %output.display(),
            elapsed_s = stage_start.elapsed().as_secs_f64(),
            "calibration stage complete"
        );
    }

    tracing::info!(elapsed_s = total_start.elapsed().as_secs_f64(), "calibration complete");
    Ok(())
}
