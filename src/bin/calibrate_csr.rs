//! Global CSR percentile calibration
//!
//! Computes C/S/R breakpoints at 15 levels over every plant with complete
//! CSR scores and writes `csr_percentile_calibration_global.json`.

use anyhow::Context;
use clap::Parser;
use guild_scorer::{calibrate_csr, GuildData, ScorerConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Global CSR percentile calibration", long_about = None)]
struct Cli {
    /// Config JSON (defaults to GUILD_SCORER_CONFIG, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Output file (defaults to the configured CSR calibration path)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guild_scorer=info,calibrate_csr=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ScorerConfig::from_file(path)?,
        None => ScorerConfig::from_env()?,
    };
    config.apply_overrides(cli.data_dir, None);

    let data = GuildData::load(&config).context("loading guild data")?;
    let csr = calibrate_csr(&data).context("no plants with complete CSR scores")?;

    let output = cli.output.unwrap_or_else(|| config.csr_calibration_path());
    csr.save(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!(
        path = %output.display(),
        n_samples = csr.c.n_samples,
        c_p75 = csr.c.p75,
        s_p75 = csr.s.p75,
        r_p75 = csr.r.p75,
        "CSR calibration written"
    );
    Ok(())
}
