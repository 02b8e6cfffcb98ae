//! Error types
//!
//! Scoring itself never fails once a guild is well formed: missing data leads
//! to a veto or a neutral contribution. The typed errors below cover malformed
//! requests and the IO around tables, calibration artifacts and config.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Smallest guild accepted by the scorer
pub const MIN_GUILD_SIZE: usize = 2;

/// Largest guild accepted by the scorer
pub const MAX_GUILD_SIZE: usize = 10;

/// Malformed guild request, rejected before any computation
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuildError {
    #[error("guild has {count} plants, at least {min} are required")]
    TooFewPlants { count: usize, min: usize },

    #[error("guild has {count} plants, at most {max} are allowed")]
    TooManyPlants { count: usize, max: usize },

    #[error("plant '{plant_id}' appears more than once in the guild")]
    DuplicatePlant { plant_id: String },

    #[error("plant ID at position {position} is blank")]
    BlankPlantId { position: usize },
}

/// Failure while loading a trait, organism or lookup table
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported table format for {path} (expected .parquet or .csv)")]
    UnsupportedFormat { path: PathBuf },

    #[error("table {table} is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("failed to read table {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },
}

/// Failure while reading or writing a calibration artifact
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("failed to read calibration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write calibration file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid calibration JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize calibration for {path}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("breakpoints for {tier}/{metric} are not non-decreasing")]
    NonMonotonic { tier: String, metric: String },
}

/// Failure while loading scorer configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Check guild shape: size bounds, blank IDs, duplicates
pub fn validate_guild(plant_ids: &[String]) -> Result<(), GuildError> {
    if plant_ids.len() < MIN_GUILD_SIZE {
        return Err(GuildError::TooFewPlants { count: plant_ids.len(), min: MIN_GUILD_SIZE });
    }
    if plant_ids.len() > MAX_GUILD_SIZE {
        return Err(GuildError::TooManyPlants { count: plant_ids.len(), max: MAX_GUILD_SIZE });
    }

    for (position, id) in plant_ids.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(GuildError::BlankPlantId { position });
        }
        if plant_ids[..position].contains(id) {
            return Err(GuildError::DuplicatePlant { plant_id: id.clone() });
        }
    }

    Ok(())
}
