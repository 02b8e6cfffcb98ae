//! Scorer configuration
//!
//! Loaded from the JSON file named by `GUILD_SCORER_CONFIG` (if set), then
//! adjusted by `GUILD_SCORER_DATA_DIR` / `GUILD_SCORER_CALIBRATION_DIR`.
//! Missing fields take the built-in defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "GUILD_SCORER_CONFIG";
pub const DATA_DIR_ENV: &str = "GUILD_SCORER_DATA_DIR";
pub const CALIBRATION_DIR_ENV: &str = "GUILD_SCORER_CALIBRATION_DIR";

/// Data files, calibration artifacts and scoring options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Directory that relative table paths resolve against
    pub data_dir: PathBuf,
    pub plants_file: PathBuf,
    pub organisms_file: PathBuf,
    pub fungi_file: PathBuf,
    pub herbivore_predators_file: PathBuf,
    pub insect_parasites_file: PathBuf,
    pub pathogen_antagonists_file: PathBuf,

    /// Directory holding `normalization_params_{size}plant.json` and the CSR file
    pub calibration_dir: PathBuf,
    pub csr_calibration_file: PathBuf,
    /// Guild sizes with a calibration profile on disk
    pub calibration_profiles: Vec<usize>,

    /// Maximum entries per evidence list in the breakdown
    pub evidence_cap: usize,

    pub calibration: CalibrationSettings,
}

/// Offline calibrator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    pub guild_sizes: Vec<usize>,
    pub samples_per_tier: usize,
    pub seed: u64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            guild_sizes: vec![2, 7],
            samples_per_tier: 20_000,
            seed: 42,
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            plants_file: PathBuf::from("plants_with_koppen_tiers.parquet"),
            organisms_file: PathBuf::from("plant_organism_profiles.parquet"),
            fungi_file: PathBuf::from("plant_fungal_guilds_hybrid.parquet"),
            herbivore_predators_file: PathBuf::from("herbivore_predators.parquet"),
            insect_parasites_file: PathBuf::from("insect_fungal_parasites.parquet"),
            pathogen_antagonists_file: PathBuf::from("pathogen_antagonists.parquet"),
            calibration_dir: PathBuf::from("data/calibration"),
            csr_calibration_file: PathBuf::from("csr_percentile_calibration_global.json"),
            calibration_profiles: vec![2, 7],
            evidence_cap: 5,
            calibration: CalibrationSettings::default(),
        }
    }
}

impl ScorerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config file from `GUILD_SCORER_CONFIG` (or defaults) plus env overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                let config = Self::from_file(&path)?;
                tracing::info!(path = %path.display(), "scorer_config.loaded=file");
                config
            }
            None => {
                tracing::info!("scorer_config.loaded=builtin");
                Self::default()
            }
        };

        config.apply_overrides(
            env::var_os(DATA_DIR_ENV).map(PathBuf::from),
            env::var_os(CALIBRATION_DIR_ENV).map(PathBuf::from),
        );
        Ok(config)
    }

    /// Replace directories when an override is given
    pub fn apply_overrides(&mut self, data_dir: Option<PathBuf>, calibration_dir: Option<PathBuf>) {
        if let Some(dir) = data_dir {
            tracing::debug!(data_dir = %dir.display(), "scorer_config.override");
            self.data_dir = dir;
        }
        if let Some(dir) = calibration_dir {
            tracing::debug!(calibration_dir = %dir.display(), "scorer_config.override");
            self.calibration_dir = dir;
        }
    }

    fn in_data_dir(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn plants_path(&self) -> PathBuf {
        self.in_data_dir(&self.plants_file)
    }

    pub fn organisms_path(&self) -> PathBuf {
        self.in_data_dir(&self.organisms_file)
    }

    pub fn fungi_path(&self) -> PathBuf {
        self.in_data_dir(&self.fungi_file)
    }

    pub fn herbivore_predators_path(&self) -> PathBuf {
        self.in_data_dir(&self.herbivore_predators_file)
    }

    pub fn insect_parasites_path(&self) -> PathBuf {
        self.in_data_dir(&self.insect_parasites_file)
    }

    pub fn pathogen_antagonists_path(&self) -> PathBuf {
        self.in_data_dir(&self.pathogen_antagonists_file)
    }

    pub fn csr_calibration_path(&self) -> PathBuf {
        if self.csr_calibration_file.is_absolute() {
            self.csr_calibration_file.clone()
        } else {
            self.calibration_dir.join(&self.csr_calibration_file)
        }
    }
}
