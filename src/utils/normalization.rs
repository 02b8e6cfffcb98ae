//! Normalization Utilities
//!
//! Converts raw metric scores to percentiles using Köppen climate tier-stratified
//! calibration parameters, and raw CSR scores to percentiles using the global
//! CSR calibration.
//!
//! Calibration artifacts are JSON: tier → metric → {p1..p99, mean, std, sample_count}.
//! One artifact exists per calibrated guild size (`normalization_params_{size}plant.json`).

use crate::error::CalibrationError;
use crate::metrics::MetricKey;
use crate::tier::ClimateTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Percentile levels of guild metric breakpoints
pub const PERCENTILE_LEVELS: [f64; 13] = [
    1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0,
];

/// Percentile levels of global CSR breakpoints
pub const CSR_PERCENTILE_LEVELS: [f64; 15] = [
    1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 85.0, 90.0, 95.0, 99.0,
];

/// CSR percentile above which a strategy counts as "high"
pub const CSR_HIGH_PERCENTILE: f64 = 75.0;

/// Artifact file name for a guild size
pub fn profile_file_name(guild_size: usize) -> String {
    format!("normalization_params_{}plant.json", guild_size)
}

// ============================================================================
// Interpolation
// ============================================================================

/// Map a raw value onto percentile `levels` through the breakpoint `values`
///
/// Below the first breakpoint → 0, above the last → 100, otherwise linear
/// interpolation inside the first bracket `[values[i], values[i+1]]` holding
/// the value. With tied breakpoints the lowest matching level is returned.
/// NaN maps to 50.
pub fn interpolate_percentile(levels: &[f64], values: &[f64], raw: f64) -> f64 {
    if raw.is_nan() || values.len() < 2 || levels.len() != values.len() {
        return 50.0;
    }

    let last = values.len() - 1;
    if raw < values[0] {
        return 0.0;
    }
    if raw > values[last] {
        return 100.0;
    }

    // Binary search for the first bracket whose upper bound reaches raw;
    // same bracket a linear scan over values[i] <= raw <= values[i+1] finds.
    let i = values[1..].partition_point(|&v| v < raw).min(last - 1);
    let (lo, hi) = (values[i], values[i + 1]);

    let fraction = if hi - lo > 0.0 { (raw - lo) / (hi - lo) } else { 0.0 };
    let percentile = levels[i] + fraction * (levels[i + 1] - levels[i]);

    percentile.clamp(0.0, 100.0)
}

/// Fallback when no calibration exists for a metric/tier
pub fn heuristic_percentile(raw: f64) -> f64 {
    if raw.is_nan() {
        return 50.0;
    }
    (50.0 + 50.0 * (raw / 3.0).tanh()).clamp(0.0, 100.0)
}

/// Write a JSON artifact, creating the parent directory
fn write_artifact(path: &Path, json: String) -> Result<(), CalibrationError> {
    let write_err = |source| CalibrationError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, json).map_err(write_err)
}

// ============================================================================
// Guild metric calibration
// ============================================================================

/// Breakpoints and summary statistics of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileParams {
    #[serde(alias = "p01")]
    pub p1: f64,
    #[serde(alias = "p05")]
    pub p5: f64,
    pub p10: f64,
    pub p20: f64,
    pub p30: f64,
    pub p40: f64,
    pub p50: f64,
    pub p60: f64,
    pub p70: f64,
    pub p80: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    #[serde(default)]
    pub mean: f64,
    #[serde(default)]
    pub std: f64,
    #[serde(default)]
    pub sample_count: usize,
}

impl PercentileParams {
    pub fn from_breakpoints(values: [f64; 13], mean: f64, std: f64, sample_count: usize) -> Self {
        let [p1, p5, p10, p20, p30, p40, p50, p60, p70, p80, p90, p95, p99] = values;
        Self { p1, p5, p10, p20, p30, p40, p50, p60, p70, p80, p90, p95, p99, mean, std, sample_count }
    }

    pub fn breakpoints(&self) -> [f64; 13] {
        [
            self.p1, self.p5, self.p10, self.p20, self.p30, self.p40, self.p50,
            self.p60, self.p70, self.p80, self.p90, self.p95, self.p99,
        ]
    }

    pub fn is_monotonic(&self) -> bool {
        self.breakpoints().windows(2).all(|w| w[0] <= w[1])
    }

    /// Percentile of a raw value within this distribution
    pub fn percentile(&self, raw: f64) -> f64 {
        interpolate_percentile(&PERCENTILE_LEVELS, &self.breakpoints(), raw)
    }
}

/// Calibration parameters for a single Köppen tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierCalibration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n1: Option<PercentileParams>, // Pathogen fungi overlap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n2: Option<PercentileParams>, // Herbivore overlap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n4: Option<PercentileParams>, // Conflict density
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1: Option<PercentileParams>, // Biocontrol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2: Option<PercentileParams>, // Disease control
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p3: Option<PercentileParams>, // Beneficial fungi
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p4: Option<PercentileParams>, // Phylogenetic diversity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p5: Option<PercentileParams>, // Stratification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p6: Option<PercentileParams>, // Shared pollinators
}

impl TierCalibration {
    pub fn get(&self, key: MetricKey) -> Option<&PercentileParams> {
        match key {
            MetricKey::N1 => self.n1.as_ref(),
            MetricKey::N2 => self.n2.as_ref(),
            MetricKey::N4 => self.n4.as_ref(),
            MetricKey::P1 => self.p1.as_ref(),
            MetricKey::P2 => self.p2.as_ref(),
            MetricKey::P3 => self.p3.as_ref(),
            MetricKey::P4 => self.p4.as_ref(),
            MetricKey::P5 => self.p5.as_ref(),
            MetricKey::P6 => self.p6.as_ref(),
        }
    }

    pub fn set(&mut self, key: MetricKey, params: PercentileParams) {
        let slot = match key {
            MetricKey::N1 => &mut self.n1,
            MetricKey::N2 => &mut self.n2,
            MetricKey::N4 => &mut self.n4,
            MetricKey::P1 => &mut self.p1,
            MetricKey::P2 => &mut self.p2,
            MetricKey::P3 => &mut self.p3,
            MetricKey::P4 => &mut self.p4,
            MetricKey::P5 => &mut self.p5,
            MetricKey::P6 => &mut self.p6,
        };
        *slot = Some(params);
    }
}

/// Calibration parameters for all Köppen tiers and metrics (one guild size)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calibration {
    tiers: BTreeMap<String, TierCalibration>,
}

/// Result of normalizing one raw value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub percentile: f64,
    /// False when the heuristic fallback was used
    pub calibrated: bool,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load calibration from JSON file, rejecting non-monotonic breakpoints
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(path).map_err(|source| CalibrationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let calibration: Calibration =
            serde_json::from_str(&contents).map_err(|source| CalibrationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        calibration.validate()?;
        Ok(calibration)
    }

    pub fn save(&self, path: &Path) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| CalibrationError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        write_artifact(path, json)
    }

    /// Every stored breakpoint table must be non-decreasing
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (tier, tier_cal) in &self.tiers {
            for key in MetricKey::ALL {
                if let Some(params) = tier_cal.get(key) {
                    if !params.is_monotonic() {
                        return Err(CalibrationError::NonMonotonic {
                            tier: tier.clone(),
                            metric: key.code().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, tier: ClimateTier, calibration: TierCalibration) {
        self.tiers.insert(tier.column().to_string(), calibration);
    }

    pub fn tier(&self, tier: ClimateTier) -> Option<&TierCalibration> {
        self.tiers.get(tier.column())
    }

    pub fn params(&self, key: MetricKey, tier: ClimateTier) -> Option<&PercentileParams> {
        self.tier(tier).and_then(|t| t.get(key))
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Percentile of `raw` for (metric, tier), heuristic when uncalibrated
    pub fn normalize(&self, raw: f64, key: MetricKey, tier: ClimateTier) -> Normalized {
        percentile_normalize(raw, key, tier, Some(self))
    }
}

/// Percentile normalize using linear interpolation
///
/// Algorithm:
/// 1. Find bracketing percentiles [pi, pi+1] where values[pi] <= raw <= values[pi+1]
/// 2. Linear interpolation: percentile = pi + fraction × (pi+1 - pi)
/// 3. Without breakpoints for (metric, tier): 50 + 50·tanh(raw/3)
///
/// Polarity (risk metrics shown as 100 − percentile) is applied by the scorer.
pub fn percentile_normalize(
    raw_value: f64,
    key: MetricKey,
    tier: ClimateTier,
    calibration: Option<&Calibration>,
) -> Normalized {
    match calibration.and_then(|cal| cal.params(key, tier)) {
        Some(params) => Normalized {
            percentile: params.percentile(raw_value),
            calibrated: true,
        },
        None => Normalized {
            percentile: heuristic_percentile(raw_value),
            calibrated: false,
        },
    }
}

// ============================================================================
// Calibration profiles (one per guild size)
// ============================================================================

/// Calibrations keyed by the guild size they were sampled at
#[derive(Debug, Clone, Default)]
pub struct CalibrationProfiles {
    profiles: BTreeMap<usize, Calibration>,
}

impl CalibrationProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, guild_size: usize, calibration: Calibration) {
        self.profiles.insert(guild_size, calibration);
    }

    pub fn with_profile(mut self, guild_size: usize, calibration: Calibration) -> Self {
        self.insert(guild_size, calibration);
        self
    }

    /// Load `normalization_params_{size}plant.json` for each size
    ///
    /// Absent files are skipped (those guild sizes fall back to other
    /// profiles or the heuristic); unreadable or invalid files are errors.
    pub fn load_dir(dir: &Path, sizes: &[usize]) -> Result<Self, CalibrationError> {
        let mut profiles = Self::new();
        for &size in sizes {
            let path = dir.join(profile_file_name(size));
            if !path.exists() {
                tracing::warn!(path = %path.display(), "calibration profile not found");
                continue;
            }
            let calibration = Calibration::load(&path)?;
            tracing::info!(
                path = %path.display(),
                guild_size = size,
                tiers = calibration.tier_count(),
                "calibration profile loaded"
            );
            profiles.insert(size, calibration);
        }
        Ok(profiles)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.profiles.keys().copied().collect()
    }

    /// Requested profile if present, else the one nearest the guild size
    /// (ties pick the smaller profile)
    pub fn select(&self, requested: Option<usize>, guild_size: usize) -> Option<(usize, &Calibration)> {
        if let Some(size) = requested {
            if let Some(calibration) = self.profiles.get(&size) {
                return Some((size, calibration));
            }
            tracing::debug!(requested = size, guild_size, "requested calibration profile absent, using nearest");
        }

        self.profiles
            .iter()
            .min_by_key(|(size, _)| size.abs_diff(guild_size))
            .map(|(&size, calibration)| (size, calibration))
    }
}

// ============================================================================
// Global CSR calibration
// ============================================================================

/// CSR strategy axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsrStrategy {
    C,
    S,
    R,
}

impl CsrStrategy {
    pub const ALL: [CsrStrategy; 3] = [CsrStrategy::C, CsrStrategy::S, CsrStrategy::R];

    /// Raw score below which a strategy is "not high" without calibration
    fn fallback_threshold(&self) -> f64 {
        match self {
            CsrStrategy::C | CsrStrategy::S => 60.0,
            CsrStrategy::R => 50.0,
        }
    }
}

/// Percentile values for CSR strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrPercentileParams {
    #[serde(alias = "p01")]
    pub p1: f64,
    #[serde(alias = "p05")]
    pub p5: f64,
    pub p10: f64,
    pub p20: f64,
    pub p30: f64,
    pub p40: f64,
    pub p50: f64,
    pub p60: f64,
    pub p70: f64,
    pub p75: f64,
    pub p80: f64,
    pub p85: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub n_samples: usize,
}

impl CsrPercentileParams {
    pub fn from_breakpoints(values: [f64; 15], n_samples: usize) -> Self {
        let [p1, p5, p10, p20, p30, p40, p50, p60, p70, p75, p80, p85, p90, p95, p99] = values;
        Self {
            p1, p5, p10, p20, p30, p40, p50, p60, p70, p75, p80, p85, p90, p95, p99,
            method: Some("percentile".to_string()),
            n_samples,
        }
    }

    pub fn breakpoints(&self) -> [f64; 15] {
        [
            self.p1, self.p5, self.p10, self.p20, self.p30, self.p40, self.p50, self.p60,
            self.p70, self.p75, self.p80, self.p85, self.p90, self.p95, self.p99,
        ]
    }
}

/// CSR Calibration parameters (global, not tier-specific)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrCalibration {
    pub c: CsrPercentileParams,
    pub s: CsrPercentileParams,
    pub r: CsrPercentileParams,
}

impl CsrCalibration {
    /// Load CSR calibration from JSON file
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(path).map_err(|source| CalibrationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| CalibrationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), CalibrationError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| CalibrationError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        write_artifact(path, json)
    }

    pub fn strategy(&self, strategy: CsrStrategy) -> &CsrPercentileParams {
        match strategy {
            CsrStrategy::C => &self.c,
            CsrStrategy::S => &self.s,
            CsrStrategy::R => &self.r,
        }
    }
}

/// Convert raw CSR score to percentile using global calibration
///
/// Unlike guild metrics (tier-stratified), CSR uses GLOBAL percentiles
/// because conflicts are within-guild comparisons, not cross-guild.
/// Without calibration: 100 at or above the fixed threshold, else 50.
pub fn csr_to_percentile(
    raw_value: f64,
    strategy: CsrStrategy,
    csr_calibration: Option<&CsrCalibration>,
) -> f64 {
    let Some(csr_cal) = csr_calibration else {
        return if raw_value >= strategy.fallback_threshold() { 100.0 } else { 50.0 };
    };

    let values = csr_cal.strategy(strategy).breakpoints();
    interpolate_percentile(&CSR_PERCENTILE_LEVELS, &values, raw_value)
}
