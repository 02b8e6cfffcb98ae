//! Offline percentile calibration
//!
//! Stage per guild size: for each climate tier, sample random guilds from the
//! tier's plants, compute raw metrics through the scorer's own code path, and
//! reduce each metric to 13 breakpoints plus mean/std. Sampling is serial on a
//! seeded RNG so a (seed, data) pair always yields the same artifact; scoring
//! runs on the rayon pool.
//!
//! A separate job derives the global CSR breakpoints over all plants with
//! complete C/S/R values.

use crate::data::GuildData;
use crate::metrics::{compute_raw_scores, MetricKey, RawScores};
use crate::tier::ClimateTier;
use crate::utils::normalization::{
    Calibration, CsrCalibration, CsrPercentileParams, CsrStrategy, PercentileParams,
    TierCalibration, CSR_PERCENTILE_LEVELS, PERCENTILE_LEVELS,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::time::Instant;

pub const DEFAULT_SAMPLES_PER_TIER: usize = 20_000;
pub const DEFAULT_SEED: u64 = 42;

/// Linear-interpolated percentile of sorted values (numpy "linear")
pub fn linear_percentile(sorted: &[f64], percentile: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = percentile / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let fraction = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * fraction
        }
    }
}

/// Sorted finite values (NaN dropped)
fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Breakpoints, mean and population std of one metric's samples
pub fn summarize(values: &[f64]) -> Option<PercentileParams> {
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return None;
    }

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let breakpoints = PERCENTILE_LEVELS.map(|level| linear_percentile(&sorted, level));
    Some(PercentileParams::from_breakpoints(
        breakpoints,
        mean,
        variance.sqrt(),
        sorted.len(),
    ))
}

/// Calibrator over loaded guild data
pub struct Calibrator<'a> {
    data: &'a GuildData,
    csr_calibration: Option<&'a CsrCalibration>,
    samples_per_tier: usize,
    seed: u64,
}

impl<'a> Calibrator<'a> {
    pub fn new(data: &'a GuildData, csr_calibration: Option<&'a CsrCalibration>) -> Self {
        Self {
            data,
            csr_calibration,
            samples_per_tier: DEFAULT_SAMPLES_PER_TIER,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_samples(mut self, samples_per_tier: usize) -> Self {
        self.samples_per_tier = samples_per_tier;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Random guilds of `guild_size` distinct plants from the tier
    ///
    /// Empty when the tier has fewer plants than the guild size. Each
    /// (tier, size) stage has its own RNG stream derived from the seed.
    pub fn sample_guilds(&self, tier: ClimateTier, guild_size: usize) -> Vec<Vec<String>> {
        let plants = self.data.plants_in_tier(tier);
        if guild_size == 0 || plants.len() < guild_size {
            return Vec::new();
        }

        let stream = (guild_size as u64) << 8 | tier.index() as u64;
        let mut rng = StdRng::seed_from_u64(self.seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));

        (0..self.samples_per_tier)
            .map(|_| {
                plants
                    .choose_multiple(&mut rng, guild_size)
                    .map(|id| id.to_string())
                    .collect()
            })
            .collect()
    }

    /// Raw scores of sampled guilds, in sample order
    pub fn raw_scores(&self, guilds: &[Vec<String>]) -> Vec<RawScores> {
        let relationships = self.data.relationships();
        guilds
            .par_iter()
            .filter_map(|guild| {
                let members = self.data.members(guild).ok()?;
                Some(compute_raw_scores(&members, relationships, self.csr_calibration))
            })
            .collect()
    }

    /// Breakpoints for every metric of one tier
    pub fn calibrate_tier(&self, tier: ClimateTier, guild_size: usize) -> Option<TierCalibration> {
        let guilds = self.sample_guilds(tier, guild_size);
        if guilds.is_empty() {
            tracing::warn!(
                tier = %tier,
                guild_size,
                available = self.data.plants_in_tier(tier).len(),
                "skipping tier: insufficient plants"
            );
            return None;
        }

        let start = Instant::now();
        let scores = self.raw_scores(&guilds);
        tracing::info!(
            tier = %tier,
            guild_size,
            sampled = guilds.len(),
            scored = scores.len(),
            elapsed_s = start.elapsed().as_secs_f64(),
            "tier scored"
        );

        let mut tier_calibration = TierCalibration::default();
        for key in MetricKey::ALL {
            let values: Vec<f64> = scores.iter().map(|s| s.get(key)).collect();
            if let Some(params) = summarize(&values) {
                tier_calibration.set(key, params);
            }
        }
        Some(tier_calibration)
    }

    /// One calibration stage: all tiers at a single guild size
    pub fn calibrate(&self, guild_size: usize) -> Calibration {
        let mut calibration = Calibration::new();
        for tier in ClimateTier::ALL {
            if let Some(tier_calibration) = self.calibrate_tier(tier, guild_size) {
                calibration.insert(tier, tier_calibration);
            }
        }
        calibration
    }
}

/// Global C/S/R breakpoints over plants with complete CSR values
pub fn calibrate_csr(data: &GuildData) -> Option<CsrCalibration> {
    let complete: Vec<_> = data.plants().filter(|p| p.csr.is_complete()).collect();
    if complete.is_empty() {
        return None;
    }

    let params = |strategy: CsrStrategy| {
        let values: Vec<f64> = complete
            .iter()
            .filter_map(|p| match strategy {
                CsrStrategy::C => p.csr.c,
                CsrStrategy::S => p.csr.s,
                CsrStrategy::R => p.csr.r,
            })
            .collect();
        let sorted = sorted_finite(&values);
        let breakpoints = CSR_PERCENTILE_LEVELS.map(|level| linear_percentile(&sorted, level));
        CsrPercentileParams::from_breakpoints(breakpoints, sorted.len())
    };

    tracing::info!(plants = complete.len(), "CSR calibration computed");
    Some(CsrCalibration {
        c: params(CsrStrategy::C),
        s: params(CsrStrategy::S),
        r: params(CsrStrategy::R),
    })
}
