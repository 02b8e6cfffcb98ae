//! METRIC N4: GROWTH STRATEGY CONFLICTS (CSR)
//!
//! Scores ecological incompatibility based on Grime's CSR strategy conflicts.
//! Detects 4 types of conflicts (C-C, C-S, C-R, R-R) with context-specific
//! modulation based on growth form, height, and light preference.
//!
//! A strategy counts as "high" when its GLOBAL CSR percentile exceeds 75.
//! The resulting conflict density is later normalized with the TIER-specific
//! calibration like every other metric.
//!
//! Missing CSR values make a strategy "not high". A missing height leaves the
//! base severity unmodulated; a missing light preference counts as flexible.

use crate::data::GuildMembers;
use crate::model::Plant;
use crate::utils::normalization::{csr_to_percentile, CsrCalibration, CsrStrategy, CSR_HIGH_PERCENTILE};
use serde::Serialize;

/// Conflicts at or below this severity are not listed as evidence
const EVIDENCE_SEVERITY_THRESHOLD: f64 = 0.2;

const SHADE_LIGHT_MAX: f64 = 3.2;
const SUN_LIGHT_MIN: f64 = 7.47;

/// Pairing of high strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConflictKind {
    #[serde(rename = "C-C")]
    CompetitorCompetitor,
    #[serde(rename = "C-S")]
    CompetitorStressTolerator,
    #[serde(rename = "C-R")]
    CompetitorRuderal,
    #[serde(rename = "R-R")]
    RuderalRuderal,
}

/// One conflict above the evidence threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsrConflict {
    pub kind: ConflictKind,
    pub severity: f64,
    pub plant_a: String,
    pub plant_b: String,
}

/// Per-plant CSR data for the breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantCsrProfile {
    pub plant_id: String,
    pub plant_name: String,
    pub c_raw: Option<f64>,
    pub s_raw: Option<f64>,
    pub r_raw: Option<f64>,
    pub c_percentile: Option<f64>,
    pub s_percentile: Option<f64>,
    pub r_percentile: Option<f64>,
    pub dominant_strategy: String,
}

/// Result of N4 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct N4Result {
    /// Conflict density (calibration key "n4")
    pub raw: f64,
    /// Total raw conflicts before density normalization
    pub total_conflicts: f64,
    pub high_c_count: usize,
    pub high_s_count: usize,
    pub high_r_count: usize,
    /// Conflicts with severity > 0.2, in detection order
    pub conflicts: Vec<CsrConflict>,
    pub plant_csr: Vec<PlantCsrProfile>,
}

struct CsrRow<'a> {
    index: usize,
    plant: &'a Plant,
    c_percentile: Option<f64>,
    s_percentile: Option<f64>,
    r_percentile: Option<f64>,
}

fn is_high(percentile: Option<f64>) -> bool {
    percentile.map_or(false, |p| p > CSR_HIGH_PERCENTILE)
}

/// Calculate N4: CSR conflict density
pub fn calculate_n4(
    members: &GuildMembers<'_>,
    csr_calibration: Option<&CsrCalibration>,
) -> N4Result {
    let n_plants = members.len();

    let rows: Vec<CsrRow<'_>> = members
        .plants()
        .iter()
        .copied()
        .enumerate()
        .map(|(index, plant)| CsrRow {
            index,
            plant,
            c_percentile: plant.csr.c.map(|v| csr_to_percentile(v, CsrStrategy::C, csr_calibration)),
            s_percentile: plant.csr.s.map(|v| csr_to_percentile(v, CsrStrategy::S, csr_calibration)),
            r_percentile: plant.csr.r.map(|v| csr_to_percentile(v, CsrStrategy::R, csr_calibration)),
        })
        .collect();

    let high_c: Vec<&CsrRow<'_>> = rows.iter().filter(|r| is_high(r.c_percentile)).collect();
    let high_s: Vec<&CsrRow<'_>> = rows.iter().filter(|r| is_high(r.s_percentile)).collect();
    let high_r: Vec<&CsrRow<'_>> = rows.iter().filter(|r| is_high(r.r_percentile)).collect();

    let mut total_conflicts = 0.0;
    let mut conflicts = Vec::new();
    let mut record = |kind: ConflictKind, severity: f64, a: &Plant, b: &Plant| {
        total_conflicts += severity;
        if severity > EVIDENCE_SEVERITY_THRESHOLD {
            conflicts.push(CsrConflict {
                kind,
                severity,
                plant_a: a.scientific_name.clone(),
                plant_b: b.scientific_name.clone(),
            });
        }
    };

    // CONFLICT TYPE 1: C-C (each unordered pair)
    for (i, a) in high_c.iter().enumerate() {
        for b in &high_c[i + 1..] {
            record(ConflictKind::CompetitorCompetitor, c_c_conflict(a.plant, b.plant), a.plant, b.plant);
        }
    }

    // CONFLICT TYPE 2: C-S (every pair of distinct plants)
    for c in &high_c {
        for s in &high_s {
            if c.index != s.index {
                record(ConflictKind::CompetitorStressTolerator, c_s_conflict(c.plant, s.plant), c.plant, s.plant);
            }
        }
    }

    // CONFLICT TYPE 3: C-R (every pair of distinct plants)
    for c in &high_c {
        for r in &high_r {
            if c.index != r.index {
                record(ConflictKind::CompetitorRuderal, c_r_conflict(c.plant, r.plant), c.plant, r.plant);
            }
        }
    }

    // CONFLICT TYPE 4: R-R (each unordered pair, fixed low severity)
    for (i, a) in high_r.iter().enumerate() {
        for b in &high_r[i + 1..] {
            record(ConflictKind::RuderalRuderal, 0.3, a.plant, b.plant);
        }
    }

    let max_pairs = if n_plants > 1 { n_plants * (n_plants - 1) } else { 1 };
    let conflict_density = total_conflicts / max_pairs as f64;

    let plant_csr = rows
        .iter()
        .map(|row| PlantCsrProfile {
            plant_id: row.plant.id.clone(),
            plant_name: row.plant.scientific_name.clone(),
            c_raw: row.plant.csr.c,
            s_raw: row.plant.csr.s,
            r_raw: row.plant.csr.r,
            c_percentile: row.c_percentile,
            s_percentile: row.s_percentile,
            r_percentile: row.r_percentile,
            dominant_strategy: dominant_strategy(row.c_percentile, row.s_percentile, row.r_percentile),
        })
        .collect();

    N4Result {
        raw: conflict_density,
        total_conflicts,
        high_c_count: high_c.len(),
        high_s_count: high_s.len(),
        high_r_count: high_r.len(),
        conflicts,
        plant_csr,
    }
}

fn height_difference(a: &Plant, b: &Plant) -> Option<f64> {
    Some((a.height_m? - b.height_m?).abs())
}

fn is_climber(form: &str) -> bool {
    form.contains("vine") || form.contains("liana")
}

/// C-C conflict with growth form and height modulation
fn c_c_conflict(a: &Plant, b: &Plant) -> f64 {
    let base = 1.0;
    let form_a = a.growth_form_lower();
    let form_b = b.growth_form_lower();

    if (is_climber(&form_a) && form_b.contains("tree")) || (is_climber(&form_b) && form_a.contains("tree")) {
        // Vine can climb tree
        return base * 0.2;
    }
    if (form_a.contains("tree") && form_b.contains("herb")) || (form_b.contains("tree") && form_a.contains("herb")) {
        // Different vertical niches
        return base * 0.4;
    }

    match height_difference(a, b) {
        Some(diff) if diff < 2.0 => base,
        Some(diff) if diff < 5.0 => base * 0.6,
        Some(_) => base * 0.3,
        None => base,
    }
}

/// C-S conflict with light preference modulation
fn c_s_conflict(c: &Plant, s: &Plant) -> f64 {
    let base = 0.6;
    match s.light_pref {
        // Shade-adapted S wants to be under the C canopy
        Some(light) if light < SHADE_LIGHT_MAX => 0.0,
        // Sun-loving S will be shaded out
        Some(light) if light > SUN_LIGHT_MIN => 0.9,
        _ => match height_difference(c, s) {
            Some(diff) if diff > 8.0 => base * 0.3,
            _ => base,
        },
    }
}

/// C-R conflict with height modulation
fn c_r_conflict(c: &Plant, r: &Plant) -> f64 {
    let base = 0.8;
    match height_difference(c, r) {
        Some(diff) if diff > 5.0 => base * 0.3,
        _ => base,
    }
}

/// Dominant CSR strategy based on percentiles ("Mixed" when balanced)
fn dominant_strategy(c: Option<f64>, s: Option<f64>, r: Option<f64>) -> String {
    let (Some(c), Some(s), Some(r)) = (c, s, r) else {
        return "Unknown".to_string();
    };

    let max_pct = c.max(s).max(r);
    let min_pct = c.min(s).min(r);
    if max_pct - min_pct < 20.0 {
        return "Mixed".to_string();
    }

    let label = if c >= s && c >= r {
        if c > CSR_HIGH_PERCENTILE { "Competitive" } else { "C-leaning" }
    } else if s >= c && s >= r {
        if s > CSR_HIGH_PERCENTILE { "Stress-tolerant" } else { "S-leaning" }
    } else if r > CSR_HIGH_PERCENTILE {
        "Ruderal"
    } else {
        "R-leaning"
    };
    label.to_string()
}
