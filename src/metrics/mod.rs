//! Metric modules for guild scoring
//!
//! Each metric is implemented in its own module. Negative metrics (N1, N2, N4)
//! measure shared risk and are displayed inverted; positive metrics (P1–P6)
//! measure benefit. N5 and N6 are flags and never enter the overall score.
//!
//! Metric computers only produce raw values and evidence; normalization to
//! percentiles happens in the scorer so the calibrator can reuse this exact
//! code path.

pub mod flags;
pub mod n1_pathogen_fungi;
pub mod n2_herbivore_overlap;
pub mod n4_csr_conflicts;
pub mod p1_biocontrol;
pub mod p2_disease_control;
pub mod p3_beneficial_fungi;
pub mod p4_phylo_diversity;
pub mod p5_stratification;
pub mod p6_pollinators;

pub use flags::{calculate_n5, calculate_n6, NitrogenFlag, SoilPhFlag};
pub use n1_pathogen_fungi::{calculate_n1, N1Result};
pub use n2_herbivore_overlap::{calculate_n2, N2Result};
pub use n4_csr_conflicts::{calculate_n4, N4Result};
pub use p1_biocontrol::{calculate_p1, P1Result};
pub use p2_disease_control::{calculate_p2, P2Result};
pub use p3_beneficial_fungi::{calculate_p3, P3Result};
pub use p4_phylo_diversity::{calculate_p4, P4Result};
pub use p5_stratification::{calculate_p5, P5Result};
pub use p6_pollinators::{calculate_p6, P6Result};

use crate::data::GuildMembers;
use crate::model::RelationshipTables;
use crate::utils::normalization::CsrCalibration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calibrated metric identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKey {
    N1,
    N2,
    N4,
    P1,
    P2,
    P3,
    P4,
    P5,
    P6,
}

/// Whether a high raw value is bad (risk) or good (benefit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Risk,
    Benefit,
}

impl MetricKey {
    pub const ALL: [MetricKey; 9] = [
        MetricKey::N1,
        MetricKey::N2,
        MetricKey::N4,
        MetricKey::P1,
        MetricKey::P2,
        MetricKey::P3,
        MetricKey::P4,
        MetricKey::P5,
        MetricKey::P6,
    ];

    /// Key used in calibration artifacts
    pub fn code(&self) -> &'static str {
        match self {
            MetricKey::N1 => "n1",
            MetricKey::N2 => "n2",
            MetricKey::N4 => "n4",
            MetricKey::P1 => "p1",
            MetricKey::P2 => "p2",
            MetricKey::P3 => "p3",
            MetricKey::P4 => "p4",
            MetricKey::P5 => "p5",
            MetricKey::P6 => "p6",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MetricKey::N1 => "Pathogen fungi overlap",
            MetricKey::N2 => "Herbivore overlap",
            MetricKey::N4 => "Growth strategy conflict",
            MetricKey::P1 => "Insect biocontrol",
            MetricKey::P2 => "Disease control",
            MetricKey::P3 => "Beneficial fungi network",
            MetricKey::P4 => "Phylogenetic diversity",
            MetricKey::P5 => "Structural stratification",
            MetricKey::P6 => "Shared pollinators",
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            MetricKey::N1 | MetricKey::N2 | MetricKey::N4 => Polarity::Risk,
            MetricKey::P1
            | MetricKey::P2
            | MetricKey::P3
            | MetricKey::P4
            | MetricKey::P5
            | MetricKey::P6 => Polarity::Benefit,
        }
    }

    /// Display score: risk metrics shown as 100 − percentile
    pub fn display_score(&self, percentile: f64) -> f64 {
        match self.polarity() {
            Polarity::Risk => 100.0 - percentile,
            Polarity::Benefit => percentile,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Raw scores for all 9 calibrated metrics (unnormalized)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RawScores {
    pub n1: f64,
    pub n2: f64,
    pub n4: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    pub p5: f64,
    pub p6: f64,
}

impl RawScores {
    pub fn get(&self, key: MetricKey) -> f64 {
        match key {
            MetricKey::N1 => self.n1,
            MetricKey::N2 => self.n2,
            MetricKey::N4 => self.n4,
            MetricKey::P1 => self.p1,
            MetricKey::P2 => self.p2,
            MetricKey::P3 => self.p3,
            MetricKey::P4 => self.p4,
            MetricKey::P5 => self.p5,
            MetricKey::P6 => self.p6,
        }
    }
}

/// Results of the negative stage (risk metrics and flags)
#[derive(Debug, Clone, Serialize)]
pub struct NegativeMetrics {
    pub n1: N1Result,
    pub n2: N2Result,
    pub n4: N4Result,
    pub n5: NitrogenFlag,
    pub n6: SoilPhFlag,
}

/// Results of the positive stage (benefit metrics)
#[derive(Debug, Clone, Serialize)]
pub struct PositiveMetrics {
    pub p1: P1Result,
    pub p2: P2Result,
    pub p3: P3Result,
    pub p4: P4Result,
    pub p5: P5Result,
    pub p6: P6Result,
}

/// N1, N2, N4 plus the N5/N6 flags
pub fn compute_negative(
    members: &GuildMembers<'_>,
    csr_calibration: Option<&CsrCalibration>,
) -> NegativeMetrics {
    NegativeMetrics {
        n1: calculate_n1(members),
        n2: calculate_n2(members),
        n4: calculate_n4(members, csr_calibration),
        n5: calculate_n5(members),
        n6: calculate_n6(members),
    }
}

/// P1 through P6
pub fn compute_positive(
    members: &GuildMembers<'_>,
    relationships: &RelationshipTables,
) -> PositiveMetrics {
    PositiveMetrics {
        p1: calculate_p1(members, relationships),
        p2: calculate_p2(members, relationships),
        p3: calculate_p3(members),
        p4: calculate_p4(members),
        p5: calculate_p5(members),
        p6: calculate_p6(members),
    }
}

/// Raw values of all calibrated metrics (shared by scorer and calibrator)
pub fn raw_scores(negative: &NegativeMetrics, positive: &PositiveMetrics) -> RawScores {
    RawScores {
        n1: negative.n1.raw,
        n2: negative.n2.raw,
        n4: negative.n4.raw,
        p1: positive.p1.raw,
        p2: positive.p2.raw,
        p3: positive.p3.raw,
        p4: positive.p4.raw,
        p5: positive.p5.raw,
        p6: positive.p6.raw,
    }
}

/// Compute raw scores for calibration (no normalization)
pub fn compute_raw_scores(
    members: &GuildMembers<'_>,
    relationships: &RelationshipTables,
    csr_calibration: Option<&CsrCalibration>,
) -> RawScores {
    let negative = compute_negative(members, csr_calibration);
    let positive = compute_positive(members, relationships);
    raw_scores(&negative, &positive)
}
