//! Climate compatibility filter
//!
//! Runs before any metric. The target tier's membership flag is the only
//! veto: a member outside the tier (or a missing tier column) fails the
//! guild closed. Extreme-sensitivity warnings and envelope overlap
//! advisories are informational and never veto.

use crate::data::GuildMembers;
use crate::model::{Plant, QuantileRange};
use crate::tier::ClimateTier;
use serde::Serialize;

/// Drought days (q95) above which a plant counts as drought-sensitive
const DROUGHT_SENSITIVE_DAYS: f64 = 100.0;
/// Frost days (q95) above which a plant counts as frost-sensitive
const FROST_SENSITIVE_DAYS: f64 = 50.0;
/// Share of members (percent) that triggers a sensitivity warning
const SENSITIVITY_SHARE_PCT: usize = 60;
/// Tolerated gap between coldest-month envelopes (°C)
const HARDINESS_TOLERANCE: f64 = 5.0;

/// Why a guild was vetoed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VetoReason {
    /// Requested IDs absent from the plant table
    UnknownPlants { plant_ids: Vec<String> },
    /// The data has no membership column for the tier
    MissingTierColumn { tier: ClimateTier },
    /// Members outside the target tier
    IncompatibleClimate { tier: ClimateTier, plants: Vec<String> },
}

impl VetoReason {
    pub fn message(&self) -> String {
        match self {
            VetoReason::UnknownPlants { plant_ids } => {
                format!("Plant data not found: {}", plant_ids.join(", "))
            }
            VetoReason::MissingTierColumn { tier } => {
                format!("Tier membership column '{}' missing from plant data", tier.column())
            }
            VetoReason::IncompatibleClimate { tier, plants } => format!(
                "{} not suited to {} climate",
                plants.join(", "),
                tier.display_name()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Drought,
    Frost,
}

/// Most members share an extreme-climate sensitivity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateWarning {
    pub sensitivity: Sensitivity,
    /// Percentage of members affected (rounded down)
    pub affected_pct: usize,
    pub plants: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeAxis {
    AnnualTemperature,
    ColdestMonth,
    AnnualPrecipitation,
}

/// Shared envelope along one climate axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeOverlap {
    pub axis: EnvelopeAxis,
    /// Highest member q05
    pub shared_min: f64,
    /// Lowest member q95
    pub shared_max: f64,
    /// shared_max − shared_min; negative when envelopes do not meet
    pub overlap: f64,
    /// Overlap below the axis tolerance
    pub advisory: Option<String>,
}

/// Outcome of the climate check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateCheck {
    pub tier: ClimateTier,
    pub veto: Option<VetoReason>,
    pub warnings: Vec<ClimateWarning>,
    pub envelope: Vec<EnvelopeOverlap>,
}

impl ClimateCheck {
    pub fn vetoed(tier: ClimateTier, reason: VetoReason) -> Self {
        Self {
            tier,
            veto: Some(reason),
            warnings: Vec::new(),
            envelope: Vec::new(),
        }
    }

    pub fn is_vetoed(&self) -> bool {
        self.veto.is_some()
    }

    /// Envelope advisories only
    pub fn advisories(&self) -> impl Iterator<Item = &str> + '_ {
        self.envelope.iter().filter_map(|e| e.advisory.as_deref())
    }
}

/// Check guild members against the target tier
///
/// `tier_column_present` reports whether the loaded plant table carries the
/// membership column for `tier`.
pub fn check_climate(
    members: &GuildMembers<'_>,
    tier: ClimateTier,
    tier_column_present: bool,
) -> ClimateCheck {
    if !tier_column_present {
        return ClimateCheck::vetoed(tier, VetoReason::MissingTierColumn { tier });
    }

    let outside: Vec<String> = members
        .plants()
        .iter()
        .filter(|p| !p.tiers.contains(tier))
        .map(|p| p.scientific_name.clone())
        .collect();
    if !outside.is_empty() {
        return ClimateCheck::vetoed(
            tier,
            VetoReason::IncompatibleClimate { tier, plants: outside },
        );
    }

    let plants = members.plants();
    let mut warnings = Vec::new();
    if let Some(w) = sensitivity_warning(plants, Sensitivity::Drought) {
        warnings.push(w);
    }
    if let Some(w) = sensitivity_warning(plants, Sensitivity::Frost) {
        warnings.push(w);
    }

    ClimateCheck {
        tier,
        veto: None,
        warnings,
        envelope: envelope_overlaps(plants),
    }
}

fn sensitivity_warning(plants: &[&Plant], sensitivity: Sensitivity) -> Option<ClimateWarning> {
    if plants.is_empty() {
        return None;
    }

    let affected: Vec<String> = plants
        .iter()
        .filter(|p| match sensitivity {
            Sensitivity::Drought => p
                .envelope
                .drought_days_q95
                .map_or(false, |days| days > DROUGHT_SENSITIVE_DAYS),
            Sensitivity::Frost => p
                .envelope
                .frost_days_q95
                .map_or(false, |days| days > FROST_SENSITIVE_DAYS),
        })
        .map(|p| p.scientific_name.clone())
        .collect();

    // affected / n ≥ 60%, in integers
    if affected.len() * 100 < plants.len() * SENSITIVITY_SHARE_PCT {
        return None;
    }

    let affected_pct = affected.len() * 100 / plants.len();
    let label = match sensitivity {
        Sensitivity::Drought => "drought",
        Sensitivity::Frost => "frost",
    };
    Some(ClimateWarning {
        sensitivity,
        affected_pct,
        message: format!("{}% of guild is {}-sensitive", affected_pct, label),
        plants: affected,
    })
}

fn envelope_overlaps(plants: &[&Plant]) -> Vec<EnvelopeOverlap> {
    [
        EnvelopeAxis::AnnualTemperature,
        EnvelopeAxis::ColdestMonth,
        EnvelopeAxis::AnnualPrecipitation,
    ]
    .into_iter()
    .filter_map(|axis| shared_envelope(plants, axis))
    .collect()
}

fn axis_range(plant: &Plant, axis: EnvelopeAxis) -> &QuantileRange {
    match axis {
        EnvelopeAxis::AnnualTemperature => &plant.envelope.annual_temp,
        EnvelopeAxis::ColdestMonth => &plant.envelope.coldest_month,
        EnvelopeAxis::AnnualPrecipitation => &plant.envelope.annual_precip,
    }
}

fn shared_envelope(plants: &[&Plant], axis: EnvelopeAxis) -> Option<EnvelopeOverlap> {
    let bounds: Vec<(f64, f64)> = plants
        .iter()
        .filter_map(|&p| axis_range(p, axis).bounds())
        .collect();
    if bounds.len() < 2 {
        return None;
    }

    let shared_min = bounds.iter().map(|b| b.0).fold(f64::NEG_INFINITY, f64::max);
    let shared_max = bounds.iter().map(|b| b.1).fold(f64::INFINITY, f64::min);
    let overlap = shared_max - shared_min;

    let advisory = match axis {
        EnvelopeAxis::AnnualTemperature if overlap < 0.0 => {
            Some(format!("No temperature overlap ({:.1}°C)", overlap))
        }
        EnvelopeAxis::ColdestMonth if overlap < -HARDINESS_TOLERANCE => {
            Some(format!("No hardiness overlap ({:.1}°C)", overlap))
        }
        EnvelopeAxis::AnnualPrecipitation if overlap < 0.0 => {
            Some(format!("No precipitation overlap ({:.0}mm)", overlap))
        }
        _ => None,
    };

    Some(EnvelopeOverlap {
        axis,
        shared_min,
        shared_max,
        overlap,
        advisory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClimateEnvelope;
    use approx::assert_relative_eq;

    const TIER: ClimateTier = ClimateTier::HumidTemperate;

    fn members(plants: &[Plant]) -> GuildMembers<'_> {
        GuildMembers::new(plants.iter().collect(), Vec::new())
    }

    fn sensitive(id: &str, drought: f64, frost: f64) -> Plant {
        Plant::new(id).in_tiers(&[TIER]).with_envelope(ClimateEnvelope {
            drought_days_q95: Some(drought),
            frost_days_q95: Some(frost),
            ..Default::default()
        })
    }

    #[test]
    fn test_member_outside_tier_vetoes() {
        let plants = [
            Plant::new("a").in_tiers(&[TIER]),
            Plant::new("b").with_name("Opuntia").in_tiers(&[ClimateTier::Arid]),
        ];
        let check = check_climate(&members(&plants), TIER, true);
        assert_eq!(
            check.veto,
            Some(VetoReason::IncompatibleClimate { tier: TIER, plants: vec!["Opuntia".into()] })
        );
    }

    #[test]
    fn test_missing_tier_column_vetoes() {
        let plants = [Plant::new("a").in_tiers(&[TIER]), Plant::new("b").in_tiers(&[TIER])];
        let check = check_climate(&members(&plants), TIER, false);
        assert_eq!(check.veto, Some(VetoReason::MissingTierColumn { tier: TIER }));
        assert!(check.veto.as_ref().map_or(false, |v| v.message().contains("tier_3")));
    }

    #[test]
    fn test_sensitivity_threshold_is_inclusive() {
        // 3 of 5 drought-sensitive = 60%
        let plants = [
            sensitive("a", 150.0, 0.0),
            sensitive("b", 120.0, 0.0),
            sensitive("c", 101.0, 60.0),
            sensitive("d", 100.0, 0.0),
            sensitive("e", 10.0, 0.0),
        ];
        let check = check_climate(&members(&plants), TIER, true);
        assert!(!check.is_vetoed());
        assert_eq!(check.warnings.len(), 1);
        assert_eq!(check.warnings[0].sensitivity, Sensitivity::Drought);
        assert_eq!(check.warnings[0].affected_pct, 60);
        assert_eq!(check.warnings[0].message, "60% of guild is drought-sensitive");
    }

    #[test]
    fn test_envelope_advisories_do_not_veto() {
        let plants = [
            Plant::new("a").in_tiers(&[TIER]).with_envelope(ClimateEnvelope {
                annual_temp: QuantileRange::new(5.0, 10.0),
                coldest_month: QuantileRange::new(-10.0, -2.0),
                annual_precip: QuantileRange::new(400.0, 900.0),
                ..Default::default()
            }),
            Plant::new("b").in_tiers(&[TIER]).with_envelope(ClimateEnvelope {
                annual_temp: QuantileRange::new(12.0, 20.0),
                coldest_month: QuantileRange::new(1.0, 8.0),
                annual_precip: QuantileRange::new(800.0, 1500.0),
                ..Default::default()
            }),
        ];
        let check = check_climate(&members(&plants), TIER, true);

        assert!(!check.is_vetoed());
        assert_eq!(check.envelope.len(), 3);
        assert_relative_eq!(check.envelope[0].overlap, -2.0);
        // hardiness gap of 3°C is within tolerance
        assert_relative_eq!(check.envelope[1].overlap, -3.0);
        assert!(check.envelope[1].advisory.is_none());
        assert_relative_eq!(check.envelope[2].overlap, 100.0);
        assert_eq!(check.advisories().collect::<Vec<_>>(), vec!["No temperature overlap (-2.0°C)"]);
    }
}
