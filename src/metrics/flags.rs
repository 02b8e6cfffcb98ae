//! FLAGS N5 / N6: NITROGEN FIXATION AND SOIL pH
//!
//! Non-ranked guild flags. They are reported with the score but never
//! calibrated and never enter the overall mean.

use crate::data::GuildMembers;
use serde::Serialize;

/// pH span above which members are flagged as incompatible
const PH_COMPATIBLE_RANGE: f64 = 1.5;

/// N5 status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NitrogenStatus {
    Present,
    Missing,
}

/// N5: Nitrogen fixation flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NitrogenFlag {
    pub status: NitrogenStatus,
    /// Members rated High or Moderate-High
    pub fixers: Vec<String>,
}

impl NitrogenFlag {
    pub fn label(&self) -> &'static str {
        match self.status {
            NitrogenStatus::Present => "Present",
            NitrogenStatus::Missing => "Missing",
        }
    }
}

/// N6: Soil pH compatibility flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilPhFlag {
    pub label: String,
    pub min_ph: Option<f64>,
    pub max_ph: Option<f64>,
    /// False when the span exceeds 1.5 pH units
    pub compatible: bool,
}

/// Calculate N5: at least one active nitrogen fixer in the guild
pub fn calculate_n5(members: &GuildMembers<'_>) -> NitrogenFlag {
    let fixers: Vec<String> = members
        .plants()
        .iter()
        .filter(|p| p.nitrogen_fixation.map_or(false, |rating| rating.is_active_fixer()))
        .map(|p| p.scientific_name.clone())
        .collect();

    let status = if fixers.is_empty() {
        NitrogenStatus::Missing
    } else {
        NitrogenStatus::Present
    };

    NitrogenFlag { status, fixers }
}

/// Calculate N6: pH span of members with a pH value
pub fn calculate_n6(members: &GuildMembers<'_>) -> SoilPhFlag {
    let values: Vec<f64> = members.plants().iter().filter_map(|p| p.soil_ph).collect();

    let Some(min_ph) = values.iter().copied().reduce(f64::min) else {
        return SoilPhFlag {
            label: "No pH data".to_string(),
            min_ph: None,
            max_ph: None,
            compatible: true,
        };
    };
    let max_ph = values.iter().copied().fold(min_ph, f64::max);

    let compatible = max_ph - min_ph <= PH_COMPATIBLE_RANGE;
    let label = if compatible {
        format!("{:.1}-{:.1}", min_ph, max_ph)
    } else {
        format!("{:.1}-{:.1} (Incompatible)", min_ph, max_ph)
    };

    SoilPhFlag {
        label,
        min_ph: Some(min_ph),
        max_ph: Some(max_ph),
        compatible,
    }
}
