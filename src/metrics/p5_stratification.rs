//! METRIC P5: STRUCTURAL STRATIFICATION
//!
//! Scores vertical stratification quality and growth form diversity.
//! Validates that height differences are compatible with light preferences:
//! a plant growing under a much taller neighbour must tolerate shade.
//!
//!   quality = valid / (valid + invalid)   (0 when no layered pair exists)
//!   forms   = min(1, (distinct growth forms − 1) / 5)
//!   raw     = 0.7 × quality + 0.3 × forms

use crate::data::GuildMembers;
use crate::model::Plant;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::cmp::Ordering;

/// Height difference marking separate canopy layers (m)
const LAYER_GAP_M: f64 = 2.0;
/// EIVE-L below this is shade-tolerant
const SHADE_TOLERANT_MAX: f64 = 3.2;
/// EIVE-L above this is sun-loving
const SUN_LOVING_MIN: f64 = 7.47;
const FLEXIBLE_WEIGHT: f64 = 0.6;
const UNKNOWN_LIGHT_WEIGHT: f64 = 0.5;
const MAX_EXTRA_FORMS: f64 = 5.0;

const QUALITY_WEIGHT: f64 = 0.7;
const FORM_WEIGHT: f64 = 0.3;

/// Plant with height and light preference information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantHeight {
    pub name: String,
    pub height_m: f64,
    pub light_pref: Option<f64>,
}

/// Growth form group with plants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthFormGroup {
    pub form_name: String,
    pub plants: Vec<PlantHeight>,
    pub height_range: (f64, f64),
}

/// Result of P5 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P5Result {
    /// Combined stratification + form diversity (calibration key "p5")
    pub raw: f64,
    pub stratification_quality: f64,
    pub form_diversity: f64,
    pub valid_stratification: f64,
    pub invalid_stratification: f64,
    /// Tallest minus shortest member with a height (m)
    pub height_range: f64,
    pub n_forms: usize,
    /// Members grouped by growth form, shortest group first
    pub growth_form_groups: Vec<GrowthFormGroup>,
}

/// Calculate P5: Structural stratification
pub fn calculate_p5(members: &GuildMembers<'_>) -> P5Result {
    // Members with a height, shortest first
    let mut by_height: Vec<(&Plant, f64)> = members
        .plants()
        .iter()
        .filter_map(|&p| p.height_m.map(|h| (p, h)))
        .collect();
    by_height.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut valid = 0.0;
    let mut invalid = 0.0;

    for (i, &(short, short_height)) in by_height.iter().enumerate() {
        for &(_, tall_height) in &by_height[i + 1..] {
            let height_diff = tall_height - short_height;
            if height_diff <= LAYER_GAP_M {
                continue;
            }
            match short.light_pref {
                None => valid += height_diff * UNKNOWN_LIGHT_WEIGHT,
                Some(light) if light < SHADE_TOLERANT_MAX => valid += height_diff,
                Some(light) if light > SUN_LOVING_MIN => invalid += height_diff,
                Some(_) => valid += height_diff * FLEXIBLE_WEIGHT,
            }
        }
    }

    let total = valid + invalid;
    let stratification_quality = if total > 0.0 { valid / total } else { 0.0 };

    let forms: FxHashSet<String> = members
        .plants()
        .iter()
        .map(|p| p.growth_form_lower())
        .filter(|form| !form.is_empty())
        .collect();
    let n_forms = forms.len();
    let form_diversity = (n_forms.saturating_sub(1) as f64 / MAX_EXTRA_FORMS).min(1.0);

    let height_range = match (by_height.first(), by_height.last()) {
        (Some(&(_, lo)), Some(&(_, hi))) => hi - lo,
        _ => 0.0,
    };

    P5Result {
        raw: QUALITY_WEIGHT * stratification_quality + FORM_WEIGHT * form_diversity,
        stratification_quality,
        form_diversity,
        valid_stratification: valid,
        invalid_stratification: invalid,
        height_range,
        n_forms,
        growth_form_groups: growth_form_groups(&by_height),
    }
}

/// Group members with a height and a growth form by (lowercased) form
fn growth_form_groups(by_height: &[(&Plant, f64)]) -> Vec<GrowthFormGroup> {
    let mut groups: Vec<GrowthFormGroup> = Vec::new();

    for &(plant, height_m) in by_height {
        let form = plant.growth_form_lower();
        if form.is_empty() {
            continue;
        }
        let entry = PlantHeight {
            name: plant.scientific_name.clone(),
            height_m,
            light_pref: plant.light_pref,
        };
        match groups.iter_mut().find(|g| g.form_name == form) {
            Some(group) => {
                group.height_range.1 = group.height_range.1.max(height_m);
                group.plants.push(entry);
            }
            None => groups.push(GrowthFormGroup {
                form_name: form,
                plants: vec![entry],
                height_range: (height_m, height_m),
            }),
        }
    }

    // Input is sorted by height, so groups already appear by minimum height
    groups.sort_by(|a, b| {
        a.height_range
            .0
            .partial_cmp(&b.height_range.0)
            .unwrap_or(Ordering::Equal)
    });
    groups
}
