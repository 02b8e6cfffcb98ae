//! METRIC P2: CROSS-PLANT DISEASE CONTROL
//!
//! Mirrors P1 for fungal disease: plant A is vulnerable when it hosts
//! pathogenic fungi, plant B is protective when it hosts mycoparasites.
//!
//! Mechanisms per ordered pair:
//!   1. Known antagonist of an A pathogen lives on B (1.0 per match, rare)
//!   2. General mycoparasites on B (1.0 per fungus, primary mechanism)
//!
//!   raw = total / (n × (n − 1)) × 10
//!
//! Most guilds score 0 here; the calibration breakpoints carry that mass.

use crate::data::GuildMembers;
use crate::model::{OrganismKind, RelationshipTables};
use serde::Serialize;

const SPECIFIC_MATCH_WEIGHT: f64 = 1.0;
const GENERAL_MYCOPARASITE_WEIGHT: f64 = 1.0;
const PAIR_GAIN: f64 = 10.0;

/// Result of P2 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P2Result {
    /// Pair-normalized disease control (calibration key "p2")
    pub raw: f64,
    /// tanh(raw)
    pub saturated: f64,
    pub pathogen_control_total: f64,
    pub specific_antagonist_matches: usize,
    /// Pairs contributing general mycoparasite protection
    pub general_mechanisms: usize,
    /// Matched (pathogen, antagonist) pairs, sorted and deduplicated
    pub matched_antagonist_pairs: Vec<(String, String)>,
    /// Mycoparasites present in the guild
    pub mycoparasites: Vec<String>,
}

/// Calculate P2: Cross-plant disease control
pub fn calculate_p2(members: &GuildMembers<'_>, relationships: &RelationshipTables) -> P2Result {
    let n_plants = members.len();
    if n_plants < 2 {
        return P2Result::default();
    }

    let mut result = P2Result::default();
    let mut total = 0.0;

    for a in 0..n_plants {
        let pathogens_a = members.organisms(a, OrganismKind::PathogenicFungi);
        if pathogens_a.is_empty() {
            continue;
        }

        for b in (0..n_plants).filter(|&b| b != a) {
            let mycoparasites_b = members.organisms(b, OrganismKind::MycoparasiteFungi);
            if mycoparasites_b.is_empty() {
                continue;
            }

            for pathogen in pathogens_a.iter() {
                if let Some(antagonists) = relationships.pathogen_antagonists.get(pathogen) {
                    for antagonist in mycoparasites_b.intersection(antagonists) {
                        total += SPECIFIC_MATCH_WEIGHT;
                        result.specific_antagonist_matches += 1;
                        result
                            .matched_antagonist_pairs
                            .push((pathogen.to_string(), antagonist.to_string()));
                    }
                }
            }

            total += mycoparasites_b.len() as f64 * GENERAL_MYCOPARASITE_WEIGHT;
            result.general_mechanisms += 1;
        }
    }

    let max_pairs = (n_plants * (n_plants - 1)) as f64;
    result.raw = total / max_pairs * PAIR_GAIN;
    result.saturated = result.raw.tanh();
    result.pathogen_control_total = total;

    result.matched_antagonist_pairs.sort_unstable();
    result.matched_antagonist_pairs.dedup();

    let mut mycoparasites: Vec<String> = (0..n_plants)
        .flat_map(|idx| members.organisms(idx, OrganismKind::MycoparasiteFungi).iter())
        .map(str::to_string)
        .collect();
    mycoparasites.sort_unstable();
    mycoparasites.dedup();
    result.mycoparasites = mycoparasites;

    result
}
