//! METRIC P1: CROSS-PLANT INSECT BIOCONTROL
//!
//! Scores natural pest control provided by predators and entomopathogenic
//! fungi. Uses pairwise analysis over ordered pairs (A, B): plant A is the
//! vulnerable plant (it has herbivores), plant B the protective one.
//!
//! Mechanisms per ordered pair:
//!   1. Known predator of an A herbivore visits B (weight 1.0 per match)
//!   2. Known entomopathogenic fungus of an A herbivore lives on B (1.0 per match)
//!   3. General entomopathogenic fungi on B (0.2 per fungus)
//!
//!   raw = total / (n × (n − 1)) × 20
//!
//! The raw value is the calibration key; `saturated` is tanh(raw).

use crate::data::GuildMembers;
use crate::model::{OrganismKind, OrganismSet, RelationshipTables};
use serde::Serialize;

const SPECIFIC_MATCH_WEIGHT: f64 = 1.0;
const GENERAL_FUNGI_WEIGHT: f64 = 0.2;
const PAIR_GAIN: f64 = 20.0;

/// Visitor columns on the protective plant; predator associates are added on top
const VISITOR_KINDS: [OrganismKind; 2] = [OrganismKind::FlowerVisitors, OrganismKind::Pollinators];

/// Result of P1 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P1Result {
    /// Pair-normalized biocontrol (calibration key "p1")
    pub raw: f64,
    /// tanh(raw)
    pub saturated: f64,
    /// Total before pair normalization
    pub biocontrol_total: f64,
    /// Herbivore/predator-pair hits across all ordered pairs
    pub specific_predator_matches: usize,
    pub specific_fungi_matches: usize,
    /// Matched (herbivore, predator) pairs, sorted and deduplicated
    pub matched_predator_pairs: Vec<(String, String)>,
    /// Matched (herbivore, fungus) pairs, sorted and deduplicated
    pub matched_fungi_pairs: Vec<(String, String)>,
}

/// Calculate P1: Cross-plant insect biocontrol
pub fn calculate_p1(members: &GuildMembers<'_>, relationships: &RelationshipTables) -> P1Result {
    let n_plants = members.len();
    if n_plants < 2 {
        return P1Result::default();
    }

    // Predator hosts per plant (union of visitor and predator columns)
    let predator_hosts: Vec<OrganismSet> = (0..n_plants)
        .map(|idx| {
            OrganismSet::new(
                VISITOR_KINDS
                    .iter()
                    .chain(OrganismKind::PREDATOR_ASSOCIATES.iter())
                    .flat_map(|&kind| members.organisms(idx, kind).iter()),
            )
        })
        .collect();

    let mut result = P1Result::default();
    let mut total = 0.0;

    for a in 0..n_plants {
        let herbivores_a = members.organisms(a, OrganismKind::Herbivores);
        if herbivores_a.is_empty() {
            continue;
        }

        for b in (0..n_plants).filter(|&b| b != a) {
            let predators_b = &predator_hosts[b];
            let entomo_b = members.organisms(b, OrganismKind::EntomopathogenicFungi);

            for herbivore in herbivores_a.iter() {
                if let Some(known_predators) = relationships.herbivore_predators.get(herbivore) {
                    for predator in predators_b.intersection(known_predators) {
                        total += SPECIFIC_MATCH_WEIGHT;
                        result.specific_predator_matches += 1;
                        result
                            .matched_predator_pairs
                            .push((herbivore.to_string(), predator.to_string()));
                    }
                }

                if entomo_b.is_empty() {
                    continue;
                }
                if let Some(known_parasites) = relationships.insect_parasites.get(herbivore) {
                    for fungus in entomo_b.intersection(known_parasites) {
                        total += SPECIFIC_MATCH_WEIGHT;
                        result.specific_fungi_matches += 1;
                        result
                            .matched_fungi_pairs
                            .push((herbivore.to_string(), fungus.to_string()));
                    }
                }
            }

            total += entomo_b.len() as f64 * GENERAL_FUNGI_WEIGHT;
        }
    }

    let max_pairs = (n_plants * (n_plants - 1)) as f64;
    result.raw = total / max_pairs * PAIR_GAIN;
    result.saturated = result.raw.tanh();
    result.biocontrol_total = total;

    result.matched_predator_pairs.sort_unstable();
    result.matched_predator_pairs.dedup();
    result.matched_fungi_pairs.sort_unstable();
    result.matched_fungi_pairs.dedup();

    result
}
