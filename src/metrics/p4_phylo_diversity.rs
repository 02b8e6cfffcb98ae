//! METRIC P4: PHYLOGENETIC DIVERSITY
//!
//! Mean pairwise Euclidean distance between members' phylogenetic
//! eigenvectors (all dimensions). Distant lineages share fewer pests and
//! pathogens, so a larger spread is a benefit.

use crate::data::GuildMembers;
use serde::Serialize;

/// Result of P4 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P4Result {
    /// Mean pairwise distance (calibration key "p4")
    pub raw: f64,
    /// Members with a usable phylogenetic vector
    pub plants_with_vectors: usize,
    pub pairs_compared: usize,
    pub max_distance: f64,
}

/// Calculate P4: Phylogenetic diversity
///
/// Members without a vector are skipped; pairs whose vectors differ in
/// length are not compared.
pub fn calculate_p4(members: &GuildMembers<'_>) -> P4Result {
    let vectors: Vec<&[f64]> = members
        .plants()
        .iter()
        .filter_map(|p| p.phylo_vector.as_deref())
        .filter(|v| !v.is_empty())
        .collect();

    let mut total = 0.0;
    let mut pairs_compared = 0;
    let mut max_distance: f64 = 0.0;

    for (i, a) in vectors.iter().enumerate() {
        for b in &vectors[i + 1..] {
            if a.len() != b.len() {
                continue;
            }
            let distance = euclidean_distance(a, b);
            total += distance;
            max_distance = max_distance.max(distance);
            pairs_compared += 1;
        }
    }

    let raw = if pairs_compared > 0 {
        total / pairs_compared as f64
    } else {
        0.0
    };

    P4Result {
        raw,
        plants_with_vectors: vectors.len(),
        pairs_compared,
        max_distance,
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
