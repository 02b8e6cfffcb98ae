//! METRIC P3: BENEFICIAL FUNGI NETWORK
//!
//! Scores common mycorrhizal networks and individual fungal associations
//! (AMF, EMF, endophytic, saprotrophic):
//!
//!   network  = Σ count / n   over fungi shared by ≥ 2 members (linear)
//!   coverage = members with any beneficial fungus / n
//!   raw      = 0.6 × network + 0.4 × coverage

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use crate::utils::organism_counter::{
    count_shared_organisms, shared_organisms, sum_over_shared, SharedOrganism,
};
use serde::Serialize;

const NETWORK_WEIGHT: f64 = 0.6;
const COVERAGE_WEIGHT: f64 = 0.4;

/// Result of P3 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P3Result {
    /// Combined network + coverage score (calibration key "p3")
    pub raw: f64,
    pub network_score: f64,
    /// Fraction of members with beneficial fungi
    pub coverage_ratio: f64,
    pub plants_with_fungi: usize,
    /// Shared beneficial fungi, most shared first
    pub shared_fungi: Vec<SharedOrganism>,
}

/// Calculate P3: Beneficial fungi network
pub fn calculate_p3(members: &GuildMembers<'_>) -> P3Result {
    let n_plants = members.len();
    if n_plants == 0 {
        return P3Result::default();
    }

    let counts = count_shared_organisms(members, &OrganismKind::BENEFICIAL_FUNGI);
    let network_score = sum_over_shared(&counts, |_, count| count as f64 / n_plants as f64);

    let plants_with_fungi = (0..n_plants)
        .filter(|&idx| members.any_organisms(idx, &OrganismKind::BENEFICIAL_FUNGI))
        .count();
    let coverage_ratio = plants_with_fungi as f64 / n_plants as f64;

    P3Result {
        raw: network_score * NETWORK_WEIGHT + coverage_ratio * COVERAGE_WEIGHT,
        network_score,
        coverage_ratio,
        plants_with_fungi,
        shared_fungi: shared_organisms(&counts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrganismProfile, Plant};
    use approx::assert_relative_eq;

    #[test]
    fn test_network_and_coverage() {
        let plants = [Plant::new("a"), Plant::new("b"), Plant::new("c")];
        let profiles = [
            OrganismProfile::new("a")
                .with(OrganismKind::AmfFungi, ["glomus"])
                .with(OrganismKind::EndophyticFungi, ["epichloe"]),
            OrganismProfile::new("b")
                .with(OrganismKind::AmfFungi, ["glomus"])
                .with(OrganismKind::SaprotrophicFungi, ["epichloe"]),
            OrganismProfile::new("c"),
        ];
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());

        let result = calculate_p3(&members);

        // glomus 2/3 + epichloe 2/3 (shared across subtypes)
        assert_relative_eq!(result.network_score, 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.coverage_ratio, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.raw, 0.6 * 4.0 / 3.0 + 0.4 * 2.0 / 3.0, epsilon = 1e-12);
        assert_eq!(result.shared_fungi.len(), 2);
    }

    #[test]
    fn test_coverage_without_shared_fungi() {
        let plants = [Plant::new("a"), Plant::new("b")];
        let profiles = [
            OrganismProfile::new("a").with(OrganismKind::EmfFungi, ["amanita"]),
            OrganismProfile::new("b"),
        ];
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());
        assert_relative_eq!(calculate_p3(&members).raw, 0.4 * 0.5);
    }
}
