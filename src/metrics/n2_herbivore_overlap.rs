//! METRIC N2: HERBIVORE OVERLAP
//!
//! Same quadratic overlap as N1 with weight 0.5, restricted to true pests:
//! herbivores that no guild member also records as a pollinator or flower
//! visitor (those animals are reclassified as visitors and not penalized).

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use crate::utils::organism_counter::{
    count_shared_organisms, shared_organisms, sum_over_shared, SharedOrganism,
};
use serde::Serialize;

const HERBIVORE_WEIGHT: f64 = 0.5;

/// Result of N2 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct N2Result {
    /// Raw overlap penalty (calibration key "n2")
    pub raw: f64,
    /// Shared true herbivores, most shared first
    pub shared_herbivores: Vec<SharedOrganism>,
    /// Herbivores excluded because a member also lists them as visitors
    pub reclassified_visitors: usize,
}

/// Calculate N2: Herbivore overlap
pub fn calculate_n2(members: &GuildMembers<'_>) -> N2Result {
    let n_plants = members.len();
    if n_plants == 0 {
        return N2Result::default();
    }

    let mut herbivores = count_shared_organisms(members, &[OrganismKind::Herbivores]);
    let visitors = count_shared_organisms(
        members,
        &[OrganismKind::FlowerVisitors, OrganismKind::Pollinators],
    );

    let before = herbivores.len();
    herbivores.retain(|herbivore, _| !visitors.contains_key(herbivore));
    let reclassified_visitors = before - herbivores.len();

    let raw = sum_over_shared(&herbivores, |_, count| {
        let overlap_ratio = count as f64 / n_plants as f64;
        overlap_ratio.powi(2) * HERBIVORE_WEIGHT
    });

    N2Result {
        raw,
        shared_herbivores: shared_organisms(&herbivores),
        reclassified_visitors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrganismProfile, Plant};
    use approx::assert_relative_eq;

    #[test]
    fn test_visitors_are_not_pests() {
        let plants = [Plant::new("a"), Plant::new("b")];
        let profiles = [
            OrganismProfile::new("a")
                .with(OrganismKind::Herbivores, ["aphid", "hoverfly"])
                .with(OrganismKind::Pollinators, ["bee"]),
            OrganismProfile::new("b")
                .with(OrganismKind::Herbivores, ["aphid", "hoverfly"])
                .with(OrganismKind::FlowerVisitors, ["hoverfly"]),
        ];
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());

        let result = calculate_n2(&members);

        // only aphid counts: (2/2)² × 0.5
        assert_relative_eq!(result.raw, 0.5);
        assert_eq!(result.shared_herbivores.len(), 1);
        assert_eq!(result.shared_herbivores[0].name, "aphid");
        assert_eq!(result.reclassified_visitors, 1);
    }

    #[test]
    fn test_unshared_herbivores_ignored() {
        let plants = [Plant::new("a"), Plant::new("b"), Plant::new("c")];
        let profiles = [
            OrganismProfile::new("a").with(OrganismKind::Herbivores, ["aphid"]),
            OrganismProfile::new("b").with(OrganismKind::Herbivores, ["beetle"]),
            OrganismProfile::new("c").with(OrganismKind::Herbivores, ["aphid"]),
        ];
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());
        assert_relative_eq!(calculate_n2(&members).raw, (2.0f64 / 3.0).powi(2) * 0.5);
    }
}
