//! Shared Organism Counter Utility
//!
//! Counts how many plants in a guild share each organism (pollinator, fungus, etc.).
//! Used by the overlap metrics (N1, N2, P6) and the beneficial fungi network (P3).

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

/// An organism hosted by several guild members
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedOrganism {
    pub name: String,
    pub plant_count: usize,
}

/// Count organisms shared across plants in a guild
///
/// For each organism, counts how many plants in the guild host/associate with it.
/// Aggregates organisms across multiple columns (e.g., pollinators + flower_visitors),
/// so a plant listing the same organism in two columns counts once.
///
/// Returns a map of organism name → plant count
pub fn count_shared_organisms<'a>(
    members: &GuildMembers<'a>,
    kinds: &[OrganismKind],
) -> FxHashMap<&'a str, usize> {
    let mut counts: FxHashMap<&'a str, usize> = FxHashMap::default();

    for idx in 0..members.len() {
        // Most plants have < 16 organisms per metric
        let mut plant_organisms: SmallVec<[&'a str; 16]> = SmallVec::new();
        for &kind in kinds {
            plant_organisms.extend(members.organisms(idx, kind).iter());
        }

        plant_organisms.sort_unstable();
        plant_organisms.dedup();

        for org in plant_organisms {
            *counts.entry(org).or_insert(0) += 1;
        }
    }

    counts
}

/// Organisms hosted by at least two members, most shared first (ties by name)
pub fn shared_organisms(counts: &FxHashMap<&str, usize>) -> Vec<SharedOrganism> {
    let mut shared: Vec<SharedOrganism> = counts
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(&org, &count)| SharedOrganism { name: org.to_string(), plant_count: count })
        .collect();
    shared.sort_unstable_by(|a, b| b.plant_count.cmp(&a.plant_count).then_with(|| a.name.cmp(&b.name)));
    shared
}

/// Σ term(organism, count) over organisms shared by ≥ 2 members
///
/// Terms are added in organism-name order so the floating-point sum does
/// not depend on hash iteration order or on the order of guild members.
pub fn sum_over_shared<F>(counts: &FxHashMap<&str, usize>, mut term: F) -> f64
where
    F: FnMut(&str, usize) -> f64,
{
    let mut shared: Vec<(&str, usize)> = counts
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(&org, &count)| (org, count))
        .collect();
    shared.sort_unstable_by(|a, b| a.0.cmp(b.0));

    shared.into_iter().map(|(org, count)| term(org, count)).sum()
}
