//! Guild diagnostics: per-plant organism profiles and the organism → plant
//! index. Qualitative companions to the metric evidence; nothing here feeds
//! back into a score.

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use crate::utils::organism_counter::count_shared_organisms;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A list truncated to the evidence cap, with the uncapped length
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capped<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> Capped<T> {
    pub fn new(mut items: Vec<T>, cap: usize) -> Self {
        let total = items.len();
        items.truncate(cap);
        Self { items, total }
    }

    pub fn is_truncated(&self) -> bool {
        self.items.len() < self.total
    }
}

impl<T> Default for Capped<T> {
    fn default() -> Self {
        Self { items: Vec::new(), total: 0 }
    }
}

/// Organisms recorded for one member, shared-first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantOrganismProfile {
    pub plant_id: String,
    pub plant_name: String,
    pub herbivores: Capped<String>,
    pub pathogens: Capped<String>,
    pub pollinators: Capped<String>,
    pub flower_visitors: Capped<String>,
}

/// Role of an organism within the guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganismRole {
    Pathogen,
    Herbivore,
    BeneficialFungus,
    Pollinator,
}

impl OrganismRole {
    fn kinds(&self) -> &'static [OrganismKind] {
        match self {
            OrganismRole::Pathogen => &[OrganismKind::PathogenicFungi],
            OrganismRole::Herbivore => &[OrganismKind::Herbivores],
            OrganismRole::BeneficialFungus => &OrganismKind::BENEFICIAL_FUNGI,
            OrganismRole::Pollinator => &[OrganismKind::Pollinators, OrganismKind::FlowerVisitors],
        }
    }
}

/// A shared organism and the members hosting it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganismHosts {
    pub organism: String,
    pub role: OrganismRole,
    /// Fungal guilds the organism was recorded under (beneficial fungi only)
    pub subtypes: Vec<OrganismKind>,
    /// Scientific names of hosting members, in guild order
    pub plants: Vec<String>,
}

/// Build one profile per member
pub fn plant_profiles(members: &GuildMembers<'_>, cap: usize) -> Vec<PlantOrganismProfile> {
    let herbivore_counts = count_shared_organisms(members, &[OrganismKind::Herbivores]);
    let pathogen_counts = count_shared_organisms(members, &[OrganismKind::PathogenicFungi]);
    let pollinator_counts = count_shared_organisms(members, &[OrganismKind::Pollinators]);
    let visitor_counts = count_shared_organisms(members, &[OrganismKind::FlowerVisitors]);

    (0..members.len())
        .map(|idx| {
            let plant = members.plant(idx);
            let list = |kind: OrganismKind, counts: &FxHashMap<&str, usize>| {
                let mut names: Vec<&str> = members.organisms(idx, kind).iter().collect();
                names.sort_by(|a, b| {
                    let count = |name: &str| counts.get(name).copied().unwrap_or(0);
                    count(*b).cmp(&count(*a)).then_with(|| a.cmp(b))
                });
                Capped::new(names.into_iter().map(str::to_string).collect(), cap)
            };

            PlantOrganismProfile {
                plant_id: plant.id.clone(),
                plant_name: plant.scientific_name.clone(),
                herbivores: list(OrganismKind::Herbivores, &herbivore_counts),
                pathogens: list(OrganismKind::PathogenicFungi, &pathogen_counts),
                pollinators: list(OrganismKind::Pollinators, &pollinator_counts),
                flower_visitors: list(OrganismKind::FlowerVisitors, &visitor_counts),
            }
        })
        .collect()
}

/// Map organisms shared by ≥ 2 members to their hosts
///
/// Ordered by role, then most hosts first, then name.
pub fn organism_index(members: &GuildMembers<'_>) -> Vec<OrganismHosts> {
    let roles = [
        OrganismRole::Pathogen,
        OrganismRole::Herbivore,
        OrganismRole::BeneficialFungus,
        OrganismRole::Pollinator,
    ];

    let mut index = Vec::new();
    for role in roles {
        let mut hosts: FxHashMap<&str, (Vec<usize>, Vec<OrganismKind>)> = FxHashMap::default();

        for idx in 0..members.len() {
            for &kind in role.kinds() {
                for organism in members.organisms(idx, kind).iter() {
                    let (plants, subtypes) = hosts.entry(organism).or_default();
                    if plants.last() != Some(&idx) {
                        plants.push(idx);
                    }
                    if !subtypes.contains(&kind) {
                        subtypes.push(kind);
                    }
                }
            }
        }

        let mut shared: Vec<OrganismHosts> = hosts
            .into_iter()
            .filter(|(_, (plants, _))| plants.len() >= 2)
            .map(|(organism, (plants, mut subtypes))| {
                subtypes.sort_unstable();
                OrganismHosts {
                    organism: organism.to_string(),
                    role,
                    subtypes: if role == OrganismRole::BeneficialFungus {
                        subtypes
                    } else {
                        Vec::new()
                    },
                    plants: plants
                        .into_iter()
                        .map(|idx| members.plant(idx).scientific_name.clone())
                        .collect(),
                }
            })
            .collect();
        shared.sort_by(|a, b| {
            b.plants
                .len()
                .cmp(&a.plants.len())
                .then_with(|| a.organism.cmp(&b.organism))
        });
        index.extend(shared);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrganismProfile, Plant};

    fn fixture() -> (Vec<Plant>, Vec<OrganismProfile>) {
        let plants = vec![
            Plant::new("a").with_name("Malus domestica"),
            Plant::new("b").with_name("Allium schoenoprasum"),
            Plant::new("c").with_name("Trifolium repens"),
        ];
        let profiles = vec![
            OrganismProfile::new("a")
                .with(OrganismKind::Herbivores, ["aphid", "codling_moth", "mite"])
                .with(OrganismKind::AmfFungi, ["glomus"])
                .with(OrganismKind::Pollinators, ["apis"]),
            OrganismProfile::new("b")
                .with(OrganismKind::Herbivores, ["mite", "thrips"])
                .with(OrganismKind::EndophyticFungi, ["glomus"])
                .with(OrganismKind::FlowerVisitors, ["apis"]),
            OrganismProfile::new("c").with(OrganismKind::Herbivores, ["mite", "aphid"]),
        ];
        (plants, profiles)
    }

    #[test]
    fn test_profiles_sort_shared_first_and_cap() {
        let (plants, profiles) = fixture();
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());

        let result = plant_profiles(&members, 2);

        assert_eq!(result[0].herbivores.items, vec!["mite", "aphid"]);
        assert_eq!(result[0].herbivores.total, 3);
        assert!(result[0].herbivores.is_truncated());
        assert_eq!(result[2].pathogens, Capped::default());
    }

    #[test]
    fn test_index_groups_by_role() {
        let (plants, profiles) = fixture();
        let members = GuildMembers::new(plants.iter().collect(), profiles.iter().map(Some).collect());

        let index = organism_index(&members);
        let names: Vec<(&str, OrganismRole)> =
            index.iter().map(|h| (h.organism.as_str(), h.role)).collect();

        assert_eq!(
            names,
            vec![
                ("mite", OrganismRole::Herbivore),
                ("aphid", OrganismRole::Herbivore),
                ("glomus", OrganismRole::BeneficialFungus),
                ("apis", OrganismRole::Pollinator),
            ]
        );
        assert_eq!(index[2].subtypes, vec![OrganismKind::AmfFungi, OrganismKind::EndophyticFungi]);
        assert_eq!(index[3].plants, vec!["Malus domestica", "Allium schoenoprasum"]);
    }
}
