//! Data Loading and Management
//!
//! Loads the plant trait table, the organism and fungal-guild tables and the
//! three relationship lookup tables into typed, read-only records. Tables are
//! loaded once per process and shared by reference for every scoring call.

use crate::config::ScorerConfig;
use crate::model::{
    ClimateEnvelope, CsrScores, LookupTable, NitrogenFixation, OrganismKind, OrganismProfile,
    OrganismSet, Plant, QuantileRange, RelationshipTables, TierMembership, PHYLO_DIMENSIONS,
};
use crate::tier::ClimateTier;
use crate::utils::lazy_helpers::{
    bool_values, f64_values, organism_sets, read_table, require_column, str_values,
};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Plant ID column candidates (trait table / organism tables)
const PLANT_ID_COLUMNS: [&str; 3] = ["wfo_taxon_id", "plant_wfo_id", "plant_id"];

/// Columns of the organism profile table
const ORGANISM_TABLE_KINDS: [OrganismKind; 6] = [
    OrganismKind::Herbivores,
    OrganismKind::Pollinators,
    OrganismKind::FlowerVisitors,
    OrganismKind::PredatorsHasHost,
    OrganismKind::PredatorsInteractsWith,
    OrganismKind::PredatorsAdjacentTo,
];

/// Columns of the fungal guild table
const FUNGI_TABLE_KINDS: [OrganismKind; 8] = [
    OrganismKind::PathogenicFungi,
    OrganismKind::PathogenicFungiHostSpecific,
    OrganismKind::AmfFungi,
    OrganismKind::EmfFungi,
    OrganismKind::EndophyticFungi,
    OrganismKind::SaprotrophicFungi,
    OrganismKind::MycoparasiteFungi,
    OrganismKind::EntomopathogenicFungi,
];

/// Main data holder for guild scoring
#[derive(Debug, Clone, Default)]
pub struct GuildData {
    plants: FxHashMap<String, Plant>,
    organisms: FxHashMap<String, OrganismProfile>,
    relationships: RelationshipTables,
    /// Which tier columns the trait table carries
    tier_columns: [bool; 6],
}

impl GuildData {
    /// Build from in-memory records (all tier columns present)
    pub fn new(
        plants: Vec<Plant>,
        organisms: Vec<OrganismProfile>,
        relationships: RelationshipTables,
    ) -> Self {
        let mut organism_map: FxHashMap<String, OrganismProfile> = FxHashMap::default();
        for profile in organisms {
            match organism_map.get_mut(&profile.plant_id) {
                Some(existing) => existing.merge(profile),
                None => {
                    organism_map.insert(profile.plant_id.clone(), profile);
                }
            }
        }

        Self {
            plants: plants.into_iter().map(|p| (p.id.clone(), p)).collect(),
            organisms: organism_map,
            relationships,
            tier_columns: [true; 6],
        }
    }

    /// Mark tier columns as absent from the source table
    pub fn without_tier_columns(mut self, tiers: &[ClimateTier]) -> Self {
        for tier in tiers {
            self.tier_columns[tier.index()] = false;
        }
        self
    }

    /// Load all tables named by the config
    pub fn load(config: &ScorerConfig) -> Result<Self> {
        let (plants, tier_columns) = Self::load_plants(&config.plants_path())?;

        let mut organisms = Self::load_profiles(&config.organisms_path(), &ORGANISM_TABLE_KINDS)?;
        let fungi = Self::load_profiles(&config.fungi_path(), &FUNGI_TABLE_KINDS)?;
        for (plant_id, profile) in fungi {
            match organisms.get_mut(&plant_id) {
                Some(existing) => existing.merge(profile),
                None => {
                    organisms.insert(plant_id, profile);
                }
            }
        }

        let relationships = RelationshipTables {
            herbivore_predators: Self::load_lookup_table(
                &config.herbivore_predators_path(),
                "herbivore",
                "predators",
            )?,
            insect_parasites: Self::load_lookup_table(
                &config.insect_parasites_path(),
                "herbivore",
                "entomopathogenic_fungi",
            )?,
            pathogen_antagonists: Self::load_lookup_table(
                &config.pathogen_antagonists_path(),
                "pathogen",
                "antagonists",
            )?,
        };

        tracing::info!(
            plants = plants.len(),
            organism_profiles = organisms.len(),
            herbivore_predators = relationships.herbivore_predators.len(),
            insect_parasites = relationships.insect_parasites.len(),
            pathogen_antagonists = relationships.pathogen_antagonists.len(),
            "guild data loaded"
        );

        Ok(Self {
            plants,
            organisms,
            relationships,
            tier_columns,
        })
    }

    pub fn plant(&self, id: &str) -> Option<&Plant> {
        self.plants.get(id)
    }

    pub fn organisms(&self, id: &str) -> Option<&OrganismProfile> {
        self.organisms.get(id)
    }

    pub fn relationships(&self) -> &RelationshipTables {
        &self.relationships
    }

    pub fn plants(&self) -> impl Iterator<Item = &Plant> {
        self.plants.values()
    }

    pub fn plant_count(&self) -> usize {
        self.plants.len()
    }

    pub fn has_tier_column(&self, tier: ClimateTier) -> bool {
        self.tier_columns[tier.index()]
    }

    /// IDs of plants flagged for the tier, sorted for reproducible sampling
    pub fn plants_in_tier(&self, tier: ClimateTier) -> Vec<&str> {
        if !self.has_tier_column(tier) {
            return Vec::new();
        }
        let mut ids: Vec<&str> = self
            .plants
            .values()
            .filter(|p| p.tiers.contains(tier))
            .map(|p| p.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Resolve guild members; `Err` lists IDs absent from the trait table
    pub fn members<'a>(&'a self, plant_ids: &[String]) -> Result<GuildMembers<'a>, Vec<String>> {
        let mut plants = Vec::with_capacity(plant_ids.len());
        let mut missing = Vec::new();

        for id in plant_ids {
            match self.plants.get(id) {
                Some(plant) => plants.push(plant),
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(missing);
        }

        let organisms = plant_ids.iter().map(|id| self.organisms.get(id)).collect();
        Ok(GuildMembers::new(plants, organisms))
    }

    // ------------------------------------------------------------------------
    // Loaders
    // ------------------------------------------------------------------------

    /// Load the plant trait table
    fn load_plants(path: &Path) -> Result<(FxHashMap<String, Plant>, [bool; 6])> {
        let df = read_table(path)?;
        let table = path.display().to_string();

        let ids = str_values(&df, &PLANT_ID_COLUMNS)?.ok_or_else(|| {
            anyhow::anyhow!("{}: no plant ID column (tried {:?})", table, PLANT_ID_COLUMNS)
        })?;
        let height = df.height();
        let none_f64 = || vec![None; height];
        let none_str = || vec![None; height];

        let names = str_values(&df, &["wfo_scientific_name", "scientific_name"])?.unwrap_or_else(none_str);
        let families = str_values(&df, &["family"])?.unwrap_or_else(none_str);
        let genera = str_values(&df, &["genus"])?.unwrap_or_else(none_str);
        let csr_c = f64_values(&df, &["C", "CSR_C"])?.unwrap_or_else(none_f64);
        let csr_s = f64_values(&df, &["S", "CSR_S"])?.unwrap_or_else(none_f64);
        let csr_r = f64_values(&df, &["R", "CSR_R"])?.unwrap_or_else(none_f64);
        let light = f64_values(&df, &["EIVEres-L", "light_pref"])?.unwrap_or_else(none_f64);
        let heights = f64_values(&df, &["height_m"])?.unwrap_or_else(none_f64);
        let forms = str_values(&df, &["try_growth_form", "growth_form"])?.unwrap_or_else(none_str);
        let nitrogen = str_values(&df, &["nitrogen_fixation_rating", "n_fixation"])?.unwrap_or_else(none_str);
        let soil_ph = f64_values(&df, &["soil_ph", "pH_mean", "ph_mean"])?.unwrap_or_else(none_f64);

        let temp_q05 = f64_values(&df, &["wc2.1_30s_bio_1_q05", "bio_1_q05"])?.unwrap_or_else(none_f64);
        let temp_q95 = f64_values(&df, &["wc2.1_30s_bio_1_q95", "bio_1_q95"])?.unwrap_or_else(none_f64);
        let cold_q05 = f64_values(&df, &["wc2.1_30s_bio_6_q05", "bio_6_q05"])?.unwrap_or_else(none_f64);
        let cold_q95 = f64_values(&df, &["wc2.1_30s_bio_6_q95", "bio_6_q95"])?.unwrap_or_else(none_f64);
        let precip_q05 = f64_values(&df, &["wc2.1_30s_bio_12_q05", "bio_12_q05"])?.unwrap_or_else(none_f64);
        let precip_q95 = f64_values(&df, &["wc2.1_30s_bio_12_q95", "bio_12_q95"])?.unwrap_or_else(none_f64);
        let drought = f64_values(&df, &["CDD_q95", "drought_days"])?.unwrap_or_else(none_f64);
        let frost = f64_values(&df, &["CFD_q95", "frost_days"])?.unwrap_or_else(none_f64);

        let phylo = Self::phylo_vectors(&df)?;

        let mut tier_columns = [false; 6];
        let mut tier_flags: Vec<Vec<Option<bool>>> = Vec::with_capacity(6);
        for tier in ClimateTier::ALL {
            match bool_values(&df, tier.column())? {
                Some(flags) => {
                    tier_columns[tier.index()] = true;
                    tier_flags.push(flags);
                }
                None => {
                    tracing::warn!(table = %table, column = tier.column(), "tier column missing");
                    tier_flags.push(vec![None; height]);
                }
            }
        }

        let mut plants = FxHashMap::default();
        plants.reserve(height);

        for idx in 0..height {
            let Some(id) = ids[idx].clone() else {
                continue;
            };

            let mut tiers = TierMembership::default();
            for tier in ClimateTier::ALL {
                tiers.set(tier, tier_flags[tier.index()][idx].unwrap_or(false));
            }

            let nitrogen_fixation = nitrogen[idx].as_deref().and_then(|label| {
                let parsed = NitrogenFixation::parse(label);
                if parsed.is_none() {
                    tracing::debug!(plant = %id, label, "unrecognised nitrogen fixation rating");
                }
                parsed
            });

            let plant = Plant {
                scientific_name: names[idx].clone().unwrap_or_else(|| id.clone()),
                family: families[idx].clone(),
                genus: genera[idx].clone(),
                csr: CsrScores { c: csr_c[idx], s: csr_s[idx], r: csr_r[idx] },
                light_pref: light[idx],
                height_m: heights[idx],
                growth_form: forms[idx].clone(),
                nitrogen_fixation,
                soil_ph: soil_ph[idx],
                envelope: ClimateEnvelope {
                    annual_temp: QuantileRange { q05: temp_q05[idx], q95: temp_q95[idx] },
                    coldest_month: QuantileRange { q05: cold_q05[idx], q95: cold_q95[idx] },
                    annual_precip: QuantileRange { q05: precip_q05[idx], q95: precip_q95[idx] },
                    drought_days_q95: drought[idx],
                    frost_days_q95: frost[idx],
                },
                phylo_vector: phylo.as_ref().and_then(|vectors| vectors[idx].clone()),
                tiers,
                id: id.clone(),
            };

            plants.insert(id, plant);
        }

        Ok((plants, tier_columns))
    }

    /// phylo_ev1..phylo_ev92 gathered per row; incomplete rows are `None`
    fn phylo_vectors(df: &DataFrame) -> Result<Option<Vec<Option<Vec<f64>>>>> {
        let mut columns = Vec::with_capacity(PHYLO_DIMENSIONS);
        for dim in 1..=PHYLO_DIMENSIONS {
            let name = format!("phylo_ev{}", dim);
            match f64_values(df, &[name.as_str()])? {
                Some(values) => columns.push(values),
                None => {
                    tracing::warn!(column = %name, "phylogenetic eigenvector column missing");
                    return Ok(None);
                }
            }
        }

        let vectors = (0..df.height())
            .map(|idx| columns.iter().map(|col| col[idx]).collect::<Option<Vec<f64>>>())
            .collect();
        Ok(Some(vectors))
    }

    /// Load one organism table into per-plant profiles
    fn load_profiles(
        path: &Path,
        kinds: &[OrganismKind],
    ) -> Result<FxHashMap<String, OrganismProfile>> {
        let df = read_table(path)?;
        let table = path.display().to_string();

        let ids = str_values(&df, &PLANT_ID_COLUMNS)?.ok_or_else(|| {
            anyhow::anyhow!("{}: no plant ID column (tried {:?})", table, PLANT_ID_COLUMNS)
        })?;

        let mut columns = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            match organism_sets(&df, kind.column())? {
                Some(sets) => columns.push((kind, sets)),
                None => tracing::debug!(table = %table, column = kind.column(), "organism column absent"),
            }
        }

        let mut profiles: FxHashMap<String, OrganismProfile> = FxHashMap::default();
        for (idx, id) in ids.into_iter().enumerate() {
            let Some(id) = id else {
                continue;
            };
            let profile = profiles
                .entry(id.clone())
                .or_insert_with(|| OrganismProfile::new(id));
            for (kind, sets) in &columns {
                if profile.get(*kind).is_none() {
                    profile.set(*kind, sets[idx].clone());
                }
            }
        }

        Ok(profiles)
    }

    /// Load lookup table: key → set of associated organisms
    fn load_lookup_table(path: &Path, key_col: &str, value_col: &str) -> Result<LookupTable> {
        let df = read_table(path)?;
        let table = path.display().to_string();
        require_column(&df, key_col, &table)?;
        require_column(&df, value_col, &table)?;

        let keys = str_values(&df, &[key_col])?
            .with_context(|| format!("{}: column '{}' unreadable", table, key_col))?;
        let values = organism_sets(&df, value_col)?
            .with_context(|| format!("{}: column '{}' unreadable", table, value_col))?;

        let mut lookup = LookupTable::new();
        for (key, set) in keys.into_iter().zip(values) {
            if let (Some(key), Some(set)) = (key, set) {
                if !set.is_empty() {
                    lookup.insert(key, set.iter());
                }
            }
        }

        Ok(lookup)
    }
}

/// Resolved members of one guild, in request order
#[derive(Debug, Clone)]
pub struct GuildMembers<'a> {
    plants: Vec<&'a Plant>,
    organisms: Vec<Option<&'a OrganismProfile>>,
}

impl<'a> GuildMembers<'a> {
    /// `organisms` is aligned with `plants`; a shorter list pads with `None`
    pub fn new(plants: Vec<&'a Plant>, mut organisms: Vec<Option<&'a OrganismProfile>>) -> Self {
        organisms.resize(plants.len(), None);
        Self { plants, organisms }
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn plants(&self) -> &[&'a Plant] {
        &self.plants
    }

    pub fn plant(&self, idx: usize) -> &'a Plant {
        self.plants[idx]
    }

    pub fn profile(&self, idx: usize) -> Option<&'a OrganismProfile> {
        self.organisms[idx]
    }

    /// Known organisms of one kind for member `idx` (empty when unknown)
    pub fn organisms(&self, idx: usize, kind: OrganismKind) -> &'a OrganismSet {
        match self.organisms[idx] {
            Some(profile) => profile.organisms(kind),
            None => OrganismSet::empty(),
        }
    }

    /// Whether any member has a non-empty set for any of the kinds
    pub fn any_organisms(&self, idx: usize, kinds: &[OrganismKind]) -> bool {
        kinds.iter().any(|&kind| !self.organisms(idx, kind).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> GuildData {
        let plants = vec![
            Plant::new("p1").in_tiers(&[ClimateTier::HumidTemperate]),
            Plant::new("p2").in_tiers(&[ClimateTier::HumidTemperate, ClimateTier::Arid]),
            Plant::new("p3").in_tiers(&[ClimateTier::Arid]),
        ];
        let organisms = vec![
            OrganismProfile::new("p1").with(OrganismKind::Herbivores, ["aphid"]),
            OrganismProfile::new("p1").with(OrganismKind::AmfFungi, ["glomus"]),
        ];
        GuildData::new(plants, organisms, RelationshipTables::default())
    }

    #[test]
    fn test_profiles_merge_by_plant() {
        let data = sample_data();
        let profile = data.organisms("p1").unwrap();
        assert!(profile.organisms(OrganismKind::Herbivores).contains("aphid"));
        assert!(profile.organisms(OrganismKind::AmfFungi).contains("glomus"));
    }

    #[test]
    fn test_plants_in_tier_sorted() {
        let data = sample_data();
        assert_eq!(data.plants_in_tier(ClimateTier::Arid), vec!["p2", "p3"]);
        assert!(data.plants_in_tier(ClimateTier::Tropical).is_empty());

        let data = data.without_tier_columns(&[ClimateTier::Arid]);
        assert!(!data.has_tier_column(ClimateTier::Arid));
        assert!(data.plants_in_tier(ClimateTier::Arid).is_empty());
    }

    #[test]
    fn test_members_reports_unknown_ids() {
        let data = sample_data();
        let ids = vec!["p1".to_string(), "ghost".to_string()];
        assert_eq!(data.members(&ids).unwrap_err(), vec!["ghost".to_string()]);

        let ids = vec!["p1".to_string(), "p3".to_string()];
        let members = data.members(&ids).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.profile(1).is_none());
        assert!(members.organisms(1, OrganismKind::Herbivores).is_empty());
        assert!(members.organisms(0, OrganismKind::Herbivores).contains("aphid"));
    }

    #[test]
    #[ignore] // requires the production tables under data/
    fn test_load_production_tables() {
        let config = ScorerConfig::default();
        let data = GuildData::load(&config).unwrap();
        assert!(data.plant_count() > 10_000);
    }
}
