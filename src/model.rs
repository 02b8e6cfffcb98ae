//! Typed row structures for the trait and interaction tables
//!
//! Every scalar trait is an `Option` and every set-valued organism column is an
//! `Option<OrganismSet>`: `None` means the source cell was null or the column
//! was absent, `Some(empty)` means the record exists and lists nothing.

use crate::tier::ClimateTier;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Number of phylogenetic eigenvector columns (phylo_ev1..phylo_ev92)
pub const PHYLO_DIMENSIONS: usize = 92;

// ============================================================================
// Organism sets
// ============================================================================

/// Sorted, deduplicated set of organism names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganismSet(Vec<String>);

static EMPTY_SET: OrganismSet = OrganismSet(Vec::new());

impl OrganismSet {
    /// Build a set, trimming names and dropping blanks
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = items
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        names.sort_unstable();
        names.dedup();
        OrganismSet(names)
    }

    /// Parse the legacy pipe-separated encoding ("bee_1|bee_2")
    pub fn from_pipe_separated(value: &str) -> Self {
        OrganismSet::new(value.split('|'))
    }

    /// Shared empty set, used where a record is unknown
    pub fn empty() -> &'static OrganismSet {
        &EMPTY_SET
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.binary_search_by(|probe| probe.as_str().cmp(name)).is_ok()
    }

    /// Names in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    /// Names present in both sets, ascending
    pub fn intersection<'a>(&'a self, other: &'a OrganismSet) -> impl Iterator<Item = &'a str> + 'a {
        self.iter().filter(move |name| other.contains(name))
    }
}

impl<S: AsRef<str>> FromIterator<S> for OrganismSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        OrganismSet::new(iter)
    }
}

/// Resolve an unknown set to the shared empty set
pub fn known(set: &Option<OrganismSet>) -> &OrganismSet {
    set.as_ref().unwrap_or(OrganismSet::empty())
}

// ============================================================================
// Organism interaction records
// ============================================================================

/// Set-valued columns of the organism and fungal-guild tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganismKind {
    Herbivores,
    Pollinators,
    FlowerVisitors,
    PredatorsHasHost,
    PredatorsInteractsWith,
    PredatorsAdjacentTo,
    PathogenicFungi,
    PathogenicFungiHostSpecific,
    AmfFungi,
    EmfFungi,
    EndophyticFungi,
    SaprotrophicFungi,
    MycoparasiteFungi,
    EntomopathogenicFungi,
}

impl OrganismKind {
    pub const COUNT: usize = 14;

    pub const ALL: [OrganismKind; OrganismKind::COUNT] = [
        OrganismKind::Herbivores,
        OrganismKind::Pollinators,
        OrganismKind::FlowerVisitors,
        OrganismKind::PredatorsHasHost,
        OrganismKind::PredatorsInteractsWith,
        OrganismKind::PredatorsAdjacentTo,
        OrganismKind::PathogenicFungi,
        OrganismKind::PathogenicFungiHostSpecific,
        OrganismKind::AmfFungi,
        OrganismKind::EmfFungi,
        OrganismKind::EndophyticFungi,
        OrganismKind::SaprotrophicFungi,
        OrganismKind::MycoparasiteFungi,
        OrganismKind::EntomopathogenicFungi,
    ];

    /// Animals linked to a plant through predator relations
    pub const PREDATOR_ASSOCIATES: [OrganismKind; 3] = [
        OrganismKind::PredatorsHasHost,
        OrganismKind::PredatorsInteractsWith,
        OrganismKind::PredatorsAdjacentTo,
    ];

    /// Beneficial fungal guilds counted by the network metric
    pub const BENEFICIAL_FUNGI: [OrganismKind; 4] = [
        OrganismKind::AmfFungi,
        OrganismKind::EmfFungi,
        OrganismKind::EndophyticFungi,
        OrganismKind::SaprotrophicFungi,
    ];

    /// Source column name
    pub fn column(&self) -> &'static str {
        match self {
            OrganismKind::Herbivores => "herbivores",
            OrganismKind::Pollinators => "pollinators",
            OrganismKind::FlowerVisitors => "flower_visitors",
            OrganismKind::PredatorsHasHost => "predators_hasHost",
            OrganismKind::PredatorsInteractsWith => "predators_interactsWith",
            OrganismKind::PredatorsAdjacentTo => "predators_adjacentTo",
            OrganismKind::PathogenicFungi => "pathogenic_fungi",
            OrganismKind::PathogenicFungiHostSpecific => "pathogenic_fungi_host_specific",
            OrganismKind::AmfFungi => "amf_fungi",
            OrganismKind::EmfFungi => "emf_fungi",
            OrganismKind::EndophyticFungi => "endophytic_fungi",
            OrganismKind::SaprotrophicFungi => "saprotrophic_fungi",
            OrganismKind::MycoparasiteFungi => "mycoparasite_fungi",
            OrganismKind::EntomopathogenicFungi => "entomopathogenic_fungi",
        }
    }

    fn slot(&self) -> usize {
        match self {
            OrganismKind::Herbivores => 0,
            OrganismKind::Pollinators => 1,
            OrganismKind::FlowerVisitors => 2,
            OrganismKind::PredatorsHasHost => 3,
            OrganismKind::PredatorsInteractsWith => 4,
            OrganismKind::PredatorsAdjacentTo => 5,
            OrganismKind::PathogenicFungi => 6,
            OrganismKind::PathogenicFungiHostSpecific => 7,
            OrganismKind::AmfFungi => 8,
            OrganismKind::EmfFungi => 9,
            OrganismKind::EndophyticFungi => 10,
            OrganismKind::SaprotrophicFungi => 11,
            OrganismKind::MycoparasiteFungi => 12,
            OrganismKind::EntomopathogenicFungi => 13,
        }
    }
}

/// Organism associations of one plant (organism table and fungal guilds merged)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganismProfile {
    pub plant_id: String,
    sets: [Option<OrganismSet>; OrganismKind::COUNT],
}

impl OrganismProfile {
    pub fn new(plant_id: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
            sets: Default::default(),
        }
    }

    /// Builder: record a known set for one column
    pub fn with<I, S>(mut self, kind: OrganismKind, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(kind, Some(OrganismSet::new(names)));
        self
    }

    pub fn set(&mut self, kind: OrganismKind, value: Option<OrganismSet>) {
        self.sets[kind.slot()] = value;
    }

    /// Raw cell value (`None` = unknown)
    pub fn get(&self, kind: OrganismKind) -> Option<&OrganismSet> {
        self.sets[kind.slot()].as_ref()
    }

    /// Known set or the empty set
    pub fn organisms(&self, kind: OrganismKind) -> &OrganismSet {
        known(&self.sets[kind.slot()])
    }

    /// Fill columns this profile does not know yet from another record
    pub fn merge(&mut self, other: OrganismProfile) {
        for (slot, value) in other.sets.into_iter().enumerate() {
            if self.sets[slot].is_none() {
                self.sets[slot] = value;
            }
        }
    }
}

// ============================================================================
// Plant trait records
// ============================================================================

/// Nitrogen fixation rating (ordinal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NitrogenFixation {
    None,
    Low,
    #[serde(rename = "Moderate-Low")]
    ModerateLow,
    #[serde(rename = "Moderate-High")]
    ModerateHigh,
    High,
}

impl NitrogenFixation {
    /// Parse the rating labels used by the trait table
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "none" | "no" => Some(NitrogenFixation::None),
            "low" => Some(NitrogenFixation::Low),
            "moderate-low" => Some(NitrogenFixation::ModerateLow),
            "moderate-high" => Some(NitrogenFixation::ModerateHigh),
            "high" => Some(NitrogenFixation::High),
            _ => None,
        }
    }

    /// High or Moderate-High ratings count as active fixers
    pub fn is_active_fixer(&self) -> bool {
        *self >= NitrogenFixation::ModerateHigh
    }
}

/// Raw CSR strategy scores (0-100 each)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CsrScores {
    pub c: Option<f64>,
    pub s: Option<f64>,
    pub r: Option<f64>,
}

impl CsrScores {
    pub fn is_complete(&self) -> bool {
        self.c.is_some() && self.s.is_some() && self.r.is_some()
    }
}

/// Lower/upper quantile pair of a climate variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantileRange {
    pub q05: Option<f64>,
    pub q95: Option<f64>,
}

impl QuantileRange {
    pub fn new(q05: f64, q95: f64) -> Self {
        Self { q05: Some(q05), q95: Some(q95) }
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.q05?, self.q95?))
    }
}

/// Occurrence-derived climate envelope
///
/// Temperatures are in °C, precipitation in mm/year; extreme indices are days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateEnvelope {
    pub annual_temp: QuantileRange,
    pub coldest_month: QuantileRange,
    pub annual_precip: QuantileRange,
    /// Consecutive dry days, q95
    pub drought_days_q95: Option<f64>,
    /// Consecutive frost days, q95
    pub frost_days_q95: Option<f64>,
}

/// Membership flags for the six climate tiers (null cells are non-members)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMembership([bool; 6]);

impl TierMembership {
    pub fn of(tiers: &[ClimateTier]) -> Self {
        let mut flags = [false; 6];
        for tier in tiers {
            flags[tier.index()] = true;
        }
        TierMembership(flags)
    }

    pub fn set(&mut self, tier: ClimateTier, member: bool) {
        self.0[tier.index()] = member;
    }

    pub fn contains(&self, tier: ClimateTier) -> bool {
        self.0[tier.index()]
    }
}

/// One row of the plant trait table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plant {
    pub id: String,
    pub scientific_name: String,
    pub family: Option<String>,
    pub genus: Option<String>,
    pub csr: CsrScores,
    /// EIVE light indicator (0-10)
    pub light_pref: Option<f64>,
    pub height_m: Option<f64>,
    pub growth_form: Option<String>,
    pub nitrogen_fixation: Option<NitrogenFixation>,
    pub soil_ph: Option<f64>,
    pub envelope: ClimateEnvelope,
    /// Phylogenetic eigenvector; `None` when any component is missing
    pub phylo_vector: Option<Vec<f64>>,
    pub tiers: TierMembership,
}

impl Plant {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            scientific_name: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.scientific_name = name.into();
        self
    }

    pub fn with_csr(mut self, c: f64, s: f64, r: f64) -> Self {
        self.csr = CsrScores { c: Some(c), s: Some(s), r: Some(r) };
        self
    }

    pub fn with_light(mut self, light: f64) -> Self {
        self.light_pref = Some(light);
        self
    }

    pub fn with_height(mut self, height_m: f64) -> Self {
        self.height_m = Some(height_m);
        self
    }

    pub fn with_growth_form(mut self, form: impl Into<String>) -> Self {
        self.growth_form = Some(form.into());
        self
    }

    pub fn with_nitrogen(mut self, rating: NitrogenFixation) -> Self {
        self.nitrogen_fixation = Some(rating);
        self
    }

    pub fn with_soil_ph(mut self, ph: f64) -> Self {
        self.soil_ph = Some(ph);
        self
    }

    pub fn with_envelope(mut self, envelope: ClimateEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_phylo_vector(mut self, vector: Vec<f64>) -> Self {
        self.phylo_vector = Some(vector);
        self
    }

    pub fn in_tiers(mut self, tiers: &[ClimateTier]) -> Self {
        self.tiers = TierMembership::of(tiers);
        self
    }

    /// Growth form, lowercased, "" when unknown
    pub fn growth_form_lower(&self) -> String {
        self.growth_form
            .as_deref()
            .map(|f| f.trim().to_lowercase())
            .unwrap_or_default()
    }
}

// ============================================================================
// Relationship lookup tables
// ============================================================================

/// Key organism → associated organisms (e.g. herbivore → predators)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable(FxHashMap<String, OrganismSet>);

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or extend the set stored under `key`
    pub fn insert<I, S>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = key.into();
        let incoming = OrganismSet::new(values);
        match self.0.get_mut(&key) {
            Some(existing) => {
                *existing = existing.iter().chain(incoming.iter()).collect();
            }
            None => {
                self.0.insert(key, incoming);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OrganismSet> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, S: AsRef<str>> FromIterator<(K, Vec<S>)> for LookupTable {
    fn from_iter<I: IntoIterator<Item = (K, Vec<S>)>>(iter: I) -> Self {
        let mut table = LookupTable::new();
        for (key, values) in iter {
            table.insert(key, values);
        }
        table
    }
}

/// Global organism relationship tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipTables {
    /// herbivore → predators
    pub herbivore_predators: LookupTable,
    /// herbivore → entomopathogenic fungi
    pub insect_parasites: LookupTable,
    /// pathogen → antagonist (mycoparasitic) fungi
    pub pathogen_antagonists: LookupTable,
}
