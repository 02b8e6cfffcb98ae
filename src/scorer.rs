//! Guild Scorer - Main coordinator for scoring plant guilds
//!
//! Runs one guild through the scoring stages:
//!
//!   INIT → LOAD_DATA → CLIMATE_CHECK ─(veto)→ TERMINAL_VETO
//!                                    └→ COMPUTE_NEGATIVE → COMPUTE_POSITIVE
//!                                       → NORMALIZE_ALL → AGGREGATE → TERMINAL_RESULT
//!
//! The scorer owns the immutable tables and calibrations; `score_guild`
//! takes `&self`, so batches score in parallel without locks.

use crate::climate::{check_climate, ClimateCheck, VetoReason};
use crate::config::ScorerConfig;
use crate::data::{GuildData, GuildMembers};
use crate::diagnostics::{organism_index, plant_profiles, Capped, OrganismHosts, PlantOrganismProfile};
use crate::error::{validate_guild, GuildError};
use crate::metrics::n1_pathogen_fungi::SharedPathogen;
use crate::metrics::n4_csr_conflicts::{CsrConflict, PlantCsrProfile};
use crate::metrics::p5_stratification::GrowthFormGroup;
use crate::metrics::{
    compute_negative, compute_positive, raw_scores, MetricKey, NegativeMetrics, NitrogenFlag,
    PositiveMetrics, RawScores, SoilPhFlag,
};
use crate::tier::ClimateTier;
use crate::utils::normalization::{
    percentile_normalize, Calibration, CalibrationProfiles, CsrCalibration,
};
use crate::utils::organism_counter::SharedOrganism;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EVIDENCE_CAP: usize = 5;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoringStage {
    Init,
    LoadData,
    ClimateCheck,
    ComputeNegative,
    ComputePositive,
    NormalizeAll,
    Aggregate,
    TerminalVeto,
    TerminalResult,
}

/// A guild to score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildRequest {
    pub plant_ids: Vec<String>,
    pub tier: ClimateTier,
    /// Calibration profile (guild size); nearest profile when absent
    #[serde(default)]
    pub profile: Option<usize>,
}

impl GuildRequest {
    pub fn new<I, S>(plant_ids: I, tier: ClimateTier) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plant_ids: plant_ids.into_iter().map(Into::into).collect(),
            tier,
            profile: None,
        }
    }

    pub fn with_profile(mut self, guild_size: usize) -> Self {
        self.profile = Some(guild_size);
        self
    }
}

/// One calibrated metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub key: MetricKey,
    pub name: &'static str,
    pub raw: f64,
    /// Population percentile (high = more of the quantity)
    pub percentile: f64,
    /// Percentile with risk metrics inverted (high = good)
    pub display: f64,
    /// False when the heuristic fallback was used
    pub calibrated: bool,
}

/// Non-ranked flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuildFlags {
    pub nitrogen: NitrogenFlag,
    pub soil_ph: SoilPhFlag,
}

/// Evidence behind the metric values, lists capped at the evidence cap
#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub raw: RawScores,
    pub shared_pathogens: Capped<SharedPathogen>,
    pub shared_herbivores: Capped<SharedOrganism>,
    pub csr_conflicts: Capped<CsrConflict>,
    pub plant_csr: Vec<PlantCsrProfile>,
    pub biocontrol_saturated: f64,
    pub predator_matches: Capped<(String, String)>,
    pub entomopathogen_matches: Capped<(String, String)>,
    pub disease_control_saturated: f64,
    pub antagonist_matches: Capped<(String, String)>,
    pub mycoparasites: Capped<String>,
    pub shared_beneficial_fungi: Capped<SharedOrganism>,
    pub beneficial_fungi_coverage: f64,
    pub phylo_pairs_compared: usize,
    pub stratification_quality: f64,
    pub height_range_m: f64,
    pub growth_form_groups: Vec<GrowthFormGroup>,
    pub shared_pollinators: Capped<SharedOrganism>,
    pub plant_profiles: Vec<PlantOrganismProfile>,
    pub organism_index: Vec<OrganismHosts>,
}

/// Guild score result
#[derive(Debug, Clone, Serialize)]
pub struct GuildScore {
    pub plant_ids: Vec<String>,
    pub tier: ClimateTier,
    /// Overall score 0-100 (0 when vetoed)
    pub overall_score: f64,
    pub veto: bool,
    pub veto_reason: Option<VetoReason>,
    pub climate: ClimateCheck,
    /// Guild size of the calibration profile used, if any
    pub calibration_profile: Option<usize>,
    /// N1, N2, N4, P1-P6 (empty when vetoed)
    pub metrics: Vec<MetricScore>,
    pub flags: Option<GuildFlags>,
    pub breakdown: Option<Breakdown>,
    pub stages: Vec<ScoringStage>,
}

impl GuildScore {
    pub fn metric(&self, key: MetricKey) -> Option<&MetricScore> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

/// Main guild scorer
pub struct GuildScorer {
    data: GuildData,
    profiles: CalibrationProfiles,
    csr_calibration: Option<CsrCalibration>,
    evidence_cap: usize,
}

impl GuildScorer {
    pub fn new(
        data: GuildData,
        profiles: CalibrationProfiles,
        csr_calibration: Option<CsrCalibration>,
    ) -> Self {
        Self {
            data,
            profiles,
            csr_calibration,
            evidence_cap: DEFAULT_EVIDENCE_CAP,
        }
    }

    pub fn with_evidence_cap(mut self, cap: usize) -> Self {
        self.evidence_cap = cap;
        self
    }

    /// Load tables, calibration profiles and the CSR calibration
    pub fn from_config(config: &ScorerConfig) -> Result<Self> {
        let data = GuildData::load(config).context("loading guild data")?;

        let profiles = CalibrationProfiles::load_dir(&config.calibration_dir, &config.calibration_profiles)
            .context("loading calibration profiles")?;
        if profiles.is_empty() {
            tracing::warn!(
                dir = %config.calibration_dir.display(),
                "no calibration profiles found - metrics use heuristic percentiles"
            );
        }

        let csr_path = config.csr_calibration_path();
        let csr_calibration = if csr_path.exists() {
            let csr = CsrCalibration::load(&csr_path).context("loading CSR calibration")?;
            tracing::info!(path = %csr_path.display(), "CSR calibration loaded");
            Some(csr)
        } else {
            tracing::warn!(path = %csr_path.display(), "CSR calibration not found - using fixed thresholds");
            None
        };

        Ok(Self::new(data, profiles, csr_calibration).with_evidence_cap(config.evidence_cap))
    }

    pub fn data(&self) -> &GuildData {
        &self.data
    }

    pub fn profiles(&self) -> &CalibrationProfiles {
        &self.profiles
    }

    pub fn csr_calibration(&self) -> Option<&CsrCalibration> {
        self.csr_calibration.as_ref()
    }

    /// Score a guild
    ///
    /// Malformed guilds are rejected; unknown plants and climate mismatches
    /// produce a vetoed score rather than an error.
    pub fn score_guild(&self, request: &GuildRequest) -> Result<GuildScore, GuildError> {
        let mut stages = Vec::with_capacity(8);
        let mut enter = |stage: ScoringStage| {
            tracing::debug!(?stage, guild_size = request.plant_ids.len(), "scoring stage");
            stages.push(stage);
        };

        enter(ScoringStage::Init);
        validate_guild(&request.plant_ids)?;
        let tier = request.tier;

        enter(ScoringStage::LoadData);
        let members = match self.data.members(&request.plant_ids) {
            Ok(members) => members,
            Err(missing) => {
                tracing::debug!(?missing, "unknown plant IDs");
                enter(ScoringStage::TerminalVeto);
                let climate = ClimateCheck::vetoed(tier, VetoReason::UnknownPlants { plant_ids: missing });
                return Ok(self.vetoed(request, climate, stages));
            }
        };

        enter(ScoringStage::ClimateCheck);
        let climate = check_climate(&members, tier, self.data.has_tier_column(tier));
        if climate.is_vetoed() {
            enter(ScoringStage::TerminalVeto);
            return Ok(self.vetoed(request, climate, stages));
        }

        enter(ScoringStage::ComputeNegative);
        let negative = compute_negative(&members, self.csr_calibration.as_ref());

        enter(ScoringStage::ComputePositive);
        let positive = compute_positive(&members, self.data.relationships());

        enter(ScoringStage::NormalizeAll);
        let raw = raw_scores(&negative, &positive);
        let profile = self.profiles.select(request.profile, members.len());
        if profile.is_none() {
            tracing::debug!("no calibration profile - heuristic percentiles");
        }
        let metrics = normalize_all(&raw, tier, profile.map(|(_, cal)| cal));

        enter(ScoringStage::Aggregate);
        let overall_score = (metrics.iter().map(|m| m.display).sum::<f64>() / metrics.len() as f64)
            .clamp(0.0, 100.0);
        let breakdown = self.breakdown(&members, raw, &negative, &positive);

        enter(ScoringStage::TerminalResult);
        Ok(GuildScore {
            plant_ids: request.plant_ids.clone(),
            tier,
            overall_score,
            veto: false,
            veto_reason: None,
            climate,
            calibration_profile: profile.map(|(size, _)| size),
            metrics,
            flags: Some(GuildFlags {
                nitrogen: negative.n5,
                soil_ph: negative.n6,
            }),
            breakdown: Some(breakdown),
            stages,
        })
    }

    /// Score many guilds in parallel; results keep request order
    pub fn score_batch(&self, requests: &[GuildRequest]) -> Vec<Result<GuildScore, GuildError>> {
        requests.par_iter().map(|request| self.score_guild(request)).collect()
    }

    fn vetoed(&self, request: &GuildRequest, climate: ClimateCheck, stages: Vec<ScoringStage>) -> GuildScore {
        GuildScore {
            plant_ids: request.plant_ids.clone(),
            tier: request.tier,
            overall_score: 0.0,
            veto: true,
            veto_reason: climate.veto.clone(),
            climate,
            calibration_profile: None,
            metrics: Vec::new(),
            flags: None,
            breakdown: None,
            stages,
        }
    }

    fn breakdown(
        &self,
        members: &GuildMembers<'_>,
        raw: RawScores,
        negative: &NegativeMetrics,
        positive: &PositiveMetrics,
    ) -> Breakdown {
        let cap = self.evidence_cap;

        let mut conflicts = negative.n4.conflicts.clone();
        conflicts.sort_by(|a, b| b.severity.total_cmp(&a.severity));

        Breakdown {
            raw,
            shared_pathogens: Capped::new(negative.n1.shared_pathogens.clone(), cap),
            shared_herbivores: Capped::new(negative.n2.shared_herbivores.clone(), cap),
            csr_conflicts: Capped::new(conflicts, cap),
            plant_csr: negative.n4.plant_csr.clone(),
            biocontrol_saturated: positive.p1.saturated,
            predator_matches: Capped::new(positive.p1.matched_predator_pairs.clone(), cap),
            entomopathogen_matches: Capped::new(positive.p1.matched_fungi_pairs.clone(), cap),
            disease_control_saturated: positive.p2.saturated,
            antagonist_matches: Capped::new(positive.p2.matched_antagonist_pairs.clone(), cap),
            mycoparasites: Capped::new(positive.p2.mycoparasites.clone(), cap),
            shared_beneficial_fungi: Capped::new(positive.p3.shared_fungi.clone(), cap),
            beneficial_fungi_coverage: positive.p3.coverage_ratio,
            phylo_pairs_compared: positive.p4.pairs_compared,
            stratification_quality: positive.p5.stratification_quality,
            height_range_m: positive.p5.height_range,
            growth_form_groups: positive.p5.growth_form_groups.clone(),
            shared_pollinators: Capped::new(positive.p6.shared_pollinators.clone(), cap),
            plant_profiles: plant_profiles(members, cap),
            organism_index: organism_index(members),
        }
    }
}

/// Percentile and display score for every calibrated metric
fn normalize_all(raw: &RawScores, tier: ClimateTier, calibration: Option<&Calibration>) -> Vec<MetricScore> {
    MetricKey::ALL
        .iter()
        .map(|&key| {
            let value = raw.get(key);
            let normalized = percentile_normalize(value, key, tier, calibration);
            MetricScore {
                key,
                name: key.name(),
                raw: value,
                percentile: normalized.percentile,
                display: key.display_score(normalized.percentile),
                calibrated: normalized.calibrated,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrganismKind, OrganismProfile, Plant, RelationshipTables};
    use crate::utils::normalization::{PercentileParams, TierCalibration};
    use approx::assert_relative_eq;

    const TIER: ClimateTier = ClimateTier::HumidTemperate;

    fn scorer() -> GuildScorer {
        let plants = vec![
            Plant::new("oak").with_csr(80.0, 20.0, 10.0).with_height(20.0).with_growth_form("tree"),
            Plant::new("fern").with_csr(10.0, 70.0, 20.0).with_height(0.5).with_light(2.0),
            Plant::new("clover").with_csr(20.0, 20.0, 70.0).with_height(0.2).with_light(8.0),
            Plant::new("cactus").in_tiers(&[ClimateTier::Arid]),
        ]
        .into_iter()
        .map(|p| if p.id == "cactus" { p } else { p.in_tiers(&[TIER]) })
        .collect();
        let profiles = vec![
            OrganismProfile::new("oak").with(OrganismKind::Pollinators, ["apis"]),
            OrganismProfile::new("fern").with(OrganismKind::Pollinators, ["apis"]),
        ];
        GuildScorer::new(
            GuildData::new(plants, profiles, RelationshipTables::default()),
            CalibrationProfiles::new(),
            None,
        )
    }

    #[test]
    fn test_score_runs_all_stages() {
        let score = scorer()
            .score_guild(&GuildRequest::new(["oak", "fern", "clover"], TIER))
            .unwrap();

        assert!(!score.veto);
        assert_eq!(score.metrics.len(), 9);
        assert_eq!(
            score.stages,
            vec![
                ScoringStage::Init,
                ScoringStage::LoadData,
                ScoringStage::ClimateCheck,
                ScoringStage::ComputeNegative,
                ScoringStage::ComputePositive,
                ScoringStage::NormalizeAll,
                ScoringStage::Aggregate,
                ScoringStage::TerminalResult,
            ]
        );
        let mean = score.metrics.iter().map(|m| m.display).sum::<f64>() / 9.0;
        assert_relative_eq!(score.overall_score, mean);
        assert!(score.metrics.iter().all(|m| !m.calibrated));
    }

    #[test]
    fn test_climate_veto_short_circuits() {
        let score = scorer()
            .score_guild(&GuildRequest::new(["oak", "cactus"], TIER))
            .unwrap();

        assert!(score.veto);
        assert_eq!(score.overall_score, 0.0);
        assert!(score.metrics.is_empty());
        assert_eq!(score.stages.last(), Some(&ScoringStage::TerminalVeto));
        assert!(!score.stages.contains(&ScoringStage::ComputeNegative));
    }

    #[test]
    fn test_unknown_plants_veto() {
        let score = scorer()
            .score_guild(&GuildRequest::new(["oak", "baobab"], TIER))
            .unwrap();
        assert_eq!(
            score.veto_reason,
            Some(VetoReason::UnknownPlants { plant_ids: vec!["baobab".to_string()] })
        );
    }

    #[test]
    fn test_malformed_guild_rejected() {
        let result = scorer().score_guild(&GuildRequest::new(["oak", "oak"], TIER));
        assert_eq!(result.unwrap_err(), GuildError::DuplicatePlant { plant_id: "oak".into() });
    }

    #[test]
    fn test_calibrated_profile_is_used() {
        let mut tier_cal = TierCalibration::default();
        tier_cal.set(
            MetricKey::P6,
            PercentileParams::from_breakpoints(
                [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 1.2],
                0.6,
                0.3,
                100,
            ),
        );
        let mut calibration = Calibration::new();
        calibration.insert(TIER, tier_cal);

        let base = scorer();
        let scorer = GuildScorer::new(
            base.data().clone(),
            CalibrationProfiles::new().with_profile(2, calibration),
            None,
        );
        let score = scorer.score_guild(&GuildRequest::new(["oak", "fern"], TIER)).unwrap();

        let p6 = score.metric(MetricKey::P6).unwrap();
        // apis on both: (2/2)² = 1.0 → 90th percentile
        assert_relative_eq!(p6.raw, 1.0);
        assert_relative_eq!(p6.percentile, 90.0);
        assert!(p6.calibrated);
        assert_eq!(score.calibration_profile, Some(2));
    }

    #[test]
    fn test_batch_preserves_order() {
        let scorer = scorer();
        let requests = vec![
            GuildRequest::new(["oak", "fern"], TIER),
            GuildRequest::new(["oak"], TIER),
            GuildRequest::new(["fern", "clover"], TIER),
        ];
        let results = scorer.score_batch(&requests);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().plant_ids, vec!["oak", "fern"]);
        assert!(matches!(results[1], Err(GuildError::TooFewPlants { .. })));
        assert_eq!(results[2].as_ref().unwrap().plant_ids, vec!["fern", "clover"]);
    }
}
