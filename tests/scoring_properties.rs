//! End-to-end scoring properties over small in-memory guilds
//!
//! Run with: cargo test --test scoring_properties

use approx::assert_relative_eq;
use guild_scorer::metrics::{calculate_n1, calculate_n2, calculate_n4, calculate_p6};
use guild_scorer::utils::normalization::{
    PercentileParams, TierCalibration, PERCENTILE_LEVELS,
};
use guild_scorer::{
    Calibration, CalibrationProfiles, ClimateTier, GuildData, GuildError, GuildMembers,
    GuildRequest, GuildScorer, MetricKey, OrganismKind, OrganismProfile, Plant,
    RelationshipTables, VetoReason,
};

const TIER: ClimateTier = ClimateTier::HumidTemperate;

fn plants() -> Vec<Plant> {
    vec![
        Plant::new("malus").with_name("Malus domestica").with_csr(60.0, 30.0, 10.0).with_height(6.0).with_light(7.0).with_growth_form("tree").in_tiers(&[TIER]),
        Plant::new("allium").with_name("Allium schoenoprasum").with_csr(10.0, 40.0, 50.0).with_height(0.3).with_light(8.0).with_growth_form("herb").in_tiers(&[TIER]),
        Plant::new("trifolium").with_name("Trifolium repens").with_csr(20.0, 20.0, 60.0).with_height(0.2).with_light(8.0).with_growth_form("herb").in_tiers(&[TIER]),
        Plant::new("corylus").with_name("Corylus avellana").with_csr(70.0, 20.0, 10.0).with_height(5.0).with_light(5.0).with_growth_form("shrub").in_tiers(&[TIER]),
        Plant::new("opuntia").with_name("Opuntia ficus-indica").in_tiers(&[ClimateTier::Arid]),
    ]
}

fn profiles() -> Vec<OrganismProfile> {
    vec![
        OrganismProfile::new("malus")
            .with(OrganismKind::Herbivores, ["aphis_pomi", "cydia_pomonella"])
            .with(OrganismKind::PathogenicFungi, ["venturia", "botrytis"])
            .with(OrganismKind::Pollinators, ["apis_mellifera", "bombus_terrestris"]),
        OrganismProfile::new("allium")
            .with(OrganismKind::Herbivores, ["thrips_tabaci"])
            .with(OrganismKind::PathogenicFungi, ["botrytis"])
            .with(OrganismKind::FlowerVisitors, ["apis_mellifera"]),
        OrganismProfile::new("trifolium")
            .with(OrganismKind::Herbivores, ["aphis_pomi"])
            .with(OrganismKind::PathogenicFungi, ["botrytis"])
            .with(OrganismKind::Pollinators, ["bombus_terrestris", "apis_mellifera"]),
        OrganismProfile::new("corylus")
            .with(OrganismKind::Herbivores, ["curculio_nucum"])
            .with(OrganismKind::AmfFungi, ["glomus"]),
    ]
}

fn data() -> GuildData {
    GuildData::new(plants(), profiles(), RelationshipTables::default())
}

fn linear_params(offset: f64) -> PercentileParams {
    PercentileParams::from_breakpoints(PERCENTILE_LEVELS.map(|p| offset + p / 100.0), offset + 0.5, 0.3, 1000)
}

fn calibrated_scorer() -> GuildScorer {
    let mut tier_cal = TierCalibration::default();
    for (i, key) in MetricKey::ALL.into_iter().enumerate() {
        tier_cal.set(key, linear_params(i as f64 * 0.1));
    }
    let mut calibration = Calibration::new();
    calibration.insert(TIER, tier_cal);
    GuildScorer::new(data(), CalibrationProfiles::new().with_profile(4, calibration), None)
}

#[test]
fn test_scores_stay_in_range() {
    let scorers = [calibrated_scorer(), GuildScorer::new(data(), CalibrationProfiles::new(), None)];
    let guilds: [&[&str]; 3] = [
        &["malus", "allium"],
        &["malus", "allium", "trifolium"],
        &["malus", "allium", "trifolium", "corylus"],
    ];

    for scorer in &scorers {
        for ids in guilds {
            let score = scorer.score_guild(&GuildRequest::new(ids.iter().copied(), TIER)).unwrap();
            assert!(!score.veto);
            assert!((0.0..=100.0).contains(&score.overall_score));
            for metric in &score.metrics {
                assert!((0.0..=100.0).contains(&metric.percentile), "{:?}", metric);
                assert!((0.0..=100.0).contains(&metric.display), "{:?}", metric);
            }
        }
    }
}

#[test]
fn test_breakpoints_map_to_their_levels() {
    let params = linear_params(0.0);
    for (level, value) in PERCENTILE_LEVELS.iter().zip(params.breakpoints()) {
        assert_relative_eq!(params.percentile(value), *level, epsilon = 1e-9);
    }
    assert_eq!(params.percentile(-1.0), 0.0);
    assert_eq!(params.percentile(5.0), 100.0);
}

#[test]
fn test_normalization_is_monotonic() {
    let params = linear_params(0.2);
    let mut previous = f64::NEG_INFINITY;
    for step in 0..=200 {
        let percentile = params.percentile(step as f64 / 100.0);
        assert!(percentile >= previous);
        previous = percentile;
    }
}

#[test]
fn test_overlap_metrics_ignore_member_order() {
    let plants = plants();
    let profiles = profiles();
    let forward = GuildMembers::new(plants[..4].iter().collect(), profiles.iter().map(Some).collect());
    let reversed = GuildMembers::new(
        plants[..4].iter().rev().collect(),
        profiles.iter().rev().map(Some).collect(),
    );

    assert_relative_eq!(calculate_n1(&forward).raw, calculate_n1(&reversed).raw, epsilon = 1e-12);
    assert_relative_eq!(calculate_n2(&forward).raw, calculate_n2(&reversed).raw, epsilon = 1e-12);
    assert_relative_eq!(calculate_p6(&forward).raw, calculate_p6(&reversed).raw, epsilon = 1e-12);
}

#[test]
fn test_single_member_has_no_overlap() {
    let plants = plants();
    let profiles = profiles();
    let single = GuildMembers::new(vec![&plants[0]], vec![Some(&profiles[0])]);

    assert_eq!(calculate_n1(&single).raw, 0.0);
    assert_eq!(calculate_n2(&single).raw, 0.0);
    assert_eq!(calculate_p6(&single).raw, 0.0);
    assert_eq!(calculate_n4(&single, None).raw, 0.0);
}

#[test]
fn test_member_outside_tier_vetoes() {
    let scorer = calibrated_scorer();
    let score = scorer
        .score_guild(&GuildRequest::new(["malus", "opuntia"], TIER))
        .unwrap();

    assert!(score.veto);
    assert_eq!(score.overall_score, 0.0);
    assert!(score.metrics.is_empty());
    assert_eq!(
        score.veto_reason,
        Some(VetoReason::IncompatibleClimate {
            tier: TIER,
            plants: vec!["Opuntia ficus-indica".to_string()],
        })
    );

    // same guild scores in the cactus's own tier only if every member is there
    let arid = scorer
        .score_guild(&GuildRequest::new(["malus", "opuntia"], ClimateTier::Arid))
        .unwrap();
    assert!(arid.veto);
}

#[test]
fn test_missing_tier_column_vetoes() {
    let data = data().without_tier_columns(&[TIER]);
    let scorer = GuildScorer::new(data, CalibrationProfiles::new(), None);
    let score = scorer
        .score_guild(&GuildRequest::new(["malus", "allium"], TIER))
        .unwrap();
    assert_eq!(score.veto_reason, Some(VetoReason::MissingTierColumn { tier: TIER }));
}

#[test]
fn test_malformed_guilds_rejected() {
    let scorer = calibrated_scorer();

    assert_eq!(
        scorer.score_guild(&GuildRequest::new(["malus", "allium", "malus"], TIER)).unwrap_err(),
        GuildError::DuplicatePlant { plant_id: "malus".into() }
    );
    assert!(matches!(
        scorer.score_guild(&GuildRequest::new(["malus"], TIER)),
        Err(GuildError::TooFewPlants { count: 1, .. })
    ));
    let eleven: Vec<String> = (0..11).map(|i| format!("p{i}")).collect();
    assert!(matches!(
        scorer.score_guild(&GuildRequest::new(eleven, TIER)),
        Err(GuildError::TooManyPlants { count: 11, .. })
    ));
}

#[test]
fn test_plants_without_organism_records() {
    let scorer = GuildScorer::new(
        GuildData::new(plants(), Vec::new(), RelationshipTables::default()),
        CalibrationProfiles::new(),
        None,
    );
    let score = scorer
        .score_guild(&GuildRequest::new(["malus", "allium", "trifolium"], TIER))
        .unwrap();

    for key in [MetricKey::N1, MetricKey::N2, MetricKey::P1, MetricKey::P2, MetricKey::P3, MetricKey::P6] {
        let metric = score.metric(key).unwrap();
        assert_eq!(metric.raw, 0.0, "{key}");
        assert_relative_eq!(metric.percentile, 50.0);
    }
}

#[test]
fn test_identical_high_c_shrubs_conflict_fully() {
    let plants = [
        Plant::new("a").with_csr(90.0, 5.0, 5.0).with_height(2.0).with_growth_form("shrub"),
        Plant::new("b").with_csr(90.0, 5.0, 5.0).with_height(2.0).with_growth_form("shrub"),
    ];
    let members = GuildMembers::new(plants.iter().collect(), Vec::new());
    let result = calculate_n4(&members, None);
    assert_relative_eq!(result.total_conflicts, 1.0);
}

#[test]
fn test_score_serializes_to_json() {
    let score = calibrated_scorer()
        .score_guild(&GuildRequest::new(["malus", "allium", "trifolium", "corylus"], TIER))
        .unwrap();
    assert_eq!(score.calibration_profile, Some(4));

    let json = serde_json::to_value(&score).unwrap();
    assert_eq!(json["tier"], serde_json::json!(TIER));
    assert_eq!(json["metrics"].as_array().map(Vec::len), Some(9));
    assert_eq!(json["stages"].as_array().and_then(|s| s.last()), Some(&serde_json::json!("TERMINAL_RESULT")));
}
