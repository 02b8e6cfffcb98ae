//! Calibrate → save → load → score, through the public API
//!
//! Run with: cargo test --test calibration_pipeline

use approx::assert_relative_eq;
use guild_scorer::utils::normalization::profile_file_name;
use guild_scorer::{
    calibrate_csr, Calibration, CalibrationProfiles, Calibrator, ClimateTier, CsrCalibration,
    GuildData, GuildRequest, GuildScorer, MetricKey, OrganismKind, OrganismProfile, Plant,
    RelationshipTables,
};
use std::path::PathBuf;

const TIER: ClimateTier = ClimateTier::Mediterranean;

fn tier_data() -> GuildData {
    let plants = (0..24)
        .map(|i| {
            Plant::new(format!("wfo-{i:02}"))
                .with_csr((i * 4) as f64, 50.0 - i as f64, (i * 2) as f64)
                .with_height(0.3 * i as f64)
                .with_light(2.0 + (i % 7) as f64)
                .with_growth_form(if i % 3 == 0 { "tree" } else { "herb" })
                .in_tiers(&[TIER])
        })
        .collect();
    let profiles = (0..24)
        .map(|i| {
            OrganismProfile::new(format!("wfo-{i:02}"))
                .with(OrganismKind::Herbivores, [format!("beetle_{}", i % 5)])
                .with(OrganismKind::PathogenicFungi, [format!("rust_{}", i % 4)])
                .with(OrganismKind::Pollinators, [format!("bee_{}", i % 3)])
        })
        .collect();
    GuildData::new(plants, profiles, RelationshipTables::default())
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("guild_scorer_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_calibration_round_trip_and_scoring() {
    let data = tier_data();
    let calibration = Calibrator::new(&data, None)
        .with_samples(400)
        .with_seed(11)
        .calibrate(3);

    assert_eq!(calibration.tier_count(), 1);
    assert!(calibration.validate().is_ok());
    let params = calibration.params(MetricKey::P6, TIER).unwrap();
    assert_eq!(params.sample_count, 400);
    assert!(params.is_monotonic());

    let dir = scratch_dir("profiles");
    let path = dir.join(profile_file_name(3));
    calibration.save(&path).unwrap();

    let loaded = Calibration::load(&path).unwrap();
    for key in MetricKey::ALL {
        let (a, b) = (calibration.params(key, TIER).unwrap(), loaded.params(key, TIER).unwrap());
        for (x, y) in a.breakpoints().iter().zip(b.breakpoints()) {
            assert_relative_eq!(*x, y, epsilon = 1e-12);
        }
    }

    let profiles = CalibrationProfiles::load_dir(&dir, &[2, 3, 7]).unwrap();
    assert_eq!(profiles.sizes(), vec![3]);

    let scorer = GuildScorer::new(data.clone(), profiles, None);
    let score = scorer
        .score_guild(&GuildRequest::new(["wfo-00", "wfo-05", "wfo-10"], TIER))
        .unwrap();
    assert_eq!(score.calibration_profile, Some(3));
    assert!(score.metrics.iter().all(|m| m.calibrated));
    assert!((0.0..=100.0).contains(&score.overall_score));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_same_seed_same_artifact() {
    let data = tier_data();
    let a = Calibrator::new(&data, None).with_samples(200).with_seed(3).calibrate(2);
    let b = Calibrator::new(&data, None).with_samples(200).with_seed(3).calibrate(2);
    assert_eq!(a, b);
}

#[test]
fn test_csr_calibration_round_trip() {
    let data = tier_data();
    let csr = calibrate_csr(&data).unwrap();
    assert_eq!(csr.c.n_samples, 24);
    assert!(csr.c.breakpoints().windows(2).all(|w| w[0] <= w[1]));

    let dir = scratch_dir("csr");
    let path = dir.join("csr_percentile_calibration_global.json");
    csr.save(&path).unwrap();
    let loaded = CsrCalibration::load(&path).unwrap();
    assert_relative_eq!(loaded.c.p75, csr.c.p75, epsilon = 1e-12);
    assert_relative_eq!(loaded.r.p50, csr.r.p50, epsilon = 1e-12);

    let _ = std::fs::remove_dir_all(&dir);
}
