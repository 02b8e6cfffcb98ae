//! Table loading from CSV sources into a working scorer
//!
//! Run with: cargo test --test data_loading

use guild_scorer::{
    CalibrationProfiles, ClimateTier, GuildData, GuildRequest, GuildScorer, MetricKey,
    OrganismKind, ScorerConfig, VetoReason,
};
use std::fs;
use std::path::PathBuf;

fn write_tables(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("guild_scorer_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    // no tier_6_arid column
    fs::write(
        dir.join("plants.csv"),
        "plant_id,scientific_name,C,S,R,EIVEres-L,height_m,growth_form,nitrogen_fixation_rating,soil_ph,\
tier_1_tropical,tier_2_mediterranean,tier_3_humid_temperate,tier_4_continental,tier_5_boreal_polar\n\
wfo-1,Malus domestica,60.0,30.0,10.0,7.0,6.0,tree,Low,6.5,false,true,true,true,false\n\
wfo-2,Trifolium repens,20.0,20.0,60.0,8.0,0.2,herb,High,6.0,false,false,true,true,false\n\
wfo-3,Allium schoenoprasum,10.0,40.0,50.0,,0.3,herb,,7.2,false,true,true,false,false\n",
    )
    .unwrap();
    fs::write(
        dir.join("organisms.csv"),
        "plant_id,herbivores,pollinators,flower_visitors\n\
wfo-1,aphis_pomi|cydia_pomonella,apis_mellifera|bombus_terrestris,syrphus\n\
wfo-2,aphis_pomi,apis_mellifera,syrphus\n\
wfo-3,thrips_tabaci,bombus_terrestris,apis_mellifera\n",
    )
    .unwrap();
    fs::write(
        dir.join("fungi.csv"),
        "plant_id,pathogenic_fungi,mycoparasite_fungi,amf_fungi\n\
wfo-1,venturia_inaequalis|botrytis_cinerea,trichoderma_harzianum,glomus\n\
wfo-2,botrytis_cinerea,ampelomyces,glomus\n\
wfo-3,puccinia_allii,ampelomyces,rhizophagus\n",
    )
    .unwrap();
    fs::write(dir.join("predators.csv"), "herbivore,predators\naphis_pomi,coccinella|chrysoperla\n").unwrap();
    fs::write(dir.join("parasites.csv"), "herbivore,entomopathogenic_fungi\naphis_pomi,beauveria\n").unwrap();
    fs::write(dir.join("antagonists.csv"), "pathogen,antagonists\nbotrytis_cinerea,trichoderma_harzianum\n").unwrap();
    dir
}

fn config(dir: PathBuf) -> ScorerConfig {
    ScorerConfig {
        calibration_dir: dir.join("calibration"),
        data_dir: dir,
        plants_file: "plants.csv".into(),
        organisms_file: "organisms.csv".into(),
        fungi_file: "fungi.csv".into(),
        herbivore_predators_file: "predators.csv".into(),
        insect_parasites_file: "parasites.csv".into(),
        pathogen_antagonists_file: "antagonists.csv".into(),
        ..ScorerConfig::default()
    }
}

#[test]
fn test_csv_tables_load_into_typed_rows() {
    let dir = write_tables("load");
    let data = GuildData::load(&config(dir.clone())).unwrap();

    assert_eq!(data.plant_count(), 3);
    let allium = data.plant("wfo-3").unwrap();
    assert_eq!(allium.scientific_name, "Allium schoenoprasum");
    assert_eq!(allium.light_pref, None);
    assert_eq!(allium.nitrogen_fixation, None);
    assert!(allium.tiers.contains(ClimateTier::Mediterranean));
    assert!(!allium.tiers.contains(ClimateTier::Continental));

    assert!(data.has_tier_column(ClimateTier::HumidTemperate));
    assert!(!data.has_tier_column(ClimateTier::Arid));
    assert_eq!(data.plants_in_tier(ClimateTier::Continental), vec!["wfo-1", "wfo-2"]);

    let malus = data.organisms("wfo-1").unwrap();
    assert_eq!(malus.organisms(OrganismKind::Herbivores).len(), 2);
    assert!(malus.organisms(OrganismKind::MycoparasiteFungi).contains("trichoderma_harzianum"));
    assert!(data.relationships().herbivore_predators.get("aphis_pomi").is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_scorer_from_loaded_tables() {
    let dir = write_tables("score");
    let config = config(dir.clone());
    let scorer = GuildScorer::from_config(&config).unwrap();
    assert!(scorer.profiles().is_empty());
    assert!(scorer.csr_calibration().is_none());

    let score = scorer
        .score_guild(&GuildRequest::new(["wfo-1", "wfo-2", "wfo-3"], ClimateTier::HumidTemperate))
        .unwrap();
    assert!(!score.veto);
    assert!(score.metric(MetricKey::N1).unwrap().raw > 0.0);
    assert!(score.metric(MetricKey::P2).unwrap().raw > 0.0);
    assert!(score.metric(MetricKey::P3).unwrap().raw > 0.0);

    let flags = score.flags.as_ref().unwrap();
    assert_eq!(flags.nitrogen.fixers, vec!["Trifolium repens"]);
    assert_eq!(flags.soil_ph.label, "6.0-7.2");

    let arid = scorer
        .score_guild(&GuildRequest::new(["wfo-1", "wfo-2"], ClimateTier::Arid))
        .unwrap();
    assert_eq!(arid.veto_reason, Some(VetoReason::MissingTierColumn { tier: ClimateTier::Arid }));

    let _ = fs::remove_dir_all(&dir);
}
