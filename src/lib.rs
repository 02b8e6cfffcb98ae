//! Guild Scorer
//!
//! Scores plant guilds for companion-planting compatibility: a climate-tier
//! veto, nine calibrated risk/benefit metrics and the percentile calibration
//! that turns their raw values into population-relative percentiles.
//!
//! - `data`: table loading with Polars into typed rows
//! - `climate`: climate compatibility filter
//! - `metrics/`: metric implementations (N1, N2, N4, P1-P6, N5/N6 flags)
//! - `utils/`: normalization and organism counting utilities
//! - `calibration`: offline percentile calibration
//! - `scorer`: the scoring pipeline

pub mod calibration;
pub mod climate;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod model;
pub mod scorer;
pub mod tier;
pub mod utils;

// Re-export commonly used types
pub use calibration::{calibrate_csr, Calibrator};
pub use climate::{ClimateCheck, VetoReason};
pub use config::ScorerConfig;
pub use data::{GuildData, GuildMembers};
pub use error::{GuildError, MAX_GUILD_SIZE, MIN_GUILD_SIZE};
pub use metrics::{MetricKey, RawScores};
pub use model::{OrganismKind, OrganismProfile, OrganismSet, Plant, RelationshipTables};
pub use scorer::{GuildRequest, GuildScore, GuildScorer, MetricScore, ScoringStage};
pub use tier::ClimateTier;
pub use utils::{Calibration, CalibrationProfiles, CsrCalibration};
