//! Utility modules for guild scoring
//!
//! Contains shared functionality used across multiple metrics:
//! - Normalization: Percentile transformation
//! - Organism counting: Shared organism network analysis
//! - Table helpers: Typed column extraction from Polars frames

pub mod lazy_helpers;
pub mod normalization;
pub mod organism_counter;

// Re-export commonly used types
pub use normalization::{
    csr_to_percentile, percentile_normalize, Calibration, CalibrationProfiles, CsrCalibration,
};
pub use organism_counter::count_shared_organisms;
