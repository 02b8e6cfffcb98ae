//! METRIC N1: PATHOGEN FUNGI OVERLAP
//!
//! Penalizes fungal pathogens shared by several guild members. The penalty is
//! quadratic in the share of members hosting the fungus, and host-specific
//! pathogens weigh more than generalists:
//!
//!   raw = Σ (count / n)² × severity   over fungi on ≥ 2 members
//!   severity = 1.0 if any member lists the fungus as host-specific, else 0.6

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use crate::utils::organism_counter::{count_shared_organisms, shared_organisms, sum_over_shared};
use rustc_hash::FxHashSet;
use serde::Serialize;

const HOST_SPECIFIC_SEVERITY: f64 = 1.0;
const GENERALIST_SEVERITY: f64 = 0.6;

/// A pathogen shared by several members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedPathogen {
    pub name: String,
    pub plant_count: usize,
    pub host_specific: bool,
}

/// Result of N1 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct N1Result {
    /// Raw overlap penalty (calibration key "n1")
    pub raw: f64,
    /// Shared pathogens, most shared first
    pub shared_pathogens: Vec<SharedPathogen>,
}

/// Calculate N1: Pathogen fungi overlap
pub fn calculate_n1(members: &GuildMembers<'_>) -> N1Result {
    let n_plants = members.len();
    if n_plants == 0 {
        return N1Result::default();
    }

    let counts = count_shared_organisms(members, &[OrganismKind::PathogenicFungi]);

    let host_specific: FxHashSet<&str> = (0..n_plants)
        .flat_map(|idx| members.organisms(idx, OrganismKind::PathogenicFungiHostSpecific).iter())
        .collect();

    let severity = |fungus: &str| {
        if host_specific.contains(fungus) {
            HOST_SPECIFIC_SEVERITY
        } else {
            GENERALIST_SEVERITY
        }
    };

    let raw = sum_over_shared(&counts, |fungus, count| {
        let overlap_ratio = count as f64 / n_plants as f64;
        overlap_ratio.powi(2) * severity(fungus)
    });

    let shared_pathogens = shared_organisms(&counts)
        .into_iter()
        .map(|shared| SharedPathogen {
            host_specific: host_specific.contains(shared.name.as_str()),
            name: shared.name,
            plant_count: shared.plant_count,
        })
        .collect();

    N1Result { raw, shared_pathogens }
}
