//! METRIC P6: SHARED POLLINATOR SUPPORT
//!
//! Same quadratic overlap as N1/N2, but over pollinators and flower visitors
//! and with the sign flipped: a pollinator shared by many members is a
//! benefit (stronger local pollinator population).
//!
//!   raw = Σ (count / n)²   over visitors on ≥ 2 members

use crate::data::GuildMembers;
use crate::model::OrganismKind;
use crate::utils::organism_counter::{
    count_shared_organisms, shared_organisms, sum_over_shared, SharedOrganism,
};
use serde::Serialize;

/// Result of P6 calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct P6Result {
    /// Quadratic overlap (calibration key "p6")
    pub raw: f64,
    /// Shared pollinators, most shared first
    pub shared_pollinators: Vec<SharedOrganism>,
}

/// Calculate P6: Shared pollinators
pub fn calculate_p6(members: &GuildMembers<'_>) -> P6Result {
    let n_plants = members.len();
    if n_plants == 0 {
        return P6Result::default();
    }

    let counts = count_shared_organisms(
        members,
        &[OrganismKind::Pollinators, OrganismKind::FlowerVisitors],
    );
    let raw = sum_over_shared(&counts, |_, count| (count as f64 / n_plants as f64).powi(2));

    P6Result {
        raw,
        shared_pollinators: shared_organisms(&counts),
    }
}
