//! Step B: incremental demolition
//!
//! Demolition follows a cumulative schedule over the replaceable stock. The
//! count already achieved includes units that were demolished earlier and
//! have since been reused as replacement slots, so reuse never triggers
//! extra demolition.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::UnitId;
use crate::nodes::TargetUnit;
use crate::scoring::by_priority_asc;

/// What Step B did in one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemolitionOutcome {
    /// Cumulative number of units that should have been demolished by now
    pub target_total: usize,
    pub already_demolished: usize,
    pub requested: usize,
    pub eligible: usize,
    pub demolished: Vec<UnitId>,
}

impl DemolitionOutcome {
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.demolished.len())
    }
}

/// Cumulative demolition target for a ratio, capped at the replaceable stock
pub fn demolition_target(total_replaceable: usize, ratio: f64) -> usize {
    if ratio >= 1.0 {
        return total_replaceable;
    }
    ((total_replaceable as f64 * ratio).round() as usize).min(total_replaceable)
}

/// Run Step B; units in `protected` (this phase's replacements) are never touched
pub fn run_demolition(
    units: &mut [TargetUnit],
    total_replaceable: usize,
    demolition_ratio: f64,
    protected: &AHashSet<UnitId>,
) -> DemolitionOutcome {
    let target_total = demolition_target(total_replaceable, demolition_ratio);
    let already_demolished = units.iter().filter(|u| u.was_demolished).count();
    let requested = target_total.saturating_sub(already_demolished);

    let mut candidates: Vec<usize> = (0..units.len())
        .filter(|&i| units[i].is_demolition_candidate() && !protected.contains(&units[i].id))
        .collect();
    let eligible = candidates.len();

    let num_to_demolish = requested.min(eligible);
    if num_to_demolish < requested {
        tracing::warn!(
            requested,
            eligible,
            "Not enough demolition candidates to meet the schedule"
        );
    }

    candidates.sort_by(|&a, &b| by_priority_asc(&units[a], &units[b]));
    candidates.truncate(num_to_demolish);

    let mut demolished = Vec::with_capacity(candidates.len());
    for i in candidates {
        if units[i].demolish() {
            demolished.push(units[i].id);
        }
    }

    DemolitionOutcome {
        target_total,
        already_demolished,
        requested,
        eligible,
        demolished,
    }
}
