//! Site suitability index (SSI) for replacement targets
//!
//! Scores are normalized per zone: a unit is compared only with the other
//! replaceable units on its own island, so the distance factors reflect local
//! geography rather than the absolute size of each island.
//!
//! score = w_status * status + w_centroid * inv_centroid + w_industrial * inv_industrial
//!
//! Every factor lies in [0, 1] and the weights sum to 1, so the score does too.

use std::cmp::{Ordering, Reverse};

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::config::SuitabilityWeights;
use crate::core::types::{UnitId, ZoneId};
use crate::nodes::{NodeStatus, TargetUnit};

/// Score given to units that are not ranked at all
pub const UNSCORED: f64 = -1.0;

const HIGH_PRIORITY_STATUS_SCORE: f64 = 1.0;
const LOW_PRIORITY_STATUS_SCORE: f64 = 0.1;

/// Normalized value when every unit in the zone sits at the same distance
const DEGENERATE_RANGE_SCORE: f64 = 0.5;

/// Unknown distance to the centre is neutral
const UNMEASURED_CENTROID_SCORE: f64 = 0.5;
/// No industry nearby is penalized
const UNMEASURED_INDUSTRIAL_SCORE: f64 = 0.0;

const RANGE_EPSILON: f64 = 1e-12;

/// Only urban originals are ranked for replacement
pub fn is_scoreable(status: NodeStatus) -> bool {
    status.is_urban_original()
}

pub fn status_score(status: NodeStatus) -> f64 {
    match status {
        NodeStatus::OriginalHighPriority => HIGH_PRIORITY_STATUS_SCORE,
        _ => LOW_PRIORITY_STATUS_SCORE,
    }
}

fn is_unmeasured(distance: f64, sentinel: f64) -> bool {
    !distance.is_finite() || distance >= sentinel
}

/// Min/max of the measured distances in one zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    pub min: f64,
    pub max: f64,
}

impl DistanceRange {
    /// Range over the measured values, or `None` if nothing was measured
    pub fn from_distances(distances: impl IntoIterator<Item = f64>, sentinel: f64) -> Option<Self> {
        distances
            .into_iter()
            .filter(|d| !is_unmeasured(*d, sentinel))
            .fold(None, |range, d| match range {
                None => Some(DistanceRange { min: d, max: d }),
                Some(r) => Some(DistanceRange {
                    min: r.min.min(d),
                    max: r.max.max(d),
                }),
            })
    }

    /// 1 at the nearest unit, 0 at the farthest
    pub fn inverse(&self, distance: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < RANGE_EPSILON {
            return DEGENERATE_RANGE_SCORE;
        }
        (1.0 - (distance - self.min) / span).clamp(0.0, 1.0)
    }
}

fn normalized_inverse(
    distance: f64,
    range: Option<DistanceRange>,
    sentinel: f64,
    unmeasured_score: f64,
) -> f64 {
    if is_unmeasured(distance, sentinel) {
        return unmeasured_score;
    }
    range.map_or(DEGENERATE_RANGE_SCORE, |r| r.inverse(distance))
}

/// Suitability of a single unit given its zone's distance ranges
pub fn suitability(
    unit: &TargetUnit,
    centroid_range: Option<DistanceRange>,
    industrial_range: Option<DistanceRange>,
    weights: &SuitabilityWeights,
    sentinel: f64,
) -> f64 {
    if !is_scoreable(unit.status) {
        return UNSCORED;
    }

    let inv_centroid = normalized_inverse(
        unit.centroid_distance,
        centroid_range,
        sentinel,
        UNMEASURED_CENTROID_SCORE,
    );
    let inv_industrial = normalized_inverse(
        unit.industrial_distance,
        industrial_range,
        sentinel,
        UNMEASURED_INDUSTRIAL_SCORE,
    );

    let score = weights.status * status_score(unit.status)
        + weights.centroid * inv_centroid
        + weights.industrial * inv_industrial;
    score.clamp(0.0, 1.0)
}

/// Score every unit in place, zone by zone
///
/// Units outside the replaceable statuses get [`UNSCORED`]. Returns the
/// number of zones that had at least one scoreable unit.
pub fn score_units(
    units: &mut [TargetUnit],
    weights: &SuitabilityWeights,
    sentinel: f64,
) -> usize {
    let mut zones: AHashMap<ZoneId, Vec<usize>> = AHashMap::new();
    for (idx, unit) in units.iter_mut().enumerate() {
        if is_scoreable(unit.status) {
            zones.entry(unit.zone).or_default().push(idx);
        } else {
            unit.score = UNSCORED;
        }
    }

    for (zone, members) in &zones {
        let centroid_range = DistanceRange::from_distances(
            members.iter().map(|&i| units[i].centroid_distance),
            sentinel,
        );
        let industrial_range = DistanceRange::from_distances(
            members.iter().map(|&i| units[i].industrial_distance),
            sentinel,
        );

        tracing::debug!(
            zone = %zone,
            units = members.len(),
            ?centroid_range,
            ?industrial_range,
            "Scoring zone"
        );

        for &i in members {
            units[i].score = suitability(
                &units[i],
                centroid_range,
                industrial_range,
                weights,
                sentinel,
            );
        }
    }

    zones.len()
}

fn effective_score(unit: &TargetUnit) -> OrderedFloat<f64> {
    if unit.score.is_finite() && unit.score >= 0.0 {
        OrderedFloat(unit.score)
    } else {
        OrderedFloat(UNSCORED)
    }
}

/// Best replacement target first; ties go to the lower id
pub fn by_priority_desc(a: &TargetUnit, b: &TargetUnit) -> Ordering {
    (Reverse(effective_score(a)), a.id).cmp(&(Reverse(effective_score(b)), b.id))
}

/// Least valuable unit first; ties go to the lower id
pub fn by_priority_asc(a: &TargetUnit, b: &TargetUnit) -> Ordering {
    (effective_score(a), a.id).cmp(&(effective_score(b), b.id))
}

/// Ids of all scoreable units, best first
pub fn rank_by_suitability(units: &[TargetUnit]) -> Vec<UnitId> {
    let mut ranked: Vec<&TargetUnit> = units.iter().filter(|u| is_scoreable(u.status)).collect();
    ranked.sort_by(|a, b| by_priority_desc(a, b));
    ranked.into_iter().map(|u| u.id).collect()
}
