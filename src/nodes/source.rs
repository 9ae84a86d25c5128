//! Source units and the source node classifier

use geo_types::Point;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ClassificationGap, GapReason};
use crate::core::config::{SimulationConfig, SourceRule};
use crate::core::types::{EvolvedCategory, LandCode, UnitId};
use crate::spatial::ParcelPoint;

/// A supply-side parcel reduced to a point
///
/// Only units with a configured category and a positive compression factor
/// make it into the pool, so both are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: UnitId,
    pub origin_code: LandCode,
    pub category: EvolvedCategory,
    /// Units of this origin needed to yield one evolved unit
    pub compression_factor: u32,
    pub location: Point<f64>,
}

impl SourceUnit {
    /// Fraction of an evolved unit this source contributes
    pub fn potential(&self) -> f64 {
        1.0 / self.compression_factor as f64
    }
}

/// Result of classifying a batch of source points
#[derive(Debug, Clone, Default)]
pub struct SourceClassification {
    pub units: Vec<SourceUnit>,
    pub gaps: Vec<ClassificationGap>,
}

impl SourceClassification {
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }
}

/// Resolve the evolved category for a code, drawing for split rules
fn resolve_category<R: Rng + ?Sized>(rule: &SourceRule, rng: &mut R) -> EvolvedCategory {
    match rule {
        SourceRule::Fixed { category } => *category,
        SourceRule::Split {
            primary,
            secondary,
            primary_share,
        } => {
            if rng.gen::<f64>() < *primary_share {
                *primary
            } else {
                *secondary
            }
        }
    }
}

/// Assign an evolved category and compression factor to one source point
pub fn classify_source<R: Rng + ?Sized>(
    point: &ParcelPoint,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SourceUnit, GapReason> {
    if point.code.is_blank() {
        return Err(GapReason::BlankCode);
    }
    if !config.codes.source_eligible.contains(&point.code) {
        return Err(GapReason::NotSourceEligible);
    }

    let rule = config
        .source_rules
        .get(&point.code)
        .ok_or(GapReason::NoSourceRule)?;
    let category = resolve_category(rule, rng);

    let compression_factor = config
        .compression_factor(category)
        .ok_or(GapReason::UnconfiguredCategory(category))?;
    if compression_factor == 0 {
        return Err(GapReason::ZeroCompression(category));
    }

    Ok(SourceUnit {
        id: point.id,
        origin_code: point.code.clone(),
        category,
        compression_factor,
        location: point.location,
    })
}

/// Classify every source point, logging and collecting the ones left out
pub fn classify_sources<R: Rng + ?Sized>(
    points: &[ParcelPoint],
    config: &SimulationConfig,
    rng: &mut R,
) -> SourceClassification {
    let mut result = SourceClassification::default();

    for point in points {
        match classify_source(point, config, rng) {
            Ok(unit) => result.units.push(unit),
            Err(reason) => result
                .gaps
                .push(ClassificationGap::new(point.id, point.code.clone(), reason)),
        }
    }

    tracing::info!(
        classified = result.units.len(),
        excluded = result.gaps.len(),
        "Source nodes classified"
    );
    result
}
