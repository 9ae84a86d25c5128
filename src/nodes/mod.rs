//! Source and target units ("digital nodes") and their classifiers
//!
//! Every parcel is reduced to a single point before it enters the
//! simulation. Source units supply consolidation potential; target units are
//! the island parcels that get replaced or demolished.

pub mod source;
pub mod target;

use serde::{Deserialize, Serialize};

use crate::core::types::{EvolvedCategory, LandCode, UnitId};

pub use source::{classify_source, classify_sources, SourceClassification, SourceUnit};
pub use target::{
    classify_target, GrazingType, NodeStatus, NodeType, TargetUnit, DEMOLISHED_LABEL,
};

/// Why a unit was left out of its pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GapReason {
    BlankCode,
    NotSourceEligible,
    NoSourceRule,
    UnconfiguredCategory(EvolvedCategory),
    ZeroCompression(EvolvedCategory),
    NoTypeLabel,
    OutsideZones,
}

impl std::fmt::Display for GapReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapReason::BlankCode => write!(f, "blank land-cover code"),
            GapReason::NotSourceEligible => write!(f, "code is not source-eligible"),
            GapReason::NoSourceRule => write!(f, "no source classification rule"),
            GapReason::UnconfiguredCategory(c) => write!(f, "category {} is not configured", c),
            GapReason::ZeroCompression(c) => write!(f, "category {} has zero compression factor", c),
            GapReason::NoTypeLabel => write!(f, "no type label for code"),
            GapReason::OutsideZones => write!(f, "point falls outside every zone"),
        }
    }
}

/// A unit excluded from its pool, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationGap {
    pub id: UnitId,
    pub code: LandCode,
    pub reason: GapReason,
}

impl ClassificationGap {
    pub fn new(id: UnitId, code: LandCode, reason: GapReason) -> Self {
        tracing::warn!(unit = %id, code = %code, reason = %reason, "Unit excluded from pool");
        Self { id, code, reason }
    }
}
