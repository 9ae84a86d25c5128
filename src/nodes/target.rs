//! Target units and the target node classifier
//!
//! Status and type label move together: a replaced unit always carries an
//! evolved category and a demolished unit always carries the demolished
//! label. [`NodeType`] encodes that, and the only ways to change either are
//! [`TargetUnit::replace_with`] and [`TargetUnit::demolish`].

use geo_types::Point;
use serde::{Deserialize, Serialize};

use super::GapReason;
use crate::core::config::SimulationConfig;
use crate::core::types::{EvolvedCategory, LandCode, UnitId, ZoneId};
use crate::scoring::UNSCORED;
use crate::spatial::ParcelPoint;

/// Type label carried by demolished units
pub const DEMOLISHED_LABEL: &str = "Demolished_To_Grazing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeStatus {
    #[serde(rename = "Original_Urban_LowPri")]
    OriginalLowPriority,
    #[serde(rename = "Original_Urban_HighPri")]
    OriginalHighPriority,
    #[serde(rename = "Original_Transport")]
    OriginalTransport,
    #[serde(rename = "Original_NonUrban_Island")]
    OriginalNonUrban,
    Replaced,
    Demolished,
}

impl NodeStatus {
    pub fn is_urban_original(&self) -> bool {
        matches!(
            self,
            NodeStatus::OriginalLowPriority | NodeStatus::OriginalHighPriority
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::OriginalLowPriority => "Original_Urban_LowPri",
            NodeStatus::OriginalHighPriority => "Original_Urban_HighPri",
            NodeStatus::OriginalTransport => "Original_Transport",
            NodeStatus::OriginalNonUrban => "Original_NonUrban_Island",
            NodeStatus::Replaced => "Replaced",
            NodeStatus::Demolished => "Demolished",
        }
    }
}

/// The unit's type label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Descriptive label of the original land cover
    Original(String),
    /// Evolved category placed on a replaced unit
    Evolved(EvolvedCategory),
    Demolished,
}

impl NodeType {
    pub fn label(&self) -> &str {
        match self {
            NodeType::Original(label) => label,
            NodeType::Evolved(category) => category.code(),
            NodeType::Demolished => DEMOLISHED_LABEL,
        }
    }
}

/// Grazing classification, recomputed every phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GrazingType {
    DemolishedToGrazing,
    EvolvedToGrazing,
    EvolvedToForest,
    OriginalForest,
    OriginalGrazing,
    NonGrazing,
}

/// A demand-side island parcel reduced to a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetUnit {
    pub id: UnitId,
    pub origin_code: LandCode,
    pub status: NodeStatus,
    pub node_type: NodeType,
    pub zone: ZoneId,
    pub centroid_distance: f64,
    pub industrial_distance: f64,
    pub score: f64,
    pub is_grazing: bool,
    pub grazing_type: GrazingType,
    /// Set the first time the unit is demolished, never cleared
    pub was_demolished: bool,
    pub location: Point<f64>,
}

impl TargetUnit {
    pub fn new(
        id: UnitId,
        origin_code: LandCode,
        status: NodeStatus,
        node_type: NodeType,
        zone: ZoneId,
        location: Point<f64>,
        distance_sentinel: f64,
    ) -> Self {
        Self {
            id,
            origin_code,
            status,
            node_type,
            zone,
            centroid_distance: distance_sentinel,
            industrial_distance: distance_sentinel,
            score: UNSCORED,
            is_grazing: false,
            grazing_type: GrazingType::NonGrazing,
            was_demolished: false,
            location,
        }
    }

    /// Urban originals and demolished sites can receive an evolved unit
    pub fn is_replacement_slot(&self) -> bool {
        self.status.is_urban_original() || self.node_type == NodeType::Demolished
    }

    /// Only untouched urban originals can be demolished
    pub fn is_demolition_candidate(&self) -> bool {
        self.status.is_urban_original()
    }

    /// Place an evolved unit here; returns false if the slot is no longer open
    pub fn replace_with(&mut self, category: EvolvedCategory) -> bool {
        if !self.is_replacement_slot() {
            return false;
        }
        self.status = NodeStatus::Replaced;
        self.node_type = NodeType::Evolved(category);
        true
    }

    /// Demolish this unit; returns false if it is not an urban original
    pub fn demolish(&mut self) -> bool {
        if !self.is_demolition_candidate() {
            return false;
        }
        self.status = NodeStatus::Demolished;
        self.node_type = NodeType::Demolished;
        self.was_demolished = true;
        true
    }
}

/// Assign status and type label to a target point from its code
pub fn classify_target(
    point: &ParcelPoint,
    config: &SimulationConfig,
) -> Result<(NodeStatus, NodeType), GapReason> {
    let code = &point.code;
    if code.is_blank() {
        return Err(GapReason::BlankCode);
    }

    let label = config.type_label(code).ok_or(GapReason::NoTypeLabel)?;

    let status = if config.codes.low_priority_urban.contains(code) {
        NodeStatus::OriginalLowPriority
    } else if config.codes.high_priority_urban.contains(code) {
        NodeStatus::OriginalHighPriority
    } else if config.codes.transport.contains(code) {
        NodeStatus::OriginalTransport
    } else {
        NodeStatus::OriginalNonUrban
    };

    Ok((status, NodeType::Original(label.to_string())))
}
