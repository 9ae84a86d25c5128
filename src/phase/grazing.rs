//! Grazing classification pass (derived fields, recomputed every phase)

use std::collections::{BTreeMap, BTreeSet};

use crate::core::config::SimulationConfig;
use crate::core::types::{EvolvedCategory, LandCode};
use crate::nodes::{GrazingType, NodeStatus, NodeType, TargetUnit};

/// Precomputed code sets for the grazing pass
pub struct GrazingRules<'a> {
    config: &'a SimulationConfig,
    grazing_codes: BTreeSet<LandCode>,
}

impl<'a> GrazingRules<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self {
            config,
            grazing_codes: config.grazing_codes(),
        }
    }

    fn evolved(&self, category: EvolvedCategory) -> (bool, GrazingType) {
        let code = self.config.representative_code(category);
        let grazing = self.config.grazing_categories.contains(&category)
            || code.is_some_and(|c| self.grazing_codes.contains(c));

        if grazing {
            (true, GrazingType::EvolvedToGrazing)
        } else if code.is_some_and(|c| self.config.codes.forest.contains(c)) {
            (false, GrazingType::EvolvedToForest)
        } else {
            (false, GrazingType::NonGrazing)
        }
    }

    fn original(&self, code: &LandCode) -> (bool, GrazingType) {
        if self.config.codes.forest.contains(code) {
            (false, GrazingType::OriginalForest)
        } else if self.config.codes.base_grazing.contains(code) {
            (true, GrazingType::OriginalGrazing)
        } else {
            (false, GrazingType::NonGrazing)
        }
    }

    /// (is_grazing, grazing_type) for a unit's current status and type
    pub fn classify(&self, unit: &TargetUnit) -> (bool, GrazingType) {
        match (&unit.status, &unit.node_type) {
            (NodeStatus::Demolished, _) => (true, GrazingType::DemolishedToGrazing),
            (NodeStatus::Replaced, NodeType::Evolved(category)) => self.evolved(*category),
            (NodeStatus::OriginalNonUrban, _) => self.original(&unit.origin_code),
            _ => (false, GrazingType::NonGrazing),
        }
    }

    /// Refresh every unit's grazing fields; returns counts per grazing type
    pub fn apply(&self, units: &mut [TargetUnit]) -> BTreeMap<GrazingType, usize> {
        let mut counts = BTreeMap::new();
        for unit in units.iter_mut() {
            let (is_grazing, grazing_type) = self.classify(unit);
            unit.is_grazing = is_grazing;
            unit.grazing_type = grazing_type;
            *counts.entry(grazing_type).or_insert(0) += 1;
        }
        counts
    }
}
