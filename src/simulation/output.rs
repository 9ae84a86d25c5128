//! Simulation output and serialization

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::nodes::{ClassificationGap, GrazingType, NodeStatus, TargetUnit};
use crate::phase::PhaseReport;
use crate::simulation::driver::{PhaseState, PreparedNodes};

/// Complete simulation output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub seed: Option<u64>,
    pub preparation: PreparationStats,
    pub phases: Vec<PhaseReport>,
    pub final_state: FinalSnapshot,
    pub statistics: SimulationStats,
    /// Every unit left out of a pool, with the reason
    pub gaps: Vec<ClassificationGap>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreparationStats {
    pub source_units: usize,
    pub source_gaps: usize,
    pub target_units: usize,
    pub target_gaps: usize,
    pub replaceable: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalSnapshot {
    pub status_counts: BTreeMap<NodeStatus, usize>,
    pub grazing_counts: BTreeMap<GrazingType, usize>,
    pub units: Vec<TargetUnit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationStats {
    pub phases_run: usize,
    pub simulation_time_ms: u64,
    pub sources_processed: usize,
    pub replaced: usize,
    pub demolished: usize,
    pub ever_demolished: usize,
    pub grazing_units: usize,
}

impl SimulationOutput {
    pub fn new(
        seed: Option<u64>,
        prepared: &PreparedNodes,
        state: &PhaseState,
        phases: Vec<PhaseReport>,
        elapsed: Duration,
    ) -> Self {
        let units = &state.units;

        let mut status_counts = BTreeMap::new();
        let mut grazing_counts = BTreeMap::new();
        for unit in units {
            *status_counts.entry(unit.status).or_insert(0) += 1;
            *grazing_counts.entry(unit.grazing_type).or_insert(0) += 1;
        }

        let count = |status: NodeStatus| status_counts.get(&status).copied().unwrap_or(0);
        let statistics = SimulationStats {
            phases_run: phases.len(),
            simulation_time_ms: elapsed.as_millis() as u64,
            sources_processed: state.processed.len(),
            replaced: count(NodeStatus::Replaced),
            demolished: count(NodeStatus::Demolished),
            ever_demolished: units.iter().filter(|u| u.was_demolished).count(),
            grazing_units: units.iter().filter(|u| u.is_grazing).count(),
        };

        let mut gaps = prepared.sources.gaps.clone();
        gaps.extend(prepared.targets.gaps.iter().cloned());

        Self {
            seed,
            preparation: PreparationStats {
                source_units: prepared.sources.units.len(),
                source_gaps: prepared.sources.gaps.len(),
                target_units: prepared.targets.units.len(),
                target_gaps: prepared.targets.gaps.len(),
                replaceable: prepared.targets.replaceable_count,
            },
            phases,
            final_state: FinalSnapshot {
                status_counts,
                grazing_counts,
                units: units.clone(),
            },
            statistics,
            gaps,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Ran {} phases in {}ms: {} source units, {} island units ({} replaceable)",
            self.statistics.phases_run,
            self.statistics.simulation_time_ms,
            self.preparation.source_units,
            self.preparation.target_units,
            self.preparation.replaceable,
        )];
        for phase in &self.phases {
            lines.push(format!(
                "  {}: sampled {}, evolved {}, replaced {}, demolished {}",
                phase.label, phase.sampled, phase.evolved_node_count, phase.replaced, phase.demolished,
            ));
        }
        lines.push(format!(
            "{} processed, {} replaced, {} demolished ({} ever), {} grazing",
            self.statistics.sources_processed,
            self.statistics.replaced,
            self.statistics.demolished,
            self.statistics.ever_demolished,
            self.statistics.grazing_units,
        ));
        lines.join("\n")
    }
}
