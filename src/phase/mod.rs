//! Phase engine
//!
//! One invocation advances the whole target state by one phase: Step A
//! replaces the best open slots with evolved units, Step B demolishes the
//! least valuable urban originals, Step C refreshes the grazing fields.
//!
//! The engine works on its own copy of the state. The caller's units and
//! processed set are only borrowed, so a failed phase leaves them exactly as
//! they were.

pub mod demolition;
pub mod grazing;
pub mod replacement;

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::{PhaseSpec, SimulationConfig};
use crate::core::error::PhaseError;
use crate::core::types::{EvolvedCategory, UnitId};
use crate::nodes::{GrazingType, NodeStatus, SourceUnit, TargetUnit};

pub use demolition::{demolition_target, run_demolition, DemolitionOutcome};
pub use grazing::GrazingRules;
pub use replacement::{run_replacement, ReplacementOutcome};

/// Current and previous cumulative ratios for one phase
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseRatios {
    pub migration: f64,
    pub previous_migration: f64,
    pub demolition: f64,
    pub previous_demolition: f64,
}

impl PhaseRatios {
    /// Ratios for `phase` following a phase that reached `previous`
    pub fn following(phase: &PhaseSpec, previous_migration: f64, previous_demolition: f64) -> Self {
        Self {
            migration: phase.migration,
            previous_migration,
            demolition: phase.demolition,
            previous_demolition,
        }
    }

    fn validate(&self) -> Result<(), PhaseError> {
        let checks = [
            ("migration", self.migration, self.previous_migration),
            ("demolition", self.demolition, self.previous_demolition),
        ];
        for (field, value, previous) in checks {
            for v in [value, previous] {
                if !(0.0..=1.0).contains(&v) {
                    return Err(PhaseError::InvalidRatio { field, value: v });
                }
            }
            if value < previous {
                return Err(PhaseError::RatioRegression {
                    field,
                    value,
                    previous,
                });
            }
        }
        Ok(())
    }
}

/// Everything a phase reads from the previous state
#[derive(Debug, Clone, Copy)]
pub struct PhaseInput<'a> {
    pub units: &'a [TargetUnit],
    pub sources: &'a [SourceUnit],
    pub processed: &'a BTreeSet<UnitId>,
    pub total_source_count: usize,
    pub total_replaceable_count: usize,
    pub ratios: PhaseRatios,
}

/// Per-phase summary for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub label: String,
    pub ratios: PhaseRatios,
    pub sampled: usize,
    pub sample_shortfall: usize,
    pub evolved_node_count: usize,
    pub allocation: BTreeMap<EvolvedCategory, usize>,
    pub replaced: usize,
    pub slot_shortfall: usize,
    pub demolition_target: usize,
    pub demolished: usize,
    pub demolition_shortfall: usize,
    pub processed_total: usize,
    pub status_counts: BTreeMap<NodeStatus, usize>,
    pub grazing_counts: BTreeMap<GrazingType, usize>,
}

impl PhaseReport {
    fn new(
        label: &str,
        ratios: PhaseRatios,
        replacement: &ReplacementOutcome,
        demolition: &DemolitionOutcome,
        units: &[TargetUnit],
        processed_total: usize,
        grazing_counts: BTreeMap<GrazingType, usize>,
    ) -> Self {
        let mut status_counts = BTreeMap::new();
        for unit in units {
            *status_counts.entry(unit.status).or_insert(0) += 1;
        }

        Self {
            label: label.to_string(),
            ratios,
            sampled: replacement.sampled.len(),
            sample_shortfall: replacement.sample_shortfall(),
            evolved_node_count: replacement.evolved_node_count,
            allocation: replacement.allocation.clone(),
            replaced: replacement.replaced.len(),
            slot_shortfall: replacement.slot_shortfall(),
            demolition_target: demolition.target_total,
            demolished: demolition.demolished.len(),
            demolition_shortfall: demolition.shortfall(),
            processed_total,
            status_counts,
            grazing_counts,
        }
    }

    pub fn status_count(&self, status: NodeStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}

/// The complete state produced by one phase
#[derive(Debug, Clone)]
pub struct PhaseOutput {
    pub units: Vec<TargetUnit>,
    pub processed: BTreeSet<UnitId>,
    pub replacement: ReplacementOutcome,
    pub demolition: DemolitionOutcome,
    pub report: PhaseReport,
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a UnitId>) -> Result<(), PhaseError> {
    let mut seen = AHashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            return Err(PhaseError::DuplicateUnit(*id));
        }
    }
    Ok(())
}

/// Advance the target state by one phase
pub fn run_phase<R: Rng + ?Sized>(
    config: &SimulationConfig,
    phase: &PhaseSpec,
    input: PhaseInput<'_>,
    rng: &mut R,
) -> Result<PhaseOutput, PhaseError> {
    input.ratios.validate()?;
    check_unique(input.units.iter().map(|u| &u.id))?;
    check_unique(input.sources.iter().map(|u| &u.id))?;

    let mut units = input.units.to_vec();
    let mut processed = input.processed.clone();

    // Step A
    let replacement = run_replacement(
        &mut units,
        input.sources,
        &mut processed,
        input.total_source_count,
        input.ratios.migration,
        rng,
    );

    // Step B
    let protected: AHashSet<UnitId> = replacement.replaced.iter().map(|(id, _)| *id).collect();
    let demolition = run_demolition(
        &mut units,
        input.total_replaceable_count,
        input.ratios.demolition,
        &protected,
    );

    // Step C
    let grazing_counts = GrazingRules::new(config).apply(&mut units);

    let report = PhaseReport::new(
        &phase.label,
        input.ratios,
        &replacement,
        &demolition,
        &units,
        processed.len(),
        grazing_counts,
    );

    tracing::info!(
        phase = %phase.label,
        sampled = report.sampled,
        evolved = report.evolved_node_count,
        replaced = report.replaced,
        demolished = report.demolished,
        processed = report.processed_total,
        "Phase complete"
    );

    Ok(PhaseOutput {
        units,
        processed,
        replacement,
        demolition,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LandCode, ZoneId};
    use crate::nodes::NodeType;
    use geo_types::Point;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn target(id: u32, score: f64) -> TargetUnit {
        let mut u = TargetUnit::new(
            UnitId(id),
            LandCode::from("111"),
            NodeStatus::OriginalLowPriority,
            NodeType::Original("URB-Res_Single".into()),
            ZoneId(0),
            Point::new(0.0, 0.0),
            999_999.0,
        );
        u.score = score;
        u
    }

    fn source(id: u32) -> SourceUnit {
        SourceUnit {
            id: UnitId(id),
            origin_code: LandCode::from("251"),
            category: EvolvedCategory::Livestock,
            compression_factor: 2,
            location: Point::new(0.0, 0.0),
        }
    }

    fn input<'a>(
        units: &'a [TargetUnit],
        sources: &'a [SourceUnit],
        processed: &'a BTreeSet<UnitId>,
        ratios: PhaseRatios,
    ) -> PhaseInput<'a> {
        PhaseInput {
            units,
            sources,
            processed,
            total_source_count: sources.len(),
            total_replaceable_count: units.len(),
            ratios,
        }
    }

    #[test]
    fn test_replacement_and_demolition_are_disjoint() {
        let config = SimulationConfig::default();
        let units: Vec<TargetUnit> = (0..10).map(|i| target(i, 0.1 * i as f64)).collect();
        let sources: Vec<SourceUnit> = (0..8).map(source).collect();
        let processed = BTreeSet::new();
        let ratios = PhaseRatios {
            migration: 1.0,
            demolition: 0.5,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let out = run_phase(
            &config,
            &PhaseSpec::new("p1", 1.0, 0.5),
            input(&units, &sources, &processed, ratios),
            &mut rng,
        )
        .unwrap();

        let replaced: AHashSet<UnitId> = out.replacement.replaced.iter().map(|(id, _)| *id).collect();
        assert_eq!(replaced.len(), 4);
        assert_eq!(out.demolition.demolished.len(), 5);
        assert!(out.demolition.demolished.iter().all(|id| !replaced.contains(id)));
        assert_eq!(out.report.status_count(NodeStatus::Replaced), 4);
        assert_eq!(out.report.status_count(NodeStatus::Demolished), 5);
        assert_eq!(out.report.grazing_counts[&GrazingType::EvolvedToGrazing], 4);
        assert_eq!(out.processed.len(), 8);
    }

    #[test]
    fn test_input_state_is_untouched() {
        let config = SimulationConfig::default();
        let units: Vec<TargetUnit> = (0..4).map(|i| target(i, 0.2)).collect();
        let sources: Vec<SourceUnit> = (0..4).map(source).collect();
        let processed = BTreeSet::new();
        let ratios = PhaseRatios {
            migration: 1.0,
            demolition: 1.0,
            ..Default::default()
        };
        let snapshot = units.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        run_phase(
            &config,
            &PhaseSpec::new("p1", 1.0, 1.0),
            input(&units, &sources, &processed, ratios),
            &mut rng,
        )
        .unwrap();

        assert_eq!(units, snapshot);
        assert!(processed.is_empty());
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let config = SimulationConfig::default();
        let units = vec![target(1, 0.2), target(1, 0.3)];
        let processed = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let err = run_phase(
            &config,
            &PhaseSpec::new("p1", 0.5, 0.5),
            input(&units, &[], &processed, PhaseRatios::default()),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, PhaseError::DuplicateUnit(UnitId(1))));
    }

    #[test]
    fn test_ratio_checks() {
        let config = SimulationConfig::default();
        let processed = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let phase = PhaseSpec::new("p", 0.5, 0.5);

        let out_of_range = PhaseRatios {
            migration: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            run_phase(&config, &phase, input(&[], &[], &processed, out_of_range), &mut rng),
            Err(PhaseError::InvalidRatio { field: "migration", .. })
        ));

        let regressing = PhaseRatios {
            demolition: 0.3,
            previous_demolition: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            run_phase(&config, &phase, input(&[], &[], &processed, regressing), &mut rng),
            Err(PhaseError::RatioRegression { field: "demolition", .. })
        ));
    }

    #[test]
    fn test_following_carries_previous_ratios() {
        let ratios = PhaseRatios::following(&PhaseSpec::new("p2", 0.8, 0.7), 0.5, 0.4);
        assert_eq!(ratios.migration, 0.8);
        assert_eq!(ratios.previous_migration, 0.5);
        assert_eq!(ratios.demolition, 0.7);
        assert_eq!(ratios.previous_demolition, 0.4);
    }
}
