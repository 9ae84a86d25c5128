//! Phased simulation driver

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::{PhaseSpec, SimulationConfig};
use crate::core::error::{GacError, Result};
use crate::core::types::UnitId;
use crate::nodes::{SourceClassification, SourceUnit, TargetUnit};
use crate::phase::{run_phase, PhaseInput, PhaseRatios, PhaseReport};
use crate::prepare::{
    classify_and_score_target_nodes, classify_source_nodes, LandCoverFeed, TargetPreparation,
};
use crate::simulation::output::SimulationOutput;
use crate::spatial::GeometryService;
use crate::store::{FeatureSet, FeatureStore};

pub const SOURCE_NODES: &str = "source_nodes";
pub const ISLAND_NODES: &str = "island_nodes";

/// Store name for a phase result
pub fn phase_set_name(label: &str) -> String {
    format!("phase_{}", label)
}

/// Last committed state, threaded from phase to phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseState {
    pub units: Vec<TargetUnit>,
    pub processed: BTreeSet<UnitId>,
    pub migration_ratio: f64,
    pub demolition_ratio: f64,
    pub total_source_count: usize,
    pub total_replaceable_count: usize,
    /// Labels of the phases committed so far
    pub completed: Vec<String>,
}

impl PhaseState {
    pub fn initial(
        units: Vec<TargetUnit>,
        total_source_count: usize,
        total_replaceable_count: usize,
    ) -> Self {
        Self {
            units,
            processed: BTreeSet::new(),
            migration_ratio: 0.0,
            demolition_ratio: 0.0,
            total_source_count,
            total_replaceable_count,
            completed: Vec::new(),
        }
    }
}

/// Both prepared pools
#[derive(Debug, Clone, Default)]
pub struct PreparedNodes {
    pub sources: SourceClassification,
    pub targets: TargetPreparation,
}

/// Runs preparation and the configured phases against a feature store
pub struct Simulation<'a, S: FeatureStore + ?Sized> {
    config: &'a SimulationConfig,
    store: &'a mut S,
    rng: ChaCha8Rng,
    seed: Option<u64>,
}

impl<'a, S: FeatureStore + ?Sized> Simulation<'a, S> {
    /// Validates the configuration; seeds from the config or system entropy
    pub fn new(config: &'a SimulationConfig, store: &'a mut S) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self {
            config,
            store,
            rng,
            seed: config.seed,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = Some(seed);
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Classify both pools and persist them
    pub fn prepare<G: GeometryService + ?Sized>(
        &mut self,
        feed: &LandCoverFeed,
        geometry: &G,
    ) -> Result<PreparedNodes> {
        let sources = classify_source_nodes(feed, geometry, self.config, &mut self.rng)?;
        let targets =
            classify_and_score_target_nodes(&feed.parcels, &feed.islands, geometry, self.config)?;

        self.store
            .replace(&FeatureSet::Sources(sources.units.clone()), SOURCE_NODES)?;
        self.store
            .replace(&FeatureSet::Targets(targets.units.clone()), ISLAND_NODES)?;

        Ok(PreparedNodes { sources, targets })
    }

    /// Run one phase and commit it to `state` only if it succeeds
    pub fn step(
        &mut self,
        state: &mut PhaseState,
        phase: &PhaseSpec,
        sources: &[SourceUnit],
    ) -> Result<PhaseReport> {
        let ratios = PhaseRatios::following(phase, state.migration_ratio, state.demolition_ratio);
        let input = PhaseInput {
            units: &state.units,
            sources,
            processed: &state.processed,
            total_source_count: state.total_source_count,
            total_replaceable_count: state.total_replaceable_count,
            ratios,
        };

        let output = run_phase(self.config, phase, input, &mut self.rng)
            .map_err(|e| GacError::from(e).in_phase(&phase.label))?;

        self.store
            .replace(
                &FeatureSet::Targets(output.units.clone()),
                &phase_set_name(&phase.label),
            )
            .map_err(|e| GacError::from(e).in_phase(&phase.label))?;

        state.units = output.units;
        state.processed = output.processed;
        state.migration_ratio = phase.migration;
        state.demolition_ratio = phase.demolition;
        state.completed.push(phase.label.clone());

        Ok(output.report)
    }

    /// Run every configured phase in order
    pub fn run_phases(
        &mut self,
        sources: &[SourceUnit],
        targets: &TargetPreparation,
    ) -> Result<(PhaseState, Vec<PhaseReport>)> {
        let mut state = PhaseState::initial(
            targets.units.clone(),
            sources.len(),
            targets.replaceable_count,
        );
        let config = self.config;
        let mut reports = Vec::with_capacity(config.phases.len());

        for phase in &config.phases {
            tracing::info!(
                phase = %phase.label,
                migration = phase.migration,
                demolition = phase.demolition,
                "Starting phase"
            );
            reports.push(self.step(&mut state, phase, sources)?);
        }

        Ok((state, reports))
    }

    /// Prepare, run all phases, and summarize
    pub fn run<G: GeometryService + ?Sized>(
        &mut self,
        feed: &LandCoverFeed,
        geometry: &G,
    ) -> Result<SimulationOutput> {
        let start = std::time::Instant::now();

        let prepared = self.prepare(feed, geometry)?;
        let (state, reports) = self.run_phases(&prepared.sources.units, &prepared.targets)?;

        Ok(SimulationOutput::new(
            self.seed,
            &prepared,
            &state,
            reports,
            start.elapsed(),
        ))
    }
}
