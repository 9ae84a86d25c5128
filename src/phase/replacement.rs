//! Step A: incremental replacement
//!
//! Newly sampled source units are converted into evolved-node demand, which
//! is placed on the best-ranked open slots (urban originals and demolished
//! sites).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::allocation::allocate_integer_counts;
use crate::core::types::{EvolvedCategory, UnitId};
use crate::nodes::{SourceUnit, TargetUnit};
use crate::scoring::by_priority_desc;

/// What Step A did in one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplacementOutcome {
    /// Cumulative number of source units that should be processed by now
    pub target_source_total: usize,
    /// New source units this phase asked for
    pub requested: usize,
    /// Source units actually sampled
    pub sampled: Vec<UnitId>,
    pub potentials: BTreeMap<EvolvedCategory, f64>,
    pub evolved_node_count: usize,
    pub allocation: BTreeMap<EvolvedCategory, usize>,
    pub eligible_slots: usize,
    pub replaced: Vec<(UnitId, EvolvedCategory)>,
}

impl ReplacementOutcome {
    pub fn sample_shortfall(&self) -> usize {
        self.requested.saturating_sub(self.sampled.len())
    }

    pub fn slot_shortfall(&self) -> usize {
        self.evolved_node_count.saturating_sub(self.replaced.len())
    }
}

/// Draw up to `count` unprocessed source units
///
/// Asking for more than are available returns everything that is left.
pub fn sample_unprocessed<'a, R: Rng + ?Sized>(
    pool: &'a [SourceUnit],
    processed: &BTreeSet<UnitId>,
    count: usize,
    rng: &mut R,
) -> Vec<&'a SourceUnit> {
    let available: Vec<&SourceUnit> = pool.iter().filter(|u| !processed.contains(&u.id)).collect();
    let amount = count.min(available.len());
    if amount < count {
        tracing::warn!(
            requested = count,
            available = available.len(),
            "Not enough unprocessed source units; sampling all that remain"
        );
    }

    rand::seq::index::sample(rng, available.len(), amount)
        .into_iter()
        .map(|i| available[i])
        .collect()
}

/// Evolved potential per category: each unit contributes 1 / compression factor
pub fn category_potentials(sampled: &[&SourceUnit]) -> BTreeMap<EvolvedCategory, f64> {
    let mut potentials = BTreeMap::new();
    for unit in sampled {
        *potentials.entry(unit.category).or_insert(0.0) += unit.potential();
    }
    potentials
}

/// Indices of the `count` best open slots, best first
pub fn select_slots(units: &[TargetUnit], count: usize) -> Vec<usize> {
    let mut open: Vec<usize> = (0..units.len())
        .filter(|&i| units[i].is_replacement_slot())
        .collect();
    open.sort_by(|&a, &b| by_priority_desc(&units[a], &units[b]));
    open.truncate(count);
    open
}

/// Deal categories onto slots in rotation until either runs out
///
/// After each assignment the category moves to the back of the queue, so
/// no category is favoured when counts are equal.
pub fn assign_round_robin(
    slots: &[usize],
    allocation: &BTreeMap<EvolvedCategory, usize>,
) -> Vec<(usize, EvolvedCategory)> {
    let mut queue: VecDeque<(EvolvedCategory, usize)> = allocation
        .iter()
        .filter(|(_, n)| **n > 0)
        .map(|(c, n)| (*c, *n))
        .collect();

    let mut assignments = Vec::with_capacity(slots.len());
    for &slot in slots {
        let Some((category, remaining)) = queue.pop_front() else {
            break;
        };
        assignments.push((slot, category));
        if remaining > 1 {
            queue.push_back((category, remaining - 1));
        }
    }
    assignments
}

/// Run Step A against `units`, recording sampled sources in `processed`
pub fn run_replacement<R: Rng + ?Sized>(
    units: &mut [TargetUnit],
    sources: &[SourceUnit],
    processed: &mut BTreeSet<UnitId>,
    total_source_count: usize,
    migration_ratio: f64,
    rng: &mut R,
) -> ReplacementOutcome {
    let target_source_total = (total_source_count as f64 * migration_ratio).round() as usize;
    let requested = target_source_total.saturating_sub(processed.len());

    let sampled = sample_unprocessed(sources, processed, requested, rng);
    let potentials = category_potentials(&sampled);
    let total_potential: f64 = potentials.values().sum();
    let evolved_node_count = total_potential.round() as usize;
    let allocation = allocate_integer_counts(&potentials, evolved_node_count, rng);

    let eligible_slots = units.iter().filter(|u| u.is_replacement_slot()).count();
    let num_to_replace = evolved_node_count.min(eligible_slots);
    if num_to_replace < evolved_node_count {
        tracing::warn!(
            evolved_node_count,
            eligible_slots,
            "Not enough replacement slots for all evolved nodes"
        );
    }

    let slots = select_slots(units, num_to_replace);
    let mut replaced = Vec::with_capacity(slots.len());
    for (slot, category) in assign_round_robin(&slots, &allocation) {
        let unit = &mut units[slot];
        if unit.replace_with(category) {
            replaced.push((unit.id, category));
        } else {
            tracing::debug!(unit = %unit.id, "Slot already consumed; skipping");
        }
    }

    let sampled: Vec<UnitId> = sampled.iter().map(|u| u.id).collect();
    processed.extend(sampled.iter().copied());

    ReplacementOutcome {
        target_source_total,
        requested,
        sampled,
        potentials,
        evolved_node_count,
        allocation,
        eligible_slots,
        replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LandCode, ZoneId};
    use crate::nodes::{NodeStatus, NodeType};
    use geo_types::Point;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn source(id: u32, category: EvolvedCategory, factor: u32) -> SourceUnit {
        SourceUnit {
            id: UnitId(id),
            origin_code: LandCode::from("211"),
            category,
            compression_factor: factor,
            location: Point::new(0.0, 0.0),
        }
    }

    fn target(id: u32, status: NodeStatus, score: f64) -> TargetUnit {
        let mut u = TargetUnit::new(
            UnitId(id),
            LandCode::from("111"),
            status,
            NodeType::Original("URB-Res_Single".into()),
            ZoneId(0),
            Point::new(0.0, 0.0),
            999_999.0,
        );
        u.score = score;
        u
    }

    #[test]
    fn test_sampling_caps_at_available() {
        let pool: Vec<SourceUnit> = (0..5)
            .map(|i| source(i, EvolvedCategory::FoodCrop, 50))
            .collect();
        let processed: BTreeSet<UnitId> = [UnitId(0), UnitId(1)].into_iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let sampled = sample_unprocessed(&pool, &processed, 10, &mut rng);
        assert_eq!(sampled.len(), 3);
        assert!(sampled.iter().all(|u| !processed.contains(&u.id)));
    }

    #[test]
    fn test_potentials_sum_inverse_factors() {
        let a = source(1, EvolvedCategory::Livestock, 2);
        let b = source(2, EvolvedCategory::Livestock, 2);
        let c = source(3, EvolvedCategory::Forest, 30);
        let potentials = category_potentials(&[&a, &b, &c]);
        assert!((potentials[&EvolvedCategory::Livestock] - 1.0).abs() < 1e-12);
        assert!((potentials[&EvolvedCategory::Forest] - 1.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_slots_include_demolished_and_rank_by_score() {
        let mut units = vec![
            target(1, NodeStatus::OriginalLowPriority, 0.2),
            target(2, NodeStatus::OriginalNonUrban, -1.0),
            target(3, NodeStatus::OriginalHighPriority, 0.9),
            target(4, NodeStatus::OriginalLowPriority, 0.6),
        ];
        units[3].demolish();
        let slots = select_slots(&units, 10);
        assert_eq!(slots, vec![2, 3, 0]);
        assert_eq!(select_slots(&units, 1), vec![2]);
    }

    #[test]
    fn test_round_robin_rotates_categories() {
        let allocation = BTreeMap::from([
            (EvolvedCategory::FoodCrop, 2),
            (EvolvedCategory::Forest, 1),
            (EvolvedCategory::Livestock, 0),
        ]);
        let slots = vec![10, 11, 12, 13];
        let assignments = assign_round_robin(&slots, &allocation);
        assert_eq!(
            assignments,
            vec![
                (10, EvolvedCategory::FoodCrop),
                (11, EvolvedCategory::Forest),
                (12, EvolvedCategory::FoodCrop),
            ]
        );
    }

    #[test]
    fn test_round_robin_stops_when_slots_run_out() {
        let allocation = BTreeMap::from([(EvolvedCategory::FoodCrop, 5)]);
        let assignments = assign_round_robin(&[0, 1], &allocation);
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn test_fifty_food_crop_sources_make_one_node() {
        let pool: Vec<SourceUnit> = (0..100)
            .map(|i| source(i, EvolvedCategory::FoodCrop, 50))
            .collect();
        let mut units = vec![
            target(1, NodeStatus::OriginalLowPriority, 0.3),
            target(2, NodeStatus::OriginalHighPriority, 0.8),
        ];
        let mut processed = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let outcome = run_replacement(&mut units, &pool, &mut processed, 100, 0.5, &mut rng);

        assert_eq!(outcome.target_source_total, 50);
        assert_eq!(processed.len(), 50);
        assert_eq!(outcome.evolved_node_count, 1);
        assert_eq!(outcome.replaced, vec![(UnitId(2), EvolvedCategory::FoodCrop)]);
        assert_eq!(units[1].node_type, NodeType::Evolved(EvolvedCategory::FoodCrop));
        assert_eq!(units[0].status, NodeStatus::OriginalLowPriority);
    }

    #[test]
    fn test_zero_potential_still_marks_processed() {
        let pool: Vec<SourceUnit> = (0..10)
            .map(|i| source(i, EvolvedCategory::LivestockFeed, 100))
            .collect();
        let mut units = vec![target(1, NodeStatus::OriginalLowPriority, 0.3)];
        let mut processed = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let outcome = run_replacement(&mut units, &pool, &mut processed, 10, 1.0, &mut rng);
        assert_eq!(processed.len(), 10);
        assert_eq!(outcome.evolved_node_count, 0);
        assert!(outcome.replaced.is_empty());
        assert_eq!(units[0].status, NodeStatus::OriginalLowPriority);
    }

    #[test]
    fn test_slot_shortage_is_reported() {
        let pool: Vec<SourceUnit> = (0..6)
            .map(|i| source(i, EvolvedCategory::NaturalGrazing, 1))
            .collect();
        let mut units = vec![
            target(1, NodeStatus::OriginalLowPriority, 0.3),
            target(2, NodeStatus::OriginalTransport, -1.0),
        ];
        let mut processed = BTreeSet::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let outcome = run_replacement(&mut units, &pool, &mut processed, 6, 1.0, &mut rng);
        assert_eq!(outcome.evolved_node_count, 6);
        assert_eq!(outcome.replaced.len(), 1);
        assert_eq!(outcome.slot_shortfall(), 5);
        assert_eq!(units[1].status, NodeStatus::OriginalTransport);
    }
}
