//! Integer allocation of fractional category potentials
//!
//! Largest-remainder apportionment: every category receives the floor of its
//! proportional share, then the leftover units go to the categories with the
//! largest fractional remainders. Remainder ties are broken by key order, so
//! the result is deterministic for a given input.

use std::collections::BTreeMap;
use std::fmt::Debug;

use rand::seq::SliceRandom;
use rand::Rng;

/// Potential sums at or below this are treated as exhausted
const POTENTIAL_EPSILON: f64 = 1e-9;

/// Split `total` whole units across categories in proportion to `potentials`
///
/// The returned counts always sum to `total`, except when the potentials sum
/// to (nearly) zero: then every count is zero, signalling that nothing is
/// left to allocate. Negative or non-finite potentials count as zero.
///
/// `rng` is only consulted if floating-point error leaves the remainder pass
/// off target, in which case single units are added or removed at random
/// (never driving a count below zero).
pub fn allocate_integer_counts<K, R>(
    potentials: &BTreeMap<K, f64>,
    total: usize,
    rng: &mut R,
) -> BTreeMap<K, usize>
where
    K: Ord + Clone + Debug,
    R: Rng + ?Sized,
{
    let mut counts: BTreeMap<K, usize> = potentials.keys().map(|k| (k.clone(), 0)).collect();

    let sanitized = |p: f64| if p.is_finite() && p > 0.0 { p } else { 0.0 };
    let potential_sum: f64 = potentials.values().map(|p| sanitized(*p)).sum();

    if total == 0 {
        return counts;
    }
    if potential_sum <= POTENTIAL_EPSILON {
        tracing::warn!(total, "Total evolved potential is zero; allocating nothing");
        return counts;
    }

    let scale = total as f64 / potential_sum;
    let mut remainders: Vec<(K, f64)> = Vec::with_capacity(potentials.len());
    let mut allocated = 0usize;

    for (category, potential) in potentials {
        let share = sanitized(*potential) * scale;
        let base = share.floor() as usize;
        counts.insert(category.clone(), base);
        remainders.push((category.clone(), share - base as f64));
        allocated += base;
    }

    // Stable sort keeps key order among equal remainders
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));

    let shortfall = total.saturating_sub(allocated);
    if shortfall > remainders.len() {
        tracing::warn!(
            shortfall,
            categories = remainders.len(),
            "Allocation shortfall exceeds category count during remainder distribution"
        );
    }
    for (category, _) in remainders.iter().take(shortfall) {
        if let Some(count) = counts.get_mut(category) {
            *count += 1;
        }
    }

    reconcile(&mut counts, total, rng);
    counts
}

/// Last-resort patch that forces the counts to sum to `total`
fn reconcile<K, R>(counts: &mut BTreeMap<K, usize>, total: usize, rng: &mut R)
where
    K: Ord + Clone + Debug,
    R: Rng + ?Sized,
{
    let current: usize = counts.values().sum();
    if current == total || counts.is_empty() {
        return;
    }

    tracing::warn!(current, total, "Allocation mismatch after remainder pass; adjusting");

    if current < total {
        let keys: Vec<K> = counts.keys().cloned().collect();
        for _ in 0..(total - current) {
            if let Some(key) = keys.choose(rng) {
                if let Some(count) = counts.get_mut(key) {
                    *count += 1;
                }
            }
        }
    } else {
        for _ in 0..(current - total) {
            let positive: Vec<K> = counts
                .iter()
                .filter(|(_, v)| **v > 0)
                .map(|(k, _)| k.clone())
                .collect();
            let Some(key) = positive.choose(rng) else {
                break;
            };
            if let Some(count) = counts.get_mut(key) {
                *count -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_proportional_split() {
        let potentials = BTreeMap::from([("a", 3.0), ("b", 1.0)]);
        let counts = allocate_integer_counts(&potentials, 8, &mut rng());
        assert_eq!(counts["a"], 6);
        assert_eq!(counts["b"], 2);
    }

    #[test]
    fn test_largest_remainder_wins() {
        // Shares: a = 1.4, b = 1.6 -> b gets the leftover unit
        let potentials = BTreeMap::from([("a", 1.4), ("b", 1.6)]);
        let counts = allocate_integer_counts(&potentials, 3, &mut rng());
        assert_eq!(counts["a"], 1);
        assert_eq!(counts["b"], 2);
    }

    #[test]
    fn test_remainder_ties_follow_key_order() {
        let potentials = BTreeMap::from([("c", 1.0), ("a", 1.0), ("b", 1.0)]);
        let counts = allocate_integer_counts(&potentials, 2, &mut rng());
        assert_eq!(counts["a"], 1);
        assert_eq!(counts["b"], 1);
        assert_eq!(counts["c"], 0);
    }

    #[test]
    fn test_zero_total_is_all_zero() {
        let potentials = BTreeMap::from([("a", 2.5), ("b", 0.5)]);
        let counts = allocate_integer_counts(&potentials, 0, &mut rng());
        assert!(counts.values().all(|c| *c == 0));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_zero_potential_is_all_zero() {
        let potentials = BTreeMap::from([("a", 0.0), ("b", 0.0)]);
        let counts = allocate_integer_counts(&potentials, 5, &mut rng());
        assert!(counts.values().all(|c| *c == 0));
    }

    #[test]
    fn test_single_category_takes_everything() {
        let potentials = BTreeMap::from([("only", 0.02)]);
        let counts = allocate_integer_counts(&potentials, 7, &mut rng());
        assert_eq!(counts["only"], 7);
    }

    #[test]
    fn test_negative_potential_counts_as_zero() {
        let potentials = BTreeMap::from([("a", -4.0), ("b", 2.0)]);
        let counts = allocate_integer_counts(&potentials, 4, &mut rng());
        assert_eq!(counts["a"], 0);
        assert_eq!(counts["b"], 4);
    }

    #[test]
    fn test_reconcile_removes_only_from_positive() {
        let mut counts = BTreeMap::from([("a", 0usize), ("b", 3)]);
        reconcile(&mut counts, 1, &mut rng());
        assert_eq!(counts["a"], 0);
        assert_eq!(counts["b"], 1);
    }

    #[test]
    fn test_reconcile_adds_when_short() {
        let mut counts = BTreeMap::from([("a", 1usize), ("b", 1)]);
        reconcile(&mut counts, 5, &mut rng());
        assert_eq!(counts.values().sum::<usize>(), 5);
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_total(
            potentials in proptest::collection::vec(0.0f64..100.0, 1..8),
            total in 0usize..500,
        ) {
            let map: BTreeMap<usize, f64> = potentials.iter().copied().enumerate().collect();
            let counts = allocate_integer_counts(&map, total, &mut rng());
            let sum: usize = counts.values().sum();
            let potential_sum: f64 = potentials.iter().sum();
            if potential_sum > POTENTIAL_EPSILON {
                prop_assert_eq!(sum, total);
            } else {
                prop_assert_eq!(sum, 0);
            }
        }

        #[test]
        fn prop_counts_stay_within_one_of_quota(
            potentials in proptest::collection::vec(0.01f64..100.0, 1..8),
            total in 0usize..500,
        ) {
            let map: BTreeMap<usize, f64> = potentials.iter().copied().enumerate().collect();
            let counts = allocate_integer_counts(&map, total, &mut rng());
            let potential_sum: f64 = potentials.iter().sum();
            for (k, p) in &map {
                let quota = p * total as f64 / potential_sum;
                let count = counts[k] as f64;
                prop_assert!((count - quota).abs() < 1.0 + 1e-6);
            }
        }

        #[test]
        fn prop_raising_potential_never_loses_more_than_one(
            potentials in proptest::collection::vec(0.01f64..50.0, 2..6),
            bump in 0.0f64..50.0,
            total in 1usize..300,
        ) {
            let base: BTreeMap<usize, f64> = potentials.iter().copied().enumerate().collect();
            let mut raised = base.clone();
            *raised.get_mut(&0).unwrap() += bump;

            let before = allocate_integer_counts(&base, total, &mut rng());
            let after = allocate_integer_counts(&raised, total, &mut rng());

            let base_sum: f64 = base.values().sum();
            let unadjusted_share = base[&0] * total as f64 / base_sum;
            prop_assert!(after[&0] as f64 >= unadjusted_share - 1.0 - 1e-6);
            prop_assert!(after[&0] + 1 >= before[&0]);
        }
    }
}
