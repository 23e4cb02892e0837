//! Building blocks for task sequence generators.
//!
//! A whole block is generated before its first trial. Generators combine a
//! condition layout from [`ConditionTable`] with per-trial draws, retrying
//! draws that violate a task constraint through [`draw_until`].

use cogex_core::{Condition, GenerationError, Side};
use rand::Rng;
use rand::seq::IndexedRandom;

/// Upper bound on redraws for one constrained value.
pub const MAX_ATTEMPTS: u32 = 10_000;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Condition labels with weights summing to 1.0, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTable {
    entries: Vec<(Condition, f64)>,
}

impl ConditionTable {
    pub fn new<C: Into<Condition>>(
        entries: impl IntoIterator<Item = (C, f64)>,
    ) -> Result<Self, GenerationError> {
        let entries: Vec<(Condition, f64)> = entries
            .into_iter()
            .map(|(condition, weight)| (condition.into(), weight))
            .collect();
        if entries.is_empty() {
            return Err(GenerationError::EmptyConditionTable);
        }
        let sum: f64 = entries.iter().map(|(_, weight)| weight).sum();
        let negative = entries.iter().any(|(_, weight)| *weight < 0.0 || weight.is_nan());
        if negative || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(GenerationError::InvalidWeights { sum });
        }
        Ok(Self { entries })
    }

    /// Equal weights. The first label is the most common when a remainder is padded.
    pub fn uniform<C: Into<Condition>>(
        labels: impl IntoIterator<Item = C>,
    ) -> Result<Self, GenerationError> {
        let labels: Vec<Condition> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(GenerationError::EmptyConditionTable);
        }
        let weight = 1.0 / labels.len() as f64;
        Self::new(labels.into_iter().map(|label| (label, weight)))
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.entries.iter().map(|(condition, _)| condition)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One independent weighted draw.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &Condition {
        let roll: f64 = rng.random();
        let mut cumulative = 0.0;
        for (condition, weight) in &self.entries {
            cumulative += weight;
            if roll < cumulative {
                return condition;
            }
        }
        // Rounding left the roll above the last boundary.
        &self.entries[self.entries.len() - 1].0
    }

    /// Probabilistic design: every trial's condition drawn independently.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Condition> {
        (0..n).map(|_| self.draw(rng).clone()).collect()
    }

    /// Balanced design: `n / k` of every condition, the remainder handed out
    /// one each starting from the heaviest condition, then shuffled.
    pub fn balanced<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Condition> {
        let k = self.entries.len();
        let base = n / k;
        let mut counts = vec![base; k];
        for idx in self.by_priority().into_iter().take(n % k) {
            counts[idx] += 1;
        }
        self.expand_and_shuffle(&counts, rng)
    }

    /// Proportional design: `weight * n` of every condition, rounded by
    /// largest remainder so the counts sum to `n`, then shuffled.
    pub fn quota<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Condition> {
        let exact: Vec<f64> = self
            .entries
            .iter()
            .map(|(_, weight)| weight * n as f64)
            .collect();
        let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();
        let assigned: usize = counts.iter().sum();

        let mut order: Vec<usize> = (0..counts.len()).collect();
        order.sort_by(|&a, &b| {
            let frac_a = exact[a] - exact[a].floor();
            let frac_b = exact[b] - exact[b].floor();
            frac_b.total_cmp(&frac_a).then(a.cmp(&b))
        });
        for idx in order.into_iter().take(n.saturating_sub(assigned)) {
            counts[idx] += 1;
        }
        self.expand_and_shuffle(&counts, rng)
    }

    fn by_priority(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[b].1.total_cmp(&self.entries[a].1).then(a.cmp(&b)));
        order
    }

    fn expand_and_shuffle<R: Rng + ?Sized>(&self, counts: &[usize], rng: &mut R) -> Vec<Condition> {
        let mut layout = Vec::with_capacity(counts.iter().sum());
        for ((condition, _), &count) in self.entries.iter().zip(counts) {
            layout.extend(std::iter::repeat_n(condition.clone(), count));
        }
        shuffle(&mut layout, rng);
        layout
    }
}

/// Fisher–Yates: walking from the last index down, swap with a uniform index in `[0, i]`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Redraws until `accept` holds.
pub fn draw_until<T, R, D, A>(rng: &mut R, mut draw: D, accept: A) -> Result<T, GenerationError>
where
    R: Rng + ?Sized,
    D: FnMut(&mut R) -> T,
    A: Fn(&T) -> bool,
{
    for _ in 0..MAX_ATTEMPTS {
        let candidate = draw(rng);
        if accept(&candidate) {
            return Ok(candidate);
        }
    }
    Err(GenerationError::ConstraintUnsatisfied {
        attempts: MAX_ATTEMPTS,
    })
}

/// Uniform pick from a non-empty pool.
pub fn pick<'a, T, R: Rng + ?Sized>(pool: &'a [T], rng: &mut R) -> Result<&'a T, GenerationError> {
    pool.choose(rng).ok_or(GenerationError::ItemPoolExhausted {
        requested: 1,
        available: 0,
    })
}

pub fn coin<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random_bool(p.clamp(0.0, 1.0))
}

pub fn random_side<R: Rng + ?Sized>(rng: &mut R) -> Side {
    if coin(rng, 0.5) { Side::Left } else { Side::Right }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn count(layout: &[Condition], label: &str) -> usize {
        layout.iter().filter(|c| c.as_str() == label).count()
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(
            ConditionTable::new(Vec::<(&str, f64)>::new()),
            Err(GenerationError::EmptyConditionTable)
        );
        assert!(matches!(
            ConditionTable::new([("a", 0.5), ("b", 0.4)]),
            Err(GenerationError::InvalidWeights { .. })
        ));
        assert!(matches!(
            ConditionTable::new([("a", 1.5), ("b", -0.5)]),
            Err(GenerationError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn balanced_pads_the_first_condition() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = ConditionTable::uniform(["congruent", "incongruent", "neutral"]).unwrap();
        let layout = table.balanced(40, &mut rng);
        assert_eq!(layout.len(), 40);
        assert_eq!(count(&layout, "congruent"), 14);
        assert_eq!(count(&layout, "incongruent"), 13);
        assert_eq!(count(&layout, "neutral"), 13);
    }

    #[test]
    fn quota_of_thirty_percent_over_thirty_is_nine() {
        let mut rng = StdRng::seed_from_u64(2);
        let table = ConditionTable::new([("target", 0.3), ("non-target", 0.7)]).unwrap();
        let layout = table.quota(30, &mut rng);
        assert_eq!(count(&layout, "target"), 9);
        assert_eq!(count(&layout, "non-target"), 21);
    }

    #[test]
    fn independent_draws_follow_the_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let table = ConditionTable::new([("valid", 0.8), ("invalid", 0.1), ("neutral", 0.1)]).unwrap();
        let layout = table.sample(20_000, &mut rng);
        let valid = count(&layout, "valid") as f64 / 20_000.0;
        assert!((valid - 0.8).abs() < 0.02, "valid share {valid}");
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn draw_until_gives_up() {
        let mut rng = StdRng::seed_from_u64(5);
        let result = draw_until(&mut rng, |rng| rng.random_range(0..10u32), |v| *v > 100);
        assert_eq!(
            result,
            Err(GenerationError::ConstraintUnsatisfied { attempts: MAX_ATTEMPTS })
        );
        let ok = draw_until(&mut rng, |rng| rng.random_range(0..10u32), |v| *v != 3).unwrap();
        assert_ne!(ok, 3);
    }
}
