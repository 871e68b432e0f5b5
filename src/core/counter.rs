//! Per-trip intermediate-edge counting
//!
//! For every ordered pair of edges `(from, to)` that a trip visits within a
//! bounded number of hops, tally how often each other edge appears strictly
//! between them. Two strategies share one entry point: the exact triple loop
//! (O(N³)) and the sliding window with a running multiset (O(N·W) on
//! average, O(N·W²) worst case), which matches the exact counts for every
//! pair at most `window` positions apart.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Intermediate edge -> occurrence count
pub type IntermediateCounts<E> = FxHashMap<E, u64>;

/// How pairs and their intermediates are enumerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingStrategy {
    /// Only pairs at most `window` positions apart are counted
    Windowed { window: usize },
    /// Every pair of the trip, regardless of distance
    Exact,
}

impl CountingStrategy {
    pub const DEFAULT_WINDOW: usize = 10;
}

impl Default for CountingStrategy {
    fn default() -> Self {
        CountingStrategy::Windowed {
            window: Self::DEFAULT_WINDOW,
        }
    }
}

/// `(from, to)` -> intermediate counts.
///
/// Counts only ever grow. Built by a single owner: workers produce one per
/// trip and the coordinator folds them together with [`PairHistogram::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct PairHistogram<E: Eq + Hash> {
    pairs: FxHashMap<(E, E), IntermediateCounts<E>>,
}

impl<E: Eq + Hash> Default for PairHistogram<E> {
    fn default() -> Self {
        Self {
            pairs: FxHashMap::default(),
        }
    }
}

impl<E: Eq + Hash + Clone> PairHistogram<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(from, to)` pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, from: &E, to: &E) -> Option<&IntermediateCounts<E>> {
        self.pairs.get(&(from.clone(), to.clone()))
    }

    pub fn add(&mut self, from: E, to: E, intermediate: E, count: u64) {
        *self
            .pairs
            .entry((from, to))
            .or_default()
            .entry(intermediate)
            .or_default() += count;
    }

    /// Sum another histogram into this one, triple by triple
    pub fn merge(&mut self, other: PairHistogram<E>) {
        if self.pairs.is_empty() {
            self.pairs = other.pairs;
            return;
        }
        for (pair, counts) in other.pairs {
            let target = self.pairs.entry(pair).or_default();
            for (intermediate, count) in counts {
                *target.entry(intermediate).or_default() += count;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(E, E), &IntermediateCounts<E>)> {
        self.pairs.iter()
    }

    /// Total of all counts, across every pair
    pub fn total(&self) -> u64 {
        self.pairs.values().flat_map(|c| c.values()).sum()
    }
}

/// Count intermediates for one trip's distinct edge sequence
pub fn count_trip<E: Eq + Hash + Clone>(edges: &[E], strategy: CountingStrategy) -> PairHistogram<E> {
    match strategy {
        CountingStrategy::Windowed { window } => count_windowed(edges, window),
        CountingStrategy::Exact => count_exact(edges),
    }
}

fn count_windowed<E: Eq + Hash + Clone>(edges: &[E], window: usize) -> PairHistogram<E> {
    let mut histogram = PairHistogram::new();
    let n = edges.len();

    for i in 0..n {
        let from = &edges[i];
        // Edges strictly between i and the current right boundary
        let mut between: IntermediateCounts<E> = FxHashMap::default();
        let end = n.min(i.saturating_add(window).saturating_add(1));

        for j in (i + 1)..end {
            let to = &edges[j];
            if j > i + 1 {
                let target = histogram
                    .pairs
                    .entry((from.clone(), to.clone()))
                    .or_default();
                for (middle, &count) in &between {
                    *target.entry(middle.clone()).or_default() += count;
                }
            }
            *between.entry(to.clone()).or_default() += 1;
        }
    }

    histogram
}

fn count_exact<E: Eq + Hash + Clone>(edges: &[E]) -> PairHistogram<E> {
    let mut histogram = PairHistogram::new();
    let n = edges.len();

    for i in 0..n.saturating_sub(2) {
        for j in (i + 2)..n {
            for k in (i + 1)..j {
                histogram.add(edges[i].clone(), edges[j].clone(), edges[k].clone(), 1);
            }
        }
    }

    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn counts(pairs: &[(&'static str, u64)]) -> IntermediateCounts<&'static str> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_short_trips_yield_nothing() {
        let strategies = [CountingStrategy::default(), CountingStrategy::Exact];
        for strategy in strategies {
            assert!(count_trip::<&str>(&[], strategy).is_empty());
            assert!(count_trip(&["A"], strategy).is_empty());
            assert!(count_trip(&["A", "B"], strategy).is_empty());
        }
    }

    #[test]
    fn test_four_edge_trip_default_window() {
        let histogram = count_trip(&["A", "B", "C", "D"], CountingStrategy::default());

        assert_eq!(histogram.get(&"A", &"D"), Some(&counts(&[("B", 1), ("C", 1)])));
        assert_eq!(histogram.get(&"A", &"C"), Some(&counts(&[("B", 1)])));
        assert_eq!(histogram.get(&"B", &"D"), Some(&counts(&[("C", 1)])));
        // Adjacent edges have nothing in between
        assert_eq!(histogram.get(&"A", &"B"), None);
        assert_eq!(histogram.len(), 3);
    }

    #[test]
    fn test_window_bounds_pair_distance() {
        let edges = ["A", "B", "C", "D", "E"];
        let histogram = count_trip(&edges, CountingStrategy::Windowed { window: 2 });

        assert_eq!(histogram.get(&"A", &"C"), Some(&counts(&[("B", 1)])));
        assert_eq!(histogram.get(&"A", &"D"), None);
        assert_eq!(histogram.get(&"C", &"E"), Some(&counts(&[("D", 1)])));
        assert_eq!(histogram.len(), 3);

        assert!(count_trip(&edges, CountingStrategy::Windowed { window: 0 }).is_empty());
        assert!(count_trip(&edges, CountingStrategy::Windowed { window: 1 }).is_empty());
    }

    #[test]
    fn test_repeated_edges_accumulate() {
        // Not produced by the resolver, but the counter accepts it
        let histogram = count_trip(&["A", "B", "B", "C"], CountingStrategy::default());
        assert_eq!(histogram.get(&"A", &"C"), Some(&counts(&[("B", 2)])));
        assert_eq!(
            histogram,
            count_trip(&["A", "B", "B", "C"], CountingStrategy::Exact)
        );
    }

    #[test]
    fn test_windowed_matches_exact_within_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in 0..14usize {
            let mut edges: Vec<u32> = (0..len as u32).collect();
            edges.shuffle(&mut rng);

            let exact = count_trip(&edges, CountingStrategy::Exact);
            let windowed = count_trip(&edges, CountingStrategy::Windowed { window: 13 });
            assert_eq!(windowed, exact, "length {len}");
        }
    }

    #[test]
    fn test_windowed_is_exact_restricted_to_window() {
        let edges: Vec<u32> = (0..30).collect();
        let window = 4;
        let windowed = count_trip(&edges, CountingStrategy::Windowed { window });
        let exact = count_trip(&edges, CountingStrategy::Exact);

        for ((from, to), expected) in exact.iter() {
            let distance = (to - from) as usize;
            match windowed.get(from, to) {
                Some(got) => {
                    assert!(distance <= window);
                    assert_eq!(got, expected);
                }
                None => assert!(distance > window),
            }
        }
    }

    #[test]
    fn test_merge_sums_triples() {
        let mut left = count_trip(&["A", "B", "C", "D"], CountingStrategy::default());
        let right = count_trip(&["A", "B", "C", "D"], CountingStrategy::default());
        left.merge(right);

        assert_eq!(left.get(&"A", &"D"), Some(&counts(&[("B", 2), ("C", 2)])));
        assert_eq!(left.total(), 8);
    }
}
