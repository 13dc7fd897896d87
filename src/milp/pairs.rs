//! Canonical pair enumeration.
//!
//! Every pairwise-disjunction constraint family (same-patient, same-operator,
//! overlapping windows) needs one constraint set per *unordered* pair of
//! candidates. Enumerating positions `(i, j)` with `i < j` over a sorted
//! index sequence yields exactly one canonical ordering per pair, halving the
//! constraint count; this is the single symmetry-reduction point shared by
//! all families.

/// Iterates all `(i, j)` position pairs with `i < j` over `0..len`.
pub fn canonical_pairs(len: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..len).flat_map(move |i| ((i + 1)..len).map(move |j| (i, j)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_count() {
        assert_eq!(canonical_pairs(0).count(), 0);
        assert_eq!(canonical_pairs(1).count(), 0);
        assert_eq!(canonical_pairs(4).count(), 6); // n·(n−1)/2
    }

    #[test]
    fn test_pairs_are_ordered_and_distinct() {
        let pairs: Vec<_> = canonical_pairs(3).collect();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 2)]);
        for (i, j) in pairs {
            assert!(i < j);
        }
    }
}
