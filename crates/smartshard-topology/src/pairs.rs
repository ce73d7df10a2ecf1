//! Lexicographic enumeration of committee pairs.
//!
//! Pairs `{i, j}` with `0 <= i < j < N` are visited in the order
//! `{0,1}, {0,2}, ..., {0,N-1}, {1,2}, ..., {N-2,N-1}`. Generation order is
//! what makes peer indices deterministic.

use crate::{CommitteeId, CommitteePair};

/// Number of unordered pairs among `committee_count` committees.
///
/// Returns `None` on overflow.
pub const fn pair_count(committee_count: u32) -> Option<usize> {
    let n = committee_count as usize;
    if n < 2 {
        return Some(0);
    }
    match n.checked_mul(n - 1) {
        Some(product) => Some(product / 2),
        None => None,
    }
}

/// Total peers in a topology: `N(N-1)k/2`.
pub const fn expected_peer_count(committee_count: u32, intersection: usize) -> Option<usize> {
    match pair_count(committee_count) {
        Some(pairs) => pairs.checked_mul(intersection),
        None => None,
    }
}

/// Members of every committee: `(N-1)k`.
pub const fn expected_committee_size(committee_count: u32, intersection: usize) -> Option<usize> {
    if committee_count == 0 {
        return Some(0);
    }
    (committee_count as usize - 1).checked_mul(intersection)
}

/// Iterator over all unordered committee pairs in lexicographic order.
#[derive(Debug, Clone)]
pub struct CommitteePairs {
    committee_count: u32,
    i: u32,
    j: u32,
}

impl CommitteePairs {
    /// Enumerate every pair among `committee_count` committees.
    pub fn new(committee_count: u32) -> Self {
        Self {
            committee_count,
            i: 0,
            j: 1,
        }
    }
}

impl Iterator for CommitteePairs {
    type Item = CommitteePair;

    fn next(&mut self) -> Option<Self::Item> {
        if self.j >= self.committee_count {
            return None;
        }

        let pair = CommitteePair {
            a: CommitteeId(self.i),
            b: CommitteeId(self.j),
        };

        self.j += 1;
        if self.j >= self.committee_count {
            self.i += 1;
            self.j = self.i + 1;
        }

        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.committee_count as usize;
        let (i, j) = (self.i as usize, self.j as usize);
        if j >= n {
            return (0, Some(0));
        }
        // Rows after i contribute (n-1-r) pairs each.
        let rest_of_row = n - j;
        let later_rows: usize = (i + 1..n).map(|r| n - 1 - r).sum();
        let remaining = rest_of_row + later_rows;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CommitteePairs {}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: CommitteePairs) -> Vec<(u32, u32)> {
        pairs.map(|p| (p.a.0, p.b.0)).collect()
    }

    #[test]
    fn lexicographic_order() {
        assert_eq!(
            raw(CommitteePairs::new(4)),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn degenerate_counts_yield_nothing() {
        assert_eq!(CommitteePairs::new(0).count(), 0);
        assert_eq!(CommitteePairs::new(1).count(), 0);
    }

    #[test]
    fn count_matches_formula() {
        for n in 0..30 {
            assert_eq!(
                CommitteePairs::new(n).count(),
                pair_count(n).unwrap(),
                "pair count for {} committees",
                n
            );
        }
    }

    #[test]
    fn size_hint_is_exact() {
        let mut pairs = CommitteePairs::new(6);
        let mut expected = 15;
        assert_eq!(pairs.len(), expected);
        while pairs.next().is_some() {
            expected -= 1;
            assert_eq!(pairs.len(), expected);
        }
    }

    #[test]
    fn formulas() {
        assert_eq!(expected_peer_count(5, 1), Some(10));
        assert_eq!(expected_peer_count(5, 2), Some(20));
        assert_eq!(expected_peer_count(3, 5), Some(15));
        assert_eq!(expected_committee_size(5, 1), Some(4));
        assert_eq!(expected_committee_size(3, 5), Some(10));
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(expected_peer_count(u32::MAX, usize::MAX), None);
    }
}
