//! Committee and peer identifiers.

use std::fmt;

/// Identifier of one committee (shard), valid in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CommitteeId(pub u32);

impl CommitteeId {
    /// Create from a raw id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CommitteeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CommitteeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Deterministic position of a peer in a generated topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PeerIndex(pub usize);

impl fmt::Display for PeerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two committees a peer bridges.
///
/// Order is preserved: `a` is the first slot, `b` the second. Equality is
/// order-sensitive; use [`CommitteePair::same_committees`] to compare as sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitteePair {
    /// First committee
    pub a: CommitteeId,
    /// Second committee
    pub b: CommitteeId,
}

impl CommitteePair {
    /// Create a pair. Returns `None` if both ids are equal.
    pub fn new(a: CommitteeId, b: CommitteeId) -> Option<Self> {
        (a != b).then_some(Self { a, b })
    }

    /// Check whether the pair contains a committee.
    pub fn contains(&self, committee: CommitteeId) -> bool {
        self.a == committee || self.b == committee
    }

    /// The committee on the other side of the bridge.
    pub fn counterpart(&self, committee: CommitteeId) -> Option<CommitteeId> {
        if committee == self.a {
            Some(self.b)
        } else if committee == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// The pair ordered as `(min, max)`.
    pub fn normalized(&self) -> Self {
        if self.a < self.b {
            *self
        } else {
            Self { a: self.b, b: self.a }
        }
    }

    /// Compare as unordered sets.
    pub fn same_committees(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }

    /// Both committees as an array, in slot order.
    pub const fn as_array(&self) -> [CommitteeId; 2] {
        [self.a, self.b]
    }
}

impl fmt::Display for CommitteePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_rejects_same_committee() {
        assert!(CommitteePair::new(CommitteeId(3), CommitteeId(3)).is_none());
        assert!(CommitteePair::new(CommitteeId(3), CommitteeId(4)).is_some());
    }

    #[test]
    fn counterpart_crosses_the_bridge() {
        let pair = CommitteePair::new(CommitteeId(2), CommitteeId(7)).unwrap();
        assert_eq!(pair.counterpart(CommitteeId(2)), Some(CommitteeId(7)));
        assert_eq!(pair.counterpart(CommitteeId(7)), Some(CommitteeId(2)));
        assert_eq!(pair.counterpart(CommitteeId(0)), None);
    }

    #[test]
    fn unordered_comparison() {
        let ab = CommitteePair::new(CommitteeId(1), CommitteeId(4)).unwrap();
        let ba = CommitteePair::new(CommitteeId(4), CommitteeId(1)).unwrap();
        assert_ne!(ab, ba);
        assert!(ab.same_committees(&ba));
        assert_eq!(ba.normalized(), ab);
    }

    #[test]
    fn display_formats() {
        let pair = CommitteePair::new(CommitteeId(0), CommitteeId(1)).unwrap();
        assert_eq!(pair.to_string(), "[0, 1]");
        assert_eq!(PeerIndex(5).to_string(), "#5");
    }
}
