//! Transactions as seen by the routing layer.

use serde::{Deserialize, Serialize};
use smartshard_topology::CommitteeId;

/// A key/value write addressed to one committee.
///
/// `key` and `value` are opaque; only `quorum` is used for routing.
/// Wire shape: `{ "quorum": 0, "key": "...", "value": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    /// Committee that must order this transaction
    pub quorum: CommitteeId,
    /// Key written
    pub key: String,
    /// Value written
    pub value: String,
}

impl Transaction {
    /// Create a transaction.
    pub fn new(quorum: CommitteeId, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            quorum,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Encode to the JSON wire shape.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode from the JSON wire shape.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
