use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::message_error;
use crate::node::NodeId;

/// VectorClock tracks how many broadcasts from each node have been seen.
///
/// Entries that are absent read as zero. On the wire a clock is a JSON array
/// of `[node_id, count]` pairs, ordered by node id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorClock {
    clocks: BTreeMap<NodeId, u64>, // node_id -> broadcasts seen
}

impl VectorClock {
    /// Create a new empty vector clock
    pub fn new() -> Self {
        Self {
            clocks: BTreeMap::new(),
        }
    }

    /// Increment the counter for a given node and return the new value
    pub fn increment(&mut self, node_id: &NodeId) -> u64 {
        let counter = self.clocks.entry(node_id.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Raise the counter for `node_id` to `value`; never lowers it
    pub fn observe(&mut self, node_id: &NodeId, value: u64) {
        let counter = self.clocks.entry(node_id.clone()).or_insert(0);
        *counter = (*counter).max(value);
    }

    /// Make sure an entry exists for `node_id` without changing a known value
    pub fn register(&mut self, node_id: &NodeId) {
        self.clocks.entry(node_id.clone()).or_insert(0);
    }

    /// Get the timestamp for a specific node
    pub fn get_timestamp(&self, node_id: &NodeId) -> u64 {
        self.clocks.get(node_id).copied().unwrap_or(0)
    }

    /// Iterate over all recorded entries in node id order
    pub fn entries(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        self.clocks.iter().map(|(node_id, ts)| (node_id, *ts))
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    /// Encode as the `timestamp` field of a wire message
    pub fn to_stamp(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode the `timestamp` field of a broadcast or rebroadcast
    pub fn from_stamp(stamp: &str) -> Result<Self> {
        serde_json::from_str(stamp)
            .map_err(|e| message_error!("invalid vector clock stamp {:?}: {}", stamp, e))
    }
}

impl Serialize for VectorClock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.clocks.iter())
    }
}

impl<'de> Deserialize<'de> for VectorClock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pairs: Vec<(NodeId, u64)> = Vec::deserialize(deserializer)?;
        Ok(Self {
            clocks: pairs.into_iter().collect(),
        })
    }
}

impl FromIterator<(NodeId, u64)> for VectorClock {
    fn from_iter<I: IntoIterator<Item = (NodeId, u64)>>(iter: I) -> Self {
        Self {
            clocks: iter.into_iter().collect(),
        }
    }
}
