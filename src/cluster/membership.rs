use std::net::SocketAddr;

use indexmap::IndexMap;

use crate::node::NodeId;

/// Known neighbors and the addresses they were met at.
///
/// Iteration follows the order in which neighbors were met, so floods go out
/// in a stable order.
#[derive(Clone, Debug, Default)]
pub struct Membership {
    neighbors: IndexMap<NodeId, SocketAddr>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new neighbor. Returns false if it was already known.
    pub fn add_node(&mut self, node_id: NodeId, address: SocketAddr) -> bool {
        if self.neighbors.contains_key(&node_id) {
            return false;
        }
        self.neighbors.insert(node_id, address);
        true
    }

    /// Remove a neighbor, returning the address it was known at
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<SocketAddr> {
        self.neighbors.shift_remove(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.neighbors.contains_key(node_id)
    }

    /// Find the neighbor registered at `address`, if any
    pub fn find_by_address(&self, address: SocketAddr) -> Option<&NodeId> {
        self.neighbors
            .iter()
            .find(|(_, addr)| **addr == address)
            .map(|(node_id, _)| node_id)
    }

    pub fn has_address(&self, address: SocketAddr) -> bool {
        self.find_by_address(address).is_some()
    }

    pub fn addresses(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.neighbors.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &SocketAddr)> {
        self.neighbors.iter()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
