//! Local identity plus the vector clock it stamps broadcasts with.
use crate::gossip::VectorClock;
use crate::node::NodeId;

#[derive(Clone, Debug)]
pub struct ClockState {
    node_id: NodeId,
    clock: VectorClock,
}

impl ClockState {
    pub fn new(node_id: NodeId) -> Self {
        let mut clock = VectorClock::new();
        clock.register(&node_id);
        Self { node_id, clock }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Advance the local entry by one and return the snapshot to send
    pub fn bump(&mut self) -> VectorClock {
        self.clock.increment(&self.node_id);
        self.snapshot()
    }

    /// Record that broadcasts from `origin` up to `value` were delivered.
    /// The causal queue only calls this with the immediate successor.
    pub fn observe(&mut self, origin: &NodeId, value: u64) {
        self.clock.observe(origin, value);
    }

    /// Start tracking a newly met peer at zero
    pub fn register(&mut self, peer: &NodeId) {
        self.clock.register(peer);
    }

    pub fn get(&self, node_id: &NodeId) -> u64 {
        self.clock.get_timestamp(node_id)
    }

    pub fn snapshot(&self) -> VectorClock {
        self.clock.clone()
    }

    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }
}
