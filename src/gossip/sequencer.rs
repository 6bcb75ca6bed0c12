//! FIFO sequencing for direct messages.
//!
//! Each link keeps two independent counters: the next sequence number we send
//! to the peer, and the next one we accept from it. A direct message whose
//! number is not exactly the expected one is dropped. There is no reorder
//! buffer, so a gap loses that message for good.
use std::collections::HashMap;

use tracing::debug;

use crate::node::NodeId;

#[derive(Clone, Debug, Default)]
pub struct LinkSequencer {
    sent: HashMap<NodeId, u64>,
    expected: HashMap<NodeId, u64>,
    dropped: u64,
}

impl LinkSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number the next direct message to `peer` will carry
    pub fn peek_send(&self, peer: &NodeId) -> u64 {
        self.sent.get(peer).copied().unwrap_or(0)
    }

    /// Consume `peer`'s next sequence number once its message has left
    pub fn commit_send(&mut self, peer: &NodeId) -> u64 {
        let counter = self.sent.entry(peer.clone()).or_insert(0);
        let seq = *counter;
        *counter += 1;
        seq
    }

    /// Accept or drop an inbound direct message from `peer`
    pub fn accept_inbound(&mut self, peer: &NodeId, seq: u64) -> bool {
        let expected = self.expected.entry(peer.clone()).or_insert(0);
        if seq == *expected {
            *expected += 1;
            true
        } else {
            debug!(
                "Dropping direct message {} from {}: expected {}",
                seq, peer, *expected
            );
            self.dropped += 1;
            false
        }
    }

    pub fn expected(&self, peer: &NodeId) -> Option<u64> {
        self.expected.get(peer).copied()
    }

    pub fn sent(&self, peer: &NodeId) -> Option<u64> {
        self.sent.get(peer).copied()
    }

    /// Direct messages dropped for arriving out of sequence
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
