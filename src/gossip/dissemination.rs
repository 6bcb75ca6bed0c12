//! Flooding of broadcasts to every neighbor, and the delivery history used to
//! recognize copies of a broadcast that arrive more than once.
use std::collections::{HashSet, VecDeque};
use std::net::SocketAddr;

use tracing::{debug, trace};

use crate::cluster::Membership;
use crate::error::Result;
use crate::gossip::messages::{BroadcastId, Message, MessageKind};
use crate::gossip::ClockState;
use crate::transport::Sender;

/// Identities of broadcasts that have already been handed to the application.
///
/// With a capacity the oldest identities are evicted first. Evicted entries are
/// still recognized as duplicates through the local vector clock, which never
/// moves backwards.
#[derive(Clone, Debug, Default)]
pub struct DeliveryHistory {
    seen: HashSet<BroadcastId>,
    order: VecDeque<BroadcastId>,
    capacity: Option<usize>,
}

impl DeliveryHistory {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Remember a delivered broadcast. Returns false if it was already known.
    pub fn record(&mut self, id: BroadcastId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        if let Some(capacity) = self.capacity {
            while self.order.len() > capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
        true
    }

    pub fn contains(&self, id: &BroadcastId) -> bool {
        self.seen.contains(id)
    }

    /// True if `message` was delivered before, either remembered explicitly or
    /// implied by the local clock having already moved past it
    pub fn already_delivered(&self, message: &Message, clock: &ClockState) -> bool {
        match message.broadcast_id() {
            Some(id) => id.1 <= clock.get(&id.0) || self.contains(&id),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Builds outgoing broadcasts and floods them to the membership table
#[derive(Debug)]
pub struct Disseminator {
    history: DeliveryHistory,
    // Broadcasts already passed on, whatever order their copies arrived in
    relayed_ids: DeliveryHistory,
    relayed: u64,
}

impl Disseminator {
    pub fn new(history_capacity: Option<usize>) -> Self {
        Self {
            history: DeliveryHistory::new(history_capacity),
            relayed_ids: DeliveryHistory::new(history_capacity),
            relayed: 0,
        }
    }

    pub fn history(&self) -> &DeliveryHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut DeliveryHistory {
        &mut self.history
    }

    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    /// A new broadcast from this node. Bumps the local clock entry.
    pub fn originate(&self, clock: &mut ClockState, content: String) -> Message {
        let snapshot = clock.bump();
        Message::broadcast(clock.node_id().clone(), content, snapshot)
    }

    /// The rebroadcast to send on receiving `inbound`, if it should be relayed.
    ///
    /// Each first-hand broadcast is relayed exactly once, even when a
    /// rebroadcast copy of it was delivered first. Rebroadcasts stop here.
    pub fn relay(&mut self, inbound: &Message) -> Option<Message> {
        if inbound.kind != MessageKind::Broadcast {
            return None;
        }
        let id = inbound.broadcast_id()?;
        if !self.relayed_ids.record(id) {
            return None;
        }
        self.relayed += 1;
        Some(inbound.as_rebroadcast())
    }

    /// Send `message` to every neighbor. Returns how many datagrams were sent.
    ///
    /// A failed send does not stop the flood; the first failure is returned
    /// once every neighbor has been tried.
    pub async fn flood<S>(
        &self,
        transport: &S,
        membership: &Membership,
        message: &Message,
    ) -> Result<usize>
    where
        S: Sender + ?Sized,
    {
        let targets: Vec<SocketAddr> = membership.addresses().collect();
        if targets.is_empty() {
            debug!(
                "[{}] No neighbors to receive {} from {}",
                transport.local_addr(),
                message.kind,
                message.origin
            );
            return Ok(0);
        }
        let data = message.encode()?;
        let mut sent = 0;
        let mut failure = None;
        for target in &targets {
            trace!("Sending {} ({} bytes) to {}", message.kind, data.len(), target);
            match transport.send_to(*target, &data).await {
                Ok(()) => sent += 1,
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => debug!("[{}] Flood also failed: {}", transport.local_addr(), e),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(sent),
        }
    }
}
