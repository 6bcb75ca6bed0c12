//! A single chat node: membership, ordering state and the transport it talks
//! through, owned together and driven one event at a time.
use std::net::SocketAddr;

use tracing::{debug, info, trace};

pub mod commands;
pub mod controller;
pub mod node_id;

use crate::cluster::Membership;
use crate::error::{MurmurError, Result};
use crate::gossip::{
    CausalQueue, ClockState, DeliveryHistory, Disseminator, LinkSequencer, Message, MessageKind,
    VectorClock,
};
use crate::settings::NodeOptions;
use crate::transport::Sender;
pub use commands::{CommandReader, NeighborList, UserCommand};
pub use controller::NodeController;
pub use node_id::NodeId;

/// Something the user should see
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeEvent {
    NeighborJoined { node_id: NodeId, address: SocketAddr },
    NeighborLeft { node_id: NodeId },
    Broadcast { origin: NodeId, content: String },
    Direct { origin: NodeId, content: String },
}

/// Counters describing what the node has done so far
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub delivered_broadcasts: u64,
    pub delivered_directs: u64,
    pub discarded_duplicates: u64,
    pub dropped_directs: u64,
    pub relayed: u64,
    pub queued: usize,
    pub neighbors: usize,
    pub history: usize,
}

/// What handling one inbound message produced.
///
/// Deliveries and membership changes happen before any send the message
/// triggers, so they are reported even when that send fails.
#[derive(Debug, Default)]
pub struct Handled {
    pub events: Vec<NodeEvent>,
    pub send_error: Option<MurmurError>,
}

impl From<Vec<NodeEvent>> for Handled {
    fn from(events: Vec<NodeEvent>) -> Self {
        Self {
            events,
            send_error: None,
        }
    }
}

impl Handled {
    fn with_send(mut self, result: Result<()>) -> Self {
        self.send_error = result.err();
        self
    }
}

pub struct ChatNode<T: Sender> {
    clock: ClockState,
    membership: Membership,
    disseminator: Disseminator,
    queue: CausalQueue,
    sequencer: LinkSequencer,
    transport: T,
    delivered_broadcasts: u64,
    delivered_directs: u64,
    discarded_duplicates: u64,
}

impl<T: Sender> std::fmt::Debug for ChatNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatNode")
            .field("node_id", self.node_id())
            .field("local_addr", &self.transport.local_addr())
            .field("neighbors", &self.membership.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl<T: Sender> ChatNode<T> {
    pub fn new(node_id: NodeId, transport: T, options: NodeOptions) -> Self {
        info!(
            "[{}] Created chat node at {} ({} delivery, history capacity {:?})",
            node_id,
            transport.local_addr(),
            options.delivery_discipline,
            options.history_capacity
        );
        Self {
            clock: ClockState::new(node_id),
            membership: Membership::new(),
            disseminator: Disseminator::new(options.history_capacity),
            queue: CausalQueue::new(options.delivery_discipline),
            sequencer: LinkSequencer::new(),
            transport,
            delivered_broadcasts: 0,
            delivered_directs: 0,
            discarded_duplicates: 0,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        self.clock.node_id()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    pub fn clock(&self) -> &VectorClock {
        self.clock.clock()
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn queue(&self) -> &CausalQueue {
        &self.queue
    }

    pub fn sequencer(&self) -> &LinkSequencer {
        &self.sequencer
    }

    pub fn history(&self) -> &DeliveryHistory {
        self.disseminator.history()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn neighbors(&self) -> NeighborList {
        self.membership
            .iter()
            .map(|(node_id, addr)| (node_id.clone(), *addr))
            .collect()
    }

    pub fn stats(&self) -> NodeStats {
        NodeStats {
            delivered_broadcasts: self.delivered_broadcasts,
            delivered_directs: self.delivered_directs,
            discarded_duplicates: self.discarded_duplicates,
            dropped_directs: self.sequencer.dropped(),
            relayed: self.disseminator.relayed(),
            queued: self.queue.len(),
            neighbors: self.membership.len(),
            history: self.disseminator.history().len(),
        }
    }

    /// Decode and handle one inbound datagram
    pub async fn handle_datagram(&mut self, data: &[u8], from: SocketAddr) -> Result<Handled> {
        let message = Message::decode(data)?;
        self.handle_message(message, from).await
    }

    /// Route an inbound message by kind. An `Err` means the message itself was
    /// rejected and nothing changed.
    pub async fn handle_message(&mut self, message: Message, from: SocketAddr) -> Result<Handled> {
        if message.origin == *self.node_id() {
            trace!("[{}] Ignoring our own {} echoed by {}", self.node_id(), message.kind, from);
            return Ok(Handled::default());
        }
        match message.kind {
            MessageKind::Meet => Ok(self.handle_meet(message.origin, from).await),
            MessageKind::Quit => Ok(self.handle_quit(&message.origin).into()),
            MessageKind::Broadcast | MessageKind::Rebroadcast => {
                self.handle_broadcast(message).await
            }
            MessageKind::Direct => self.handle_direct(message).map(Handled::from),
        }
    }

    async fn handle_meet(&mut self, origin: NodeId, from: SocketAddr) -> Handled {
        if self.membership.contains(&origin) {
            trace!("[{}] Already know {}", self.node_id(), origin);
            return Handled::default();
        }
        // Introduce ourselves back unless this address is already a neighbor
        let reciprocate = !self.membership.has_address(from);

        self.membership.add_node(origin.clone(), from);
        self.clock.register(&origin);
        info!("[{}] New neighbor {} at {}", self.node_id(), origin, from);

        let handled = Handled::from(vec![NodeEvent::NeighborJoined {
            node_id: origin,
            address: from,
        }]);
        if reciprocate {
            handled.with_send(self.send_meet(from).await)
        } else {
            handled
        }
    }

    fn handle_quit(&mut self, origin: &NodeId) -> Vec<NodeEvent> {
        match self.membership.remove_node(origin) {
            Some(addr) => {
                info!("[{}] Neighbor {} at {} left", self.node_id(), origin, addr);
                vec![NodeEvent::NeighborLeft {
                    node_id: origin.clone(),
                }]
            }
            None => Vec::new(),
        }
    }

    async fn handle_broadcast(&mut self, message: Message) -> Result<Handled> {
        // Relaying is decided apart from delivery: the origin's own copy is
        // passed on even if a rebroadcast of it was delivered first.
        let relay = self.disseminator.relay(&message);

        let duplicate = match message.broadcast_id() {
            Some(id) => {
                self.queue.contains(&id)
                    || self
                        .disseminator
                        .history()
                        .already_delivered(&message, &self.clock)
            }
            None => true,
        };
        if duplicate {
            debug!(
                "[{}] Discarding duplicate {} from {}",
                self.node_id(),
                message.kind,
                message.origin
            );
            self.discarded_duplicates += 1;
            return Ok(self.flood_relay(relay, Handled::default()).await);
        }

        self.queue.enqueue(message)?;
        let outcome = self
            .queue
            .pump(&mut self.clock, self.disseminator.history_mut());
        self.delivered_broadcasts += outcome.delivered.len() as u64;
        self.discarded_duplicates += outcome.discarded as u64;
        if !self.queue.is_empty() {
            debug!(
                "[{}] {} broadcasts waiting on causal dependencies",
                self.node_id(),
                self.queue.len()
            );
        }

        let delivered: Vec<NodeEvent> = outcome
            .delivered
            .into_iter()
            .map(|m| NodeEvent::Broadcast {
                origin: m.origin,
                content: m.content,
            })
            .collect();
        Ok(self.flood_relay(relay, delivered.into()).await)
    }

    async fn flood_relay(&self, relay: Option<Message>, handled: Handled) -> Handled {
        let Some(relay) = relay else {
            return handled;
        };
        let result = self
            .disseminator
            .flood(&self.transport, &self.membership, &relay)
            .await
            .map(|_| ());
        handled.with_send(result)
    }

    fn handle_direct(&mut self, message: Message) -> Result<Vec<NodeEvent>> {
        let seq = message.sequence().ok_or_else(|| {
            MurmurError::Message(format!("direct message from {} without sequence", message.origin))
        })?;
        if !self.sequencer.accept_inbound(&message.origin, seq) {
            return Ok(Vec::new());
        }
        self.delivered_directs += 1;
        Ok(vec![NodeEvent::Direct {
            origin: message.origin,
            content: message.content,
        }])
    }

    async fn send_meet(&self, target: SocketAddr) -> Result<()> {
        let data = Message::meet(self.node_id().clone()).encode()?;
        self.transport.send_to(target, &data).await
    }

    /// Introduce ourselves to `target`. Returns false if it is already a neighbor.
    pub async fn meet(&mut self, target: SocketAddr) -> Result<bool> {
        if self.membership.has_address(target) {
            debug!("[{}] {} is already a neighbor", self.node_id(), target);
            return Ok(false);
        }
        self.send_meet(target).await?;
        Ok(true)
    }

    /// Send a new broadcast to every neighbor. Returns the number of neighbors.
    pub async fn broadcast(&mut self, content: String) -> Result<usize> {
        let message = self.disseminator.originate(&mut self.clock, content);
        debug!(
            "[{}] Broadcasting with clock {:?}",
            self.node_id(),
            message.clock()
        );
        self.disseminator
            .flood(&self.transport, &self.membership, &message)
            .await
    }

    /// Send a direct message to the neighbor at `target`. Returns its sequence number.
    pub async fn direct(&mut self, target: SocketAddr, content: String) -> Result<u64> {
        let neighbor = self
            .membership
            .find_by_address(target)
            .cloned()
            .ok_or(MurmurError::UnknownNeighbor(target))?;
        // The number is only used up once the message has left
        let seq = self.sequencer.peek_send(&neighbor);
        let message = Message::direct(self.node_id().clone(), content, seq);
        self.transport.send_to(target, &message.encode()?).await?;
        self.sequencer.commit_send(&neighbor);
        debug!("[{}] Sent direct #{} to {}", self.node_id(), seq, neighbor);
        Ok(seq)
    }

    /// Tell every neighbor we are leaving
    pub async fn quit(&mut self) -> Result<usize> {
        info!("[{}] Leaving the group", self.node_id());
        let message = Message::quit(self.node_id().clone());
        self.disseminator
            .flood(&self.transport, &self.membership, &message)
            .await
    }
}
