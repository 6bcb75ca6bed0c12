//! Chat Message Protocol
//!
//! Every datagram carries exactly one JSON object:
//!
//! ```text
//! { "type": "meet" | "broadcast" | "rebroadcast" | "direct" | "quit",
//!   "content": "...",
//!   "origin": "<node id>",
//!   "timestamp": "..." }   // optional
//! ```
//!
//! `timestamp` holds a JSON-encoded vector clock for broadcasts and
//! rebroadcasts, a decimal sequence number for direct messages, and is absent
//! for meet and quit.
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gossip::VectorClock;
use crate::message_error;
use crate::node::NodeId;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Meet,
    Broadcast,
    Rebroadcast,
    Direct,
    Quit,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Meet => write!(f, "meet"),
            MessageKind::Broadcast => write!(f, "broadcast"),
            MessageKind::Rebroadcast => write!(f, "rebroadcast"),
            MessageKind::Direct => write!(f, "direct"),
            MessageKind::Quit => write!(f, "quit"),
        }
    }
}

/// The raw payload shape, before the timestamp is interpreted
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Causal information attached to a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CausalStamp {
    None,
    Clock(VectorClock),
    Sequence(u64),
}

/// A decoded chat message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
    pub origin: NodeId,
    pub stamp: CausalStamp,
}

/// Identity of a broadcast: who sent it and which of their broadcasts it is
pub type BroadcastId = (NodeId, u64);

impl Message {
    pub fn meet(origin: NodeId) -> Self {
        Self {
            kind: MessageKind::Meet,
            content: String::new(),
            origin,
            stamp: CausalStamp::None,
        }
    }

    pub fn quit(origin: NodeId) -> Self {
        Self {
            kind: MessageKind::Quit,
            content: String::new(),
            origin,
            stamp: CausalStamp::None,
        }
    }

    pub fn broadcast(origin: NodeId, content: String, clock: VectorClock) -> Self {
        Self {
            kind: MessageKind::Broadcast,
            content,
            origin,
            stamp: CausalStamp::Clock(clock),
        }
    }

    pub fn direct(origin: NodeId, content: String, sequence: u64) -> Self {
        Self {
            kind: MessageKind::Direct,
            content,
            origin,
            stamp: CausalStamp::Sequence(sequence),
        }
    }

    /// The same broadcast, relabelled for relaying
    pub fn as_rebroadcast(&self) -> Self {
        Self {
            kind: MessageKind::Rebroadcast,
            ..self.clone()
        }
    }

    pub fn clock(&self) -> Option<&VectorClock> {
        match &self.stamp {
            CausalStamp::Clock(clock) => Some(clock),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<u64> {
        match self.stamp {
            CausalStamp::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Broadcasts and rebroadcasts of the same message share this identity
    pub fn broadcast_id(&self) -> Option<BroadcastId> {
        self.clock()
            .map(|clock| (self.origin.clone(), clock.get_timestamp(&self.origin)))
    }

    /// Interpret a wire payload, checking the fields the shape check cannot
    pub fn from_wire(wire: WireMessage) -> Result<Self> {
        if wire.origin.is_empty() {
            return Err(message_error!("empty origin"));
        }
        let stamp = match (wire.kind, wire.timestamp.as_deref()) {
            (MessageKind::Meet | MessageKind::Quit, _) => CausalStamp::None,
            (MessageKind::Broadcast | MessageKind::Rebroadcast, Some(ts)) => {
                CausalStamp::Clock(VectorClock::from_stamp(ts)?)
            }
            (MessageKind::Direct, Some(ts)) => CausalStamp::Sequence(ts.parse().map_err(|_| {
                message_error!("invalid sequence number {:?}", ts)
            })?),
            (kind, None) => return Err(message_error!("{} message without timestamp", kind)),
        };
        Ok(Self {
            kind: wire.kind,
            content: wire.content,
            origin: NodeId::from(wire.origin),
            stamp,
        })
    }

    pub fn to_wire(&self) -> Result<WireMessage> {
        let timestamp = match &self.stamp {
            CausalStamp::None => None,
            CausalStamp::Clock(clock) => Some(clock.to_stamp()?),
            CausalStamp::Sequence(seq) => Some(seq.to_string()),
        };
        Ok(WireMessage {
            kind: self.kind,
            content: self.content.clone(),
            origin: self.origin.as_str().to_string(),
            timestamp,
        })
    }

    /// Serialize for sending in a single datagram
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_wire()?)?)
    }

    /// Deserialize a received datagram
    pub fn decode(data: &[u8]) -> Result<Self> {
        let wire: WireMessage = serde_json::from_slice(data)
            .map_err(|e| message_error!("payload rejected: {}", e))?;
        Self::from_wire(wire)
    }
}
