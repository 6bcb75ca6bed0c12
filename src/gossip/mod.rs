//! Ordered delivery for the chat group.
//!
//! Broadcasts are flooded to every neighbor and carry a vector clock so that
//! receivers can hand them to the user in causal order. Direct messages carry a
//! per-link sequence number instead and are delivered in FIFO order or dropped.
pub mod causal;
pub mod clock;
pub mod dissemination;
pub mod messages;
pub mod sequencer;
pub mod vector_clock;

pub use causal::{CausalQueue, PumpOutcome, Readiness};
pub use clock::ClockState;
pub use dissemination::{DeliveryHistory, Disseminator};
pub use messages::{BroadcastId, CausalStamp, Message, MessageKind, WireMessage};
pub use sequencer::LinkSequencer;
pub use vector_clock::VectorClock;
