//! murmur: a peer-to-peer group chat node.
//!
//! Peers find each other by flooding `meet` messages, broadcasts are delivered
//! in causal order using vector clocks, and direct messages are delivered in
//! per-link FIFO order. Everything runs over plain UDP datagrams.
pub mod cli;
pub mod cluster;
pub mod console;
pub mod error;
pub mod gossip;
pub mod node;
pub mod settings;
pub mod transport;
