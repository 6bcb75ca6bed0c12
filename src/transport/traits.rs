//! Transport traits for the chat node
//!
//! The node only ever needs to push one datagram at a time to a known address;
//! receiving is handled by tasks that feed an mpsc channel.
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for sending datagrams to peers
#[async_trait]
pub trait Sender: Send + Sync {
    /// Send one datagram to `target`. Fire-and-forget: success only means the
    /// transport accepted it.
    async fn send_to(&self, target: SocketAddr, data: &[u8]) -> Result<()>;

    /// The address peers see as our source address
    fn local_addr(&self) -> SocketAddr;
}
