//! UDP Transport Implementation
//!
//! A single socket is used for both directions, so the source address a peer
//! sees on our datagrams is the address we listen on.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::error;

use super::receiver::UdpReceiver;
use super::traits::Sender;
use crate::error::{MurmurError, Result};

#[derive(Clone, Debug)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    stats: Arc<SenderStats>,
}

/// Statistics for outbound datagrams
#[derive(Debug, Default)]
pub struct SenderStats {
    pub messages_sent: AtomicU64,
}

impl UdpTransport {
    /// Bind the node socket
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| MurmurError::Transport(format!("Socket bind to {} failed: {}", addr, e)))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| MurmurError::Transport(format!("Socket creation failed: {}", e)))?;

        Ok(Self {
            socket: Arc::new(socket),
            local_addr,
            stats: Arc::new(SenderStats::default()),
        })
    }

    /// A receiver reading from the same socket
    pub fn receiver(&self) -> UdpReceiver {
        UdpReceiver::new(Arc::clone(&self.socket))
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }
}

#[async_trait]
impl Sender for UdpTransport {
    async fn send_to(&self, target: SocketAddr, data: &[u8]) -> Result<()> {
        match self.socket.send_to(data, target).await {
            Ok(_write_size) => {
                self.stats.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                error!("[{}] Failed to send UDP data to {}: {}", self.local_addr, target, e);
                Err(MurmurError::NeighborUnreachable {
                    address: target,
                    source: e,
                })
            }
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
