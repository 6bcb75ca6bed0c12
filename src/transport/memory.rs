//! In-process transport
//!
//! Routes datagrams between nodes living in the same process through mpsc
//! channels keyed by a fake socket address. Used to run several chat nodes
//! side by side in tests and simulations. Like UDP, a datagram sent to an
//! endpoint whose inbox is full is silently lost.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use super::traits::Sender;
use crate::error::{MurmurError, Result};

const INBOX_CAPACITY: usize = 1024;

type Route = mpsc::Sender<(Bytes, SocketAddr)>;

/// A switchboard connecting every transport bound on it
#[derive(Clone, Debug, Default)]
pub struct MemoryNetwork {
    routes: Arc<Mutex<HashMap<SocketAddr, Route>>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new endpoint at `addr`, returning its sender and inbound stream
    pub fn bind(
        &self,
        addr: SocketAddr,
    ) -> Result<(ChannelTransport, mpsc::Receiver<(Bytes, SocketAddr)>)> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let mut routes = self
            .routes
            .lock()
            .map_err(|e| MurmurError::Transport(format!("Route table lock poisoned: {}", e)))?;
        if routes.contains_key(&addr) {
            return Err(MurmurError::Transport(format!("Address in use: {}", addr)));
        }
        routes.insert(addr, tx);
        Ok((
            ChannelTransport {
                local_addr: addr,
                network: self.clone(),
            },
            rx,
        ))
    }

    /// Detach the endpoint at `addr`; later sends to it fail
    pub fn disconnect(&self, addr: SocketAddr) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.remove(&addr);
        }
    }

    fn route(&self, addr: SocketAddr) -> Option<Route> {
        self.routes
            .lock()
            .ok()
            .and_then(|routes| routes.get(&addr).cloned())
    }
}

#[derive(Clone, Debug)]
pub struct ChannelTransport {
    local_addr: SocketAddr,
    network: MemoryNetwork,
}

#[async_trait]
impl Sender for ChannelTransport {
    async fn send_to(&self, target: SocketAddr, data: &[u8]) -> Result<()> {
        let unreachable = || MurmurError::NeighborUnreachable {
            address: target,
            source: std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no endpoint bound at address",
            ),
        };
        let route = self.network.route(target).ok_or_else(unreachable)?;
        match route.try_send((Bytes::copy_from_slice(data), self.local_addr)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Inbox of {} is full, datagram lost", target);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(unreachable()),
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
