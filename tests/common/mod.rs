#![allow(dead_code)]
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;

use murmur::error::MurmurError;
use murmur::node::{ChatNode, NodeEvent, NodeId};
use murmur::settings::NodeOptions;
use murmur::transport::{ChannelTransport, MemoryNetwork};

pub fn addr(port: u16) -> SocketAddr {
    format!("127.0.0.1:{}", port).parse().unwrap()
}

pub struct Peer {
    pub node: ChatNode<ChannelTransport>,
    pub inbox: mpsc::Receiver<(Bytes, SocketAddr)>,
    pub events: Vec<NodeEvent>,
}

impl Peer {
    pub fn id(&self) -> NodeId {
        self.node.node_id().clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.node.local_addr()
    }

    /// Contents of delivered broadcasts, in delivery order
    pub fn broadcasts(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                NodeEvent::Broadcast { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn directs(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                NodeEvent::Direct { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Several nodes on one in-memory network, stepped by hand
pub struct Cluster {
    pub network: MemoryNetwork,
    pub peers: Vec<Peer>,
}

impl Cluster {
    pub fn new(names: &[&str]) -> Self {
        Self::with_options(names, NodeOptions::default())
    }

    pub fn with_options(names: &[&str], options: NodeOptions) -> Self {
        let network = MemoryNetwork::new();
        let peers = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let (transport, inbox) = network.bind(addr(9000 + i as u16)).unwrap();
                Peer {
                    node: ChatNode::new(NodeId::from(*name), transport, options.clone()),
                    inbox,
                    events: Vec::new(),
                }
            })
            .collect();
        Self { network, peers }
    }

    pub fn peer(&self, idx: usize) -> &Peer {
        &self.peers[idx]
    }

    pub fn node(&mut self, idx: usize) -> &mut ChatNode<ChannelTransport> {
        &mut self.peers[idx].node
    }

    /// Drain every inbox until no datagrams are left in flight
    pub async fn settle(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let mut progressed = false;
            for peer in self.peers.iter_mut() {
                while let Ok((data, from)) = peer.inbox.try_recv() {
                    let outcome = peer.node.handle_datagram(&data, from).await.unwrap();
                    assert!(outcome.send_error.is_none(), "{:?}", outcome.send_error);
                    peer.events.extend(outcome.events);
                    handled += 1;
                    progressed = true;
                }
            }
            if !progressed {
                return handled;
            }
        }
    }

    /// Take everything waiting in one inbox without handling it
    pub fn intercept(&mut self, idx: usize) -> Vec<(Bytes, SocketAddr)> {
        let mut datagrams = Vec::new();
        while let Ok(datagram) = self.peers[idx].inbox.try_recv() {
            datagrams.push(datagram);
        }
        datagrams
    }

    /// Hand a datagram to a node as if it had just arrived. Returns the
    /// failure of any send it triggered.
    pub async fn inject(&mut self, idx: usize, data: &[u8], from: SocketAddr) -> Option<MurmurError> {
        let peer = &mut self.peers[idx];
        let handled = peer.node.handle_datagram(data, from).await.unwrap();
        peer.events.extend(handled.events);
        handled.send_error
    }

    /// `a` introduces itself to `b` and both sides settle
    pub async fn meet(&mut self, a: usize, b: usize) {
        let target = self.peers[b].addr();
        self.peers[a].node.meet(target).await.unwrap();
        self.settle().await;
    }
}
