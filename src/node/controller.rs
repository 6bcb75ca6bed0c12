use std::io::Write;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::commands::{NeighborList, UserCommand, HELP};
use super::{ChatNode, Handled, NodeEvent};
use crate::console::Console;
use crate::error::{MurmurError, Result};
use crate::transport::Sender;

/// Owns a chat node and serializes everything that touches it: inbound
/// datagrams and user commands are handled one at a time on a single task.
pub struct NodeController<T: Sender, W: Write> {
    node: ChatNode<T>,
    console: Console<W>,
    neighbors_tx: watch::Sender<NeighborList>,
    fail_fast: bool,
}

impl<T: Sender, W: Write> std::fmt::Debug for NodeController<T, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeController")
            .field("node", &self.node)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl<T: Sender, W: Write> NodeController<T, W> {
    /// Returns the controller and a view of the neighbor table for the
    /// command reader
    pub fn new(
        node: ChatNode<T>,
        console: Console<W>,
        fail_fast: bool,
    ) -> (Self, watch::Receiver<NeighborList>) {
        let (neighbors_tx, neighbors_rx) = watch::channel(node.neighbors());
        (
            Self {
                node,
                console,
                neighbors_tx,
                fail_fast,
            },
            neighbors_rx,
        )
    }

    pub fn node(&self) -> &ChatNode<T> {
        &self.node
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    /// Send a meet to every bootstrap peer
    pub async fn bootstrap(&mut self, peers: &[SocketAddr]) -> Result<()> {
        for peer in peers {
            info!("[{}] Meeting bootstrap peer {}", self.node.node_id(), peer);
            let result = self.node.meet(*peer).await.map(|_| Vec::new());
            self.settle(result)?;
        }
        Ok(())
    }

    /// Handle events until the user quits, input closes, or a fatal error
    pub async fn run(
        &mut self,
        mut inbound: mpsc::Receiver<(Bytes, SocketAddr)>,
        mut commands: mpsc::Receiver<Result<UserCommand>>,
    ) -> Result<()> {
        let node_id = self.node.node_id().clone();
        info!("[{}] Starting central IO loop", node_id);

        loop {
            tokio::select! {
                // Network traffic first so commands see up to date membership
                biased;

                // Handle incoming datagrams from the network
                Some((data, from)) = inbound.recv() => {
                    let result = self.node.handle_datagram(&data, from).await;
                    self.settle_handled(result)?;
                }
                // Handle commands typed by the user
                command = commands.recv() => match command {
                    Some(Ok(command)) => {
                        if !self.handle_command(command).await? {
                            break;
                        }
                    }
                    Some(Err(e)) => self.console.error(&e),
                    None => {
                        info!("[{}] Input closed, leaving", node_id);
                        let result = self.node.quit().await.map(|_| Vec::new());
                        self.settle(result)?;
                        break;
                    }
                },
            }
        }
        debug!("[{}] IO loop finished: {:?}", node_id, self.node.stats());
        Ok(())
    }

    /// Returns false once the node has quit
    pub async fn handle_command(&mut self, command: UserCommand) -> Result<bool> {
        match command {
            UserCommand::Meet(target) => {
                let result = self.node.meet(target).await;
                match result {
                    Ok(true) => self.console.notice(&format!("Meet sent to {}", target)),
                    Ok(false) => self.console.notice(&format!("{} is already a neighbor", target)),
                    Err(e) => self.settle(Err(e))?,
                }
            }
            UserCommand::Direct { target, content } => {
                match self.node.direct(target, content.clone()).await {
                    Ok(_) => self.console.sent(&content),
                    Err(e) => self.settle(Err(e))?,
                }
            }
            UserCommand::Broadcast(content) => {
                match self.node.broadcast(content.clone()).await {
                    Ok(_) => self.console.sent(&content),
                    Err(e) => self.settle(Err(e))?,
                }
            }
            UserCommand::Neighbors => self.console.neighbors(&self.node.neighbors()),
            UserCommand::Stats => self.console.stats(&self.node.stats()),
            UserCommand::Help => self.console.notice(HELP),
            UserCommand::Quit => {
                let result = self.node.quit().await.map(|_| Vec::new());
                self.settle(result)?;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Show what a datagram produced, then deal with any send it caused to fail
    fn settle_handled(&mut self, result: Result<Handled>) -> Result<()> {
        match result {
            Ok(handled) => {
                self.settle(Ok(handled.events))?;
                match handled.send_error {
                    Some(e) => self.settle(Err(e)),
                    None => Ok(()),
                }
            }
            Err(e) => self.settle(Err(e)),
        }
    }

    /// Show events, and decide whether an error ends the process
    fn settle(&mut self, result: Result<Vec<NodeEvent>>) -> Result<()> {
        match result {
            Ok(events) => {
                for event in &events {
                    self.console.event(event);
                }
                let membership_changed = events.iter().any(|event| {
                    matches!(
                        event,
                        NodeEvent::NeighborJoined { .. } | NodeEvent::NeighborLeft { .. }
                    )
                });
                if membership_changed {
                    self.neighbors_tx.send_replace(self.node.neighbors());
                }
                Ok(())
            }
            Err(e) if e.is_fatal() && self.fail_fast => {
                error!("[{}] {}", self.node.node_id(), e);
                Err(e)
            }
            Err(e) if e.is_fatal() => {
                warn!("[{}] {} (continuing)", self.node.node_id(), e);
                // Membership may have changed before the send failed
                self.neighbors_tx.send_replace(self.node.neighbors());
                Ok(())
            }
            Err(e @ MurmurError::Message(_)) => {
                warn!("[{}] Dropping datagram: {}", self.node.node_id(), e);
                self.console.error(&e);
                Ok(())
            }
            Err(e) => {
                self.console.error(&e);
                Ok(())
            }
        }
    }
}
