//! Terminal output for deliveries and command feedback.
//!
//! Everything the user reads goes through here to stdout; diagnostics for
//! operators go through `tracing` to stderr.
use std::io::Write;

use tracing::warn;

use crate::error::MurmurError;
use crate::node::{NeighborList, NodeEvent, NodeStats};

pub fn format_event(event: &NodeEvent) -> String {
    match event {
        NodeEvent::NeighborJoined { node_id, address } => {
            format!("New neighbor: {} ({})", node_id, address)
        }
        NodeEvent::NeighborLeft { node_id } => format!("Neighbor left: {}", node_id),
        NodeEvent::Broadcast { origin, content } => format!("Broadcast > {}: {}", origin, content),
        NodeEvent::Direct { origin, content } => {
            format!("Direct Message > {}: {}", origin, content)
        }
    }
}

pub struct Console<W: Write> {
    out: W,
}

impl Console<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn event(&mut self, event: &NodeEvent) {
        self.line(&format_event(event));
    }

    pub fn sent(&mut self, content: &str) {
        self.line(&format!("You sent: {}", content));
    }

    pub fn error(&mut self, err: &MurmurError) {
        self.line(&err.to_string());
    }

    pub fn neighbors(&mut self, neighbors: &NeighborList) {
        if neighbors.is_empty() {
            self.line("No neighbors yet");
            return;
        }
        for (node_id, address) in neighbors {
            self.line(&format!("{}, {}", node_id, address));
        }
    }

    pub fn stats(&mut self, stats: &NodeStats) {
        self.line(&format!(
            "delivered: {} broadcasts, {} direct | discarded duplicates: {} | dropped direct: {} | relayed: {} | queued: {} | neighbors: {} | history: {}",
            stats.delivered_broadcasts,
            stats.delivered_directs,
            stats.discarded_duplicates,
            stats.dropped_directs,
            stats.relayed,
            stats.queued,
            stats.neighbors,
            stats.history
        ));
    }

    pub fn notice(&mut self, text: &str) {
        self.line(text);
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }
}
