//! murmur application settings
use std::net::{IpAddr, SocketAddr};

use crate::config_error;
use crate::error::Result;

pub const STANDARD_PORT_UDP: u16 = 8412;
pub const DEFAULT_PORT_UDP: &str = "8412";

/// How the causal queue treats a message it cannot deliver yet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryDiscipline {
    /// Only the oldest queued message is examined
    #[default]
    HeadOfLine,
    /// Any ready message is delivered, stalled ones are skipped
    PerOrigin,
}

impl std::fmt::Display for DeliveryDiscipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryDiscipline::HeadOfLine => write!(f, "head-of-line"),
            DeliveryDiscipline::PerOrigin => write!(f, "per-origin"),
        }
    }
}

impl std::str::FromStr for DeliveryDiscipline {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "head-of-line" | "fifo" => Ok(DeliveryDiscipline::HeadOfLine),
            "per-origin" => Ok(DeliveryDiscipline::PerOrigin),
            _ => Err(format!("Invalid delivery discipline: {}", s)),
        }
    }
}

/// Options that shape the ordering engine of one node
#[derive(Clone, Debug, Default)]
pub struct NodeOptions {
    // Max delivered-broadcast identities remembered (None = unbounded)
    pub history_capacity: Option<usize>,

    pub delivery_discipline: DeliveryDiscipline,
}

#[derive(Clone, Debug)]
pub struct Settings {
    // UDP listen address
    pub listen_address: String,

    // UDP listen port
    pub listen_port: u16,

    // Peers to send a meet to once the socket is bound
    pub bootstrap: Vec<SocketAddr>,

    // Ordering engine options
    pub node_options: NodeOptions,

    // Terminate on the first failed send
    pub fail_fast: bool,
}

impl Settings {
    /// The socket address to bind, checked to be IPv4
    pub fn listen_socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .listen_address
            .parse()
            .map_err(|_| config_error!("Invalid listen address: {}", self.listen_address))?;
        if !ip.is_ipv4() {
            return Err(config_error!(
                "Listen address must be IPv4: {}",
                self.listen_address
            ));
        }
        Ok(SocketAddr::new(ip, self.listen_port))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1".to_string(),
            listen_port: STANDARD_PORT_UDP,
            bootstrap: Vec::new(),
            node_options: NodeOptions::default(),
            fail_fast: true,
        }
    }
}
