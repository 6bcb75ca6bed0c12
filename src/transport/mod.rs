//! Datagram transports for the chat node.
//!
//! `UdpTransport` is what the binary runs on; `ChannelTransport` connects nodes
//! inside one process.
pub mod memory;
pub mod receiver;
pub mod traits;
pub mod udp_connection;

pub use memory::{ChannelTransport, MemoryNetwork};
pub use receiver::UdpReceiver;
pub use traits::Sender;
pub use udp_connection::{SenderStats, UdpTransport};
