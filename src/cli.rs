//! CLI for this application
//!
use crate::error::Result;
use crate::node::commands::parse_host_port;
use crate::settings;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, clap::Parser)]
#[clap(name = APP_NAME, version = APP_VERSION, about = "Peer-to-peer group chat")]
pub struct Cli {
    // UDP listen address
    #[clap(
        long,
        default_value = "127.0.0.1",
        env("MURMUR_LISTEN_ADDRESS"),
        help = "IPv4 address to listen on"
    )]
    pub listen_address: String,

    // UDP listen port
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT_UDP,
        env("MURMUR_LISTEN_PORT"),
        help = "UDP port to bind the chat node to"
    )]
    pub listen_port: u16,

    // Peers to meet at startup
    #[clap(
        long,
        env("MURMUR_BOOTSTRAP"),
        value_delimiter = ',',
        help = "Peers to meet at startup, as address:port (comma separated)"
    )]
    pub bootstrap: Vec<String>,

    // Delivery history capacity
    #[clap(
        long,
        env("MURMUR_HISTORY_CAPACITY"),
        help = "Max delivered broadcasts remembered for deduplication (unbounded if unset)"
    )]
    pub history_capacity: Option<usize>,

    // Causal queue discipline
    #[clap(
        long,
        default_value = "head-of-line",
        env("MURMUR_DELIVERY_DISCIPLINE"),
        help = "delivery-discipline: 'head-of-line' or 'per-origin'"
    )]
    pub delivery_discipline: settings::DeliveryDiscipline,

    // Keep running after a failed send
    #[clap(
        long,
        env("MURMUR_NO_FAIL_FAST"),
        help = "Log failed sends instead of exiting"
    )]
    pub no_fail_fast: bool,
}

impl Cli {
    pub fn into_settings(self) -> Result<settings::Settings> {
        let bootstrap = self
            .bootstrap
            .iter()
            .map(|peer| parse_host_port(peer))
            .collect::<Result<Vec<_>>>()?;

        Ok(settings::Settings {
            listen_address: self.listen_address,
            listen_port: self.listen_port,
            bootstrap,
            node_options: settings::NodeOptions {
                history_capacity: self.history_capacity,
                delivery_discipline: self.delivery_discipline,
            },
            fail_fast: !self.no_fail_fast,
        })
    }
}
