use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use murmur::cli;
use murmur::console::Console;
use murmur::node::{ChatNode, CommandReader, NodeController, NodeId};
use murmur::transport::{Sender, UdpTransport};

const INBOUND_CHANNEL_SIZE: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings()?;
    let listen_address = settings.listen_socket_addr()?;

    let transport = UdpTransport::bind(listen_address).await?;
    let node_id = NodeId::generate();
    info!("[{}] Listening on {}", node_id, transport.local_addr());
    println!("server listening {}", transport.local_addr());

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_SIZE);
    let receiver_task = transport.receiver().spawn(inbound_tx);

    let node = ChatNode::new(node_id, transport, settings.node_options.clone());
    let (mut controller, neighbors_rx) =
        NodeController::new(node, Console::stdout(), settings.fail_fast);

    let (command_tx, command_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut reader = CommandReader::new(stdin, std::io::stdout(), neighbors_rx);
        while let Some(command) = reader.read_command().await {
            if command_tx.send(command).await.is_err() {
                break;
            }
        }
    });

    let result = match controller.bootstrap(&settings.bootstrap).await {
        Ok(()) => controller.run(inbound_rx, command_rx).await,
        Err(e) => Err(e),
    };
    receiver_task.abort();

    // The stdin reader can be parked in a blocking read that would hold the
    // runtime open, so leave explicitly.
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("Terminating: {}", e);
            std::process::exit(1);
        }
    }
}
