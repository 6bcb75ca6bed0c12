//! User commands typed at the chat prompt, and the reader that parses them.
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::watch;
use tracing::warn;

use crate::error::Result;
use crate::input_error;
use crate::node::NodeId;

pub const HELP: &str = "\
commands:
  meet <address> <port>   introduce yourself to a peer
  dm                      send a direct message to a neighbor
  broadcast               send a message to the whole group
  neighbors               list known neighbors
  stats                   show delivery counters
  quit                    leave the group and exit";

/// Snapshot of the membership table shown while choosing a dm recipient
pub type NeighborList = Vec<(NodeId, SocketAddr)>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserCommand {
    Meet(SocketAddr),
    Direct { target: SocketAddr, content: String },
    Broadcast(String),
    Neighbors,
    Stats,
    Help,
    Quit,
}

/// Parse a dotted-quad IPv4 address
pub fn parse_address(address: &str) -> Result<Ipv4Addr> {
    address
        .parse::<Ipv4Addr>()
        .map_err(|_| input_error!("Invalid address: {:?}", address))
}

/// Parse a port number in [0, 65535]
pub fn parse_port(port: &str) -> Result<u16> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(input_error!("Invalid port: {:?}", port));
    }
    port.parse::<u16>()
        .map_err(|_| input_error!("Invalid port: {:?}", port))
}

pub fn parse_target(address: &str, port: &str) -> Result<SocketAddr> {
    let ip = parse_address(address)?;
    let port = parse_port(port)?;
    Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
}

/// Parse `address:port`
pub fn parse_host_port(target: &str) -> Result<SocketAddr> {
    let (address, port) = target
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| input_error!("Expected address:port, got {:?}", target))?;
    parse_target(address, port)
}

/// Parse a single-line command. `dm` and `broadcast` need follow-up prompts
/// and are handled by [`CommandReader`].
pub fn parse_command(line: &str) -> Result<Option<UserCommand>> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    match (command, args.as_slice()) {
        ("meet", [address, port]) => Ok(Some(UserCommand::Meet(parse_target(address, port)?))),
        ("meet", _) => Err(input_error!("Usage: meet <address> <port>")),
        ("neighbors", []) => Ok(Some(UserCommand::Neighbors)),
        ("stats", []) => Ok(Some(UserCommand::Stats)),
        ("help", []) => Ok(Some(UserCommand::Help)),
        ("quit", []) => Ok(Some(UserCommand::Quit)),
        _ => Err(input_error!("Unknown command: {}", line.trim())),
    }
}

/// Reads commands line by line, prompting for the parts of `dm` and
/// `broadcast` that are entered interactively.
pub struct CommandReader<R, W> {
    lines: Lines<R>,
    prompt_out: W,
    neighbors: watch::Receiver<NeighborList>,
}

impl<R, W> CommandReader<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, prompt_out: W, neighbors: watch::Receiver<NeighborList>) -> Self {
        Self {
            lines: input.lines(),
            prompt_out,
            neighbors,
        }
    }

    /// Next command, or None once input is closed
    pub async fn read_command(&mut self) -> Option<Result<UserCommand>> {
        loop {
            let line = self.next_line().await?;
            match line.trim() {
                "dm" => return self.read_direct().await,
                "broadcast" => {
                    let content = self.ask("Type your message: ").await?;
                    return Some(Ok(UserCommand::Broadcast(content)));
                }
                other => match parse_command(other) {
                    Ok(Some(command)) => return Some(Ok(command)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                },
            }
        }
    }

    async fn read_direct(&mut self) -> Option<Result<UserCommand>> {
        let listing = {
            let neighbors = self.neighbors.borrow();
            neighbors
                .iter()
                .map(|(node_id, addr)| format!("{}, {}\n", node_id, addr))
                .collect::<String>()
        };
        self.write_prompt(&format!("Here are your neighbors:\n{}", listing));

        let target = self
            .ask("Who do you want to send a message to? (addr:port) ")
            .await?;
        let target = match parse_host_port(&target) {
            Ok(target) => target,
            Err(e) => return Some(Err(e)),
        };
        let content = self.ask("Type your message: ").await?;
        Some(Ok(UserCommand::Direct { target, content }))
    }

    async fn ask(&mut self, prompt: &str) -> Option<String> {
        self.write_prompt(prompt);
        self.next_line().await
    }

    fn write_prompt(&mut self, text: &str) {
        if let Err(e) = write!(self.prompt_out, "{}", text).and_then(|_| self.prompt_out.flush()) {
            warn!("Failed to write prompt: {}", e);
        }
    }

    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                None
            }
        }
    }
}
