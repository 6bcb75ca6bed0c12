//! UDP Receiver
//!
//! Reads datagrams off the node socket and forwards them, with their source
//! address, into the channel consumed by the node's event loop.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const MAX_DATAGRAM_SIZE: usize = 65536;
const RECV_BACKOFF_BASE: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

pub struct UdpReceiver {
    socket: Arc<UdpSocket>,
}

/// Pause before retrying after `consecutive_errors` failed reads in a row.
/// Doubles per error up to `RECV_BACKOFF_MAX`.
fn recv_backoff(consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    RECV_BACKOFF_BASE
        .saturating_mul(1 << exponent)
        .min(RECV_BACKOFF_MAX)
}

impl UdpReceiver {
    pub fn new(socket: Arc<UdpSocket>) -> Self {
        Self { socket }
    }

    /// Start the receive loop. It ends when the channel's receiver is dropped.
    pub fn spawn(self, tx: mpsc::Sender<(Bytes, SocketAddr)>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let mut consecutive_errors: u32 = 0;

            loop {
                match self.socket.recv_from(&mut buf).await {
                    Ok((len, addr)) => {
                        consecutive_errors = 0;
                        let data = Bytes::copy_from_slice(&buf[..len]);
                        if tx.send((data, addr)).await.is_err() {
                            debug!("Inbound channel closed, stopping UDP receiver");
                            break;
                        }
                    }
                    Err(e) => {
                        consecutive_errors = consecutive_errors.saturating_add(1);
                        let pause = recv_backoff(consecutive_errors);
                        warn!("UDP receive error: {} (retrying in {:?})", e, pause);
                        tokio::select! {
                            _ = tokio::time::sleep(pause) => {}
                            _ = tx.closed() => {
                                debug!("Inbound channel closed, stopping UDP receiver");
                                break;
                            }
                        }
                    }
                }
            }
        })
    }
}
