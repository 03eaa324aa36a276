//! Outbound status text
//!
//! Status lines are queued from any context and delivered by a tokio task as
//! `/chatbox/input [text, true]` messages. The trailing `true` asks the
//! receiver to show the text immediately instead of opening a keyboard.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use rosc::{OscMessage, OscPacket, OscType, encoder};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{OscError, Result};

pub const CHATBOX_ADDRESS: &str = "/chatbox/input";

/// Longest text the chatbox displays
pub const MAX_STATUS_CHARS: usize = 144;

/// Encode a status line as a chatbox message, truncating overlong text
pub fn encode_status(text: &str) -> Result<Vec<u8>> {
    let text: String = text.chars().take(MAX_STATUS_CHARS).collect();
    let packet = OscPacket::Message(OscMessage {
        addr: CHATBOX_ADDRESS.to_string(),
        args: vec![OscType::String(text), OscType::Bool(true)],
    });
    encoder::encode(&packet).map_err(|e| OscError::Encoding(format!("{:?}", e)))
}

/// Cloneable producer side of the status queue
#[derive(Debug, Clone)]
pub struct StatusSender {
    target: SocketAddr,
    tx: mpsc::UnboundedSender<String>,
}

impl StatusSender {
    /// Bind an ephemeral socket and start the delivery task.
    ///
    /// The task drains the queue until every clone of the sender is dropped.
    pub async fn connect(target: SocketAddr) -> Result<(Self, JoinHandle<()>)> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(deliver(socket, target, rx));

        info!(%target, "Status sender started");
        Ok((Self { target, tx }, task))
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Queue a status line. Safe to call from any thread, never blocks.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.tx.send(text.into()).map_err(|_| OscError::Closed)
    }
}

async fn deliver(socket: UdpSocket, target: SocketAddr, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        let bytes = match encode_status(&text) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to encode status text");
                continue;
            }
        };
        match socket.send_to(&bytes, target).await {
            Ok(_) => debug!(%target, text = %text, "Status text sent"),
            Err(e) => warn!(%target, error = %e, "Failed to send status text"),
        }
    }
    debug!("Status sender stopped");
}
