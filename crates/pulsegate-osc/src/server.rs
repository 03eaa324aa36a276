//! UDP listener on a dedicated I/O thread
//!
//! The thread blocks on the socket with a short read timeout so that
//! [`OscServer::close`] is observed promptly. Every decoded message is handed
//! to the [`Dispatcher`] on that same thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use rosc::decoder;
use tracing::{debug, info, trace, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{OscError, Result};

/// Read timeout used to poll the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Largest datagram accepted
const MAX_DATAGRAM_SIZE: usize = 65_507;

pub struct OscServer {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    received: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl OscServer {
    /// Bind the listener and start the I/O thread
    pub fn bind(addr: impl ToSocketAddrs, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let received = Arc::new(AtomicU64::new(0));

        let thread = std::thread::Builder::new()
            .name("osc-server".to_string())
            .spawn({
                let running = running.clone();
                let received = received.clone();
                move || serve(socket, dispatcher, running, received)
            })?;

        info!(%local_addr, "OSC server listening");
        Ok(Self {
            local_addr,
            running,
            received,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Number of datagrams decoded successfully
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Stop the I/O thread and wait for it to exit.
    ///
    /// Returns `false` if the server was already closed.
    pub fn close(&mut self) -> bool {
        let Some(thread) = self.thread.take() else {
            return false;
        };
        self.running.store(false, Ordering::Release);
        if thread.join().is_err() {
            warn!(local_addr = %self.local_addr, "OSC server thread panicked");
        }
        info!(local_addr = %self.local_addr, "OSC server closed");
        true
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        self.close();
    }
}

fn serve(
    socket: UdpSocket,
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
    received: Arc<AtomicU64>,
) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Acquire) {
        let (len, peer) = match socket.recv_from(&mut buffer) {
            Ok(read) => read,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            // Windows reports ICMP port-unreachable from earlier sends here
            Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
            Err(e) => {
                warn!(error = %e, "OSC socket receive failed");
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
        };

        match handle_datagram(&dispatcher, &buffer[..len]) {
            Ok(handled) => {
                received.fetch_add(1, Ordering::Relaxed);
                trace!(%peer, bytes = len, handled, "OSC datagram dispatched");
            }
            Err(e) => debug!(%peer, error = %e, "Dropping malformed OSC datagram"),
        }
    }

    debug!("OSC server thread exited");
}

/// Decode one datagram and dispatch every message it contains
pub fn handle_datagram(dispatcher: &Dispatcher, bytes: &[u8]) -> Result<usize> {
    let (_rest, packet) =
        decoder::decode_udp(bytes).map_err(|e| OscError::Decoding(format!("{:?}", e)))?;
    Ok(dispatcher.dispatch_packet(&packet))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rosc::{OscMessage, OscPacket, OscType, encoder};

    use super::*;

    #[test]
    fn test_handle_datagram_decodes_and_dispatches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new();
        let sink = seen.clone();
        dispatcher
            .map("/avatar/parameters/Tail", move |_, args| {
                sink.lock().unwrap().push(args.to_vec());
            })
            .unwrap();

        let bytes = encoder::encode(&OscPacket::Message(OscMessage {
            addr: "/avatar/parameters/Tail".to_string(),
            args: vec![OscType::Float(0.75)],
        }))
        .unwrap();

        assert_eq!(handle_datagram(&dispatcher, &bytes).unwrap(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![vec![OscType::Float(0.75)]]);
    }

    #[test]
    fn test_handle_datagram_rejects_garbage() {
        let dispatcher = Dispatcher::new();
        let result = handle_datagram(&dispatcher, b"not osc at all");
        assert!(matches!(result, Err(OscError::Decoding(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut server = OscServer::bind("127.0.0.1:0", Arc::new(Dispatcher::new())).unwrap();
        assert!(server.is_running());
        assert_ne!(server.local_addr().port(), 0);

        assert!(server.close());
        assert!(!server.close());
        assert!(!server.is_running());
    }
}
