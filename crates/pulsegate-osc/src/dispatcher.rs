//! Address-based message routing
//!
//! Handlers are registered against exact OSC addresses before the server
//! starts. Messages for unregistered addresses are dropped without error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rosc::{OscMessage, OscPacket, OscType};
use tracing::trace;

use crate::error::{OscError, Result};

/// Callback invoked with the message address and its arguments.
///
/// Runs on the server's I/O thread, so it must not block.
pub type Handler = Arc<dyn Fn(&str, &[OscType]) + Send + Sync>;

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Vec<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an exact address.
    ///
    /// Several handlers may share one address; they run in registration order.
    pub fn map<F>(&mut self, address: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&str, &[OscType]) + Send + Sync + 'static,
    {
        let address = address.into();
        if !address.starts_with('/') {
            return Err(OscError::InvalidAddress(address));
        }
        self.handlers
            .entry(address)
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }

    pub fn is_mapped(&self, address: &str) -> bool {
        self.handlers.contains_key(address)
    }

    /// Registered addresses, sorted
    pub fn addresses(&self) -> Vec<&str> {
        let mut addresses: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        addresses.sort_unstable();
        addresses
    }

    /// Route one message. Returns the number of handlers invoked.
    pub fn dispatch(&self, message: &OscMessage) -> usize {
        match self.handlers.get(&message.addr) {
            Some(handlers) => {
                for handler in handlers {
                    handler(&message.addr, &message.args);
                }
                handlers.len()
            }
            None => {
                trace!(address = %message.addr, "No handler for OSC address");
                0
            }
        }
    }

    /// Route every message in a packet, descending into bundles
    pub fn dispatch_packet(&self, packet: &OscPacket) -> usize {
        match packet {
            OscPacket::Message(message) => self.dispatch(message),
            OscPacket::Bundle(bundle) => bundle
                .content
                .iter()
                .map(|inner| self.dispatch_packet(inner))
                .sum(),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("addresses", &self.addresses())
            .finish()
    }
}
