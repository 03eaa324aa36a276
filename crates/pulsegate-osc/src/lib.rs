//! Pulsegate OSC - Open Sound Control transport
//!
//! This crate provides:
//! - `Dispatcher`: routes decoded messages to handlers by exact address
//! - `OscServer`: UDP listener running on a dedicated I/O thread
//! - `StatusSender`: queued outbound chatbox status text
//! - Argument coercion helpers for numeric and boolean-like values

pub mod dispatcher;
pub mod error;
pub mod server;
pub mod status;
pub mod value;

pub use dispatcher::{Dispatcher, Handler};
pub use error::{OscError, Result};
pub use server::{OscServer, handle_datagram};
pub use status::{CHATBOX_ADDRESS, MAX_STATUS_CHARS, StatusSender, encode_status};

// Re-export the codec types handlers receive
pub use rosc::{OscMessage, OscPacket, OscType};
