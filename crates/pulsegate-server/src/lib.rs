// Pulsegate server library
// Configuration loading, logging/shutdown startup utilities and the bridge
// that wires the OSC transport to the control coordinator

pub mod bridge; // Startup/shutdown sequence and OSC handler registration
pub mod config; // Layered configuration and CLI
pub mod error; // Error types
pub mod startup; // Logging and signal handling

pub use bridge::{Bridge, BridgeSettings};
pub use config::{ChannelMap, Cli, Configuration, OscConfig};
pub use error::{BridgeError, ConfigError};
