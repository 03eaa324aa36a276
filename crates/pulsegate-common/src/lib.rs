//! Pulsegate Common - Shared types for the avatar-to-device bridge
//!
//! This crate provides the types every other Pulsegate component builds on:
//! - `Channel` / `ChannelTarget` identifiers for the device outputs
//! - `Waveform` pulse patterns and presets
//! - The `DeviceDriver` trait and its `DriverError`
//! - A simulated in-process device for dry runs and tests

pub mod channel;
pub mod device;
pub mod error;
pub mod waveform;

// Re-exports for convenience
pub use channel::{Channel, ChannelTarget};
pub use device::{DeviceCommand, DeviceDriver, SimulatedDevice};
pub use error::DriverError;
pub use waveform::{PulseFrame, Waveform};

/// Highest strength the device hardware accepts on a single channel
pub const DEVICE_STRENGTH_LIMIT: u32 = 200;

/// Default upper bound applied to translated intensity values
pub const DEFAULT_MAX_STRENGTH: u32 = 10;
