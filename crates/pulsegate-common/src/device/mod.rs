//! Device driver abstraction
//!
//! The bridge never talks to hardware directly. Everything it needs from the
//! stimulation device goes through [`DeviceDriver`], so a wire-level driver
//! and the [`SimulatedDevice`] are interchangeable.

pub mod simulated;

use async_trait::async_trait;

use crate::channel::{Channel, ChannelTarget};
use crate::error::Result;
use crate::waveform::Waveform;

pub use simulated::{DeviceCommand, SimulatedDevice};

/// Stateful two-channel stimulation device
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Connect to the device relay and wait until the session is established
    async fn connect_and_wait(&self) -> Result<()>;

    /// Wait until the companion app has paired with this session
    async fn wait_for_app_link(&self) -> Result<()>;

    /// Whether the paired hardware is currently reachable
    fn is_linked(&self) -> bool;

    /// Set the absolute strength of one channel
    async fn set_strength(&self, channel: Channel, strength: u32) -> Result<()>;

    /// Play a waveform on the target for `duration_secs` seconds
    async fn send_waveform(
        &self,
        waveform: &Waveform,
        duration_secs: u32,
        target: ChannelTarget,
    ) -> Result<()>;
}
