//! Immutable control configuration
//!
//! Built once at startup and handed to the coordinator and keep-alive task;
//! nothing in this crate reads configuration from anywhere else.

use std::time::Duration;

use pulsegate_common::{DEFAULT_MAX_STRENGTH, Waveform};

/// Default minimum spacing between accepted commands on one channel
pub const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(500);

/// Default period of the safety reset loop
pub const DEFAULT_RESET_INTERVAL: Duration = Duration::from_secs(1);

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Strength sent for a raw value of 1.0
    pub max_strength: u32,
    /// Minimum spacing between accepted commands per channel
    pub rate_limit_interval: Duration,
    /// Period of the safety reset loop
    pub reset_interval: Duration,
    /// Start the reset loop during bridge startup
    pub reset_enabled: bool,
    /// Initial state of the global enable gate
    pub enabled_on_start: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_strength: DEFAULT_MAX_STRENGTH,
            rate_limit_interval: DEFAULT_RATE_LIMIT_INTERVAL,
            reset_interval: DEFAULT_RESET_INTERVAL,
            reset_enabled: true,
            enabled_on_start: true,
        }
    }
}

impl ControlConfig {
    /// Worst-case time between the last accepted command and the reset
    pub fn safety_bound(&self) -> Duration {
        self.reset_interval + self.rate_limit_interval
    }
}

/// Waveform keep-alive settings
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    pub enabled: bool,
    /// Time between waveform sends
    pub interval: Duration,
    /// Playback duration requested with each send
    pub duration_secs: u32,
    pub waveform: Waveform,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(15),
            duration_secs: 10,
            waveform: Waveform::breath(),
        }
    }
}
