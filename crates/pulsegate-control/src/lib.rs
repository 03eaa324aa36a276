//! Pulsegate Control - command dispatch and safety reset
//!
//! This crate provides:
//! - `ChannelRateLimiter`: per-channel minimum spacing between accepted commands
//! - `ControlCoordinator`: translates intensity updates into device strength
//!   commands and runs the safety reset loop
//! - `EventPump`: drains events queued by foreign threads into the coordinator
//! - `WaveformKeepalive`: periodic waveform broadcast on both channels

pub mod config;
pub mod coordinator;
pub mod events;
pub mod keepalive;
pub mod limiter;

pub use config::{ControlConfig, KeepaliveConfig};
pub use coordinator::{ControlCoordinator, UpdateOutcome, target_strength};
pub use events::{ControlEvent, EventPump, EventReceiver, EventSender, event_channel};
pub use keepalive::WaveformKeepalive;
pub use limiter::ChannelRateLimiter;
