//! Server error types

use pulsegate_common::DriverError;
use pulsegate_osc::OscError;

/// Configuration errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("no channel parameters configured, set `A` and/or `B`")]
    NoChannels,

    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Errors that abort bridge startup
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("device error: {0}")]
    Device(#[from] DriverError),

    #[error("OSC error: {0}")]
    Osc(#[from] OscError),

    #[error("interrupted by shutdown signal")]
    Interrupted,
}
