//! OSC transport error types

/// Error type for OSC transport operations
#[derive(Debug, thiserror::Error)]
pub enum OscError {
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("OSC encoding error: {0}")]
    Encoding(String),

    #[error("OSC decoding error: {0}")]
    Decoding(String),

    #[error("invalid OSC address: {0}")]
    InvalidAddress(String),

    #[error("status sender closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, OscError>;
