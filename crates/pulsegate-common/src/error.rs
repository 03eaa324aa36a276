//! Device driver error types

/// Error returned by a single device driver call.
///
/// Every variant is treated as transient by the bridge: the failure is logged
/// at the call site and the next inbound update or reset tick acts as the retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("device not connected")]
    NotConnected,

    #[error("device app not linked")]
    NotLinked,

    #[error("strength {strength} exceeds device limit {limit}")]
    StrengthOutOfRange { strength: u32, limit: u32 },

    #[error("command rejected by device: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("device request timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(DriverError::NotLinked.to_string(), "device app not linked");
        assert_eq!(
            DriverError::StrengthOutOfRange {
                strength: 250,
                limit: 200
            }
            .to_string(),
            "strength 250 exceeds device limit 200"
        );
        assert_eq!(
            DriverError::Transport("socket closed".to_string()).to_string(),
            "transport error: socket closed"
        );
    }
}
