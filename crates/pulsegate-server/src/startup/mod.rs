//! Application startup utilities module.
//!
//! Logging initialisation and process signal handling shared by the binary
//! and the integration tests.

mod logging;
mod shutdown;

pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{ShutdownSignal, run_with_shutdown, wait_for_shutdown_signal};
