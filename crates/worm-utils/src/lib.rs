//! # Worm Utilities
//!
//! Shared utilities for the worm workspace.
//!
//! Currently this is the logging setup used by the `worm` binary. Library
//! crates only emit `tracing` events and never install a subscriber, so
//! embedding applications stay free to configure their own.

pub mod logging;

// Re-export commonly used logging items for convenience
pub use logging::{init_logging, init_logging_with, LogConfig, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
