//! # kscope Utilities
//!
//! Shared helpers for the kscope workspace. At the moment that is logging
//! setup built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{default_log_file, init_logging, LogConfig, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
