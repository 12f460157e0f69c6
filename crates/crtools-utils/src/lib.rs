//! # crtools Utilities
//!
//! Shared utilities for the crtools workspace, mainly the `tracing`-based
//! logging setup used by the command-line front end.

pub mod logging;

pub use logging::{init_logging, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
