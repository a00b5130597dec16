//! # machlens utilities
//!
//! Logging setup shared by the machlens binaries.

pub mod logging;

pub use logging::{init_logging, init_logging_with, init_logging_with_level, LogConfig, LogFormat, LogLevel, LoggingError};
pub use tracing::{debug, error, info, trace, warn};
