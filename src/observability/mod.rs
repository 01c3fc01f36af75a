//! Observability: structured logging setup for the bridge process.

pub mod logging;

pub use logging::{init_default_logging, init_logging, parse_level, LogFormat};
