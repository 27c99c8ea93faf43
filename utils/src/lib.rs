//! Shared utilities for the tangle transaction engine.

pub mod logging;

pub use logging::{init_logging, LogError, LogFormat};
