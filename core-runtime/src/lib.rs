//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog core:
//! - Logging and tracing infrastructure
//! - Configuration management (builder and environment loading)
//!
//! ## Overview
//!
//! Other crates depend on this one for their logging conventions and for the
//! validated [`CoreConfig`](config::CoreConfig) they are bootstrapped from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::CoreConfig;
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
