//! # Vcomm Core Library
//!
//! A virtual null modem manager: drives an external multiplexer process
//! (socat) that keeps two pseudo-terminal endpoints cross-wired, so any
//! two serial programs can talk to each other without hardware.
//!
//! ## Features
//!
//! - Link session lifecycle (spawn, device wait, liveness probe, teardown)
//! - Loopback smoke test over the created pair
//! - Traffic capture of the relayed byte stream
//! - Injected log sinks (tracing for the console, channel for the GUI)
//! - CLI with exit codes for automation
//!
//! ## Example
//!
//! ```rust,no_run
//! use vcomm_core::{LinkConfig, LinkManager};
//!
//! fn main() {
//!     let mut link = LinkManager::new(LinkConfig::new("/tmp/ttyV0", "/tmp/ttyV1"));
//!     if link.start().is_ok() {
//!         assert!(link.is_active());
//!         link.test_link();
//!         link.stop();
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes};
pub use crate::config::AppConfig;
pub use crate::core::capture::{CaptureConfig, CaptureFormat, CaptureStats};
pub use crate::core::link::{LinkConfig, LinkError, LinkManager, LinkState, LinkStats};
pub use crate::core::sink::{ChannelSink, LogEvent, LogLevel, LogSink, NullSink, TracingSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
