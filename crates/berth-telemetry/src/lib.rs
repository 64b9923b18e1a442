//! Logging setup for Berth.
//!
//! Every Berth crate logs through `tracing`; this crate installs the global
//! subscriber once, at binary start-up, from a [`LogConfig`].
//!
//! ```rust,no_run
//! use berth_telemetry::{FileRotation, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), berth_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_file_logging("/var/log/berth", FileRotation::Daily)
//!     .with_directive("berth_runtime=debug");
//! setup_logging(&config)?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `config` feature, a [`LogConfig`] can be derived from a loaded
//! manifest's ordinal `loglevel`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{FileRotation, LOG_FILE_PREFIX, LogConfig, LogFormat, LogTarget, setup_logging};
