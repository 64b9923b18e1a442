//! Commonly used telemetry types.
//!
//! ```rust,no_run
//! use berth_telemetry::prelude::*;
//!
//! # fn main() -> TelemetryResult<()> {
//! setup_logging(&LogConfig::new("debug").with_format(LogFormat::Compact))?;
//! tracing::info!(plugin = "compose", "starting");
//! # Ok(())
//! # }
//! ```

pub use crate::{
    FileRotation, LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult, setup_logging,
};
