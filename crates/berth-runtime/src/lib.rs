//! Plugin orchestration runtime for Berth.
//!
//! The [`Orchestrator`] turns a manifest into configured plugin instances
//! and drives them. A run starts every sync and run plugin concurrently,
//! each with a child [`CancellationToken`](berth_core::CancellationToken),
//! and waits for whichever comes first:
//!
//! - a plugin task returning an error
//! - the shutdown future (Ctrl-C or SIGTERM for [`Orchestrator::run`])
//!
//! Either way every started plugin is then torn down exactly once,
//! concurrently, and the run returns a [`RunReport`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use berth_core::NullUi;
//! use berth_plugins::{PluginRegistry, register_builtin};
//! use berth_runtime::{Orchestrator, OrchestratorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = PluginRegistry::new();
//! register_builtin(&mut registry)?;
//!
//! let mut orchestrator =
//!     Orchestrator::new(OrchestratorConfig::new("berth.yml"), registry, Arc::new(NullUi));
//! orchestrator.load_plugins()?;
//! let report = orchestrator.run().await?;
//! println!("torn down: {}", report.teardown.total());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod orchestrator;
mod report;
mod signal;
mod state;
mod supervisor;
mod teardown;

pub use error::{RuntimeError, RuntimeResult};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use report::{
    PluginFailure, RunReport, ShutdownTrigger, TeardownError, TeardownFailure, TeardownReport,
};
pub use signal::shutdown_signal;
pub use state::LifecycleState;
