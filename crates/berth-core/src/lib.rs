//! Capability contracts and shared context for the Berth orchestrator.
//!
//! Every plugin that Berth can drive implements [`Pluggable`] and declares
//! zero or more of the category capabilities:
//!
//! - [`Syncable`]: continuous file synchronization (long-running)
//! - [`Runnable`]: brings up and supervises an environment (long-running)
//! - [`Buildable`]: one-shot image build and publish
//! - [`Shellable`]: interactive sessions into a running environment
//!
//! Capability membership is queried through typed accessors on
//! [`Pluggable`] (`as_syncable`, `as_runnable`, ...), never by downcasting.
//!
//! Plugins receive a shared, read-only [`PluginContext`] carrying the
//! project name, its resource-safe form, and a [`Ui`] handle for
//! human-facing output.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builder;
pub mod capability;
pub mod context;
pub mod error;
pub mod name;
pub mod prelude;
pub mod shell;
pub mod ui;

pub use builder::BuilderConfig;
pub use capability::{
    Buildable, CapabilitySet, Category, Pluggable, Runnable, Shellable, Syncable,
};
pub use context::{PluginContext, safe_project_name};
pub use error::{PluginError, PluginResult};
pub use name::PluginName;
pub use shell::{DEFAULT_SHELL_SERVICE, ShellConfig};
pub use ui::{ArcUi, NullUi, Ui};

/// Re-exported so plugin crates share the exact token type the runtime hands out.
pub use tokio_util::sync::CancellationToken;
