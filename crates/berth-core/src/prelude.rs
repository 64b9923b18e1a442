//! Prelude module - commonly used types for convenient import.
//!
//! Plugin crates typically start with `use berth_core::prelude::*;`.

// Errors
pub use crate::{PluginError, PluginResult};

// Capability contracts
pub use crate::{
    Buildable, CapabilitySet, Category, Pluggable, Runnable, Shellable, Syncable,
};

// Shared context and parameters
pub use crate::{ArcUi, BuilderConfig, NullUi, PluginContext, PluginName, ShellConfig, Ui};

// Cancellation
pub use crate::CancellationToken;
