//! Commonly used runtime types.
//!
//! ```rust,ignore
//! use berth_runtime::prelude::*;
//! ```

pub use crate::{
    LifecycleState, Orchestrator, OrchestratorConfig, RunReport, RuntimeError, RuntimeResult,
    ShutdownTrigger, TeardownReport,
};
