//! Shared test doubles for Berth.
//!
//! Add as a dev-dependency and build scenarios from scripted plugins:
//!
//! ```rust,ignore
//! use berth_test::{Behavior, ScriptedPlugin, RecordingUi, scripted_registry};
//!
//! let a = ScriptedPlugin::new("a").syncable().with_behavior(Behavior::fail("boom"));
//! let b = ScriptedPlugin::new("b").runnable();
//! let registry = scripted_registry([a.clone(), b.clone()]);
//! // ... run an orchestrator, then:
//! assert_eq!(a.stats().teardowns(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
