//! Browser-widget integrations for the analytics dispatcher: the Curebit
//! affiliate widget driven through its page-global command queue.
//!
//! # Modules
//!
//! - [`adaptors`]: The [`Integration`] trait and the Curebit integration
//! - [`commands`]: Provider command tuples and their payloads
//! - [`translator`]: Pure mapping from identify/track calls to commands
//! - [`env`]: Page-global access (command queues, namespace probes)
//! - [`loader`]: Fire-and-forget provider script loading
//! - [`user`]: The host's current user, for purchase attribution

pub mod adaptors;
pub mod commands;
pub mod env;
pub mod loader;
pub mod translator;
pub mod user;

pub use adaptors::curebit::CurebitIntegration;
pub use adaptors::{Integration, Properties};
pub use commands::Command;
pub use env::{CommandLog, Environment, MemoryEnvironment, MemoryQueue};
pub use loader::{RecordingLoader, ScriptLoader, TaskLoader};
pub use user::{IdentifiedUser, UserSource};
