//! Subprocess plumbing for codebox.
//!
//! - [`runner`] spawns a program, captures both output streams until they
//!   close, and enforces a deadline with a graceful-then-forceful
//!   termination sequence.
//! - [`env`] builds the whitelisted environment handed to every child.
//! - [`process_group`] holds the OS-specific signalling helpers.

pub mod env;
pub mod error;
pub mod process_group;
pub mod runner;

pub use env::{DEPENDENCY_PATH_VAR, build_minimal_env, host_minimal_env, is_whitelisted};
pub use error::ProcessError;
pub use process_group::KillSignal;
pub use runner::{ExitState, GRACE_PERIOD, ProcessOutcome, ProcessRunner, ProcessSpec, RunPhase};
