//! Configuration for the codebox execution engine.
//!
//! Settings are read from layered TOML files (user, workspace, explicit
//! path, runtime overrides) and deserialized into [`CodeboxConfig`]. Every
//! field has a default, so an empty or missing file yields a working
//! configuration.

pub mod constants;
pub mod debug;
pub mod execution;
pub mod loader;

pub use debug::{DebugConfig, TraceLevel};
pub use execution::{ExecutionConfig, InstallerConfig, InterpreterConfig, WorkspaceConfig};
pub use loader::{CodeboxConfig, ConfigBuilder, ConfigManager, merge_toml_values};
