//! # codebox-core
//!
//! The sandboxed execution engine. A request flows through:
//!
//! 1. [`ExecutionRequest::validate`] rejects malformed input before any
//!    directory or process exists.
//! 2. [`WorkspaceResolver`] picks the working directory (scratch,
//!    persistent, or a caller path) next to a per-request [`ScratchDir`].
//! 3. [`DependencyInstaller`] re-validates specifiers and installs them
//!    into an isolated directory under scratch.
//! 4. [`shim::render`] wraps the caller's code in a confinement preamble
//!    built from the [`ConfinementPolicy`].
//! 5. The guest interpreter runs under
//!    [`ProcessRunner`](codebox_process::ProcessRunner) with a scrubbed
//!    environment and a graduated timeout.
//! 6. [`format_outcome`] shapes the [`ExecutionResponse`]; scratch is
//!    removed on every path.
//!
//! Confinement happens inside the guest interpreter. It is defense in
//! depth rather than an OS sandbox: there is no namespace, cgroup or
//! seccomp isolation.

pub mod error;
pub mod executor;
pub mod formatter;
pub mod installer;
pub mod interpreter;
pub mod policy;
pub mod request;
pub mod shim;
pub mod specifier;
pub mod workspace;

pub use error::{DependencyError, ExecError, ExecResult, WorkspaceError};
pub use executor::Executor;
pub use formatter::{ContentBlock, ExecutionResponse, RunDetails, format_outcome};
pub use installer::{DependencyInstaller, InstallReport};
pub use interpreter::Interpreter;
pub use policy::ConfinementPolicy;
pub use request::{ExecutionRequest, ReturnFormat, TimeoutSetting, WorkspaceMode};
pub use shim::{GUEST_FILENAME, SHIM_VERSION};
pub use specifier::{package_name, validate_package_spec};
pub use workspace::{ScratchDir, WorkspaceResolver};
