use std::io;
use std::path::PathBuf;

use codebox_process::ProcessError;
use thiserror::Error;

/// Directory creation and verification failures of the workspace resolver.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(
        "permission denied for workspace `{}`; check that the current user can create and write to this directory",
        path.display()
    )]
    PermissionDenied { path: PathBuf },

    #[error(
        "no space left to create workspace `{}`; free disk space or choose another location",
        path.display()
    )]
    DiskFull { path: PathBuf },

    #[error(
        "workspace `{}` exists but is not a directory; remove the file or choose another path",
        path.display()
    )]
    NotADirectory { path: PathBuf },

    #[error(
        "workspace `{}` resolves outside of `{}`; relative paths must stay inside the invocation directory",
        requested.display(),
        base.display()
    )]
    EscapesBase { requested: PathBuf, base: PathBuf },

    #[error(
        "target directory `{}` does not exist; create it first or omit target_directory",
        path.display()
    )]
    NotFound { path: PathBuf },

    #[error("failed to prepare workspace `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WorkspaceError {
    /// Map an I/O failure on `path` to the most specific variant.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied { path }
            }
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => Self::DiskFull { path },
            io::ErrorKind::NotADirectory | io::ErrorKind::AlreadyExists => {
                Self::NotADirectory { path }
            }
            _ => Self::Io { path, source },
        }
    }
}

/// Failures of the dependency installer. Every variant aborts the batch.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("invalid package specifier `{spec}`: {reason}")]
    InvalidSpecifier { spec: String, reason: String },

    #[error("package installation failed ({exit}):\n{summary}")]
    InstallFailed { exit: String, summary: String },

    #[error("package installation timed out after {timeout_ms} ms:\n{summary}")]
    InstallTimedOut { timeout_ms: u64, summary: String },

    #[error("no Python interpreter found on PATH; packages cannot be installed")]
    InterpreterMissing,
}

/// Errors that stop a request before a guest outcome exists.
///
/// A non-zero guest exit or a guest timeout is not an `ExecError`; those
/// are reported as failed responses by the formatter.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("`{}` lies outside the confinement roots", path.display())]
    Confinement { path: PathBuf },

    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<ProcessError> for ExecError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::EmptyProgram => Self::Spawn {
                program: String::new(),
                message: "program cannot be empty".to_string(),
            },
            ProcessError::SpawnFailed { program, source } => Self::Spawn {
                program,
                message: source.to_string(),
            },
            ProcessError::Io { program, source } => Self::Io {
                context: format!("supervising `{program}`"),
                source,
            },
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
