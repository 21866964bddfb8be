use std::io;

use thiserror::Error;

/// Failures that prevent a [`ProcessOutcome`](crate::ProcessOutcome) from
/// being produced at all. A non-zero exit or a timeout is not an error.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("program cannot be empty")]
    EmptyProgram,

    #[error("failed to start `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o error while supervising `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// True when the child never started (interpreter missing, permission denied).
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::SpawnFailed { .. } | Self::EmptyProgram)
    }
}
