use std::path::PathBuf;

use codebox_config::InterpreterConfig;
use tracing::debug;

/// Interpreter names tried in order when none is configured.
pub const CANDIDATES: &[&str] = &["python3", "python"];

const FALLBACK_PROGRAM: &str = "python3";

/// Guest interpreter to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub program: PathBuf,
    /// False when nothing was found on `PATH`; spawning will then fail.
    pub found: bool,
}

impl Interpreter {
    /// Configured program if set, otherwise the first candidate on `PATH`.
    pub fn detect(config: &InterpreterConfig) -> Self {
        if let Some(program) = config.program() {
            return match which::which(program) {
                Ok(path) => {
                    debug!(interpreter = %path.display(), "using configured interpreter");
                    Self {
                        program: path,
                        found: true,
                    }
                }
                Err(error) => {
                    debug!(program, %error, "configured interpreter not found on PATH");
                    Self {
                        program: PathBuf::from(program),
                        found: false,
                    }
                }
            };
        }

        for candidate in CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                debug!(interpreter = %path.display(), "detected interpreter");
                return Self {
                    program: path,
                    found: true,
                };
            }
        }

        debug!("no python interpreter found on PATH");
        Self {
            program: PathBuf::from(FALLBACK_PROGRAM),
            found: false,
        }
    }

    pub fn display(&self) -> String {
        self.program.display().to_string()
    }
}
