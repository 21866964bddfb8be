use std::path::PathBuf;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{HOME_DIR_NAME, PERSISTENT_WORKSPACE_DIR_NAME, defaults};

/// Timeouts and capture limits for a single execution request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Timeout (ms) used for the auto sentinel when no dependencies are requested.
    #[serde(default = "ExecutionConfig::default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Timeout (ms) used for the auto sentinel when dependencies are requested.
    #[serde(default = "ExecutionConfig::default_dependency_timeout_ms")]
    pub dependency_timeout_ms: u64,
    /// Maximum bytes captured per output stream.
    #[serde(default = "ExecutionConfig::default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: Self::default_timeout_ms(),
            dependency_timeout_ms: Self::default_dependency_timeout_ms(),
            max_output_bytes: Self::default_max_output_bytes(),
        }
    }
}

impl ExecutionConfig {
    const fn default_timeout_ms() -> u64 {
        defaults::DEFAULT_TIMEOUT_MS
    }

    const fn default_dependency_timeout_ms() -> u64 {
        defaults::DEPENDENCY_TIMEOUT_MS
    }

    const fn default_max_output_bytes() -> usize {
        defaults::MAX_OUTPUT_BYTES
    }

    /// Timeout the auto sentinel resolves to.
    pub fn auto_timeout_ms(&self, has_dependencies: bool) -> u64 {
        if has_dependencies {
            self.dependency_timeout_ms
        } else {
            self.default_timeout_ms
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.default_timeout_ms > 0,
            "execution.default_timeout_ms must be greater than zero"
        );
        ensure!(
            self.dependency_timeout_ms > 0,
            "execution.dependency_timeout_ms must be greater than zero"
        );
        ensure!(
            self.max_output_bytes > 0,
            "execution.max_output_bytes must be greater than zero"
        );
        Ok(())
    }
}

/// Guest interpreter selection.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Interpreter program; empty means auto-detect on `PATH`.
    #[serde(default)]
    pub program: String,
}

impl InterpreterConfig {
    pub fn program(&self) -> Option<&str> {
        let trimmed = self.program.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Location of the persistent workspace.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Persistent workspace directory; empty means `~/.codebox/workspace`.
    #[serde(default)]
    pub persistent_dir: String,
}

impl WorkspaceConfig {
    /// Resolve the persistent workspace directory, expanding a leading `~`.
    pub fn persistent_dir(&self) -> PathBuf {
        let configured = self.persistent_dir.trim();
        if !configured.is_empty() {
            if let Some(rest) = home_relative(configured)
                && let Some(home) = dirs::home_dir()
            {
                return home.join(rest);
            }
            return PathBuf::from(configured);
        }

        dirs::home_dir()
            .map(|home| home.join(HOME_DIR_NAME).join(PERSISTENT_WORKSPACE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(HOME_DIR_NAME).join(PERSISTENT_WORKSPACE_DIR_NAME))
    }
}

/// Remainder of a bare `~` or `~/...` path. `~user/...` is left alone.
fn home_relative(path: &str) -> Option<&str> {
    let rest = path.strip_prefix('~')?;
    if rest.is_empty() {
        return Some(rest);
    }
    let is_separator = |c: char| c == '/' || (cfg!(windows) && c == '\\');
    rest.starts_with(is_separator)
        .then(|| rest.trim_start_matches(is_separator))
}

/// Dependency installer settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstallerConfig {
    /// Installer output lines kept when no summary line is recognized.
    #[serde(default = "InstallerConfig::default_summary_fallback_lines")]
    pub summary_fallback_lines: usize,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            summary_fallback_lines: Self::default_summary_fallback_lines(),
        }
    }
}

impl InstallerConfig {
    const fn default_summary_fallback_lines() -> usize {
        defaults::SUMMARY_FALLBACK_LINES
    }
}
