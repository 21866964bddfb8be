//! Well-known names and default values.

/// Directory under the user's home that holds codebox state.
pub const HOME_DIR_NAME: &str = ".codebox";

/// Name of the persistent workspace directory inside [`HOME_DIR_NAME`].
pub const PERSISTENT_WORKSPACE_DIR_NAME: &str = "workspace";

/// File name looked up in the home directory and the invocation directory.
pub const CONFIG_FILE_NAME: &str = "codebox.toml";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CODEBOX_CONFIG_PATH";

pub mod defaults {
    /// Auto timeout when no dependencies are requested.
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
    /// Auto timeout when dependencies are requested.
    pub const DEPENDENCY_TIMEOUT_MS: u64 = 120_000;
    /// Per-stream capture cap.
    pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024; // 10 MB
    /// Installer output lines kept when no summary line is recognized.
    pub const SUMMARY_FALLBACK_LINES: usize = 5;
}
