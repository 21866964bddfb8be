use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use codebox_core::{ReturnFormat, TimeoutSetting, WorkspaceMode};

#[derive(Debug, Parser)]
#[command(name = "codebox")]
#[command(about = "Run code in a confined Python interpreter with bounded time and a scrubbed environment")]
#[command(version)]
pub struct Cli {
    /// Configuration file to use instead of ~/.codebox/codebox.toml and ./codebox.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Interpreter program, overriding [interpreter].program
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub interpreter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute one snippet
    Run(RunArgs),

    /// Read a JSON execution request and write the JSON response
    Request {
        /// Request file; stdin when omitted or "-"
        path: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Source code; "-" or omitted reads stdin
    pub code: Option<String>,

    /// Read source code from a file
    #[arg(long, conflicts_with = "code", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Directory to run in; overrides --workspace
    #[arg(long, value_name = "DIR")]
    pub target_directory: Option<PathBuf>,

    /// Timeout in milliseconds, or "auto"
    #[arg(long, default_value = "auto", value_parser = parse_timeout)]
    pub timeout_ms: TimeoutSetting,

    /// Package specifier to install before running (repeatable)
    #[arg(long = "install", value_name = "SPEC")]
    pub install: Vec<String>,

    /// temp, persistent, or a directory path
    #[arg(long, default_value = "temp")]
    pub workspace: String,

    /// Response verbosity
    #[arg(long, value_enum, default_value_t = FormatArg::Simple)]
    pub format: FormatArg,

    /// Print the JSON response instead of plain text
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn workspace_mode(&self) -> WorkspaceMode {
        WorkspaceMode::parse(&self.workspace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Simple,
    Detailed,
}

impl From<FormatArg> for ReturnFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Simple => Self::Simple,
            FormatArg::Detailed => Self::Detailed,
        }
    }
}

fn parse_timeout(value: &str) -> Result<TimeoutSetting, String> {
    match TimeoutSetting::parse(value) {
        Some(TimeoutSetting::Millis(0)) | None => Err(format!(
            "expected a positive number of milliseconds or \"auto\", got \"{value}\""
        )),
        Some(setting) => Ok(setting),
    }
}
