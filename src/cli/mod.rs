//! Command handlers for the `codebox` binary.

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use codebox_config::{CodeboxConfig, ConfigBuilder};

pub mod args;
pub mod config;
pub mod request;
pub mod run;

pub use args::{Cli, Commands, FormatArg, RunArgs};

/// Load the layered configuration, applying global CLI overrides.
pub fn load_config(cli: &Cli) -> Result<CodeboxConfig> {
    let mut builder = ConfigBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.config_file(path.clone());
    }
    if let Some(program) = &cli.interpreter {
        builder = builder.cli_override(
            "interpreter.program",
            toml::Value::String(program.clone()),
        );
    }
    let manager = builder.build().context("Failed to load codebox configuration")?;
    Ok(manager.into_config())
}

/// Read text from `path`, or from stdin when `path` is `None` or `-`.
pub(crate) fn read_input(path: Option<&Path>, what: &str) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {what} from {}", path.display())),
        _ => read_stdin(what),
    }
}

fn read_stdin(what: &str) -> Result<String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("No {what} provided. Pass it as an argument or pipe it via stdin.");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .with_context(|| format!("Failed to read {what} from stdin"))?;
    Ok(buffer)
}
