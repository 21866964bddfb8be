//! Dependency installer.
//!
//! Packages go into an isolated `--target` directory inside the request's
//! scratch directory using the interpreter's own `pip`. The batch either
//! installs completely or the request fails.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use codebox_config::InstallerConfig;
use codebox_process::{ProcessRunner, ProcessSpec};
use tracing::{info, warn};

use crate::error::{DependencyError, ExecResult};
use crate::interpreter::Interpreter;
use crate::specifier::{package_name, validate_package_specs};

#[cfg(windows)]
const NULL_DEVICE: &str = "nul";
#[cfg(not(windows))]
const NULL_DEVICE: &str = "/dev/null";

const KEEP_MARKERS: &[&str] = &[
    "successfully installed",
    "requirement already satisfied",
    "warning",
    "error",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Bare names of the requested packages.
    pub packages: Vec<String>,
    pub summary: String,
}

#[derive(Debug)]
pub struct DependencyInstaller<'a> {
    interpreter: &'a Interpreter,
    config: &'a InstallerConfig,
    max_output_bytes: usize,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(
        interpreter: &'a Interpreter,
        config: &'a InstallerConfig,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            interpreter,
            config,
            max_output_bytes,
        }
    }

    /// Install `specs` into `target`.
    ///
    /// `env` is the minimal environment; the dependency search path is never
    /// part of it. Specifiers are re-validated here regardless of what the
    /// caller already checked, and nothing is spawned when one is invalid.
    pub async fn install(
        &self,
        specs: &[String],
        target: &Path,
        env: BTreeMap<String, String>,
        timeout: Duration,
    ) -> ExecResult<InstallReport> {
        if specs.is_empty() {
            return Ok(InstallReport::default());
        }
        validate_package_specs(specs)?;
        if !self.interpreter.found {
            return Err(DependencyError::InterpreterMissing.into());
        }

        let spec = ProcessSpec::new(self.interpreter.program.as_os_str())
            .with_args(install_args(specs, target))
            .with_env(installer_env(env))
            .with_timeout(Some(timeout))
            .with_max_output_bytes(self.max_output_bytes);

        info!(
            packages = ?specs,
            target = %target.display(),
            timeout_ms = timeout.as_millis(),
            "installing dependencies"
        );
        let outcome = ProcessRunner::run(spec).await?;

        let combined = format!("{}\n{}", outcome.stdout_lossy(), outcome.stderr_lossy());
        let summary = summarize(&combined, self.config.summary_fallback_lines);

        if outcome.timed_out {
            warn!(packages = ?specs, "dependency installation timed out");
            return Err(DependencyError::InstallTimedOut {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                summary,
            }
            .into());
        }
        if !outcome.success() {
            warn!(packages = ?specs, exit = %outcome.exit, "dependency installation failed");
            return Err(DependencyError::InstallFailed {
                exit: outcome.exit.to_string(),
                summary,
            }
            .into());
        }

        Ok(InstallReport {
            packages: specs
                .iter()
                .map(|spec| package_name(spec).to_string())
                .collect(),
            summary,
        })
    }
}

fn install_args(specs: &[String], target: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-m", "pip", "install", "--target"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(target.as_os_str().to_os_string());
    args.extend(
        [
            "--no-input",
            "--disable-pip-version-check",
            "--no-warn-script-location",
            "--progress-bar",
            "off",
            "--",
        ]
        .into_iter()
        .map(OsString::from),
    );
    args.extend(specs.iter().map(OsString::from));
    args
}

fn installer_env(mut env: BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.insert("PYTHONNOUSERSITE".to_string(), "1".to_string());
    env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
    env.insert("PIP_CONFIG_FILE".to_string(), NULL_DEVICE.to_string());
    env
}

/// Keep install, already-satisfied, warning and error lines; fall back to
/// the last `fallback_lines` non-empty lines when none match.
pub fn summarize(output: &str, fallback_lines: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();

    let kept: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| {
            let lowered = line.to_ascii_lowercase();
            KEEP_MARKERS.iter().any(|marker| lowered.contains(marker))
        })
        .collect();

    if !kept.is_empty() {
        return kept.join("\n");
    }

    let start = lines.len().saturating_sub(fallback_lines);
    lines.get(start..).unwrap_or_default().join("\n")
}
