//! Response shaping for guest outcomes and engine errors.

use std::path::PathBuf;

use codebox_commons::file_uri;
use codebox_process::{ExitState, ProcessOutcome};
use serde::{Deserialize, Serialize};

use crate::error::{DependencyError, ExecError};
use crate::request::ReturnFormat;

const NO_OUTPUT: &str = "(no output)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Final answer for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub success: bool,
    pub content: Vec<ContentBlock>,
}

impl ExecutionResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            success: false,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Every text block joined by blank lines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn from_error(error: &ExecError) -> Self {
        let text = match error {
            ExecError::Validation { .. } => format!("Invalid request: {error}"),
            ExecError::Workspace(inner) => format!("Workspace error: {inner}"),
            ExecError::Dependency(DependencyError::InvalidSpecifier { .. }) => {
                format!("Dependency rejected: {error}")
            }
            ExecError::Dependency(inner) => format!("Dependency installation error: {inner}"),
            ExecError::Confinement { .. } => format!("Confinement error: {error}"),
            ExecError::Spawn { program, message } => {
                format!("Failed to start interpreter `{program}`: {message}")
            }
            ExecError::Io { .. } => format!("Execution error: {error}"),
        };
        Self::failure(text)
    }
}

/// Facts about the run that detailed responses report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDetails {
    pub working_dir: PathBuf,
    pub timeout_ms: u64,
    pub packages: Vec<String>,
}

/// Turn a finished guest process into a response.
pub fn format_outcome(
    outcome: &ProcessOutcome,
    format: ReturnFormat,
    details: &RunDetails,
) -> ExecutionResponse {
    let stdout = outcome.stdout_lossy();
    let stderr = outcome.stderr_lossy();

    if outcome.timed_out {
        let mut text = format!("Execution timed out after {} ms.", details.timeout_ms);
        push_section(&mut text, "Partial output", &stdout);
        push_section(&mut text, "Partial standard error", &stderr);
        return ExecutionResponse::failure(text);
    }

    if !outcome.success() {
        let mut text = match outcome.exit {
            ExitState::Code(code) => format!("Execution failed with exit code {code}."),
            ExitState::Signal(signal) => format!("Execution was terminated by signal {signal}."),
            ExitState::Unknown => "Execution failed with an unknown exit status.".to_string(),
        };
        push_section(&mut text, "Standard error", &stderr);
        push_section(&mut text, "Standard output", &stdout);
        return ExecutionResponse::failure(text);
    }

    let mut text = if stdout.trim().is_empty() {
        NO_OUTPUT.to_string()
    } else {
        stdout.trim_end().to_string()
    };
    push_section(&mut text, "Warnings", &stderr);

    let mut response = ExecutionResponse::success(text);
    if format == ReturnFormat::Detailed {
        response.content.push(ContentBlock::text(trailer(details)));
    }
    response
}

fn push_section(text: &mut String, title: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    text.push_str("\n\n");
    text.push_str(title);
    text.push_str(":\n");
    text.push_str(body.trim_end());
}

fn trailer(details: &RunDetails) -> String {
    let mut lines = vec![
        format!("Working directory: {}", file_uri(&details.working_dir)),
        format!("Timeout: {} ms", details.timeout_ms),
    ];
    if !details.packages.is_empty() {
        lines.push(format!("Installed packages: {}", details.packages.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codebox_process::RunPhase;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn outcome(stdout: &str, stderr: &str, exit: ExitState, timed_out: bool) -> ProcessOutcome {
        ProcessOutcome {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            exit,
            timed_out,
            phase: if timed_out {
                RunPhase::TimedOut
            } else {
                RunPhase::Completed
            },
            duration: Duration::from_millis(5),
        }
    }

    fn details() -> RunDetails {
        RunDetails {
            working_dir: PathBuf::from(if cfg!(windows) { r"C:\work\dir" } else { "/work/dir" }),
            timeout_ms: 2000,
            packages: vec!["requests".to_string(), "numpy".to_string()],
        }
    }

    #[test]
    fn simple_success_appends_warnings() {
        let response = format_outcome(
            &outcome("4\n", "DeprecationWarning: old\n", ExitState::Code(0), false),
            ReturnFormat::Simple,
            &details(),
        );
        assert!(response.success);
        assert_eq!(response.text(), "4\n\nWarnings:\nDeprecationWarning: old");
        assert_eq!(response.content.len(), 1);
    }

    #[test]
    fn detailed_success_adds_trailer() {
        let response = format_outcome(
            &outcome("ok\n", "", ExitState::Code(0), false),
            ReturnFormat::Detailed,
            &details(),
        );
        let trailer = response.content[1].as_text();
        assert!(trailer.contains("Working directory: file:///"));
        assert!(trailer.contains("/work/dir"));
        assert!(!trailer.contains('\\'));
        assert!(trailer.contains("Timeout: 2000 ms"));
        assert!(trailer.ends_with("Installed packages: requests, numpy"));
    }

    #[test]
    fn detailed_trailer_omits_empty_package_list() {
        let mut details = details();
        details.packages.clear();
        let response = format_outcome(
            &outcome("ok", "", ExitState::Code(0), false),
            ReturnFormat::Detailed,
            &details,
        );
        assert!(!response.text().contains("Installed packages"));
    }

    #[test]
    fn timeout_names_the_bound_and_keeps_partial_output() {
        let response = format_outcome(
            &outcome("before\n", "", ExitState::Signal(15), true),
            ReturnFormat::Detailed,
            &details(),
        );
        assert!(!response.success);
        assert_eq!(
            response.text(),
            "Execution timed out after 2000 ms.\n\nPartial output:\nbefore"
        );
    }

    #[test]
    fn non_zero_exit_reports_code_and_both_streams() {
        let response = format_outcome(
            &outcome("partial\n", "Traceback ...\nValueError: boom\n", ExitState::Code(1), false),
            ReturnFormat::Simple,
            &details(),
        );
        assert!(!response.success);
        let text = response.text();
        assert!(text.starts_with("Execution failed with exit code 1."));
        assert!(text.contains("Standard error:\nTraceback ...\nValueError: boom"));
        assert!(text.contains("Standard output:\npartial"));
    }

    #[test]
    fn spawn_failure_is_distinct_from_exit_failure() {
        let response = ExecutionResponse::from_error(&ExecError::Spawn {
            program: "python3".to_string(),
            message: "No such file or directory".to_string(),
        });
        assert!(!response.success);
        assert!(response.text().starts_with("Failed to start interpreter `python3`"));
    }

    #[test]
    fn response_serializes_as_text_blocks() {
        let json = serde_json::to_value(ExecutionResponse::success("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "content": [{"type": "text", "text": "hi"}]})
        );
    }
}
