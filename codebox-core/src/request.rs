//! Execution request model.

use std::fmt;
use std::path::PathBuf;

use codebox_config::ExecutionConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ExecError, ExecResult};
use crate::specifier::validate_package_spec;

const AUTO_SENTINEL: &str = "auto";

/// Timeout of a request: explicit milliseconds or derived from whether
/// dependencies are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutSetting {
    #[default]
    Auto,
    Millis(u64),
}

impl TimeoutSetting {
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(AUTO_SENTINEL) {
            return Some(Self::Auto);
        }
        trimmed.parse().ok().map(Self::Millis)
    }
}

impl fmt::Display for TimeoutSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(AUTO_SENTINEL),
            Self::Millis(ms) => write!(f, "{ms}"),
        }
    }
}

impl Serialize for TimeoutSetting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str(AUTO_SENTINEL),
            Self::Millis(ms) => serializer.serialize_u64(*ms),
        }
    }
}

impl<'de> Deserialize<'de> for TimeoutSetting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(ms) => Ok(Self::Millis(ms)),
            Raw::Text(text) => Self::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "expected a positive integer or \"{AUTO_SENTINEL}\", got \"{text}\""
                ))
            }),
        }
    }
}

/// Which directory becomes the guest's working directory by default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WorkspaceMode {
    /// The per-request scratch directory.
    #[default]
    Ephemeral,
    /// The long-lived directory under the user's home.
    Persistent,
    Custom(PathBuf),
}

impl WorkspaceMode {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "temp" | "ephemeral" => Self::Ephemeral,
            "persistent" => Self::Persistent,
            other => Self::Custom(PathBuf::from(other)),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Ephemeral => "temp".to_string(),
            Self::Persistent => "persistent".to_string(),
            Self::Custom(path) => path.display().to_string(),
        }
    }
}

impl Serialize for WorkspaceMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for WorkspaceMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnFormat {
    #[default]
    Simple,
    Detailed,
}

/// One unit of work submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<PathBuf>,
    #[serde(default)]
    pub timeout_ms: TimeoutSetting,
    #[serde(default)]
    pub install_packages: Vec<String>,
    #[serde(default)]
    pub workspace: WorkspaceMode,
    #[serde(default)]
    pub return_format: ReturnFormat,
}

impl ExecutionRequest {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: TimeoutSetting) -> Self {
        self.timeout_ms = timeout;
        self
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workspace(mut self, workspace: WorkspaceMode) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_target_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_directory = Some(dir.into());
        self
    }

    pub fn with_return_format(mut self, format: ReturnFormat) -> Self {
        self.return_format = format;
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.install_packages.is_empty()
    }

    /// Explicit milliseconds always win over the auto sentinel.
    pub fn effective_timeout_ms(&self, config: &ExecutionConfig) -> u64 {
        match self.timeout_ms {
            TimeoutSetting::Millis(ms) => ms,
            TimeoutSetting::Auto => config.auto_timeout_ms(self.has_dependencies()),
        }
    }

    /// Reject malformed requests before any directory or process exists.
    pub fn validate(&self) -> ExecResult<()> {
        if self.code.trim().is_empty() {
            return Err(ExecError::validation("code", "code must not be empty"));
        }
        if self.timeout_ms == TimeoutSetting::Millis(0) {
            return Err(ExecError::validation(
                "timeout_ms",
                "timeout must be a positive integer or \"auto\"",
            ));
        }
        if let Some(target) = &self.target_directory
            && target.as_os_str().is_empty()
        {
            return Err(ExecError::validation(
                "target_directory",
                "target directory must not be empty",
            ));
        }
        if let WorkspaceMode::Custom(path) = &self.workspace
            && path.as_os_str().is_empty()
        {
            return Err(ExecError::validation(
                "workspace",
                "workspace must be \"temp\", \"persistent\" or a path",
            ));
        }
        for spec in &self.install_packages {
            validate_package_spec(spec)
                .map_err(|error| ExecError::validation("install_packages", error.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_to_minimal_json() {
        let request: ExecutionRequest = serde_json::from_str(r#"{"code": "print(1)"}"#).unwrap();
        assert_eq!(request.timeout_ms, TimeoutSetting::Auto);
        assert_eq!(request.workspace, WorkspaceMode::Ephemeral);
        assert_eq!(request.return_format, ReturnFormat::Simple);
        assert!(request.install_packages.is_empty());
        assert!(request.target_directory.is_none());
    }

    #[test]
    fn timeout_accepts_number_or_sentinel() {
        let numeric: ExecutionRequest =
            serde_json::from_str(r#"{"code": "x", "timeout_ms": 2000}"#).unwrap();
        assert_eq!(numeric.timeout_ms, TimeoutSetting::Millis(2000));

        let auto: ExecutionRequest =
            serde_json::from_str(r#"{"code": "x", "timeout_ms": "auto"}"#).unwrap();
        assert_eq!(auto.timeout_ms, TimeoutSetting::Auto);

        assert!(
            serde_json::from_str::<ExecutionRequest>(r#"{"code": "x", "timeout_ms": "soon"}"#)
                .is_err()
        );
    }

    #[test]
    fn workspace_modes_parse() {
        assert_eq!(WorkspaceMode::parse("temp"), WorkspaceMode::Ephemeral);
        assert_eq!(WorkspaceMode::parse("persistent"), WorkspaceMode::Persistent);
        assert_eq!(
            WorkspaceMode::parse("jobs/one"),
            WorkspaceMode::Custom(PathBuf::from("jobs/one"))
        );
    }

    #[test]
    fn auto_timeout_tracks_dependencies() {
        let config = ExecutionConfig::default();
        let plain = ExecutionRequest::new("print(1)");
        assert_eq!(plain.effective_timeout_ms(&config), 30_000);

        let with_deps = plain.clone().with_packages(["requests"]);
        assert_eq!(with_deps.effective_timeout_ms(&config), 120_000);
    }

    #[test]
    fn explicit_timeout_overrides_sentinel_even_with_dependencies() {
        let config = ExecutionConfig::default();
        let request = ExecutionRequest::new("print(1)")
            .with_packages(["requests"])
            .with_timeout(TimeoutSetting::Millis(1500));
        assert_eq!(request.effective_timeout_ms(&config), 1500);
    }

    #[test]
    fn validation_names_offending_field() {
        let empty = ExecutionRequest::new("   ").validate().unwrap_err();
        assert!(matches!(empty, ExecError::Validation { field: "code", .. }));

        let zero = ExecutionRequest::new("x")
            .with_timeout(TimeoutSetting::Millis(0))
            .validate()
            .unwrap_err();
        assert!(matches!(zero, ExecError::Validation { field: "timeout_ms", .. }));

        let package = ExecutionRequest::new("x")
            .with_packages(["--index-url=http://evil"])
            .validate()
            .unwrap_err();
        assert!(matches!(package, ExecError::Validation { field: "install_packages", .. }));
        assert!(package.to_string().contains("--index-url"));
    }
}
