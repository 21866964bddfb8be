use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::debug::DebugConfig;
use crate::execution::{ExecutionConfig, InstallerConfig, InterpreterConfig, WorkspaceConfig};

/// Effective codebox configuration after all layers are merged.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CodeboxConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub installer: InstallerConfig,

    #[serde(default)]
    pub debug: DebugConfig,
}

impl CodeboxConfig {
    pub fn validate(&self) -> Result<()> {
        self.execution
            .validate()
            .context("Invalid [execution] configuration")?;
        Ok(())
    }

    /// Render the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
