use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource};
use crate::loader::manager::ConfigManager;

/// Builder for creating a [`ConfigManager`] with runtime overrides.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    workspace: Option<PathBuf>,
    config_file: Option<PathBuf>,
    cli_overrides: Vec<(String, toml::Value)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory searched for `codebox.toml`.
    pub fn workspace(mut self, path: PathBuf) -> Self {
        self.workspace = Some(path);
        self
    }

    /// Use a specific configuration file instead of the default layers.
    pub fn config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    /// Add a runtime override (e.g., "execution.default_timeout_ms", 5000).
    pub fn cli_override(mut self, key: impl Into<String>, value: toml::Value) -> Self {
        self.cli_overrides.push((key.into(), value));
        self
    }

    pub fn build(self) -> Result<ConfigManager> {
        let mut manager = match (self.config_file, self.workspace) {
            (Some(config_file), _) => ConfigManager::load_from_file(config_file)?,
            (None, Some(workspace)) => ConfigManager::load_from_workspace(workspace)?,
            (None, None) => ConfigManager::load()?,
        };

        if !self.cli_overrides.is_empty() {
            let mut runtime_toml = toml::Table::new();
            for (key, value) in self.cli_overrides {
                insert_dotted_key(&mut runtime_toml, &key, value);
            }

            manager.layer_stack.push(ConfigLayerEntry::new(
                ConfigLayerSource::Runtime,
                toml::Value::Table(runtime_toml),
            ));

            manager.config = manager
                .layer_stack
                .effective_config()
                .try_into()
                .context("Failed to deserialize effective configuration after runtime overrides")?;
            manager
                .config
                .validate()
                .context("Configuration failed validation after runtime overrides")?;
        }

        Ok(manager)
    }
}

fn insert_dotted_key(table: &mut toml::Table, key: &str, value: toml::Value) {
    let mut parts = key.split('.').peekable();
    let mut current = table;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }

        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        let toml::Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
}
