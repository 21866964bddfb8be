use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::constants::{CONFIG_FILE_NAME, CONFIG_PATH_ENV, HOME_DIR_NAME};
use crate::loader::config::CodeboxConfig;
use crate::loader::layers::{ConfigLayerEntry, ConfigLayerSource, ConfigLayerStack};

/// Configuration manager for loading and validating configurations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub(crate) config: CodeboxConfig,
    config_path: Option<PathBuf>,
    pub(crate) layer_stack: ConfigLayerStack,
}

impl ConfigManager {
    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
            let trimmed = config_path.trim();
            if !trimmed.is_empty() {
                return Self::load_from_file(trimmed).with_context(|| {
                    format!("Failed to load configuration from {CONFIG_PATH_ENV}={trimmed}")
                });
            }
        }

        let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
        Self::load_from_workspace(cwd)
    }

    /// Load the user layer plus the `codebox.toml` found in `workspace`.
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        Self::load_layers(Self::user_config_path(), workspace.as_ref())
    }

    pub(crate) fn load_layers(user_config: Option<PathBuf>, workspace: &Path) -> Result<Self> {
        let mut layer_stack = ConfigLayerStack::default();

        // 1. User home config (~/.codebox/codebox.toml)
        if let Some(user_config) = user_config {
            Self::push_optional_layer(
                &mut layer_stack,
                ConfigLayerSource::User {
                    file: user_config.clone(),
                },
                &user_config,
            );
        }

        // 2. Workspace config (codebox.toml in the invocation directory)
        let workspace_config = workspace.join(CONFIG_FILE_NAME);
        Self::push_optional_layer(
            &mut layer_stack,
            ConfigLayerSource::Workspace {
                file: workspace_config.clone(),
            },
            &workspace_config,
        );

        Self::from_stack(layer_stack)
    }

    /// Load configuration from a specific file, ignoring the default layers.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let toml = Self::load_toml_from_file(path)?;

        let mut layer_stack = ConfigLayerStack::default();
        layer_stack.push(ConfigLayerEntry::new(
            ConfigLayerSource::Explicit {
                file: path.to_path_buf(),
            },
            toml,
        ));

        Self::from_stack(layer_stack)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    fn push_optional_layer(stack: &mut ConfigLayerStack, source: ConfigLayerSource, path: &Path) {
        if !path.exists() {
            return;
        }
        match Self::load_toml_from_file(path) {
            Ok(toml) => {
                debug!(path = %path.display(), "loaded configuration layer");
                stack.push(ConfigLayerEntry::new(source, toml));
            }
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "skipping unreadable configuration layer");
            }
        }
    }

    pub(crate) fn from_stack(layer_stack: ConfigLayerStack) -> Result<Self> {
        let config: CodeboxConfig = if layer_stack.layers().is_empty() {
            CodeboxConfig::default()
        } else {
            layer_stack
                .effective_config()
                .try_into()
                .context("Failed to deserialize effective configuration")?
        };

        config
            .validate()
            .context("Configuration failed validation")?;

        let config_path = layer_stack
            .layers()
            .iter()
            .rev()
            .find_map(|layer| layer.source.file().cloned());

        Ok(Self {
            config,
            config_path,
            layer_stack,
        })
    }

    fn load_toml_from_file(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(value)
    }

    /// Location of the user-level configuration file, if a home directory exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HOME_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &CodeboxConfig {
        &self.config
    }

    /// Highest-precedence file that contributed to the configuration
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn layer_stack(&self) -> &ConfigLayerStack {
        &self.layer_stack
    }

    pub fn into_config(self) -> CodeboxConfig {
        self.config
    }
}
