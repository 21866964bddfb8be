use crate::loader::merge_toml_values;
use std::path::PathBuf;
use toml::Value as TomlValue;

/// Source of a configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User configuration (`~/.codebox/codebox.toml`)
    User { file: PathBuf },
    /// Configuration in the invocation directory (`./codebox.toml`)
    Workspace { file: PathBuf },
    /// File named by `CODEBOX_CONFIG_PATH` or `--config`
    Explicit { file: PathBuf },
    /// Runtime overrides (CLI flags)
    Runtime,
}

impl ConfigLayerSource {
    pub fn file(&self) -> Option<&PathBuf> {
        match self {
            Self::User { file } | Self::Workspace { file } | Self::Explicit { file } => Some(file),
            Self::Runtime => None,
        }
    }
}

/// A single layer of configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayerEntry {
    pub source: ConfigLayerSource,
    pub config: TomlValue,
}

impl ConfigLayerEntry {
    pub fn new(source: ConfigLayerSource, config: TomlValue) -> Self {
        Self { source, config }
    }
}

/// A stack of configuration layers, ordered from lowest to highest precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayerStack {
    layers: Vec<ConfigLayerEntry>,
}

impl ConfigLayerStack {
    pub fn push(&mut self, layer: ConfigLayerEntry) {
        self.layers.push(layer);
    }

    /// Merge all layers into a single effective configuration.
    pub fn effective_config(&self) -> TomlValue {
        let mut merged = TomlValue::Table(toml::Table::new());
        for layer in &self.layers {
            merge_toml_values(&mut merged, &layer.config);
        }
        merged
    }

    pub fn layers(&self) -> &[ConfigLayerEntry] {
        &self.layers
    }
}
