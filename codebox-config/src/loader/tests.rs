use super::*;

use crate::loader::layers::ConfigLayerSource;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::fs;

#[test]
fn test_layered_config_loading() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    let workspace_root = workspace.path();

    let user_config_path = workspace_root.join("home.toml");
    fs::write(
        &user_config_path,
        "[execution]\ndefault_timeout_ms = 5000\nmax_output_bytes = 2048\n",
    )
    .expect("failed to write user config");

    fs::write(
        workspace_root.join("codebox.toml"),
        "[execution]\ndefault_timeout_ms = 7000\n",
    )
    .expect("failed to write workspace config");

    let manager = ConfigManager::load_layers(Some(user_config_path), workspace_root)
        .expect("failed to load config");

    assert_eq!(manager.config().execution.default_timeout_ms, 7000);
    assert_eq!(manager.config().execution.max_output_bytes, 2048);
    assert_eq!(manager.config().execution.dependency_timeout_ms, 120_000);

    let layers = manager.layer_stack().layers();
    assert_eq!(layers.len(), 2);
    assert!(matches!(layers[0].source, ConfigLayerSource::User { .. }));
    assert!(matches!(layers[1].source, ConfigLayerSource::Workspace { .. }));
    assert_eq!(
        manager.config_path(),
        Some(workspace_root.join("codebox.toml").as_path())
    );
}

#[test]
fn test_missing_layers_yield_defaults() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    let manager =
        ConfigManager::load_layers(None, workspace.path()).expect("failed to load config");
    assert_eq!(manager.config(), &CodeboxConfig::default());
    assert!(manager.config_path().is_none());
}

#[test]
fn test_invalid_values_fail_validation() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    let path = workspace.path().join("bad.toml");
    fs::write(&path, "[execution]\ndefault_timeout_ms = 0\n").expect("failed to write config");

    assert!(ConfigManager::load_from_file(&path).is_err());
}

#[test]
fn test_malformed_workspace_layer_is_skipped() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    fs::write(workspace.path().join("codebox.toml"), "execution = [").expect("write");

    let manager =
        ConfigManager::load_layers(None, workspace.path()).expect("failed to load config");
    assert!(manager.layer_stack().layers().is_empty());
}

#[test]
#[serial]
fn test_config_builder_overrides() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    let config_path = workspace.path().join("explicit.toml");
    fs::write(
        &config_path,
        "[interpreter]\nprogram = \"python3\"\n[execution]\ndefault_timeout_ms = 9000\n",
    )
    .expect("failed to write config");

    let manager = ConfigBuilder::new()
        .config_file(config_path)
        .cli_override(
            "execution.default_timeout_ms",
            toml::Value::Integer(1500),
        )
        .cli_override(
            "workspace.persistent_dir",
            toml::Value::String("/srv/codebox".to_string()),
        )
        .build()
        .expect("failed to build config");

    let config = manager.config();
    assert_eq!(config.execution.default_timeout_ms, 1500);
    assert_eq!(config.interpreter.program(), Some("python3"));
    assert_eq!(config.workspace.persistent_dir, "/srv/codebox");
    assert!(matches!(
        manager.layer_stack().layers().last().map(|layer| &layer.source),
        Some(ConfigLayerSource::Runtime)
    ));
}

#[test]
fn test_config_round_trips_through_toml() {
    let rendered = CodeboxConfig::default()
        .to_toml_string()
        .expect("serialize");
    assert!(rendered.contains("[execution]"));
    let parsed: CodeboxConfig = toml::from_str(&rendered).expect("parse");
    assert_eq!(parsed, CodeboxConfig::default());
}

#[test]
#[serial]
fn test_env_var_selects_explicit_file() {
    let workspace = assert_fs::TempDir::new().expect("failed to create workspace");
    let path = workspace.path().join("from-env.toml");
    fs::write(&path, "[installer]\nsummary_fallback_lines = 2\n").expect("write");

    unsafe { std::env::set_var(crate::constants::CONFIG_PATH_ENV, &path) };
    let loaded = ConfigManager::load();
    unsafe { std::env::remove_var(crate::constants::CONFIG_PATH_ENV) };

    let manager = loaded.expect("failed to load config from env path");
    assert_eq!(manager.config().installer.summary_fallback_lines, 2);
    assert_eq!(manager.config_path(), Some(path.as_path()));
}
