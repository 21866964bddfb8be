use anyhow::Result;
use codebox_config::CodeboxConfig;

pub fn handle_config_command(config: &CodeboxConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}
