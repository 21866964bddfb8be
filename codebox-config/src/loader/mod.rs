pub mod layers;

mod builder;
mod config;
mod manager;
mod merge;

#[cfg(test)]
mod tests;

pub use builder::ConfigBuilder;
pub use config::CodeboxConfig;
pub use manager::ConfigManager;
pub use merge::merge_toml_values;
