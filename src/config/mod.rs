pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
mod args;

#[cfg(feature = "cli")]
pub use args::{parse_forced_role, CliConfig};
pub use toml_config::TomlConfig;
