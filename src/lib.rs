pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, TomlConfig};

pub use app::pipelines::DraftPipeline;
pub use core::engine::DraftEngine;
pub use utils::error::{DraftError, Result};
