//! Configuration management for hintbox
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use hintbox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Up to {} hints in flight", config.scheduler.max_concurrent_prefetchers);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `HINTBOX__<section>__<key>`
//!
//! Examples:
//! - `HINTBOX__SCHEDULER__MAX_CONCURRENT_PREFETCHERS=4`
//! - `HINTBOX__NETWORK__SAVE_DATA=true`
//! - `HINTBOX__LINKS__SCAN_INTERVAL=10s`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/hintbox.toml`.
//! This can be overridden using the `HINTBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    BoardConfig, Config, HttpSettings, LinksConfig, NetworkConfig, SchedulerConfig, ServerConfig,
};
pub use validation::ValidationError;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Parsed document origin. Validation guarantees it parses.
    pub fn document_origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.links.document_origin).map_err(|e| {
            ConfigError::ValidationError(ValidationError::InvalidDocumentOrigin {
                origin: self.links.document_origin.clone(),
                reason: e.to_string(),
            })
        })
    }
}
