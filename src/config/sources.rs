use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "HINTBOX_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/hintbox.toml";
const ENV_PREFIX: &str = "HINTBOX";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    load_from_sources(default_path())
}

/// Path named by `HINTBOX_CONFIG`, else `config/hintbox.toml`
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // HINTBOX__SCHEDULER__MAX_CONCURRENT_PREFETCHERS -> scheduler.max_concurrent_prefetchers
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;
    use crate::links::EffectiveType;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.scheduler.max_concurrent_prefetchers, 2);
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:8088");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[scheduler]
max_concurrent_prefetchers = 3
allow_query_prefetch = true

[scheduler.methods]
dns_prefetch = false

[network]
effective_type = "slow-2g"
save_data = true

[links]
scan_interval = "10s"
document_origin = "https://site.test/"

[board]
fadeout_delay = 750

[http]
request_timeout = "1m"
max_body_bytes = 1024
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.scheduler.max_concurrent_prefetchers, 3);
        assert!(config.scheduler.allow_query_prefetch);
        assert!(!config.scheduler.methods.dns_prefetch);
        assert!(config.scheduler.methods.prefetch);
        assert_eq!(config.network.effective_type, EffectiveType::Slow2g);
        assert!(config.network.save_data);
        assert_eq!(config.links.scan_interval, HumanDuration::from_secs(10));
        assert_eq!(config.links.document_origin, "https://site.test/");
        assert_eq!(config.board.fadeout_delay, HumanDuration::from_millis(750));
        assert_eq!(config.http.request_timeout, HumanDuration::from_secs(60));
        assert_eq!(config.http.max_body_bytes, 1024);
    }

    // Environment overrides are not exercised here: env::set_var is unsafe
    // under edition 2024 and would race with parallel tests.
}
