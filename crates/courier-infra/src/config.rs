//! Bus configuration loader for Courier.
//!
//! Reads `config.toml` from the config directory (`~/.courier/` by default)
//! and deserializes it into [`BusConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use courier_types::BusConfig;

/// Smallest accepted default timeout (safety floor).
const MIN_TIMEOUT_MS: u64 = 1;

/// Resolve the directory holding `config.toml`.
///
/// `COURIER_CONFIG_DIR` wins; otherwise `~/.courier`, or `.courier` in the
/// current directory when no home directory is known.
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COURIER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".courier");
    }

    PathBuf::from(".courier")
}

/// Load bus configuration from `{config_dir}/config.toml`.
///
/// - Missing file: [`BusConfig::default()`] (30 s default timeout).
/// - Unreadable or unparsable file: logs a warning and returns the default.
/// - A zero timeout is raised to the 1 ms floor with a warning.
pub async fn load_bus_config(config_dir: &Path) -> BusConfig {
    let config_path = config_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return BusConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return BusConfig::default();
        }
    };

    let mut config = match toml::from_str::<BusConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return BusConfig::default();
        }
    };

    if config.default_timeout_ms < MIN_TIMEOUT_MS {
        tracing::warn!(
            "default_timeout_ms in {} must be positive, using {MIN_TIMEOUT_MS}ms",
            config_path.display()
        );
        config.default_timeout_ms = MIN_TIMEOUT_MS;
    }

    config
}
