//! Engine configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.prospect/` in
//! production) and deserializes it into [`EngineConfig`]. A missing or
//! malformed file never stops startup; the engine runs on built-in
//! defaults instead.

use std::path::{Path, PathBuf};

use prospect_types::config::EngineConfig;

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - Missing file: returns [`EngineConfig::default()`].
/// - Unparseable file: logs a warning and returns the default.
/// - Otherwise: the parsed config.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PROSPECT_DATA_DIR` environment variable
/// 2. `~/.prospect` under the user's home directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PROSPECT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".prospect");
    }

    // Last resort: current directory
    PathBuf::from(".prospect")
}
