//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use zbstat_feed::SeedItem;
use zbstat_ws::{ConnectionConfig, DEFAULT_URL};

/// Config file used when neither `--config` nor the env var is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable holding the config file path.
pub const CONFIG_ENV: &str = "ZBSTAT_CONFIG";

fn default_ws_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_tracked() -> Vec<SeedItem> {
    SeedItem::defaults()
}

/// Application configuration.
///
/// The reconnect delay is deliberately absent: it is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Status server address.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Tracked keys in display order.
    #[serde(default = "default_tracked")]
    pub tracked: Vec<SeedItem>,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Path precedence: `explicit` > `ZBSTAT_CONFIG` > `config/default.toml`.
    /// A missing default file falls back to built-in defaults; a missing
    /// file that was asked for is an error.
    pub fn load(explicit: Option<&str>) -> AppResult<Self> {
        let requested = explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        match requested {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)
            }
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Check the address and the tracked key set.
    pub fn validate(&self) -> AppResult<()> {
        self.connection_config()
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if self.tracked.is_empty() {
            return Err(AppError::Config("No tracked keys configured".to_string()));
        }

        let mut seen = HashSet::new();
        for item in &self.tracked {
            if item.key.trim().is_empty() {
                return Err(AppError::Config("Tracked key must not be empty".to_string()));
            }
            if !seen.insert(item.key.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate tracked key: {}",
                    item.key
                )));
            }
        }

        Ok(())
    }

    /// Connection settings for the WebSocket client.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.ws_url.clone())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            tracked: default_tracked(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zbstat_ws::RECONNECT_DELAY;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ws_url, "ws://localhost:45456/ws");
        assert_eq!(config.tracked.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_parse_custom_config() {
        let config = AppConfig::from_toml(
            r#"
            ws_url = "ws://127.0.0.1:9000/status"

            [[tracked]]
            key = "genshin"
            display = "Genshin"

            [[tracked]]
            key = "hkrpg"
            display = "HSR"
            "#,
        )
        .unwrap();

        assert_eq!(config.ws_url, "ws://127.0.0.1:9000/status");
        assert_eq!(
            config.tracked,
            vec![
                SeedItem::new("genshin", "Genshin"),
                SeedItem::new("hkrpg", "HSR"),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconnect_delay_is_fixed() {
        let config = AppConfig::from_toml(r#"reconnect_delay_ms = 1"#).unwrap();
        assert_eq!(config.connection_config().reconnect_delay, RECONNECT_DELAY);
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml("ws_url = ").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_http_url() {
        let config = AppConfig {
            ws_url: "http://localhost:45456/ws".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let config = AppConfig {
            tracked: vec![SeedItem::new("a", "A"), SeedItem::new("a", "B")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate tracked key"));
    }

    #[test]
    fn test_validate_rejects_empty_tracked() {
        let config = AppConfig {
            tracked: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"ws_url = "wss://status.local/ws""#).unwrap();

        let path = file.path().to_str().unwrap();
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.ws_url, "wss://status.local/ws");
        assert_eq!(config.tracked, SeedItem::defaults());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = AppConfig::load(Some("/nonexistent/zbstat.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("ws_url"));
        assert!(toml_str.contains("[[tracked]]"));
        assert_eq!(AppConfig::from_toml(&toml_str).unwrap(), config);
    }
}
