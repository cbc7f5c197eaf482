//! Server configuration
//!
//! Settings come from three layers: built-in defaults, an optional TOML file
//! and command line overrides. Later layers win.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::server::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Default log level when neither the file nor the CLI sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// `[server]` table
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Seconds without an inbound frame before a connection is closed; 0 disables
    pub idle_timeout_secs: Option<u64>,
}

/// `[logging]` table
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

/// Contents of the TOML config file
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub idle_timeout_secs: Option<u64>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerConfig,
    pub log_level: String,
}

impl Settings {
    /// Merge defaults, file values and CLI overrides
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let host = overrides
            .host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT);
        let idle_timeout_secs = overrides
            .idle_timeout_secs
            .or(file.server.idle_timeout_secs)
            .unwrap_or(0);

        if host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }

        let idle_timeout = (idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs));

        Ok(Self {
            server: ServerConfig::new(host, port).with_idle_timeout(idle_timeout),
            log_level: file
                .logging
                .level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// Load the optional config file at `path` and apply CLI overrides
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default()).unwrap();

        assert_eq!(settings.server, ServerConfig::new("localhost", 5000));
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_parse_full_file() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 9001
            idle_timeout_secs = 30

            [logging]
            level = "debug"
        "#;
        let file = FileConfig::parse(toml).unwrap();
        let settings = Settings::resolve(file, Overrides::default()).unwrap();

        assert_eq!(settings.server.socket_addr(), "0.0.0.0:9001");
        assert_eq!(settings.server.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = FileConfig::parse("[server]\nport = 6000\n").unwrap();
        let settings = Settings::resolve(file, Overrides::default()).unwrap();

        assert_eq!(settings.server.socket_addr(), "localhost:6000");
        assert_eq!(settings.server.idle_timeout, None);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = FileConfig::parse("[server]\nhost = \"10.0.0.1\"\nport = 6000\nidle_timeout_secs = 10\n").unwrap();
        let overrides = Overrides {
            host: None,
            port: Some(7000),
            idle_timeout_secs: Some(0),
        };
        let settings = Settings::resolve(file, overrides).unwrap();

        assert_eq!(settings.server.socket_addr(), "10.0.0.1:7000");
        assert_eq!(settings.server.idle_timeout, None);
    }

    #[test]
    fn test_rejects_port_zero() {
        let overrides = Overrides {
            port: Some(0),
            ..Default::default()
        };
        let result = Settings::resolve(FileConfig::default(), overrides);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let result = FileConfig::parse("[server]\npath = \"/ws\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("echo.toml");
        fs::write(&path, "[server]\nport = 5050\n").unwrap();

        let settings = Settings::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(settings.server.port, 5050);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = Settings::load(Some(&dir.path().join("missing.toml")), Overrides::default());
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = FileConfig::parse("[server\nport = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
