//! Configuration module
//!
//! Handles loading and saving the bridge configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::network::{SocketConfig, SOCKET_BUFFER_SIZE, SOCKET_TIMEOUT_MS};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// UDP socket settings
    #[serde(default)]
    pub socket: SocketSection,

    /// Location fix settings
    #[serde(default)]
    pub location: LocationConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Human-readable name for this bridge instance
    pub name: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            verbose: false,
            log_file: None,
        }
    }
}

/// UDP socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketSection {
    /// Receive/send timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Receive/send buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_timeout_ms() -> u64 {
    SOCKET_TIMEOUT_MS
}

fn default_buffer_size() -> usize {
    SOCKET_BUFFER_SIZE
}

impl Default for SocketSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            buffer_size: default_buffer_size(),
        }
    }
}

/// Location fix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Static location fix reported for GET_LOCATION requests
    #[serde(default = "default_fix")]
    pub fix: String,
}

fn default_fix() -> String {
    "0.000000 0.000000".to_string()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fix: default_fix(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> ConfigResult<Self> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("uartbridge/config.toml")),
            Some(PathBuf::from("./uartbridge.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                return Self::load(path);
            }
        }

        // Return default config if no file found
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The socket settings in the form the network layer consumes.
    pub fn socket_config(&self) -> SocketConfig {
        SocketConfig {
            timeout_ms: self.socket.timeout_ms,
            buffer_size: self.socket.buffer_size,
        }
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    let config = Config {
        general: GeneralConfig {
            name: "field-gateway".to_string(),
            verbose: false,
            log_file: None,
        },
        location: LocationConfig {
            fix: "37.422000 -122.084000".to_string(),
        },
        ..Default::default()
    };

    toml::to_string_pretty(&config).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.socket.timeout_ms, SOCKET_TIMEOUT_MS);
        assert_eq!(config.socket.buffer_size, SOCKET_BUFFER_SIZE);
    }

    #[test]
    fn test_save_and_load() {
        let config = Config::default();
        let file = NamedTempFile::new().unwrap();

        config.save(file.path()).unwrap();

        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.socket.timeout_ms, config.socket.timeout_ms);
        assert_eq!(loaded.location.fix, config.location.fix);
    }

    #[test]
    fn test_sample_config() {
        let sample = generate_sample_config();
        let parsed: Config = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.general.name, "field-gateway");
    }
}
