//! Configuration schema for sheetpack
//!
//! Configuration is stored at `~/.config/sheetpack/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Packer tool settings
    pub packer: PackerConfig,

    /// Remote processor settings
    pub remote: RemoteConfig,

    /// Execution service settings
    pub server: ServerConfig,

    /// Output cache settings
    pub cache: CacheConfig,

    /// Job defaults
    pub defaults: DefaultsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Packer tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Executable name or path
    pub program: String,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            program: "TexturePacker".to_string(),
        }
    }
}

/// Remote processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Execution service URL
    pub address: String,

    /// Whole-request timeout in seconds (unset = no timeout)
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:3456/".to_string(),
            timeout_secs: None,
        }
    }
}

/// Execution service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,

    /// Maximum request body size in MB
    pub body_limit_mb: usize,

    /// Parent of per-request scratch directories (default: system temp dir)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3456".to_string(),
            body_limit_mb: 50,
            scratch_dir: None,
        }
    }
}

/// Output cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Skip jobs whose outputs are up to date (default: true)
    pub enabled: bool,

    /// Cache document location (default: next to the executable)
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// Extensions used when an option bag does not set its own
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub sheet_extension: String,
    pub data_extension: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sheet_extension: "pvr.ccz".to_string(),
            data_extension: "plist".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[packer]"));
        assert!(toml.contains("program = \"TexturePacker\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.remote.address, "http://127.0.0.1:3456/");
        assert_eq!(config.server.body_limit_mb, 50);
        assert!(config.cache.enabled);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [remote]
            address = "http://packer.local:3456/"
            timeout_secs = 120
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.remote.address, "http://packer.local:3456/");
        assert_eq!(config.remote.timeout_secs, Some(120));
        assert_eq!(config.defaults.sheet_extension, "pvr.ccz"); // default preserved
    }
}
