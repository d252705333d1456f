//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Snapshot export settings.
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - Export settings are consistent when export is enabled
    ///
    /// # Example
    ///
    /// ```
    /// use telemetra_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.export.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    ///
    /// This is a convenience method that combines `load()` and `validate()`.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
        } else {
            // Check for valid host:port format
            let parts: Vec<&str> = self.bind.rsplitn(2, ':').collect();
            if parts.len() != 2 {
                errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                });
            } else {
                // Validate port
                let port_str = parts[0];
                match port_str.parse::<u16>() {
                    Ok(0) => {
                        errors.push(ValidationError {
                            field: "server.bind".to_string(),
                            message: "port cannot be 0".to_string(),
                        });
                    }
                    Err(_) => {
                        errors.push(ValidationError {
                            field: "server.bind".to_string(),
                            message: format!(
                                "invalid port '{}': must be a number 1-65535",
                                port_str
                            ),
                        });
                    }
                    Ok(_) => {} // Valid port
                }
            }
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: telemetra_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Minimum external command timeout in seconds.
pub const MIN_EXPORT_TIMEOUT: u64 = 1;
/// Maximum external command timeout in seconds (5 minutes).
pub const MAX_EXPORT_TIMEOUT: u64 = 300;

fn default_export_timeout() -> u64 {
    30
}

fn default_export_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetra")
        .join("snapshots")
}

/// Snapshot export configuration.
///
/// Disabled by default. When enabled, every successful aggregation
/// writes mean/median CSV tables to `dir` and, if `command` is set,
/// runs it with both table paths as arguments under `timeout_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Whether snapshot export runs at all.
    pub enabled: bool,
    /// Directory for the CSV tables.
    pub dir: PathBuf,
    /// Optional external batch command to invoke after writing tables.
    pub command: Option<String>,
    /// Timeout for the external command, in seconds.
    pub timeout_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_export_dir(),
            command: None,
            timeout_secs: default_export_timeout(),
        }
    }
}

impl ExportConfig {
    /// Validate export configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.enabled {
            return errors;
        }

        if self.dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "export.dir".to_string(),
                message: "snapshot directory cannot be empty when export is enabled"
                    .to_string(),
            });
        }

        if let Some(command) = &self.command
            && command.is_empty()
        {
            errors.push(ValidationError {
                field: "export.command".to_string(),
                message: "command cannot be empty string (use null/omit instead)".to_string(),
            });
        }

        if self.timeout_secs < MIN_EXPORT_TIMEOUT {
            errors.push(ValidationError {
                field: "export.timeout_secs".to_string(),
                message: format!(
                    "timeout {} is too short (minimum {} second)",
                    self.timeout_secs, MIN_EXPORT_TIMEOUT
                ),
            });
        } else if self.timeout_secs > MAX_EXPORT_TIMEOUT {
            errors.push(ValidationError {
                field: "export.timeout_secs".to_string(),
                message: format!(
                    "timeout {} is too long (maximum {} seconds / 5 minutes)",
                    self.timeout_secs, MAX_EXPORT_TIMEOUT
                ),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `export.timeout_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("telemetra")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(!config.export.enabled);
        assert!(config.export.command.is_none());
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.path, telemetra_store::default_db_path());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let config = Config {
            server: ServerConfig {
                bind: "0.0.0.0:9090".to_string(),
            },
            storage: StorageConfig {
                path: PathBuf::from("/tmp/test.db"),
            },
            export: ExportConfig {
                enabled: true,
                dir: PathBuf::from("/tmp/snapshots"),
                command: Some("process-tables".to_string()),
                timeout_secs: 15,
            },
        };

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/test.db"));
        assert!(loaded.export.enabled);
        assert_eq!(loaded.export.command, Some("process-tables".to_string()));
        assert_eq!(loaded.export.timeout_secs, 15);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9999"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9999");
        assert_eq!(config.storage.path, telemetra_store::default_db_path());
        assert!(!config.export.enabled);
        assert_eq!(config.export.timeout_secs, 30);
    }

    #[test]
    fn test_validate_bad_bind_address() {
        let config = Config {
            server: ServerConfig {
                bind: "no-port-here".to_string(),
            },
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.bind"));
    }

    #[test]
    fn test_validate_port_zero() {
        let config = Config {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_disabled_export_skips_export_checks() {
        let config = Config {
            export: ExportConfig {
                enabled: false,
                dir: PathBuf::new(),
                command: Some(String::new()),
                timeout_secs: 0,
            },
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_enabled_export() {
        let config = Config {
            export: ExportConfig {
                enabled: true,
                dir: PathBuf::new(),
                command: Some(String::new()),
                timeout_secs: 0,
            },
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("export.dir"));
        assert!(msg.contains("export.command"));
        assert!(msg.contains("export.timeout_secs"));
    }

    #[test]
    fn test_validate_export_timeout_too_long() {
        let config = Config {
            export: ExportConfig {
                enabled: true,
                timeout_secs: 10_000,
                ..Default::default()
            },
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load("/definitely/not/a/real/path.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
