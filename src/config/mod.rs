use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use log::{debug, info, LevelFilter};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.ini";
pub const DEFAULT_PORT: u16 = 8085;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid port number: {0:?}")]
    InvalidPort(String),
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_backend() -> String {
    if cfg!(windows) {
        "registry".to_string()
    } else {
        "directory".to_string()
    }
}

fn default_directory() -> String {
    "sensors".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Only used by the `directory` backend.
    #[serde(default = "default_directory")]
    pub directory: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            directory: default_directory(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validates port input typed on the control surface.
pub fn parse_port(input: &str) -> Result<u16, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidPort(input.to_string()));
    }
    match trimmed.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(input.to_string())),
    }
}

// rust-ini unescapes backslashes when loading.
fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\")
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_FILE)
    }

    pub fn get_log_level(&self) -> LevelFilter {
        match self.logging.level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info, // Default to Info if invalid
        }
    }

    /// Like [`AppConfig::from_file`], but a missing file gives the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        if !config_path.exists() {
            debug!("No configuration at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::from_file(config_path)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();
        debug!("Loading configuration from {}", config_path.display());

        let config = Config::builder()
            .add_source(File::from(config_path).format(FileFormat::Ini))
            .build()
            .context(format!("Failed to load config from {}", config_path.display()))?;

        let app_config: AppConfig = config.try_deserialize()
            .context("Failed to deserialize config")?;

        Ok(app_config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();

        let mut config_str = String::new();

        config_str.push_str(&format!(
            "[server]\nport = {}\naddress = {}\nstatic_dir = {}\n\n",
            self.server.port,
            escape_value(&self.server.address),
            escape_value(&self.server.static_dir)
        ));

        config_str.push_str(&format!(
            "[store]\nbackend = {}\ndirectory = {}\n\n",
            escape_value(&self.store.backend),
            escape_value(&self.store.directory)
        ));

        config_str.push_str(&format!(
            "[logging]\nlevel = {}\n",
            self.logging.level
        ));

        fs::write(config_path, config_str)
            .context(format!("Failed to save config to {}", config_path.display()))?;

        info!("Configuration saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn ini_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8085);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.store.directory, "sensors");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let temp_file = ini_file("[server]\nport = 9000\naddress = 127.0.0.1\n\n[store]\nbackend = directory\ndirectory = /tmp/vsb\n\n[logging]\nlevel = debug\n");

        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.store.backend, "directory");
        assert_eq!(config.store.directory, "/tmp/vsb");
        assert_eq!(config.get_log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let temp_file = ini_file("[server]\nport = 8100\n");

        let config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.port, 8100);
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("config.ini")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_config() {
        let mut config = AppConfig::default();
        config.server.port = 9123;
        config.server.static_dir = "public".to_string();
        config.store.backend = "directory".to_string();
        config.store.directory = "/var/lib/vsb".to_string();
        config.logging.level = "warn".to_string();

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.ini");

        config.save(&config_path).unwrap();

        let loaded_config = AppConfig::from_file(&config_path).unwrap();
        assert_eq!(loaded_config, config);
    }

    #[test]
    fn test_log_level_fallback() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert_eq!(config.get_log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("8085"), Ok(8085));
        assert_eq!(parse_port(" 9000 "), Ok(9000));
        assert_eq!(parse_port("65535"), Ok(65535));
    }

    #[test]
    fn test_parse_port_rejects_invalid() {
        for input in ["", "abc", "-1", "0", "65536", "80a", "+80", "8 0"] {
            assert_eq!(
                parse_port(input),
                Err(ConfigError::InvalidPort(input.to_string())),
                "{input:?} should be rejected"
            );
        }
    }
}
