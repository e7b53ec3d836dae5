use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LISTEN_PORT};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub root_path: String,
    pub listen_port: Option<u16>,
    pub idle_timeout_secs: Option<u64>,
    /// Inclusive port range for PASV listeners; OS-chosen when unset.
    pub pasv_port_range: Option<(u16, u16)>,
    /// Address advertised in the 227 reply, for servers behind NAT.
    pub pasv_address: Option<String>,
    pub upload_buffer_size: Option<usize>,   // Optional to allow default value
    pub download_buffer_size: Option<usize>, // Optional to allow default value
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_path: String::from("/srv/ftp"),
            listen_port: Some(DEFAULT_LISTEN_PORT),
            idle_timeout_secs: Some(DEFAULT_IDLE_TIMEOUT_SECS),
            pasv_port_range: None,
            pasv_address: None,
            upload_buffer_size: Some(DEFAULT_BUFFER_SIZE),
            download_buffer_size: Some(DEFAULT_BUFFER_SIZE),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse configuration file: {}", path))?;
        Ok(config)
    }

    pub fn listen_port(&self) -> u16 {
        self.server.listen_port.unwrap_or(DEFAULT_LISTEN_PORT)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .idle_timeout_secs
                .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS),
        )
    }

    pub fn upload_buffer_size(&self) -> usize {
        self.server.upload_buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    pub fn download_buffer_size(&self) -> usize {
        self.server
            .download_buffer_size
            .unwrap_or(DEFAULT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = Config::default();
        assert_eq!(config.listen_port(), DEFAULT_LISTEN_PORT);
        assert_eq!(config.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.upload_buffer_size(), DEFAULT_BUFFER_SIZE);
        assert!(config.server.pasv_port_range.is_none());
    }

    #[test]
    fn parses_toml_with_port_range() {
        let config: Config = toml::from_str(
            r#"
            [server]
            root_path = "/tmp/ftp"
            listen_port = 2121
            idle_timeout_secs = 60
            pasv_port_range = [50000, 50100]
            pasv_address = "192.0.2.7"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.root_path, "/tmp/ftp");
        assert_eq!(config.listen_port(), 2121);
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.server.pasv_port_range, Some((50000, 50100)));
        assert_eq!(config.server.pasv_address.as_deref(), Some("192.0.2.7"));
    }
}
