//! Configuration loading and CLI definitions.

use std::{fs, path::Path, path::PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. 0.0.0.0:8000.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Public base URL used to derive subscribe links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Customer collection document path.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    /// Bound on store lock acquisition, in seconds. Unset = wait forever.
    #[serde(default)]
    pub lock_timeout_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            lock_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base log level (trace/debug/info/warn/error).
    #[serde(default)]
    pub level: Option<String>,
    /// Output format (json, pretty, compact). Default: pretty.
    #[serde(default)]
    pub format: Option<String>,
    /// Output target (stdout, stderr). Default: stderr.
    #[serde(default)]
    pub output: Option<String>,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "changeme".to_string()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("config/customers.yml")
}

#[derive(Debug, Clone, Parser, Default)]
pub struct CliOverrides {
    /// Override server listen address, e.g. 0.0.0.0:8000
    #[arg(long)]
    pub listen: Option<String>,
    /// Override public base URL for subscribe links
    #[arg(long)]
    pub base_url: Option<String>,
    /// Override admin username
    #[arg(long)]
    pub admin_username: Option<String>,
    /// Override admin password
    #[arg(long)]
    pub admin_password: Option<String>,
    /// Override customer collection path
    #[arg(long)]
    pub storage_path: Option<PathBuf>,
    /// Override store lock timeout in seconds (0 = wait forever)
    #[arg(long)]
    pub lock_timeout_secs: Option<u64>,
    /// Override log level (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,
    /// Override log format (json, pretty, compact)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" => Ok(serde_json::from_str(&data)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) {
    if let Some(v) = &overrides.listen {
        config.server.listen = v.clone();
    }
    if let Some(v) = &overrides.base_url {
        config.server.base_url = v.clone();
    }
    if let Some(v) = &overrides.admin_username {
        config.admin.username = v.clone();
    }
    if let Some(v) = &overrides.admin_password {
        config.admin.password = v.clone();
    }
    if let Some(v) = &overrides.storage_path {
        config.storage.path = v.clone();
    }
    // Lock timeout: 0 restores the unbounded wait.
    if let Some(v) = overrides.lock_timeout_secs {
        config.storage.lock_timeout_secs = if v == 0 { None } else { Some(v) };
    }
    if let Some(v) = &overrides.log_level {
        config.logging.level = Some(v.clone());
    }
    if let Some(v) = &overrides.log_format {
        config.logging.format = Some(v.clone());
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.listen.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::Validation(format!(
            "server.listen is not a valid socket address: {}",
            config.server.listen
        )));
    }
    if config.server.base_url.trim_end_matches('/').is_empty() {
        return Err(ConfigError::Validation(
            "server.base_url must not be empty".to_string(),
        ));
    }
    if config.admin.username.is_empty() || config.admin.password.is_empty() {
        return Err(ConfigError::Validation(
            "admin.username and admin.password must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.listen, "0.0.0.0:8000");
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.storage.path, PathBuf::from("config/customers.yml"));
        assert!(config.storage.lock_timeout_secs.is_none());
        validate_config(&config).unwrap();
    }

    #[test]
    fn load_config_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("subgate.toml");
        fs::write(
            &toml_path,
            "[server]\nlisten = \"127.0.0.1:9000\"\n[admin]\npassword = \"s3cret\"\n",
        )
        .unwrap();
        let config = load_config(&toml_path).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.admin.password, "s3cret");
        // Unspecified sections fall back to defaults.
        assert_eq!(config.server.base_url, "http://localhost:8000");

        let yaml_path = dir.path().join("subgate.yml");
        fs::write(&yaml_path, "storage:\n  path: /tmp/customers.yml\n").unwrap();
        let config = load_config(&yaml_path).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/tmp/customers.yml"));

        let bad_path = dir.path().join("subgate.ini");
        fs::write(&bad_path, "").unwrap();
        assert!(matches!(
            load_config(&bad_path),
            Err(ConfigError::UnsupportedFormat)
        ));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            listen: Some("127.0.0.1:8080".into()),
            admin_password: Some("override".into()),
            lock_timeout_secs: Some(5),
            ..Default::default()
        };
        apply_overrides(&mut config, &overrides);
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.admin.password, "override");
        assert_eq!(config.storage.lock_timeout_secs, Some(5));

        // Zero clears the bound.
        apply_overrides(
            &mut config,
            &CliOverrides {
                lock_timeout_secs: Some(0),
                ..Default::default()
            },
        );
        assert!(config.storage.lock_timeout_secs.is_none());
    }

    #[test]
    fn validation_rejects_bad_listen_and_empty_credentials() {
        let mut config = Config::default();
        config.server.listen = "not-an-addr".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = Config::default();
        config.admin.password = String::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
