//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides; command
//! line flags are applied on top by the binary.

use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::labels::ReplicaLabels;
use crate::read::{ReadOptions, WarningPolicy};

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "THANOS_REMOTE_READ_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub read: ReadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Upper bound for one remote read request; 0 disables it
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_listen() -> String {
    "0.0.0.0:10080".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// StoreAPI endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_store_endpoint() -> String {
    "localhost:10901".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_store_endpoint(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Read behaviour shared by every request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadConfig {
    #[serde(default)]
    pub replica_labels: ReplicaLabels,

    #[serde(default)]
    pub warning_policy: WarningPolicy,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Config file locations searched when none is given, in order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("thanos-remote-read").join("config.toml")),
            Some(PathBuf::from("/etc/thanos-remote-read/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from default locations or environment
    ///
    /// Returns the file the configuration came from, if any.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::load_first(&Self::default_paths())
    }

    /// Load the first of `paths` that exists, or defaults when none does
    ///
    /// A file that exists but does not load is an error, not skipped.
    pub fn load_first(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_with_env(path)?, Some(path.clone()))),
            None => Ok((Self::from_env()?, None)),
        }
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides looked up by key (`LISTEN`, `STORE`, ...)
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("LISTEN") {
            self.server.listen = listen;
        }
        if let Some(endpoint) = lookup("STORE") {
            self.store.endpoint = endpoint;
        }
        if let Some(labels) = lookup("REPLICA_LABELS") {
            self.read.replica_labels = ReplicaLabels::from_csv(&labels);
        }
        if let Some(policy) = lookup("WARNING_POLICY") {
            self.read.warning_policy = policy.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;

        if self.store.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store endpoint must not be empty".to_string(),
            ));
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "unknown log format '{}', expected 'pretty' or 'json'",
                other
            ))),
        }
    }

    /// Socket address to bind the HTTP server to
    ///
    /// A bare `:port` binds every interface. Host names are resolved and
    /// the first address is used.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let listen = self.server.listen.trim();
        let listen = if listen.starts_with(':') {
            format!("0.0.0.0{}", listen)
        } else {
            listen.to_string()
        };
        listen
            .to_socket_addrs()
            .map_err(|e| {
                ConfigError::Invalid(format!("invalid listen address '{}': {}", listen, e))
            })?
            .next()
            .ok_or_else(|| {
                ConfigError::Invalid(format!("listen address '{}' did not resolve", listen))
            })
    }

    /// Read options handed to the reader
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            replica_labels: self.read.replica_labels.clone(),
            warning_policy: self.read.warning_policy,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# thanos-remote-read configuration
#
# Environment variables override these settings:
# - THANOS_REMOTE_READ_LISTEN
# - THANOS_REMOTE_READ_STORE
# - THANOS_REMOTE_READ_REPLICA_LABELS (comma separated)
# - THANOS_REMOTE_READ_WARNING_POLICY
# - THANOS_REMOTE_READ_LOG_LEVEL
# - THANOS_REMOTE_READ_LOG_FORMAT

[server]
# Address to serve the remote read API on
listen = "0.0.0.0:10080"

# Upper bound for one remote read request in seconds (0 disables)
request_timeout_secs = 120

[store]
# Thanos StoreAPI gRPC endpoint
endpoint = "localhost:10901"

# Connection timeout in seconds
connect_timeout_secs = 5

[read]
# Labels identifying a replica; series differing only in these are merged
replica_labels = []

# What to do when the store returns warnings: fail or ignore
warning_policy = "fail"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.server.listen, "0.0.0.0:10080");
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.store.endpoint, "localhost:10901");
        assert_eq!(config.store.connect_timeout(), Duration::from_secs(5));
        assert!(config.read.replica_labels.is_empty());
        assert_eq!(config.read.warning_policy, WarningPolicy::Fail);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_config_matches_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.listen, defaults.server.listen);
        assert_eq!(config.store.endpoint, defaults.store.endpoint);
        assert_eq!(config.read_options(), defaults.read_options());
        assert_eq!(config.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
endpoint = "thanos-store:10901"

[read]
replica_labels = ["replica", "prometheus_replica"]
warning_policy = "ignore"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.store.endpoint, "thanos-store:10901");
        assert_eq!(config.store.connect_timeout_secs, 5);
        assert_eq!(config.server.listen, "0.0.0.0:10080");
        assert!(config.read.replica_labels.contains("prometheus_replica"));
        assert_eq!(config.read.warning_policy, WarningPolicy::Ignore);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[read]\nwarning_policy = \"maybe\"\n").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LISTEN", "127.0.0.1:9999"),
            ("STORE", "store:1"),
            ("REPLICA_LABELS", "replica,rule_replica"),
            ("WARNING_POLICY", "ignore"),
            ("LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:9999");
        assert_eq!(config.store.endpoint, "store:1");
        assert_eq!(config.read.replica_labels.names(), vec!["replica", "rule_replica"]);
        assert_eq!(config.read.warning_policy, WarningPolicy::Ignore);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_policy_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "WARNING_POLICY").then(|| "sometimes".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_listen_addr() {
        let mut config = Config::default();
        config.server.listen = ":10080".to_string();
        assert_eq!(config.listen_addr().unwrap().port(), 10080);

        config.server.listen = "not an address".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_listen_addr_resolves_hostname() {
        let mut config = Config::default();
        config.server.listen = "localhost:10080".to_string();

        let addr = config.listen_addr().unwrap();
        assert_eq!(addr.port(), 10080);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_load_first_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let broken = dir.path().join("config.toml");
        std::fs::write(
            &broken,
            "[read]\nreplica_labels = \"replica\"\nwarning_policy = \"ignore\"\n",
        )
        .unwrap();

        let result = Config::load_first(&[missing, broken]);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_first_picks_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "[read]\nwarning_policy = \"ignore\"\n").unwrap();

        let (config, source) = Config::load_first(&[missing.clone(), file.clone()]).unwrap();
        assert_eq!(source, Some(file));
        assert_eq!(config.read.warning_policy, WarningPolicy::Ignore);

        let (_, source) = Config::load_first(&[missing]).unwrap();
        assert_eq!(source, None);
    }

    #[test]
    fn test_empty_replica_label_ignored() {
        let config: Config = toml::from_str("[read]\nreplica_labels = [\"\"]\n").unwrap();
        assert!(config.read.replica_labels.is_empty());
    }

    #[test]
    fn test_validate_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_disabled() {
        let config = ServerConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
    }
}
