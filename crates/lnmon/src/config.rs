//! Settings, read from defaults, then `config.toml`, then `LNMON_*` environment variables

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File, FileFormat};
use lnmon_pool::PoolConfig;
use serde::{Deserialize, Serialize};

/// Kind of node
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkBackend {
    /// lnd over gRPC
    #[default]
    Lnd,
}

impl std::str::FromStr for NetworkBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lnd" => Ok(NetworkBackend::Lnd),
            _ => Err(format!("Unknown network backend: {}", s)),
        }
    }
}

/// Node to monitor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    /// Name shown for the node
    pub name: String,
    /// Kind of node
    pub backend: NetworkBackend,
    /// `host:port` of the node's gRPC interface
    pub address: String,
    /// lnd `tls.cert`
    pub cert_file: PathBuf,
    /// Macaroon sent with every call, `readonly.macaroon` is enough to monitor
    pub macaroon_file: PathBuf,
    /// Max size in bytes of a decoded response
    pub max_msg_recv_size: Option<usize>,
    /// Seconds allowed to open a connection
    pub conn_timeout: u64,
    /// Max number of open connections
    pub pool_capacity: usize,
    /// Seconds to wait for a free connection
    pub pool_timeout: u64,
    /// Seconds a connection may stay idle before being closed
    pub idle_timeout: Option<u64>,
}

impl Default for Network {
    fn default() -> Self {
        let lnd_dir = home::home_dir().unwrap_or_default().join(".lnd");

        Self {
            name: "lnd".to_string(),
            backend: NetworkBackend::default(),
            address: "127.0.0.1:10009".to_string(),
            cert_file: lnd_dir.join("tls.cert"),
            macaroon_file: lnd_dir.join("data/chain/bitcoin/mainnet/readonly.macaroon"),
            max_msg_recv_size: None,
            conn_timeout: 10,
            pool_capacity: 3,
            pool_timeout: 30,
            idle_timeout: None,
        }
    }
}

impl Network {
    /// Pool settings for this node
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.pool_capacity,
            dial_timeout: Duration::from_secs(self.conn_timeout),
            acquire_timeout: Duration::from_secs(self.pool_timeout),
            idle_timeout: self.idle_timeout.map(Duration::from_secs),
        }
    }
}

/// Where log events are written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoggingOutput {
    /// Standard error only
    Console,
    /// Daily rolling file in the work dir only
    File,
    /// Both
    #[default]
    Both,
}

impl std::str::FromStr for LoggingOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(LoggingOutput::Console),
            "file" => Ok(LoggingOutput::File),
            "both" => Ok(LoggingOutput::Both),
            _ => Err(format!(
                "Unknown logging output: {}. Valid options: console, file, both",
                s
            )),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    /// Where events are written
    pub output: LoggingOutput,
    /// Filter directive for the console, `warn` when unset
    pub console_level: Option<String>,
    /// Filter directive for the log file, `debug` when unset
    pub file_level: Option<String>,
}

/// lnmon settings, derived from `config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    /// Monitored node
    pub network: Network,
    /// Logging
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from `config_file`, a missing file leaves the defaults in place
    pub fn new<P>(config_file: P) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let config_file: PathBuf = config_file.into();

        Self::with_source(File::from(config_file).required(false))
    }

    /// Parse settings from the contents of a TOML file
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Self::with_source(File::from_str(contents, FileFormat::Toml))
    }

    fn with_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config: Config = Config::builder()
            // use defaults
            .add_source(Config::try_from(&Settings::default())?)
            // override with file contents
            .add_source(source)
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml("").expect("empty config");

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.network.address, "127.0.0.1:10009");
        assert_eq!(settings.network.pool_capacity, 3);
        assert_eq!(settings.logging.output, LoggingOutput::Both);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = Settings::from_toml(
            r#"
            [network]
            name = "alice"
            backend = "lnd"
            address = "10.0.0.2:10009"
            cert_file = "/data/lnd/tls.cert"
            macaroon_file = "/data/lnd/readonly.macaroon"
            max_msg_recv_size = 52428800
            pool_capacity = 5
            idle_timeout = 120

            [logging]
            output = "file"
            file_level = "trace"
            "#,
        )
        .expect("valid config");

        assert_eq!(settings.network.name, "alice");
        assert_eq!(settings.network.address, "10.0.0.2:10009");
        assert_eq!(
            settings.network.cert_file,
            PathBuf::from("/data/lnd/tls.cert")
        );
        assert_eq!(settings.network.max_msg_recv_size, Some(52_428_800));
        assert_eq!(settings.network.conn_timeout, 10);
        assert_eq!(settings.logging.output, LoggingOutput::File);
        assert_eq!(settings.logging.file_level.as_deref(), Some("trace"));
        assert_eq!(settings.logging.console_level, None);

        let pool = settings.network.pool_config();
        assert_eq!(pool.capacity, 5);
        assert_eq!(pool.dial_timeout, Duration::from_secs(10));
        assert_eq!(pool.acquire_timeout, Duration::from_secs(30));
        assert_eq!(pool.idle_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Settings::from_toml("[network]\nbackend = \"cln\"\n").is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let settings =
            Settings::from_toml(include_str!("../example.config.toml")).expect("example config");

        assert_eq!(settings.network.name, "alice");
        assert_eq!(settings.network.max_msg_recv_size, None);
        assert_eq!(settings.network.idle_timeout, None);
        assert_eq!(settings.logging.console_level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings =
            Settings::new("/nonexistent/lnmon/config.toml").expect("missing file is fine");
        assert_eq!(settings, Settings::default());
    }
}
