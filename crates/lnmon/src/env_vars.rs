//! Environment variables overriding the config file

use std::env;
use std::str::FromStr;

use crate::config::{LoggingConfig, LoggingOutput, Network, Settings};

// Network environment variables
/// Node name
pub const ENV_NETWORK_NAME: &str = "LNMON_NETWORK_NAME";
/// Node kind, `lnd`
pub const ENV_NETWORK_BACKEND: &str = "LNMON_NETWORK_BACKEND";
/// `host:port` of the gRPC interface
pub const ENV_NETWORK_ADDRESS: &str = "LNMON_NETWORK_ADDRESS";
/// Path to `tls.cert`
pub const ENV_NETWORK_CERT_FILE: &str = "LNMON_NETWORK_CERT_FILE";
/// Path to the macaroon
pub const ENV_NETWORK_MACAROON_FILE: &str = "LNMON_NETWORK_MACAROON_FILE";
/// Max decoded response size in bytes
pub const ENV_NETWORK_MAX_MSG_RECV_SIZE: &str = "LNMON_NETWORK_MAX_MSG_RECV_SIZE";
/// Dial timeout in seconds
pub const ENV_NETWORK_CONN_TIMEOUT: &str = "LNMON_NETWORK_CONN_TIMEOUT";
/// Max open connections
pub const ENV_NETWORK_POOL_CAPACITY: &str = "LNMON_NETWORK_POOL_CAPACITY";
/// Seconds to wait for a free connection
pub const ENV_NETWORK_POOL_TIMEOUT: &str = "LNMON_NETWORK_POOL_TIMEOUT";
/// Seconds before an idle connection is closed
pub const ENV_NETWORK_IDLE_TIMEOUT: &str = "LNMON_NETWORK_IDLE_TIMEOUT";

// Logging environment variables
/// `console`, `file` or `both`
pub const ENV_LOGGING_OUTPUT: &str = "LNMON_LOGGING_OUTPUT";
/// Console filter directive
pub const ENV_LOGGING_CONSOLE_LEVEL: &str = "LNMON_LOGGING_CONSOLE_LEVEL";
/// Log file filter directive
pub const ENV_LOGGING_FILE_LEVEL: &str = "LNMON_LOGGING_FILE_LEVEL";

impl Settings {
    /// Apply every `LNMON_*` variable set in the environment
    pub fn from_env(mut self) -> Self {
        self.network = self.network.from_env();
        self.logging = self.logging.from_env();
        self
    }
}

impl Network {
    /// Apply the `LNMON_NETWORK_*` variables
    pub fn from_env(mut self) -> Self {
        if let Ok(name) = env::var(ENV_NETWORK_NAME) {
            self.name = name;
        }

        if let Ok(backend_str) = env::var(ENV_NETWORK_BACKEND) {
            if let Ok(backend) = backend_str.parse() {
                self.backend = backend;
            } else {
                tracing::warn!("Unknown network backend set in env var will use config file. {backend_str}");
            }
        }

        if let Ok(address) = env::var(ENV_NETWORK_ADDRESS) {
            self.address = address;
        }

        if let Ok(cert_file) = env::var(ENV_NETWORK_CERT_FILE) {
            self.cert_file = cert_file.into();
        }

        if let Ok(macaroon_file) = env::var(ENV_NETWORK_MACAROON_FILE) {
            self.macaroon_file = macaroon_file.into();
        }

        if let Ok(size_str) = env::var(ENV_NETWORK_MAX_MSG_RECV_SIZE) {
            if let Ok(size) = size_str.parse() {
                self.max_msg_recv_size = Some(size);
            }
        }

        if let Ok(timeout_str) = env::var(ENV_NETWORK_CONN_TIMEOUT) {
            if let Ok(timeout) = timeout_str.parse() {
                self.conn_timeout = timeout;
            }
        }

        if let Ok(capacity_str) = env::var(ENV_NETWORK_POOL_CAPACITY) {
            if let Ok(capacity) = capacity_str.parse() {
                self.pool_capacity = capacity;
            }
        }

        if let Ok(timeout_str) = env::var(ENV_NETWORK_POOL_TIMEOUT) {
            if let Ok(timeout) = timeout_str.parse() {
                self.pool_timeout = timeout;
            }
        }

        if let Ok(timeout_str) = env::var(ENV_NETWORK_IDLE_TIMEOUT) {
            if let Ok(timeout) = timeout_str.parse() {
                self.idle_timeout = Some(timeout);
            }
        }

        self
    }
}

impl LoggingConfig {
    /// Apply the `LNMON_LOGGING_*` variables
    pub fn from_env(mut self) -> Self {
        if let Ok(output_str) = env::var(ENV_LOGGING_OUTPUT) {
            if let Ok(output) = LoggingOutput::from_str(&output_str) {
                self.output = output;
            } else {
                tracing::warn!(
                    "Invalid logging output '{}' in environment variable. Valid options: console, file, both",
                    output_str
                );
            }
        }

        if let Ok(console_level) = env::var(ENV_LOGGING_CONSOLE_LEVEL) {
            self.console_level = Some(console_level);
        }

        if let Ok(file_level) = env::var(ENV_LOGGING_FILE_LEVEL) {
            self.file_level = Some(file_level);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    // Only this test touches LNMON_* variables, tests run in parallel
    #[test]
    fn test_env_overrides_settings() {
        env::set_var(ENV_NETWORK_NAME, "bob");
        env::set_var(ENV_NETWORK_ADDRESS, "192.168.1.10:10009");
        env::set_var(ENV_NETWORK_MACAROON_FILE, "/secrets/admin.macaroon");
        env::set_var(ENV_NETWORK_POOL_CAPACITY, "8");
        env::set_var(ENV_NETWORK_CONN_TIMEOUT, "not a number");
        env::set_var(ENV_LOGGING_OUTPUT, "console");
        env::set_var(ENV_LOGGING_CONSOLE_LEVEL, "debug");

        let settings = Settings::default().from_env();

        assert_eq!(settings.network.name, "bob");
        assert_eq!(settings.network.address, "192.168.1.10:10009");
        assert_eq!(
            settings.network.macaroon_file,
            PathBuf::from("/secrets/admin.macaroon")
        );
        assert_eq!(settings.network.pool_capacity, 8);
        // Unparsable values keep the configured one
        assert_eq!(settings.network.conn_timeout, 10);
        assert_eq!(settings.logging.output, LoggingOutput::Console);
        assert_eq!(settings.logging.console_level.as_deref(), Some("debug"));

        for var in [
            ENV_NETWORK_NAME,
            ENV_NETWORK_ADDRESS,
            ENV_NETWORK_MACAROON_FILE,
            ENV_NETWORK_POOL_CAPACITY,
            ENV_NETWORK_CONN_TIMEOUT,
            ENV_LOGGING_OUTPUT,
            ENV_LOGGING_CONSOLE_LEVEL,
        ] {
            env::remove_var(var);
        }
    }
}
