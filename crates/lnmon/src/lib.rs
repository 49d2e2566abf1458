//! lnmon
//!
//! Configuration and tracing setup for the `lnmon` binary, plus the constructor of the
//! configured node backend.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use lnmon_lnd::{Lnd, LndDialer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LoggingConfig, LoggingOutput, Network, NetworkBackend};

pub mod config;
pub mod env_vars;

/// Default work dir under the home directory
pub const DEFAULT_WORK_DIR: &str = ".lnmon";

const DEFAULT_CONSOLE_LEVEL: &str = "warn";
const DEFAULT_FILE_LEVEL: &str = "debug";
const LOG_FILE_PREFIX: &str = "lnmon.log";

/// Work dir passed on the command line, or `~/.lnmon`. Created if missing.
pub fn work_dir(work_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let work_dir = match work_dir {
        Some(work_dir) => work_dir.clone(),
        None => home::home_dir()
            .ok_or(anyhow!("Unknown home dir"))?
            .join(DEFAULT_WORK_DIR),
    };

    fs::create_dir_all(&work_dir)?;

    Ok(work_dir)
}

fn env_filter(level: &str) -> EnvFilter {
    // Common filters to reduce noise
    let h2_filter = "h2=warn";
    let hyper_filter = "hyper=warn";
    let hyper_util_filter = "hyper_util=warn";
    let tower_filter = "tower=warn";
    let rustls_filter = "rustls=warn";

    EnvFilter::new(format!(
        "{level},{h2_filter},{hyper_filter},{hyper_util_filter},{tower_filter},{rustls_filter}"
    ))
}

/// Install the global subscriber.
///
/// Console output goes to stderr so that command output on stdout stays parsable. The returned
/// guard flushes the log file and must be held until exit.
pub fn setup_tracing(work_dir: &Path, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let console_level = logging
        .console_level
        .as_deref()
        .unwrap_or(DEFAULT_CONSOLE_LEVEL);
    let file_level = logging.file_level.as_deref().unwrap_or(DEFAULT_FILE_LEVEL);

    let console_layer = match logging.output {
        LoggingOutput::Console | LoggingOutput::Both => Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter(console_level)),
        ),
        LoggingOutput::File => None,
    };

    let (file_layer, guard) = match logging.output {
        LoggingOutput::File | LoggingOutput::Both => {
            let log_dir = work_dir.join("logs");
            fs::create_dir_all(&log_dir)?;

            let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(env_filter(file_level));

            (Some(layer), Some(guard))
        }
        LoggingOutput::Console => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// Backend for the configured node. No connection is opened until the first call.
pub fn backend(network: &Network) -> Result<Lnd> {
    match network.backend {
        NetworkBackend::Lnd => {
            let mut dialer = LndDialer::new(
                network.address.clone(),
                network.cert_file.clone(),
                network.macaroon_file.clone(),
            )?;

            if let Some(limit) = network.max_msg_recv_size {
                dialer = dialer.with_max_msg_recv_size(limit);
            }

            tracing::debug!(
                node = %network.name,
                address = %network.address,
                capacity = network.pool_capacity,
                "Configured lnd backend"
            );

            Ok(Lnd::new(network.name.clone(), dialer, network.pool_config())?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_settings() {
        let network = Network {
            name: "alice".to_string(),
            ..Default::default()
        };

        let lnd = backend(&network).expect("valid settings");
        assert_eq!(lnd.pool().capacity(), 3);
        assert_eq!(lnd.pool().in_use(), 0);
    }

    #[test]
    fn test_backend_rejects_empty_pool() {
        let network = Network {
            pool_capacity: 0,
            ..Default::default()
        };

        assert!(backend(&network).is_err());
    }
}
