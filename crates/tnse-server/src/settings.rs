//! Server settings.
//!
//! Layered as defaults, then an optional file, then `TNSE_*` environment
//! variables (e.g. `TNSE_PORT=9000`, `TNSE_BILL_DIR=/srv/bills`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings of the HTTP action surface.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory where downloaded bills are written.
    pub bill_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Cooldown between explicitly requested refreshes.
    pub request_cooldown_secs: u64,
}

impl Settings {
    /// Loads settings, reading `file` first when given.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be parsed, or a value has the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8099)?
            .set_default("bill_dir", "www/tns_energo")?
            .set_default("log_filter", "info")?
            .set_default("request_cooldown_secs", 5)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix("TNSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Returns the refresh request cooldown.
    pub fn request_cooldown(&self) -> Duration {
        Duration::from_secs(self.request_cooldown_secs)
    }
}
