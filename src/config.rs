//! Node configuration.
//!
//! Defaults: a 10 ms access-check cadence against a 2 s task cadence,
//! a 4 s door hold, a 500 ms denial hold, and 5 s each for the
//! hardware settle delay and the authority login retry. Every field
//! can be overridden from a TOML file; absent fields keep their
//! defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Runtime configuration for one room node.
///
/// # Examples
///
/// ```
/// use gatenode::NodeConfig;
///
/// let config = NodeConfig::from_toml_str(r#"
///     authority_host = "10.0.0.5:8080"
///     door_open_secs = 6
/// "#).unwrap();
/// assert_eq!(config.authority_host, "10.0.0.5:8080");
/// assert_eq!(config.door_open_secs, 6);
/// // everything else keeps its default
/// assert_eq!(config.task_period_ms, 2000);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Authority endpoint, `host:port`.
    pub authority_host: String,
    /// Permanent login token exchanged for a session token.
    pub login_token: String,
    /// Path of the SQLite task database.
    pub db_path: PathBuf,
    /// Access-check cadence in milliseconds.
    pub access_period_ms: u64,
    /// Task cadence in milliseconds.
    pub task_period_ms: u64,
    /// How long the door stays unlocked on a granted access, seconds.
    pub door_open_secs: u64,
    /// How long the denial text stays on the display, milliseconds.
    pub deny_hold_ms: u64,
    /// Hardware settle delay before startup, seconds.
    pub settle_delay_secs: u64,
    /// Delay between failed authority login attempts, seconds.
    pub auth_retry_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            authority_host: "127.0.0.1:8080".to_string(),
            login_token: String::new(),
            db_path: PathBuf::from("tasks.sqlite"),
            access_period_ms: 10,
            task_period_ms: 2000,
            door_open_secs: 4,
            deny_hold_ms: 500,
            settle_delay_secs: 5,
            auth_retry_secs: 5,
        }
    }
}

impl NodeConfig {
    /// Parses a TOML document, falling back to defaults per field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        toml::from_str(toml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&raw)
    }

    /// Access-check cadence.
    pub fn access_period(&self) -> Duration {
        Duration::from_millis(self.access_period_ms)
    }

    /// Task cadence.
    pub fn task_period(&self) -> Duration {
        Duration::from_millis(self.task_period_ms)
    }

    /// Door hold on granted access.
    pub fn door_open(&self) -> Duration {
        Duration::from_secs(self.door_open_secs)
    }

    /// Denial display hold.
    pub fn deny_hold(&self) -> Duration {
        Duration::from_millis(self.deny_hold_ms)
    }

    /// Startup settle delay.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Login retry delay.
    pub fn auth_retry(&self) -> Duration {
        Duration::from_secs(self.auth_retry_secs)
    }
}
