//! Configuration management for graphbridge services.
//!
//! Configuration is loaded from (in priority order):
//! 1. `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`
//! 2. Environment variables (`GRAPHBRIDGE__` prefix, `__` separator)
//! 3. Config file (`graphbridge.toml`, optional)
//! 4. Defaults
//!
//! Store credentials have no defaults: a missing URI, user, or password is a
//! startup error.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::BridgeError;

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

/// Connection settings for the graph store.
#[derive(Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Maximum pooled connections held by the driver.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Rows fetched per round trip when streaming results.
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Listener and per-call settings for the tool server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound for a single statement round trip.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8051
}

fn default_statement_timeout() -> u64 {
    30
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            statement_timeout_secs: default_statement_timeout(),
        }
    }
}

impl fmt::Debug for Neo4jSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jSettings")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("fetch_size", &self.fetch_size)
            .finish()
    }
}

impl ServerSettings {
    /// `host:port` for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

impl Settings {
    /// Load settings from `<file_prefix>.toml` and the environment.
    pub fn load(file_prefix: &str) -> Result<Self, BridgeError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GRAPHBRIDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("neo4j.uri", std::env::var("NEO4J_URI").ok())
            .and_then(|b| b.set_override_option("neo4j.user", std::env::var("NEO4J_USERNAME").ok()))
            .and_then(|b| {
                b.set_override_option("neo4j.password", std::env::var("NEO4J_PASSWORD").ok())
            })
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        let cfg = builder
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Self::from_config(cfg)
    }

    /// Deserialize and validate an already-built configuration.
    pub fn from_config(cfg: config::Config) -> Result<Self, BridgeError> {
        let settings: Settings = cfg
            .try_deserialize()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        settings.validate()?;
        tracing::debug!(uri = %settings.neo4j.uri, bind = %settings.server.bind_address(), "Settings loaded");
        Ok(settings)
    }

    /// Reject settings the process cannot start with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let mut missing = Vec::new();
        if self.neo4j.uri.trim().is_empty() {
            missing.push("neo4j.uri");
        }
        if self.neo4j.user.trim().is_empty() {
            missing.push("neo4j.user");
        }
        if self.neo4j.password.is_empty() {
            missing.push("neo4j.password");
        }
        if !missing.is_empty() {
            return Err(BridgeError::Config(format!(
                "missing required setting(s): {}",
                missing.join(", ")
            )));
        }
        if self.neo4j.max_connections == 0 {
            return Err(BridgeError::Config(
                "neo4j.max_connections must be at least 1".to_string(),
            ));
        }
        if self.server.statement_timeout_secs == 0 {
            return Err(BridgeError::Config(
                "server.statement_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
