//! nmtscope configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main nmtscope configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NmtScopeConfig {
    /// Report collection configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Report storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Report collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Path to the jcmd binary (bare names are resolved through PATH)
    pub jcmd: String,

    /// PID of the Java process to monitor (must be > 0)
    pub pid: i32,

    /// Seconds between collections (0 = disabled)
    pub interval_secs: u64,

    /// Seconds a single jcmd run may take before it is killed (0 = no limit)
    pub command_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            jcmd: "jcmd".to_string(),
            pid: -1,
            interval_secs: 10,
            command_timeout_secs: 30,
        }
    }
}

/// Report storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `nmt_<pid>_<ts>.txt` artifacts
    pub report_dir: PathBuf,

    /// Minutes a report is kept before queries evict it
    pub retention_minutes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            report_dir: PathBuf::from("/tmp/nmt"),
            retention_minutes: 60,
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.retention_minutes.saturating_mul(60))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
            cors_origins: Vec::new(),
        }
    }
}

impl NmtScopeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.collector.pid <= 0 {
            return Err(Error::Config(format!(
                "Invalid PID: {}",
                self.collector.pid
            )));
        }
        if self.collector.jcmd.trim().is_empty() {
            return Err(Error::Config("jcmd path must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
