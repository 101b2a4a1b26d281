//! Application configuration: TOML file, CLI/env overrides, defaults

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_CORS_ORIGINS, DEFAULT_KEEPALIVE_SECS, DEFAULT_NETWORK,
    DEFAULT_OBSERVER_BUFFER,
};
use crate::tools::{AccountContext, AccountError, ToolService};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Invalid connection string: {0}")]
    Account(#[from] AccountError),
}

// ============================================================================
// TOML File Layout
// ============================================================================

/// Contents of the optional TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub services: ServicesSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind_address: Option<String>,
    pub network: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    /// 0 disables the per-call timeout
    pub call_timeout_secs: Option<u64>,
    pub keepalive_secs: Option<u64>,
    pub observer_buffer: Option<usize>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesSection {
    pub primary: ServiceSection,
    pub dependent: ServiceSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    pub endpoint: Option<String>,
    pub tool_name: Option<String>,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}

// ============================================================================
// CLI / Environment Overrides
// ============================================================================

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub connection_string: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub network: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub call_timeout_secs: Option<u64>,
    pub keepalive_secs: Option<u64>,
    pub observer_buffer: Option<usize>,
    pub static_dir: Option<PathBuf>,
    pub primary_endpoint: Option<String>,
    pub dependent_endpoint: Option<String>,
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind address (e.g., "0.0.0.0:3001")
    pub bind_address: String,
    /// Account connection string shared by all tool services
    pub connection_string: String,
    pub network: String,
    pub cors_origins: Vec<String>,
    /// Per tool call limit; None waits indefinitely
    pub call_timeout: Option<Duration>,
    pub keep_alive: Duration,
    /// Frames buffered per observer
    pub observer_buffer: usize,
    /// Directory served as the frontend, with `index.html` fallback
    pub static_dir: Option<PathBuf>,
    pub primary: ServiceSection,
    pub dependent: ServiceSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            connection_string: String::new(),
            network: DEFAULT_NETWORK.to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| (*s).to_string()).collect(),
            call_timeout: None,
            keep_alive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
            static_dir: None,
            primary: ServiceSection::default(),
            dependent: ServiceSection::default(),
        }
    }
}

impl AppConfig {
    /// Load the optional file, apply overrides, and validate.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => {
                let file = FileConfig::load(path)?;
                info!(path = %path.display(), "Loaded config file");
                file
            }
            None => FileConfig::default(),
        };

        let config = Self::resolve(file, overrides);
        config.validate()?;
        Ok(config)
    }

    /// Layer file values and overrides on top of the defaults.
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let mut config = Self::default();
        let server = file.server;

        // Bind address: --bind-address > --port (keeps the configured host) > file
        config.bind_address = match (overrides.bind_address, overrides.port) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let base = server.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS);
                let host = base.rsplit_once(':').map_or(base, |(host, _)| host);
                format!("{host}:{port}")
            }
            (None, None) => server
                .bind_address
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
        };

        if let Some(s) = overrides.connection_string {
            config.connection_string = s;
        }
        if let Some(network) = overrides.network.or(server.network) {
            config.network = network;
        }
        if let Some(origins) = overrides.cors_origins.or(server.cors_origins) {
            config.cors_origins = origins;
        }
        config.call_timeout = overrides
            .call_timeout_secs
            .or(server.call_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        if let Some(secs) = overrides.keepalive_secs.or(server.keepalive_secs) {
            config.keep_alive = Duration::from_secs(secs);
        }
        if let Some(n) = overrides.observer_buffer.or(server.observer_buffer) {
            config.observer_buffer = n;
        }
        config.static_dir = overrides.static_dir.or(server.static_dir);

        config.primary = file.services.primary;
        config.dependent = file.services.dependent;
        if let Some(endpoint) = overrides.primary_endpoint {
            config.primary.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = overrides.dependent_endpoint {
            config.dependent.endpoint = Some(endpoint);
        }

        config
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.connection_string.trim().is_empty() {
            errors.push("connection string is not set (ATXP_CONNECTION_STRING)".to_string());
        }
        let port_ok = self
            .bind_address
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !port_ok {
            errors.push(format!("bind address `{}` is not HOST:PORT", self.bind_address));
        }
        if self.observer_buffer == 0 {
            errors.push("observer_buffer must be at least 1".to_string());
        }
        if self.keep_alive.is_zero() {
            errors.push("keepalive_secs must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Parse the connection string into an account context.
    pub fn account(&self) -> Result<AccountContext, ConfigError> {
        Ok(AccountContext::from_connection_string(
            &self.connection_string,
            &self.network,
        )?)
    }

    /// Service producing the primary artifact
    pub fn primary_service(&self) -> ToolService {
        apply_tool_name(
            ToolService::image(self.primary.endpoint.as_deref()),
            &self.primary,
        )
    }

    /// Best-effort service enriching the primary artifact
    pub fn dependent_service(&self) -> ToolService {
        apply_tool_name(
            ToolService::filestore(self.dependent.endpoint.as_deref()),
            &self.dependent,
        )
    }
}

fn apply_tool_name(service: ToolService, section: &ServiceSection) -> ToolService {
    match &section.tool_name {
        Some(name) => service.with_tool_name(name.clone()),
        None => service,
    }
}
