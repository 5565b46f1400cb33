//! Bootstrap configuration
//!
//! Only what is needed before the database is open lives here: database
//! path, HTTP port and logging. Everything else is a runtime setting in the
//! `settings` table.
//!
//! Resolution priority, highest first:
//! 1. Command-line argument
//! 2. Environment variable (`ONAIR_DATABASE`, `ONAIR_PORT`)
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing or malformed TOML file is never fatal: it is reported with a
//! warning and the remaining sources are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "ONAIR_DATABASE";

/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "ONAIR_PORT";

/// Default HTTP port of the playout service
pub const DEFAULT_PORT: u16 = 5760;

/// Bootstrap configuration as written in the TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub database_path: PathBuf,
    pub port: u16,
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
    /// Explicit config file; replaces the platform search path
    pub config_file: Option<PathBuf>,
}

/// Applies the four-tier priority order to produce a `BootstrapConfig`
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    /// Resolve every bootstrap value
    pub fn resolve(&self, cli: &CliOverrides) -> BootstrapConfig {
        let toml_config = self.load_toml(cli.config_file.as_deref());

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| std::env::var(ENV_DATABASE).ok().map(PathBuf::from))
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(default_database_path);

        let port = cli
            .port
            .or_else(|| match std::env::var(ENV_PORT) {
                Ok(value) => match value.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("Ignoring invalid {}='{}'", ENV_PORT, value);
                        None
                    }
                },
                Err(_) => None,
            })
            .or(toml_config.port)
            .unwrap_or(DEFAULT_PORT);

        BootstrapConfig {
            database_path,
            port,
            logging: toml_config.logging,
        }
    }

    fn load_toml(&self, explicit: Option<&Path>) -> TomlConfig {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let Some(path) = path else {
            info!("{}: no config file found, using defaults", self.module_name);
            return TomlConfig::default();
        };

        match TomlConfig::load(&path) {
            Ok(config) => {
                info!("{}: loaded config from {}", self.module_name, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "{}: could not load config {} ({}), using defaults",
                    self.module_name,
                    path.display(),
                    e
                );
                TomlConfig::default()
            }
        }
    }
}

/// Platform config file search: user config dir, then `/etc/onair`
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("onair").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/onair/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("onair"))
        .unwrap_or_else(|| PathBuf::from("./onair_data"))
        .join("onair.db")
}
