//! Server configuration.
//!
//! Settings come from an optional TOML file, then the `BIND_ADDR` and
//! `PORT` environment variables override the listen address. A missing
//! file means defaults: listen on `127.0.0.1:5001` and run `tabula-java`
//! from `tabula.jar` for both engines.
//!
//! ```toml
//! bind_addr = "0.0.0.0"
//! port = 5001
//! max_upload_bytes = 52428800
//!
//! [engines.primary]
//! program = "java"
//! args = ["-jar", "/opt/tabula.jar", "--lattice", "--pages", "all", "--format", "JSON", "{pdf}"]
//!
//! [engines.secondary]
//! program = "java"
//! args = ["-jar", "/opt/tabula.jar", "--stream", "--guess", "--pages", "all", "--format", "JSON", "{pdf}"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use statement_tables_pdf::command::{CommandEngineConfig, DEFAULT_TABULA_JAR};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "STATEMENT_TABLES_CONFIG";

/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "statement_tables.toml";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ServerConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
    /// Engine programs.
    pub engines: EnginesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            engines: EnginesConfig::default(),
        }
    }
}

/// Programs for the primary and secondary engines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    /// Ruled-table engine, tried first.
    pub primary: CommandEngineConfig,
    /// Borderless-table engine, tried when the primary finds nothing.
    pub secondary: CommandEngineConfig,
}

impl Default for EnginesConfig {
    fn default() -> Self {
        Self {
            primary: CommandEngineConfig::tabula_lattice(DEFAULT_TABULA_JAR),
            secondary: CommandEngineConfig::tabula_stream(DEFAULT_TABULA_JAR),
        }
    }
}

impl ServerConfig {
    /// Parses a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads the file at `path`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        log::info!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Applies `BIND_ADDR`/`PORT` style overrides. An unparseable port is
    /// ignored with a warning.
    #[must_use]
    pub fn with_overrides(mut self, bind_addr: Option<String>, port: Option<String>) -> Self {
        if let Some(addr) = bind_addr.filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr;
        }
        if let Some(raw) = port {
            match raw.trim().parse() {
                Ok(port) => self.port = port,
                Err(e) => log::warn!("Ignoring invalid PORT '{raw}': {e}"),
            }
        }
        self
    }
}

/// Loads configuration from the file named by [`CONFIG_PATH_ENV`] (or
/// [`DEFAULT_CONFIG_PATH`]) and applies environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError`] if the config file exists but is unreadable or
/// invalid.
pub fn load() -> Result<ServerConfig, ConfigError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    Ok(ServerConfig::load_from(&path)?
        .with_overrides(std::env::var("BIND_ADDR").ok(), std::env::var("PORT").ok()))
}
