//! TOML-based configuration for polyql.
//!
//! Supports a config file (polyql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! client = "pg"
//! connection = "${DATABASE_URL}"
//! use_null_as_default = false
//! acquire_connection_timeout_ms = 60000
//! time_zone = "local"
//! log_sql = true
//! debug = false
//!
//! [pool]
//! min = 2
//! max = 10
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::ClientOptions;
use crate::sql::escape::TimeZone;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Client name (`pg`, `mysql2`, `sqlite3`, ...). Required to build a client.
    pub client: Option<String>,

    /// Connection string handed to the driver (supports `${ENV_VAR}` expansion).
    pub connection: Option<String>,

    /// Fill missing insert columns with `NULL` instead of `DEFAULT`.
    pub use_null_as_default: bool,

    /// Upper bound on waiting for a pooled connection, in milliseconds.
    pub acquire_connection_timeout_ms: u64,

    /// `local` or a fixed offset such as `+02:00`.
    pub time_zone: String,

    /// Emit `debug!` events for compiled SQL.
    pub log_sql: bool,

    /// Include interpolated values in execution events.
    pub debug: bool,

    /// Connection pool settings.
    pub pool: PoolSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client: None,
            connection: None,
            use_null_as_default: false,
            acquire_connection_timeout_ms: 60_000,
            time_zone: "local".to_string(),
            log_sql: true,
            debug: false,
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PoolSettings {
    /// Connections kept open when idle.
    pub min: u32,

    /// Maximum number of open connections.
    pub max: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { min: 2, max: 10 }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse settings from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `POLYQL_CONFIG`
    /// 2. `./polyql.toml`
    /// 3. `~/.config/polyql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("POLYQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("polyql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("polyql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.pool.max == 0 {
            return Err(SettingsError::InvalidConfig(
                "pool.max must be at least 1".to_string(),
            ));
        }
        if self.pool.min > self.pool.max {
            return Err(SettingsError::InvalidConfig(format!(
                "pool.min ({}) is larger than pool.max ({})",
                self.pool.min, self.pool.max
            )));
        }
        self.parsed_time_zone()?;
        Ok(())
    }

    fn parsed_time_zone(&self) -> Result<TimeZone, SettingsError> {
        TimeZone::parse(&self.time_zone).ok_or_else(|| {
            SettingsError::InvalidConfig(format!("Invalid time_zone: {}", self.time_zone))
        })
    }

    /// Connection string with environment variables expanded.
    pub fn resolved_connection(&self) -> Result<Option<String>, SettingsError> {
        self.connection.as_deref().map(expand_env_vars).transpose()
    }

    pub fn acquire_connection_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_connection_timeout_ms)
    }

    /// Compiler and executor options described by these settings.
    pub fn client_options(&self) -> Result<ClientOptions, SettingsError> {
        Ok(ClientOptions {
            use_null_as_default: self.use_null_as_default,
            log_sql: self.log_sql,
            debug: self.debug,
            time_zone: self.parsed_time_zone()?,
            acquire_connection_timeout: self.acquire_connection_timeout(),
            ..ClientOptions::default()
        })
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. A lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        if braced {
            while let Some(ch) = chars.next_if(|ch| *ch != '}') {
                var_name.push(ch);
            }
            if chars.next().is_none() {
                return Err(SettingsError::InvalidConfig(format!(
                    "Unterminated variable reference: ${{{}",
                    var_name
                )));
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
