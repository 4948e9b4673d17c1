//! Configuration module for polyql.
//!
//! Handles the settings file, environment variable expansion and the
//! client options derived from it.

mod settings;

pub use settings::{expand_env_vars, PoolSettings, Settings, SettingsError};
