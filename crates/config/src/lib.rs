//! Configuration management for EnviroLLM
//!
//! Settings are loaded from an optional TOML file and can be overridden per
//! key through `ENVIROLLM_*` environment variables. Every getter is typed and
//! returns an error for missing or mistyped keys, so call sites pick their own
//! defaults with `unwrap_or_else`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use common::error::{Error, Result};

/// Environment variable naming the configuration file
const CONFIG_PATH_ENV: &str = "ENVIROLLM_CONFIG";

/// Default configuration file, relative to the working directory
const DEFAULT_CONFIG_FILE: &str = "envirollm.toml";

/// Prefix for per-key environment overrides
const ENV_PREFIX: &str = "ENVIROLLM_";

/// Configuration manager backed by a TOML table with env overrides
pub struct ConfigManager {
    /// Parsed configuration values
    values: RwLock<toml::value::Table>,
}

impl ConfigManager {
    /// Creates a configuration manager from the default locations
    ///
    /// Reads the file named by `ENVIROLLM_CONFIG`, falling back to
    /// `envirollm.toml` in the working directory. A missing file is not an
    /// error; all keys then resolve from the environment or call-site
    /// defaults.
    pub fn new() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        if path.exists() {
            Self::from_file(&path)
        } else {
            debug!("No configuration file at {:?}, using defaults", path);
            Ok(Self {
                values: RwLock::new(toml::value::Table::new()),
            })
        }
    }

    /// Creates a configuration manager from a specific TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let values: toml::value::Table = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("failed to parse {:?}: {}", path, e)))?;

        info!("Loaded {} configuration keys from {:?}", values.len(), path);

        Ok(Self {
            values: RwLock::new(values),
        })
    }

    /// Sets a value, replacing any file-provided one
    pub fn set(&self, key: &str, value: toml::Value) {
        self.values.write().insert(key.to_string(), value);
    }

    /// Resolves a key: environment override first, then the file table
    fn lookup(&self, key: &str) -> Option<toml::Value> {
        let env_key = format!("{}{}", ENV_PREFIX, key.to_uppercase());
        if let Ok(raw) = std::env::var(&env_key) {
            return Some(parse_env_value(raw));
        }
        self.values.read().get(key).cloned()
    }

    /// Gets a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.lookup(key) {
            Some(toml::Value::String(s)) => Ok(s),
            Some(other) => Ok(other.to_string()),
            None => Err(Error::Config(format!("missing key: {}", key))),
        }
    }

    /// Gets a path value
    pub fn get_path(&self, key: &str) -> Result<PathBuf> {
        self.get_string(key).map(PathBuf::from)
    }

    /// Gets a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.lookup(key) {
            Some(toml::Value::Boolean(b)) => Ok(b),
            Some(other) => Err(Error::Config(format!("key {} is not a bool: {}", key, other))),
            None => Err(Error::Config(format!("missing key: {}", key))),
        }
    }

    /// Gets an integer value
    fn get_integer(&self, key: &str) -> Result<i64> {
        match self.lookup(key) {
            Some(toml::Value::Integer(i)) => Ok(i),
            Some(other) => Err(Error::Config(format!(
                "key {} is not an integer: {}",
                key, other
            ))),
            None => Err(Error::Config(format!("missing key: {}", key))),
        }
    }

    /// Gets a u16 value
    pub fn get_u16(&self, key: &str) -> Result<u16> {
        let value = self.get_integer(key)?;
        u16::try_from(value)
            .map_err(|_| Error::Config(format!("key {} out of range for u16: {}", key, value)))
    }

    /// Gets a u32 value
    pub fn get_u32(&self, key: &str) -> Result<u32> {
        let value = self.get_integer(key)?;
        u32::try_from(value)
            .map_err(|_| Error::Config(format!("key {} out of range for u32: {}", key, value)))
    }

    /// Gets a u64 value
    pub fn get_u64(&self, key: &str) -> Result<u64> {
        let value = self.get_integer(key)?;
        u64::try_from(value)
            .map_err(|_| Error::Config(format!("key {} out of range for u64: {}", key, value)))
    }

    /// Gets a usize value
    pub fn get_usize(&self, key: &str) -> Result<usize> {
        let value = self.get_integer(key)?;
        usize::try_from(value)
            .map_err(|_| Error::Config(format!("key {} out of range for usize: {}", key, value)))
    }

    /// Gets a float value
    pub fn get_f64(&self, key: &str) -> Result<f64> {
        match self.lookup(key) {
            Some(toml::Value::Float(f)) => Ok(f),
            Some(toml::Value::Integer(i)) => Ok(i as f64),
            Some(other) => Err(Error::Config(format!("key {} is not a float: {}", key, other))),
            None => Err(Error::Config(format!("missing key: {}", key))),
        }
    }

    /// Gets a duration value, stored as whole seconds
    pub fn get_duration(&self, key: &str) -> Result<Duration> {
        self.get_u64(key).map(Duration::from_secs)
    }
}

/// Maps an environment override to the closest TOML value type
fn parse_env_value(raw: String) -> toml::Value {
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    toml::Value::String(raw)
}
