//! TOML-based application configuration.
//!
//! Stores the user profile the sequence core needs at session start:
//! the user id the records are keyed by and the IANA timezone that
//! defines the local day. Missing timezone falls back to "UTC".
//!
//! Configuration is stored at `~/.config/bookend/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

/// User profile configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// IANA timezone identifier, e.g. "America/New_York".
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            timezone: default_timezone(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/bookend/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, creating the default file on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let cfg = Self::default();
            cfg.save()?;
            Ok(cfg)
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        json: &'a serde_json::Value,
        path: &str,
    ) -> Option<&'a serde_json::Value> {
        let mut current = json;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        json: &mut serde_json::Value,
        path: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut current = json;
        let parts: Vec<&str> = path.split('.').collect();
        for part in &parts[..parts.len() - 1] {
            current = current
                .get_mut(*part)
                .ok_or_else(|| format!("unknown config key: {path}"))?;
        }
        let last = parts.last().ok_or("empty config key")?;
        let slot = current
            .get_mut(*last)
            .ok_or_else(|| format!("unknown config key: {path}"))?;
        *slot = match slot {
            serde_json::Value::String(_) => serde_json::Value::String(value.to_string()),
            serde_json::Value::Bool(_) => serde_json::Value::Bool(value.parse()?),
            serde_json::Value::Number(_) => {
                serde_json::Value::Number(value.parse::<i64>()?.into())
            }
            _ => return Err(format!("unsupported config key type: {path}").into()),
        };
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
