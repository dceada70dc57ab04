//! Profile storage for connection settings.
//!
//! Profiles live in a TOML file, one table per profile:
//!
//! ```toml
//! [default]
//! token = "..."
//! space = "dev-space"
//! account = "acme"   # optional
//! ```
//!
//! The file defaults to `~/.torque/config.toml` and can be relocated with
//! `TORQUE_CONFIG_PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_PROFILE: &str = "default";

/// One named connection profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub token: String,
    pub space: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

/// Reads and rewrites the profile file.
#[derive(Debug)]
pub struct ConfigProvider {
    path: PathBuf,
}

impl ConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Provider at the default location (`TORQUE_CONFIG_PATH` wins).
    pub fn from_default_location() -> Self {
        Self::new(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("TORQUE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        match dirs::home_dir() {
            Some(home) => home.join(".torque").join("config.toml"),
            None => PathBuf::from("config.toml"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All profiles in file order.
    pub fn load_all(&self) -> Result<Vec<(String, Profile)>, ConfigError> {
        let table = self.read_table()?;
        let mut profiles = Vec::with_capacity(table.len());
        for (name, value) in table {
            profiles.push((name.clone(), parse_profile(&name, value)?));
        }
        Ok(profiles)
    }

    /// One profile by name.
    pub fn load_profile(&self, name: &str) -> Result<Profile, ConfigError> {
        let mut table = self.read_table()?;
        match table.remove(name) {
            Some(value) => parse_profile(name, value),
            None => Err(ConfigError::UnknownProfile(name.to_string())),
        }
    }

    /// Insert or replace a profile and rewrite the file. A missing or
    /// unreadable file starts from scratch, so setup works on first run.
    pub fn save_profile(&self, name: &str, profile: &Profile) -> Result<(), ConfigError> {
        let mut table = self.read_table().unwrap_or_default();
        let value = toml::Value::try_from(profile)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        table.insert(name.to_string(), value);
        self.write_table(&table)
    }

    /// Drop a profile and rewrite the file. Removing an unknown profile is a
    /// no-op; a missing file is an error.
    pub fn remove_profile(&self, name: &str) -> Result<(), ConfigError> {
        let mut table = self.read_table()?;
        if table.remove(name).is_none() {
            tracing::debug!("profile '{}' not present, nothing to remove", name);
            return Ok(());
        }
        self.write_table(&table)
    }

    fn read_table(&self) -> Result<toml::Table, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::FileMissing);
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(table).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

fn parse_profile(name: &str, value: toml::Value) -> Result<Profile, ConfigError> {
    let Some(section) = value.as_table() else {
        return Err(ConfigError::Malformed(format!("profile '{name}' is not a table")));
    };

    // Token and space must appear together; account is optional.
    let token = required_key(name, section, "token")?;
    let space = required_key(name, section, "space")?;
    let account = section.get("account").and_then(|v| v.as_str()).map(str::to_string);

    Ok(Profile { token, space, account })
}

fn required_key(
    profile: &str,
    section: &toml::Table,
    key: &str,
) -> Result<String, ConfigError> {
    section
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::IncompleteProfile {
            profile: profile.to_string(),
            key: key.to_string(),
        })
}
