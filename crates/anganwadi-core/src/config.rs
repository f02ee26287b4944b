//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! backend URL, the center this office works for, alternate spellings of
//! that center's name, and the last export directory.
//!
//! Configuration is stored at `~/.config/anganwadi/config.json`. The
//! `ANGANWADI_API_URL`, `ANGANWADI_CENTER` and `ANGANWADI_TOKEN` environment
//! variables take precedence for the current run and are never saved.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "anganwadi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

pub const DEFAULT_CENTER: &str = "Akkarakkunnu Anganwadi";

/// Spellings the registration service has used for the default center.
pub const DEFAULT_CENTER_ALIASES: &[&str] = &["Akkarakunnu Anganwadi", "Akkarakkunnu"];

pub const ENV_API_URL: &str = "ANGANWADI_API_URL";
pub const ENV_CENTER: &str = "ANGANWADI_CENTER";
pub const ENV_TOKEN: &str = "ANGANWADI_TOKEN";

/// Values taken from the environment for this run only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub api_base_url: Option<String>,
    pub center: Option<String>,
    pub token: Option<String>,
}

impl EnvOverrides {
    /// Read overrides through `lookup`; blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_base_url: get(ENV_API_URL),
            center: get(ENV_CENTER),
            token: get(ENV_TOKEN),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub center: Option<String>,
    pub center_aliases: Vec<String>,
    pub last_export_dir: Option<PathBuf>,
    #[serde(skip)]
    pub env: EnvOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            center: None,
            center_aliases: DEFAULT_CENTER_ALIASES.iter().map(|s| s.to_string()).collect(),
            last_export_dir: None,
            env: EnvOverrides::default(),
        }
    }
}

impl Config {
    /// Load from the config file, then attach environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.env = EnvOverrides::from_lookup(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save the file-backed settings. Environment overrides are not written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn api_base_url(&self) -> &str {
        self.env
            .api_base_url
            .as_deref()
            .or(self.api_base_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    pub fn center(&self) -> &str {
        self.env
            .center
            .as_deref()
            .or(self.center.as_deref())
            .unwrap_or(DEFAULT_CENTER)
    }

    pub fn token(&self) -> Option<&str> {
        self.env.token.as_deref()
    }

    /// Where exports go: the last used directory, else Downloads, else `.`.
    pub fn export_dir(&self) -> PathBuf {
        self.last_export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
