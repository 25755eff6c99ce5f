use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result, bail};
use serde::{Deserialize, Serialize};

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    /// How long a built feed is served from memory, e.g. "5m".
    pub cache_duration: String,
    /// Upper bound of episodes requested from the providers.
    pub max_episodes: u32,
    /// Timeout for a single upstream request, e.g. "30s".
    pub request_timeout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            cache_duration: "5m".to_string(),
            max_episodes: 50,
            request_timeout: "30s".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("mediathek2rss").join("config.toml"))
    }

    /// Reads `path` if given. Otherwise the default location is used if a
    /// file exists there, and the built-in defaults if not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Create a default config file at the default location, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or_eyre("No config directory on this platform")?;
        Self::default().write_new(&path)?;
        Ok(path)
    }

    fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).wrap_err("Failed to serialize config")?;
        std::fs::write(path, contents)
            .wrap_err_with(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn cache_duration(&self) -> Result<Duration> {
        humantime::parse_duration(&self.cache_duration)
            .wrap_err_with(|| format!("Invalid cache_duration: {}", self.cache_duration))
    }

    pub fn request_timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.request_timeout)
            .wrap_err_with(|| format!("Invalid request_timeout: {}", self.request_timeout))
    }

    fn validate(&self) -> Result<()> {
        self.cache_duration()?;
        self.request_timeout()?;
        if self.max_episodes == 0 {
            bail!("max_episodes must be at least 1");
        }
        Ok(())
    }
}
