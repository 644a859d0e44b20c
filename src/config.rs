//! Configuration file handling.
//!
//! Settings come from a TOML file, then environment variables override
//! individual keys.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/nixsearch/config.toml`
//! - macOS: `~/Library/Application Support/nixsearch/config.toml`
//! - Windows: `%APPDATA%\nixsearch\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! release_url = "https://github.com/anotherhadi/nix-json/releases/latest/download/"
//! port = 8090
//! index_path = "/var/lib/nixsearch/index.json"
//! refresh_interval = "12h"
//! per_page = 20
//! ```
//!
//! # Environment
//!
//! | Variable | Key |
//! |----------|-----|
//! | `RELEASE_URL` | `release_url` |
//! | `PORT` | `port` |
//! | `INDEX_PATH` | `index_path` |
//! | `INDEX_INTERVAL` | `refresh_interval` |

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RELEASE_URL: &str =
    "https://github.com/anotherhadi/nix-json/releases/latest/download/";

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use nixsearch::Config;
///
/// let config = Config::load()?.apply_env()?;
/// println!("Listening on port {}", config.port);
/// println!("Refreshing every {:?}", config.refresh_interval()?);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the release holding the upstream dumps.
    pub release_url: String,

    /// HTTP port for `nixsearch serve`.
    ///
    /// Default: 8090
    pub port: u16,

    /// Where the index snapshot is written and read back on start.
    pub index_path: PathBuf,

    /// Time between scheduled refreshes, e.g. `"12h"` or `"1h30m"`.
    pub refresh_interval: String,

    /// Default page size of `/search`.
    pub per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release_url: DEFAULT_RELEASE_URL.to_string(),
            port: 8090,
            index_path: Self::default_index_path(),
            refresh_interval: "12h".to_string(),
            per_page: 20,
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up by environment variable name.
    ///
    /// Empty values are ignored. The interval is validated here so a bad
    /// value fails at startup rather than at the first refresh.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = lookup("RELEASE_URL") {
            self.release_url = url;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT: {port}"))?;
        }
        if let Some(path) = lookup("INDEX_PATH") {
            self.index_path = PathBuf::from(path);
        }
        if let Some(interval) = lookup("INDEX_INTERVAL") {
            self.refresh_interval = interval;
        }

        self.refresh_interval()
            .context("invalid refresh interval")?;
        Ok(self)
    }

    /// The refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Result<Duration> {
        parse_interval(&self.refresh_interval)
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nixsearch")
            .join("config.toml")
    }

    pub fn default_index_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nixsearch")
            .join("index.json")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Parses durations like `90s`, `15m`, `12h`, `2d` or `1h30m`.
pub fn parse_interval(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text.is_empty() {
        bail!("empty interval");
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            bail!("expected a number before '{c}' in {text:?}");
        }
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => bail!("unknown unit '{c}' in {text:?}"),
        };
        let amount: u64 = digits.parse()?;
        total = amount
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(Duration::from_secs(seconds)))
            .ok_or_else(|| anyhow!("interval {text:?} is too large"))?;
        digits.clear();
    }
    if !digits.is_empty() {
        bail!("missing unit after {digits} in {text:?}");
    }
    if total.is_zero() {
        bail!("interval must be positive");
    }
    Ok(total)
}
