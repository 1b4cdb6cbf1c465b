//! Configuration for dashtree applications

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default bound on deferred units drained by one `run_pending`
pub const DEFAULT_MAX_DEFERRED_PER_FLUSH: usize = 10_000;

/// Application-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AppConfig {
    /// Whether `expose_events` makes a component's allow-list exhaustive
    pub strict_events: bool,

    /// Bound on deferred units drained by one `Application::run_pending`
    pub max_deferred_per_flush: usize,

    /// Convert listener panics into routed errors instead of unwinding
    pub catch_panics: bool,

    /// Log level for the `dt` binary (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strict_events: true,
            max_deferred_per_flush: DEFAULT_MAX_DEFERRED_PER_FLUSH,
            catch_panics: true,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Load config with fallback chain
    ///
    /// 1. Explicit path, if given (must exist)
    /// 2. `./dashtree.yml`
    /// 3. `<config_dir>/dashtree/dashtree.yml`
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "AppConfig::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let candidates = [
            Some(PathBuf::from("dashtree.yml")),
            dirs::config_dir().map(|p| p.join("dashtree").join("dashtree.yml")),
        ];
        for path in candidates.iter().flatten() {
            if path.exists() {
                debug!(path = %path.display(), "AppConfig::load: found config file");
                return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
            }
        }

        debug!("AppConfig::load: no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load config from a specific YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to a YAML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}
