//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/regstat/regstat.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `REGSTAT_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the statistics service
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Delay before the single retry of a user-initiated reload
    pub reload_retry_delay_ms: u64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            reload_retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Cross-section year; newest available when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            year: None,
            color: true,
        }
    }
}

/// Unified configuration for regstat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub navigator: NavigatorConfig,
    pub display: DisplayConfig,
}

/// Get the XDG config directory for regstat.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "regstat").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("regstat.toml"))
}

/// Expand `~` and `$VAR` in a user supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; must exist
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), explicit)
    }

    /// Load with an explicit global config location (used by tests).
    pub fn load_from(global: Option<&Path>, explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let defaults = toml::to_string(&Settings::default()).map_err(|e| ApplicationError::Config {
            message: format!("serialize defaults: {e}"),
        })?;
        let mut builder = Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        if let Some(global_path) = global {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path.to_path_buf()).required(false));
            }
        }

        if let Some(path) = explicit {
            let path = expand_path(&path.to_string_lossy());
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("REGSTAT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.source.base_url = shellexpand::env(&settings.source.base_url)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| settings.source.base_url.clone());
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if !(self.source.base_url.starts_with("http://")
            || self.source.base_url.starts_with("https://"))
        {
            return Err(ApplicationError::Config {
                message: format!("source.base_url must be an http(s) URL: {}", self.source.base_url),
            });
        }
        if self.source.timeout_secs == 0 {
            return Err(ApplicationError::Config {
                message: "source.timeout_secs must be positive".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# regstat configuration
#
# Locations (by precedence, lowest to highest):
#   Global:   ~/.config/regstat/regstat.toml
#   Explicit: regstat --config <file>
#   Env:      REGSTAT_* environment variables, e.g. REGSTAT_SOURCE__BASE_URL

[source]
# Base URL of the statistics service
# base_url = "http://localhost:8000"

# Request timeout in seconds
# timeout_secs = 30

[navigator]
# Delay before the single retry of a reload
# reload_retry_delay_ms = 500

[display]
# Year of the cross-sectional view (default: newest year the service reports)
# year = 2023

# Colored terminal output
# color = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
