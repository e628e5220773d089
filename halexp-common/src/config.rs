//! Configuration loading and config file resolution
//!
//! The harness reads a single TOML file. Its location is resolved in
//! priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`HALEXP_CONFIG`)
//! 3. Per-user config directory (`~/.config/halexp/<module>.toml`)
//! 4. None: compiled defaults are used
//!
//! A missing or absent file is not fatal: a warning is logged and the
//! compiled defaults apply.

use crate::types::{HitsPolicy, QueryMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HALEXP_CONFIG";

/// Profile search URL used to link author results; `{id}` is replaced by the
/// author's HAL person identifier.
pub const DEFAULT_PROFILE_URL_TEMPLATE: &str =
    "https://sciencespo.hal.science/search/index/?q=%2A&rows=30&sort=producedDate_tdate+desc&authIdPerson_i={id}";

/// Ranking metrics understood by the search service
pub const KNOWN_METRICS: [&str; 5] = ["mean", "sigmoid", "sigmoid-mean", "median", "log-mean"];

/// Complete harness configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HarnessConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub defaults: AxisDefaults,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream search service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    /// Template for author profile links (`{id}` placeholder)
    #[serde(default = "default_profile_url_template")]
    pub profile_url_template: String,

    /// Whether request URLs include the `hits` parameter
    #[serde(default)]
    pub hits: HitsPolicy,

    /// Per-request timeout in seconds; absent means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            profile_url_template: default_profile_url_template(),
            hits: HitsPolicy::default(),
            request_timeout_secs: None,
        }
    }
}

/// Axis values used when the caller supplies none
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AxisDefaults {
    #[serde(default)]
    pub instances: Vec<String>,
    #[serde(default = "default_min_years")]
    pub min_years: Vec<String>,
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<String>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub query_mode: QueryMode,
    #[serde(default = "default_result_count")]
    pub result_count: usize,
    /// Reject malformed numeric axis values instead of passing `NaN` upstream
    #[serde(default)]
    pub strict_axes: bool,
}

impl Default for AxisDefaults {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            min_years: default_min_years(),
            thresholds: default_thresholds(),
            metrics: default_metrics(),
            query_mode: QueryMode::default(),
            result_count: default_result_count(),
            strict_axes: false,
        }
    }
}

/// HTTP API bind settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Event bus capacity; must exceed the largest configuration space or
    /// SSE clients lag and miss row updates
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_profile_url_template() -> String {
    DEFAULT_PROFILE_URL_TEMPLATE.to_string()
}

fn default_min_years() -> Vec<String> {
    vec!["2015".to_string()]
}

fn default_thresholds() -> Vec<String> {
    vec!["0.5".to_string()]
}

fn default_metrics() -> Vec<String> {
    vec!["mean".to_string()]
}

fn default_result_count() -> usize {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_event_capacity() -> usize {
    1024
}

/// Events per run beyond one `RowUpdated` per configuration
/// (`RunStarted`, `RunCompleted` and two `BusyChanged`)
const EVENTS_PER_RUN_OVERHEAD: usize = 4;

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves which config file (if any) a module should read
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    module_name: String,
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for the named module (used for the per-user file name)
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_path: None,
        }
    }

    /// Attach an explicit path from the command line
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Resolve the config file path following the priority order
    ///
    /// Returns `None` when no tier yields a path, meaning compiled defaults apply.
    pub fn resolve(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config directory, only if the file exists
        self.user_config_path().filter(|p| p.exists())
    }

    /// Per-user config file location for this module
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir().map(|d| {
            d.join("halexp")
                .join(format!("{}.toml", self.module_name))
        })
    }
}

impl HarnessConfig {
    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the resolver, falling back to defaults
    ///
    /// A resolved path that does not exist only warns. A file that exists
    /// but fails to parse is an error: silently ignoring a typo would run the
    /// sweep with unexpected parameters.
    pub fn load(resolver: &ConfigResolver) -> Result<Self> {
        match resolver.resolve() {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                info!("No config file configured, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !self.upstream.profile_url_template.contains("{id}") {
            return Err(Error::Config(
                "upstream.profile_url_template must contain an {id} placeholder".to_string(),
            ));
        }
        if self.upstream.request_timeout_secs == Some(0) {
            return Err(Error::Config(
                "upstream.request_timeout_secs must be positive when set".to_string(),
            ));
        }
        if self.server.event_capacity == 0 {
            return Err(Error::Config(
                "server.event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Event bus capacity able to hold a whole run of `configurations`
    pub fn event_capacity_for(&self, configurations: usize) -> usize {
        self.server
            .event_capacity
            .max(configurations + EVENTS_PER_RUN_OVERHEAD)
    }
}

/// Serialize a config back to TOML (used by `halexp-tester config`)
pub fn to_toml_string(config: &HarnessConfig) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))
}
