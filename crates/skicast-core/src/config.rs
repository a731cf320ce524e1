use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skicast_engine::{
    DaySelector, LoaderConfig, RankingRequest, RetryPolicy, Selection, SortCriterion,
};
use skicast_forecast::provider::{DEFAULT_TIMEOUT_SECS, USER_AGENT};
use skicast_forecast::{ElevationBand, ResortCatalog, ResortId};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Forecasts cover six days; anything past that has no data.
const FORECAST_DAYS: usize = 6;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where forecasts come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Retry and prefetch timing
    #[serde(default)]
    pub loader: LoaderSettings,

    /// Last used selection and display settings
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the forecast service
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    USER_AGENT.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Pause before the single foreground retry (default: 100)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause between background prefetches (default: 50)
    #[serde(default = "default_background_delay_ms")]
    pub background_delay_ms: u64,

    /// Warm the cache with unselected resorts (default: true)
    #[serde(default = "default_background_prefetch")]
    pub background_prefetch: bool,
}

fn default_retry_delay_ms() -> u64 {
    skicast_engine::retry::DEFAULT_RETRY_DELAY_MS
}

fn default_background_delay_ms() -> u64 {
    skicast_engine::loader::DEFAULT_BACKGROUND_DELAY_MS
}

fn default_background_prefetch() -> bool {
    true
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            background_delay_ms: default_background_delay_ms(),
            background_prefetch: default_background_prefetch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_selected_resorts")]
    pub selected_resorts: Vec<ResortId>,

    #[serde(default)]
    pub elevation: ElevationBand,

    #[serde(default)]
    pub sort: SortCriterion,

    #[serde(default)]
    pub sort_day: DaySelector,

    #[serde(default)]
    pub reverse: bool,
}

fn default_selected_resorts() -> Vec<ResortId> {
    ResortCatalog::default().default_selection()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_resorts: default_selected_resorts(),
            elevation: ElevationBand::default(),
            sort: SortCriterion::default(),
            sort_day: DaySelector::default(),
            reverse: false,
        }
    }
}

impl Preferences {
    pub fn ranking(&self) -> RankingRequest {
        RankingRequest {
            criterion: self.sort,
            day: self.sort_day,
            reverse: self.reverse,
        }
    }

    pub fn selection(&self, catalog: &ResortCatalog) -> Selection {
        Selection::new(catalog, self.selected_resorts.iter().cloned())
    }

    /// Override preferences from `SKICAST_*` variables looked up via `var`.
    ///
    /// Recognised: `SKICAST_ELEVATION`, `SKICAST_SORT`, `SKICAST_SORT_DAY`,
    /// `SKICAST_REVERSE` and `SKICAST_RESORTS` (comma separated).
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<(), ConfigError> {
        if let Some(value) = var("SKICAST_ELEVATION") {
            self.elevation = value.parse()?;
        }
        if let Some(value) = var("SKICAST_SORT") {
            self.sort = value.parse()?;
        }
        if let Some(value) = var("SKICAST_SORT_DAY") {
            self.sort_day = value.parse()?;
        }
        if let Some(value) = var("SKICAST_REVERSE") {
            self.reverse = match value.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "SKICAST_REVERSE must be true or false, got: {other}"
                    )))
                }
            };
        }
        if let Some(value) = var("SKICAST_RESORTS") {
            self.selected_resorts = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ResortId::from)
                .collect();
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.source.base_url, "source.base_url", &mut result);

        if self.source.timeout_secs == 0 {
            result.add_error("source.timeout_secs", "Timeout must be greater than 0");
        } else if self.source.timeout_secs > 120 {
            result.add_warning("source.timeout_secs", "Timeout is unusually long (>120s)");
        }

        if self.source.user_agent.trim().is_empty() {
            result.add_warning("source.user_agent", "User agent is empty");
        }

        if self.loader.retry_delay_ms > 10_000 {
            result.add_warning(
                "loader.retry_delay_ms",
                "Retry delay is more than 10 seconds",
            );
        }

        if self.loader.background_delay_ms == 0 && self.loader.background_prefetch {
            result.add_warning(
                "loader.background_delay_ms",
                "Background prefetch runs without pause (0 ms)",
            );
        }

        let catalog = ResortCatalog::default();
        let unknown: Vec<&str> = self
            .preferences
            .selected_resorts
            .iter()
            .filter(|id| !catalog.contains(id))
            .map(ResortId::as_str)
            .collect();
        if !unknown.is_empty() {
            result.add_warning(
                "preferences.selected_resorts",
                format!("Unknown resorts will be ignored: {}", unknown.join(", ")),
            );
        }

        if self.preferences.selected_resorts.is_empty() {
            result.add_warning("preferences.selected_resorts", "No resorts selected");
        }

        if let DaySelector::Day(index) = self.preferences.sort_day {
            if index >= FORECAST_DAYS {
                result.add_warning(
                    "preferences.sort_day",
                    format!("Day {index} is past the forecast range; all resorts will tie"),
                );
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Engine loader settings derived from this config
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            foreground_retry: RetryPolicy::foreground(Duration::from_millis(
                self.loader.retry_delay_ms,
            )),
            background_delay: Duration::from_millis(self.loader.background_delay_ms),
            background_prefetch: self.loader.background_prefetch,
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skicast");

        Ok(config_dir.join("config.toml"))
    }
}
