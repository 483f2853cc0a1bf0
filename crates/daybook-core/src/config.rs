use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "DAYBOOK_GOOGLE_API_KEY";

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const VIEW_NAMES: [&str; 3] = ["dayGridMonth", "timeGridWeek", "timeGridDay"];

/// Country codes that have a public holiday calendar.
pub const HOLIDAY_COUNTRIES: [&str; 9] = ["vn", "us", "jp", "in", "fr", "de", "uk", "cn", "sg"];

/// Country used when a configured code has no holiday calendar.
pub const FALLBACK_COUNTRY: &str = "vn";

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

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Calendar display settings
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Public holiday import
    #[serde(default)]
    pub holidays: HolidayConfig,

    /// Recurrence expansion defaults
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// IANA time zone that defines calendar days (e.g. "Asia/Ho_Chi_Minh")
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Initial view: dayGridMonth, timeGridWeek or timeGridDay
    #[serde(default = "default_view")]
    pub default_view: String,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_view() -> String {
    "dayGridMonth".to_string()
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            default_view: default_view(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    /// Google API key. Falls back to `DAYBOOK_GOOGLE_API_KEY` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Country codes whose public holidays are imported
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,

    /// Page size requested from the events endpoint
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Calendar API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_countries() -> Vec<String> {
    vec!["vn".to_string(), "sg".to_string()]
}

fn default_max_results() -> u32 {
    100
}

fn default_api_base_url() -> String {
    CALENDAR_API_BASE.to_string()
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            countries: default_countries(),
            max_results: default_max_results(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl HolidayConfig {
    /// The configured API key, or the environment fallback.
    ///
    /// Empty values and `YOUR_` placeholders count as unset.
    pub fn resolved_api_key(&self) -> Option<String> {
        let usable = |key: &str| !key.trim().is_empty() && !key.starts_with("YOUR_");

        self.api_key
            .clone()
            .filter(|k| usable(k))
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| usable(k)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    /// Year whose last second bounds rules without an explicit end.
    /// Defaults to the current year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_until_year: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daybook");

        Self {
            config_dir,
            calendar: CalendarConfig::default(),
            holidays: HolidayConfig::default(),
            recurrence: RecurrenceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;

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

        if self.calendar.time_zone.parse::<chrono_tz::Tz>().is_err() {
            result.add_error(
                "calendar.time_zone",
                format!("Unknown time zone: {}", self.calendar.time_zone),
            );
        }

        if !VIEW_NAMES.contains(&self.calendar.default_view.as_str()) {
            result.add_error(
                "calendar.default_view",
                format!(
                    "View must be one of {}, got: {}",
                    VIEW_NAMES.join(", "),
                    self.calendar.default_view
                ),
            );
        }

        self.validate_url(
            &self.holidays.api_base_url,
            "holidays.api_base_url",
            &mut result,
        );

        if self.holidays.max_results == 0 {
            result.add_error("holidays.max_results", "max_results must be greater than 0");
        } else if self.holidays.max_results > 2500 {
            result.add_warning(
                "holidays.max_results",
                "max_results above 2500 is capped by the API",
            );
        }

        for code in &self.holidays.countries {
            if !HOLIDAY_COUNTRIES.contains(&code.to_ascii_lowercase().as_str()) {
                result.add_warning(
                    "holidays.countries",
                    format!(
                        "No holiday calendar for country '{}', '{}' is used instead",
                        code, FALLBACK_COUNTRY
                    ),
                );
            }
        }

        if self.holidays.resolved_api_key().is_none() {
            result.add_warning(
                "holidays.api_key",
                format!(
                    "No API key configured (set holidays.api_key or {}) - holidays will not be loaded",
                    API_KEY_ENV
                ),
            );
        }

        if let Some(year) = self.recurrence.default_until_year {
            if !(1970..=9999).contains(&year) {
                result.add_error(
                    "recurrence.default_until_year",
                    format!("Year out of range: {}", year),
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
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("daybook");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_time_zone() {
        let mut config = Config::default();
        config.calendar.time_zone = "Mars/Olympus_Mons".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "calendar.time_zone"));
    }

    #[test]
    fn test_iana_time_zone_accepted() {
        let mut config = Config::default();
        config.calendar.time_zone = "Asia/Ho_Chi_Minh".to_string();
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_unknown_view_is_error() {
        let mut config = Config::default();
        config.calendar.default_view = "listWeek".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "calendar.default_view"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.holidays.api_base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_max_results() {
        let mut config = Config::default();
        config.holidays.max_results = 0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "holidays.max_results"));
    }

    #[test]
    fn test_unknown_country_is_warning() {
        let mut config = Config::default();
        config.holidays.api_key = Some("abc123".to_string());
        config.holidays.countries = vec![
            "vn".to_string(),
            "SG".to_string(),
            "xx".to_string(),
            "vietnam".to_string(),
        ];
        let result = config.validate();
        assert!(result.is_valid());

        let country_warnings: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.field == "holidays.countries")
            .collect();
        assert_eq!(country_warnings.len(), 2);
        assert!(country_warnings[0].message.contains("'xx'"));
        assert!(country_warnings[1].message.contains("'vietnam'"));
    }

    #[test]
    fn test_placeholder_api_key_is_ignored() {
        let config = HolidayConfig {
            api_key: Some("YOUR_GOOGLE_API_KEY".to_string()),
            ..HolidayConfig::default()
        };
        if std::env::var(API_KEY_ENV).is_err() {
            assert!(config.resolved_api_key().is_none());
        }

        let config = HolidayConfig {
            api_key: Some("abc123".to_string()),
            ..HolidayConfig::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_until_year_out_of_range() {
        let mut config = Config::default();
        config.recurrence.default_until_year = Some(12000);
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path());
        assert_eq!(config.holidays.countries, vec!["vn", "sg"]);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.calendar.time_zone, "UTC");
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/daybook\"\n\n[holidays]\ncountries = [\"us\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.holidays.countries, vec!["us"]);
        assert_eq!(config.holidays.max_results, 100);
        assert_eq!(config.calendar.default_view, "dayGridMonth");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[holidays\ncountries = 3\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(msg)) if msg.contains("config.toml")
        ));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
