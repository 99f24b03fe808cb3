/// Dashboard configuration
///
/// Loaded from a TOML file whose path comes from the `SALES_REPORT_CONFIG`
/// environment variable (a `.env` file is honoured), defaulting to
/// `./sales_report.toml`. When no file exists the built-in defaults are used,
/// which point at the published Bali exports.

use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::ingest::sheet::SheetFormat;
use crate::logging::LogLevel;
use crate::model::{DashboardError, Location};

pub const CONFIG_ENV_VAR: &str = "SALES_REPORT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./sales_report.toml";

const BALI_SALES_URL: &str =
    "https://raw.githubusercontent.com/antoniusawe/sales-report/main/Bali%20data/bali_sales.xlsx";
const BALI_OCCUPANCY_URL: &str =
    "https://raw.githubusercontent.com/antoniusawe/sales-report/main/Bali%20data/bali_occupancy.xlsx";

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Timeout for each remote fetch, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Age after which a session's dataset is considered stale.
    #[serde(default = "default_refresh_minutes")]
    pub refresh_after_minutes: u64,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub locations: Vec<LocationSources>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamps: bool,
}

/// The pair of exports backing one location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationSources {
    pub location: Location,
    pub sales: SourceSpec,
    pub occupancy: SourceSpec,
}

/// Where one table comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSpec {
    /// URL or local path.
    pub url: String,
    /// Overrides extension-based format detection.
    #[serde(default)]
    pub format: Option<SheetFormat>,
    /// Worksheet name; the first sheet is used when absent.
    #[serde(default)]
    pub sheet: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh_minutes() -> u64 {
    60
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            timestamps: false,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout_secs(),
            refresh_after_minutes: default_refresh_minutes(),
            log: LogConfig::default(),
            locations: vec![LocationSources {
                location: Location::Bali,
                sales: SourceSpec {
                    url: BALI_SALES_URL.to_string(),
                    format: Some(SheetFormat::Workbook),
                    sheet: None,
                },
                occupancy: SourceSpec {
                    url: BALI_OCCUPANCY_URL.to_string(),
                    format: Some(SheetFormat::Workbook),
                    sheet: None,
                },
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl DashboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, DashboardError> {
        let config: DashboardConfig = toml::from_str(contents)
            .map_err(|e| DashboardError::ConfigError(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, DashboardError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Resolves the config path from the environment and loads it.
    ///
    /// An explicitly configured path that does not exist is an error; a
    /// missing default file falls back to `DashboardConfig::default()`.
    pub fn load() -> Result<Self, DashboardError> {
        dotenv::dotenv().ok();

        match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load_from(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The configured sources for `location`.
    pub fn sources_for(&self, location: Location) -> Result<&LocationSources, DashboardError> {
        self.locations
            .iter()
            .find(|l| l.location == location)
            .ok_or(DashboardError::NoSourcesConfigured(location))
    }

    fn validate(&self) -> Result<(), DashboardError> {
        if self.request_timeout_secs == 0 {
            return Err(DashboardError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (i, sources) in self.locations.iter().enumerate() {
            if self.locations[..i].iter().any(|l| l.location == sources.location) {
                return Err(DashboardError::ConfigError(format!(
                    "location {} is configured more than once",
                    sources.location
                )));
            }
            for spec in [&sources.sales, &sources.occupancy] {
                if spec.url.trim().is_empty() {
                    return Err(DashboardError::ConfigError(format!(
                        "empty source url for {}",
                        sources.location
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
