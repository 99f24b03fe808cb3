/// Structured logging for the sales dashboard
///
/// Provides context-rich logging with component and table/location
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging for unattended report runs.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

use crate::model::DashboardError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Sales,
    Occupancy,
    Filter,
    Aggregate,
    Session,
    Config,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Sales => write!(f, "SALES"),
            Component::Occupancy => write!(f, "OCC"),
            Component::Filter => write!(f, "FILTER"),
            Component::Aggregate => write!(f, "AGG"),
            Component::Session => write!(f, "SESSION"),
            Component::Config => write!(f, "CFG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - location has no exports configured yet
    Expected,
    /// Unexpected failure - network, HTTP or decoding problem
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, component: Component, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|c| format!(" [{}]", c)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, component, context_part, message
        );

        // Console output goes to stderr so stdout stays clean for JSON reports
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", component, context_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", component, context_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, component: Component, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, component, context, message);
}

/// Log a warning message
pub fn warn(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, component, context, message);
}

/// Log an error message
pub fn error(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, component, context, message);
}

/// Log a debug message
pub fn debug(component: Component, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, component, context, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a load failure by error variant
pub fn classify_load_failure(err: &DashboardError) -> FailureType {
    match err {
        DashboardError::NoSourcesConfigured(_) | DashboardError::NotLoaded(_) => {
            FailureType::Expected
        }
        DashboardError::HttpError { .. }
        | DashboardError::UnsupportedFormat(_)
        | DashboardError::DataUnavailable { .. } => FailureType::Unexpected,
        DashboardError::ConfigError(_) => FailureType::Unknown,
    }
}

/// Log a load failure with automatic classification
pub fn log_load_failure(component: Component, source: &str, err: &DashboardError) {
    let failure_type = classify_load_failure(err);
    let message = format!("load failed [{}]: {}", failure_type, err);

    match failure_type {
        FailureType::Expected => debug(component, Some(source), &message),
        FailureType::Unexpected => error(component, Some(source), &message),
        FailureType::Unknown => warn(component, Some(source), &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a table load
pub fn log_load_summary(component: Component, source: &str, rows: usize, warnings: usize) {
    let message = format!("Loaded {} rows, {} warnings", rows, warnings);

    if rows == 0 {
        warn(component, Some(source), &message);
    } else {
        info(component, Some(source), &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_failure_classification() {
        let result = classify_load_failure(&DashboardError::NoSourcesConfigured(Location::Ryp));
        assert_eq!(result, FailureType::Expected, "an unconfigured location is not an outage");

        let result = classify_load_failure(&DashboardError::HttpError {
            source: "https://example.com/a.xlsx".to_string(),
            status: 500,
        });
        assert_eq!(result, FailureType::Unexpected);

        let result = classify_load_failure(&DashboardError::DataUnavailable {
            source: "sales.csv".to_string(),
            reason: "request timed out".to_string(),
        });
        assert_eq!(result, FailureType::Unexpected);

        let result = classify_load_failure(&DashboardError::ConfigError("bad".to_string()));
        assert_eq!(result, FailureType::Unknown);
    }

    #[test]
    fn test_classification_ignores_message_text() {
        // A source path that happens to read like another failure kind.
        let err = DashboardError::DataUnavailable {
            source: "No data sources configured.csv".to_string(),
            reason: "failed to read file".to_string(),
        };
        assert_eq!(classify_load_failure(&err), FailureType::Unexpected);
    }

    #[test]
    fn test_log_level_deserializes_short_warn() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let parsed: Wrapper = toml::from_str("level = \"warn\"").expect("warn alias should parse");
        assert_eq!(parsed.level, LogLevel::Warning);
    }
}
