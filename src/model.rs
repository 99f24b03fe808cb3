/// Core data types for the training-program sales dashboard.
///
/// This module defines the shared domain model imported by all other modules:
/// the two tabular record types, the enumerations that replace stringly-typed
/// selections, and the error/warning types. It contains no logic beyond
/// parsing and display of the enumerations.

use chrono::{DateTime, Month, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Training track. Stored in the spreadsheets as "200HR" / "300HR".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Program {
    #[serde(rename = "200HR")]
    Program200,
    #[serde(rename = "300HR")]
    Program300,
}

impl Program {
    pub const ALL: [Program; 2] = [Program::Program200, Program::Program300];

    pub fn label(&self) -> &'static str {
        match self {
            Program::Program200 => "200HR",
            Program::Program300 => "300HR",
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Program {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "200HR" | "200" | "200 HR" => Ok(Program::Program200),
            "300HR" | "300" | "300 HR" => Ok(Program::Program300),
            other => Err(format!("unknown program '{}'", other)),
        }
    }
}

/// Payment state of a booking. A null paid status means nothing recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaidStatus {
    FullyPaid,
    Deposit,
}

impl FromStr for PaidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_uppercase()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c })
            .collect();
        match normalized.as_str() {
            "FULLY PAID" | "FULL PAID" | "FULL" | "PAID" => Ok(PaidStatus::FullyPaid),
            "DEPOSIT" | "DP" => Ok(PaidStatus::Deposit),
            other => Err(format!("unknown paid status '{}'", other)),
        }
    }
}

/// Training location. Each location has its own pair of spreadsheet exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Bali", alias = "bali", alias = "BALI")]
    Bali,
    #[serde(rename = "RYP", alias = "ryp", alias = "Ryp")]
    Ryp,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::Bali, Location::Ryp];
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Bali => write!(f, "Bali"),
            Location::Ryp => write!(f, "RYP"),
        }
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bali" => Ok(Location::Bali),
            "ryp" => Ok(Location::Ryp),
            other => Err(format!("unknown location '{}'", other)),
        }
    }
}

/// The two tables every location provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Sales,
    Occupancy,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Sales => write!(f, "sales"),
            TableKind::Occupancy => write!(f, "occupancy"),
        }
    }
}

/// Every column the dashboard knows about, across both tables.
///
/// Header spellings live in `schema`; this is only the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Column {
    Name,
    Category,
    Year,
    Month,
    BatchStartDate,
    BatchEndDate,
    Site,
    Group,
    PaidStatus,
    PaidAmount,
    Balance,
    Room,
    Fill,
    Available,
    Occupancy,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Column::Name => "name",
            Column::Category => "category",
            Column::Year => "year",
            Column::Month => "month",
            Column::BatchStartDate => "batch_start_date",
            Column::BatchEndDate => "batch_end_date",
            Column::Site => "site",
            Column::Group => "group",
            Column::PaidStatus => "paid_status",
            Column::PaidAmount => "paid_amount",
            Column::Balance => "balance",
            Column::Room => "room",
            Column::Fill => "fill",
            Column::Available => "available",
            Column::Occupancy => "occupancy",
        };
        write!(f, "{}", name)
    }
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One booking row from the sales export.
///
/// Every field except `name` may be null: the loader coerces unparseable
/// cells to `None` rather than rejecting the row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SalesRecord {
    pub name: String,
    pub category: Option<Program>,
    pub year: Option<i32>,
    pub month: Option<Month>,
    pub batch_start_date: Option<NaiveDate>,
    pub batch_end_date: Option<NaiveDate>,
    pub site: Option<String>,
    pub group: Option<String>,
    pub paid_status: Option<PaidStatus>,
    pub paid_amount: Option<Decimal>,
    pub balance: Option<Decimal>, // 0 = fully settled
}

/// One site/room/month row from the occupancy export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OccupancyRecord {
    pub category: Option<Program>,
    pub year: Option<i32>,
    pub month: Option<Month>,
    pub site: Option<String>,
    pub room: Option<String>,
    pub fill: Option<i64>,
    pub available: Option<i64>,
    pub occupancy_rate: Option<f64>, // 0-100, "87.5%" -> 87.5
}

/// A loaded table: its rows plus the columns that were actually present
/// in the source file.
///
/// Consumers check `has_column` before relying on a field so that a
/// missing column degrades one feature instead of the whole view.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    pub kind: TableKind,
    pub rows: Vec<R>,
    pub columns: BTreeSet<Column>,
}

impl<R> Table<R> {
    pub fn new(kind: TableKind, rows: Vec<R>, columns: BTreeSet<Column>) -> Self {
        Self { kind, rows, columns }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Both tables for one location, as loaded at a single point in time.
///
/// Immutable once built; a refresh replaces the whole snapshot.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub location: Location,
    pub sales: Table<SalesRecord>,
    pub occupancy: Table<OccupancyRecord>,
    pub warnings: Vec<LoadWarning>,
    pub loaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures that make a view impossible to render.
///
/// Everything here is a load-time condition; filter and aggregate
/// anomalies are recovered locally and never surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardError {
    /// The source could not be fetched or decoded into a table.
    DataUnavailable { source: String, reason: String },
    /// Non-2xx HTTP response while fetching a remote source.
    HttpError { source: String, status: u16 },
    /// The source's file format could not be determined or is not supported.
    UnsupportedFormat(String),
    /// The configuration file is unreadable or invalid.
    ConfigError(String),
    /// No sources are configured for the requested location.
    NoSourcesConfigured(Location),
    /// A view was requested before the session loaded its dataset.
    NotLoaded(Location),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::DataUnavailable { source, reason } => {
                write!(f, "Data unavailable from {}: {}", source, reason)
            }
            DashboardError::HttpError { source, status } => {
                write!(f, "HTTP error {} from {}", status, source)
            }
            DashboardError::UnsupportedFormat(source) => {
                write!(f, "Unsupported file format: {}", source)
            }
            DashboardError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            DashboardError::NoSourcesConfigured(location) => {
                write!(f, "No data sources configured for {}", location)
            }
            DashboardError::NotLoaded(location) => {
                write!(f, "Dataset for {} has not been loaded", location)
            }
        }
    }
}

impl DashboardError {
    /// True when a source could not be turned into a table. `HttpError` and
    /// `UnsupportedFormat` are the specific reasons; `DataUnavailable` covers
    /// the rest (missing file, timeout, unrecognised sheet).
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            DashboardError::DataUnavailable { .. }
                | DashboardError::HttpError { .. }
                | DashboardError::UnsupportedFormat(_)
        )
    }
}

impl std::error::Error for DashboardError {}

/// Non-fatal problems found while loading a table.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// An expected column is absent; features depending on it are skipped.
    MissingColumn { table: TableKind, column: Column },
    /// A cell could not be coerced to its column's type and was nulled.
    /// `row` is the 1-based spreadsheet row, counting the header.
    MalformedValue {
        table: TableKind,
        row: usize,
        column: Column,
        raw: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::MissingColumn { table, column } => {
                write!(f, "Missing column in {} table: {}", table, column)
            }
            LoadWarning::MalformedValue {
                table,
                row,
                column,
                raw,
            } => write!(
                f,
                "Malformed value in {} table row {} column {}: '{}'",
                table, row, column, raw
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
