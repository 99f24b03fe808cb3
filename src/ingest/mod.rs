/// Data loading for the sales and occupancy exports.
///
/// Submodules:
/// - `fetch`     : retrieves bytes from a URL or local path.
/// - `sheet`     : decodes workbook/CSV bytes into untyped cells.
/// - `coerce`    : per-type cell parsing (dates, months, percentages, money).
/// - `sales`     : builds `Table<SalesRecord>` from a decoded sheet.
/// - `occupancy` : builds `Table<OccupancyRecord>` from a decoded sheet.
///
/// Load-time failures are returned as `DashboardError` and abort the whole
/// load; column and cell problems become `LoadWarning`s on the dataset.

pub mod coerce;
pub mod fetch;
pub mod occupancy;
pub mod sales;
pub mod sheet;

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{LocationSources, SourceSpec};
use crate::logging::{self, Component};
use crate::model::{Column, DashboardError, Dataset, LoadWarning, TableKind};
use crate::schema;
use coerce::Coerced;
use sheet::{Cell, RawRow, RawTable, SheetFormat};

static EMPTY_CELL: Cell = Cell::Empty;

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

/// Maps known columns to their position in a decoded sheet.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    kind: TableKind,
    positions: BTreeMap<Column, usize>,
}

impl ColumnIndex {
    /// Resolves `headers` against the schema for `kind`. The first header
    /// matching a column wins. Every expected column that is absent yields
    /// a `MissingColumn` warning.
    pub fn locate(kind: TableKind, headers: &[String]) -> (Self, Vec<LoadWarning>) {
        let mut positions = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            if let Some(column) = schema::resolve_header(kind, header) {
                positions.entry(column).or_insert(i);
            }
        }

        let warnings = schema::expected_columns(kind)
            .into_iter()
            .filter(|column| !positions.contains_key(column))
            .map(|column| LoadWarning::MissingColumn { table: kind, column })
            .collect();

        (Self { kind, positions }, warnings)
    }

    pub fn columns(&self) -> BTreeSet<Column> {
        self.positions.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The cell for `column` in `row`, or an empty cell when the column is
    /// absent or the row is short.
    pub fn cell<'a>(&self, row: &'a [Cell], column: Column) -> &'a Cell {
        self.positions
            .get(&column)
            .and_then(|&i| row.get(i))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Reads typed values from one data row, collecting warnings for cells
/// that fail coercion.
pub struct RowReader<'a> {
    index: &'a ColumnIndex,
    row: &'a [Cell],
    row_number: usize,
    warnings: &'a mut Vec<LoadWarning>,
}

impl<'a> RowReader<'a> {
    /// Warnings carry `row.line`, the row number a user sees in the sheet.
    pub fn new(index: &'a ColumnIndex, row: &'a RawRow, warnings: &'a mut Vec<LoadWarning>) -> Self {
        Self {
            index,
            row: &row.cells,
            row_number: row.line,
            warnings,
        }
    }

    pub fn read<T>(&mut self, column: Column, coerce: fn(&Cell) -> Coerced<T>) -> Option<T> {
        match coerce(self.index.cell(self.row, column)) {
            Ok(value) => value,
            Err(raw) => {
                self.warnings.push(LoadWarning::MalformedValue {
                    table: self.index.kind,
                    row: self.row_number,
                    column,
                    raw,
                });
                None
            }
        }
    }
}

/// Fails when a sheet shares no headers at all with the expected schema,
/// which means the wrong file was configured.
pub(crate) fn require_known_columns(
    index: &ColumnIndex,
    kind: TableKind,
    source: &str,
) -> Result<(), DashboardError> {
    if index.is_empty() {
        return Err(DashboardError::DataUnavailable {
            source: source.to_string(),
            reason: format!("no recognised {} columns in header row", kind),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Fetches and decodes one source into a raw table.
pub fn read_raw(
    client: &reqwest::blocking::Client,
    spec: &SourceSpec,
) -> Result<RawTable, DashboardError> {
    let format = spec
        .format
        .or_else(|| SheetFormat::detect(&spec.url))
        .ok_or_else(|| DashboardError::UnsupportedFormat(spec.url.clone()))?;
    let bytes = fetch::fetch_bytes(client, &spec.url)?;
    sheet::decode(bytes, format, spec.sheet.as_deref(), &spec.url)
}

/// Loads both tables for a location. Any failure on either table fails
/// the whole load; no partial dataset is ever returned.
pub fn load_dataset(
    client: &reqwest::blocking::Client,
    sources: &LocationSources,
) -> Result<Dataset, DashboardError> {
    let sales_raw = read_raw(client, &sources.sales).map_err(|e| {
        logging::log_load_failure(Component::Sales, &sources.sales.url, &e);
        e
    })?;
    let (sales, mut warnings) = sales::sales_table(&sales_raw, &sources.sales.url)?;
    logging::log_load_summary(Component::Sales, &sources.sales.url, sales.len(), warnings.len());

    let occupancy_raw = read_raw(client, &sources.occupancy).map_err(|e| {
        logging::log_load_failure(Component::Occupancy, &sources.occupancy.url, &e);
        e
    })?;
    let (occupancy, occupancy_warnings) =
        occupancy::occupancy_table(&occupancy_raw, &sources.occupancy.url)?;
    logging::log_load_summary(
        Component::Occupancy,
        &sources.occupancy.url,
        occupancy.len(),
        occupancy_warnings.len(),
    );
    warnings.extend(occupancy_warnings);

    log_warnings(&warnings);

    Ok(Dataset {
        location: sources.location,
        sales,
        occupancy,
        warnings,
        loaded_at: Utc::now(),
    })
}

fn log_warnings(warnings: &[LoadWarning]) {
    let mut malformed = 0;
    for warning in warnings {
        match warning {
            LoadWarning::MissingColumn { table, .. } => {
                logging::warn(component_for(*table), Some(&table.to_string()), &warning.to_string())
            }
            LoadWarning::MalformedValue { table, .. } => {
                malformed += 1;
                logging::debug(component_for(*table), Some(&table.to_string()), &warning.to_string())
            }
        }
    }
    if malformed > 0 {
        logging::warn(
            Component::System,
            None,
            &format!("{} malformed cells coerced to null", malformed),
        );
    }
}

fn component_for(table: TableKind) -> Component {
    match table {
        TableKind::Sales => Component::Sales,
        TableKind::Occupancy => Component::Occupancy,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
