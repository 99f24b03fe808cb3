/// Spreadsheet decoding: workbook (xlsx/xls/ods) and CSV exports.
///
/// Turns raw bytes into a `RawTable` of untyped cells. Column typing is
/// left to `coerce` so both formats share one set of parsing rules.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Cursor;

use crate::model::DashboardError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single untyped cell.
///
/// CSV cells are always `Text`; workbooks also yield numbers and dates.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Raw rendering used in malformed-value warnings.
    pub fn raw(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::DateTime(dt) => dt.to_string(),
        }
    }
}

/// A data row and the 1-based spreadsheet row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// A decoded sheet: header row plus data rows, all untyped.
///
/// Blank rows are dropped, so `rows[i].line` is not always `i + 2`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    #[serde(alias = "xlsx", alias = "xls", alias = "xlsm", alias = "ods")]
    Workbook,
    Csv,
}

impl SheetFormat {
    /// Detects the format from a path or URL extension, ignoring any query
    /// string. Returns `None` for unknown extensions.
    pub fn detect(source: &str) -> Option<SheetFormat> {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let ext = path.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Some(SheetFormat::Workbook),
            "csv" => Some(SheetFormat::Csv),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes `bytes` into a raw table.
///
/// `sheet` selects a worksheet by name; the first worksheet is used when it
/// is `None`. Ignored for CSV. `source` is only used in error messages.
pub fn decode(
    bytes: Vec<u8>,
    format: SheetFormat,
    sheet: Option<&str>,
    source: &str,
) -> Result<RawTable, DashboardError> {
    let table = match format {
        SheetFormat::Csv => decode_csv(&bytes, source)?,
        SheetFormat::Workbook => decode_workbook(bytes, sheet, source)?,
    };

    if table.headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DashboardError::DataUnavailable {
            source: source.to_string(),
            reason: "sheet has no header row".to_string(),
        });
    }

    Ok(table)
}

fn decode_csv(bytes: &[u8], source: &str) -> Result<RawTable, DashboardError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let unavailable = |e: csv::Error| DashboardError::DataUnavailable {
        source: source.to_string(),
        reason: format!("CSV parse error: {}", e),
    };

    let headers = reader
        .headers()
        .map_err(unavailable)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(unavailable)?;
        let line = record
            .position()
            .and_then(|p| usize::try_from(p.line()).ok())
            .unwrap_or(i + 2);
        let row = RawRow {
            line,
            cells: record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        };
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(RawTable { headers, rows })
}

fn decode_workbook(
    bytes: Vec<u8>,
    sheet: Option<&str>,
    source: &str,
) -> Result<RawTable, DashboardError> {
    let unavailable = |reason: String| DashboardError::DataUnavailable {
        source: source.to_string(),
        reason,
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| unavailable(format!("failed to open workbook: {}", e)))?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|e| unavailable(format!("failed to read sheet '{}': {}", name, e)))?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unavailable("workbook contains no sheets".to_string()))?
            .map_err(|e| unavailable(format!("failed to read first sheet: {}", e)))?,
    };

    // The range starts at the first used cell, not necessarily at A1.
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range
        .rows()
        .enumerate()
        .map(|(i, r)| RawRow {
            line: first_row + i + 1,
            cells: r.iter().map(cell_from_data).collect(),
        })
        .skip_while(RawRow::is_blank);

    let headers = match rows.next() {
        Some(header_row) => header_row
            .cells
            .iter()
            .map(|c| c.raw().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let rows = rows.filter(|r| !r.is_blank()).collect();

    Ok(RawTable { headers, rows })
}

fn cell_from_data(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) if !dt.is_duration() => excel_serial_to_datetime(dt.as_f64())
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#ERR({:?})", e)),
    }
}

/// Converts an Excel serial date (days since 1899-12-30, 1900 date system)
/// to a timestamp. Returns `None` outside the range Excel can represent.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
