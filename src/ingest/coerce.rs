/// Cell coercion rules shared by both tables.
///
/// Every function returns `Ok(None)` for an empty cell and `Err(raw)` for
/// a cell that has content but cannot be read as the target type. Callers
/// turn `Err` into a `MalformedValue` warning and store `None`.

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::sheet::{excel_serial_to_datetime, Cell};

pub type Coerced<T> = Result<Option<T>, String>;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ---------------------------------------------------------------------------
// String-level parsers
// ---------------------------------------------------------------------------

/// Parses an occupancy string such as `"87.5%"` or `"87.5"` into `87.5`.
pub fn parse_percentage(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a money amount, tolerating a leading `$` and thousands separators.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parses a calendar date in any of the formats seen in the exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Resolves a month written as a name ("March", "mar"), a number ("3") or
/// a full date to a calendar month.
pub fn parse_month(raw: &str) -> Option<Month> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(month) = trimmed.parse::<Month>() {
        return Some(month);
    }
    if let Ok(number) = trimmed.trim_end_matches(".0").parse::<u8>() {
        return Month::try_from(number).ok();
    }
    parse_date(trimmed).and_then(|date| month_of(&date))
}

fn month_of(date: &impl Datelike) -> Option<Month> {
    u8::try_from(date.month()).ok().and_then(|m| Month::try_from(m).ok())
}

// ---------------------------------------------------------------------------
// Cell-level coercion
// ---------------------------------------------------------------------------

pub fn text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Cell::Number(n) => Some(n.to_string()),
        Cell::DateTime(dt) => Some(dt.date().to_string()),
    }
}

pub fn parsed<T: FromStr>(cell: &Cell) -> Coerced<T> {
    match text(cell) {
        None => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(|_| s),
    }
}

pub fn integer(cell: &Cell) -> Coerced<i64> {
    match cell {
        Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => Ok(Some(*n as i64)),
        Cell::Number(n) => Err(n.to_string()),
        Cell::DateTime(dt) => Err(dt.to_string()),
        _ => match text(cell) {
            None => Ok(None),
            Some(s) => {
                let digits = s.trim_end_matches(".0").replace(',', "");
                digits.parse::<i64>().map(Some).map_err(|_| s)
            }
        },
    }
}

pub fn year(cell: &Cell) -> Coerced<i32> {
    if let Cell::DateTime(dt) = cell {
        return Ok(Some(dt.year()));
    }
    match integer(cell)? {
        None => Ok(None),
        Some(y) if (1900..=9999).contains(&y) => Ok(Some(y as i32)),
        Some(y) => Err(y.to_string()),
    }
}

pub fn month(cell: &Cell) -> Coerced<Month> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::DateTime(dt) => Ok(month_of(dt)),
        Cell::Number(n) if n.fract() == 0.0 && (1.0..=12.0).contains(n) => {
            Ok(Month::try_from(*n as u8).ok())
        }
        // A larger number in a month column is an Excel date without date formatting.
        Cell::Number(n) => excel_serial_to_datetime(*n)
            .and_then(|dt| month_of(&dt))
            .map(Some)
            .ok_or_else(|| n.to_string()),
        Cell::Text(s) if s.trim().is_empty() => Ok(None),
        Cell::Text(s) => parse_month(s).map(Some).ok_or_else(|| s.clone()),
    }
}

pub fn date(cell: &Cell) -> Coerced<NaiveDate> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::DateTime(dt) => Ok(Some(dt.date())),
        Cell::Number(n) => excel_serial_to_datetime(*n)
            .map(|dt| Some(dt.date()))
            .ok_or_else(|| n.to_string()),
        Cell::Text(s) if s.trim().is_empty() => Ok(None),
        Cell::Text(s) => parse_date(s).map(Some).ok_or_else(|| s.clone()),
    }
}

pub fn decimal(cell: &Cell) -> Coerced<Decimal> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) => Decimal::try_from(*n).map(Some).map_err(|_| n.to_string()),
        Cell::DateTime(dt) => Err(dt.to_string()),
        Cell::Text(s) if s.trim().is_empty() => Ok(None),
        Cell::Text(s) => parse_decimal(s).map(Some).ok_or_else(|| s.clone()),
    }
}

/// Occupancy as a 0-100 percentage.
///
/// Text cells are read literally ("87.5%" and "87.5" are both 87.5).
/// Numeric cells in `0.0..=1.0` are percent-formatted fractions and are
/// scaled by 100; larger numbers are already percentages. Anything that
/// lands outside 0-100 is rejected.
pub fn percentage(cell: &Cell) -> Coerced<f64> {
    let value = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(n) if (0.0..=1.0).contains(n) => n * 100.0,
        Cell::Number(n) => *n,
        Cell::DateTime(dt) => return Err(dt.to_string()),
        Cell::Text(s) if s.trim().is_empty() => return Ok(None),
        Cell::Text(s) => parse_percentage(s).ok_or_else(|| s.clone())?,
    };
    if (0.0..=100.0).contains(&value) {
        Ok(Some(value))
    } else {
        Err(cell.raw())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
