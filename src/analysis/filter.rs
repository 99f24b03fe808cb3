//! Row filtering by program, year and month.
//!
//! In a `FilterSelection`, "All" is an explicit variant and months are
//! calendar months. Filtering never fails. A constraint on a column the
//! table does not have is skipped and reported back in `Filtered::skipped`.

use chrono::Month;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::logging::{self, Component};
use crate::model::{Column, Dataset, OccupancyRecord, Program, SalesRecord, Table};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearSelection {
    All,
    Year(i32),
}

impl fmt::Display for YearSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearSelection::All => write!(f, "All"),
            YearSelection::Year(y) => write!(f, "{}", y),
        }
    }
}

impl Serialize for YearSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YearSelection::All => serializer.serialize_str("All"),
            YearSelection::Year(y) => serializer.serialize_i32(*y),
        }
    }
}

/// What the operator picked: a program, a year (or all) and optionally a
/// month. `month == None` means all months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSelection {
    pub program: Program,
    pub year: YearSelection,
    pub month: Option<Month>,
}

impl FilterSelection {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            year: YearSelection::All,
            month: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = YearSelection::Year(year);
        self
    }

    pub fn with_month(mut self, month: Month) -> Self {
        self.month = Some(month);
        self
    }

    /// The same selection without its month constraint.
    pub fn all_months(mut self) -> Self {
        self.month = None;
        self
    }
}

/// Field access shared by both record types.
pub trait Record {
    fn category(&self) -> Option<Program>;
    fn year(&self) -> Option<i32>;
    fn month(&self) -> Option<Month>;
}

impl Record for SalesRecord {
    fn category(&self) -> Option<Program> {
        self.category
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn month(&self) -> Option<Month> {
        self.month
    }
}

impl Record for OccupancyRecord {
    fn category(&self) -> Option<Program> {
        self.category
    }
    fn year(&self) -> Option<i32> {
        self.year
    }
    fn month(&self) -> Option<Month> {
        self.month
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Rows matching a selection, plus the constraints that could not be
/// applied because their column is missing.
#[derive(Debug, Clone)]
pub struct Filtered<'a, R> {
    pub rows: Vec<&'a R>,
    pub skipped: Vec<Column>,
}

impl<'a, R> Filtered<'a, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Returns the rows of `table` that satisfy every constraint in `selection`.
///
/// Category and year compare by equality; month compares calendar months.
/// A row with a null value in a constrained column never matches.
pub fn apply<'a, R: Record>(table: &'a Table<R>, selection: &FilterSelection) -> Filtered<'a, R> {
    let mut skipped = Vec::new();
    let mut usable = |column: Column| {
        let present = table.has_column(column);
        if !present {
            logging::warn(
                Component::Filter,
                Some(&table.kind.to_string()),
                &format!("column '{}' missing; {} filter skipped", column, column),
            );
            skipped.push(column);
        }
        present
    };

    let program = usable(Column::Category).then_some(selection.program);
    let year = match selection.year {
        YearSelection::Year(y) if usable(Column::Year) => Some(y),
        _ => None,
    };
    let month = match selection.month {
        Some(m) if usable(Column::Month) => Some(m.number_from_month()),
        _ => None,
    };

    let rows = table
        .rows
        .iter()
        .filter(|r| program.is_none_or(|p| r.category() == Some(p)))
        .filter(|r| year.is_none_or(|y| r.year() == Some(y)))
        .filter(|r| month.is_none_or(|m| r.month().map(|rm| rm.number_from_month()) == Some(m)))
        .collect();

    Filtered { rows, skipped }
}

// ---------------------------------------------------------------------------
// Selection lists
// ---------------------------------------------------------------------------

/// `All` followed by every year present in either table, ascending.
pub fn year_options(dataset: &Dataset) -> Vec<YearSelection> {
    let years: BTreeSet<i32> = dataset
        .sales
        .rows
        .iter()
        .filter_map(|r| r.year)
        .chain(dataset.occupancy.rows.iter().filter_map(|r| r.year))
        .collect();

    std::iter::once(YearSelection::All)
        .chain(years.into_iter().map(YearSelection::Year))
        .collect()
}

/// Months with data in either table for `year`, January first.
/// Empty for `YearSelection::All`, where no month choice is offered.
pub fn months_for_year(dataset: &Dataset, year: YearSelection) -> Vec<Month> {
    let YearSelection::Year(year) = year else {
        return Vec::new();
    };

    let months = dataset
        .sales
        .rows
        .iter()
        .filter(|r| r.year == Some(year))
        .filter_map(|r| r.month)
        .chain(
            dataset
                .occupancy
                .rows
                .iter()
                .filter(|r| r.year == Some(year))
                .filter_map(|r| r.month),
        );
    chronological(months)
}

/// Orders month names January..December, dropping duplicates and names
/// that do not parse as a month. Never sorts lexically.
pub fn sort_month_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let months = names.iter().filter_map(|name| {
        let parsed = crate::ingest::coerce::parse_month(name.as_ref());
        if parsed.is_none() {
            logging::warn(
                Component::Filter,
                None,
                &format!("ignoring unrecognised month name '{}'", name.as_ref()),
            );
        }
        parsed
    });
    chronological(months)
        .into_iter()
        .map(|m| m.name().to_string())
        .collect()
}

/// Deduplicates and orders months by calendar number.
pub fn chronological(months: impl IntoIterator<Item = Month>) -> Vec<Month> {
    let numbers: BTreeSet<u32> = months.into_iter().map(|m| m.number_from_month()).collect();
    numbers
        .into_iter()
        .filter_map(|n| u8::try_from(n).ok().and_then(|n| Month::try_from(n).ok()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, TableKind};
    use chrono::Utc;

    fn occupancy(category: Program, year: i32, month: Month, fill: i64) -> OccupancyRecord {
        OccupancyRecord {
            category: Some(category),
            year: Some(year),
            month: Some(month),
            site: Some("Ubud".to_string()),
            room: Some("Garden".to_string()),
            fill: Some(fill),
            available: Some(10),
            occupancy_rate: Some(fill as f64 * 10.0),
        }
    }

    fn all_columns() -> BTreeSet<Column> {
        crate::schema::expected_columns(TableKind::Occupancy).into_iter().collect()
    }

    fn sample_table() -> Table<OccupancyRecord> {
        Table::new(
            TableKind::Occupancy,
            vec![
                occupancy(Program::Program200, 2023, Month::December, 4),
                occupancy(Program::Program200, 2024, Month::January, 6),
                occupancy(Program::Program200, 2024, Month::March, 8),
                occupancy(Program::Program300, 2024, Month::March, 2),
                OccupancyRecord {
                    category: Some(Program::Program200),
                    ..Default::default()
                },
            ],
            all_columns(),
        )
    }

    #[test]
    fn test_every_filtered_row_satisfies_the_selection() {
        let table = sample_table();
        let selections = [
            FilterSelection::new(Program::Program200),
            FilterSelection::new(Program::Program200).with_year(2024),
            FilterSelection::new(Program::Program200).with_year(2024).with_month(Month::March),
            FilterSelection::new(Program::Program300).with_year(2023),
        ];
        for selection in selections {
            let filtered = apply(&table, &selection);
            for row in &filtered.rows {
                assert_eq!(row.category, Some(selection.program));
                if let YearSelection::Year(y) = selection.year {
                    assert_eq!(row.year, Some(y));
                }
                if let Some(m) = selection.month {
                    assert_eq!(row.month, Some(m));
                }
            }
            // No under-filtering either: count matches a direct scan.
            let expected = table
                .rows
                .iter()
                .filter(|r| r.category == Some(selection.program))
                .filter(|r| match selection.year {
                    YearSelection::All => true,
                    YearSelection::Year(y) => r.year == Some(y),
                })
                .filter(|r| selection.month.is_none() || r.month == selection.month)
                .count();
            assert_eq!(filtered.rows.len(), expected, "selection {:?}", selection);
        }
    }

    #[test]
    fn test_all_year_keeps_rows_with_null_year() {
        let table = sample_table();
        let filtered = apply(&table, &FilterSelection::new(Program::Program200));
        assert_eq!(filtered.rows.len(), 4);
        assert!(filtered.skipped.is_empty());
    }

    #[test]
    fn test_missing_month_column_skips_month_filter() {
        let mut table = sample_table();
        table.columns.remove(&Column::Month);
        let selection = FilterSelection::new(Program::Program200)
            .with_year(2024)
            .with_month(Month::March);
        let filtered = apply(&table, &selection);
        assert_eq!(filtered.skipped, vec![Column::Month]);
        assert_eq!(filtered.rows.len(), 2, "both 2024 200HR rows kept");
    }

    #[test]
    fn test_missing_category_column_skips_program_filter() {
        let mut table = sample_table();
        table.columns.remove(&Column::Category);
        let filtered = apply(&table, &FilterSelection::new(Program::Program300).with_year(2024));
        assert_eq!(filtered.skipped, vec![Column::Category]);
        assert_eq!(filtered.rows.len(), 3);
    }

    #[test]
    fn test_month_names_sort_chronologically() {
        let sorted = sort_month_names(&["March", "January", "December"]);
        assert_eq!(sorted, vec!["January", "March", "December"]);
    }

    #[test]
    fn test_month_names_drop_duplicates_and_garbage() {
        let sorted = sort_month_names(&["april", "April", "Smarch", "feb"]);
        assert_eq!(sorted, vec!["February", "April"]);
    }

    #[test]
    fn test_selection_lists_union_both_tables() {
        let dataset = Dataset {
            location: Location::Bali,
            sales: Table::new(
                TableKind::Sales,
                vec![SalesRecord {
                    year: Some(2025),
                    month: Some(Month::May),
                    ..Default::default()
                }],
                BTreeSet::new(),
            ),
            occupancy: sample_table(),
            warnings: Vec::new(),
            loaded_at: Utc::now(),
        };

        assert_eq!(
            year_options(&dataset),
            vec![
                YearSelection::All,
                YearSelection::Year(2023),
                YearSelection::Year(2024),
                YearSelection::Year(2025),
            ]
        );
        assert_eq!(
            months_for_year(&dataset, YearSelection::Year(2024)),
            vec![Month::January, Month::March]
        );
        assert_eq!(months_for_year(&dataset, YearSelection::Year(2025)), vec![Month::May]);
        assert!(months_for_year(&dataset, YearSelection::All).is_empty());
    }

    #[test]
    fn test_year_selection_serializes_as_label_or_number() {
        assert_eq!(serde_json::to_string(&YearSelection::All).unwrap(), "\"All\"");
        assert_eq!(serde_json::to_string(&YearSelection::Year(2024)).unwrap(), "2024");
    }
}
