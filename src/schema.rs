/// Column registry for the sales and occupancy exports.
///
/// Defines the canonical header for every column the dashboard reads, plus
/// the alternative spellings seen in older exports. This is the single
/// source of truth for header names; the ingest code resolves headers
/// through here rather than hardcoding strings.

use crate::model::{Column, TableKind};

// ---------------------------------------------------------------------------
// Column metadata
// ---------------------------------------------------------------------------

/// Metadata for a single expected column.
pub struct ColumnSpec {
    pub column: Column,
    /// Header as written in the current spreadsheet template.
    pub header: &'static str,
    /// Other headers accepted for the same column.
    pub aliases: &'static [&'static str],
}

/// Columns of the sales/bookings export.
pub static SALES_SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { column: Column::Name, header: "NAME", aliases: &["Student", "Student Name"] },
    ColumnSpec { column: Column::Category, header: "Category", aliases: &["Program", "Course"] },
    ColumnSpec { column: Column::Year, header: "Year", aliases: &[] },
    ColumnSpec { column: Column::Month, header: "Month", aliases: &[] },
    ColumnSpec {
        column: Column::BatchStartDate,
        header: "BATCH START DATE",
        aliases: &["Batch Start", "Start Date"],
    },
    ColumnSpec {
        column: Column::BatchEndDate,
        header: "BATCH END DATE",
        aliases: &["Batch End", "End Date"],
    },
    ColumnSpec { column: Column::Site, header: "SITE", aliases: &["Location"] },
    ColumnSpec { column: Column::Group, header: "GROUP", aliases: &["Batch"] },
    ColumnSpec { column: Column::PaidStatus, header: "PAID STATUS", aliases: &["Status"] },
    ColumnSpec { column: Column::PaidAmount, header: "PAID", aliases: &["Paid Amount", "Amount Paid"] },
    ColumnSpec { column: Column::Balance, header: "BALANCE", aliases: &["Outstanding"] },
];

/// Columns of the room-occupancy export.
pub static OCCUPANCY_SCHEMA: &[ColumnSpec] = &[
    ColumnSpec { column: Column::Category, header: "Category", aliases: &["Program", "Course"] },
    ColumnSpec { column: Column::Year, header: "Year", aliases: &[] },
    ColumnSpec { column: Column::Month, header: "Month", aliases: &[] },
    ColumnSpec { column: Column::Site, header: "Site", aliases: &["Location"] },
    ColumnSpec { column: Column::Room, header: "Room", aliases: &["Room Type"] },
    ColumnSpec { column: Column::Fill, header: "Fill", aliases: &["Filled", "Occupied"] },
    ColumnSpec { column: Column::Available, header: "Available", aliases: &["Capacity"] },
    ColumnSpec { column: Column::Occupancy, header: "Occupancy", aliases: &["Occupancy Rate"] },
];

pub fn schema_for(kind: TableKind) -> &'static [ColumnSpec] {
    match kind {
        TableKind::Sales => SALES_SCHEMA,
        TableKind::Occupancy => OCCUPANCY_SCHEMA,
    }
}

/// Lowercases a header and drops spaces, underscores and hyphens, so that
/// "PAID STATUS", "paid_status" and "Paid-Status" compare equal.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolves a raw spreadsheet header to a known column of `kind`.
/// Returns `None` for headers the dashboard does not use.
pub fn resolve_header(kind: TableKind, header: &str) -> Option<Column> {
    let wanted = normalize_header(header);
    if wanted.is_empty() {
        return None;
    }
    schema_for(kind)
        .iter()
        .find(|spec| {
            normalize_header(spec.header) == wanted
                || spec.aliases.iter().any(|alias| normalize_header(alias) == wanted)
        })
        .map(|spec| spec.column)
}

/// Looks up the `ColumnSpec` for a column of `kind`. Returns `None` if the column
/// does not belong to that table.
pub fn find_column(kind: TableKind, column: Column) -> Option<&'static ColumnSpec> {
    schema_for(kind).iter().find(|spec| spec.column == column)
}

/// All columns expected in a table, in template order.
pub fn expected_columns(kind: TableKind) -> Vec<Column> {
    schema_for(kind).iter().map(|spec| spec.column).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
