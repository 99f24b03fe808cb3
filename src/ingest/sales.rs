/// Sales/bookings table construction.

use crate::model::{Column, DashboardError, LoadWarning, SalesRecord, Table, TableKind};

use super::sheet::RawTable;
use super::{coerce, require_known_columns, ColumnIndex, RowReader};

/// Builds the sales table from a decoded sheet.
///
/// Returns the table and every warning raised while reading it. Fails only
/// when none of the sheet's headers belong to the sales schema.
pub fn sales_table(
    raw: &RawTable,
    source: &str,
) -> Result<(Table<SalesRecord>, Vec<LoadWarning>), DashboardError> {
    let (index, mut warnings) = ColumnIndex::locate(TableKind::Sales, &raw.headers);
    require_known_columns(&index, TableKind::Sales, source)?;

    let mut rows = Vec::with_capacity(raw.rows.len());
    for row in &raw.rows {
        let mut reader = RowReader::new(&index, row, &mut warnings);
        rows.push(SalesRecord {
            name: reader.read(Column::Name, |c| Ok(coerce::text(c))).unwrap_or_default(),
            category: reader.read(Column::Category, coerce::parsed),
            year: reader.read(Column::Year, coerce::year),
            month: reader.read(Column::Month, coerce::month),
            batch_start_date: reader.read(Column::BatchStartDate, coerce::date),
            batch_end_date: reader.read(Column::BatchEndDate, coerce::date),
            site: reader.read(Column::Site, |c| Ok(coerce::text(c))),
            group: reader.read(Column::Group, |c| Ok(coerce::text(c))),
            paid_status: reader.read(Column::PaidStatus, coerce::parsed),
            paid_amount: reader.read(Column::PaidAmount, coerce::decimal),
            balance: reader.read(Column::Balance, coerce::decimal),
        });
    }

    Ok((Table::new(TableKind::Sales, rows, index.columns()), warnings))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
