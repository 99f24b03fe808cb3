/// Room-occupancy table construction.

use crate::model::{Column, DashboardError, LoadWarning, OccupancyRecord, Table, TableKind};

use super::sheet::RawTable;
use super::{coerce, require_known_columns, ColumnIndex, RowReader};

/// Builds the occupancy table from a decoded sheet.
///
/// The occupancy column is normalized to a 0-100 float; see
/// `coerce::percentage` for how workbook fractions are handled.
pub fn occupancy_table(
    raw: &RawTable,
    source: &str,
) -> Result<(Table<OccupancyRecord>, Vec<LoadWarning>), DashboardError> {
    let (index, mut warnings) = ColumnIndex::locate(TableKind::Occupancy, &raw.headers);
    require_known_columns(&index, TableKind::Occupancy, source)?;

    let mut rows = Vec::with_capacity(raw.rows.len());
    for row in &raw.rows {
        let mut reader = RowReader::new(&index, row, &mut warnings);
        rows.push(OccupancyRecord {
            category: reader.read(Column::Category, coerce::parsed),
            year: reader.read(Column::Year, coerce::year),
            month: reader.read(Column::Month, coerce::month),
            site: reader.read(Column::Site, |c| Ok(coerce::text(c))),
            room: reader.read(Column::Room, |c| Ok(coerce::text(c))),
            fill: reader.read(Column::Fill, coerce::integer),
            available: reader.read(Column::Available, coerce::integer),
            occupancy_rate: reader.read(Column::Occupancy, coerce::percentage),
        });
    }

    Ok((Table::new(TableKind::Occupancy, rows, index.columns()), warnings))
}
