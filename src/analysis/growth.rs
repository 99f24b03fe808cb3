//! Month-over-month growth.
//!
//! A metric is first reduced to one value per (year, month) that actually
//! has data. Change is then measured against the previous month *in that
//! series*, so a gap month is skipped over rather than read as zero, and
//! January is compared with the December before it.

use chrono::Month;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::BTreeMap;

use super::aggregate::is_booking;
use crate::model::{OccupancyRecord, SalesRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonthlyMetric {
    Fill,
    Bookings,
    PaidTotal,
    OccupancyMean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrowthMode {
    Percent,
    Absolute,
}

/// Inclusive range of calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub from: Month,
    pub to: Month,
}

impl MonthWindow {
    pub fn full() -> Self {
        Self {
            from: Month::January,
            to: Month::December,
        }
    }

    pub fn contains(&self, month: Month) -> bool {
        let n = month.number_from_month();
        self.from.number_from_month() <= n && n <= self.to.number_from_month()
    }
}

/// A calendar month of a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: Month,
}

impl YearMonth {
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub year: i32,
    pub month: String,
    pub month_number: u32,
    pub value: f64,
    /// `None` for the first point, and for percent change from zero.
    pub change: Option<f64>,
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MonthAcc {
    sum: f64,
    count: usize,
}

/// Rows need both a year and a month to land in the series.
fn accumulate<'a, R: 'a>(
    rows: impl IntoIterator<Item = &'a &'a R>,
    period: impl Fn(&R) -> (Option<i32>, Option<Month>),
    value: impl Fn(&R) -> Option<f64>,
) -> BTreeMap<(i32, u32), MonthAcc> {
    let mut months: BTreeMap<(i32, u32), MonthAcc> = BTreeMap::new();
    for &record in rows {
        let ((Some(year), Some(m)), Some(v)) = (period(record), value(record)) else {
            continue;
        };
        if !v.is_finite() {
            continue;
        }
        let acc = months.entry((year, m.number_from_month())).or_default();
        acc.sum += v;
        acc.count += 1;
    }
    months
}

/// One value per year and month for `metric`, earliest first.
///
/// Fill, booking count and paid total are sums; occupancy is a mean. A month
/// appears only if at least one row contributes a non-null value, so a month
/// with sales rows but no settled booking still shows as 0 bookings. Rows
/// without a year are left out, since they cannot be placed in time.
pub fn monthly_series(
    sales: &[&SalesRecord],
    occupancy: &[&OccupancyRecord],
    metric: MonthlyMetric,
) -> Vec<(YearMonth, f64)> {
    let months = match metric {
        MonthlyMetric::Fill => accumulate(
            occupancy,
            |r| (r.year, r.month),
            |r| r.fill.map(|f| f as f64),
        ),
        MonthlyMetric::OccupancyMean => {
            accumulate(occupancy, |r| (r.year, r.month), |r| r.occupancy_rate)
        }
        MonthlyMetric::Bookings => accumulate(
            sales,
            |r| (r.year, r.month),
            |r| Some(if is_booking(r) { 1.0 } else { 0.0 }),
        ),
        MonthlyMetric::PaidTotal => accumulate(
            sales,
            |r| (r.year, r.month),
            |r| r.paid_amount.and_then(|p| p.to_f64()),
        ),
    };

    months
        .into_iter()
        .filter_map(|((year, n), acc)| {
            let month = u8::try_from(n).ok().and_then(|n| Month::try_from(n).ok())?;
            let value = match metric {
                MonthlyMetric::OccupancyMean => acc.sum / acc.count as f64,
                _ => acc.sum,
            };
            Some((YearMonth::new(year, month), value))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

fn change(previous: f64, current: f64, mode: GrowthMode) -> Option<f64> {
    match mode {
        GrowthMode::Absolute => Some(current - previous),
        GrowthMode::Percent if previous == 0.0 => None,
        GrowthMode::Percent => Some((current - previous) / previous * 100.0),
    }
}

/// Change of each month in `window` against the preceding month that has
/// data. The window selects calendar months in every year of the series.
/// `series` must already be in chronological order, as `monthly_series`
/// returns it.
pub fn growth_over_time(
    series: &[(YearMonth, f64)],
    window: MonthWindow,
    mode: GrowthMode,
) -> Vec<GrowthPoint> {
    let mut previous: Option<f64> = None;
    series
        .iter()
        .filter(|(period, _)| window.contains(period.month))
        .map(|&(period, value)| {
            let point = GrowthPoint {
                year: period.year,
                month: period.month.name().to_string(),
                month_number: period.month.number_from_month(),
                value,
                change: previous.and_then(|p| change(p, value, mode)),
            };
            previous = Some(value);
            point
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
