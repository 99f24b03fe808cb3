//! Summary metrics and group-by aggregation.
//!
//! Empty inputs are normal here: a filter combination with no rows yields a
//! booking count of 0, a paid total of 0 and an occupancy mean of `None`.
//! `None` is the "no data" state and must never be shown as 0%.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::logging::{self, Component};
use crate::model::{OccupancyRecord, SalesRecord};

/// Key used for rows whose grouping column is null, so that grouped totals
/// always add up to the ungrouped total.
pub const UNSPECIFIED: &str = "Unspecified";

// ---------------------------------------------------------------------------
// Headline metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub booking_count: usize,
    pub paid_total: Decimal,
    pub occupancy_mean: Option<f64>,
}

/// A booking counts toward "Total Booking" once its balance is settled.
pub fn is_booking(record: &SalesRecord) -> bool {
    record.balance.is_some_and(|b| b.is_zero())
}

pub fn booking_count(rows: &[&SalesRecord]) -> usize {
    rows.iter().filter(|r| is_booking(r)).count()
}

/// Sum of paid amounts; rows without a readable amount contribute 0.
pub fn paid_total(rows: &[&SalesRecord]) -> Decimal {
    rows.iter().filter_map(|r| r.paid_amount).sum()
}

/// Mean occupancy percentage over rows with a usable rate.
/// `None` when no row has one.
pub fn occupancy_mean(rows: &[&OccupancyRecord]) -> Option<f64> {
    mean(rows.iter().filter_map(|r| r.occupancy_rate))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn summarize(sales: &[&SalesRecord], occupancy: &[&OccupancyRecord]) -> Summary {
    Summary {
        booking_count: booking_count(sales),
        paid_total: paid_total(sales),
        occupancy_mean: occupancy_mean(occupancy),
    }
}

// ---------------------------------------------------------------------------
// Occupancy by dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    Site,
    Room,
    Month,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Site => write!(f, "Site"),
            Dimension::Room => write!(f, "Room"),
            Dimension::Month => write!(f, "Month"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    /// True for the bucket of rows with no value; `key` is then `UNSPECIFIED`.
    pub unspecified: bool,
    pub rows: usize,
    pub fill: i64,
    pub available: i64,
    pub occupancy_mean: Option<f64>,
}

/// Collects rows into groups in first-seen key order, remembering a sort
/// position for keys with a natural order (months).
///
/// Null keys are tracked as `None`, apart from any real value that happens
/// to read "Unspecified".
struct Grouper<A> {
    order: Vec<(Option<String>, Option<u32>, A)>,
    index: HashMap<Option<String>, usize>,
    unspecified: usize,
}

impl<A: Default> Grouper<A> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
            unspecified: 0,
        }
    }

    fn entry(&mut self, key: Option<(String, Option<u32>)>) -> &mut A {
        let (key, position) = match key {
            Some((key, position)) => (Some(key), position),
            None => {
                self.unspecified += 1;
                (None, None)
            }
        };
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                self.order.push((key.clone(), position, A::default()));
                self.index.insert(key, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[i].2
    }

    /// Groups in natural order where one exists; first-seen otherwise.
    /// Keys without a natural position (including `UNSPECIFIED`) go last.
    fn into_natural_order(mut self, dimension: &str) -> Vec<(Option<String>, A)> {
        if self.unspecified > 0 {
            logging::debug(
                Component::Aggregate,
                Some(dimension),
                &format!("{} rows without a {} grouped as {}", self.unspecified, dimension, UNSPECIFIED),
            );
        }
        self.order
            .sort_by_key(|(_, position, _)| position.unwrap_or(u32::MAX));
        self.order.into_iter().map(|(k, _, a)| (k, a)).collect()
    }
}

#[derive(Default)]
struct OccupancyAcc {
    rows: usize,
    fill: i64,
    available: i64,
    rate_sum: f64,
    rate_count: usize,
}

fn occupancy_key(record: &OccupancyRecord, dimension: Dimension) -> Option<(String, Option<u32>)> {
    match dimension {
        Dimension::Site => record.site.clone().map(|s| (s, None)),
        Dimension::Room => record.room.clone().map(|r| (r, None)),
        Dimension::Month => record
            .month
            .map(|m| (m.name().to_string(), Some(m.number_from_month()))),
    }
}

/// Groups occupancy rows by `dimension`, sorted by summed fill descending.
///
/// Ties keep first-seen order for sites and rooms, and calendar order for
/// months. Null keys are grouped under `UNSPECIFIED`; null fills count as 0.
pub fn summarize_by(rows: &[&OccupancyRecord], dimension: Dimension) -> Vec<GroupSummary> {
    let mut grouper: Grouper<OccupancyAcc> = Grouper::new();
    for record in rows {
        let acc = grouper.entry(occupancy_key(record, dimension));
        acc.rows += 1;
        acc.fill += record.fill.unwrap_or(0);
        acc.available += record.available.unwrap_or(0);
        if let Some(rate) = record.occupancy_rate.filter(|r| r.is_finite()) {
            acc.rate_sum += rate;
            acc.rate_count += 1;
        }
    }

    let mut groups: Vec<GroupSummary> = grouper
        .into_natural_order(&dimension.to_string())
        .into_iter()
        .map(|(key, acc)| GroupSummary {
            unspecified: key.is_none(),
            key: key.unwrap_or_else(|| UNSPECIFIED.to_string()),
            rows: acc.rows,
            fill: acc.fill,
            available: acc.available,
            occupancy_mean: (acc.rate_count > 0).then(|| acc.rate_sum / acc.rate_count as f64),
        })
        .collect();
    // Stable sort: equal fills stay in the order established above.
    groups.sort_by(|a, b| b.fill.cmp(&a.fill));
    groups
}

/// Summed fill per key, highest first. See `summarize_by` for ordering.
pub fn fill_by(rows: &[&OccupancyRecord], dimension: Dimension) -> Vec<(String, i64)> {
    summarize_by(rows, dimension)
        .into_iter()
        .map(|g| (g.key, g.fill))
        .collect()
}

/// Total fill of the rows, ungrouped.
pub fn total_fill(rows: &[&OccupancyRecord]) -> i64 {
    rows.iter().filter_map(|r| r.fill).sum()
}

// ---------------------------------------------------------------------------
// Sales by dimension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SalesDimension {
    Site,
    Group,
    Month,
    Batch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesGroup {
    pub key: String,
    pub unspecified: bool,
    pub rows: usize,
    pub bookings: usize,
    pub paid_total: Decimal,
}

#[derive(Default)]
struct SalesAcc {
    rows: usize,
    bookings: usize,
    paid_total: Decimal,
}

fn sales_key(record: &SalesRecord, dimension: SalesDimension) -> Option<(String, Option<u32>)> {
    match dimension {
        SalesDimension::Site => record.site.clone().map(|s| (s, None)),
        SalesDimension::Group => record.group.clone().map(|g| (g, None)),
        SalesDimension::Month => record
            .month
            .map(|m| (m.name().to_string(), Some(m.number_from_month()))),
        SalesDimension::Batch => record.batch_start_date.map(|d| {
            let days = u32::try_from(d.num_days_from_ce()).ok();
            (d.format("%Y-%m-%d").to_string(), days)
        }),
    }
}

/// Bookings and paid totals per key.
///
/// Sites and groups are sorted by paid total descending (ties first-seen);
/// months and batches come back in chronological order.
pub fn sales_by(rows: &[&SalesRecord], dimension: SalesDimension) -> Vec<SalesGroup> {
    let mut grouper: Grouper<SalesAcc> = Grouper::new();
    for record in rows {
        let acc = grouper.entry(sales_key(record, dimension));
        acc.rows += 1;
        if is_booking(record) {
            acc.bookings += 1;
        }
        acc.paid_total += record.paid_amount.unwrap_or(Decimal::ZERO);
    }

    let mut groups: Vec<SalesGroup> = grouper
        .into_natural_order(&format!("{:?}", dimension))
        .into_iter()
        .map(|(key, acc)| SalesGroup {
            unspecified: key.is_none(),
            key: key.unwrap_or_else(|| UNSPECIFIED.to_string()),
            rows: acc.rows,
            bookings: acc.bookings,
            paid_total: acc.paid_total,
        })
        .collect();
    if matches!(dimension, SalesDimension::Site | SalesDimension::Group) {
        groups.sort_by(|a, b| b.paid_total.cmp(&a.paid_total));
    }
    groups
}

// ---------------------------------------------------------------------------
// Maximum flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flagged<K, V> {
    pub key: K,
    pub value: V,
    pub is_max: bool,
}

/// Marks every entry equal to the largest value. Ties all get the flag;
/// incomparable values (NaN) never do. Order is preserved.
pub fn flag_maximum<K: Clone, V: PartialOrd + Copy>(series: &[(K, V)]) -> Vec<Flagged<K, V>> {
    let max = series
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.partial_cmp(v).is_some())
        .reduce(|a, b| if b > a { b } else { a });

    series
        .iter()
        .map(|(key, value)| Flagged {
            key: key.clone(),
            value: *value,
            is_max: max.is_some_and(|m| *value == m),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Program;
    use chrono::{Month, NaiveDate};

    fn sale(category: Program, paid: i64, balance: Option<i64>) -> SalesRecord {
        SalesRecord {
            name: "student".to_string(),
            category: Some(category),
            paid_amount: Some(Decimal::from(paid)),
            balance: balance.map(Decimal::from),
            ..Default::default()
        }
    }

    fn room(site: Option<&str>, room: &str, month: Month, fill: Option<i64>) -> OccupancyRecord {
        OccupancyRecord {
            category: Some(Program::Program200),
            year: Some(2024),
            month: Some(month),
            site: site.map(String::from),
            room: Some(room.to_string()),
            fill,
            available: Some(10),
            occupancy_rate: fill.map(|f| f as f64 * 10.0),
        }
    }

    #[test]
    fn test_empty_input_summarizes_to_zero_and_no_data() {
        let summary = summarize(&[], &[]);
        assert_eq!(summary.booking_count, 0);
        assert_eq!(summary.paid_total, Decimal::ZERO);
        assert_eq!(summary.occupancy_mean, None);
    }

    #[test]
    fn test_two_settled_200hr_bookings() {
        let rows = [
            sale(Program::Program200, 500, Some(0)),
            sale(Program::Program200, 500, Some(0)),
            sale(Program::Program300, 300, Some(0)),
        ];
        let selected: Vec<&SalesRecord> = rows
            .iter()
            .filter(|r| r.category == Some(Program::Program200))
            .collect();
        let summary = summarize(&selected, &[]);
        assert_eq!(summary.booking_count, 2);
        assert_eq!(summary.paid_total, Decimal::from(1000));
    }

    #[test]
    fn test_outstanding_balance_is_not_a_booking_but_payment_counts() {
        let rows = [
            sale(Program::Program200, 200, Some(300)),
            sale(Program::Program200, 500, None),
            sale(Program::Program200, 500, Some(0)),
        ];
        let refs: Vec<&SalesRecord> = rows.iter().collect();
        assert_eq!(booking_count(&refs), 1);
        assert_eq!(paid_total(&refs), Decimal::from(1200));
    }

    #[test]
    fn test_missing_paid_amount_contributes_zero() {
        let mut unpaid = sale(Program::Program200, 0, Some(0));
        unpaid.paid_amount = None;
        let paid = sale(Program::Program200, 250, Some(0));
        assert_eq!(paid_total(&[&unpaid, &paid]), Decimal::from(250));
    }

    #[test]
    fn test_single_row_mean_round_trips_percentage() {
        let rate = crate::ingest::coerce::parse_percentage("87.5%");
        let record = OccupancyRecord {
            occupancy_rate: rate,
            ..Default::default()
        };
        assert_eq!(occupancy_mean(&[&record]), Some(87.5));
    }

    #[test]
    fn test_mean_ignores_null_rates() {
        let a = room(Some("Ubud"), "Garden", Month::May, Some(8));
        let b = room(Some("Ubud"), "Garden", Month::May, None);
        assert_eq!(occupancy_mean(&[&a, &b]), Some(80.0));
        assert_eq!(occupancy_mean(&[&b]), None);
    }

    #[test]
    fn test_fill_by_site_sorted_descending_ties_first_seen() {
        let rows = [
            room(Some("Canggu"), "Deluxe", Month::May, Some(5)),
            room(Some("Ubud"), "Garden", Month::May, Some(9)),
            room(Some("Uluwatu"), "Shared", Month::May, Some(4)),
            room(Some("Canggu"), "Shared", Month::June, Some(4)),
        ];
        let refs: Vec<&OccupancyRecord> = rows.iter().collect();
        assert_eq!(
            fill_by(&refs, Dimension::Site),
            vec![
                ("Canggu".to_string(), 9),
                ("Ubud".to_string(), 9),
                ("Uluwatu".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_fill_by_month_ties_break_chronologically() {
        let rows = [
            room(Some("Ubud"), "Garden", Month::September, Some(3)),
            room(Some("Ubud"), "Garden", Month::February, Some(3)),
            room(Some("Ubud"), "Garden", Month::July, Some(7)),
        ];
        let refs: Vec<&OccupancyRecord> = rows.iter().collect();
        let keys: Vec<String> = fill_by(&refs, Dimension::Month).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["July", "February", "September"]);
    }

    #[test]
    fn test_grouped_fill_conserves_total() {
        let rows = [
            room(Some("Ubud"), "Garden", Month::May, Some(5)),
            room(None, "Garden", Month::May, Some(2)),
            room(Some("Canggu"), "Deluxe", Month::June, None),
            room(Some("Canggu"), "Shared", Month::June, Some(6)),
        ];
        let refs: Vec<&OccupancyRecord> = rows.iter().collect();
        let total = total_fill(&refs);
        for dimension in [Dimension::Site, Dimension::Room, Dimension::Month] {
            let grouped: i64 = fill_by(&refs, dimension).iter().map(|(_, f)| f).sum();
            assert_eq!(grouped, total, "{} grouping lost fill", dimension);
        }
        let sites = fill_by(&refs, Dimension::Site);
        assert!(sites.contains(&(UNSPECIFIED.to_string(), 2)));
    }

    #[test]
    fn test_site_named_unspecified_stays_apart_from_null_sites() {
        let rows = [
            room(Some(UNSPECIFIED), "Garden", Month::May, Some(3)),
            room(None, "Garden", Month::May, Some(2)),
            room(Some(UNSPECIFIED), "Shared", Month::June, Some(1)),
        ];
        let refs: Vec<&OccupancyRecord> = rows.iter().collect();
        let groups = summarize_by(&refs, Dimension::Site);

        let shape: Vec<(&str, bool, i64)> = groups
            .iter()
            .map(|g| (g.key.as_str(), g.unspecified, g.fill))
            .collect();
        assert_eq!(
            shape,
            vec![(UNSPECIFIED, false, 4), (UNSPECIFIED, true, 2)],
            "a real site and the null bucket must be two groups"
        );
    }

    #[test]
    fn test_summarize_by_room_reports_capacity_and_mean() {
        let rows = [
            room(Some("Ubud"), "Garden", Month::May, Some(8)),
            room(Some("Ubud"), "Garden", Month::June, Some(6)),
        ];
        let refs: Vec<&OccupancyRecord> = rows.iter().collect();
        let groups = summarize_by(&refs, Dimension::Room);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows, 2);
        assert_eq!(groups[0].available, 20);
        assert_eq!(groups[0].occupancy_mean, Some(70.0));
    }

    #[test]
    fn test_flag_maximum_marks_all_ties() {
        let fills = [("A", 10), ("B", 25), ("C", 25)];
        let flagged = flag_maximum(&fills);
        let flags: Vec<(&str, bool)> = flagged.iter().map(|f| (f.key, f.is_max)).collect();
        assert_eq!(flags, vec![("A", false), ("B", true), ("C", true)]);
    }

    #[test]
    fn test_flag_maximum_on_empty_and_nan() {
        let empty: [(&str, f64); 0] = [];
        assert!(flag_maximum(&empty).is_empty());

        let with_nan = [("A", f64::NAN), ("B", 1.0)];
        let flagged = flag_maximum(&with_nan);
        assert!(!flagged[0].is_max);
        assert!(flagged[1].is_max);
    }

    #[test]
    fn test_sales_by_batch_is_chronological() {
        let mut later = sale(Program::Program200, 100, Some(0));
        later.batch_start_date = NaiveDate::from_ymd_opt(2024, 6, 3);
        let mut earlier = sale(Program::Program200, 300, Some(50));
        earlier.batch_start_date = NaiveDate::from_ymd_opt(2024, 2, 5);
        let undated = sale(Program::Program200, 10, Some(0));

        let groups = sales_by(&[&later, &earlier, &undated], SalesDimension::Batch);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["2024-02-05", "2024-06-03", UNSPECIFIED]);
        assert!(groups[2].unspecified);
        assert_eq!(groups[0].bookings, 0);
        assert_eq!(groups[1].bookings, 1);
        assert_eq!(earlier.batch_start_date.map(|d| d.year()), Some(2024));
    }

    #[test]
    fn test_sales_by_site_sorted_by_paid_total() {
        let mut a = sale(Program::Program200, 100, Some(0));
        a.site = Some("Ubud".to_string());
        let mut b = sale(Program::Program200, 900, Some(0));
        b.site = Some("Canggu".to_string());
        let groups = sales_by(&[&a, &b], SalesDimension::Site);
        assert_eq!(groups[0].key, "Canggu");
        assert_eq!(groups[0].paid_total, Decimal::from(900));
    }
}
