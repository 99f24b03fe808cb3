/// View models for the Overview, Location and Batch screens.
///
/// Each builder takes a loaded dataset and the operator's selection and
/// returns a serializable struct holding the headline numbers and the ordered
/// series each chart plots. Rendering is left to whatever consumes the JSON.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::analysis::aggregate::{self, Dimension, GroupSummary, SalesDimension, SalesGroup, Summary};
use crate::analysis::filter::{self, FilterSelection};
use crate::analysis::growth::{self, GrowthMode, GrowthPoint, MonthWindow, MonthlyMetric};
use crate::model::{Column, Dataset, Location};

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    /// Set on every bar that shares the chart's maximum value.
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Bar>,
}

impl Chart {
    fn from_series(title: &str, x_label: &str, y_label: &str, series: &[(String, f64)]) -> Self {
        let bars = aggregate::flag_maximum(series)
            .into_iter()
            .map(|f| Bar {
                label: f.key,
                value: f.value,
                highlighted: f.is_max,
            })
            .collect();
        Self {
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            bars,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

fn fill_series(groups: &[GroupSummary]) -> Vec<(String, f64)> {
    groups.iter().map(|g| (g.key.clone(), g.fill as f64)).collect()
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OverviewView {
    pub location: Location,
    pub selection: FilterSelection,
    pub summary: Summary,
    /// `summary.paid_total` as "$1,000.00".
    pub total_paid: String,
    /// `summary.occupancy_mean` as "87.50%", or "no data".
    pub occupancy: String,
    pub top_sites: Chart,
    pub top_rooms: Chart,
    /// Fill per month of the selected year; the month choice does not apply.
    pub fill_by_month: Chart,
    pub booking_growth: Vec<GrowthPoint>,
    /// Filter constraints that could not be applied to some table.
    pub skipped_filters: Vec<Column>,
}

pub fn overview(dataset: &Dataset, selection: &FilterSelection) -> OverviewView {
    let sales = filter::apply(&dataset.sales, selection);
    let occupancy = filter::apply(&dataset.occupancy, selection);
    let year_sales = filter::apply(&dataset.sales, &selection.all_months());
    let year_occupancy = filter::apply(&dataset.occupancy, &selection.all_months());

    let summary = aggregate::summarize(&sales.rows, &occupancy.rows);
    let sites = aggregate::summarize_by(&occupancy.rows, Dimension::Site);
    let rooms = aggregate::summarize_by(&occupancy.rows, Dimension::Room);
    let months = aggregate::summarize_by(&year_occupancy.rows, Dimension::Month);

    let bookings = growth::monthly_series(&year_sales.rows, &[], MonthlyMetric::Bookings);
    let booking_growth = growth::growth_over_time(&bookings, MonthWindow::full(), GrowthMode::Percent);

    OverviewView {
        location: dataset.location,
        selection: *selection,
        total_paid: format_amount(summary.paid_total),
        occupancy: format_occupancy(summary.occupancy_mean),
        summary,
        top_sites: Chart::from_series("Top Sites", "Site", "Count", &fill_series(&sites)),
        top_rooms: Chart::from_series("Top Rooms", "Room", "Total Fill", &fill_series(&rooms)),
        fill_by_month: Chart::from_series("Total Fill", "Month", "Total Fill", &fill_series(&months)),
        booking_growth,
        skipped_filters: merge_skipped([&sales.skipped, &occupancy.skipped]),
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SiteRow {
    pub site: String,
    /// Rows with no site; `site` then reads "Unspecified".
    pub unspecified: bool,
    pub fill: i64,
    pub available: i64,
    pub occupancy: String,
    pub occupancy_mean: Option<f64>,
    pub bookings: usize,
    pub paid_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationView {
    pub location: Location,
    pub selection: FilterSelection,
    /// Sites ordered by fill, highest first.
    pub sites: Vec<SiteRow>,
    pub fill_chart: Chart,
    pub skipped_filters: Vec<Column>,
}

/// Per-site capacity use joined with per-site sales.
///
/// Sites appearing only in the sales table are appended after the occupancy
/// sites with zero fill.
pub fn location_view(dataset: &Dataset, selection: &FilterSelection) -> LocationView {
    let sales = filter::apply(&dataset.sales, selection);
    let occupancy = filter::apply(&dataset.occupancy, selection);

    let groups = aggregate::summarize_by(&occupancy.rows, Dimension::Site);
    let sales_groups = aggregate::sales_by(&sales.rows, SalesDimension::Site);
    let sales_for = |site: &str, unspecified: bool| {
        sales_groups
            .iter()
            .find(|g| g.key == site && g.unspecified == unspecified)
    };

    let mut sites: Vec<SiteRow> = groups
        .iter()
        .map(|g| {
            let sold = sales_for(&g.key, g.unspecified);
            SiteRow {
                site: g.key.clone(),
                unspecified: g.unspecified,
                fill: g.fill,
                available: g.available,
                occupancy: format_occupancy(g.occupancy_mean),
                occupancy_mean: g.occupancy_mean,
                bookings: sold.map_or(0, |s| s.bookings),
                paid_total: sold.map_or(Decimal::ZERO, |s| s.paid_total),
            }
        })
        .collect();
    for sold in &sales_groups {
        if !groups
            .iter()
            .any(|g| g.key == sold.key && g.unspecified == sold.unspecified)
        {
            sites.push(SiteRow {
                site: sold.key.clone(),
                unspecified: sold.unspecified,
                fill: 0,
                available: 0,
                occupancy: format_occupancy(None),
                occupancy_mean: None,
                bookings: sold.bookings,
                paid_total: sold.paid_total,
            });
        }
    }

    LocationView {
        location: dataset.location,
        selection: *selection,
        fill_chart: Chart::from_series("Fill by Site", "Site", "Total Fill", &fill_series(&groups)),
        sites,
        skipped_filters: merge_skipped([&sales.skipped, &occupancy.skipped]),
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    pub location: Location,
    pub selection: FilterSelection,
    /// One entry per batch start date, earliest first.
    pub batches: Vec<SalesGroup>,
    pub bookings_chart: Chart,
    pub skipped_filters: Vec<Column>,
}

pub fn batch_view(dataset: &Dataset, selection: &FilterSelection) -> BatchView {
    let sales = filter::apply(&dataset.sales, selection);
    let batches = aggregate::sales_by(&sales.rows, SalesDimension::Batch);
    let series: Vec<(String, f64)> = batches
        .iter()
        .map(|b| (b.key.clone(), b.bookings as f64))
        .collect();

    BatchView {
        location: dataset.location,
        selection: *selection,
        bookings_chart: Chart::from_series("Bookings by Batch", "Batch Start", "Bookings", &series),
        batches,
        skipped_filters: sales.skipped,
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// "87.50%", or "no data" when there is nothing to average.
pub fn format_occupancy(mean: Option<f64>) -> String {
    match mean {
        Some(value) if value.is_finite() => format!("{:.2}%", value),
        _ => "no data".to_string(),
    }
}

/// Dollar amount with thousands separators and two decimals: "$1,000.00".
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn merge_skipped<const N: usize>(lists: [&Vec<Column>; N]) -> Vec<Column> {
    let merged: BTreeSet<Column> = lists.into_iter().flatten().copied().collect();
    merged.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
