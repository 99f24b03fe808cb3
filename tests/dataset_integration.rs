//! End-to-end tests over the CSV fixtures in `tests/fixtures/`.
//!
//! Each test builds a config pointing at local files, loads it through a
//! `Session`, and checks the numbers the dashboard would show.
//!
//! Run with: cargo test --test dataset_integration

use chrono::{Duration, Month};
use rust_decimal::Decimal;

use sales_report::analysis::aggregate::{self, Dimension};
use sales_report::analysis::filter::{self, FilterSelection, YearSelection};
use sales_report::config::DashboardConfig;
use sales_report::model::{Column, Dataset, Location, LoadWarning, Program};
use sales_report::session::Session;
use sales_report::view;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn config_for(sales: &str, occupancy: &str) -> DashboardConfig {
    let toml = format!(
        r#"
refresh_after_minutes = 60

[[locations]]
location = "Bali"
sales = {{ url = '{}' }}
occupancy = {{ url = '{}' }}
"#,
        fixture(sales),
        fixture(occupancy)
    );
    DashboardConfig::from_toml_str(&toml).expect("fixture config should parse")
}

fn loaded_session() -> Session {
    let mut session = Session::new(config_for("sales.csv", "occupancy.csv"), Location::Bali);
    session.load().expect("fixtures should load");
    session
}

fn dataset(session: &Session) -> &Dataset {
    session.dataset().expect("session was loaded")
}

// --- Loading ----------------------------------------------------------------

#[test]
fn test_fixtures_load_with_one_malformed_cell() {
    let session = loaded_session();
    let data = dataset(&session);

    assert_eq!(data.sales.len(), 7);
    assert_eq!(data.occupancy.len(), 6);
    assert_eq!(
        data.warnings,
        vec![LoadWarning::MalformedValue {
            table: sales_report::model::TableKind::Sales,
            row: 7,
            column: Column::PaidAmount,
            raw: "n/a".to_string(),
        }],
        "only Fay's 'n/a' payment should be flagged"
    );

    let ana = &data.sales.rows[0];
    assert_eq!(ana.paid_amount, Some(Decimal::from(2400)));
    assert_eq!(ana.month, Some(Month::January));

    let cara = &data.sales.rows[2];
    assert_eq!(
        cara.batch_start_date.map(|d| d.to_string()),
        Some("2024-03-04".to_string()),
        "day-first dates parse as day-first"
    );
}

#[test]
fn test_session_staleness_follows_config() {
    let session = loaded_session();
    let loaded_at = dataset(&session).loaded_at;
    assert!(!session.is_stale_at(loaded_at + Duration::minutes(60)));
    assert!(session.is_stale_at(loaded_at + Duration::minutes(61)));
}

#[test]
fn test_missing_source_file_is_data_unavailable() {
    let mut session =
        Session::new(config_for("sales.csv", "no_such_occupancy.csv"), Location::Bali);
    let err = session.load().expect_err("missing file must fail the whole load");
    assert!(err.to_string().starts_with("Data unavailable"), "got: {}", err);
    assert!(session.dataset().is_err(), "no partial dataset after a failed load");
}

// --- Selection lists --------------------------------------------------------

#[test]
fn test_selection_lists() {
    let session = loaded_session();
    let data = dataset(&session);

    assert_eq!(
        filter::year_options(data),
        vec![YearSelection::All, YearSelection::Year(2023), YearSelection::Year(2024)]
    );
    assert_eq!(
        filter::months_for_year(data, YearSelection::Year(2024)),
        vec![Month::January, Month::March, Month::May]
    );
    assert!(filter::months_for_year(data, YearSelection::All).is_empty());
}

// --- Overview ---------------------------------------------------------------

#[test]
fn test_overview_for_january() {
    let session = loaded_session();
    let selection = FilterSelection::new(Program::Program200)
        .with_year(2024)
        .with_month(Month::January);
    let overview = view::overview(dataset(&session), &selection);

    assert_eq!(overview.summary.booking_count, 1, "Ben still owes a balance");
    assert_eq!(overview.total_paid, "$2,900.00");
    assert_eq!(overview.occupancy, "68.75%");
    assert_eq!(overview.top_sites.bars.len(), 1);
    assert_eq!(overview.top_sites.bars[0].label, "Ubud");
    assert_eq!(overview.top_sites.bars[0].value, 11.0);
}

#[test]
fn test_overview_for_whole_year() {
    let session = loaded_session();
    let selection = FilterSelection::new(Program::Program200).with_year(2024);
    let overview = view::overview(dataset(&session), &selection);

    assert_eq!(overview.summary.booking_count, 3);
    assert_eq!(overview.summary.paid_total, Decimal::from(7700));

    let months: Vec<(&str, f64)> = overview
        .fill_by_month
        .bars
        .iter()
        .map(|b| (b.label.as_str(), b.value))
        .collect();
    assert_eq!(months, vec![("January", 11.0), ("March", 6.0), ("May", 0.0)]);
    assert!(overview.fill_by_month.bars[0].highlighted);
}

#[test]
fn test_all_years_booking_growth_runs_across_the_year_boundary() {
    let session = loaded_session();
    let overview = view::overview(dataset(&session), &FilterSelection::new(Program::Program200));

    let points: Vec<(i32, &str, f64, Option<f64>)> = overview
        .booking_growth
        .iter()
        .map(|p| (p.year, p.month.as_str(), p.value, p.change))
        .collect();
    assert_eq!(
        points,
        vec![
            (2023, "December", 1.0, None),
            (2024, "January", 1.0, Some(0.0)),
            (2024, "March", 1.0, Some(0.0)),
            (2024, "May", 1.0, Some(0.0)),
        ],
        "December 2023 must precede January 2024, not trail May"
    );
}

#[test]
fn test_300hr_overview() {
    let session = loaded_session();
    let overview = view::overview(dataset(&session), &FilterSelection::new(Program::Program300));
    assert_eq!(overview.summary.booking_count, 1);
    assert_eq!(overview.total_paid, "$3,600.00");
    assert_eq!(overview.occupancy, "50.00%");
}

// --- Location and batch -----------------------------------------------------

#[test]
fn test_location_view_orders_sites_by_fill() {
    let session = loaded_session();
    let selection = FilterSelection::new(Program::Program200).with_year(2024);
    let location = view::location_view(dataset(&session), &selection);

    let sites: Vec<(&str, i64)> = location.sites.iter().map(|s| (s.site.as_str(), s.fill)).collect();
    assert_eq!(sites, vec![("Ubud", 11), ("Canggu", 6), ("Uluwatu", 0)]);
    assert_eq!(location.sites[2].occupancy, "no data");
    assert_eq!(location.sites[2].bookings, 1);
}

#[test]
fn test_batch_view_lists_batches_chronologically() {
    let session = loaded_session();
    let batches = view::batch_view(dataset(&session), &FilterSelection::new(Program::Program200));
    let keys: Vec<&str> = batches.batches.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2023-12-04", "2024-01-08", "2024-03-04", "2024-05-06"]);
    assert!(batches.batches.iter().all(|b| b.bookings == 1));
}

// --- Properties -------------------------------------------------------------

#[test]
fn test_filtered_rows_match_selection_and_grouping_conserves_fill() {
    let session = loaded_session();
    let data = dataset(&session);

    for program in Program::ALL {
        for year in filter::year_options(data) {
            let base = match year {
                YearSelection::All => FilterSelection::new(program),
                YearSelection::Year(y) => FilterSelection::new(program).with_year(y),
            };
            let mut selections = vec![base];
            selections.extend(
                filter::months_for_year(data, year)
                    .into_iter()
                    .map(|month| base.with_month(month)),
            );

            for selection in selections {
                let occupancy = filter::apply(&data.occupancy, &selection);
                for row in &occupancy.rows {
                    assert_eq!(row.category, Some(program));
                    if let YearSelection::Year(y) = selection.year {
                        assert_eq!(row.year, Some(y));
                    }
                    if let Some(m) = selection.month {
                        assert_eq!(row.month, Some(m));
                    }
                }

                let total = aggregate::total_fill(&occupancy.rows);
                for dimension in [Dimension::Site, Dimension::Room, Dimension::Month] {
                    let grouped: i64 = aggregate::fill_by(&occupancy.rows, dimension)
                        .iter()
                        .map(|(_, fill)| fill)
                        .sum();
                    assert_eq!(grouped, total, "{:?} / {}", selection, dimension);
                }
            }
        }
    }
}

#[test]
fn test_missing_month_column_degrades_month_filter_only() {
    let mut session =
        Session::new(config_for("sales.csv", "occupancy_no_month.csv"), Location::Bali);
    let data = session.load().expect("aliased headers should still load");

    assert!(data.warnings.contains(&LoadWarning::MissingColumn {
        table: sales_report::model::TableKind::Occupancy,
        column: Column::Month,
    }));

    let selection = FilterSelection::new(Program::Program200)
        .with_year(2024)
        .with_month(Month::March);
    let overview = view::overview(data, &selection);
    assert_eq!(overview.skipped_filters, vec![Column::Month]);
    // Both 2024 200HR occupancy rows survive: 87.5 and 100.
    assert_eq!(overview.occupancy, "93.75%");
    // Sales still filter by month: only Cara in March.
    assert_eq!(overview.summary.booking_count, 1);
}
