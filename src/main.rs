use std::env;
use std::process::ExitCode;

use serde_json::json;

use sales_report::analysis::filter::{self, FilterSelection, YearSelection};
use sales_report::config::DashboardConfig;
use sales_report::ingest::fetch;
use sales_report::logging::{self, Component};
use sales_report::model::{DashboardError, Location, Program};
use sales_report::session::Session;
use sales_report::{verify, view};

const LOCATION_ENV_VAR: &str = "SALES_REPORT_LOCATION";

fn main() -> ExitCode {
    let config = match DashboardConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init_logger(config.log.level, config.log.file.as_deref(), config.log.timestamps);
    logging::info(
        Component::Config,
        None,
        &format!("{} location(s) configured", config.locations.len()),
    );

    let result = match env::args().nth(1).as_deref() {
        Some("verify") => run_verification(&config),
        _ => run_report(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Component::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn selected_location() -> Result<Location, DashboardError> {
    match env::var(LOCATION_ENV_VAR) {
        Ok(value) => value.parse().map_err(|_| {
            DashboardError::ConfigError(format!("{} has unknown location '{}'", LOCATION_ENV_VAR, value))
        }),
        Err(_) => Ok(Location::Bali),
    }
}

/// Prints every view for every program and year of the configured location.
fn run_report(config: DashboardConfig) -> Result<(), DashboardError> {
    let location = selected_location()?;
    let mut session = Session::new(config, location);
    let dataset = session.load()?;

    logging::info(
        Component::System,
        Some(&location.to_string()),
        &format!(
            "loaded {} sales rows, {} occupancy rows ({} warnings)",
            dataset.sales.len(),
            dataset.occupancy.len(),
            dataset.warnings.len()
        ),
    );

    let mut reports = Vec::new();
    for program in Program::ALL {
        for year in filter::year_options(dataset) {
            let selection = match year {
                YearSelection::All => FilterSelection::new(program),
                YearSelection::Year(y) => FilterSelection::new(program).with_year(y),
            };
            reports.push(json!({
                "overview": view::overview(dataset, &selection),
                "location": view::location_view(dataset, &selection),
                "batch": view::batch_view(dataset, &selection),
                "months": filter::months_for_year(dataset, year)
                    .iter()
                    .map(|m| m.name())
                    .collect::<Vec<_>>(),
            }));
        }
    }

    let output = serde_json::to_string_pretty(&reports).map_err(|e| {
        DashboardError::ConfigError(format!("failed to serialize report: {}", e))
    })?;
    println!("{}", output);
    Ok(())
}

fn run_verification(config: &DashboardConfig) -> Result<(), DashboardError> {
    let client = fetch::build_client(config.request_timeout_secs)?;
    let report = verify::verify_sources(&client, config);
    verify::print_summary(&report);
    Ok(())
}
