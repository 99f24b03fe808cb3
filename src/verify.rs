//! Data source verification
//!
//! Checks every configured source against what the loader expects: that it
//! can be fetched, that it decodes, and which expected columns it carries.
//!
//! Run this after editing the config, before pointing a dashboard at it.

use chrono::Utc;
use serde::Serialize;

use crate::config::{DashboardConfig, SourceSpec};
use crate::ingest::{self, occupancy, sales, sheet::RawTable};
use crate::model::{Column, DashboardError, Location, LoadWarning, TableKind};
use crate::schema;

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<SourceVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceVerification {
    pub location: Location,
    pub table: TableKind,
    pub url: String,
    pub status: VerificationStatus,
    pub reachable: bool,
    pub row_count: usize,
    pub columns_found: Vec<Column>,
    pub columns_missing: Vec<Column>,
    /// Canonical sheet headers for `columns_missing`, as a user would type them.
    pub missing_headers: Vec<&'static str>,
    pub malformed_values: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum VerificationStatus {
    Success,
    PartialSuccess,
    Failed,
}

// ============================================================================
// Single source
// ============================================================================

fn build_table(
    kind: TableKind,
    raw: &RawTable,
    url: &str,
) -> Result<(usize, Vec<Column>, Vec<LoadWarning>), DashboardError> {
    match kind {
        TableKind::Sales => {
            let (table, warnings) = sales::sales_table(raw, url)?;
            Ok((table.len(), table.columns.into_iter().collect(), warnings))
        }
        TableKind::Occupancy => {
            let (table, warnings) = occupancy::occupancy_table(raw, url)?;
            Ok((table.len(), table.columns.into_iter().collect(), warnings))
        }
    }
}

fn headers_for(kind: TableKind, columns: &[Column]) -> Vec<&'static str> {
    columns
        .iter()
        .filter_map(|&c| schema::find_column(kind, c))
        .map(|spec| spec.header)
        .collect()
}

pub fn verify_source(
    client: &reqwest::blocking::Client,
    location: Location,
    kind: TableKind,
    spec: &SourceSpec,
) -> SourceVerification {
    let mut result = SourceVerification {
        location,
        table: kind,
        url: spec.url.clone(),
        status: VerificationStatus::Failed,
        reachable: false,
        row_count: 0,
        columns_found: Vec::new(),
        columns_missing: schema::expected_columns(kind),
        missing_headers: Vec::new(),
        malformed_values: 0,
        error_message: None,
    };
    result.missing_headers = headers_for(kind, &result.columns_missing);

    let raw = match ingest::read_raw(client, spec) {
        Ok(raw) => raw,
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    };
    result.reachable = true;

    match build_table(kind, &raw, &spec.url) {
        Ok((rows, found, warnings)) => {
            result.row_count = rows;
            result.columns_missing.retain(|c| !found.contains(c));
            result.missing_headers = headers_for(kind, &result.columns_missing);
            result.columns_found = found;
            result.malformed_values = warnings
                .iter()
                .filter(|w| matches!(w, LoadWarning::MalformedValue { .. }))
                .count();
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
            return result;
        }
    }

    result.status = if result.row_count > 0 && result.columns_missing.is_empty() {
        VerificationStatus::Success
    } else {
        VerificationStatus::PartialSuccess
    };
    result
}

// ============================================================================
// Full Verification Runner
// ============================================================================

pub fn verify_sources(
    client: &reqwest::blocking::Client,
    config: &DashboardConfig,
) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results: Vec::new(),
        summary: VerificationSummary::default(),
    };

    for sources in &config.locations {
        println!("🔍 Verifying {} sources...", sources.location);
        for (kind, spec) in [
            (TableKind::Sales, &sources.sales),
            (TableKind::Occupancy, &sources.occupancy),
        ] {
            print!("  {} ... ", kind);
            let result = verify_source(client, sources.location, kind, spec);

            report.summary.total += 1;
            match result.status {
                VerificationStatus::Success => {
                    println!("✓ OK ({} rows)", result.row_count);
                    report.summary.working += 1;
                }
                VerificationStatus::PartialSuccess => {
                    println!(
                        "⚠ Partial ({} rows, missing: {})",
                        result.row_count,
                        result.missing_headers.join(", ")
                    );
                    report.summary.partial += 1;
                }
                VerificationStatus::Failed => {
                    println!("✗ FAILED: {}", result.error_message.as_deref().unwrap_or("Unknown"));
                    report.summary.failed += 1;
                }
            }

            report.results.push(result);
        }
    }

    report
}

pub fn print_summary(report: &VerificationReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    println!("📊 VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!(
        "Sources:    {}/{} fully working  ({} partial, {} failed)",
        report.summary.working, report.summary.total, report.summary.partial, report.summary.failed
    );
    println!();

    let usable = report.summary.working + report.summary.partial;
    let success_rate = if report.summary.total > 0 {
        (usable as f64 / report.summary.total as f64) * 100.0
    } else {
        0.0
    };

    println!("Usable Sources: {:.1}% ({}/{})", success_rate, usable, report.summary.total);
    println!("═══════════════════════════════════════════════════════════");
}
