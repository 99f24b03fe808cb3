/// Source retrieval for spreadsheet exports.
///
/// A source is either a remote URL (`http://` / `https://`) fetched with a
/// blocking client, or a local file path. Remote fetches run under the
/// configured timeout so a dead host fails fast instead of hanging the view.

use std::time::Duration;

use crate::model::DashboardError;

/// Builds the HTTP client used for every remote source.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, DashboardError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DashboardError::ConfigError(format!("failed to build HTTP client: {}", e)))
}

pub fn is_remote(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Returns the raw bytes of `source`.
pub fn fetch_bytes(
    client: &reqwest::blocking::Client,
    source: &str,
) -> Result<Vec<u8>, DashboardError> {
    if is_remote(source) {
        fetch_remote(client, source)
    } else {
        read_local(source)
    }
}

fn fetch_remote(
    client: &reqwest::blocking::Client,
    url: &str,
) -> Result<Vec<u8>, DashboardError> {
    let unavailable = |e: reqwest::Error| DashboardError::DataUnavailable {
        source: url.to_string(),
        reason: if e.is_timeout() {
            "request timed out".to_string()
        } else {
            format!("request failed: {}", e)
        },
    };

    let response = client.get(url).send().map_err(unavailable)?;

    if !response.status().is_success() {
        return Err(DashboardError::HttpError {
            source: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let body = response.bytes().map_err(unavailable)?;
    Ok(body.to_vec())
}

fn read_local(path: &str) -> Result<Vec<u8>, DashboardError> {
    std::fs::read(path).map_err(|e| DashboardError::DataUnavailable {
        source: path.to_string(),
        reason: format!("failed to read file: {}", e),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
