/// Per-operator dashboard session.
///
/// A session owns the dataset for one location. Nothing is shared between
/// sessions: each one fetches its own snapshot and replaces it only on an
/// explicit `refresh`.
///
/// # Clock injection
/// `is_stale_at` takes `now` as a parameter instead of calling `Utc::now()`,
/// so staleness is deterministic in tests.

use chrono::{DateTime, Duration, Utc};

use crate::config::DashboardConfig;
use crate::ingest;
use crate::ingest::fetch;
use crate::logging::{self, Component};
use crate::model::{DashboardError, Dataset, Location};

pub struct Session {
    config: DashboardConfig,
    location: Location,
    dataset: Option<Dataset>,
}

impl Session {
    /// An empty session; call `load` before requesting views.
    pub fn new(config: DashboardConfig, location: Location) -> Self {
        Self {
            config,
            location,
            dataset: None,
        }
    }

    /// A session around an already-built dataset.
    pub fn with_dataset(config: DashboardConfig, dataset: Dataset) -> Self {
        Self {
            config,
            location: dataset.location,
            dataset: Some(dataset),
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.is_some()
    }

    /// Loads the dataset if the session does not have one yet.
    pub fn load(&mut self) -> Result<&Dataset, DashboardError> {
        if self.dataset.is_none() {
            self.dataset = Some(self.fetch()?);
        }
        self.dataset()
    }

    /// Reloads both tables unconditionally.
    ///
    /// On failure the previous snapshot, if any, stays in place and the
    /// error is returned.
    pub fn refresh(&mut self) -> Result<&Dataset, DashboardError> {
        match self.fetch() {
            Ok(dataset) => {
                self.dataset = Some(dataset);
                self.dataset()
            }
            Err(e) => {
                if self.dataset.is_some() {
                    logging::warn(
                        Component::Session,
                        Some(&self.location.to_string()),
                        &format!("refresh failed, keeping previous snapshot: {}", e),
                    );
                }
                Err(e)
            }
        }
    }

    pub fn dataset(&self) -> Result<&Dataset, DashboardError> {
        self.dataset
            .as_ref()
            .ok_or(DashboardError::NotLoaded(self.location))
    }

    /// Returns `true` if the dataset is older than `refresh_after_minutes`
    /// relative to `now`. Age equal to the threshold is not stale.
    /// A session with nothing loaded is always stale.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        let Some(dataset) = &self.dataset else {
            return true;
        };
        // A threshold too large for chrono never expires.
        let Some(max_age) = i64::try_from(self.config.refresh_after_minutes)
            .ok()
            .and_then(Duration::try_minutes)
        else {
            return false;
        };
        now.signed_duration_since(dataset.loaded_at) > max_age
    }

    /// Convenience wrapper that uses the real current time.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    fn fetch(&self) -> Result<Dataset, DashboardError> {
        let context = self.location.to_string();
        let sources = match self.config.sources_for(self.location) {
            Ok(sources) => sources,
            Err(e) => {
                logging::log_load_failure(Component::Session, &context, &e);
                return Err(e);
            }
        };
        let client = fetch::build_client(self.config.request_timeout_secs)?;
        logging::info(
            Component::Session,
            Some(&context),
            "loading sales and occupancy sources",
        );
        ingest::load_dataset(&client, sources)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
