//! Data back end for the yoga-teacher-training sales dashboard.
//!
//! Loads the sales and occupancy exports for a location, filters them by
//! program, year and month, and produces the summary metrics and ordered
//! series the Overview, Location and Batch views display.

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod schema;
pub mod session;
pub mod verify;
pub mod view;
