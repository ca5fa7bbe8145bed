//! Reconcile GitHub activity with support-ticket spreadsheets into per-person
//! team metrics.
//!
//! The core (`reconcile`) is pure: it takes already-loaded records plus an
//! explicit configuration and returns a multi-table report. Loading
//! (`sources`) and writing (`render`) live at the edges.

pub mod aggregate;
pub mod cli;
pub mod dates;
pub mod derived;
pub mod error;
pub mod ext;
pub mod identity;
pub mod manifest;
pub mod model;
pub mod ranking;
pub mod reconcile;
pub mod render;
pub mod report;
pub mod sources;
pub mod util;
pub mod window;

pub use error::{ReconcileError, Warning, WarningKind};
pub use reconcile::{reconcile, ReconcileConfig, ReconcileInput};
pub use report::ReconciliationReport;
