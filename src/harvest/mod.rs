//! Harvest module: the cancellable fetch-and-paginate loop
//!
//! This module contains:
//! - `Harvester`: starts, supersedes, and cancels runs
//! - `ScrapeSession`: the state owned by one run
//! - `RunState` / `HarvestOutcome`: lifecycle and terminal results
//! - `HarvestObserver`: live progress and record snapshots for the caller
//!
//! Runs are strictly sequential inside: fetch, extract, pause, repeat. The
//! suspension points (fetch, extraction, pause) all observe cancellation.

mod driver;
mod session;
mod state;

pub use driver::{Harvester, DEFAULT_PAGE_DELAY};
pub use session::{FailureKind, HarvestOutcome, HarvestReport, ScrapeSession};
pub use state::RunState;

use crate::extract::Record;

/// Receives live updates from the running session
///
/// Updates from a session that has been superseded by a newer one are not
/// delivered.
pub trait HarvestObserver: Send + Sync {
    /// A human-readable progress line was appended to the log
    fn on_progress(&self, _message: &str) {}

    /// Snapshot of the accumulated records after a page was processed
    fn on_records(&self, _records: &[Record]) {}

    /// The session changed state
    fn on_state(&self, _state: RunState) {}
}

/// Observer that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl HarvestObserver for NoopObserver {}
