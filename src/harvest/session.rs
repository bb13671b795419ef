//! Per-run session state and run results

use crate::extract::{ExtractionError, Record};
use crate::harvest::RunState;
use crate::url::Locator;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Why a run ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The extraction response could not be interpreted
    MalformedResponse,
    /// The extraction service produced no usable output
    EmptyResponse,
    /// Transport, API status, or other upstream failure
    Upstream,
}

/// Terminal outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestOutcome {
    Completed,
    Cancelled,
    Blocked {
        /// The locator no route could retrieve
        locator: Locator,
        /// Last route failure
        summary: String,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl HarvestOutcome {
    /// Maps an extraction failure onto a `Failed` outcome
    pub fn from_extraction_error(error: &ExtractionError) -> Self {
        let kind = match error {
            ExtractionError::MalformedResponse(_) => FailureKind::MalformedResponse,
            ExtractionError::Empty(_) => FailureKind::EmptyResponse,
            _ => FailureKind::Upstream,
        };
        Self::Failed {
            kind,
            message: error.to_string(),
        }
    }

    /// The terminal run state this outcome corresponds to
    pub fn state(&self) -> RunState {
        match self {
            Self::Completed => RunState::Completed,
            Self::Cancelled => RunState::Cancelled,
            Self::Blocked { .. } => RunState::Blocked,
            Self::Failed { .. } => RunState::Failed,
        }
    }

    /// Instructions for finishing a blocked page by hand, if this run was blocked
    pub fn handoff_message(&self) -> Option<String> {
        match self {
            Self::Blocked { locator, .. } => Some(format!(
                "Automated scraping from \"{}\" was blocked. As a workaround, open the URL in a \
                 browser, view its page source, save the entire HTML to a file, and parse it in \
                 single-page mode.",
                locator
            )),
            _ => None,
        }
    }
}

/// Everything a caller gets back from one run
///
/// Records accumulated before the run ended are always included, whatever
/// the outcome.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub session_id: u64,
    pub outcome: HarvestOutcome,
    pub records: Vec<Record>,
    pub pages: u32,
    pub log: Vec<String>,
}

impl HarvestReport {
    pub fn state(&self) -> RunState {
        self.outcome.state()
    }
}

/// Mutable state of one run
///
/// Owned exclusively by the run's own loop. Superseding a run cancels its
/// token; a new session always gets a fresh token.
#[derive(Debug)]
pub struct ScrapeSession {
    id: u64,
    token: CancellationToken,
    state: RunState,
    records: Vec<Record>,
    current: Option<Locator>,
    pages: u32,
    log: Vec<String>,
}

impl ScrapeSession {
    pub fn new(id: u64, token: CancellationToken, start: Option<Locator>) -> Self {
        Self {
            id,
            token,
            state: RunState::Idle,
            records: Vec::new(),
            current: start,
            pages: 0,
            log: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn current(&self) -> Option<&Locator> {
        self.current.as_ref()
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Moves to `next`, ignoring transitions the state machine forbids
    pub(crate) fn transition(&mut self, next: RunState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            tracing::warn!(
                "Session {}: invalid state transition {} -> {}",
                self.id,
                self.state,
                next
            );
            false
        }
    }

    pub(crate) fn push_log(&mut self, message: String) {
        self.log.push(message);
    }

    /// Appends one page's records and counts the page; returns how many were added
    pub(crate) fn complete_page(&mut self, records: Vec<Record>) -> usize {
        let added = records.len();
        self.records.extend(records);
        self.pages += 1;
        added
    }

    pub(crate) fn set_current(&mut self, next: Option<Locator>) {
        self.current = next;
    }

    /// Runs `fut` unless this session is cancelled first
    ///
    /// Resolves to `None` when cancellation wins, or when the session was
    /// cancelled while `fut` was finishing, so late results are discarded.
    pub fn until_cancelled<F>(&self, fut: F) -> impl Future<Output = Option<F::Output>>
    where
        F: Future,
    {
        let token = self.token.clone();
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = fut => {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(output)
                    }
                }
            }
        }
    }

    pub(crate) fn into_report(self, outcome: HarvestOutcome) -> HarvestReport {
        HarvestReport {
            session_id: self.id,
            outcome,
            records: self.records,
            pages: self.pages,
            log: self.log,
        }
    }
}
