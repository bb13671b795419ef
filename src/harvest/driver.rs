//! Harvest driver - pagination orchestration
//!
//! Each call to `Harvester::start` runs this loop until a terminal state:
//!
//! 1. Log "fetching page N"
//! 2. Fetch the current locator through the route pool
//! 3. Log "extracting page N"
//! 4. Extract records and the next locator
//! 5. Append records, publish the snapshot, save to the result store
//! 6. Stop if the next locator equals the current one (cycle guard)
//! 7. Advance to the next locator
//! 8. Pause before the next page
//!
//! Starting any run cancels the previous one. A cancelled run discards
//! whatever its pending fetch, extraction, or pause would have produced and
//! keeps the records it had already accumulated.

use crate::config::Config;
use crate::extract::{Extractor, Record};
use crate::fetch::{FetchError, ResilientFetcher};
use crate::harvest::session::{FailureKind, HarvestOutcome, HarvestReport, ScrapeSession};
use crate::harvest::{HarvestObserver, NoopObserver, RunState};
use crate::storage::ResultStore;
use crate::url::Locator;
use crate::HarvestError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between pages when none is configured
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(2000);

/// The session currently allowed to publish
struct LiveSession {
    id: u64,
    token: CancellationToken,
}

/// Drives paginated harvesting and single-page parsing
pub struct Harvester {
    fetcher: ResilientFetcher,
    extractor: Arc<dyn Extractor>,
    store: Option<Arc<dyn ResultStore>>,
    observer: Arc<dyn HarvestObserver>,
    page_delay: Duration,
    next_session_id: AtomicU64,
    live: Mutex<Option<LiveSession>>,
}

impl Harvester {
    /// Creates a harvester with no store, no observer, and the default pacing
    pub fn new(fetcher: ResilientFetcher, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            fetcher,
            extractor,
            store: None,
            observer: Arc::new(NoopObserver),
            page_delay: DEFAULT_PAGE_DELAY,
            next_session_id: AtomicU64::new(1),
            live: Mutex::new(None),
        }
    }

    /// Creates a harvester from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration; `[fetch]` and `[harvester]` are used
    /// * `extractor` - Extraction backend
    pub fn from_config(config: &Config, extractor: Arc<dyn Extractor>) -> Result<Self, HarvestError> {
        let fetcher = ResilientFetcher::from_config(&config.fetch)?;
        Ok(Self::new(fetcher, extractor)
            .with_page_delay(Duration::from_millis(config.harvester.page_delay_ms)))
    }

    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn HarvestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn page_delay(&self) -> Duration {
        self.page_delay
    }

    /// Returns true while a session is live
    pub fn is_running(&self) -> bool {
        self.live_slot().is_some()
    }

    /// Cancels the live session, if any
    ///
    /// Returns true if a session was running. Its accumulated records stay
    /// in the report it returns.
    pub fn cancel(&self) -> bool {
        match self.live_slot().as_ref() {
            Some(live) => {
                tracing::info!("Cancelling session {}", live.id);
                live.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Loads records saved by a previous process
    pub fn restore_previous(&self) -> Result<Option<Vec<Record>>, HarvestError> {
        match &self.store {
            Some(store) => Ok(store.load()?),
            None => Ok(None),
        }
    }

    /// Deletes saved records
    pub fn clear_results(&self) -> Result<(), HarvestError> {
        if let Some(store) = &self.store {
            store.clear()?;
            tracing::info!("Cleared saved results");
        }
        Ok(())
    }

    /// Harvests every page reachable from `start` by following next-page links
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - The run ended; see `outcome` for how
    /// * `Err(HarvestError::InvalidInput)` - `start` is not a valid locator; no run was started
    pub async fn start(&self, start: &str) -> Result<HarvestReport, HarvestError> {
        let start = Locator::parse(start).map_err(|e| {
            HarvestError::InvalidInput(format!("Please enter a valid starting URL ({})", e))
        })?;

        let mut session = self.begin_session(Some(start.clone()));
        tracing::info!("Session {}: harvesting from {}", session.id(), start);
        self.progress(&mut session, "Starting new scraping process...");

        let outcome = self.run_pages(&mut session).await;

        let closing = match &outcome {
            HarvestOutcome::Completed => format!(
                "Scraping complete! Found {} MCQs across {} pages.",
                session.records().len(),
                session.pages()
            ),
            HarvestOutcome::Cancelled => "Scraping cancelled.".to_string(),
            HarvestOutcome::Blocked { locator, .. } => {
                format!("Automated scraping from \"{}\" was blocked.", locator)
            }
            HarvestOutcome::Failed { message, .. } => format!("Error: {}", message),
        };
        self.progress(&mut session, closing);

        Ok(self.finish(session, outcome))
    }

    /// Extracts records from content the caller obtained some other way
    ///
    /// Used after a `Blocked` run. There is no pagination, pacing, or cycle
    /// guard; any next-page pointer in the result is ignored.
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - The extraction ran; see `outcome`
    /// * `Err(HarvestError::InvalidInput)` - Empty content or an invalid `base`
    pub async fn start_single_page(
        &self,
        content: &str,
        base: Option<&str>,
    ) -> Result<HarvestReport, HarvestError> {
        if content.trim().is_empty() {
            return Err(HarvestError::InvalidInput(
                "Please paste HTML content before parsing.".to_string(),
            ));
        }

        let base = match base.map(str::trim).filter(|b| !b.is_empty()) {
            Some(raw) => Some(Locator::parse(raw).map_err(|e| {
                HarvestError::InvalidInput(format!("Please enter a valid source URL ({})", e))
            })?),
            None => None,
        };

        let mut session = self.begin_session(None);
        tracing::info!(
            "Session {}: parsing {} bytes of supplied content",
            session.id(),
            content.len()
        );
        self.progress(&mut session, "Starting HTML parsing...");
        self.progress(&mut session, "Extracting data via AI...");

        let extracted = session
            .until_cancelled(self.extractor.extract(content, base.as_ref()))
            .await;

        let outcome = match extracted {
            None => {
                self.progress(&mut session, "Parsing cancelled.");
                HarvestOutcome::Cancelled
            }
            Some(Ok(extraction)) => {
                let added = session.complete_page(extraction.records);
                self.publish(&session, added > 0);
                let message = format!("Parsing complete! Found {} MCQs.", added);
                self.progress(&mut session, message);
                HarvestOutcome::Completed
            }
            Some(Err(e)) => {
                let outcome = HarvestOutcome::from_extraction_error(&e);
                self.progress(&mut session, format!("Error: {}", e));
                outcome
            }
        };

        Ok(self.finish(session, outcome))
    }

    /// The page loop; returns when a terminal outcome is reached
    async fn run_pages(&self, session: &mut ScrapeSession) -> HarvestOutcome {
        while let Some(current) = session.current().cloned() {
            if session.is_cancelled() {
                break;
            }
            let page = session.pages() + 1;

            self.progress(session, format!("Scraping page {}: Fetching...", page));
            let content = match session.until_cancelled(self.fetcher.fetch(&current)).await {
                None => break,
                Some(Ok(content)) => content,
                Some(Err(FetchError::Blocked { locator, summary })) => {
                    return HarvestOutcome::Blocked { locator, summary };
                }
                Some(Err(e)) => {
                    return HarvestOutcome::Failed {
                        kind: FailureKind::Upstream,
                        message: e.to_string(),
                    };
                }
            };

            self.progress(session, format!("(Page {}) Extracting data via AI...", page));
            let extraction = match session
                .until_cancelled(self.extractor.extract(&content, Some(&current)))
                .await
            {
                None => break,
                Some(Ok(extraction)) => extraction,
                Some(Err(e)) => {
                    tracing::error!("Session {}: extraction failed on page {}: {}", session.id(), page, e);
                    return HarvestOutcome::from_extraction_error(&e);
                }
            };

            let found = extraction.records.len();
            self.progress(session, format!("(Page {}) Found {} new MCQs.", page, found));
            session.complete_page(extraction.records);
            self.publish(session, found > 0);

            let next = match extraction.next_locator {
                Some(next) if next == current => {
                    tracing::warn!(
                        "Next URL is the same as the current URL ({}); stopping to prevent an infinite loop",
                        current
                    );
                    None
                }
                other => other,
            };
            session.set_current(next);

            if session.current().is_some() && !session.is_cancelled() {
                self.progress(
                    session,
                    format!(
                        "Waiting for {}s to avoid API rate limits...",
                        self.page_delay.as_secs_f64()
                    ),
                );
                if session
                    .until_cancelled(tokio::time::sleep(self.page_delay))
                    .await
                    .is_none()
                {
                    break;
                }
            }
        }

        if session.is_cancelled() {
            HarvestOutcome::Cancelled
        } else {
            HarvestOutcome::Completed
        }
    }

    fn live_slot(&self) -> MutexGuard<'_, Option<LiveSession>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supersedes any live session and creates a fresh one
    fn begin_session(&self, start: Option<Locator>) -> ScrapeSession {
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        {
            let mut slot = self.live_slot();
            if let Some(previous) = slot.take() {
                tracing::info!("Session {} superseded by session {}", previous.id, id);
                previous.token.cancel();
            }
            *slot = Some(LiveSession {
                id,
                token: token.clone(),
            });
        }

        let mut session = ScrapeSession::new(id, token, start);
        session.transition(RunState::Running);
        self.observer.on_state(RunState::Running);
        session
    }

    /// Releases the live slot if `session` still holds it
    fn end_session(&self, session: &ScrapeSession) {
        let mut slot = self.live_slot();
        if slot.as_ref().is_some_and(|live| live.id == session.id()) {
            *slot = None;
        }
    }

    /// True once a newer session has taken over
    fn is_superseded(&self, session: &ScrapeSession) -> bool {
        self.live_slot()
            .as_ref()
            .map_or(true, |live| live.id != session.id())
    }

    /// Records a progress line and forwards it unless superseded
    fn progress(&self, session: &mut ScrapeSession, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Session {}: {}", session.id(), message);
        if !self.is_superseded(session) {
            self.observer.on_progress(&message);
        }
        session.push_log(message);
    }

    /// Shares the accumulator with the observer and the store
    fn publish(&self, session: &ScrapeSession, changed: bool) {
        if session.is_cancelled() {
            return;
        }

        self.observer.on_records(session.records());

        if !changed || session.records().is_empty() {
            return;
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(session.records()) {
                tracing::warn!(
                    "Session {}: failed to save {} records: {}",
                    session.id(),
                    session.records().len(),
                    e
                );
            }
        }
    }

    fn finish(&self, mut session: ScrapeSession, outcome: HarvestOutcome) -> HarvestReport {
        let state = outcome.state();
        session.transition(state);

        match &outcome {
            HarvestOutcome::Completed => tracing::info!(
                "Session {} completed: {} records across {} pages",
                session.id(),
                session.records().len(),
                session.pages()
            ),
            HarvestOutcome::Cancelled => tracing::info!(
                "Session {} cancelled after {} pages ({} records kept)",
                session.id(),
                session.pages(),
                session.records().len()
            ),
            HarvestOutcome::Blocked { locator, summary } => tracing::warn!(
                "Session {} blocked at {}: {}",
                session.id(),
                locator,
                summary
            ),
            HarvestOutcome::Failed { kind, message } => tracing::error!(
                "Session {} failed ({:?}): {}",
                session.id(),
                kind,
                message
            ),
        }

        if !self.is_superseded(&session) {
            self.observer.on_state(state);
        }
        self.end_session(&session);

        session.into_report(outcome)
    }
}
