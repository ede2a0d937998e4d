// src/crawl/orchestrator.rs
// =============================================================================
// Runs the whole crawl: sessions, discovery, the worker pool, aggregation.
//
// How it works:
// 1. Open one DomPort session per worker. If any session can't be opened
//    the run stops here, before anything is crawled.
// 2. Use the first session to discover category URLs.
// 3. Put the categories in a shared queue. Each worker pops one category
//    at a time and walks it to the end with its own session.
// 4. Workers send records over a channel to a single collector task, which
//    owns the AggregateResult.
// 5. When the queue is empty and every worker has finished, close the
//    sessions and hand back the records plus a report.
//
// A category that panics is caught and logged; the worker moves on to the
// next one. Cancelling the token stops workers from taking new categories
// and aborts page loads in flight.
//
// Rust concepts:
// - Arc<Mutex<...>>: a queue shared between tasks
// - mpsc channels: many producers, one owner of the results
// - tokio::spawn + JoinHandle: one task per worker
// - catch_unwind: containing a panic to a single category
// =============================================================================

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::discover::{dedupe_categories, discover_categories};
use super::error::CrawlError;
use super::extract::{ProductRecord, SkipReason};
use super::profile::SiteProfile;
use super::traverse::{CategoryOutcome, PageTraverser, StopReason};
use crate::dom::{DomPort, SessionFactory};

/// All records of one run, in the order they arrived.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    records: Vec<ProductRecord>,
}

impl AggregateResult {
    fn push(&mut self, record: ProductRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counters describing how a run went; printed at the end of the CLI run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub categories_discovered: usize,
    pub categories_completed: usize,
    pub categories_failed: usize,
    pub categories_capped: usize,
    pub categories_unprocessed: usize,
    pub pages_visited: usize,
    pub records: usize,
    pub skipped_missing_availability: usize,
    pub skipped_extraction_error: usize,
    pub cancelled: bool,
}

impl RunReport {
    fn absorb(&mut self, outcome: &CategoryOutcome) {
        self.pages_visited += outcome.pages_visited;
        self.records += outcome.records;
        for skip in &outcome.skips {
            match skip {
                SkipReason::MissingAvailability => self.skipped_missing_availability += 1,
                SkipReason::ExtractionError(_) => self.skipped_extraction_error += 1,
            }
        }
        match &outcome.stop {
            StopReason::NoNextLink | StopReason::Revisit(_) => self.categories_completed += 1,
            StopReason::Failed(CrawlError::PageLimitExceeded { .. }) => self.categories_capped += 1,
            StopReason::Failed(_) => self.categories_failed += 1,
            StopReason::Cancelled => self.categories_unprocessed += 1,
        }
    }

    fn merge(&mut self, other: RunReport) {
        self.categories_completed += other.categories_completed;
        self.categories_failed += other.categories_failed;
        self.categories_capped += other.categories_capped;
        self.categories_unprocessed += other.categories_unprocessed;
        self.pages_visited += other.pages_visited;
        self.records += other.records;
        self.skipped_missing_availability += other.skipped_missing_availability;
        self.skipped_extraction_error += other.skipped_extraction_error;
    }
}

pub struct CrawlOrchestrator {
    profile: Arc<SiteProfile>,
    cancel: CancellationToken,
    dedupe: bool,
}

impl CrawlOrchestrator {
    pub fn new(profile: SiteProfile, cancel: CancellationToken) -> Self {
        CrawlOrchestrator {
            profile: Arc::new(profile),
            cancel,
            dedupe: false,
        }
    }

    /// Collapse repeated category URLs before queueing them.
    pub fn dedupe_categories(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    // Opens `count` independent sessions
    //
    // Any failure here is fatal: without a session there is nothing to crawl
    // with. Sessions opened before the failure are closed again.
    pub async fn open_sessions(
        factory: &dyn SessionFactory,
        count: usize,
    ) -> Result<Vec<Box<dyn DomPort>>, CrawlError> {
        if count == 0 {
            return Err(CrawlError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let mut sessions = Vec::with_capacity(count);
        for _ in 0..count {
            match factory.open().await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    close_all(sessions).await;
                    return Err(CrawlError::SessionUnavailable(e));
                }
            }
        }
        Ok(sessions)
    }

    // The full pipeline: sessions -> discovery -> workers -> aggregate
    pub async fn crawl(
        &self,
        factory: &dyn SessionFactory,
        root_url: &str,
        workers: usize,
    ) -> Result<(AggregateResult, RunReport), CrawlError> {
        let mut sessions = Self::open_sessions(factory, workers).await?;

        let mut categories =
            discover_categories(sessions[0].as_mut(), root_url, &self.profile).await;
        if self.dedupe {
            categories = dedupe_categories(categories);
        }

        Ok(self.run(categories, sessions).await)
    }

    // Crawls `categories` with one worker per session
    //
    // Always returns: failures inside categories are counted in the report,
    // never propagated.
    pub async fn run(
        &self,
        categories: Vec<String>,
        sessions: Vec<Box<dyn DomPort>>,
    ) -> (AggregateResult, RunReport) {
        let mut report = RunReport {
            categories_discovered: categories.len(),
            ..Default::default()
        };

        if categories.is_empty() {
            info!("No categories to crawl");
            close_all(sessions).await;
            return (AggregateResult::default(), report);
        }

        info!(
            categories = categories.len(),
            workers = sessions.len(),
            "Starting product detail scraping"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(categories)));
        let (tx, mut rx) = mpsc::unbounded_channel::<ProductRecord>();

        let collector = tokio::spawn(async move {
            let mut aggregate = AggregateResult::default();
            while let Some(record) = rx.recv().await {
                aggregate.push(record);
            }
            aggregate
        });

        let handles: Vec<_> = sessions
            .into_iter()
            .enumerate()
            .map(|(id, session)| {
                tokio::spawn(worker(
                    id,
                    session,
                    Arc::clone(&queue),
                    Arc::clone(&self.profile),
                    tx.clone(),
                    self.cancel.clone(),
                ))
            })
            .collect();

        // The collector stops once every sender is gone, so drop ours
        drop(tx);

        let mut sessions = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((session, worker_report)) => {
                    sessions.push(session);
                    report.merge(worker_report);
                }
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        close_all(sessions).await;

        let aggregate = match collector.await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                error!(error = %e, "Result collector failed");
                AggregateResult::default()
            }
        };

        // Whatever is still queued was never started
        report.categories_unprocessed += queue.lock().await.len();
        report.cancelled = self.cancel.is_cancelled();

        info!(
            records = aggregate.len(),
            pages = report.pages_visited,
            "Crawl finished"
        );
        (aggregate, report)
    }
}

// One worker: pop a category, walk it, repeat until the queue is empty
async fn worker(
    id: usize,
    mut session: Box<dyn DomPort>,
    queue: Arc<Mutex<VecDeque<String>>>,
    profile: Arc<SiteProfile>,
    tx: mpsc::UnboundedSender<ProductRecord>,
    cancel: CancellationToken,
) -> (Box<dyn DomPort>, RunReport) {
    let mut report = RunReport::default();

    loop {
        if cancel.is_cancelled() {
            info!(worker = id, "Cancelled; not taking new categories");
            break;
        }
        let Some(category) = queue.lock().await.pop_front() else {
            break;
        };

        let mut emit = |record: ProductRecord| {
            // The collector only goes away if it panicked; nothing to do then
            let _ = tx.send(record);
        };
        let traversal = PageTraverser::new(session.as_mut(), &profile, &cancel)
            .run(&category, &mut emit);

        match AssertUnwindSafe(traversal).catch_unwind().await {
            Ok(outcome) => {
                info!(
                    worker = id,
                    category = %outcome.category,
                    records = outcome.records,
                    skipped = outcome.skips.len(),
                    "Category finished"
                );
                report.absorb(&outcome);
            }
            Err(_) => {
                error!(worker = id, %category, "Error scraping category; moving on");
                report.categories_failed += 1;
            }
        }
    }

    if report.categories_failed > 0 {
        warn!(worker = id, failed = report.categories_failed, "Worker finished with failed categories");
    }
    (session, report)
}

async fn close_all(sessions: Vec<Box<dyn DomPort>>) {
    for mut session in sessions {
        session.close().await;
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why one session per worker?
//    - A session remembers "the current page"
//    - Two workers navigating the same session would read each other's pages
//    - So each worker owns its Box<dyn DomPort> and hands it back when done
//
// 2. Why a channel instead of a shared Vec?
//    - Workers finish categories at unpredictable times
//    - An mpsc channel lets them all send without locking
//    - Exactly one task (the collector) owns and mutates the result list
//
// 3. What does drop(tx) do?
//    - The collector's loop ends when every sender is dropped
//    - Each worker holds a clone; we drop the original so the count can
//      reach zero once the workers are done
//
// 4. What is AssertUnwindSafe?
//    - catch_unwind only accepts code the compiler thinks is safe to resume
//      after a panic
//    - We assert it here because a panicked category's state is thrown away;
//      the session is re-navigated before it is used again
// -----------------------------------------------------------------------------
