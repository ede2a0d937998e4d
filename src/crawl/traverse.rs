// src/crawl/traverse.rs
// =============================================================================
// Walks one category's pagination chain, page by page.
//
// The walk is an explicit state machine:
//
//   Loading(url) ──navigate + settle──▶ Emitting(products)
//   Emitting     ──extract each──────▶ AdvancingOrDone
//   AdvancingOrDone ──next link─────▶ Loading(next_url)
//   AdvancingOrDone ──no next link──▶ Done(NoNextLink)
//
// Any state can also end in Done(...) when:
// - a page fails to load (records from earlier pages are kept)
// - the next link points at a page we've already seen
// - the per-category page limit is reached
// - the run is cancelled
//
// Pages inside a category are strictly sequential: we only learn the next
// URL after the current page has rendered.
//
// Rust concepts:
// - Enums as state: each variant carries only the data that state needs
// - tokio::select!: racing a page load against cancellation
// - HashSet: remembering visited URLs
// =============================================================================

use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::CrawlError;
use super::extract::{extract_product, Extraction, ProductRecord, SkipReason};
use super::links::resolve_href;
use super::profile::SiteProfile;
use crate::dom::{inspect_all, DomElement, DomError, DomPort};

#[derive(Debug)]
pub enum TraverseState {
    Loading(String),
    Emitting(Vec<DomElement>),
    AdvancingOrDone,
    Done(StopReason),
}

/// Why a category's traversal ended.
#[derive(Debug)]
pub enum StopReason {
    /// The last page had no "next" link. The normal ending.
    NoNextLink,
    /// The "next" link pointed back at a page already visited
    Revisit(String),
    /// The run was cancelled while this category was in flight
    Cancelled,
    /// A page failed to load or the page limit was hit
    Failed(CrawlError),
}

// Where we are inside the pagination chain
#[derive(Debug, Default)]
pub struct PageCursor {
    current: Option<String>,
    visited: HashSet<String>,
}

impl PageCursor {
    // Moves the cursor to `url`. Returns false if that page was seen before.
    fn advance(&mut self, url: &str) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }
        self.current = Some(url.to_string());
        true
    }

    fn has_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    fn current(&self) -> &str {
        self.current.as_deref().unwrap_or_default()
    }
}

/// What happened while walking one category.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: String,
    pub pages_visited: usize,
    pub records: usize,
    pub skips: Vec<SkipReason>,
    pub stop: StopReason,
}

pub struct PageTraverser<'a> {
    session: &'a mut dyn DomPort,
    profile: &'a SiteProfile,
    cancel: &'a CancellationToken,
}

impl<'a> PageTraverser<'a> {
    pub fn new(
        session: &'a mut dyn DomPort,
        profile: &'a SiteProfile,
        cancel: &'a CancellationToken,
    ) -> Self {
        PageTraverser {
            session,
            profile,
            cancel,
        }
    }

    // Walks every page of `category`, passing each record to `emit`
    //
    // Records are handed over as soon as their page is done, so whatever was
    // collected survives a failure on a later page.
    pub async fn run(
        mut self,
        category: &str,
        emit: &mut (dyn FnMut(ProductRecord) + Send),
    ) -> CategoryOutcome {
        let mut cursor = PageCursor::default();
        let mut records = 0;
        let mut skips = Vec::new();
        let mut state = TraverseState::Loading(category.to_string());

        let stop = loop {
            state = match state {
                TraverseState::Loading(url) => {
                    if !cursor.advance(&url) {
                        TraverseState::Done(StopReason::Revisit(url))
                    } else {
                        info!(category, page = %url, "Scraping category page");
                        self.load(&url).await
                    }
                }
                TraverseState::Emitting(products) => {
                    let page_url = cursor.current().to_string();
                    let profile = self.profile;
                    // One parse for the whole page, however many products it holds
                    let extracted =
                        inspect_all(&products, |product| extract_product(product, &page_url, profile));
                    match extracted {
                        Ok(extractions) => {
                            for extraction in extractions {
                                match extraction {
                                    Extraction::Record(record) => {
                                        records += 1;
                                        emit(record);
                                    }
                                    Extraction::Skip(reason) => skips.push(reason),
                                }
                            }
                            TraverseState::AdvancingOrDone
                        }
                        Err(source) => page_failure(&page_url, source),
                    }
                }
                TraverseState::AdvancingOrDone => self.advance(category, &cursor),
                TraverseState::Done(reason) => break reason,
            };
        };

        match &stop {
            StopReason::NoNextLink => info!(category, "No more pages to scrape in this category"),
            StopReason::Revisit(url) => {
                warn!(category, next = %url, "Next link points at a visited page; stopping")
            }
            StopReason::Cancelled => info!(category, "Traversal cancelled"),
            StopReason::Failed(err) => warn!(category, error = %err, "Category traversal ended early"),
        }

        CategoryOutcome {
            category: category.to_string(),
            pages_visited: cursor.visited_count(),
            records,
            skips,
            stop,
        }
    }

    // Loading -> Emitting (or Done on failure / cancellation)
    async fn load(&mut self, url: &str) -> TraverseState {
        let loaded = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TraverseState::Done(StopReason::Cancelled),
            result = self.session.navigate(url) => result,
        };
        if let Err(source) = loaded {
            return page_failure(url, source);
        }

        // Give dynamic content a bounded chance to render before querying
        let settled = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TraverseState::Done(StopReason::Cancelled),
            result = self.session.wait_for(
                &self.profile.product,
                self.profile.settle_timeout(),
                self.profile.poll_interval(),
            ) => result,
        };
        match settled {
            Ok(true) => {}
            Ok(false) => debug!(page = url, "no products rendered before the settle timeout"),
            Err(source) => return page_failure(url, source),
        }

        match self.session.query_all(&self.profile.product) {
            Ok(products) => {
                debug!(page = url, count = products.len(), "found product elements");
                TraverseState::Emitting(products)
            }
            Err(source) => page_failure(url, source),
        }
    }

    // AdvancingOrDone -> Loading(next) or Done
    fn advance(&self, category: &str, cursor: &PageCursor) -> TraverseState {
        if self.cancel.is_cancelled() {
            return TraverseState::Done(StopReason::Cancelled);
        }

        let next = match self.session.query_all(&self.profile.next_link) {
            Ok(links) => links.into_iter().next(),
            Err(source) => return page_failure(cursor.current(), source),
        };

        let base = self.session.current_url().unwrap_or(cursor.current());
        let next_url = next
            .as_ref()
            .and_then(|link| link.attr("href"))
            .and_then(|href| resolve_href(base, href));

        // A link back into the chain ends the walk normally, even at the limit
        match next_url {
            None => TraverseState::Done(StopReason::NoNextLink),
            Some(url) if cursor.has_visited(&url) => TraverseState::Done(StopReason::Revisit(url)),
            Some(_) if cursor.visited_count() >= self.profile.max_pages_per_category => {
                TraverseState::Done(StopReason::Failed(CrawlError::PageLimitExceeded {
                    category: category.to_string(),
                    limit: self.profile.max_pages_per_category,
                }))
            }
            Some(url) => {
                info!(next = %url, "Navigating to next page");
                TraverseState::Loading(url)
            }
        }
    }
}

fn page_failure(url: &str, source: DomError) -> TraverseState {
    TraverseState::Done(StopReason::Failed(CrawlError::PageLoadFailure {
        url: url.to_string(),
        source,
    }))
}
