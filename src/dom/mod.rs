// src/dom/mod.rs
// =============================================================================
// This module is the boundary between the crawler and "something that can
// render a page".
//
// The crawl pipeline only ever needs four things:
// - navigate to a URL
// - query elements by CSS selector
// - read an element's text
// - read an element's attribute
//
// Anything that provides those (a plain HTTP fetcher, a headless browser,
// an in-memory fake for tests) can drive the crawler.
//
// Submodules:
// - element: element handles and live views for sub-queries
// - http: the reqwest + scraper implementation used by the CLI
//
// Rust concepts:
// - Traits: The DomPort capability set
// - Trait objects: Box<dyn DomPort> so workers don't care which backend runs
// - async-trait: async methods inside traits
// =============================================================================

mod element;
mod http;
#[cfg(test)]
pub mod testing;

pub use element::{inspect_all, parse_selector, select_in_document, DomElement, ElementView};
pub use http::HttpSessionFactory;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Failures reported by a DomPort backend.
#[derive(Debug, Error)]
pub enum DomError {
    /// The page could not be fetched at all (DNS, connection reset, ...)
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The server answered, but not with a page we can use
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The page took longer than the configured timeout
    #[error("timed out loading {url}")]
    Timeout { url: String },

    /// A selector from the site profile is not valid CSS
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A query was issued before any page was loaded
    #[error("no page loaded in this session")]
    NotLoaded,

    /// An element handle no longer resolves inside its page
    #[error("element not found in its page")]
    StaleElement,

    /// The backend could not hand out a session
    #[error("session unavailable: {0}")]
    SessionUnavailable(String),
}

// The capability set every page-rendering backend must offer.
//
// Each session holds navigation state (the "current page"), so a session
// must never be shared between two workers. The orchestrator hands each
// worker its own Box<dyn DomPort>.
#[async_trait]
pub trait DomPort: Send {
    /// Loads `url` and makes it the current page.
    async fn navigate(&mut self, url: &str) -> Result<(), DomError>;

    /// URL of the current page after redirects, if one is loaded.
    fn current_url(&self) -> Option<&str>;

    /// Returns every element on the current page matching `selector`.
    fn query_all(&self, selector: &str) -> Result<Vec<DomElement>, DomError>;

    /// Waits until at least one element matches `selector` or `timeout` passes.
    ///
    /// Returns Ok(true) if the selector matched in time. The default
    /// implementation re-queries every `poll` interval, which suits
    /// backends whose page keeps changing after navigation.
    async fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<bool, DomError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.query_all(selector)?.is_empty() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Releases whatever the backend holds (browser process, sockets, ...).
    async fn close(&mut self) {}
}

// Opens independent DomPort sessions, one per worker.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn DomPort>, DomError>;
}
