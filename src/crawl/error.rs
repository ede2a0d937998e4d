// src/crawl/error.rs
// =============================================================================
// The failure taxonomy of a crawl run.
//
// Each failure is contained at the smallest scope it affects:
//   product  -> SkipReason (see extract.rs), the product is dropped
//   page     -> PageLoadFailure / PageLimitExceeded, the category stops
//   discovery-> DiscoveryFailure, whatever was found is still crawled
//   run      -> SessionUnavailable, nothing is crawled at all
//   publish  -> PublishFailure, the CSV on disk stays valid
// =============================================================================

use thiserror::Error;

use crate::dom::DomError;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("category discovery on {url} failed: {source}")]
    DiscoveryFailure {
        url: String,
        #[source]
        source: DomError,
    },

    #[error("failed to load listing page {url}: {source}")]
    PageLoadFailure {
        url: String,
        #[source]
        source: DomError,
    },

    #[error("category {category} exceeded the limit of {limit} pages; remaining pages were not crawled")]
    PageLimitExceeded { category: String, limit: usize },

    #[error("no browsing session available: {0}")]
    SessionUnavailable(#[source] DomError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("publishing {path} failed: {reason}")]
    PublishFailure { path: String, reason: String },
}
