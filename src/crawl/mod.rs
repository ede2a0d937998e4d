// src/crawl/mod.rs
// =============================================================================
// This module holds the crawl-and-extract pipeline.
//
// Submodules:
// - profile: selectors and limits for one storefront
// - discover: finds category URLs on the root page
// - traverse: walks a category's pagination chain
// - extract: turns a product element into a record (or a skip)
// - orchestrator: worker pool and result aggregation
// - error: failure taxonomy shared by the above
// - links: href resolution
// =============================================================================

mod discover;
mod error;
mod extract;
mod links;
mod orchestrator;
mod profile;
mod traverse;

pub use discover::discover_categories;
pub use error::CrawlError;
pub use extract::ProductRecord;
pub use orchestrator::{CrawlOrchestrator, RunReport};
pub use profile::SiteProfile;
