// src/sink/mod.rs
// =============================================================================
// Where crawl results go once the run is over.
//
// Submodules:
// - csv: atomic CSV export
// - git: commit + push of the export
// =============================================================================

mod csv;
mod git;

pub use self::csv::write_csv;
pub use git::publish;
