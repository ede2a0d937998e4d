// src/sink/csv.rs
// =============================================================================
// Writes the product export.
//
// Format:
//   COMPETITOR,NAME,URL,PRICE,PART_NUMBER,INVENTORY
//   one row per record, UTF-8
//
// The header is always written, even for an empty crawl, so consumers can
// tell "crawled nothing" from "file missing".
//
// The file is replaced atomically: we write a temp file in the same
// directory and rename it over the target. A reader never sees a
// half-written export.
// =============================================================================

use anyhow::{Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::crawl::ProductRecord;

const HEADER: [&str; 6] = ["COMPETITOR", "NAME", "URL", "PRICE", "PART_NUMBER", "INVENTORY"];

// Writes `records` to `path`, replacing any previous export
//
// Returns: number of data rows written
pub fn write_csv(path: &Path, records: &[ProductRecord]) -> Result<usize> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temp file in {}", dir.display()))?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer.write_record(HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to move the export into place at {}", path.display()))?;

    info!(path = %path.display(), rows = records.len(), "Scraped data saved");
    Ok(records.len())
}
