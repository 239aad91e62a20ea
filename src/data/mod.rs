//! Corpus import: bulk loading and record normalization

pub mod jsonl;
pub mod parquet;
pub mod preprocessing;

use std::path::Path;

use crate::error::{Result, Step, StepContext};
use crate::model::Work;
use crate::store::RecordStore;

/// Read works from a `.parquet` or `.jsonl`/`.json` export
pub fn read_works(path: &str) -> Result<Vec<Work>> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext.as_deref() {
        Some("parquet") => parquet::load_works(path),
        _ => jsonl::load_works(path),
    }
}

/// Bulk-load an export into the store. Returns the number of works written.
pub fn load_into<S: RecordStore>(store: &mut S, path: &str) -> Result<usize> {
    let works = read_works(path).in_step(Step::Load)?;
    let written = store.bulk_insert(&works).in_step(Step::Load)?;
    log::info!("Loaded {} works into the store", written);
    Ok(written)
}
