//! Pipeline orchestration for Postforge.
//!
//! Two entry points: [`run_ingest`] harvests and persists the oldest articles
//! from the configured blog, and [`enhance`] researches and rewrites the most
//! recent unenhanced article into a new record.

mod enhance;
mod pipeline;
mod sources;

pub use enhance::{EnhanceOutcome, StorageHandle, enhance};
pub use pipeline::{
    IngestResult, ItemOutcome, ProgressReporter, SilentProgress, run_ingest, scrape_and_save,
};
pub use sources::{MIN_CONTENT_LEN, TARGET_COUNT, gather_sources};
