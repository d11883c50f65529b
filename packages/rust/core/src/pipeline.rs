//! Ingest pipeline: listing discovery → harvest → scrape-and-persist.

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use postforge_shared::{AppConfig, Candidate, NewArticle, PostforgeError, Result, slugify};
use postforge_storage::Storage;
use reqwest::Client;
use tracing::{info, instrument, warn};
use url::Url;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Per-candidate result of the scrape-and-persist stage.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// Article upserted under this slug.
    Saved { slug: String },
    /// Candidate dropped; the reason is human-readable for the CLI summary.
    Skipped { link: String, reason: String },
}

impl ItemOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, ItemOutcome::Saved { .. })
    }
}

/// Result of a full ingest run.
#[derive(Debug)]
pub struct IngestResult {
    /// One outcome per harvested candidate, in harvest order.
    pub outcomes: Vec<ItemOutcome>,
    /// Number of `Saved` outcomes.
    pub saved: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline phases.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full ingest pipeline.
///
/// 1. Walk pagination to the last listing page
/// 2. Harvest candidates from the two oldest pages
/// 3. Scrape each candidate and upsert it by slug
#[instrument(skip_all, fields(base_url = %config.site.base_url))]
pub async fn run_ingest(
    config: &AppConfig,
    storage: &Storage,
    progress: &dyn ProgressReporter,
) -> Result<IngestResult> {
    let start = Instant::now();
    let client = postforge_extract::build_client()?;

    let base_url = Url::parse(&config.site.base_url).map_err(|e| {
        PostforgeError::config(format!("invalid base_url {}: {e}", config.site.base_url))
    })?;

    progress.phase("Finding last listing page");
    let last_page = postforge_harvest::find_last_page(&client, &base_url).await;
    let pages = postforge_harvest::listing_page_urls(&base_url, &last_page);
    info!(last_page = %last_page, pages = pages.len(), "listing pages selected");

    progress.phase("Harvesting candidates");
    let candidates = postforge_harvest::harvest(&client, &pages, &config.site.content_path).await;
    info!(candidates = candidates.len(), "candidates harvested");

    progress.phase("Scraping and saving articles");
    let outcomes = scrape_and_save(&client, storage, &candidates).await?;
    let saved = outcomes.iter().filter(|o| o.is_saved()).count();

    let elapsed = start.elapsed();
    info!(
        saved,
        skipped = outcomes.len() - saved,
        elapsed_ms = elapsed.as_millis() as u64,
        "ingest complete"
    );

    Ok(IngestResult {
        outcomes,
        saved,
        elapsed,
    })
}

/// Scrape each candidate page and upsert the article by slug.
///
/// Failures are isolated per item: a candidate that cannot be fetched,
/// extracted, or persisted becomes a `Skipped` outcome and the loop moves on.
/// Re-running over overlapping candidates converges on the same rows.
#[instrument(skip_all, fields(candidates = candidates.len()))]
pub async fn scrape_and_save(
    client: &Client,
    storage: &Storage,
    candidates: &[Candidate],
) -> Result<Vec<ItemOutcome>> {
    let mut outcomes = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match scrape_one(client, storage, candidate).await {
            Ok(slug) => {
                info!(link = %candidate.link, %slug, "article saved");
                outcomes.push(ItemOutcome::Saved { slug });
            }
            Err(e) => {
                warn!(link = %candidate.link, error = %e, "candidate skipped");
                outcomes.push(ItemOutcome::Skipped {
                    link: candidate.link.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(outcomes)
}

async fn scrape_one(client: &Client, storage: &Storage, candidate: &Candidate) -> Result<String> {
    let url = Url::parse(&candidate.link)
        .map_err(|e| PostforgeError::parse(format!("{}: {e}", candidate.link)))?;
    let extraction = postforge_extract::fetch_extract(client, &url).await?;

    let title = extraction.title.unwrap_or_else(|| "Untitled".to_string());
    let slug = slugify(&title);
    let author = extraction.byline.unwrap_or_else(|| "Unknown".to_string());
    let created_at = effective_timestamp(extraction.published.as_deref(), candidate);

    storage
        .upsert_by_slug(&NewArticle {
            title,
            slug: slug.clone(),
            content: extraction.text,
            author,
            source_url: Some(candidate.link.clone()),
            references: Vec::new(),
            created_at,
        })
        .await?;

    Ok(slug)
}

/// Backfill order: the page's own timestamp, then the listing date when it
/// carried one, then now.
fn effective_timestamp(page_datetime: Option<&str>, candidate: &Candidate) -> DateTime<Utc> {
    if let Some(raw) = page_datetime {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date.and_time(NaiveTime::MIN).and_utc();
        }
    }

    if !candidate.is_undated() {
        return candidate.published_at;
    }

    Utc::now()
}
