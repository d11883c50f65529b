//! Enhancement orchestrator: select the newest unenhanced article, research
//! it, rewrite it, and persist the result as a brand-new article.
//!
//! The run is all-or-nothing. Every failure between search and persist aborts
//! with zero writes; the original article row is never touched.

use chrono::Utc;
use postforge_rewrite::RewriteClient;
use postforge_search::SearchClient;
use postforge_shared::{AppConfig, Article, ENHANCED_MARKER, NewArticle, PostforgeError, Result};
use postforge_storage::Storage;
use reqwest::Client;
use tracing::{info, instrument};

use crate::sources::{MIN_CONTENT_LEN, TARGET_COUNT, gather_sources};

// ---------------------------------------------------------------------------
// Storage handle
// ---------------------------------------------------------------------------

/// Storage access for an enhancement run.
///
/// `Borrowed` reuses a connection the caller keeps open; `Owned` was opened
/// for this run and closes when the handle drops. Whoever opened the
/// connection closes it, carried by the variant rather than a flag.
pub enum StorageHandle<'a> {
    Borrowed(&'a Storage),
    Owned(Storage),
}

impl StorageHandle<'_> {
    /// Open an owned handle from the configured database path.
    pub async fn open_owned(config: &AppConfig) -> Result<StorageHandle<'static>> {
        let path = config.storage.resolved_db_path()?;
        let storage = Storage::open(&path).await?;
        Ok(StorageHandle::Owned(storage))
    }

    fn storage(&self) -> &Storage {
        match self {
            StorageHandle::Borrowed(storage) => storage,
            StorageHandle::Owned(storage) => storage,
        }
    }
}

/// Outcome of an enhancement run.
#[derive(Debug)]
pub enum EnhanceOutcome {
    /// No stored article lacks the marker; nothing to do.
    NoCandidate,
    /// A new enhanced article was written.
    Enhanced { article: Article },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run the enhancement pipeline once.
///
/// Selects the most recent article without the enhancement marker, searches
/// the web for its title, gathers two reference sources (skipping anything on
/// `exclude_host`), rewrites the article with them, and inserts the result
/// under a fresh slug. Zero search results, fewer than two usable sources,
/// and degenerate rewrites each abort the whole run.
#[instrument(skip_all)]
pub async fn enhance(
    client: &Client,
    handle: &StorageHandle<'_>,
    search: &SearchClient,
    rewrite: &RewriteClient,
    exclude_host: &str,
) -> Result<EnhanceOutcome> {
    let storage = handle.storage();

    let Some(article) = storage.find_latest_unenhanced(ENHANCED_MARKER).await? else {
        info!("no unenhanced article found, nothing to do");
        return Ok(EnhanceOutcome::NoCandidate);
    };
    info!(title = %article.title, slug = %article.slug, "selected article");

    let links = search.ranked_links(&article.title).await?;
    if links.is_empty() {
        return Err(PostforgeError::Search("search returned 0 results".to_string()));
    }
    info!(links = links.len(), "search results received");

    let sources = gather_sources(client, &links, exclude_host, MIN_CONTENT_LEN, TARGET_COUNT).await?;

    let rewritten = rewrite
        .rewrite(&article.content, &sources[0].content, &sources[1].content)
        .await?;

    let now = Utc::now();
    let references: Vec<String> = sources.into_iter().map(|source| source.link).collect();
    let new_article = NewArticle {
        title: format!("{}{ENHANCED_MARKER}", article.title),
        slug: format!("{}-ai-enhanced-{}", article.slug, now.timestamp_millis()),
        content: format!("{rewritten}{}", references_block(&references)),
        author: article.author.clone(),
        source_url: article.source_url.clone(),
        references,
        created_at: now,
    };

    let saved = storage.insert(&new_article).await?;
    info!(slug = %saved.slug, "enhanced article saved");
    Ok(EnhanceOutcome::Enhanced { article: saved })
}

fn references_block(links: &[String]) -> String {
    let items: String = links
        .iter()
        .map(|link| format!(r#"<li><a href="{link}" target="_blank">{link}</a></li>"#))
        .collect();
    format!("<hr><h3>References</h3><ul>{items}</ul>")
}
