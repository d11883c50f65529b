//! Source-gathering loop for the enhancement pipeline.
//!
//! Walks search results strictly in rank order and collects the first links
//! whose pages yield enough extracted text. The loop stops the moment it has
//! enough; links past that point are never fetched.

use postforge_shared::{PostforgeError, Result, Source};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Minimum extracted-text length (chars) for an accepted source.
pub const MIN_CONTENT_LEN: usize = 500;

/// Number of sources the enhancement pipeline needs.
pub const TARGET_COUNT: usize = 2;

/// Gather up to `target_count` reference sources from ranked links.
///
/// Links containing `exclude_host` are skipped without fetching; fetch and
/// extraction failures and too-short pages are logged skips. Exhausting the
/// list below target fails with `InsufficientSources` and commits nothing.
#[instrument(skip_all, fields(links = ranked_links.len(), exclude = %exclude_host))]
pub async fn gather_sources(
    client: &Client,
    ranked_links: &[String],
    exclude_host: &str,
    min_content_len: usize,
    target_count: usize,
) -> Result<Vec<Source>> {
    let mut sources: Vec<Source> = Vec::with_capacity(target_count);

    for link in ranked_links {
        if sources.len() >= target_count {
            break;
        }

        if link.contains(exclude_host) {
            debug!(%link, "skipping self-referential link");
            continue;
        }

        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => {
                warn!(%link, error = %e, "unparseable link, skipping");
                continue;
            }
        };

        match postforge_extract::fetch_extract(client, &url).await {
            Ok(extraction) if extraction.text.chars().count() >= min_content_len => {
                info!(%link, text_len = extraction.text.len(), "source accepted");
                sources.push(Source {
                    link: link.clone(),
                    content: extraction.text,
                });
            }
            Ok(extraction) => {
                warn!(%link, text_len = extraction.text.len(), "content too short, skipping");
            }
            Err(e) => {
                warn!(%link, error = %e, "source fetch failed, skipping");
            }
        }
    }

    if sources.len() < target_count {
        return Err(PostforgeError::InsufficientSources {
            found: sources.len(),
            required: target_count,
        });
    }

    Ok(sources)
}
