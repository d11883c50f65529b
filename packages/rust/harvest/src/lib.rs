//! Listing-page discovery and candidate harvesting.
//!
//! The discoverer walks a paginated blog listing by following "next" links to
//! find the last page, and from that the two oldest listing pages. The
//! harvester then pulls post cards off those pages and returns the oldest
//! few as [`Candidate`]s for the scrape stage.

mod cards;

use postforge_shared::{Candidate, PostforgeError, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Maximum number of candidates a harvest run returns.
pub const HARVEST_LIMIT: usize = 5;

/// Safety bound on the next-link walk.
const MAX_PAGINATION_HOPS: usize = 200;

// ---------------------------------------------------------------------------
// Listing discovery
// ---------------------------------------------------------------------------

/// Walk "next" links from `start_url` and return the last listing page.
///
/// The walk stops when a page has no next anchor, when the hop bound is hit,
/// or when a fetch fails. Failures degrade to the last page reached rather
/// than erroring; the caller always gets a usable URL.
#[instrument(skip_all, fields(start = %start_url))]
pub async fn find_last_page(client: &Client, start_url: &Url) -> Url {
    let mut current = start_url.clone();

    for _ in 0..MAX_PAGINATION_HOPS {
        let body = match fetch_page(client, &current).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %current, error = %e, "pagination fetch failed, stopping walk");
                return current;
            }
        };

        match next_page_url(&body, &current) {
            Some(next) => {
                debug!(from = %current, to = %next, "following next link");
                current = next;
            }
            None => break,
        }
    }

    info!(last_page = %current, "pagination walk finished");
    current
}

/// The listing pages to harvest: the last page and the one before it.
///
/// Page numbers come from a trailing `/page/<n>/` path segment; a URL with
/// no such segment is page 1. Page 1 is always the bare base URL.
pub fn listing_page_urls(base_url: &Url, last_page_url: &Url) -> Vec<Url> {
    let last = trailing_page_number(last_page_url);
    if last <= 1 {
        return vec![base_url.clone()];
    }
    vec![page_url(base_url, last), page_url(base_url, last - 1)]
}

/// First anchor on the page that reads as a "next" link, resolved absolute.
fn next_page_url(html: &str, current: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse("a").unwrap();

    for anchor in doc.select(&anchor_sel) {
        let text: String = anchor.text().collect();
        let text_matches = text.trim().eq_ignore_ascii_case("next");
        let class_matches = anchor
            .value()
            .attr("class")
            .map(|class| {
                class
                    .split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("next"))
            })
            .unwrap_or(false);

        if !text_matches && !class_matches {
            continue;
        }

        if let Some(href) = anchor.value().attr("href") {
            return current.join(href).ok();
        }
    }

    None
}

fn trailing_page_number(url: &Url) -> u32 {
    let Some(segments) = url.path_segments() else {
        return 1;
    };
    let segments: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., "page", n] => n.parse().unwrap_or(1),
        _ => 1,
    }
}

fn page_url(base: &Url, n: u32) -> Url {
    if n <= 1 {
        return base.clone();
    }
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("page/{n}/")).unwrap_or(base)
}

// ---------------------------------------------------------------------------
// Harvesting
// ---------------------------------------------------------------------------

/// Harvest candidates from the given listing pages.
///
/// Duplicate links keep their first occurrence; the result is sorted
/// ascending by publication date (undated epoch-sentinel cards first) and
/// truncated to [`HARVEST_LIMIT`]. A page that fails to fetch contributes
/// nothing and never aborts the others.
#[instrument(skip_all, fields(pages = page_urls.len()))]
pub async fn harvest(client: &Client, page_urls: &[Url], content_path: &str) -> Vec<Candidate> {
    let mut all = Vec::new();

    for page_url in page_urls {
        let body = match fetch_page(client, page_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %page_url, error = %e, "listing page failed, skipping");
                continue;
            }
        };
        let found = cards::page_candidates(&body, page_url, content_path);
        debug!(url = %page_url, count = found.len(), "cards harvested");
        all.extend(found);
    }

    let mut seen = HashSet::new();
    all.retain(|candidate: &Candidate| seen.insert(candidate.link.clone()));
    all.sort_by_key(|candidate| candidate.published_at);
    all.truncate(HARVEST_LIMIT);

    info!(candidates = all.len(), "harvest complete");
    all
}

async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| PostforgeError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PostforgeError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| PostforgeError::Network(format!("{url}: failed to read body: {e}")))
}
