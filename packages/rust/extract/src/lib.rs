//! Readability-style main-content extraction from arbitrary HTML.
//!
//! Given a raw page, every block element is scored by tag, class/id hints,
//! and prose density (see [`scoring`]); the best-scoring element above the
//! threshold becomes the article body. Pages with no convincing content
//! block yield `None`, which callers treat as "skip this page".

pub mod scoring;

use postforge_shared::{PostforgeError, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Fixed timeout for article page fetches.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Minimum text length (chars) for a winning element to count as content.
const MIN_TEXT_LEN: usize = 25;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("Postforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// The content pulled out of a single page.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Page title, from the first `<h1>` or the `<title>` tag.
    pub title: Option<String>,
    /// Author name, when the page exposes one.
    pub byline: Option<String>,
    /// Raw `datetime` attribute of the page's first `<time>` element.
    pub published: Option<String>,
    /// Plain-text article body, paragraphs joined by blank lines.
    pub text: String,
    /// HTML of the winning content element.
    pub html: String,
}

// ---------------------------------------------------------------------------
// Extraction entry points
// ---------------------------------------------------------------------------

/// Extract the main content from raw HTML.
///
/// Returns `None` when no element clears the score threshold or the winner
/// holds less than [`MIN_TEXT_LEN`] chars of text. Malformed markup never
/// panics; the parser is error-tolerant and bad input degrades to `None`.
pub fn extract(raw_html: &str, origin_url: &Url) -> Option<Extraction> {
    let doc = Html::parse_document(raw_html);

    let candidate_sel = Selector::parse("body *").unwrap();
    let mut best: Option<(f64, scraper::ElementRef<'_>)> = None;

    for element in doc.select(&candidate_sel) {
        let score = scoring::calculate_score(&element);
        if score < scoring::MIN_SCORE_THRESHOLD {
            continue;
        }
        match best {
            Some((best_score, _)) if best_score >= score => {}
            _ => best = Some((score, element)),
        }
    }

    let (score, winner) = best?;
    let text = element_text(&winner);
    if text.chars().count() < MIN_TEXT_LEN {
        debug!(url = %origin_url, score, "winning element too short, rejecting");
        return None;
    }

    debug!(
        url = %origin_url,
        score,
        tag = winner.value().name(),
        text_len = text.len(),
        "content element selected"
    );

    Some(Extraction {
        title: extract_title(&doc),
        byline: extract_byline(&doc),
        published: extract_published(&doc),
        text,
        html: winner.html(),
    })
}

/// Fetch a page and extract its main content.
///
/// Non-2xx responses are network errors; a page where extraction finds no
/// content block is a parse error, so callers can skip it and move on.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_extract(client: &Client, url: &Url) -> Result<Extraction> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| PostforgeError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PostforgeError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| PostforgeError::Network(format!("{url}: failed to read body: {e}")))?;

    extract(&body, url)
        .ok_or_else(|| PostforgeError::parse(format!("{url}: no main content found")))
}

/// Build a reqwest client with the fixed extraction-boundary settings.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| PostforgeError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text of an element: paragraph descendants joined by blank lines, falling
/// back to the element's whitespace-normalized text when it has no `<p>`s.
fn element_text(element: &scraper::ElementRef<'_>) -> String {
    let p_sel = Selector::parse("p").unwrap();
    let paragraphs: Vec<String> = element
        .select(&p_sel)
        .map(|p| normalize_whitespace(&p.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect();

    if paragraphs.is_empty() {
        normalize_whitespace(&element.text().collect::<String>())
    } else {
        paragraphs.join("\n\n")
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title from the first non-empty `<h1>`, else the `<title>` tag.
fn extract_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").unwrap();
    for h1 in doc.select(&h1_sel) {
        let text = normalize_whitespace(&h1.text().collect::<String>());
        if !text.is_empty() {
            return Some(text);
        }
    }

    let title_sel = Selector::parse("title").unwrap();
    doc.select(&title_sel)
        .next()
        .map(|t| normalize_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn extract_published(doc: &Html) -> Option<String> {
    let time_sel = Selector::parse("time[datetime]").unwrap();
    doc.select(&time_sel)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Byline from author metadata, probed in fixed order.
fn extract_byline(doc: &Html) -> Option<String> {
    let meta_sel = Selector::parse(r#"meta[name="author"]"#).unwrap();
    if let Some(meta) = doc.select(&meta_sel).next() {
        if let Some(content) = meta.value().attr("content") {
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }
    }

    for selector in [r#"[rel="author"]"#, ".author-name", ".byline"] {
        let sel = Selector::parse(selector).unwrap();
        if let Some(el) = doc.select(&sel).next() {
            let text = normalize_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}
