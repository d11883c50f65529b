//! Post-card extraction from listing-page HTML.
//!
//! A listing page holds a series of post cards; each card yields at most one
//! candidate: the first anchor pointing into the site's content path, plus a
//! publication date when the card exposes one.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use postforge_shared::Candidate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Date formats tried after RFC 3339 fails, most common first.
const HUMAN_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Pull candidates out of one listing page.
///
/// Relative hrefs are resolved against `page_url`. Cards with no anchor into
/// `content_path` are ignored; cards with no parseable date get the epoch
/// sentinel so they sort ahead of dated posts.
pub(crate) fn page_candidates(html: &str, page_url: &Url, content_path: &str) -> Vec<Candidate> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse("article, .post, .type-post").unwrap();
    let link_sel = Selector::parse("a").unwrap();

    let mut candidates = Vec::new();
    for card in doc.select(&card_sel) {
        let link = card.select(&link_sel).find_map(|anchor| {
            let href = anchor.value().attr("href")?;
            if !href.contains(content_path) {
                return None;
            }
            page_url.join(href).ok()
        });

        let Some(link) = link else { continue };

        candidates.push(Candidate {
            link: link.to_string(),
            published_at: card_date(&card),
        });
    }

    candidates
}

/// Date of a card: `<time datetime="...">` first, then the `<time>` element's
/// text, then a `.date` element's text. Epoch when all of those are missing
/// or unparseable.
fn card_date(card: &ElementRef<'_>) -> DateTime<Utc> {
    let time_sel = Selector::parse("time").unwrap();
    if let Some(time_el) = card.select(&time_sel).next() {
        if let Some(datetime) = time_el.value().attr("datetime") {
            if let Some(parsed) = parse_date(datetime) {
                return parsed;
            }
        }
        let text: String = time_el.text().collect();
        if let Some(parsed) = parse_date(&text) {
            return parsed;
        }
    }

    let date_sel = Selector::parse(".date").unwrap();
    if let Some(date_el) = card.select(&date_sel).next() {
        let text: String = date_el.text().collect();
        if let Some(parsed) = parse_date(&text) {
            return parsed;
        }
    }

    DateTime::UNIX_EPOCH
}

/// Parse a date string: RFC 3339 first, then the human formats.
///
/// Date-only values land at midnight UTC.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in HUMAN_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn page_url() -> Url {
        Url::parse("https://example.com/blogs/page/7/").unwrap()
    }

    #[test]
    fn parses_rfc3339_dates() {
        let parsed = parse_date("2024-03-10T08:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap());
    }

    #[test]
    fn parses_human_dates_at_midnight_utc() {
        for raw in ["2024-03-10", "March 10, 2024", "Mar 10, 2024", "10 March 2024"] {
            let parsed = parse_date(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(
                parsed,
                Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
                "input: {raw}"
            );
        }
    }

    #[test]
    fn unparseable_date_is_none() {
        assert!(parse_date("").is_none());
        assert!(parse_date("   ").is_none());
        assert!(parse_date("sometime last week").is_none());
    }

    #[test]
    fn datetime_attr_beats_element_text() {
        let html = r#"<article>
            <a href="/blogs/post-a/">Post A</a>
            <time datetime="2024-01-05T00:00:00Z">March 10, 2024</time>
        </article>"#;
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].published_at.year(), 2024);
        assert_eq!(candidates[0].published_at.month(), 1);
    }

    #[test]
    fn time_text_used_when_attr_missing() {
        let html = r#"<article>
            <a href="/blogs/post-a/">Post A</a>
            <time>March 10, 2024</time>
        </article>"#;
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert_eq!(
            candidates[0].published_at,
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn date_class_fallback() {
        let html = r#"<div class="post">
            <a href="/blogs/post-b/">Post B</a>
            <span class="date">Jan 2, 2023</span>
        </div>"#;
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert_eq!(
            candidates[0].published_at,
            Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn undated_card_gets_epoch() {
        let html = r#"<article><a href="/blogs/post-c/">Post C</a></article>"#;
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert!(candidates[0].is_undated());
    }

    #[test]
    fn anchor_must_match_content_path() {
        let html = r#"<article>
            <a href="/about/">About</a>
            <a href="https://twitter.com/example">Tweet</a>
        </article>
        <article>
            <a href="/category/news/">News</a>
            <a href="/blogs/real-post/">Real post</a>
        </article>"#;
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].link, "https://example.com/blogs/real-post/");
    }

    #[test]
    fn relative_and_absolute_links_resolve() {
        let html = r#"<article><a href="../../widget-intro/">Widgets</a></article>
        <article><a href="https://example.com/blogs/other/">Other</a></article>"#;
        // Relative href misses the content path filter, absolute passes
        let candidates = page_candidates(html, &page_url(), "/blogs/");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].link, "https://example.com/blogs/other/");
    }

    #[test]
    fn cardless_page_yields_nothing() {
        let html = r#"<html><body><nav><a href="/blogs/x/">x</a></nav></body></html>"#;
        assert!(page_candidates(html, &page_url(), "/blogs/").is_empty());
    }
}
