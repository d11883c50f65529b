//! Content-density scoring for candidate elements.
//!
//! Each block element gets a score from its tag, its class/id attributes, and
//! how much prose it holds. The highest-scoring element above the threshold
//! wins and becomes the extracted article body.

use regex::Regex;
use scraper::ElementRef;
use std::sync::OnceLock;

/// Minimum score an element must reach to be accepted as the article body.
pub const MIN_SCORE_THRESHOLD: f64 = 20.0;

/// Weight applied when class/id matches the positive patterns.
const POSITIVE_WEIGHT: f64 = 25.0;

/// Weight applied when class/id matches the negative patterns.
const NEGATIVE_WEIGHT: f64 = -25.0;

/// Cap on the character-count portion of the density score.
const MAX_CHAR_DENSITY_SCORE: f64 = 3.0;

/// Cap on the comma-count portion of the density score.
const MAX_COMMA_DENSITY_SCORE: f64 = 3.0;

/// Characters of text per density point.
const CHARS_PER_POINT: usize = 100;

/// Patterns that suggest an element contains main content.
const POSITIVE_PATTERNS: &str =
    r"(?i)(article|body|content|entry|main|page|post|text|blog|story)";

/// Patterns that suggest an element does NOT contain main content.
const NEGATIVE_PATTERNS: &str = r"(?i)(banner|comment|footer|header|menu|nav|related|sidebar|sponsor|pagination|pager|popup|share|social|widget)";

fn positive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(POSITIVE_PATTERNS).unwrap())
}

fn negative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NEGATIVE_PATTERNS).unwrap())
}

/// Base score for an element from its tag name alone.
///
/// Content containers score positive, navigation and chrome score negative:
/// - `article` +10, `section` +8, `div` +5, `td`/`blockquote` +3
/// - `pre` 0 (code blocks are rarely the article body)
/// - `form` -3, list/metadata tags -3
/// - headings, `th`, `header`, `footer`, `nav` -5
pub fn base_tag_score(tag_name: &str) -> f64 {
    match tag_name {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Class/id weight adjustment for an element.
///
/// Positive patterns win over negative ones when both match.
pub fn class_id_weight(element: &ElementRef<'_>) -> f64 {
    if let Some(id) = element.value().attr("id") {
        if positive_regex().is_match(id) {
            return POSITIVE_WEIGHT;
        }
        if negative_regex().is_match(id) {
            return NEGATIVE_WEIGHT;
        }
    }

    if let Some(class) = element.value().attr("class") {
        for class_name in class.split_whitespace() {
            if positive_regex().is_match(class_name) {
                return POSITIVE_WEIGHT;
            }
            if negative_regex().is_match(class_name) {
                return NEGATIVE_WEIGHT;
            }
        }
    }

    0.0
}

/// Content density: 1 point per comma plus 1 point per 100 chars of text,
/// each capped at 3.
pub fn content_density_score(text: &str) -> f64 {
    let char_score =
        ((text.chars().count() / CHARS_PER_POINT) as f64).min(MAX_CHAR_DENSITY_SCORE);
    let comma_score = (text.matches(',').count() as f64).min(MAX_COMMA_DENSITY_SCORE);
    char_score + comma_score
}

/// Ratio of link text to total text, from 0.0 (no links) to 1.0 (all links).
pub fn link_density(element: &ElementRef<'_>) -> f64 {
    let text: String = element.text().collect();
    let text_length = text.chars().count();

    if text_length == 0 {
        return 0.0;
    }

    let link_sel = scraper::Selector::parse("a").unwrap();
    let link_text_length: usize = element
        .select(&link_sel)
        .map(|link| link.text().collect::<String>().chars().count())
        .sum();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Final score: (base + class weight + density) scaled by (1 - link density).
pub fn calculate_score(element: &ElementRef<'_>) -> f64 {
    let text: String = element.text().collect();

    let base = base_tag_score(element.value().name());
    let weight = class_id_weight(element);
    let density = content_density_score(&text);
    let ld = link_density(element);

    (base + weight + density) * (1.0 - ld)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first<'a>(doc: &'a Html, selector: &str) -> ElementRef<'a> {
        let sel = Selector::parse(selector).expect("selector");
        doc.select(&sel).next().expect("element present")
    }

    #[test]
    fn base_scores_by_tag() {
        assert_eq!(base_tag_score("article"), 10.0);
        assert_eq!(base_tag_score("section"), 8.0);
        assert_eq!(base_tag_score("div"), 5.0);
        assert_eq!(base_tag_score("td"), 3.0);
        assert_eq!(base_tag_score("blockquote"), 3.0);
        assert_eq!(base_tag_score("pre"), 0.0);
        assert_eq!(base_tag_score("form"), -3.0);
        assert_eq!(base_tag_score("ul"), -3.0);
        assert_eq!(base_tag_score("nav"), -5.0);
        assert_eq!(base_tag_score("header"), -5.0);
        assert_eq!(base_tag_score("span"), 0.0);
    }

    #[test]
    fn class_weight_positive() {
        let doc = Html::parse_fragment(r#"<div class="post-content">x</div>"#);
        assert_eq!(class_id_weight(&first(&doc, "div")), 25.0);
    }

    #[test]
    fn class_weight_negative() {
        let doc = Html::parse_fragment(r#"<div class="sidebar">x</div>"#);
        assert_eq!(class_id_weight(&first(&doc, "div")), -25.0);
    }

    #[test]
    fn id_weight_checked_before_class() {
        let doc = Html::parse_fragment(r#"<div id="main-content" class="sidebar">x</div>"#);
        assert_eq!(class_id_weight(&first(&doc, "div")), 25.0);
    }

    #[test]
    fn no_pattern_match_is_neutral() {
        let doc = Html::parse_fragment(r#"<div class="container" id="wrapper">x</div>"#);
        assert_eq!(class_id_weight(&first(&doc, "div")), 0.0);
    }

    #[test]
    fn density_short_text() {
        assert_eq!(content_density_score("Short text here."), 0.0);
    }

    #[test]
    fn density_commas_capped() {
        assert_eq!(content_density_score("a, b, c, d, e, f"), 3.0);
    }

    #[test]
    fn density_chars_capped() {
        let long = "a".repeat(1000);
        assert_eq!(content_density_score(&long), 3.0);
    }

    #[test]
    fn link_density_extremes() {
        let doc = Html::parse_fragment(r#"<div>Plain text without links.</div>"#);
        assert_eq!(link_density(&first(&doc, "div")), 0.0);

        let doc = Html::parse_fragment(r##"<div><a href="#">only a link</a></div>"##);
        assert_eq!(link_density(&first(&doc, "div")), 1.0);
    }

    #[test]
    fn nav_scores_below_content() {
        let doc = Html::parse_fragment(
            r##"<article class="post-content">
                <p>Widgets are small, composable, and cheap to produce, which is why
                every serious factory keeps a bin of them on hand for prototyping.</p>
            </article>
            <nav class="menu"><a href="/a">A</a><a href="/b">B</a><a href="/c">C</a></nav>"##,
        );
        let article_score = calculate_score(&first(&doc, "article"));
        let nav_score = calculate_score(&first(&doc, "nav"));
        assert!(article_score > MIN_SCORE_THRESHOLD);
        assert!(nav_score < 0.0);
    }

    #[test]
    fn all_link_element_scores_zero() {
        let doc = Html::parse_fragment(
            r##"<div class="post"><a href="/x">a link, with, commas, in, it</a></div>"##,
        );
        assert_eq!(calculate_score(&first(&doc, "div")), 0.0);
    }
}
