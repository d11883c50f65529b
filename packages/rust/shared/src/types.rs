//! Core domain types for the Postforge article pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker appended to enhanced article titles.
///
/// Its presence in a title is the only signal that an article has already
/// been enhanced; no other code path may produce it.
pub const ENHANCED_MARKER: &str = " (AI Enhanced)";

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A stored blog article, as persisted in the `articles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier (UUID v7, assigned by storage on insert).
    pub id: String,
    /// Article title; enhanced titles end with [`ENHANCED_MARKER`].
    pub title: String,
    /// URL-safe slug, unique across the table.
    pub slug: String,
    /// Article body (HTML or plain text).
    pub content: String,
    /// Author name; `"Unknown"` when the source page carried none.
    pub author: String,
    /// Original page URL; `None` for manually created articles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Reference source links; exactly 2 for enhanced articles, empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Creation timestamp; the sole ordering key for oldest/latest queries.
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Whether this article's title carries the enhancement marker.
    pub fn is_enhanced(&self) -> bool {
        self.title
            .to_lowercase()
            .contains(&ENHANCED_MARKER.to_lowercase())
    }
}

/// An article ready to be written; storage assigns the id.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author: String,
    pub source_url: Option<String>,
    pub references: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A harvested listing-page entry, prior to scraping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute URL of the article page.
    pub link: String,
    /// Published date from the listing; Unix epoch when none was found.
    pub published_at: DateTime<Utc>,
}

impl Candidate {
    /// Whether the listing carried no usable date for this entry.
    pub fn is_undated(&self) -> bool {
        self.published_at == DateTime::UNIX_EPOCH
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A reference source accepted by the source-gathering loop.
#[derive(Debug, Clone)]
pub struct Source {
    /// The source page URL.
    pub link: String,
    /// Extracted text content (at least the configured minimum length).
    pub content: String,
}

// ---------------------------------------------------------------------------
// Slug derivation
// ---------------------------------------------------------------------------

/// Derive a URL-safe slug from a title.
///
/// Lower-cases, collapses runs of non-alphanumeric characters into single
/// hyphens, and strips leading/trailing hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;

    for ch in title.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}
