//! Ranked web search over the Google Programmable Search JSON API.
//!
//! The API returns results in relevance order; callers depend on that order
//! and must never re-sort. Zero matches is a normal outcome (`Ok` with an
//! empty vec), only transport and HTTP failures are errors.

use postforge_shared::{read_env_credential, PostforgeError, Result, SearchConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

// ---------------------------------------------------------------------------
// Response payload
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    /// Absent entirely when the query matches nothing.
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the Programmable Search `customsearch/v1` endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    api_key: String,
    engine_id: String,
    result_count: u32,
    base_url: String,
}

impl SearchClient {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>, result_count: u32) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            result_count,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build a client from config, reading credentials from the environment
    /// variables the config names.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = read_env_credential(&config.api_key_env, "search API key")?;
        let engine_id = read_env_credential(&config.engine_id_env, "search engine id")?;
        Ok(Self::new(api_key, engine_id, config.result_count))
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run a query and return result links in the API's relevance order.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn ranked_links(&self, query: &str) -> Result<Vec<String>> {
        let url = format!("{}/customsearch/v1", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("key", &self.api_key),
                ("cx", &self.engine_id),
                ("num", &self.result_count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PostforgeError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostforgeError::Search(format!("HTTP {status}: {body}")));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| PostforgeError::Search(format!("malformed response: {e}")))?;

        let links: Vec<String> = payload
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.link)
            .collect();

        debug!(count = links.len(), "search results");
        Ok(links)
    }
}
