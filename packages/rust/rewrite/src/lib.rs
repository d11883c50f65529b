//! LLM article rewriting over an OpenRouter-compatible chat API.
//!
//! The client sends one chat-completion request asking an SEO-editor persona
//! to rewrite a draft using two research sources, then cleans the response.
//! Inputs are truncated to keep the prompt bounded; output under 50 chars is
//! treated as a failed generation rather than a usable article.

use postforge_shared::{read_env_credential, OpenRouterConfig, PostforgeError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Prompt prefix budget for the draft article.
const ORIGINAL_MAX_CHARS: usize = 5000;

/// Prompt prefix budget for each research source.
const SOURCE_MAX_CHARS: usize = 4000;

/// Shorter output than this is a generation failure.
const MIN_OUTPUT_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat-completions client used for article rewriting.
#[derive(Debug, Clone)]
pub struct RewriteClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RewriteClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build a client from config, reading the key from the environment
    /// variable the config names.
    pub fn from_config(config: &OpenRouterConfig) -> Result<Self> {
        let api_key = read_env_credential(&config.api_key_env, "OpenRouter API key")?;
        Ok(Self::new(api_key, config.default_model.clone()))
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Rewrite `original` using two research sources.
    ///
    /// Returns the cleaned HTML body. Transport failures, non-2xx statuses,
    /// and empty or degenerate completions all map to `Rewrite` errors.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn rewrite(&self, original: &str, source_one: &str, source_two: &str) -> Result<String> {
        let prompt = build_prompt(original, source_one, source_two);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PostforgeError::Rewrite(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PostforgeError::Rewrite(format!("HTTP {status}: {body}")));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| PostforgeError::Rewrite(format!("malformed response: {e}")))?;

        let raw = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PostforgeError::Rewrite("no content in response".to_string()))?;

        let text = strip_fences(&raw);
        if text.chars().count() < MIN_OUTPUT_CHARS {
            return Err(PostforgeError::Rewrite(
                "model returned empty or degenerate output".to_string(),
            ));
        }

        debug!(output_len = text.len(), "rewrite complete");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Prompt assembly and cleanup
// ---------------------------------------------------------------------------

fn build_prompt(original: &str, source_one: &str, source_two: &str) -> String {
    let draft = truncate_chars(original, ORIGINAL_MAX_CHARS);
    let research_one = truncate_chars(source_one, SOURCE_MAX_CHARS);
    let research_two = truncate_chars(source_two, SOURCE_MAX_CHARS);

    format!(
        "You are an expert SEO content editor.\n\
         Rewrite the following draft article using the provided research materials.\n\
         \n\
         Goals:\n\
         1. Improve clarity, depth, and flow.\n\
         2. Use HTML tags for formatting (<h2>, <p>, <ul>, <strong>).\n\
         3. Do NOT include markdown code blocks. Just return the raw HTML body.\n\
         4. Maintain the core message of the original draft.\n\
         \n\
         Draft:\n\"{draft}\"\n\
         \n\
         Research 1:\n\"{research_one}\"\n\
         \n\
         Research 2:\n\"{research_two}\"\n"
    )
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strip an enclosing markdown code fence, with or without an `html` tag.
fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    text = text
        .strip_prefix("```html")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text = text.strip_suffix("```").unwrap_or(text);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LONG_OUTPUT: &str = "<h2>Widgets Revisited</h2><p>A much longer and clearer take on \
                               the draft, grounded in both research sources.</p>";

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    fn client(server: &MockServer) -> RewriteClient {
        RewriteClient::new("test-key", "test/model").with_base_url(server.uri())
    }

    #[test]
    fn truncation_is_char_based() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        // Multi-byte chars must not split
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn fences_stripped_both_variants() {
        assert_eq!(strip_fences("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_fences("```\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_fences("  <p>x</p>  "), "<p>x</p>");
    }

    #[test]
    fn prompt_embeds_truncated_inputs() {
        let original = "o".repeat(6000);
        let source = "s".repeat(5000);
        let prompt = build_prompt(&original, &source, "short source");
        assert!(prompt.contains(&"o".repeat(5000)));
        assert!(!prompt.contains(&"o".repeat(5001)));
        assert!(prompt.contains(&"s".repeat(4000)));
        assert!(!prompt.contains(&"s".repeat(4001)));
        assert!(prompt.contains("short source"));
    }

    #[tokio::test]
    async fn rewrite_strips_fences_and_authenticates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body(&format!("```html\n{LONG_OUTPUT}\n```"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .rewrite("draft", "source one", "source two")
            .await
            .unwrap();
        assert_eq!(text, LONG_OUTPUT);
    }

    #[tokio::test]
    async fn short_output_is_rewrite_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("```html\nok\n```")))
            .mount(&server)
            .await;

        let err = client(&server)
            .rewrite("draft", "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, PostforgeError::Rewrite(_)));
    }

    #[tokio::test]
    async fn http_failure_is_rewrite_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client(&server)
            .rewrite("draft", "a", "b")
            .await
            .unwrap_err();
        match err {
            PostforgeError::Rewrite(message) => assert!(message.contains("500")),
            other => panic!("expected Rewrite error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_content_is_rewrite_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .rewrite("draft", "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, PostforgeError::Rewrite(_)));
    }
}
