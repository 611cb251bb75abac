//! LLM summarization with exponential backoff retry logic.
//!
//! This module talks to an OpenAI-compatible chat-completions endpoint to turn
//! extracted article text into a summary.
//!
//! # Architecture
//!
//! - [`Summarize`]: core trait defining async summarization
//! - [`OpenAiSummarizer`]: a chat-completions client implementing it
//! - [`RetrySummarize`]: decorator adding retry logic to any `Summarize`
//! - [`summarize_article`]: the entry point the HTTP layer calls, which
//!   guards its input and renders failures as `"Failed to generate summary: …"`
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::{SummarizeError, is_failure};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that summarizes articles accurately and concisely.";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.5;

/// Build the user message that wraps the article text.
fn summary_prompt(article: &str) -> String {
    format!(
        "Summarize the article below in roughly 250 words or three to five paragraphs.\n\
         Keep its main points, key arguments, tone and intent, and include the most \
         important figures, quotes or findings. Organize the summary logically.\n\
         Do not add opinions or analysis that are not in the article, skip minor \
         details, and do not repeat yourself.\n\n\
         Article:\n{article}"
    )
}

/// Trait for async summarization.
///
/// Implementors take article text and return a summary. This abstraction
/// allows for different LLM backends or decorators (like retry logic).
pub trait Summarize: Send + Sync {
    /// Summarize `text`.
    ///
    /// # Arguments
    ///
    /// * `text` - Extracted article text. Callers guarantee it is non-empty.
    ///
    /// # Returns
    ///
    /// The summary, or a [`SummarizeError`] describing why none was produced.
    fn summarize(&self, text: &str)
    -> impl Future<Output = Result<String, SummarizeError>> + Send;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI or any API speaking the same protocol.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl fmt::Debug for OpenAiSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSummarizer")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiSummarizer {
    /// Create a client. A missing key is only reported when a summary is requested.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token. `None` and the empty string both count as missing.
    /// * `model` - Model name sent with every request.
    /// * `base_url` - API root such as `https://api.openai.com/v1`. A trailing
    ///   slash is ignored.
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Summarize for OpenAiSummarizer {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let api_key = self.api_key.as_deref().ok_or(SummarizeError::MissingApiKey)?;
        let prompt = summary_prompt(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let t0 = Instant::now();
        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Chat completion returned");

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or(SummarizeError::EmptyResponse)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Summarize`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
///
/// A missing API key or an unusable input is returned immediately; retrying
/// cannot fix either.
pub struct RetrySummarize<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetrySummarize<T>
where
    T: Summarize,
{
    /// Wrap `inner` with retry logic.
    ///
    /// # Arguments
    ///
    /// * `inner` - The summarizer to call.
    /// * `max_retries` - Retries after the first failed call, so at most
    ///   `max_retries + 1` calls are made.
    /// * `base_delay` - Delay before the first retry.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetrySummarize<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySummarize")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

/// `base * 2^(attempt-1)`, capped at `max`. Saturates instead of
/// overflowing for large attempt counts.
fn backoff_delay(base: StdDuration, max: StdDuration, attempt: usize) -> StdDuration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    let factor = 2u32.saturating_pow(exponent);
    base.saturating_mul(factor).min(max)
}

fn is_permanent(e: &SummarizeError) -> bool {
    matches!(
        e,
        SummarizeError::MissingApiKey | SummarizeError::NothingToSummarize
    )
}

impl<T> Summarize for RetrySummarize<T>
where
    T: Summarize,
{
    #[instrument(level = "info", skip_all)]
    async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.summarize(text).await {
                Ok(summary) => return Ok(summary),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if is_permanent(&e) || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "summarize() giving up"
                        );
                        return Err(e);
                    }

                    let delay = backoff_delay(self.base_delay, self.max_delay, attempt);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "summarize() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Summarize extracted article text, always producing a string.
///
/// Empty content and failure strings from the extractor are refused without
/// calling the model. Errors come back as `"Failed to generate summary: …"`.
///
/// # Arguments
///
/// * `summarizer` - Backend to call, usually a [`RetrySummarize`].
/// * `content` - Output of the extractor, which may itself be a failure string.
pub async fn summarize_article<S: Summarize>(summarizer: &S, content: &str) -> String {
    let result = if content.trim().is_empty() || is_failure(content) {
        Err(SummarizeError::NothingToSummarize)
    } else {
        summarizer.summarize(content).await
    };

    match result {
        Ok(summary) => summary,
        Err(e) => {
            warn!(error = %e, "Summary unavailable");
            format!("Failed to generate summary: {e}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Fails a fixed number of times, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl Summarize for Flaky {
        async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(SummarizeError::EmptyResponse)
            } else {
                Ok(format!("summary of {text}"))
            }
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let api = RetrySummarize::new(flaky(2), 3, StdDuration::from_millis(1));
        assert_eq!(api.summarize("x").await.unwrap(), "summary of x");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let api = RetrySummarize::new(flaky(10), 2, StdDuration::from_millis(1));
        assert!(api.summarize("x").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let base = StdDuration::from_millis(100);
        let max = StdDuration::from_secs(30);
        assert_eq!(backoff_delay(base, max, 1), base);
        assert_eq!(backoff_delay(base, max, 3), StdDuration::from_millis(400));
        assert_eq!(backoff_delay(base, max, 20), max);
        assert_eq!(backoff_delay(base, max, 64), max);
        assert_eq!(backoff_delay(base, max, usize::MAX), max);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_retries_do_not_overflow_backoff() {
        let api = RetrySummarize::new(flaky(usize::MAX), 40, StdDuration::from_millis(1));
        assert!(api.summarize("x").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 41);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_retried() {
        let inner = OpenAiSummarizer::new(None, DEFAULT_MODEL, "http://127.0.0.1:9");
        let api = RetrySummarize::new(inner, 5, StdDuration::from_secs(1));
        let err = api.summarize("text").await.unwrap_err();
        assert!(matches!(err, SummarizeError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_refuses_empty_and_failure_content() {
        let summarizer = flaky(0);
        for content in ["", "   ", "Failed to extract article content."] {
            let out = summarize_article(&summarizer, content).await;
            assert!(out.starts_with("Failed to generate summary:"), "{out}");
        }
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_rendered_with_prefix() {
        let summarizer = OpenAiSummarizer::new(Some(String::new()), DEFAULT_MODEL, DEFAULT_BASE_URL);
        let out = summarize_article(&summarizer, "Some article.").await;
        assert_eq!(out, "Failed to generate summary: no API key configured");
    }

    #[tokio::test]
    async fn test_openai_request_and_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 500,
                "messages": [{ "role": "system", "content": SYSTEM_PROMPT }, { "role": "user" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  A short summary.\n" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = OpenAiSummarizer::new(
            Some("sk-test".into()),
            DEFAULT_MODEL,
            format!("{}/v1/", server.uri()),
        );
        let summary = summarizer.summarize("The article.").await.unwrap();
        assert_eq!(summary, "A short summary.");
    }

    #[tokio::test]
    async fn test_openai_no_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let summarizer = OpenAiSummarizer::new(Some("k".into()), DEFAULT_MODEL, server.uri());
        let err = summarizer.summarize("text").await.unwrap_err();
        assert!(matches!(err, SummarizeError::EmptyResponse));
    }
}
