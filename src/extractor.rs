//! The two-stage extraction pipeline.
//!
//! Stage one asks the structured parser. If that errors or finds nothing, stage
//! two fetches the page again with a browser user agent (through the proxy when
//! one is configured) and scrapes its paragraphs. The first non-empty result
//! wins and each stage runs at most once.

use crate::error::{ExtractFailure, Extraction};
use crate::fallback::{FALLBACK_TIMEOUT, fetch_html, scrape_paragraphs};
use crate::proxy::{ProxySettings, resolve_proxy};
use crate::readability::ArticleParser;
use crate::utils::truncate_for_log;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Prefix `https://` unless `url` already names an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Two-stage article extractor.
///
/// Holds the stage-one parser and the raw proxy settings. The proxy is
/// resolved afresh for every fallback fetch.
#[derive(Debug)]
pub struct Extractor<P> {
    parser: P,
    proxy: ProxySettings,
    fallback_timeout: Duration,
}

impl<P: ArticleParser> Extractor<P> {
    /// Create an extractor with the default 15 second fallback timeout.
    ///
    /// # Arguments
    ///
    /// * `parser` - Stage-one parser, usually a [`crate::ReadabilityParser`].
    /// * `proxy` - Proxy values from configuration. Incomplete settings are
    ///   allowed and mean the fallback fetch goes out directly.
    pub fn new(parser: P, proxy: ProxySettings) -> Self {
        Self {
            parser,
            proxy,
            fallback_timeout: FALLBACK_TIMEOUT,
        }
    }

    /// Override the fallback request timeout. Tests only need this.
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// Extract article text from `url`. Never panics on bad input; every
    /// problem ends up in the returned [`ExtractFailure`].
    ///
    /// # Arguments
    ///
    /// * `url` - Page to read. `https://` is assumed when no http(s) scheme is given.
    ///
    /// # Returns
    ///
    /// The trimmed text of whichever stage produced something first, or the
    /// failure of the fallback stage.
    #[instrument(level = "info", skip_all, fields(url = %truncate_for_log(url, 200)))]
    pub async fn extract(&self, url: &str) -> Extraction {
        let t0 = Instant::now();
        let url = normalize_url(url);

        match self.parser.parse(&url).await {
            Ok(text) if !text.trim().is_empty() => {
                info!(
                    stage = "structured",
                    bytes = text.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Extracted article"
                );
                return Ok(text.trim().to_string());
            }
            Ok(_) => info!("Structured parser returned empty text; trying paragraph scrape"),
            Err(e) => warn!(error = %e, "Structured parser failed; trying paragraph scrape"),
        }

        let result = self.scrape(&url).await;
        match &result {
            Ok(text) => info!(
                stage = "fallback",
                bytes = text.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Extracted article"
            ),
            Err(e) => warn!(
                kind = ?e.kind(),
                error = %e,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Extraction failed"
            ),
        }
        result
    }

    async fn scrape(&self, url: &str) -> Extraction {
        let proxy = resolve_proxy(&self.proxy);
        let html = fetch_html(url, proxy.as_ref(), self.fallback_timeout).await?;
        scrape_paragraphs(&html)
    }

    /// [`Extractor::extract`] flattened to the legacy string form: the text on
    /// success, a `"Failed to"` message otherwise.
    pub async fn extract_article(&self, url: &str) -> String {
        self.extract(url)
            .await
            .unwrap_or_else(|failure: ExtractFailure| failure.to_string())
    }
}
