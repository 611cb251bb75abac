//! Structured article parsing: the first extraction stage.
//!
//! The page is handed to `dom_smoothie`, a port of Mozilla's readability.js,
//! which finds the main content and drops navigation, ads and other
//! boilerplate. The cleaned article markup is then flattened into
//! blank-line separated text blocks.
//!
//! The network side sits behind [`ArticleParser`] so the pipeline can be
//! exercised without a live site.

use crate::error::ParseError;
use dom_smoothie::Readability;
use itertools::Itertools;
use reqwest::Client;
use scraper::{Html, Selector};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, instrument};

/// Turns a URL into readable article text.
///
/// An empty string means "nothing readable found" and is not an error.
pub trait ArticleParser: Send + Sync {
    /// Download and parse the page at `url`.
    ///
    /// # Returns
    ///
    /// The article text, possibly empty, or a [`ParseError`] if the page could
    /// not be fetched or read. Either way the caller may fall back to another
    /// strategy.
    fn parse(&self, url: &str) -> impl Future<Output = Result<String, ParseError>> + Send;
}

const PARSER_USER_AGENT: &str = concat!("article_extractor/", env!("CARGO_PKG_VERSION"));
const PARSER_TIMEOUT: Duration = Duration::from_secs(7);

/// [`ArticleParser`] that downloads the page and runs [`readable_text`] on it.
#[derive(Debug, Clone)]
pub struct ReadabilityParser {
    client: Client,
}

impl ReadabilityParser {
    /// Create a parser with its own HTTP client (crate user agent, 7 second
    /// timeout).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Download`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ParseError> {
        let client = Client::builder()
            .user_agent(PARSER_USER_AGENT)
            .timeout(PARSER_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl ArticleParser for ReadabilityParser {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn parse(&self, url: &str) -> Result<String, ParseError> {
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let text = readable_text(&html, Some(url))?;
        debug!(html_bytes = html.len(), text_bytes = text.len(), "Readability pass finished");
        Ok(text)
    }
}

/// Elements whose text forms one block of output.
const BLOCK_TAGS: &str = "p, li, pre, blockquote, h1, h2, h3, h4, h5, h6, td, dd, dt, figcaption";

fn collapsed(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Flatten the cleaned article HTML into blank-line separated blocks.
///
/// Only innermost blocks are emitted, so a `<li>` wrapping a `<p>` does not
/// repeat its text. Markup without any block element becomes a single block.
fn article_blocks(content: &str, text_content: &str) -> Result<String, ParseError> {
    let blocks = Selector::parse(BLOCK_TAGS).map_err(|e| ParseError::Document(e.to_string()))?;
    let fragment = Html::parse_fragment(content);

    let text = fragment
        .root_element()
        .select(&blocks)
        .filter(|block| block.select(&blocks).next().is_none())
        .map(|block| collapsed(&block.text().collect::<String>()))
        .filter(|block| !block.is_empty())
        .join("\n\n");

    if text.is_empty() {
        return Ok(collapsed(text_content));
    }
    Ok(text)
}

/// Extract the readable body of `html`.
///
/// `url` is used to resolve relative links and may be omitted. Panics inside
/// the readability library are caught and reported as [`ParseError::Document`]
/// so a hostile page can never take the pipeline down.
///
/// # Returns
///
/// The article text as blank-line separated blocks, or an error when no
/// article could be identified.
pub fn readable_text(html: &str, url: Option<&str>) -> Result<String, ParseError> {
    let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut readability =
            Readability::new(html, url, None).map_err(|e| format!("{e:?}"))?;
        let article = readability.parse().map_err(|e| format!("{e:?}"))?;
        Ok::<(String, String), String>((
            article.content.to_string(),
            article.text_content.to_string(),
        ))
    }));

    match parsed {
        Ok(Ok((content, text_content))) => article_blocks(&content, &text_content),
        Ok(Err(e)) => Err(ParseError::Document(e)),
        Err(_) => Err(ParseError::Document("readability panicked".to_string())),
    }
}
