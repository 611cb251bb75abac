//! # Article Extractor
//!
//! Fetches a web page, extracts its readable article text, and optionally
//! summarizes it through an OpenAI-compatible LLM API.
//!
//! ## Architecture
//!
//! Extraction is a two-stage pipeline, first non-empty result wins:
//! 1. **Structured parse**: a readability-style pass picks the main content
//!    container ([`readability`])
//! 2. **Paragraph scrape**: a browser-like fetch, optionally through a proxy,
//!    keeps every `<p>` of the page's `<article>` or of the whole document
//!    ([`fallback`], [`proxy`])
//!
//! [`extractor::Extractor`] ties the stages together and returns a typed
//! [`error::Extraction`]; its `Display` form keeps the `"Failed to…"` strings
//! existing clients check for. [`server`] exposes the pipeline and the
//! summarizer ([`api`]) over HTTP.

pub mod api;
pub mod cli;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod models;
pub mod proxy;
pub mod readability;
pub mod server;
pub mod utils;

pub use error::{ExtractFailure, Extraction, FailureKind};
pub use extractor::{Extractor, normalize_url};
pub use proxy::{ProxyConfig, ProxySettings, resolve_proxy};
pub use readability::{ArticleParser, ReadabilityParser};
