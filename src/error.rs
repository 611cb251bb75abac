//! Error and outcome types shared by the extraction pipeline and the
//! summarization client.
//!
//! Extraction failures render to the exact strings older consumers of the
//! service branch on (everything starts with `"Failed to"`), so the typed
//! value and the legacy string never drift apart.

use thiserror::Error;

/// Prefix carried by every failure string the service hands out.
pub const FAILURE_PREFIX: &str = "Failed to";

/// Outcome of a single extraction: the article text or the reason it failed.
pub type Extraction = Result<String, ExtractFailure>;

/// Coarse classification of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// DNS, connect, timeout or non-2xx status on the fallback request.
    NetworkError,
    /// The page downloaded fine but held no paragraph text.
    EmptyContent,
    /// Anything else that went wrong while turning the page into text.
    ParseError,
}

/// Terminal failure of the extraction pipeline.
///
/// The `Display` output is the wire-compatible failure string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractFailure {
    #[error("Failed to retrieve the article: {0}")]
    Network(String),
    #[error("Failed to extract article content.")]
    EmptyContent,
    #[error("Failed to extract article: {0}")]
    Parse(String),
}

impl ExtractFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractFailure::Network(_) => FailureKind::NetworkError,
            ExtractFailure::EmptyContent => FailureKind::EmptyContent,
            ExtractFailure::Parse(_) => FailureKind::ParseError,
        }
    }
}

/// Failure of the structured (stage one) parser. Never leaves the extractor.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("document could not be read: {0}")]
    Document(String),
}

/// Failure of the summarization collaborator.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("no article content to summarize")]
    NothingToSummarize,
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned no choices")]
    EmptyResponse,
}

/// Whether a legacy result string denotes a failure.
pub fn is_failure(text: &str) -> bool {
    text.starts_with(FAILURE_PREFIX)
}
