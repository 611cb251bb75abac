//! Request and response bodies of the HTTP surface.

use serde::{Deserialize, Serialize};

/// Body of `POST /extract` and `POST /summarize`.
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
}

/// Extraction result. `content` is either article text or a `"Failed to"` string.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractResponse {
    pub url: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummarizeResponse {
    pub url: String,
    pub content: String,
    /// Summary text or a `"Failed to generate summary:"` string.
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
