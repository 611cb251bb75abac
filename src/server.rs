//! HTTP surface: liveness, extraction and summarization endpoints.

use crate::api::{Summarize, summarize_article};
use crate::extractor::Extractor;
use crate::models::{ErrorResponse, ExtractResponse, PingResponse, SummarizeResponse, UrlRequest};
use crate::readability::ArticleParser;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state
pub struct AppState<P, S> {
    pub extractor: Arc<Extractor<P>>,
    pub summarizer: Arc<S>,
}

impl<P, S> AppState<P, S> {
    pub fn new(extractor: Extractor<P>, summarizer: S) -> Self {
        Self {
            extractor: Arc::new(extractor),
            summarizer: Arc::new(summarizer),
        }
    }
}

impl<P, S> Clone for AppState<P, S> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            summarizer: Arc::clone(&self.summarizer),
        }
    }
}

/// Build the application router
pub fn router<P, S>(state: AppState<P, S>) -> Router
where
    P: ArticleParser + 'static,
    S: Summarize + 'static,
{
    Router::new()
        .route("/ping", get(ping))
        .route("/extract", post(extract::<P, S>))
        .route("/summarize", post(summarize::<P, S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `state` on `listener` until ctrl-c.
pub async fn serve<P, S>(listener: TcpListener, state: AppState<P, S>) -> std::io::Result<()>
where
    P: ArticleParser + 'static,
    S: Summarize + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

fn requested_url(payload: Result<Json<UrlRequest>, JsonRejection>) -> Result<String, Response> {
    match payload {
        Ok(Json(UrlRequest { url: Some(url) })) => Ok(url),
        Ok(_) => Err(bad_request("URL is required")),
        Err(rejection) => {
            debug!(%rejection, "Rejected request body");
            Err(bad_request("URL is required"))
        }
    }
}

/// Liveness probe
async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        message: "API is running".to_string(),
    })
}

/// Extract article text. Failures are reported in `content`, not the status.
async fn extract<P, S>(
    State(state): State<AppState<P, S>>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Response
where
    P: ArticleParser + 'static,
    S: Summarize + 'static,
{
    let url = match requested_url(payload) {
        Ok(url) => url,
        Err(response) => return response,
    };
    let content = state.extractor.extract_article(&url).await;
    Json(ExtractResponse { url, content }).into_response()
}

/// Extract article text, then summarize it.
async fn summarize<P, S>(
    State(state): State<AppState<P, S>>,
    payload: Result<Json<UrlRequest>, JsonRejection>,
) -> Response
where
    P: ArticleParser + 'static,
    S: Summarize + 'static,
{
    let url = match requested_url(payload) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let content = match state.extractor.extract(&url).await {
        Ok(content) => content,
        Err(failure) => {
            warn!(%url, error = %failure, "Nothing to summarize");
            return bad_request("Could not extract article content");
        }
    };

    let summary = summarize_article(state.summarizer.as_ref(), &content).await;
    Json(SummarizeResponse {
        url,
        content,
        summary,
    })
    .into_response()
}
