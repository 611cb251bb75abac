//! Generic paragraph scraping, used when the structured parser comes up empty.
//!
//! Precision is traded for robustness: every `<p>` inside the first
//! `<article>` (or the whole document when there is none) is kept, minus
//! scripts and styles.

use crate::error::ExtractFailure;
use crate::proxy::ProxyConfig;
use itertools::Itertools;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Request timeout for the fallback fetch.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Desktop browser user agent; bare clients get bot-blocked on many sites.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

fn build_client(proxy: Option<&ProxyConfig>, timeout: Duration) -> reqwest::Result<Client> {
    let builder = Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout);
    match proxy {
        Some(proxy) => {
            info!(endpoint = %proxy.endpoint(), "Using proxy");
            proxy.apply(builder)?.build()
        }
        None => {
            info!("Making request without proxy");
            builder.no_proxy().build()
        }
    }
}

/// Download `url` once, through `proxy` when given.
///
/// Connection errors, timeouts and non-2xx statuses are all network failures.
/// A proxy that cannot be turned into a client is not, since nothing was sent.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_html(
    url: &str,
    proxy: Option<&ProxyConfig>,
    timeout: Duration,
) -> Result<String, ExtractFailure> {
    let client = build_client(proxy, timeout).map_err(|e| ExtractFailure::Parse(e.to_string()))?;

    let network = |e: reqwest::Error| ExtractFailure::Network(e.to_string());
    let body = client
        .get(url)
        .send()
        .await
        .map_err(network)?
        .error_for_status()
        .map_err(network)?
        .text()
        .await
        .map_err(network)?;

    debug!(bytes = body.len(), "Fetched fallback HTML");
    Ok(body)
}

fn selector(css: &'static str) -> Result<Selector, ExtractFailure> {
    Selector::parse(css).map_err(|e| ExtractFailure::Parse(e.to_string()))
}

/// Pull paragraph text out of `html`.
///
/// Paragraphs are trimmed, empty ones dropped, and the rest joined by a blank
/// line in document order.
pub fn scrape_paragraphs(html: &str) -> Result<String, ExtractFailure> {
    let mut document = Html::parse_document(html);

    let noise = selector("script, style")?;
    let doomed = document
        .root_element()
        .select(&noise)
        .map(|element| element.id())
        .collect::<Vec<_>>();
    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let article = selector("article")?;
    let paragraph = selector("p")?;
    let root = document.root_element();
    let scope = root.select(&article).next().unwrap_or(root);

    let text = scope
        .select(&paragraph)
        .map(|p| p.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .join("\n\n");

    if text.is_empty() {
        return Err(ExtractFailure::EmptyContent);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_article_paragraphs_skip_empty() {
        let html = "<html><body><article><p>A</p><p></p><p>B</p></article></body></html>";
        assert_eq!(scrape_paragraphs(html).unwrap(), "A\n\nB");
    }

    #[test]
    fn test_article_scope_ignores_outside_paragraphs() {
        let html = "<body><p>nav</p><article><p>inside</p></article><p>footer</p></body>";
        assert_eq!(scrape_paragraphs(html).unwrap(), "inside");
    }

    #[test]
    fn test_document_wide_without_article() {
        let html = "<html><body><div><p>X</p></div><section><p>Y</p></section></body></html>";
        assert_eq!(scrape_paragraphs(html).unwrap(), "X\n\nY");
    }

    #[test]
    fn test_whitespace_only_paragraphs_dropped() {
        let html = "<p>  first  </p><p>\n\t </p><p>second</p>";
        assert_eq!(scrape_paragraphs(html).unwrap(), "first\n\nsecond");
    }

    #[test]
    fn test_script_only_document_is_empty_content() {
        let html = "<html><head><script>var p = '<p>hidden</p>';</script></head>\
                    <body><script>document.write('hi')</script></body></html>";
        assert_eq!(
            scrape_paragraphs(html).unwrap_err().to_string(),
            "Failed to extract article content."
        );
    }

    #[test]
    fn test_nested_script_and_style_removed_from_paragraph_text() {
        let html = "<article><p>Keep<script>drop()</script> this<style>p{}</style></p></article>";
        assert_eq!(scrape_paragraphs(html).unwrap(), "Keep this");
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetch_html(&format!("{}/story", server.uri()), None, FALLBACK_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(body, "<p>ok</p>");

        let requests = server.received_requests().await.unwrap();
        let agent = requests[0].headers.get("user-agent").unwrap();
        assert_eq!(agent.to_str().unwrap(), BROWSER_USER_AGENT);
    }

    #[tokio::test]
    async fn test_non_success_status_is_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_html(&server.uri(), None, FALLBACK_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractFailure::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>late</p>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetch_html(&server.uri(), None, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to retrieve the article:"));
    }
}
