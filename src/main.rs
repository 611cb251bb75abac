use article_extractor::api::{OpenAiSummarizer, RetrySummarize};
use article_extractor::cli::Cli;
use article_extractor::server::{self, AppState};
use article_extractor::{Extractor, ReadabilityParser};
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env");
    }

    // Parse CLI
    let args = Cli::parse();
    info!(
        addr = %args.listen_addr(),
        model = %args.openai_model,
        summaries_enabled = args.openai_api_key.is_some(),
        "article_extractor starting up"
    );

    let extractor = Extractor::new(ReadabilityParser::new()?, args.proxy_settings());
    let summarizer = RetrySummarize::new(
        OpenAiSummarizer::new(
            args.openai_api_key.clone(),
            args.openai_model.clone(),
            args.openai_base_url.clone(),
        ),
        args.summary_retries,
        Duration::from_secs(1),
    );

    let listener = TcpListener::bind(args.listen_addr()).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    server::serve(listener, AppState::new(extractor, summarizer)).await?;

    info!("Shut down");
    Ok(())
}
