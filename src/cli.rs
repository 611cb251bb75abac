//! Command-line interface definitions for the article extractor service.
//!
//! All arguments can be provided via command-line flags or environment
//! variables; a `.env` file is loaded into the environment before parsing.
//! The parsed [`Cli`] is the only place configuration is read. Everything
//! downstream receives the values it needs explicitly.

use crate::api::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::proxy::ProxySettings;
use clap::Parser;

/// Command-line arguments for the article extractor service.
///
/// # Examples
///
/// ```sh
/// # Listen on the default port with no proxy
/// article_extractor
///
/// # Route fallback fetches through an authenticated proxy
/// PROXY_HOST=proxy.local PROXY_PORT=8080 PROXY_USER=me PROXY_PASSWORD=secret article_extractor
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Proxy host for fallback fetches
    #[arg(long, env = "PROXY_HOST")]
    pub proxy_host: Option<String>,

    /// Proxy port for fallback fetches
    #[arg(long, env = "PROXY_PORT")]
    pub proxy_port: Option<String>,

    /// Proxy user name
    #[arg(long, env = "PROXY_USER")]
    pub proxy_user: Option<String>,

    /// Proxy password (a leading `v3=` is stripped)
    #[arg(long, env = "PROXY_PASSWORD", hide_env_values = true)]
    pub proxy_password: Option<String>,

    /// API key for the summarization model
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Summarization model name
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Retries for a failed summarization call
    #[arg(
        long,
        default_value_t = 2,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(0..=10)
    )]
    pub summary_retries: usize,
}

impl Cli {
    /// Collect the four proxy values as given, without validating them.
    ///
    /// # Returns
    ///
    /// [`ProxySettings`] for [`crate::proxy::resolve_proxy`] to check.
    pub fn proxy_settings(&self) -> ProxySettings {
        ProxySettings {
            host: self.proxy_host.clone(),
            port: self.proxy_port.clone(),
            user: self.proxy_user.clone(),
            password: self.proxy_password.clone(),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
