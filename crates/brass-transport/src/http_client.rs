//! HTTP page fetching.
//!
//! [`PageFetcher`] is the collaborator the URL engine and plugins use to pull
//! web pages: bounded body size, per-request extra headers, charset-aware
//! text decoding.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built, sent or read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code.
        status: u16,
        /// Final URL after redirects.
        url: String,
    },

    /// The body was not the expected JSON.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for a [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Bodies are truncated at this many bytes.
    pub max_body_size: usize,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_body_size: 2 * 1024 * 1024,
            user_agent: concat!("brass/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A fetched page.
#[derive(Debug, Clone)]
pub struct Page {
    /// URL after following redirects.
    pub final_url: String,
    /// Raw `Content-Type` header, empty if absent.
    pub content_type: String,
    /// Body bytes, at most `max_body_size` long.
    pub body: Vec<u8>,
    /// Whether the body was cut at `max_body_size`.
    pub truncated: bool,
}

impl Page {
    /// Returns true for HTML responses.
    pub fn is_html(&self) -> bool {
        mime_of(&self.content_type).ends_with("html")
    }

    /// Decodes the body as text, or `None` for binary content.
    pub fn text(&self) -> Option<String> {
        is_text(&self.content_type).then(|| decode_body(&self.content_type, &self.body))
    }
}

/// Pulls pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl PageFetcher {
    /// Builds a fetcher with its own connection pool.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetcher settings.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url`, sending `headers` in addition to the defaults.
    pub async fn get_page_body(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Page, FetchError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let mut response = request.send().await?;
        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let max = self.config.max_body_size;
        let mut body = Vec::new();
        let mut truncated = false;
        while let Some(chunk) = response.chunk().await? {
            let room = max.saturating_sub(body.len());
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %final_url, bytes = body.len(), truncated, "Page fetched");
        Ok(Page {
            final_url,
            content_type,
            body,
            truncated,
        })
    }

    /// Fetches `url` and deserializes the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let page = self.get_page_body(url, headers).await?;
        Ok(serde_json::from_slice(&page.body)?)
    }
}

// =============================================================================
// Content-Type helpers
// =============================================================================

fn mime_of(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns the `charset` parameter of a `Content-Type` value.
pub fn charset_of(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Returns true if the content type carries text.
///
/// A missing content type is treated as text.
pub fn is_text(content_type: &str) -> bool {
    let mime = mime_of(content_type);
    mime.is_empty()
        || mime.starts_with("text/")
        || mime.ends_with("json")
        || mime.ends_with("xml")
        || mime.ends_with("javascript")
}

/// Decodes `body` with the charset named in `content_type`, UTF-8 otherwise.
pub fn decode_body(content_type: &str, body: &[u8]) -> String {
    let encoding = charset_of(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}
