use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use thiserror::Error;

use super::parser::{parse_rss, RssFeed};

/// Identifying User-Agent sent with every feed request
pub const GATOR_USER_AGENT: &str = "gator";
/// Total budget for one feed request, body included
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FEED_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur while fetching one feed document.
///
/// All of them are recovered by the poller: the feed is retried on its next
/// natural turn.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: DNS, refused connection, TLS, timeout
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Response with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body is not an RSS document we understand
    #[error("Feed parsing error: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Network(e) if e.is_timeout())
    }
}

/// Source of parsed feed documents
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch and parse the document at `url`. Called at most once per feed
    /// per polling cycle.
    async fn fetch(&self, url: &str) -> Result<RssFeed, FetchError>;
}

/// Feed fetcher backed by a reqwest client
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    /// Create a fetcher with the default 10 second budget
    pub fn new() -> crate::Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> crate::Result<Self> {
        let client = Self::build_client(timeout)?;
        Ok(Self { client })
    }

    fn build_client(timeout: Duration) -> crate::Result<Client> {
        Client::builder()
            .timeout(timeout)
            .default_headers(Self::build_headers())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| crate::Error::Fetch(FetchError::Network(e)))
    }

    fn build_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(GATOR_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/rss+xml, application/xml;q=0.9, */*;q=0.8"),
        );
        headers
    }

    /// Download the raw document, fully reading the body before returning
    pub async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "Fetching feed document");

        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            ensure_content_size(len as usize, url)?;
        }

        // Chunked responses carry no length; stop reading once over the cap
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            ensure_content_size(body.len() + chunk.len(), url)?;
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for FeedFetcher {
    async fn fetch(&self, url: &str) -> Result<RssFeed, FetchError> {
        let body = self.fetch_raw(url).await?;
        parse_rss(&body)
    }
}

/// Validate a feed URL given on the command line. Only http(s) is fetched.
pub fn parse_feed_url(raw: &str) -> crate::Result<String> {
    let url = url::Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        scheme => Err(crate::Error::InvalidFeedUrl(format!(
            "{} (unsupported scheme {:?})",
            raw, scheme
        ))),
    }
}

fn ensure_content_size(size: usize, url: &str) -> Result<(), FetchError> {
    if size > MAX_FEED_BYTES {
        return Err(FetchError::Parse(format!(
            "Feed too large ({} bytes) for URL: {}",
            size, url
        )));
    }
    Ok(())
}
