//! HTTP transport for listing pages.
//!
//! The scraper talks to a [`PageFetcher`]; production uses [`HttpFetcher`]
//! (reqwest), tests plug in an in-process fixture.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use std::future::Future;
use std::time::Duration;

use crate::error::{ConfigError, FetchError};
use crate::sites::ReviewSite;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    ]
});

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Pick one browser identity for the lifetime of a scraper.
pub fn pick_user_agent() -> String {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USER_AGENT)
        .to_string()
}

/// Headers sent with every request for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityHeaders {
    pub user_agent: String,
    pub referer: String,
    pub accept_language: String,
    /// Operator-supplied session cookie, passed through untouched.
    pub cookie: Option<String>,
}

impl IdentityHeaders {
    pub fn to_header_map(&self) -> Result<HeaderMap, ConfigError> {
        fn value(v: &str, name: &str) -> Result<HeaderValue, ConfigError> {
            HeaderValue::from_str(v).map_err(|_| ConfigError::Invalid {
                var: name.to_string(),
                value: v.to_string(),
            })
        }
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, value(&self.user_agent, "User-Agent")?);
        headers.insert(REFERER, value(&self.referer, "Referer")?);
        headers.insert(ACCEPT_LANGUAGE, value(&self.accept_language, "Accept-Language")?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        if let Some(cookie) = &self.cookie {
            headers.insert(COOKIE, value(cookie, "Cookie")?);
        }
        Ok(headers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub identity: IdentityHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: String::new() }
    }
}

/// One GET for one listing page. No retries here; see [`crate::retry`].
pub trait PageFetcher {
    fn fetch(&self, request: &PageRequest) -> impl Future<Output = Result<RawResponse, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<RawResponse, FetchError> {
        // PagedScraper::new validates the identity, so this only trips on hand-built requests.
        let headers = request
            .identity
            .to_header_map()
            .map_err(|_| FetchError::Rejected { status: 0 })?;
        let resp = self
            .client
            .get(&request.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::transient(describe(&e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::transient(format!("body read failed: {}", describe(&e))))?;
        Ok(RawResponse { status, body })
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connect: {}", e)
    } else {
        e.to_string()
    }
}

/// Map a response onto the error taxonomy, returning the body on success.
pub fn classify_response(raw: RawResponse, site: &dyn ReviewSite) -> Result<String, FetchError> {
    match raw.status {
        200..=299 => match site.blocked_marker(&raw.body) {
            Some(marker) => Err(FetchError::Blocked {
                status: raw.status,
                marker: Some(marker.to_string()),
            }),
            None => Ok(raw.body),
        },
        401 | 403 | 429 => Err(FetchError::Blocked { status: raw.status, marker: None }),
        408 | 500..=599 => Err(FetchError::transient(format!("server returned {}", raw.status))),
        status => Err(FetchError::Rejected { status }),
    }
}
