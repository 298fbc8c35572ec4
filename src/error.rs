use thiserror::Error;

/// Failure of a single page fetch.
///
/// Only [`FetchError::Transient`] is retried. `Blocked` and `Rejected` end the
/// target's crawl, `ParseShape` is read as "no more content".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Timeout, connection reset, 5xx.
    #[error("transient network error: {reason}")]
    Transient { reason: String },

    /// 401/403/429 or an anti-automation page.
    #[error("blocked (status {status}){}", marker_suffix(.marker))]
    Blocked { status: u16, marker: Option<String> },

    /// Any other non-success status, e.g. 404 for a wrong target id.
    #[error("request rejected with status {status}")]
    Rejected { status: u16 },

    /// The expected review containers are missing from the page.
    #[error("unexpected page shape: {detail}")]
    ParseShape { detail: String },
}

impl FetchError {
    pub fn transient(reason: impl Into<String>) -> Self {
        FetchError::Transient { reason: reason.into() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    /// Errors that abort the whole target rather than the page.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchError::Blocked { .. } | FetchError::Rejected { .. })
    }
}

fn marker_suffix(marker: &Option<String>) -> String {
    marker
        .as_deref()
        .map(|m| format!(", marker \"{m}\""))
        .unwrap_or_default()
}

/// Fatal configuration problems, detected before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("site '{site}' requires a session credential (set REVIEW_COOKIE)")]
    MissingCredential { site: String },

    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: String, value: String },

    #[error("unknown site '{0}' (expected douban, douban-latest, myanimelist or anikore)")]
    UnknownSite(String),

    #[error("no targets configured (set REVIEW_TARGETS)")]
    NoTargets,
}
