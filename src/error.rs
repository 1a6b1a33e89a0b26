use thiserror::Error;

/// Failures surfaced by the upstream service and the page fetchers.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network failure or non-success HTTP status from the upstream service.
    #[error("upstream request to {endpoint} failed: {message}")]
    Upstream {
        endpoint: String,
        status: Option<u16>,
        message: String,
    },
    /// The upstream answered but the body could not be decoded.
    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
    /// Missing or rejected credential.
    #[error("not authenticated: {0}")]
    Auth(String),
    /// The access token expired; a refresh may recover the session.
    #[error("access token expired: {0}")]
    ExpiredToken(String),
    /// The fetcher cannot serve the requested source.
    #[error("unsupported feed source: {0}")]
    UnsupportedSource(String),
}

impl FeedError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => status.map_or(true, |s| s >= 500 || s == 429),
            Self::InvalidResponse { .. }
            | Self::Auth(_)
            | Self::ExpiredToken(_)
            | Self::UnsupportedSource(_) => false,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::ExpiredToken(_))
    }

    #[must_use]
    pub fn is_expired_token(&self) -> bool {
        matches!(self, Self::ExpiredToken(_))
    }
}
