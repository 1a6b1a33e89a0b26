use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::model::Page;
use crate::error::FeedError;

/// Upstream query a feed is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedSource {
    /// A feed generator, addressed by its AT URI.
    HomeFeed { feed_uri: String },
    /// Posts authored by an account (handle or DID).
    Author { actor: String },
    /// The viewer's notifications.
    Notifications,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeFeed { feed_uri } => write!(f, "feed:{feed_uri}"),
            Self::Author { actor } => write!(f, "author:{actor}"),
            Self::Notifications => f.write_str("notifications"),
        }
    }
}

/// Fetches one page of a feed.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch the page following `cursor`, or the first page when `cursor` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Upstream`] on network or HTTP failure and
    /// [`FeedError::Auth`] when the credential is missing or expired.
    async fn fetch(
        &self,
        source: &FeedSource,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<T>, FeedError>;
}

/// Wraps a fetcher and retries retryable failures a fixed number of times.
pub struct RetryingFetcher<F> {
    inner: F,
    retries: u32,
    backoff: Duration,
}

impl<F> RetryingFetcher<F> {
    #[must_use]
    pub fn new(inner: F, retries: u32, backoff: Duration) -> Self {
        Self {
            inner,
            retries,
            backoff,
        }
    }

    #[must_use]
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<T, F> PageFetcher<T> for RetryingFetcher<F>
where
    T: Send + 'static,
    F: PageFetcher<T>,
{
    async fn fetch(
        &self,
        source: &FeedSource,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<T>, FeedError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch(source, limit, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!(%source, attempt, retries = self.retries, "Page fetch failed, retrying: {e}");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                Err(e) => {
                    debug!(%source, attempt, "Page fetch failed: {e}");
                    return Err(e);
                }
            }
        }
    }
}
