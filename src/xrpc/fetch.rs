use async_trait::async_trait;

use super::XrpcClient;
use crate::error::FeedError;
use crate::feed::{FeedItem, FeedSource, Page, PageFetcher};
use crate::notification::Notification;

#[async_trait]
impl PageFetcher<FeedItem> for XrpcClient {
    async fn fetch(
        &self,
        source: &FeedSource,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<FeedItem>, FeedError> {
        match source {
            FeedSource::HomeFeed { feed_uri } => self.get_feed(feed_uri, limit, cursor).await,
            FeedSource::Author { actor } => self.get_author_feed(actor, limit, cursor).await,
            FeedSource::Notifications => Err(FeedError::UnsupportedSource(source.to_string())),
        }
    }
}

#[async_trait]
impl PageFetcher<Notification> for XrpcClient {
    async fn fetch(
        &self,
        source: &FeedSource,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<Notification>, FeedError> {
        match source {
            FeedSource::Notifications => self.list_notifications(limit, cursor).await,
            FeedSource::HomeFeed { .. } | FeedSource::Author { .. } => {
                Err(FeedError::UnsupportedSource(source.to_string()))
            }
        }
    }
}
