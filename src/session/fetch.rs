use async_trait::async_trait;

use super::Authenticator;
use crate::error::FeedError;
use crate::feed::{FeedSource, Page, PageFetcher};
use crate::xrpc::XrpcClient;

/// Pages fetched through the authenticator survive an access token expiring
/// mid-scroll.
#[async_trait]
impl<T> PageFetcher<T> for Authenticator
where
    T: Send + 'static,
    XrpcClient: PageFetcher<T>,
{
    async fn fetch(
        &self,
        source: &FeedSource,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Page<T>, FeedError> {
        self.call(|client| async move {
            PageFetcher::<T>::fetch(&client, source, limit, cursor).await
        })
        .await
    }
}
