//! Shared constants used across the application.

/// User agent sent with every XRPC request.
pub const USER_AGENT: &str = concat!("skyreader/", env!("CARGO_PKG_VERSION"));

/// Fixed key the persisted session blob is stored under.
pub const SESSION_STORAGE_KEY: &str = "bsky-session";

/// Default number of items requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Upper bound accepted by the feed endpoints.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Maximum post length accepted by the composer.
pub const MAX_POST_LENGTH: usize = 300;

/// Default "Posts" home feed: original posts only.
pub const DEFAULT_POSTS_FEED_URI: &str =
    "at://did:plc:tft77e5qkblxtneeib4lp3zk/app.bsky.feed.generator/posts-only";

/// Default "Everything" home feed.
pub const DEFAULT_EVERYTHING_FEED_URI: &str =
    "at://did:plc:tft77e5qkblxtneeib4lp3zk/app.bsky.feed.generator/aaahltvlqwftc";

/// Collection name for posts in a repository.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";
