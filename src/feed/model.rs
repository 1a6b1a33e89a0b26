//! Domain records produced by the page fetchers.
//!
//! Records coming from the upstream service have an open, `$type`-tagged
//! shape. They are decoded with serde, leniently: a field that is missing or
//! has the wrong shape falls back to its default instead of failing the whole
//! entry, and list entries that do not decode are dropped. Only a missing URI
//! or author rejects an entry, since it could not be identified or
//! attributed.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::richtext::Facet;

/// Deserialize a field, falling back to its default when it has the wrong shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Deserialize a list, dropping entries that do not decode.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// An item that can be accumulated by a feed controller.
pub trait FeedEntry: Clone + Send + Sync + 'static {
    /// Stable identifier used for de-duplication.
    fn entry_id(&self) -> &str;

    /// URI of the post this entry replies to, if any.
    fn reply_parent(&self) -> Option<&str> {
        None
    }

    /// Whether the entry carries at least one media attachment.
    fn has_media(&self) -> bool {
        false
    }
}

/// One page returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation cursor; `None` on the last page.
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, cursor: Option<String>) -> Self {
        Self { items, cursor }
    }

    /// An empty page with no cursor, signalling exhaustion.
    #[must_use]
    pub fn exhausted() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
        }
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.items.is_empty() || self.cursor.is_none()
    }
}

/// Author reference attached to posts and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub did: String,
    pub handle: String,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub avatar: Option<String>,
}

impl Author {
    /// Display name, falling back to the handle when unset or blank.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.handle)
    }
}

/// A single image attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub thumb: String,
    pub fullsize: String,
    pub alt: String,
}

/// An external link card.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalLink {
    #[serde(default, deserialize_with = "lenient")]
    pub uri: String,
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient")]
    pub thumb: Option<String>,
}

/// A post embedded by another post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedPost {
    pub uri: String,
    pub author: Option<Author>,
    pub text: String,
}

/// Embed attached to a post, keyed by the record's `$type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "EmbedView")]
pub enum Embed {
    #[default]
    None,
    Images(Vec<Image>),
    External(ExternalLink),
    /// Quote of another post. `None` when the quoted record is missing or blocked.
    Quote(Option<QuotedPost>),
    QuoteWithMedia {
        quote: Option<QuotedPost>,
        images: Vec<Image>,
    },
    Video {
        thumbnail: Option<String>,
    },
    /// A type tag this reader does not know.
    Unknown,
}

impl Embed {
    /// Whether this embed counts as a media attachment.
    #[must_use]
    pub fn has_media(&self) -> bool {
        match self {
            Self::Images(images) | Self::QuoteWithMedia { images, .. } => !images.is_empty(),
            Self::Video { .. } => true,
            Self::None | Self::External(_) | Self::Quote(_) | Self::Unknown => false,
        }
    }
}

/// Wire form of an embed: the hydrated `#view` on post views, the raw
/// record form inside records.
#[derive(Deserialize)]
#[serde(tag = "$type")]
enum EmbedView {
    #[serde(rename = "app.bsky.embed.images#view", alias = "app.bsky.embed.images")]
    Images {
        #[serde(default, deserialize_with = "lenient_list")]
        images: Vec<ImageView>,
    },
    #[serde(rename = "app.bsky.embed.external#view", alias = "app.bsky.embed.external")]
    External { external: ExternalLink },
    #[serde(rename = "app.bsky.embed.record#view", alias = "app.bsky.embed.record")]
    Record {
        #[serde(default, deserialize_with = "lenient")]
        record: Option<RecordView>,
    },
    #[serde(
        rename = "app.bsky.embed.recordWithMedia#view",
        alias = "app.bsky.embed.recordWithMedia"
    )]
    RecordWithMedia {
        #[serde(default, deserialize_with = "lenient")]
        record: Option<NestedRecord>,
        #[serde(default, deserialize_with = "lenient")]
        media: Option<Box<EmbedView>>,
    },
    #[serde(rename = "app.bsky.embed.video#view", alias = "app.bsky.embed.video")]
    Video {
        #[serde(default, deserialize_with = "lenient")]
        thumbnail: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
struct ImageView {
    #[serde(default, deserialize_with = "lenient")]
    thumb: Option<String>,
    /// Absent in raw records, which carry a blob ref instead of CDN URLs.
    #[serde(default, deserialize_with = "lenient")]
    fullsize: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    alt: String,
}

impl ImageView {
    fn into_image(self) -> Option<Image> {
        let fullsize = self.fullsize?;
        Some(Image {
            thumb: self.thumb.unwrap_or_else(|| fullsize.clone()),
            fullsize,
            alt: self.alt,
        })
    }
}

/// The quoted record; anything but a visible record (not found, blocked,
/// detached) is unavailable.
#[derive(Deserialize)]
#[serde(tag = "$type")]
enum RecordView {
    #[serde(rename = "app.bsky.embed.record#viewRecord")]
    Record(QuotedView),
    #[serde(other)]
    Unavailable,
}

#[derive(Deserialize)]
struct QuotedView {
    uri: String,
    #[serde(default, deserialize_with = "lenient")]
    author: Option<Author>,
    #[serde(default, deserialize_with = "lenient")]
    value: RecordText,
}

#[derive(Default, Deserialize)]
struct RecordText {
    #[serde(default, deserialize_with = "lenient")]
    text: String,
}

#[derive(Default, Deserialize)]
struct NestedRecord {
    #[serde(default, deserialize_with = "lenient")]
    record: Option<RecordView>,
}

fn quoted(record: Option<RecordView>) -> Option<QuotedPost> {
    match record? {
        RecordView::Record(view) => Some(QuotedPost {
            uri: view.uri,
            author: view.author,
            text: view.value.text,
        }),
        RecordView::Unavailable => None,
    }
}

fn images(views: Vec<ImageView>) -> Vec<Image> {
    views.into_iter().filter_map(ImageView::into_image).collect()
}

impl From<EmbedView> for Embed {
    fn from(view: EmbedView) -> Self {
        match view {
            EmbedView::Images { images: list } => Self::Images(images(list)),
            EmbedView::External { external } => Self::External(external),
            EmbedView::Record { record } => Self::Quote(quoted(record)),
            EmbedView::RecordWithMedia { record, media } => Self::QuoteWithMedia {
                quote: quoted(record.and_then(|r| r.record)),
                images: match media.map(|m| *m) {
                    Some(EmbedView::Images { images: list }) => images(list),
                    _ => Vec::new(),
                },
            },
            EmbedView::Video { thumbnail } => Self::Video { thumbnail },
            EmbedView::Unknown => Self::Unknown,
        }
    }
}

/// Fields of an `app.bsky.feed.post` record that the reader uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RecordFields")]
pub struct PostRecord {
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub reply_parent: Option<String>,
    pub facets: Vec<Facet>,
    pub embed: Embed,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordFields {
    #[serde(default, deserialize_with = "lenient")]
    text: String,
    #[serde(default, deserialize_with = "lenient")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    reply: Option<ReplyRef>,
    #[serde(default, deserialize_with = "lenient_list")]
    facets: Vec<Facet>,
    #[serde(default, deserialize_with = "lenient")]
    embed: Embed,
}

#[derive(Deserialize)]
struct ReplyRef {
    parent: StrongRef,
}

#[derive(Deserialize)]
struct StrongRef {
    uri: String,
}

impl From<RecordFields> for PostRecord {
    fn from(fields: RecordFields) -> Self {
        Self {
            text: fields.text,
            created_at: fields.created_at,
            reply_parent: fields.reply.map(|r| r.parent.uri),
            facets: fields.facets,
            embed: fields.embed,
        }
    }
}

/// A post as shown in a feed. Deserializes from a hydrated post view
/// (`app.bsky.feed.defs#postView`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "PostView")]
pub struct FeedItem {
    /// AT URI of the post; the stable identifier.
    pub uri: String,
    pub cid: String,
    pub author: Author,
    pub text: String,
    pub facets: Vec<Facet>,
    pub created_at: Option<DateTime<Utc>>,
    pub indexed_at: Option<DateTime<Utc>>,
    pub reply_parent: Option<String>,
    pub embed: Embed,
    pub reply_count: u64,
    pub repost_count: u64,
    pub like_count: u64,
    /// Set when the item reached the feed as a repost.
    pub reposted_by: Option<Author>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostView {
    uri: String,
    #[serde(default, deserialize_with = "lenient")]
    cid: String,
    author: Author,
    #[serde(default, deserialize_with = "lenient")]
    record: PostRecord,
    #[serde(default, deserialize_with = "lenient")]
    embed: Option<Embed>,
    #[serde(default, deserialize_with = "lenient")]
    indexed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    reply_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    repost_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    like_count: u64,
}

impl From<PostView> for FeedItem {
    fn from(post: PostView) -> Self {
        let record = post.record;
        Self {
            uri: post.uri,
            cid: post.cid,
            author: post.author,
            text: record.text,
            facets: record.facets,
            created_at: record.created_at,
            indexed_at: post.indexed_at,
            reply_parent: record.reply_parent,
            // The hydrated embed has CDN URLs; prefer it over the record's raw embed.
            embed: post.embed.unwrap_or(record.embed),
            reply_count: post.reply_count,
            repost_count: post.repost_count,
            like_count: post.like_count,
            reposted_by: None,
        }
    }
}

/// A feed entry (`app.bsky.feed.defs#feedViewPost`).
#[derive(Deserialize)]
pub(crate) struct FeedViewPost {
    post: FeedItem,
    #[serde(default, deserialize_with = "lenient")]
    reason: Option<FeedReason>,
}

#[derive(Deserialize)]
#[serde(tag = "$type")]
enum FeedReason {
    #[serde(rename = "app.bsky.feed.defs#reasonRepost")]
    Repost { by: Author },
    #[serde(other)]
    Other,
}

impl From<FeedViewPost> for FeedItem {
    fn from(entry: FeedViewPost) -> Self {
        let mut item = entry.post;
        if let Some(FeedReason::Repost { by }) = entry.reason {
            item.reposted_by = Some(by);
        }
        item
    }
}

impl FeedItem {
    /// Record key: the last path segment of the URI.
    #[must_use]
    pub fn rkey(&self) -> &str {
        crate::routing::rkey(&self.uri)
    }

    /// Timestamp used for display: creation time, else index time.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.indexed_at)
    }
}

impl FeedEntry for FeedItem {
    fn entry_id(&self) -> &str {
        &self.uri
    }

    fn reply_parent(&self) -> Option<&str> {
        self.reply_parent.as_deref()
    }

    fn has_media(&self) -> bool {
        self.embed.has_media()
    }
}

/// Detailed profile of an account (`app.bsky.actor.defs#profileViewDetailed`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub author: Author,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub banner: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub followers_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub follows_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub posts_count: u64,
}

/// A post with its direct parent and direct replies.
///
/// Deserializes from `app.bsky.feed.getPostThread`'s `thread` node. Not-found
/// and blocked nodes carry no `post` and decode to empty slots.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "ThreadNode")]
pub struct Thread {
    pub post: Option<FeedItem>,
    pub parent: Option<FeedItem>,
    pub replies: Vec<FeedItem>,
}

#[derive(Deserialize)]
struct ThreadNode {
    #[serde(default, deserialize_with = "lenient")]
    post: Option<FeedItem>,
    #[serde(default, deserialize_with = "lenient")]
    parent: Option<PostNode>,
    #[serde(default, deserialize_with = "lenient_list")]
    replies: Vec<PostNode>,
}

#[derive(Deserialize)]
struct PostNode {
    post: FeedItem,
}

impl From<ThreadNode> for Thread {
    fn from(node: ThreadNode) -> Self {
        let Some(post) = node.post else {
            return Self::default();
        };
        Self {
            post: Some(post),
            parent: node.parent.map(|p| p.post),
            replies: node.replies.into_iter().map(|r| r.post).collect(),
        }
    }
}
