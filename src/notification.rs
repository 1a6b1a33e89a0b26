//! Notifications and their reason text.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::feed::model::{lenient, Author, FeedEntry, PostRecord};

/// Why a notification was sent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NotificationReason {
    Like,
    Repost,
    Follow,
    Mention,
    Reply,
    Quote,
    Other(String),
}

impl NotificationReason {
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        match reason {
            "like" => Self::Like,
            "repost" => Self::Repost,
            "follow" => Self::Follow,
            "mention" => Self::Mention,
            "reply" => Self::Reply,
            "quote" => Self::Quote,
            other => Self::Other(other.to_string()),
        }
    }

    /// Human-readable description, e.g. "liked your post".
    #[must_use]
    pub fn describe(&self) -> &str {
        match self {
            Self::Like => "liked your post",
            Self::Repost => "reposted your post",
            Self::Follow => "followed you",
            Self::Mention => "mentioned you",
            Self::Reply => "replied to your post",
            Self::Quote => "quoted your post",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for NotificationReason {
    fn from(reason: String) -> Self {
        Self::parse(&reason)
    }
}

impl fmt::Display for NotificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// An `app.bsky.notification.listNotifications#notification`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub uri: String,
    #[serde(default, deserialize_with = "lenient")]
    pub cid: String,
    pub author: Author,
    pub reason: NotificationReason,
    /// The post a like/repost/quote refers to.
    #[serde(default, deserialize_with = "lenient")]
    pub reason_subject: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub record: PostRecord,
    #[serde(default, deserialize_with = "lenient")]
    pub is_read: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// URI of the post this notification should link to.
    #[must_use]
    pub fn target_uri(&self) -> &str {
        self.reason_subject.as_deref().unwrap_or(&self.uri)
    }
}

impl FeedEntry for Notification {
    fn entry_id(&self) -> &str {
        &self.uri
    }

    fn reply_parent(&self) -> Option<&str> {
        self.record.reply_parent.as_deref()
    }

    fn has_media(&self) -> bool {
        self.record.embed.has_media()
    }
}
