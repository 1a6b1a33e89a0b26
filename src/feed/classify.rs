//! Client-side classification of feed items into tabbed views.

use std::fmt;
use std::str::FromStr;

use super::model::FeedEntry;

/// Which subset of a feed to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClassificationFilter {
    #[default]
    All,
    /// Items that are not replies.
    OriginalOnly,
    /// Items replying to another post.
    RepliesOnly,
    /// Items with at least one media attachment.
    MediaOnly,
}

impl ClassificationFilter {
    /// Whether `item` belongs to this subset.
    #[must_use]
    pub fn matches<T: FeedEntry>(self, item: &T) -> bool {
        match self {
            Self::All => true,
            Self::OriginalOnly => item.reply_parent().is_none(),
            Self::RepliesOnly => item.reply_parent().is_some(),
            Self::MediaOnly => item.has_media(),
        }
    }

    /// Query-string value used by profile tabs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::OriginalOnly => "posts",
            Self::RepliesOnly => "replies",
            Self::MediaOnly => "media",
        }
    }
}

impl fmt::Display for ClassificationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "posts" | "original" => Ok(Self::OriginalOnly),
            "replies" => Ok(Self::RepliesOnly),
            "media" => Ok(Self::MediaOnly),
            _ => Err(format!("unknown filter '{s}'")),
        }
    }
}

/// Keep the items of `items` matching `filter`, preserving order.
#[must_use]
pub fn classify<T: FeedEntry>(items: &[T], filter: ClassificationFilter) -> Vec<T> {
    items
        .iter()
        .filter(|item| filter.matches(*item))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: &'static str,
        parent: Option<&'static str>,
        media: bool,
    }

    impl FeedEntry for Item {
        fn entry_id(&self) -> &str {
            self.id
        }
        fn reply_parent(&self) -> Option<&str> {
            self.parent
        }
        fn has_media(&self) -> bool {
            self.media
        }
    }

    fn page() -> Vec<Item> {
        vec![
            Item { id: "a", parent: None, media: false },
            Item { id: "b", parent: Some("a"), media: false },
            Item { id: "c", parent: None, media: true },
            Item { id: "d", parent: Some("c"), media: true },
        ]
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_all_is_identity() {
        assert_eq!(classify(&page(), ClassificationFilter::All), page());
    }

    #[test]
    fn test_partitions_preserve_order() {
        let items = page();
        assert_eq!(ids(&classify(&items, ClassificationFilter::OriginalOnly)), ["a", "c"]);
        assert_eq!(ids(&classify(&items, ClassificationFilter::RepliesOnly)), ["b", "d"]);
        assert_eq!(ids(&classify(&items, ClassificationFilter::MediaOnly)), ["c", "d"]);
    }

    #[test]
    fn test_replies_and_originals_are_disjoint() {
        let replies = classify(&page(), ClassificationFilter::RepliesOnly);
        assert!(replies.iter().all(|i| i.parent.is_some()));
        assert!(classify(&replies, ClassificationFilter::OriginalOnly).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(classify::<Item>(&[], ClassificationFilter::MediaOnly).is_empty());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("posts".parse(), Ok(ClassificationFilter::OriginalOnly));
        assert_eq!("Replies".parse(), Ok(ClassificationFilter::RepliesOnly));
        assert_eq!("media".parse(), Ok(ClassificationFilter::MediaOnly));
        assert_eq!("all".parse(), Ok(ClassificationFilter::All));
        assert!("bogus".parse::<ClassificationFilter>().is_err());
        assert_eq!(ClassificationFilter::OriginalOnly.to_string(), "posts");
    }
}
