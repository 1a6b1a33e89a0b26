//! Post cards: author line, rich text, embeds and counts.

use chrono::{DateTime, Utc};
use maud::{html, Markup, Render};

use crate::feed::model::{ExternalLink, Image, QuotedPost};
use crate::feed::{Embed, FeedItem};
use crate::richtext::{segments, Facet, FacetFeature};
use crate::routing::{parse_post_url, post_path, profile_path, repo};

/// Compact age of a timestamp: "now", "42s", "5m", "3h", "6d", then the date.
#[must_use]
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let secs = elapsed.num_seconds();
    if secs < 5 {
        "now".to_string()
    } else if secs < 60 {
        format!("{secs}s")
    } else if elapsed.num_minutes() < 60 {
        format!("{}m", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d", elapsed.num_days())
    } else {
        at.format("%b %-d, %Y").to_string()
    }
}

/// Render post text with its facets as links, mentions and tags.
#[must_use]
pub fn rich_text(text: &str, facets: &[Facet]) -> Markup {
    html! {
        p class="post-text" {
            @for segment in segments(text, facets) {
                @if let Some((actor, rkey)) = segment.link().and_then(parse_post_url) {
                    a href={ (profile_path(&actor)) "/" (rkey) } { (segment.text) }
                } @else if let Some(uri) = segment.link() {
                    a href=(uri) target="_blank" rel="noopener noreferrer nofollow" { (segment.text) }
                } @else if let Some(did) = segment.mention() {
                    a href=(profile_path(did)) { (segment.text) }
                } @else if let Some(FacetFeature::Tag { .. }) = segment.feature {
                    span class="post-tag" { (segment.text) }
                } @else {
                    (segment.text)
                }
            }
        }
    }
}

fn images(images: &[Image]) -> Markup {
    html! {
        @if !images.is_empty() {
            div class="post-images" {
                @for image in images {
                    a href=(image.fullsize) target="_blank" rel="noopener" {
                        img src=(image.thumb) alt=(image.alt) loading="lazy";
                    }
                }
            }
        }
    }
}

fn external(link: &ExternalLink) -> Markup {
    html! {
        a class="post-external" href=(link.uri) target="_blank" rel="noopener noreferrer nofollow" {
            @if let Some(thumb) = &link.thumb {
                img src=(thumb) alt="" loading="lazy";
            }
            strong { (link.title) }
            @if !link.description.is_empty() {
                p { (link.description) }
            }
        }
    }
}

fn quote(quote: Option<&QuotedPost>) -> Markup {
    html! {
        blockquote class="post-quote" {
            @match quote {
                Some(quoted) => {
                    @let actor = quoted
                        .author
                        .as_ref()
                        .map(|a| a.handle.as_str())
                        .or_else(|| repo(&quoted.uri))
                        .unwrap_or_default();
                    @if let Some(author) = &quoted.author {
                        div class="post-meta" { strong { (author.name()) } " @" (author.handle) }
                    }
                    a href=(post_path(actor, &quoted.uri)) { (quoted.text) }
                }
                None => { em { "Quoted post unavailable" } }
            }
        }
    }
}

/// Markup for an embed; empty for none or unknown embeds.
#[must_use]
pub fn embed(embed: &Embed) -> Markup {
    match embed {
        Embed::None | Embed::Unknown => html! {},
        Embed::Images(list) => images(list),
        Embed::External(link) => external(link),
        Embed::Quote(quoted) => quote(quoted.as_ref()),
        Embed::QuoteWithMedia { quote: quoted, images: list } => html! {
            (images(list))
            (quote(quoted.as_ref()))
        },
        Embed::Video { thumbnail } => html! {
            div class="post-video" {
                @if let Some(thumb) = thumbnail {
                    img src=(thumb) alt="Video" loading="lazy";
                } @else {
                    em { "Video" }
                }
            }
        },
    }
}

/// A post as a list item in a feed or thread.
#[derive(Debug, Clone)]
pub struct PostCard<'a> {
    pub item: &'a FeedItem,
    pub now: DateTime<Utc>,
    /// Highlight as the focused post of a thread.
    pub focused: bool,
}

impl<'a> PostCard<'a> {
    #[must_use]
    pub fn new(item: &'a FeedItem, now: DateTime<Utc>) -> Self {
        Self {
            item,
            now,
            focused: false,
        }
    }

    #[must_use]
    pub fn focused(mut self) -> Self {
        self.focused = true;
        self
    }
}

impl Render for PostCard<'_> {
    fn render(&self) -> Markup {
        let item = self.item;
        let class = if self.focused {
            "post-card focused"
        } else {
            "post-card"
        };
        let permalink = post_path(&item.author.handle, &item.uri);

        html! {
            li class=(class) data-entry=(item.uri) {
                @if let Some(by) = &item.reposted_by {
                    div class="post-repost" {
                        "Reposted by " a href=(profile_path(&by.handle)) { (by.name()) }
                    }
                }
                div class="post-meta" {
                    @if let Some(avatar) = &item.author.avatar {
                        img class="avatar" src=(avatar) alt="" width="32" height="32" loading="lazy";
                    }
                    a href=(profile_path(&item.author.handle)) {
                        strong { (item.author.name()) }
                    }
                    " @" (item.author.handle)
                    @if let Some(at) = item.timestamp() {
                        " · "
                        a href=(permalink) {
                            time datetime=(at.to_rfc3339()) { (relative_time(at, self.now)) }
                        }
                    }
                }
                @if item.reply_parent.is_some() && !self.focused {
                    div class="post-meta" { "Reply" }
                }
                (rich_text(&item.text, &item.facets))
                (embed(&item.embed))
                div class="post-counts" {
                    a href=(permalink) { (item.reply_count) " replies" }
                    " · " (item.repost_count) " reposts"
                    " · " (item.like_count) " likes"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::feed::Author;

    fn item() -> FeedItem {
        FeedItem {
            uri: "at://did:plc:alice/app.bsky.feed.post/3k1".to_string(),
            cid: "cid".to_string(),
            author: Author {
                did: "did:plc:alice".to_string(),
                handle: "alice.test".to_string(),
                display_name: Some("Alice".to_string()),
                avatar: None,
            },
            text: "hello <world>".to_string(),
            facets: Vec::new(),
            created_at: Some(Utc::now() - Duration::minutes(3)),
            indexed_at: None,
            reply_parent: None,
            embed: Embed::None,
            reply_count: 1,
            repost_count: 2,
            like_count: 3,
            reposted_by: None,
        }
    }

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "now");
        assert_eq!(relative_time(now - Duration::seconds(42), now), "42s");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h");
        assert_eq!(relative_time(now - Duration::days(6), now), "6d");
        let old = DateTime::parse_from_rfc3339("2024-01-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(relative_time(old, now), "Jan 5, 2024");
    }

    #[test]
    fn test_post_card_render() {
        let item = item();
        let html = PostCard::new(&item, Utc::now()).render().into_string();
        assert!(html.contains("data-entry=\"at://did:plc:alice/app.bsky.feed.post/3k1\""));
        assert!(html.contains("<strong>Alice</strong>"));
        assert!(html.contains("href=\"/alice.test/3k1\""));
        assert!(html.contains("hello &lt;world&gt;"));
        assert!(html.contains(">3m<"));
        assert!(html.contains("3 likes"));
        assert!(!html.contains("Reposted by"));
    }

    #[test]
    fn test_post_card_repost_and_reply() {
        let mut item = item();
        item.reposted_by = Some(Author {
            did: "did:plc:bob".to_string(),
            handle: "bob.test".to_string(),
            display_name: None,
            avatar: None,
        });
        item.reply_parent = Some("at://did:plc:x/app.bsky.feed.post/p".to_string());
        let html = PostCard::new(&item, Utc::now()).render().into_string();
        assert!(html.contains("Reposted by"));
        assert!(html.contains("href=\"/bob.test\""));
        assert!(html.contains(">Reply<"));
    }

    #[test]
    fn test_rich_text_link_and_mention() {
        let text = "see example.com @bob";
        let facets = vec![
            Facet {
                byte_start: 4,
                byte_end: 15,
                feature: FacetFeature::Link {
                    uri: "https://example.com".to_string(),
                },
            },
            Facet {
                byte_start: 16,
                byte_end: 20,
                feature: FacetFeature::Mention {
                    did: "did:plc:bob".to_string(),
                },
            },
        ];
        let html = rich_text(text, &facets).into_string();
        assert!(html.contains("<a href=\"https://example.com\""));
        assert!(html.contains(">example.com</a>"));
        assert!(html.contains("href=\"/did%3Aplc%3Abob\""));
    }

    #[test]
    fn test_rich_text_shared_post_stays_local() {
        let text = "look";
        let facets = vec![Facet {
            byte_start: 0,
            byte_end: 4,
            feature: FacetFeature::Link {
                uri: "https://bsky.app/profile/alice.test/post/3kabc".to_string(),
            },
        }];
        let html = rich_text(text, &facets).into_string();
        assert!(html.contains("href=\"/alice.test/3kabc\""));
        assert!(!html.contains("target=\"_blank\""));
    }

    #[test]
    fn test_unavailable_quote() {
        let html = embed(&Embed::Quote(None)).into_string();
        assert!(html.contains("Quoted post unavailable"));
        assert!(embed(&Embed::Unknown).into_string().is_empty());
    }
}
