//! Notification rows.

use chrono::{DateTime, Utc};
use maud::{html, Markup, Render};

use super::post::{relative_time, rich_text};
use crate::notification::{Notification, NotificationReason};
use crate::routing::{post_path, profile_path, repo};

/// A notification as a list item.
#[derive(Debug, Clone)]
pub struct NotificationRow<'a> {
    pub notification: &'a Notification,
    pub now: DateTime<Utc>,
}

impl<'a> NotificationRow<'a> {
    #[must_use]
    pub fn new(notification: &'a Notification, now: DateTime<Utc>) -> Self {
        Self { notification, now }
    }

    /// Where the row links to: the follower's profile, or the post involved.
    #[must_use]
    pub fn target_path(&self) -> String {
        let n = self.notification;
        if n.reason == NotificationReason::Follow {
            return profile_path(&n.author.handle);
        }
        let uri = n.target_uri();
        post_path(repo(uri).unwrap_or(&n.author.handle), uri)
    }
}

impl Render for NotificationRow<'_> {
    fn render(&self) -> Markup {
        let n = self.notification;
        let class = if n.is_read {
            "notification-row"
        } else {
            "notification-row unread"
        };
        let show_text = matches!(
            n.reason,
            NotificationReason::Reply | NotificationReason::Mention | NotificationReason::Quote
        );

        html! {
            li class=(class) data-entry=(n.uri) {
                div class="notification-meta" {
                    a href=(profile_path(&n.author.handle)) { strong { (n.author.name()) } }
                    " "
                    a href=(self.target_path()) { (n.reason) }
                    @if let Some(at) = n.indexed_at {
                        " · "
                        time datetime=(at.to_rfc3339()) { (relative_time(at, self.now)) }
                    }
                }
                @if show_text && !n.record.text.is_empty() {
                    (rich_text(&n.record.text, &n.record.facets))
                }
            }
        }
    }
}
