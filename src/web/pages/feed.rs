//! Item-list fragments shared by the feed pages and the visibility endpoint.

use chrono::{DateTime, Utc};
use maud::{Markup, Render};

use crate::components::{FeedList, NotificationRow, PostCard};
use crate::feed::{FeedItem, FeedSnapshot};
use crate::notification::Notification;
use crate::web::views::ViewKey;

/// Render the list of posts of a view.
#[must_use]
pub fn render_post_list(
    key: &ViewKey,
    snapshot: &FeedSnapshot<FeedItem>,
    threshold: f64,
    now: DateTime<Utc>,
) -> Markup {
    let view = key.to_string();
    let empty = match key {
        ViewKey::Home(_) => "Your feed is empty.",
        ViewKey::Profile(_) => "No posts yet.",
        ViewKey::Notifications => "Nothing here yet.",
    };
    FeedList::new(&view, snapshot, |item: &FeedItem| {
        PostCard::new(item, now).render()
    })
    .threshold(threshold)
    .empty_message(empty)
    .render()
}

/// Render the notification list.
#[must_use]
pub fn render_notification_list(
    snapshot: &FeedSnapshot<Notification>,
    threshold: f64,
    now: DateTime<Utc>,
) -> Markup {
    let view = ViewKey::Notifications.to_string();
    FeedList::new(&view, snapshot, |n: &Notification| {
        NotificationRow::new(n, now).render()
    })
    .threshold(threshold)
    .empty_message("No notifications yet.")
    .render()
}
