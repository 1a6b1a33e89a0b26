use chrono::Utc;
use maud::{html, Markup};

use super::feed::render_notification_list;
use crate::components::{visibility_script, BaseLayout};
use crate::feed::FeedSnapshot;
use crate::notification::Notification;
use crate::session::Session;

#[must_use]
pub fn render_notifications_page(
    session: &Session,
    snapshot: &FeedSnapshot<Notification>,
    threshold: f64,
) -> Markup {
    let content = html! {
        h1 { "Notifications" }
        (render_notification_list(snapshot, threshold, Utc::now()))
        (visibility_script())
    };
    BaseLayout::new("Notifications", Some(session)).render(content)
}
