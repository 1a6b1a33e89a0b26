//! Profile page: account header and the Posts / Replies / Media tabs.

use chrono::Utc;
use maud::{html, Markup, Render};

use super::feed::render_post_list;
use crate::components::{visibility_script, BaseLayout, Tab, TabGroup};
use crate::feed::{ClassificationFilter, FeedItem, FeedSnapshot, Profile};
use crate::routing::profile_path;
use crate::session::Session;
use crate::web::views::ViewKey;

/// Filters offered as profile tabs, in display order.
pub const PROFILE_TABS: [(ClassificationFilter, &str); 3] = [
    (ClassificationFilter::OriginalOnly, "Posts"),
    (ClassificationFilter::RepliesOnly, "Replies"),
    (ClassificationFilter::MediaOnly, "Media"),
];

#[derive(Debug)]
pub struct ProfilePageParams<'a> {
    pub session: &'a Session,
    /// The actor as it appears in the URL.
    pub actor: &'a str,
    pub profile: &'a Profile,
    pub snapshot: &'a FeedSnapshot<FeedItem>,
    pub threshold: f64,
}

fn render_header(profile: &Profile) -> Markup {
    let author = &profile.author;
    html! {
        header class="profile-header" {
            @if let Some(banner) = &profile.banner {
                img class="profile-banner" src=(banner) alt="";
            }
            @if let Some(avatar) = &author.avatar {
                img class="avatar" src=(avatar) alt="" width="80" height="80";
            }
            h1 { (author.name()) }
            p class="post-meta" { "@" (author.handle) }
            @if let Some(description) = &profile.description {
                p class="profile-description" { (description) }
            }
            p class="post-meta" {
                strong { (profile.followers_count) } " followers · "
                strong { (profile.follows_count) } " following · "
                strong { (profile.posts_count) } " posts"
            }
        }
    }
}

fn profile_tabs(actor: &str, active: ClassificationFilter) -> TabGroup {
    let base = profile_path(actor);
    PROFILE_TABS
        .into_iter()
        .fold(TabGroup::new().with_aria_label("Profile feeds"), |group, (filter, label)| {
            group.push_tab(
                Tab::new(label, format!("{base}?filter={filter}")).active_if(filter == active),
            )
        })
}

#[must_use]
pub fn render_profile_page(params: &ProfilePageParams<'_>) -> Markup {
    let key = ViewKey::Profile(params.actor.to_string());
    let content = html! {
        (render_header(params.profile))
        (profile_tabs(params.actor, params.snapshot.filter).render())
        (render_post_list(&key, params.snapshot, params.threshold, Utc::now()))
        (visibility_script())
    };
    BaseLayout::new(params.profile.author.name(), Some(params.session)).render(content)
}
