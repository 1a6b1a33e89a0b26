//! Home page: composer plus the Posts / Everything / Media tabs.

use chrono::Utc;
use maud::{html, Markup, Render};

use super::feed::render_post_list;
use crate::components::{visibility_script, Alert, BaseLayout, ComposeForm, Tab, TabGroup};
use crate::feed::{FeedItem, FeedSnapshot};
use crate::session::Session;
use crate::web::views::{HomeTab, ViewKey};

/// Parameters for rendering the home page.
#[derive(Debug)]
pub struct HomePageParams<'a> {
    pub session: &'a Session,
    pub tab: HomeTab,
    pub snapshot: &'a FeedSnapshot<FeedItem>,
    pub threshold: f64,
    /// Flash message shown above the composer.
    pub notice: Option<&'a str>,
    /// Composer error and the rejected text.
    pub compose_error: Option<(&'a str, &'a str)>,
}

fn home_tabs(active: HomeTab) -> TabGroup {
    HomeTab::ALL
        .into_iter()
        .fold(TabGroup::new().with_aria_label("Feeds"), |group, tab| {
            group.push_tab(
                Tab::new(tab.label(), format!("/?feed={}", tab.as_str())).active_if(tab == active),
            )
        })
}

#[must_use]
pub fn render_home_page(params: &HomePageParams<'_>) -> Markup {
    let key = ViewKey::Home(params.tab);
    let content = html! {
        @if let Some(notice) = params.notice {
            (Alert::success(notice))
        }
        @if let Some((error, _)) = params.compose_error {
            (Alert::error(error))
        }
        (ComposeForm { text: params.compose_error.map(|(_, text)| text) })
        (home_tabs(params.tab).render())
        (render_post_list(&key, params.snapshot, params.threshold, Utc::now()))
        (visibility_script())
    };
    BaseLayout::new(params.tab.label(), Some(params.session)).render(content)
}
