//! The paginated item list shared by every feed view.
//!
//! The list carries its view key, sentinel and threshold as data attributes.
//! [`visibility_script`] watches the sentinel element and reports it to
//! `POST /feed/visible`, which answers with a fresh rendering of the list
//! when a page was loaded and with no content otherwise.

use maud::{html, Markup, PreEscaped, Render};

use super::alert::Alert;
use super::form::{Form, Input};
use crate::feed::{FeedSnapshot, LoadStatus};

const VISIBILITY_SCRIPT: &str = r#"(function() {
    var observer = null;
    function arm() {
        if (observer) { observer.disconnect(); observer = null; }
        var feed = document.getElementById('feed');
        if (!feed || feed.dataset.more !== 'true' || !feed.dataset.sentinel) return;
        if (!('IntersectionObserver' in window)) return;
        var sentinel = feed.dataset.sentinel;
        var el = feed.querySelector('[data-entry="' + CSS.escape(sentinel) + '"]');
        if (!el) return;
        var threshold = parseFloat(feed.dataset.threshold) || 0.5;
        observer = new IntersectionObserver(function(entries) {
            entries.forEach(function(entry) {
                if (!entry.isIntersecting || entry.intersectionRatio < threshold) return;
                observer.disconnect();
                var body = new URLSearchParams();
                body.set('view', feed.dataset.view);
                body.set('sentinel', sentinel);
                body.set('ratio', String(entry.intersectionRatio));
                fetch('/feed/visible', { method: 'POST', body: body, credentials: 'same-origin' })
                    .then(function(r) {
                        if (r.status === 401) { window.location.href = '/login'; return null; }
                        return r.status === 200 ? r.text() : null;
                    })
                    .then(function(html) { if (html) { feed.outerHTML = html; arm(); } })
                    .catch(function() {});
            });
        }, { threshold: [threshold] });
        observer.observe(el);
    }
    arm();
})();"#;

/// Script arming the sentinel observer. Render once per page, outside the list.
#[must_use]
pub fn visibility_script() -> Markup {
    html! { script { (PreEscaped(VISIBILITY_SCRIPT)) } }
}

/// A feed snapshot rendered as a list plus its status footer.
pub struct FeedList<'a, T, F> {
    view: &'a str,
    snapshot: &'a FeedSnapshot<T>,
    render_item: F,
    threshold: f64,
    empty_message: &'a str,
}

impl<'a, T, F> FeedList<'a, T, F>
where
    F: Fn(&T) -> Markup,
{
    #[must_use]
    pub fn new(view: &'a str, snapshot: &'a FeedSnapshot<T>, render_item: F) -> Self {
        Self {
            view,
            snapshot,
            render_item,
            threshold: crate::feed::visibility::DEFAULT_THRESHOLD,
            empty_message: "Nothing here yet.",
        }
    }

    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn empty_message(mut self, message: &'a str) -> Self {
        self.empty_message = message;
        self
    }

    fn load_more_form(&self, label: &str) -> Markup {
        let content = html! {
            (Input::hidden("view", self.view))
            button type="submit" { (label) }
        };
        Form::post("/feed/more", content).class("load-more").render()
    }

    fn render_status(&self) -> Markup {
        let snapshot = self.snapshot;
        html! {
            div class="feed-status" aria-live="polite" {
                @match snapshot.status {
                    LoadStatus::Fetching => { p { "Loading…" } }
                    LoadStatus::Error => {
                        (Alert::error(snapshot.error.as_deref().unwrap_or("Could not load the feed."))
                            .with_title("Could not load more:"))
                        (self.load_more_form("Retry"))
                    }
                    LoadStatus::Exhausted => {
                        @if snapshot.items.is_empty() {
                            p { (self.empty_message) }
                        } @else {
                            p { "You've reached the end." }
                        }
                    }
                    LoadStatus::Idle => {
                        @if snapshot.started && snapshot.items.is_empty() {
                            p { "No matching items loaded yet." }
                        }
                        (self.load_more_form("Load more"))
                    }
                }
            }
        }
    }
}

impl<T, F> Render for FeedList<'_, T, F>
where
    F: Fn(&T) -> Markup,
{
    fn render(&self) -> Markup {
        let snapshot = self.snapshot;
        let more = snapshot.has_next_page && snapshot.status == LoadStatus::Idle;
        html! {
            section
                id="feed"
                data-view=(self.view)
                data-sentinel=[snapshot.sentinel.as_deref()]
                data-generation=(snapshot.generation)
                data-threshold=(self.threshold)
                data-more=(more)
            {
                ul class="feed-items" {
                    @for item in &snapshot.items {
                        ((self.render_item)(item))
                    }
                }
                (self.render_status())
            }
        }
    }
}
