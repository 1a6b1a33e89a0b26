//! Registry of the live feed views.
//!
//! Each UI view (a home tab, a profile, the notification list) owns one
//! [`FeedView`] that survives across requests, so scrolling accumulates
//! pages instead of starting over. Views are keyed by a short string that
//! the page embeds and the browser posts back with visibility reports.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::feed::{
    ClassificationFilter, FeedController, FeedItem, FeedSource, FeedView, PageFetcher,
};
use crate::notification::Notification;

/// Tabs of the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HomeTab {
    /// Original posts from the "posts" generator.
    #[default]
    Posts,
    /// Everything from the "everything" generator.
    Everything,
    /// The "everything" generator, keeping only items with media.
    Media,
}

impl HomeTab {
    pub const ALL: [Self; 3] = [Self::Posts, Self::Everything, Self::Media];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Everything => "everything",
            Self::Media => "media",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Posts => "Posts",
            Self::Everything => "Everything",
            Self::Media => "Media",
        }
    }

    const fn filter(self) -> ClassificationFilter {
        match self {
            Self::Posts | Self::Everything => ClassificationFilter::All,
            Self::Media => ClassificationFilter::MediaOnly,
        }
    }
}

impl FromStr for HomeTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posts" => Ok(Self::Posts),
            "everything" => Ok(Self::Everything),
            "media" => Ok(Self::Media),
            _ => Err(format!("unknown home feed '{s}'")),
        }
    }
}

/// Identifies one view in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Home(HomeTab),
    Profile(String),
    Notifications,
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home(tab) => write!(f, "home:{}", tab.as_str()),
            Self::Profile(actor) => write!(f, "profile:{actor}"),
            Self::Notifications => f.write_str("notifications"),
        }
    }
}

impl FromStr for ViewKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "notifications" {
            return Ok(Self::Notifications);
        }
        if let Some(tab) = s.strip_prefix("home:") {
            return tab.parse().map(Self::Home);
        }
        match s.strip_prefix("profile:") {
            Some(actor) if crate::routing::is_valid_actor(actor) => {
                Ok(Self::Profile(actor.to_string()))
            }
            _ => Err(format!("unknown view '{s}'")),
        }
    }
}

impl ViewKey {
    /// Page the view is rendered on.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home(tab) => format!("/?feed={}", tab.as_str()),
            Self::Profile(actor) => crate::routing::profile_path(actor),
            Self::Notifications => "/notifications".to_string(),
        }
    }
}

/// A registered view of either item type.
#[derive(Clone)]
pub enum AnyView {
    Posts(Arc<FeedView<FeedItem>>),
    Notifications(Arc<FeedView<Notification>>),
}

struct Slot<V> {
    view: Arc<V>,
    used_at: Instant,
}

impl<V> Slot<V> {
    fn new(view: Arc<V>) -> Self {
        Self {
            view,
            used_at: Instant::now(),
        }
    }

    fn touch(&mut self) -> Arc<V> {
        self.used_at = Instant::now();
        Arc::clone(&self.view)
    }

    fn is_idle(&self, ttl: Duration) -> bool {
        self.used_at.elapsed() >= ttl
    }
}

#[derive(Default)]
struct Views {
    posts: HashMap<ViewKey, Slot<FeedView<FeedItem>>>,
    notifications: Option<Slot<FeedView<Notification>>>,
}

impl Views {
    fn evict_idle(&mut self, ttl: Duration) {
        self.posts.retain(|key, slot| {
            let idle = slot.is_idle(ttl);
            if idle {
                debug!(view = %key, "Evicted idle view");
            }
            !idle
        });
        if self.notifications.as_ref().is_some_and(|slot| slot.is_idle(ttl)) {
            self.notifications = None;
            debug!(view = %ViewKey::Notifications, "Evicted idle view");
        }
    }
}

/// Creates views on first use and hands out shared references.
#[derive(Clone)]
pub struct ViewRegistry {
    views: Arc<Mutex<Views>>,
    posts_fetcher: Arc<dyn PageFetcher<FeedItem>>,
    notifications_fetcher: Arc<dyn PageFetcher<Notification>>,
    page_limit: u32,
    threshold: f64,
    idle_ttl: Duration,
    posts_feed_uri: String,
    everything_feed_uri: String,
}

impl ViewRegistry {
    #[must_use]
    pub fn new(
        config: &Config,
        posts_fetcher: Arc<dyn PageFetcher<FeedItem>>,
        notifications_fetcher: Arc<dyn PageFetcher<Notification>>,
    ) -> Self {
        Self {
            views: Arc::new(Mutex::new(Views::default())),
            posts_fetcher,
            notifications_fetcher,
            page_limit: config.page_limit,
            threshold: config.visibility_threshold,
            idle_ttl: config.view_idle_ttl,
            posts_feed_uri: config.posts_feed_uri.clone(),
            everything_feed_uri: config.everything_feed_uri.clone(),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn lock(&self) -> MutexGuard<'_, Views> {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        views.evict_idle(self.idle_ttl);
        views
    }

    fn new_post_view(&self, source: FeedSource, filter: ClassificationFilter) -> FeedView<FeedItem> {
        let controller = FeedController::new(
            source,
            Arc::clone(&self.posts_fetcher),
            self.page_limit,
            filter,
        );
        FeedView::new(controller, self.threshold)
    }

    /// The view behind a home tab.
    #[must_use]
    pub fn home(&self, tab: HomeTab) -> Arc<FeedView<FeedItem>> {
        let key = ViewKey::Home(tab);
        let mut views = self.lock();
        if let Some(slot) = views.posts.get_mut(&key) {
            return slot.touch();
        }
        let feed_uri = match tab {
            HomeTab::Posts => self.posts_feed_uri.clone(),
            HomeTab::Everything | HomeTab::Media => self.everything_feed_uri.clone(),
        };
        let view = Arc::new(self.new_post_view(FeedSource::HomeFeed { feed_uri }, tab.filter()));
        debug!(view = %key, "Created view");
        views.posts.insert(key, Slot::new(Arc::clone(&view)));
        view
    }

    /// The view of `actor`'s posts, switched to `filter` when one is given.
    ///
    /// Switching the filter of an existing view resets it. New views start
    /// on original posts.
    #[must_use]
    pub fn profile(
        &self,
        actor: &str,
        filter: Option<ClassificationFilter>,
    ) -> Arc<FeedView<FeedItem>> {
        let key = ViewKey::Profile(actor.to_string());
        let view = {
            let mut views = self.lock();
            if let Some(slot) = views.posts.get_mut(&key) {
                slot.touch()
            } else {
                let source = FeedSource::Author {
                    actor: actor.to_string(),
                };
                let initial = filter.unwrap_or(ClassificationFilter::OriginalOnly);
                let view = Arc::new(self.new_post_view(source, initial));
                debug!(view = %key, "Created view");
                views.posts.insert(key, Slot::new(Arc::clone(&view)));
                view
            }
        };
        if let Some(filter) = filter {
            view.controller().set_filter(filter);
        }
        view
    }

    #[must_use]
    pub fn notifications(&self) -> Arc<FeedView<Notification>> {
        let mut views = self.lock();
        let slot = views.notifications.get_or_insert_with(|| {
            let controller = FeedController::new(
                FeedSource::Notifications,
                Arc::clone(&self.notifications_fetcher),
                self.page_limit,
                ClassificationFilter::All,
            );
            debug!(view = %ViewKey::Notifications, "Created view");
            Slot::new(Arc::new(FeedView::new(controller, self.threshold)))
        });
        slot.touch()
    }

    /// An already registered view. Visibility reports for views that were
    /// never rendered are ignored.
    #[must_use]
    pub fn get(&self, key: &ViewKey) -> Option<AnyView> {
        let mut views = self.lock();
        match key {
            ViewKey::Notifications => views
                .notifications
                .as_mut()
                .map(|slot| AnyView::Notifications(slot.touch())),
            ViewKey::Home(_) | ViewKey::Profile(_) => views
                .posts
                .get_mut(key)
                .map(|slot| AnyView::Posts(slot.touch())),
        }
    }

    /// Number of live views.
    #[must_use]
    pub fn len(&self) -> usize {
        let views = self.lock();
        views.posts.len() + usize::from(views.notifications.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reset every home tab, e.g. after the viewer published a post.
    pub fn reset_home(&self) {
        let views = self.lock();
        for (key, slot) in &views.posts {
            if matches!(key, ViewKey::Home(_)) {
                slot.view.controller().reset();
            }
        }
    }

    /// Drop all views, e.g. when the account changes.
    pub fn clear(&self) {
        let mut views = self.lock();
        views.posts.clear();
        views.notifications = None;
        debug!("Cleared all views");
    }
}
