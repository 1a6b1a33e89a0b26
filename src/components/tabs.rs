//! Tab navigation between related feed views.

use maud::{html, Markup, Render};

/// A single tab in a tab group.
#[derive(Debug, Clone)]
pub struct Tab {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

impl Tab {
    #[must_use]
    pub fn new(label: &'static str, href: impl Into<String>) -> Self {
        Self {
            label,
            href: href.into(),
            active: false,
        }
    }

    /// Mark the tab active when `active` holds.
    #[must_use]
    pub fn active_if(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Render for Tab {
    fn render(&self) -> Markup {
        let class = if self.active {
            "feed-tab active"
        } else {
            "feed-tab"
        };

        html! {
            a class=(class) href=(self.href) aria-current=[self.active.then_some("page")] {
                (self.label)
            }
        }
    }
}

/// A group of tabs for navigation.
#[derive(Debug, Clone, Default)]
pub struct TabGroup {
    pub tabs: Vec<Tab>,
    pub aria_label: Option<&'static str>,
}

impl TabGroup {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn push_tab(mut self, tab: Tab) -> Self {
        self.tabs.push(tab);
        self
    }

    #[must_use]
    pub fn with_aria_label(mut self, label: &'static str) -> Self {
        self.aria_label = Some(label);
        self
    }
}

impl Render for TabGroup {
    fn render(&self) -> Markup {
        html! {
            nav class="feed-tabs" aria-label=[self.aria_label] {
                @for tab in &self.tabs {
                    (tab)
                }
            }
        }
    }
}
