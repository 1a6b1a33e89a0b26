//! Base layout components for the web UI.
//!
//! This module provides the page skeleton: head, navigation for the
//! logged-in account, and the main column.

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::routing::profile_path;
use crate::session::Session;

/// Critical theme initialization script that runs in <head> to prevent flash of wrong theme.
const THEME_INIT_SCRIPT: &str = r#"(function() {
    var theme = localStorage.getItem('theme');
    if (theme) {
        document.documentElement.setAttribute('data-theme', theme);
    } else if (window.matchMedia('(prefers-color-scheme: dark)').matches) {
        document.documentElement.setAttribute('data-theme', 'dark');
    }
})();"#;

const BASE_STYLE: &str = r"
body { max-width: 640px; margin: 0 auto; font-family: system-ui, sans-serif; }
.feed-tabs { display: flex; gap: 1.5rem; justify-content: center; border-bottom: 1px solid #8884; }
.feed-tab { padding: .75rem 0; text-decoration: none; color: inherit; opacity: .6; }
.feed-tab.active { opacity: 1; border-bottom: 1px solid currentColor; }
.post-card, .notification-row { padding: 1rem 1.5rem; border-bottom: 1px solid #8884; list-style: none; }
.post-meta, .notification-meta { font-size: .875rem; opacity: .7; }
.post-images img { max-width: 100%; border-radius: .5rem; }
.feed-status { padding: 1rem; text-align: center; }
";

/// Page layout builder.
///
/// # Example
///
/// ```ignore
/// use maud::html;
/// use crate::components::layout::BaseLayout;
///
/// let content = html! { h1 { "Hello" } };
/// let page = BaseLayout::new("Home", session.as_ref()).render(content);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLayout<'a> {
    title: &'a str,
    session: Option<&'a Session>,
}

impl<'a> BaseLayout<'a> {
    /// Create a layout for the given viewer. Pass `None` when logged out.
    #[must_use]
    pub fn new(title: &'a str, session: Option<&'a Session>) -> Self {
        Self { title, session }
    }

    /// Render the complete HTML page with the given content.
    #[must_use]
    pub fn render(self, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" data-theme="light" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    meta name="color-scheme" content="light dark";
                    title { (self.title) " - skyreader" }
                    style { (PreEscaped(BASE_STYLE)) }
                    script { (PreEscaped(THEME_INIT_SCRIPT)) }
                }
                body {
                    (self.render_header())
                    main {
                        (content)
                    }
                }
            }
        }
    }

    fn render_header(&self) -> Markup {
        html! {
            header {
                nav {
                    ul {
                        li { a href="/" { strong { "skyreader" } } }
                    }
                    ul {
                        @if let Some(session) = self.session {
                            li { a href="/" { "Home" } }
                            li { a href="/notifications" { "Notifications" } }
                            li { a href=(profile_path(&session.handle)) { "Profile" } }
                            li {
                                form action="/logout" method="post" {
                                    button type="submit" { "Log out" }
                                }
                            }
                        } @else {
                            li { a href="/login" { "Log in" } }
                        }
                    }
                }
            }
        }
    }
}
