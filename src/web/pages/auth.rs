//! Login page.

use maud::{html, Markup, Render};

use crate::components::{Alert, BaseLayout, LoginForm};

/// Render the login page.
///
/// # Example
///
/// ```ignore
/// // Fresh login page
/// let page = render_login_page(None, None);
///
/// // After a rejected attempt
/// let page = render_login_page(
///     Some(Alert::error("Invalid identifier or password")),
///     Some("alice.test"),
/// );
/// ```
#[must_use]
pub fn render_login_page(alert: Option<Alert<'_>>, identifier: Option<&str>) -> Markup {
    let content = html! {
        div class="auth-container" {
            h1 { "Log in" }
            p { "Use your handle and an app password." }
            @if let Some(alert) = alert {
                (alert)
            }
            (LoginForm { identifier }.render())
        }
    };
    BaseLayout::new("Login", None).render(content)
}
