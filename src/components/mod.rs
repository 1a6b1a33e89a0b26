//! Maud HTML template components for the web UI.
//!
//! - `layout`: Base page layout and navigation
//! - `alert`: Flash messages and inline errors
//! - `form`: Form builders, login form and composer
//! - `tabs`: Tab navigation between feed views
//! - `post`: Post cards, rich text and embeds
//! - `notification`: Notification rows
//! - `feed_list`: Paginated item list with its scroll sentinel
//!
//! # Example
//!
//! ```ignore
//! use maud::html;
//! use crate::components::{Alert, BaseLayout};
//!
//! let content = html! { (Alert::info("Welcome back")) };
//! let page = BaseLayout::new("Home", None).render(content);
//! ```

pub mod alert;
pub mod feed_list;
pub mod form;
pub mod layout;
pub mod notification;
pub mod post;
pub mod tabs;

pub use alert::{Alert, AlertVariant};
pub use feed_list::{visibility_script, FeedList};
pub use form::{ComposeForm, Form, Input, LoginForm};
pub use layout::BaseLayout;
pub use notification::NotificationRow;
pub use post::{relative_time, rich_text, PostCard};
pub use tabs::{Tab, TabGroup};

/// Re-export maud for convenience
pub use maud::{html, Markup, PreEscaped, DOCTYPE};
