//! Maud-based page templates for the web UI.
//!
//! Each page module exports a render function that produces the complete HTML.

pub mod auth;
pub mod feed;
pub mod home;
pub mod notifications;
pub mod profile;
pub mod thread;

pub use auth::render_login_page;
pub use feed::{render_notification_list, render_post_list};
pub use home::{render_home_page, HomePageParams};
pub use notifications::render_notifications_page;
pub use profile::{render_profile_page, ProfilePageParams};
pub use thread::render_thread_page;
