//! skyreader library.
//!
//! A lightweight web reader for a hosted microblogging service: paginated
//! home, profile and notification feeds with client-side classification
//! into tabs and scroll-driven loading of the next page.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod components;
pub mod config;
pub mod constants;
pub mod error;
pub mod feed;
pub mod notification;
pub mod richtext;
pub mod routing;
pub mod session;
pub mod web;
pub mod xrpc;
