//! Paginated, filterable feed cache shared by the home, profile and
//! notification views.
//!
//! - `model`: items and pages as decoded from the upstream service
//! - `fetcher`: the single-page fetch contract and its retry wrapper
//! - `classify`: client-side partitioning into tabbed subsets
//! - `controller`: cursor/status state machine accumulating pages
//! - `visibility`: sentinel-driven loading of the next page

pub mod classify;
pub mod controller;
pub mod fetcher;
pub mod model;
pub mod visibility;

pub use classify::{classify, ClassificationFilter};
pub use controller::{FeedController, FeedSnapshot, LoadOutcome, LoadStatus};
pub use fetcher::{FeedSource, PageFetcher, RetryingFetcher};
pub use model::{Author, Embed, FeedEntry, FeedItem, Page, Profile, Thread};
pub use visibility::{FeedView, Observation, TriggerDecision, VisibilityTrigger};
