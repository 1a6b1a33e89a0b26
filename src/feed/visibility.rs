//! Scroll-driven loading: fire `load_more` when the sentinel item becomes visible.
//!
//! The trigger watches exactly one sentinel (the last rendered item). It fires
//! at most once per sentinel; after a page is merged the trigger is armed
//! again, on the new last item or, when a filtered page added nothing
//! visible, on the same one.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::controller::{FeedController, FeedSnapshot, LoadOutcome};
use super::model::FeedEntry;

/// Default fraction of the sentinel that must be visible.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A visibility report for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub sentinel: String,
    /// Visible fraction of the element, in `0.0..=1.0`.
    pub ratio: f64,
}

/// Why a report did or did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    Fire,
    /// The report is for an element that is no longer the sentinel.
    NotObserved,
    BelowThreshold,
    AlreadyFired,
    Fetching,
    NoMorePages,
}

#[derive(Debug)]
pub struct VisibilityTrigger {
    threshold: f64,
    target: Option<String>,
    fired: bool,
}

impl VisibilityTrigger {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            target: None,
            fired: false,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Register interest in `sentinel`, replacing the previous target.
    ///
    /// Returns whether the target changed. Re-observing the current target
    /// keeps its fired state.
    pub fn observe(&mut self, sentinel: Option<&str>) -> bool {
        if self.target.as_deref() == sentinel {
            return false;
        }
        self.target = sentinel.map(ToString::to_string);
        self.fired = false;
        true
    }

    /// Allow the current target to fire again.
    pub fn rearm(&mut self) {
        self.fired = false;
    }

    /// Forget the current target.
    pub fn disconnect(&mut self) {
        self.target = None;
        self.fired = false;
    }

    /// Decide whether `observation` should trigger a page load, and arm the
    /// once-per-sentinel guard when it does.
    pub fn decide(
        &mut self,
        observation: &Observation,
        has_next_page: bool,
        is_fetching: bool,
    ) -> TriggerDecision {
        let decision = if self.target.as_deref() != Some(observation.sentinel.as_str()) {
            TriggerDecision::NotObserved
        } else if observation.ratio < self.threshold {
            TriggerDecision::BelowThreshold
        } else if is_fetching {
            TriggerDecision::Fetching
        } else if !has_next_page {
            TriggerDecision::NoMorePages
        } else if self.fired {
            TriggerDecision::AlreadyFired
        } else {
            TriggerDecision::Fire
        };
        if decision == TriggerDecision::Fire {
            self.fired = true;
        }
        decision
    }
}

impl Default for VisibilityTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// A feed controller paired with the trigger watching its sentinel.
pub struct FeedView<T> {
    controller: FeedController<T>,
    trigger: Mutex<VisibilityTrigger>,
}

impl<T: FeedEntry> FeedView<T> {
    #[must_use]
    pub fn new(controller: FeedController<T>, threshold: f64) -> Self {
        Self {
            controller,
            trigger: Mutex::new(VisibilityTrigger::new(threshold)),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &FeedController<T> {
        &self.controller
    }

    /// Snapshot the feed and point the trigger at its current sentinel.
    #[must_use]
    pub fn render_snapshot(&self) -> FeedSnapshot<T> {
        let snapshot = self.controller.snapshot();
        self.observe(snapshot.sentinel.as_deref());
        snapshot
    }

    /// Start over when the last merged page is older than `ttl`.
    ///
    /// Returns whether the feed was reset.
    pub fn reset_if_stale(&self, ttl: Duration) -> bool {
        if !self.controller.is_stale(ttl) {
            return false;
        }
        self.controller.reset();
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .disconnect();
        true
    }

    fn observe(&self, sentinel: Option<&str>) {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(sentinel);
    }

    /// Handle a visibility report, loading the next page when it fires.
    ///
    /// Returns `None` when the report did not fire.
    pub async fn on_visible(&self, observation: &Observation) -> Option<LoadOutcome> {
        let decision = {
            let snapshot = self.controller.snapshot();
            let mut trigger = self.trigger.lock().unwrap_or_else(PoisonError::into_inner);
            trigger.observe(snapshot.sentinel.as_deref());
            trigger.decide(observation, snapshot.has_next_page, snapshot.is_fetching())
        };
        if decision != TriggerDecision::Fire {
            debug!(sentinel = %observation.sentinel, ?decision, "Visibility report ignored");
            return None;
        }
        let outcome = self.controller.load_more().await;
        let sentinel = self.controller.snapshot().sentinel;
        let mut trigger = self.trigger.lock().unwrap_or_else(PoisonError::into_inner);
        // A page can merge without moving the sentinel when none of its items
        // pass the filter; the sentinel is still on screen and must fire again.
        if !trigger.observe(sentinel.as_deref()) && matches!(outcome, LoadOutcome::Loaded { .. }) {
            trigger.rearm();
        }
        Some(outcome)
    }
}
