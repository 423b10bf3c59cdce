#![forbid(unsafe_code)]

//! Scroll position and tail-follow state machine.
//!
//! The controller owns the [`ViewportState`] and decides when the view
//! should stay pinned to the newest item. Time is injected through the
//! `*_at` methods so the settle timer is deterministic under test.
//!
//! # Follow rules
//!
//! 1) A user scroll moving up by more than `scroll_up_threshold` turns
//!    follow off. This check wins over rule 2.
//! 2) A user scroll landing within `near_bottom_threshold` of the bottom
//!    turns follow back on.
//! 3) An append while following and not mid-scroll schedules
//!    [`FrameAction::ScrollToBottom`] for the next paint frame.
//! 4) A new scroll event cancels any pending frame action.
//! 5) An append refused because a gesture was in progress is remembered;
//!    when the gesture settles with follow still on, it is scheduled then.
//!    Settling without such an append leaves the position alone.
//!
//! The settle timer is a deadline, re-armed by every scroll event and
//! polled by [`ScrollController::tick_at`].

use std::time::{Duration, Instant};

use crate::config::{VirtualListConfig, sanitize_extent};
use crate::viewport::{clamp_scroll_top, max_scroll_top};

/// Snapshot of the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scroll_top: f64,
    pub viewport_height: f64,
    /// Keep the view pinned to the newest item.
    pub auto_follow: bool,
    /// A scroll gesture is in progress (settle deadline not yet reached).
    pub user_scrolling: bool,
    /// Scroll position seen by the previous scroll event.
    pub last_scroll_top: f64,
}

/// Work deferred to the next paint frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    ScrollToBottom,
}

/// Result of polling the settle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTick {
    /// No scroll gesture in progress.
    Idle,
    /// Still inside the settle window.
    Scrolling,
    /// The settle window elapsed on this tick.
    Settled,
}

/// Scroll state machine for one list instance.
#[derive(Debug, Clone)]
pub struct ScrollController {
    state: ViewportState,
    settle_delay: Duration,
    near_bottom_threshold: f64,
    scroll_up_threshold: f64,
    settle_deadline: Option<Instant>,
    pending: Option<FrameAction>,
    /// An append arrived mid-gesture while following.
    follow_deferred: bool,
}

impl ScrollController {
    #[must_use]
    pub fn new(config: &VirtualListConfig) -> Self {
        Self {
            state: ViewportState {
                scroll_top: 0.0,
                viewport_height: config.effective_viewport(),
                auto_follow: true,
                user_scrolling: false,
                last_scroll_top: 0.0,
            },
            settle_delay: config.settle_delay,
            near_bottom_threshold: sanitize_extent(config.near_bottom_threshold),
            scroll_up_threshold: sanitize_extent(config.scroll_up_threshold),
            settle_deadline: None,
            pending: None,
            follow_deferred: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> ViewportState {
        self.state
    }

    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.state.scroll_top
    }

    #[must_use]
    pub fn viewport_height(&self) -> f64 {
        self.state.viewport_height
    }

    #[must_use]
    pub fn auto_follow(&self) -> bool {
        self.state.auto_follow
    }

    #[must_use]
    pub fn is_user_scrolling(&self) -> bool {
        self.state.user_scrolling
    }

    /// Action waiting for the next frame, if any.
    #[must_use]
    pub fn pending_action(&self) -> Option<FrameAction> {
        self.pending
    }

    /// Time left until the current gesture settles.
    #[must_use]
    pub fn time_until_settle(&self, now: Instant) -> Option<Duration> {
        self.settle_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.state.viewport_height = sanitize_extent(height);
    }

    /// Handle a user scroll event.
    pub fn on_scroll(&mut self, scroll_top: f64, content_height: f64) -> f64 {
        self.on_scroll_at(scroll_top, content_height, Instant::now())
    }

    /// Handle a user scroll event at `now`. Returns the clamped position.
    pub fn on_scroll_at(&mut self, scroll_top: f64, content_height: f64, now: Instant) -> f64 {
        let viewport = self.state.viewport_height;
        let top = clamp_scroll_top(scroll_top, content_height, viewport);

        self.state.user_scrolling = true;
        self.settle_deadline = Some(now + self.settle_delay);
        self.pending = None;

        if top < self.state.last_scroll_top - self.scroll_up_threshold {
            self.state.auto_follow = false;
        } else if content_height - (top + viewport) <= self.near_bottom_threshold {
            self.state.auto_follow = true;
        }

        self.state.last_scroll_top = top;
        self.state.scroll_top = top;
        top
    }

    /// Poll the settle timer.
    pub fn tick(&mut self) -> ScrollTick {
        self.tick_at(Instant::now())
    }

    /// Poll the settle timer at `now`. On settle, a deferred append is
    /// scheduled if follow is still on.
    pub fn tick_at(&mut self, now: Instant) -> ScrollTick {
        match self.settle_deadline {
            Some(deadline) if now >= deadline => {
                self.settle_deadline = None;
                self.state.user_scrolling = false;
                if std::mem::take(&mut self.follow_deferred) {
                    self.on_append();
                }
                ScrollTick::Settled
            }
            Some(_) => ScrollTick::Scrolling,
            None => ScrollTick::Idle,
        }
    }

    /// New items arrived. Returns whether a scroll-to-bottom was scheduled.
    pub fn on_append(&mut self) -> bool {
        if !self.state.auto_follow {
            return false;
        }
        if self.state.user_scrolling {
            self.follow_deferred = true;
            return false;
        }
        self.pending = Some(FrameAction::ScrollToBottom);
        true
    }

    /// Whether an append is waiting for the current gesture to settle.
    #[must_use]
    pub fn is_follow_deferred(&self) -> bool {
        self.follow_deferred
    }

    /// Whether the view sits at the bottom of `content_height`.
    #[must_use]
    pub fn is_at_bottom(&self, content_height: f64) -> bool {
        self.state.scroll_top
            >= max_scroll_top(content_height, self.state.viewport_height) - f64::EPSILON
    }

    /// Keep a view that was at the bottom there after the layout changed
    /// under it (rows grew, the viewport shrank). Returns whether a
    /// scroll-to-bottom was scheduled.
    pub fn keep_pinned(&mut self, was_at_bottom: bool, content_height: f64) -> bool {
        if !(was_at_bottom
            && self.state.auto_follow
            && !self.state.user_scrolling
            && !self.is_at_bottom(content_height))
        {
            return false;
        }
        self.pending = Some(FrameAction::ScrollToBottom);
        true
    }

    /// Apply the pending frame action. Returns the new scroll position.
    pub fn on_frame(&mut self, content_height: f64) -> Option<f64> {
        match self.pending.take()? {
            FrameAction::ScrollToBottom => Some(self.pin_to_bottom(content_height)),
        }
    }

    /// Jump to the bottom now and resume following.
    pub fn force_scroll_to_bottom(&mut self, content_height: f64) -> f64 {
        self.settle_deadline = None;
        self.pending = None;
        self.follow_deferred = false;
        self.state.user_scrolling = false;
        self.state.auto_follow = true;
        self.pin_to_bottom(content_height)
    }

    /// Programmatic jump that leaves tail-follow mode.
    pub fn jump_to(&mut self, scroll_top: f64, content_height: f64) -> f64 {
        let top = clamp_scroll_top(scroll_top, content_height, self.state.viewport_height);
        self.pending = None;
        self.follow_deferred = false;
        self.state.auto_follow = false;
        self.state.scroll_top = top;
        self.state.last_scroll_top = top;
        top
    }

    /// Shift the position after content above it moved (front eviction,
    /// shrink). Not treated as a user scroll.
    pub fn adjust_for_layout(&mut self, delta: f64, content_height: f64) {
        let viewport = self.state.viewport_height;
        let top = clamp_scroll_top(self.state.scroll_top + delta, content_height, viewport);
        self.state.scroll_top = top;
        self.state.last_scroll_top = top;
    }

    pub fn scroll_by(&mut self, delta: f64, content_height: f64) -> f64 {
        self.on_scroll(self.state.scroll_top + delta, content_height)
    }

    pub fn page_up(&mut self, content_height: f64) -> f64 {
        self.scroll_by(-self.state.viewport_height, content_height)
    }

    pub fn page_down(&mut self, content_height: f64) -> f64 {
        self.scroll_by(self.state.viewport_height, content_height)
    }

    pub fn scroll_to_top(&mut self, content_height: f64) -> f64 {
        self.on_scroll(0.0, content_height)
    }

    pub fn scroll_to_offset(&mut self, scroll_top: f64, content_height: f64) -> f64 {
        self.on_scroll(scroll_top, content_height)
    }

    /// Drop the settle deadline and any pending frame action.
    pub fn cancel(&mut self) {
        self.settle_deadline = None;
        self.pending = None;
        self.follow_deferred = false;
        self.state.user_scrolling = false;
    }

    /// Back to the mounted state: top of an empty list, following.
    pub fn reset(&mut self) {
        self.cancel();
        self.state.scroll_top = 0.0;
        self.state.last_scroll_top = 0.0;
        self.state.auto_follow = true;
    }

    fn pin_to_bottom(&mut self, content_height: f64) -> f64 {
        let top = max_scroll_top(content_height, self.state.viewport_height);
        self.state.scroll_top = top;
        self.state.last_scroll_top = top;
        top
    }
}
