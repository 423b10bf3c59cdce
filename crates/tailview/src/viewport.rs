#![forbid(unsafe_code)]

//! Render window calculation.
//!
//! Given a scroll position and viewport height, pick the contiguous range of
//! items that must be mounted: everything intersecting the viewport, padded
//! by `overscan` items on each side.
//!
//! The scroll position is clamped into `[0, total - viewport]` first, so a
//! stale position past the end (e.g. right after the list shrank) still
//! yields the tail window rather than nothing.

use std::ops::RangeInclusive;

use crate::position::PositionIndex;

/// Largest valid scroll position for the given content and viewport.
#[must_use]
pub fn max_scroll_top(content_height: f64, viewport_height: f64) -> f64 {
    (content_height - viewport_height).max(0.0)
}

/// Clamp a scroll position into the valid range. NaN maps to 0.
#[must_use]
pub fn clamp_scroll_top(scroll_top: f64, content_height: f64, viewport_height: f64) -> f64 {
    if scroll_top.is_nan() {
        return 0.0;
    }
    scroll_top.clamp(0.0, max_scroll_top(content_height, viewport_height))
}

/// Items strictly intersecting `[scroll_top, scroll_top + viewport_height)`,
/// without overscan. `None` for an empty index.
#[must_use]
pub fn intersecting(
    index: &PositionIndex,
    scroll_top: f64,
    viewport_height: f64,
) -> Option<RangeInclusive<usize>> {
    let len = index.len();
    let last = len.checked_sub(1)?;
    let viewport_height = if viewport_height.is_finite() {
        viewport_height.max(0.0)
    } else {
        0.0
    };
    let top = clamp_scroll_top(scroll_top, index.total_height(), viewport_height);

    let start = index.first_ending_after(top).min(last);
    let end = index
        .count_starting_before(top + viewport_height)
        .saturating_sub(1)
        .clamp(start, last);
    Some(start..=end)
}

/// Render window: the intersecting items padded by `overscan` on both sides.
#[must_use]
pub fn visible_window(
    index: &PositionIndex,
    scroll_top: f64,
    viewport_height: f64,
    overscan: usize,
) -> Option<RangeInclusive<usize>> {
    let raw = intersecting(index, scroll_top, viewport_height)?;
    let last = index.len() - 1;
    let start = raw.start().saturating_sub(overscan);
    let end = raw.end().saturating_add(overscan).min(last);
    Some(start..=end)
}
