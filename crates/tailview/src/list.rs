#![forbid(unsafe_code)]

//! Dynamic-height virtualized list for streaming log data.
//!
//! [`VirtualLogList`] ties the pieces together: it reconciles each new item
//! sequence, keeps the height cache and position index in step with it,
//! drives the tail-follow state machine and produces the render window.
//!
//! Layout work is lazy. Item-set changes and height reports only set
//! [`Dirty`] flags; the position index is rebuilt the next time something
//! reads it ([`window`](VirtualLogList::window),
//! [`layout`](VirtualLogList::layout), a scroll event, a frame). Height
//! changes that arrive while the user is mid-scroll stay pending until the
//! gesture settles, so rows under the cursor do not jump.
//!
//! # Host loop
//!
//! ```
//! use tailview::{LogItem, SessionIds, IdSource, VirtualListConfig, VirtualLogList};
//!
//! let mut ids = SessionIds::with_session(1);
//! let mut list = VirtualLogList::new(VirtualListConfig::terminal(24));
//! let items: Vec<LogItem> = (0..3)
//!     .map(|n| LogItem::new(ids.next_id(), format!("line {n}")))
//!     .collect();
//!
//! list.sync(&items);
//! list.on_frame();
//! let layout = list.layout();
//! for row in &layout.rows {
//!     // paint, then report the measured height
//!     list.report_height(row.id, 1.0);
//! }
//! assert_eq!(layout.rows.len(), 3);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Instant;

use bitflags::bitflags;

use crate::config::VirtualListConfig;
use crate::height::{HeightCache, HeightUpdate};
use crate::item::{ItemId, Keyed};
use crate::position::PositionIndex;
use crate::reconcile::{ChangeKind, Reconciler, Reconciliation, ResetReason};
use crate::scroll::{FrameAction, ScrollController, ScrollTick, ViewportState};
use crate::viewport::visible_window;

bitflags! {
    /// Pending layout work.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Dirty: u8 {
        /// The item sequence changed.
        const ITEMS   = 0b01;
        /// A cached height changed.
        const HEIGHTS = 0b10;
    }
}

/// Imperative control surface handed to the embedding host.
pub trait ListController {
    /// Jump to the newest item and resume tail-following.
    fn scroll_to_bottom(&mut self);
    /// Discard cached measurements and layout, and start over at the top.
    fn reset(&mut self);
}

/// Item-click notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemClick {
    pub index: usize,
    pub id: ItemId,
}

/// One mounted row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRow {
    pub index: usize,
    pub id: ItemId,
    /// Top edge relative to the viewport (negative when partly scrolled off).
    pub top: f64,
    pub height: f64,
    /// First render pass that emitted this id.
    pub is_new: bool,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLayout {
    pub window: Option<RangeInclusive<usize>>,
    pub rows: Vec<VisibleRow>,
    pub scroll_top: f64,
    pub content_height: f64,
    pub viewport_height: f64,
}

impl ListLayout {
    /// Nothing to show; the host draws its "no data" affordance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Click callback type.
pub type ItemClickHandler = Box<dyn FnMut(ItemClick)>;

/// Virtualized list of dynamically sized log items.
pub struct VirtualLogList {
    config: VirtualListConfig,
    estimate: f64,
    heights: HeightCache,
    positions: PositionIndex,
    reconciler: Reconciler,
    scroll: ScrollController,
    index_of: HashMap<ItemId, usize>,
    dirty: Dirty,
    dirty_from: usize,
    pending_shift: f64,
    on_item_click: Option<ItemClickHandler>,
}

impl fmt::Debug for VirtualLogList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualLogList")
            .field("len", &self.len())
            .field("measured", &self.heights.len())
            .field("dirty", &self.dirty)
            .field("scroll", &self.scroll.state())
            .field("on_item_click", &self.on_item_click.is_some())
            .finish()
    }
}

impl Default for VirtualLogList {
    fn default() -> Self {
        Self::new(VirtualListConfig::default())
    }
}

impl VirtualLogList {
    #[must_use]
    pub fn new(config: VirtualListConfig) -> Self {
        let estimate = config.effective_estimate();
        let scroll = ScrollController::new(&config);
        Self {
            config,
            estimate,
            heights: HeightCache::new(),
            positions: PositionIndex::new(),
            reconciler: Reconciler::new(),
            scroll,
            index_of: HashMap::new(),
            dirty: Dirty::empty(),
            dirty_from: usize::MAX,
            pending_shift: 0.0,
            on_item_click: None,
        }
    }

    /// Set the item-click callback.
    #[must_use]
    pub fn with_on_item_click(mut self, handler: impl FnMut(ItemClick) + 'static) -> Self {
        self.on_item_click = Some(Box::new(handler));
        self
    }

    pub fn set_on_item_click(&mut self, handler: Option<ItemClickHandler>) {
        self.on_item_click = handler;
    }

    #[must_use]
    pub fn config(&self) -> &VirtualListConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reconciler.ids().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reconciler.ids().is_empty()
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        self.reconciler.ids()
    }

    /// Current index of `id`.
    #[must_use]
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    #[must_use]
    pub fn height_cache(&self) -> &HeightCache {
        &self.heights
    }

    #[must_use]
    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    #[must_use]
    pub fn scroll_state(&self) -> ViewportState {
        self.scroll.state()
    }

    #[must_use]
    pub fn scroll_top(&self) -> f64 {
        self.scroll.scroll_top()
    }

    #[must_use]
    pub fn auto_follow(&self) -> bool {
        self.scroll.auto_follow()
    }

    #[must_use]
    pub fn is_user_scrolling(&self) -> bool {
        self.scroll.is_user_scrolling()
    }

    /// Work scheduled for the next paint frame.
    #[must_use]
    pub fn pending_action(&self) -> Option<FrameAction> {
        self.scroll.pending_action()
    }

    /// Total content height, flushing pending layout work.
    pub fn content_height(&mut self) -> f64 {
        self.refresh();
        self.positions.total_height()
    }

    /// Position index as of the last flush.
    #[must_use]
    pub fn positions(&self) -> &PositionIndex {
        &self.positions
    }

    /// Adopt a new item sequence.
    pub fn sync<T: Keyed>(&mut self, items: &[T]) -> Reconciliation {
        self.sync_ids(items.iter().map(|item| item.key()))
    }

    /// Adopt a new id sequence.
    pub fn sync_ids(&mut self, ids: impl IntoIterator<Item = ItemId>) -> Reconciliation {
        let ids: Vec<ItemId> = ids.into_iter().collect();

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "virtual_list.sync",
            previous = self.len(),
            len = ids.len(),
        )
        .entered();

        let removed_height: f64 = match self.classify_front_drop(&ids) {
            Some(dropped) => self.reconciler.ids()[..dropped]
                .iter()
                .map(|id| self.heights.height_or(id, self.estimate))
                .sum(),
            None => 0.0,
        };

        let outcome = self.reconciler.reconcile(&ids, &self.config);
        match outcome.kind {
            ChangeKind::Unchanged => {}
            ChangeKind::Append { first_new } => {
                for (offset, id) in ids[first_new..].iter().enumerate() {
                    self.index_of.insert(*id, first_new + offset);
                }
                self.mark_dirty(Dirty::ITEMS, first_new);
                self.scroll.on_append();
            }
            ChangeKind::Patch { first_changed } => {
                self.prune(&outcome.removed);
                self.rebuild_index_map();
                self.mark_dirty(Dirty::ITEMS, first_changed);
                if outcome.appended() {
                    self.scroll.on_append();
                }
            }
            ChangeKind::SlidingWindow { dropped } => {
                self.prune(&outcome.removed);
                self.rebuild_index_map();
                self.mark_dirty(Dirty::ITEMS, 0);
                self.pending_shift -= removed_height;
                #[cfg(feature = "tracing")]
                tracing::debug!(dropped, removed_height, "virtual list front trimmed");
                if outcome.appended() {
                    self.scroll.on_append();
                }
            }
            ChangeKind::Reset(reason) => {
                self.full_reset(reason);
            }
        }
        outcome
    }

    /// Record the measured height of a painted item.
    pub fn report_height(&mut self, id: ItemId, height: f64) -> HeightUpdate {
        let Some(index) = self.index_of(&id) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(%id, "height report for unknown item ignored");
            return HeightUpdate::Rejected;
        };
        let update = self.heights.record(
            id,
            height,
            self.estimate,
            self.config.measurement_tolerance,
        );
        match update {
            HeightUpdate::Changed { .. } => self.mark_dirty(Dirty::HEIGHTS, index),
            HeightUpdate::Rejected => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%id, height, "rejected height measurement");
            }
            HeightUpdate::Unchanged => {}
        }
        update
    }

    /// User scroll event.
    pub fn on_scroll(&mut self, scroll_top: f64) -> f64 {
        self.on_scroll_at(scroll_top, Instant::now())
    }

    /// User scroll event at `now`. Returns the clamped position.
    pub fn on_scroll_at(&mut self, scroll_top: f64, now: Instant) -> f64 {
        let content = self.content_height();
        self.scroll.on_scroll_at(scroll_top, content, now)
    }

    pub fn scroll_by(&mut self, delta: f64) -> f64 {
        let content = self.content_height();
        self.scroll.scroll_by(delta, content)
    }

    pub fn page_up(&mut self) -> f64 {
        let content = self.content_height();
        self.scroll.page_up(content)
    }

    pub fn page_down(&mut self) -> f64 {
        let content = self.content_height();
        self.scroll.page_down(content)
    }

    pub fn scroll_to_top(&mut self) -> f64 {
        let content = self.content_height();
        self.scroll.scroll_to_top(content)
    }

    pub fn scroll_to_offset(&mut self, scroll_top: f64) -> f64 {
        let content = self.content_height();
        self.scroll.scroll_to_offset(scroll_top, content)
    }

    /// Bring item `index` to the top of the viewport and stop following.
    pub fn scroll_to_index(&mut self, index: usize) -> Option<f64> {
        self.refresh();
        let top = self.positions.offset(index)?;
        let content = self.positions.total_height();
        Some(self.scroll.jump_to(top, content))
    }

    /// Poll the settle timer.
    pub fn tick(&mut self) -> ScrollTick {
        self.tick_at(Instant::now())
    }

    /// Poll the settle timer at `now`; flushes deferred layout on settle.
    pub fn tick_at(&mut self, now: Instant) -> ScrollTick {
        let tick = self.scroll.tick_at(now);
        if tick == ScrollTick::Settled {
            #[cfg(feature = "tracing")]
            tracing::debug!(dirty = ?self.dirty, "scroll settled");
            self.refresh();
        }
        tick
    }

    /// Next-paint-frame callback. Returns the new scroll position if one
    /// was applied.
    pub fn on_frame(&mut self) -> Option<f64> {
        let content = self.content_height();
        self.scroll.on_frame(content)
    }

    /// Current render window.
    pub fn window(&mut self) -> Option<RangeInclusive<usize>> {
        self.refresh();
        visible_window(
            &self.positions,
            self.scroll.scroll_top(),
            self.scroll.viewport_height(),
            self.config.overscan_count,
        )
    }

    /// Render pass: the mounted rows with viewport-relative positions.
    pub fn layout(&mut self) -> ListLayout {
        let window = self.window();

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "virtual_list.layout",
            len = self.len(),
            start = window.as_ref().map(|w| *w.start()),
            end = window.as_ref().map(|w| *w.end()),
        )
        .entered();

        let scroll_top = self.scroll.scroll_top();
        let mut rows = Vec::new();
        if let Some(range) = window.clone() {
            rows.reserve(range.end() - range.start() + 1);
            for index in range {
                let id = self.reconciler.ids()[index];
                let (Some(top), Some(height)) =
                    (self.positions.offset(index), self.positions.height(index))
                else {
                    break;
                };
                rows.push(VisibleRow {
                    index,
                    id,
                    top: top - scroll_top,
                    height,
                    is_new: self.reconciler.mark_seen(id),
                });
            }
        }

        ListLayout {
            window,
            rows,
            scroll_top,
            content_height: self.positions.total_height(),
            viewport_height: self.scroll.viewport_height(),
        }
    }

    /// Resolve a click at `viewport_y` and notify the click handler.
    pub fn click_at(&mut self, viewport_y: f64) -> Option<ItemClick> {
        if !(viewport_y >= 0.0 && viewport_y < self.scroll.viewport_height()) {
            return None;
        }
        self.refresh();
        let index = self
            .positions
            .index_at(self.scroll.scroll_top() + viewport_y)?;
        let click = ItemClick {
            index,
            id: self.reconciler.ids()[index],
        };
        if let Some(handler) = self.on_item_click.as_mut() {
            handler(click);
        }
        Some(click)
    }

    /// Resize the viewport. A following view stays pinned to the bottom.
    pub fn set_viewport_height(&mut self, height: f64) {
        let content = self.content_height();
        let was_at_bottom = self.scroll.is_at_bottom(content);
        self.config.viewport_height = height;
        self.scroll.set_viewport_height(height);
        if !self.scroll.keep_pinned(was_at_bottom, content) {
            self.scroll.adjust_for_layout(0.0, content);
        }
    }

    /// Tear down: cancel timers and frame actions, drop all caches.
    pub fn unmount(&mut self) {
        self.scroll.reset();
        self.heights.clear();
        self.positions.clear();
        self.reconciler.clear();
        self.index_of.clear();
        self.dirty = Dirty::empty();
        self.dirty_from = usize::MAX;
        self.pending_shift = 0.0;
    }

    fn mark_dirty(&mut self, flag: Dirty, from: usize) {
        self.dirty |= flag;
        self.dirty_from = self.dirty_from.min(from);
    }

    /// Rebuild the position index if something changed. Height-only changes
    /// wait while the user is scrolling.
    fn refresh(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        if !self.dirty.contains(Dirty::ITEMS) && self.scroll.is_user_scrolling() {
            return;
        }

        let was_at_bottom = self.scroll.is_at_bottom(self.positions.total_height());
        let start = self.dirty_from;
        self.positions
            .recompute_from(start, self.reconciler.ids(), &self.heights, self.estimate);
        #[cfg(feature = "tracing")]
        tracing::trace!(
            dirty = ?self.dirty,
            start,
            generation = self.positions.generation(),
            "position index recomputed"
        );
        self.dirty = Dirty::empty();
        self.dirty_from = usize::MAX;

        let shift = std::mem::take(&mut self.pending_shift);
        let content = self.positions.total_height();
        self.scroll.adjust_for_layout(shift, content);
        // Rows growing under a pinned view push the tail out of sight.
        self.scroll.keep_pinned(was_at_bottom, content);
    }

    /// Number of items dropped from the front if `ids` is a sliding-window
    /// continuation of the current sequence.
    fn classify_front_drop(&self, ids: &[ItemId]) -> Option<usize> {
        if !self.config.preserve_on_front_trim {
            return None;
        }
        let first = ids.first()?;
        let dropped = self.index_of(first)?;
        (dropped > 0).then_some(dropped)
    }

    fn prune(&mut self, removed: &[ItemId]) {
        for id in removed {
            self.heights.remove(id);
        }
    }

    fn rebuild_index_map(&mut self) {
        self.index_of.clear();
        self.index_of.extend(
            self.reconciler
                .ids()
                .iter()
                .enumerate()
                .map(|(index, id)| (*id, index)),
        );
    }

    fn full_reset(&mut self, reason: ResetReason) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            reason = reason.as_str(),
            len = self.len(),
            measured = self.heights.len(),
            "virtual list reset"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = reason;

        self.heights.clear();
        self.positions.clear();
        self.reconciler.clear_seen();
        self.rebuild_index_map();
        self.scroll.reset();
        self.pending_shift = 0.0;
        self.dirty = Dirty::empty();
        self.dirty_from = usize::MAX;
        self.mark_dirty(Dirty::ITEMS, 0);
        if !self.is_empty() {
            self.scroll.on_append();
        }
    }
}

impl ListController for VirtualLogList {
    fn scroll_to_bottom(&mut self) {
        let content = self.content_height();
        self.scroll.force_scroll_to_bottom(content);
    }

    fn reset(&mut self) {
        self.full_reset(ResetReason::Requested);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn ids(range: std::ops::Range<u64>) -> Vec<ItemId> {
        range.map(|seq| ItemId::new(8, seq)).collect()
    }

    fn list() -> VirtualLogList {
        VirtualLogList::new(VirtualListConfig::default())
    }

    #[test]
    fn empty_list_has_empty_layout() {
        let mut list = list();
        let layout = list.layout();
        assert!(layout.is_empty());
        assert_eq!(layout.window, None);
        assert_eq!(layout.content_height, 0.0);
    }

    #[test]
    fn sync_marks_items_dirty_until_read() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        assert!(list.dirty().contains(Dirty::ITEMS));
        assert_eq!(list.content_height(), 280.0);
        assert!(list.dirty().is_empty());
    }

    #[test]
    fn layout_rows_are_viewport_relative() {
        let mut list = list();
        list.sync_ids(ids(0..100));
        list.on_scroll_at(70.0, Instant::now());
        let layout = list.layout();
        let first_visible = layout.rows.iter().find(|row| row.index == 2).unwrap();
        assert_eq!(first_visible.top, 56.0 - 70.0);
        assert_eq!(first_visible.height, 28.0);
        assert_eq!(layout.scroll_top, 70.0);
    }

    #[test]
    fn rows_are_new_only_once() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        assert!(list.layout().rows.iter().all(|row| row.is_new));
        assert!(list.layout().rows.iter().all(|row| !row.is_new));

        list.sync_ids(ids(0..11));
        let layout = list.layout();
        let fresh: Vec<_> = layout.rows.iter().filter(|row| row.is_new).collect();
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].index, 10);
    }

    #[test]
    fn height_reports_shift_following_rows() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.layout();
        assert!(list.report_height(ItemId::new(8, 2), 60.0).is_changed());
        assert!(list.dirty().contains(Dirty::HEIGHTS));
        assert_eq!(list.content_height(), 280.0 + 32.0);
        assert_eq!(list.positions().offset(3), Some(28.0 * 2.0 + 60.0));
    }

    #[test]
    fn height_report_for_unknown_id_is_rejected() {
        let mut list = list();
        list.sync_ids(ids(0..3));
        assert_eq!(
            list.report_height(ItemId::new(99, 0), 40.0),
            HeightUpdate::Rejected
        );
        assert!(list.height_cache().is_empty());
    }

    #[test]
    fn height_recompute_deferred_while_scrolling() {
        let base = Instant::now();
        let mut list = VirtualLogList::new(
            VirtualListConfig::default().with_settle_delay(Duration::from_millis(100)),
        );
        list.sync_ids(ids(0..100));
        list.on_frame();
        list.on_scroll_at(1_000.0, base);

        list.report_height(ItemId::new(8, 50), 100.0);
        list.window();
        assert!(list.dirty().contains(Dirty::HEIGHTS));
        assert_eq!(list.positions().total_height(), 2_800.0);

        assert_eq!(
            list.tick_at(base + Duration::from_millis(50)),
            ScrollTick::Scrolling
        );
        assert!(list.dirty().contains(Dirty::HEIGHTS));

        assert_eq!(
            list.tick_at(base + Duration::from_millis(100)),
            ScrollTick::Settled
        );
        assert!(list.dirty().is_empty());
        assert_eq!(list.positions().total_height(), 2_872.0);
    }

    #[test]
    fn cache_and_index_agree_after_near_estimate_reports() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.window();
        let id = ItemId::new(8, 3);
        for height in [28.9, 29.8, 28.4] {
            list.report_height(id, height);
            list.window();
            let indexed = list.positions().height(3).unwrap();
            let cached = list.height_cache().height_or(&id, 28.0);
            assert_eq!(indexed, cached);
        }
    }

    #[test]
    fn unchanged_sync_keeps_heights() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.report_height(ItemId::new(8, 1), 40.0);
        let out = list.sync_ids(ids(0..10));
        assert_eq!(out.kind, ChangeKind::Unchanged);
        assert_eq!(list.height_cache().len(), 1);
    }

    #[test]
    fn patch_prunes_removed_heights() {
        let mut list = list();
        list.sync_ids(ids(0..20));
        list.report_height(ItemId::new(8, 15), 40.0);
        list.report_height(ItemId::new(8, 3), 40.0);
        let kept: Vec<ItemId> = ids(0..20).into_iter().filter(|id| id.seq != 15).collect();
        let out = list.sync_ids(kept);
        assert_eq!(out.kind, ChangeKind::Patch { first_changed: 15 });
        assert_eq!(list.height_cache().get(&ItemId::new(8, 15)), None);
        assert_eq!(list.height_cache().get(&ItemId::new(8, 3)), Some(40.0));
        assert_eq!(list.index_of(&ItemId::new(8, 16)), Some(15));
    }

    #[test]
    fn sliding_window_compensates_scroll() {
        let mut list = VirtualLogList::new(
            VirtualListConfig::default().with_preserve_on_front_trim(true),
        );
        list.sync_ids(ids(0..100));
        list.on_frame();
        list.scroll_to_index(50);
        assert_eq!(list.scroll_top(), 1_400.0);

        let out = list.sync_ids(ids(5..100));
        assert_eq!(out.kind, ChangeKind::SlidingWindow { dropped: 5 });
        assert_eq!(list.window().map(|w| *w.start() <= 45), Some(true));
        assert_eq!(list.scroll_top(), 1_400.0 - 5.0 * 28.0);
        assert_eq!(list.index_of(&ItemId::new(8, 50)), Some(45));
    }

    #[test]
    fn full_reset_clears_state() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.report_height(ItemId::new(8, 0), 90.0);
        list.scroll_to_index(5);
        assert!(!list.auto_follow());

        let out = list.sync_ids(ids(100..110));
        assert!(out.kind.is_reset());
        assert!(list.height_cache().is_empty());
        assert_eq!(list.scroll_top(), 0.0);
        assert!(list.auto_follow());
        assert_eq!(list.pending_action(), Some(FrameAction::ScrollToBottom));
    }

    #[test]
    fn click_reports_item_under_cursor() {
        let clicks = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&clicks);
        let mut list = list().with_on_item_click(move |click| sink.borrow_mut().push(click));
        list.sync_ids(ids(0..100));
        list.on_scroll_at(280.0, Instant::now());

        let click = list.click_at(30.0).unwrap();
        assert_eq!(click.index, 11);
        assert_eq!(click.id, ItemId::new(8, 11));
        assert_eq!(clicks.borrow().as_slice(), &[click]);

        assert_eq!(list.click_at(-1.0), None);
        assert_eq!(list.click_at(400.0), None);
        assert_eq!(clicks.borrow().len(), 1);

        list.set_on_item_click(None);
        assert!(list.click_at(30.0).is_some());
        assert_eq!(clicks.borrow().len(), 1);
    }

    #[test]
    fn controller_scroll_to_bottom_resumes_follow() {
        let mut list = list();
        list.sync_ids(ids(0..100));
        list.on_frame();
        list.scroll_to_top();
        assert!(!list.auto_follow());

        ListController::scroll_to_bottom(&mut list);
        let state = list.scroll_state();
        assert!(state.auto_follow);
        assert!(!state.user_scrolling);
        assert_eq!(state.scroll_top, 2_400.0);
    }

    #[test]
    fn controller_reset_keeps_items() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.report_height(ItemId::new(8, 2), 50.0);
        ListController::reset(&mut list);
        assert_eq!(list.len(), 10);
        assert!(list.height_cache().is_empty());
        assert_eq!(list.content_height(), 280.0);
    }

    #[test]
    fn viewport_resize_keeps_tail_pinned() {
        let mut list = list();
        list.sync_ids(ids(0..100));
        list.on_frame();
        assert_eq!(list.scroll_top(), 2_400.0);

        list.set_viewport_height(200.0);
        assert_eq!(list.on_frame(), Some(2_600.0));
    }

    #[test]
    fn unmount_drops_everything() {
        let mut list = list();
        list.sync_ids(ids(0..10));
        list.report_height(ItemId::new(8, 2), 50.0);
        list.unmount();
        assert!(list.is_empty());
        assert!(list.height_cache().is_empty());
        assert_eq!(list.pending_action(), None);
        assert_eq!(list.window(), None);
    }
}
