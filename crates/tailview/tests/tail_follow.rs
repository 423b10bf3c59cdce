#![forbid(unsafe_code)]

//! End-to-end behavior of the virtual log list: tail following, manual
//! scroll override, reset policy and render-window correctness.

use std::time::{Duration, Instant};

use tailview::{
    ChangeKind, FrameAction, ItemId, ListController, ResetReason, RowMeasurer, ScrollTick,
    SessionIds, TailBuffer, VirtualListConfig, VirtualLogList, WrapMode,
};

fn ids(range: std::ops::Range<u64>) -> Vec<ItemId> {
    range.map(|seq| ItemId::new(42, seq)).collect()
}

fn config() -> VirtualListConfig {
    VirtualListConfig::default()
        .with_viewport_height(400.0)
        .with_estimated_item_height(28.0)
        .with_overscan(3)
        .with_settle_delay(Duration::from_millis(150))
}

/// A list of `n` items pinned to the tail.
fn pinned(n: u64) -> VirtualLogList {
    let mut list = VirtualLogList::new(config());
    list.sync_ids(ids(0..n));
    list.on_frame();
    list
}

#[test]
fn single_append_to_empty_list_follows() {
    let mut list = VirtualLogList::new(config());
    assert!(list.auto_follow());

    let out = list.sync_ids(ids(0..1));
    assert_eq!(out.kind, ChangeKind::Reset(ResetReason::FromEmpty));
    assert_eq!(list.window(), Some(0..=0));
    assert_eq!(list.pending_action(), Some(FrameAction::ScrollToBottom));
    assert_eq!(list.on_frame(), Some(0.0));
}

#[test]
fn thousand_items_mid_scroll_window() {
    let mut list = VirtualLogList::new(config());
    list.sync_ids(ids(0..1_000));
    list.on_scroll_at(5_600.0, Instant::now());

    let window = list.window().unwrap();
    assert!(*window.start() <= 197, "start {}", window.start());
    assert!(*window.end() >= 217, "end {}", window.end());

    let layout = list.layout();
    assert_eq!(layout.rows.len(), window.end() - window.start() + 1);
    assert_eq!(layout.rows.first().map(|row| row.index), Some(*window.start()));
}

#[test]
fn append_keeps_view_pinned_to_bottom() {
    let mut list = pinned(100);
    assert_eq!(list.scroll_top(), 100.0 * 28.0 - 400.0);

    let out = list.sync_ids(ids(0..101));
    assert_eq!(out.kind, ChangeKind::Append { first_new: 100 });
    assert_eq!(list.pending_action(), Some(FrameAction::ScrollToBottom));

    let top = list.on_frame().unwrap();
    assert_eq!(top, list.content_height() - 400.0);
    assert_eq!(top, 101.0 * 28.0 - 400.0);
}

#[test]
fn append_after_measurement_stays_pinned() {
    let mut list = pinned(100);
    list.report_height(ItemId::new(42, 99), 84.0);
    list.on_frame();

    list.sync_ids(ids(0..102));
    list.report_height(ItemId::new(42, 101), 56.0);
    let top = list.on_frame().unwrap();
    assert_eq!(top, list.content_height() - 400.0);
    assert_eq!(list.content_height(), 100.0 * 28.0 + 56.0 + 28.0 + 28.0);
}

#[test]
fn upward_scroll_stops_following() {
    let base = Instant::now();
    let mut list = pinned(100);
    let bottom = list.scroll_top();

    list.on_scroll_at(bottom - 200.0, base);
    assert!(!list.auto_follow());
    list.tick_at(base + Duration::from_millis(200));

    list.sync_ids(ids(0..101));
    assert_eq!(list.pending_action(), None);
    assert_eq!(list.on_frame(), None);
    assert_eq!(list.scroll_top(), bottom - 200.0);
}

#[test]
fn returning_to_tail_resumes_following() {
    let base = Instant::now();
    let mut list = pinned(100);
    let bottom = list.scroll_top();

    list.on_scroll_at(bottom - 200.0, base);
    assert!(!list.auto_follow());

    list.on_scroll_at(bottom - 30.0, base + Duration::from_millis(20));
    assert!(list.auto_follow());

    list.tick_at(base + Duration::from_millis(500));
    list.sync_ids(ids(0..101));
    assert_eq!(list.on_frame(), Some(101.0 * 28.0 - 400.0));
}

#[test]
fn appends_during_a_gesture_catch_up_after_settle() {
    let base = Instant::now();
    let mut list = pinned(100);
    let bottom = list.scroll_top();

    list.on_scroll_at(bottom, base);
    list.sync_ids(ids(0..105));
    assert_eq!(list.pending_action(), None);

    assert_eq!(
        list.tick_at(base + Duration::from_millis(150)),
        ScrollTick::Settled
    );
    assert_eq!(list.on_frame(), Some(105.0 * 28.0 - 400.0));
}

#[test]
fn settling_near_the_tail_without_appends_stays_put() {
    let base = Instant::now();
    let mut list = pinned(100);
    let bottom = list.scroll_top();

    list.on_scroll_at(bottom - 200.0, base);
    list.on_scroll_at(bottom - 30.0, base + Duration::from_millis(20));
    assert!(list.auto_follow());

    assert_eq!(
        list.tick_at(base + Duration::from_millis(500)),
        ScrollTick::Settled
    );
    assert_eq!(list.on_frame(), None);
    assert_eq!(list.scroll_top(), bottom - 30.0);
}

#[test]
fn growth_above_a_near_bottom_view_does_not_repin() {
    let base = Instant::now();
    let mut list = pinned(100);
    let bottom = list.scroll_top();
    list.on_scroll_at(bottom - 200.0, base);
    list.on_scroll_at(bottom - 30.0, base);
    list.tick_at(base + Duration::from_millis(200));
    assert!(list.auto_follow());

    list.report_height(ItemId::new(42, 90), 56.0);
    assert_eq!(list.on_frame(), None);
    assert_eq!(list.scroll_top(), bottom - 30.0);
}

#[test]
fn replacing_most_ids_resets() {
    let mut list = pinned(100);
    for seq in 0..100 {
        list.report_height(ItemId::new(42, seq), 30.0);
    }
    list.scroll_to_index(10);

    // 60 of 100 ids survive: below (1 - 0.3) * 100.
    let mut next = ids(0..60);
    next.extend(ids(1_000..1_040));
    let out = list.sync_ids(next);

    assert_eq!(out.kind, ChangeKind::Reset(ResetReason::Replaced));
    assert!(list.height_cache().is_empty());
    assert_eq!(list.scroll_top(), 0.0);
    assert!(list.auto_follow());
}

#[test]
fn replacing_few_ids_patches() {
    let mut list = pinned(100);
    list.report_height(ItemId::new(42, 5), 30.0);

    let mut next = ids(0..80);
    next.extend(ids(1_000..1_020));
    let out = list.sync_ids(next);

    assert_eq!(out.kind, ChangeKind::Patch { first_changed: 80 });
    assert_eq!(list.height_cache().get(&ItemId::new(42, 5)), Some(30.0));
}

#[test]
fn emptying_the_list_collapses_the_window() {
    let mut list = pinned(10);
    let out = list.sync_ids(Vec::new());
    assert_eq!(out.kind, ChangeKind::Reset(ResetReason::Empty));
    assert_eq!(list.window(), None);
    assert!(list.layout().is_empty());
    assert_eq!(list.pending_action(), None);
}

#[test]
fn stale_scroll_is_clamped_after_shrink() {
    let mut list = pinned(100);
    let next = ids(0..80);
    list.sync_ids(next);
    assert_eq!(list.content_height(), 80.0 * 28.0);
    assert!(list.scroll_top() <= 80.0 * 28.0 - 400.0);
    assert!(list.window().is_some());
}

#[test]
fn malformed_heights_keep_estimate() {
    let mut list = pinned(10);
    for bad in [0.0, -3.0, f64::NAN] {
        list.report_height(ItemId::new(42, 4), bad);
    }
    assert_eq!(list.height_cache().get(&ItemId::new(42, 4)), None);
    assert_eq!(list.positions().height(4), Some(28.0));
}

#[test]
fn controller_surface() {
    let mut list = pinned(100);
    list.scroll_to_top();
    assert!(!list.auto_follow());

    let controller: &mut dyn ListController = &mut list;
    controller.scroll_to_bottom();
    assert!(list.auto_follow());
    assert_eq!(list.scroll_top(), 2_400.0);

    let controller: &mut dyn ListController = &mut list;
    controller.reset();
    assert_eq!(list.scroll_top(), 0.0);
    assert_eq!(list.len(), 100);
}

#[test]
fn terminal_host_loop() {
    let mut buffer = TailBuffer::with_ids(500, SessionIds::with_session(9));
    let mut list = VirtualLogList::new(VirtualListConfig::terminal(10));
    let measurer = RowMeasurer::new(20).with_wrap(WrapMode::Word);

    for n in 0..50 {
        if n % 7 == 0 {
            buffer.push(format!("[WARN] line {n} carries a long wrapped payload"));
        } else {
            buffer.push(format!("[INFO] line {n}"));
        }
        list.sync(&buffer.visible_items());
        list.on_frame();
        let layout = list.layout();
        for row in &layout.rows {
            if let Some(position) = list.index_of(&row.id)
                && let Some(item) = buffer.visible(position)
            {
                list.report_height(row.id, measurer.height(&item.content));
            }
        }
        list.on_frame();
    }

    let layout = list.layout();
    let last = layout.rows.last().unwrap();
    assert_eq!(last.index, 49);
    assert!(list.auto_follow());
    assert!(last.top + last.height <= layout.viewport_height + 1e-9);
}

#[test]
fn retention_cap_with_sliding_window_keeps_position() {
    let mut buffer = TailBuffer::with_ids(100, SessionIds::with_session(3));
    let mut list = VirtualLogList::new(config().with_preserve_on_front_trim(true));

    buffer.push_many(std::iter::repeat_n("x", 100));
    list.sync(&buffer.visible_items());
    list.on_frame();
    list.scroll_to_index(50);
    let anchor = list.ids()[50];

    buffer.push("y");
    let out = list.sync(&buffer.visible_items());
    assert_eq!(out.kind, ChangeKind::SlidingWindow { dropped: 1 });
    list.window();
    let index = list.index_of(&anchor).unwrap();
    assert_eq!(index, 49);
    assert_eq!(list.scroll_top(), list.positions().offset(index).unwrap());
}

#[test]
fn search_navigation_scrolls_list() {
    let mut buffer = TailBuffer::with_ids(1_000, SessionIds::with_session(5));
    for n in 0..500 {
        buffer.push(if n == 123 { "needle".to_string() } else { format!("hay {n}") });
    }
    let mut list = VirtualLogList::new(config());
    list.sync(&buffer.visible_items());
    list.on_frame();

    assert_eq!(buffer.search("needle"), 1);
    let position = buffer.current_match().unwrap();
    list.scroll_to_index(position);
    assert!(!list.auto_follow());
    assert!(list.window().unwrap().contains(&123));
}
