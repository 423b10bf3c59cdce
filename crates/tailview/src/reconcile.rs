#![forbid(unsafe_code)]

//! Item-set change classification.
//!
//! Every time the caller hands over a new item sequence the [`Reconciler`]
//! compares it with the previous one and decides whether cached layout
//! state can be patched or must be thrown away.
//!
//! # Decision Rule
//!
//! With `old` the previous ids, `new` the incoming ids and `r` the reset
//! threshold ratio:
//!
//! 1) `new` empty: [`ChangeKind::Unchanged`] if `old` was empty too,
//!    otherwise reset ([`ResetReason::Empty`]).
//! 2) `old` empty: reset ([`ResetReason::FromEmpty`]).
//! 3) Identical sequences: [`ChangeKind::Unchanged`].
//! 4) `old` is a prefix of `new`: [`ChangeKind::Append`], unless the count
//!    delta exceeds `r` ([`ResetReason::SizeDelta`]).
//! 5) `old[0]` is gone: front truncation. With `preserve_on_front_trim` and
//!    the survivors still leading `new` in order this is a
//!    [`ChangeKind::SlidingWindow`]; otherwise reset
//!    ([`ResetReason::FrontTruncation`]).
//! 6) Fewer than `(1 - r) * old.len()` ids survive: reset
//!    ([`ResetReason::Replaced`]).
//! 7) Count delta `|new - old| / old > r`: reset ([`ResetReason::SizeDelta`]).
//! 8) Otherwise: [`ChangeKind::Patch`] from the first differing index.
//!
//! The reconciler also owns the "already rendered" set used to flag rows
//! the first time a render pass emits them.

use std::collections::HashSet;

use crate::config::VirtualListConfig;
use crate::item::ItemId;

/// Why a change forced a full reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetReason {
    /// The new sequence is empty.
    Empty,
    /// The previous sequence was empty.
    FromEmpty,
    /// Items were dropped from the front.
    FrontTruncation,
    /// Too few ids survived the change.
    Replaced,
    /// Item count moved by more than the threshold.
    SizeDelta,
    /// The host asked for it through the controller.
    Requested,
}

impl ResetReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::FromEmpty => "from_empty",
            Self::FrontTruncation => "front_truncation",
            Self::Replaced => "replaced",
            Self::SizeDelta => "size_delta",
            Self::Requested => "requested",
        }
    }
}

/// Classification of an item-set change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Unchanged,
    /// Previous ids are an exact prefix; new ones start at `first_new`.
    Append { first_new: usize },
    /// Positions before `first_changed` are still valid.
    Patch { first_changed: usize },
    /// `dropped` items left the front; the rest kept their order.
    SlidingWindow { dropped: usize },
    Reset(ResetReason),
}

impl ChangeKind {
    #[must_use]
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset(_))
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub kind: ChangeKind,
    /// Ids present before and absent now.
    pub removed: Vec<ItemId>,
    pub previous_len: usize,
    pub len: usize,
}

impl Reconciliation {
    /// Whether new ids showed up at the tail.
    #[must_use]
    pub fn appended(&self) -> bool {
        match self.kind {
            ChangeKind::Append { .. } => true,
            ChangeKind::SlidingWindow { dropped } => self.len > self.previous_len - dropped,
            ChangeKind::Reset(_) => self.len > 0,
            ChangeKind::Patch { .. } => self.len > self.previous_len,
            ChangeKind::Unchanged => false,
        }
    }
}

/// Tracks the previous item sequence and the rendered-once set.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    ids: Vec<ItemId>,
    seen: HashSet<ItemId>,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids from the last reconciled sequence.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Classify `new_ids` against the previous sequence and adopt them.
    pub fn reconcile(&mut self, new_ids: &[ItemId], config: &VirtualListConfig) -> Reconciliation {
        let ratio = effective_ratio(config.reset_threshold_ratio);
        let current: HashSet<ItemId> = new_ids.iter().copied().collect();
        let removed: Vec<ItemId> = self
            .ids
            .iter()
            .filter(|id| !current.contains(id))
            .copied()
            .collect();

        let kind = classify(&self.ids, new_ids, &current, removed.len(), ratio, config);

        if kind.is_reset() {
            self.seen.clear();
        } else {
            for id in &removed {
                self.seen.remove(id);
            }
        }

        let previous_len = self.ids.len();
        self.ids.clear();
        self.ids.extend_from_slice(new_ids);

        Reconciliation {
            kind,
            removed,
            previous_len,
            len: new_ids.len(),
        }
    }

    /// Mark `id` as rendered. Returns `true` the first time.
    pub fn mark_seen(&mut self, id: ItemId) -> bool {
        self.seen.insert(id)
    }

    #[must_use]
    pub fn is_seen(&self, id: &ItemId) -> bool {
        self.seen.contains(id)
    }

    /// Forget which ids were rendered, keeping the sequence.
    pub fn clear_seen(&mut self) {
        self.seen.clear();
    }

    /// Forget the sequence and the rendered set.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.seen.clear();
    }
}

fn effective_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        VirtualListConfig::default().reset_threshold_ratio
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

fn size_delta_exceeds(old_len: usize, new_len: usize, ratio: f64) -> bool {
    old_len.abs_diff(new_len) as f64 / old_len as f64 > ratio
}

fn classify(
    old: &[ItemId],
    new: &[ItemId],
    current: &HashSet<ItemId>,
    removed: usize,
    ratio: f64,
    config: &VirtualListConfig,
) -> ChangeKind {
    if new.is_empty() {
        return if old.is_empty() {
            ChangeKind::Unchanged
        } else {
            ChangeKind::Reset(ResetReason::Empty)
        };
    }
    if old.is_empty() {
        return ChangeKind::Reset(ResetReason::FromEmpty);
    }
    if old == new {
        return ChangeKind::Unchanged;
    }
    if new.starts_with(old) {
        if size_delta_exceeds(old.len(), new.len(), ratio) {
            return ChangeKind::Reset(ResetReason::SizeDelta);
        }
        return ChangeKind::Append {
            first_new: old.len(),
        };
    }

    let shared = old.len() - removed;
    let too_few_shared = (shared as f64) < (1.0 - ratio) * old.len() as f64;

    if !current.contains(&old[0]) {
        let survivors_lead = old
            .iter()
            .position(|id| *id == new[0])
            .filter(|&dropped| new.starts_with(&old[dropped..]));
        return match survivors_lead {
            Some(dropped)
                if config.preserve_on_front_trim
                    && !too_few_shared
                    && !size_delta_exceeds(old.len(), new.len(), ratio) =>
            {
                ChangeKind::SlidingWindow { dropped }
            }
            _ => ChangeKind::Reset(ResetReason::FrontTruncation),
        };
    }

    if too_few_shared {
        return ChangeKind::Reset(ResetReason::Replaced);
    }
    if size_delta_exceeds(old.len(), new.len(), ratio) {
        return ChangeKind::Reset(ResetReason::SizeDelta);
    }

    let first_changed = old
        .iter()
        .zip(new)
        .position(|(a, b)| a != b)
        .unwrap_or(old.len().min(new.len()));
    ChangeKind::Patch { first_changed }
}
