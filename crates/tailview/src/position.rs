#![forbid(unsafe_code)]

//! Cumulative vertical offsets for every item.
//!
//! The index is a prefix sum over effective heights (measured, or the
//! estimate for unmeasured items). It is a pure function of
//! `(ids, heights, estimate)`; the only state it keeps is its own output and
//! a generation counter.
//!
//! # Invariants
//!
//! 1. `offsets[0] == 0` and `offsets[i + 1] == offsets[i] + heights[i]`.
//! 2. `total_height() == offsets[n - 1] + heights[n - 1]` (0 when empty).
//! 3. `generation` only advances when some offset or height moved by more
//!    than [`OFFSET_EPSILON`], so readers can skip redundant work.
//! 4. `recompute_from(k, ..)` never touches entries `[0, k)`.

use crate::height::HeightCache;
use crate::item::ItemId;

/// Offsets closer than this are considered equal.
pub const OFFSET_EPSILON: f64 = 1e-6;

/// Prefix-sum layout of a list of items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionIndex {
    offsets: Vec<f64>,
    heights: Vec<f64>,
    generation: u64,
}

impl PositionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute a fresh index for `ids`.
    #[must_use]
    pub fn compute(ids: &[ItemId], cache: &HeightCache, estimate: f64) -> Self {
        let mut index = Self::new();
        index.recompute_from(0, ids, cache, estimate);
        index
    }

    /// Rebuild entries from `start` onward, keeping `[0, start)` as they are.
    ///
    /// The caller guarantees the prefix is still valid (same ids, same
    /// heights). Returns `true` when any offset or height changed, or the
    /// length changed.
    pub fn recompute_from(
        &mut self,
        start: usize,
        ids: &[ItemId],
        cache: &HeightCache,
        estimate: f64,
    ) -> bool {
        let previous_len = self.offsets.len();
        let start = start.min(previous_len).min(ids.len());
        let mut changed = previous_len != ids.len();

        let mut top = match start.checked_sub(1) {
            Some(prev) => self.offsets[prev] + self.heights[prev],
            None => 0.0,
        };

        for (i, id) in ids.iter().enumerate().skip(start) {
            let height = cache.height_or(id, estimate);
            if i < previous_len {
                if (self.offsets[i] - top).abs() > OFFSET_EPSILON
                    || (self.heights[i] - height).abs() > OFFSET_EPSILON
                {
                    changed = true;
                }
                self.offsets[i] = top;
                self.heights[i] = height;
            } else {
                self.offsets.push(top);
                self.heights.push(height);
            }
            top += height;
        }
        self.offsets.truncate(ids.len());
        self.heights.truncate(ids.len());

        if changed {
            self.generation = self.generation.wrapping_add(1);
        }
        changed
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        if !self.offsets.is_empty() {
            self.generation = self.generation.wrapping_add(1);
        }
        self.offsets.clear();
        self.heights.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Top edge of item `i`.
    #[must_use]
    pub fn offset(&self, i: usize) -> Option<f64> {
        self.offsets.get(i).copied()
    }

    /// Effective height of item `i`.
    #[must_use]
    pub fn height(&self, i: usize) -> Option<f64> {
        self.heights.get(i).copied()
    }

    /// Bottom edge of item `i`.
    #[must_use]
    pub fn bottom(&self, i: usize) -> Option<f64> {
        Some(self.offset(i)? + self.height(i)?)
    }

    /// All top offsets in item order.
    #[must_use]
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Height of the whole content.
    #[must_use]
    pub fn total_height(&self) -> f64 {
        self.offsets.len().checked_sub(1).map_or(0.0, |last| {
            self.offsets[last] + self.heights[last]
        })
    }

    /// Bumped whenever the layout actually changes.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index of the item whose `[top, bottom)` span contains content coordinate `y`.
    #[must_use]
    pub fn index_at(&self, y: f64) -> Option<usize> {
        if !y.is_finite() || y < 0.0 || y >= self.total_height() {
            return None;
        }
        let i = self.first_ending_after(y);
        (i < self.len()).then_some(i)
    }

    /// First index whose bottom edge lies strictly below `y` (`len()` if none).
    pub(crate) fn first_ending_after(&self, y: f64) -> usize {
        partition_index(self.len(), |i| self.offsets[i] + self.heights[i] <= y)
    }

    /// Number of items whose top edge lies strictly above `y`.
    pub(crate) fn count_starting_before(&self, y: f64) -> usize {
        self.offsets.partition_point(|&top| top < y)
    }
}

/// Binary search over `0..len` for the first index where `pred` turns false.
///
/// `pred` must be monotone (true..true, false..false).
fn partition_index(len: usize, mut pred: impl FnMut(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0usize, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
