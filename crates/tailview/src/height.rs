#![forbid(unsafe_code)]

//! Row height tracking keyed by item identity.
//!
//! The host reports the laid-out height of an item after it paints. The cache
//! keeps the last accepted value per [`ItemId`] and filters out measurement
//! noise so that sub-unit jitter never triggers a layout recomputation.
//!
//! # Acceptance rules
//!
//! | Input | Result |
//! |-------|--------|
//! | NaN, infinite, zero or negative | [`HeightUpdate::Rejected`], cache untouched |
//! | first report, within tolerance of the estimate | not stored, [`HeightUpdate::Unchanged`] |
//! | first report, outside tolerance | stored, [`HeightUpdate::Changed`] |
//! | later report, within tolerance of cached value | ignored, [`HeightUpdate::Unchanged`] |
//! | later report, outside tolerance | stored, [`HeightUpdate::Changed`] |
//!
//! A cached value is always the height the position index lays out, so
//! drift between the two stays within one tolerance.

use std::collections::HashMap;

use crate::item::ItemId;

/// Outcome of reporting a measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeightUpdate {
    /// The effective height moved; positions after this item are stale.
    Changed { previous: f64, current: f64 },
    /// Recorded or ignored without affecting layout.
    Unchanged,
    /// Malformed measurement discarded.
    Rejected,
}

impl HeightUpdate {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Last-measured heights by item id.
#[derive(Debug, Clone, Default)]
pub struct HeightCache {
    heights: HashMap<ItemId, f64>,
}

impl HeightCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached height, if the item was ever measured.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<f64> {
        self.heights.get(id).copied()
    }

    /// Cached height or the estimate for unmeasured items.
    #[must_use]
    pub fn height_or(&self, id: &ItemId, estimate: f64) -> f64 {
        self.get(id).unwrap_or(estimate)
    }

    /// Record a measurement, applying the acceptance rules in the module docs.
    pub fn record(
        &mut self,
        id: ItemId,
        height: f64,
        estimate: f64,
        tolerance: f64,
    ) -> HeightUpdate {
        if !(height.is_finite() && height > 0.0) {
            return HeightUpdate::Rejected;
        }
        match self.heights.get_mut(&id) {
            Some(cached) => {
                if (height - *cached).abs() <= tolerance {
                    return HeightUpdate::Unchanged;
                }
                let previous = *cached;
                *cached = height;
                HeightUpdate::Changed {
                    previous,
                    current: height,
                }
            }
            None => {
                if (height - estimate).abs() <= tolerance {
                    return HeightUpdate::Unchanged;
                }
                self.heights.insert(id, height);
                HeightUpdate::Changed {
                    previous: estimate,
                    current: height,
                }
            }
        }
    }

    /// Drop the entry for `id`. Returns whether one existed.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.heights.remove(id).is_some()
    }

    /// Keep only entries whose id satisfies `keep`. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&ItemId) -> bool) -> usize {
        let before = self.heights.len();
        self.heights.retain(|id, _| keep(id));
        before - self.heights.len()
    }

    /// Number of measured items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Clear cached heights.
    pub fn clear(&mut self) {
        self.heights.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seq: u64) -> ItemId {
        ItemId::new(1, seq)
    }

    #[test]
    fn unmeasured_falls_back_to_estimate() {
        let cache = HeightCache::new();
        assert_eq!(cache.get(&id(0)), None);
        assert_eq!(cache.height_or(&id(0), 28.0), 28.0);
    }

    #[test]
    fn first_measurement_matching_estimate_keeps_estimate() {
        let mut cache = HeightCache::new();
        assert_eq!(cache.record(id(0), 28.5, 28.0, 1.0), HeightUpdate::Unchanged);
        assert_eq!(cache.get(&id(0)), None);
        assert_eq!(cache.height_or(&id(0), 28.0), 28.0);

        // Later reports compare against the laid-out estimate, not 28.5.
        assert_eq!(cache.record(id(0), 29.5, 28.0, 1.0), HeightUpdate::Unchanged);
        assert!(cache.record(id(0), 30.5, 28.0, 1.0).is_changed());
    }

    #[test]
    fn first_measurement_differing_from_estimate_changes() {
        let mut cache = HeightCache::new();
        let update = cache.record(id(0), 56.0, 28.0, 1.0);
        assert_eq!(
            update,
            HeightUpdate::Changed {
                previous: 28.0,
                current: 56.0
            }
        );
    }

    #[test]
    fn jitter_within_tolerance_is_ignored() {
        let mut cache = HeightCache::new();
        cache.record(id(0), 40.0, 28.0, 1.0);
        assert_eq!(cache.record(id(0), 40.8, 28.0, 1.0), HeightUpdate::Unchanged);
        assert_eq!(cache.record(id(0), 39.0, 28.0, 1.0), HeightUpdate::Unchanged);
        assert_eq!(cache.get(&id(0)), Some(40.0));
        assert!(cache.record(id(0), 41.5, 28.0, 1.0).is_changed());
        assert_eq!(cache.get(&id(0)), Some(41.5));
    }

    #[test]
    fn malformed_measurements_rejected() {
        let mut cache = HeightCache::new();
        cache.record(id(0), 30.0, 28.0, 1.0);
        for bad in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            assert_eq!(cache.record(id(0), bad, 28.0, 1.0), HeightUpdate::Rejected);
        }
        assert_eq!(cache.get(&id(0)), Some(30.0));
        assert_eq!(cache.record(id(1), f64::NAN, 28.0, 1.0), HeightUpdate::Rejected);
        assert_eq!(cache.get(&id(1)), None);
    }

    #[test]
    fn retain_prunes_absent_ids() {
        let mut cache = HeightCache::new();
        for seq in 0..10 {
            cache.record(id(seq), 10.0 + seq as f64, 28.0, 1.0);
        }
        let dropped = cache.retain(|item| item.seq % 2 == 0);
        assert_eq!(dropped, 5);
        assert_eq!(cache.len(), 5);
        assert!(cache.get(&id(3)).is_none());
        assert!(cache.get(&id(4)).is_some());
    }
}
