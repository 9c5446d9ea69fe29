//! Per-position row heights for the current filtered view.
//!
//! Unmeasured positions report the estimated height. Measured heights live in
//! a sparse ordered map, and the running total is adjusted by the delta on
//! every update instead of being recomputed.

use std::collections::BTreeMap;

/// Height model over filtered-view positions.
#[derive(Clone, Debug)]
pub struct HeightModel {
    estimate: u32,
    len: usize,
    measured: BTreeMap<usize, u32>,
    // Sum of (measured - estimate) over all measured positions.
    delta_total: i64,
}

impl HeightModel {
    /// Creates a model for `len` positions with the given estimated row height.
    pub fn new(len: usize, estimate: u32) -> Self {
        Self {
            estimate: estimate.max(1),
            len,
            measured: BTreeMap::new(),
            delta_total: 0,
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn estimate(&self) -> u32 {
        self.estimate
    }

    /// Number of positions that have a measured height.
    pub fn measured_count(&self) -> usize {
        self.measured.len()
    }

    /// Drops all measurements and resizes the model.
    pub fn reset(&mut self, len: usize) {
        self.len = len;
        self.measured.clear();
        self.delta_total = 0;
    }

    /// Replaces the estimated height; measurements are discarded.
    pub fn set_estimate(&mut self, estimate: u32) {
        self.estimate = estimate.max(1);
        self.reset(self.len);
    }

    /// Returns the height at `pos` (estimated if unmeasured).
    pub fn height(&self, pos: usize) -> u32 {
        self.measured.get(&pos).copied().unwrap_or(self.estimate)
    }

    /// Returns `true` if `pos` has a measured height.
    pub fn is_measured(&self, pos: usize) -> bool {
        self.measured.contains_key(&pos)
    }

    /// Records a measured height and returns the change in total height.
    pub fn set_height(&mut self, pos: usize, height: u32) -> i64 {
        if pos >= self.len {
            return 0;
        }
        let previous = self.height(pos);
        self.measured.insert(pos, height);
        let delta = i64::from(height) - i64::from(previous);
        self.delta_total += delta;
        delta
    }

    /// Sum of heights of every position before `pos`.
    pub fn offset(&self, pos: usize) -> u32 {
        let pos = pos.min(self.len);
        let base = i64::from(self.estimate) * pos as i64;
        let adjust: i64 = self
            .measured
            .range(..pos)
            .map(|(_, h)| i64::from(*h) - i64::from(self.estimate))
            .sum();
        clamp_u32(base + adjust)
    }

    /// Total height of all positions.
    pub fn total(&self) -> u32 {
        clamp_u32(i64::from(self.estimate) * self.len as i64 + self.delta_total)
    }

    /// Returns the position containing `offset`, i.e. the last position whose
    /// start offset is `<= offset`. Offsets past the end map to the last position.
    pub fn position_at(&self, offset: u32) -> usize {
        if self.len == 0 {
            return 0;
        }
        // Binary search for the first position whose offset exceeds `offset`.
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.offset(mid) <= offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.saturating_sub(1).min(self.len - 1)
    }
}

impl Default for HeightModel {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

fn clamp_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
