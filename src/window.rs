use std::ops::Range;

use crate::height::HeightModel;

/// Contiguous range of filtered-view positions materialized as rows, plus the
/// spacer heights standing in for everything outside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderWindow {
    /// First materialized position.
    pub start: usize,
    /// One past the last materialized position.
    pub end: usize,
    /// Height of all positions before `start`.
    pub before: u32,
    /// Height of all positions from `end` onward.
    pub after: u32,
}

impl RenderWindow {
    pub const EMPTY: Self = Self {
        start: 0,
        end: 0,
        before: 0,
        after: 0,
    };

    #[inline]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub const fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Recomputes both spacers from the height model without moving the range.
    pub fn refresh_spacers(&mut self, heights: &HeightModel) {
        self.start = self.start.min(heights.len());
        self.end = self.end.min(heights.len());
        self.before = heights.offset(self.start);
        self.after = heights.total().saturating_sub(heights.offset(self.end));
    }
}

/// Computes the render window from scroll position and viewport height.
#[derive(Clone, Debug)]
pub struct WindowCalculator {
    overscan: usize,
    last: Option<RenderWindow>,
}

impl Default for WindowCalculator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl WindowCalculator {
    pub const fn new(overscan: usize) -> Self {
        Self {
            overscan,
            last: None,
        }
    }

    #[inline]
    pub const fn overscan(&self) -> usize {
        self.overscan
    }

    /// Returns the last computed window, if any.
    #[inline]
    pub const fn last(&self) -> Option<RenderWindow> {
        self.last
    }

    /// Forgets the last good window.
    pub const fn reset(&mut self) {
        self.last = None;
    }

    /// Largest valid scroll offset for the given viewport.
    pub fn max_scroll(heights: &HeightModel, viewport_height: u32) -> u32 {
        heights.total().saturating_sub(viewport_height)
    }

    /// Strictly visible positions (no overscan).
    pub fn visible_range(heights: &HeightModel, scroll_top: u32, viewport_height: u32) -> Range<usize> {
        if heights.is_empty() || viewport_height == 0 {
            return 0..0;
        }
        let first = heights.position_at(scroll_top);
        let bottom = scroll_top.saturating_add(viewport_height);
        let mut pos = first;
        let mut acc = heights.offset(first);
        while pos < heights.len() && acc < bottom {
            acc = acc.saturating_add(heights.height(pos));
            pos += 1;
        }
        first..pos
    }

    /// Computes the window for the given scroll position.
    ///
    /// An empty view yields [`RenderWindow::EMPTY`]. A zero-height viewport
    /// (hidden or not yet laid out) keeps the last good window.
    pub fn compute(&mut self, heights: &HeightModel, scroll_top: u32, viewport_height: u32) -> RenderWindow {
        if heights.is_empty() {
            self.last = Some(RenderWindow::EMPTY);
            return RenderWindow::EMPTY;
        }
        if viewport_height == 0 {
            let mut retained = self.last.unwrap_or(RenderWindow::EMPTY);
            retained.refresh_spacers(heights);
            return retained;
        }

        let visible = Self::visible_range(heights, scroll_top, viewport_height);
        let mut window = RenderWindow {
            start: visible.start.saturating_sub(self.overscan),
            end: visible.end.saturating_add(self.overscan).min(heights.len()),
            ..RenderWindow::EMPTY
        };
        window.refresh_spacers(heights);
        self.last = Some(window);
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(window: &RenderWindow, heights: &HeightModel) -> u32 {
        window.before + window.range().map(|pos| heights.height(pos)).sum::<u32>() + window.after
    }

    #[test]
    fn start_index_contains_scroll_offset() {
        // 100 text rows of 50 units, viewport fits 10.
        let heights = HeightModel::new(100, 50);
        let visible = WindowCalculator::visible_range(&heights, 500, 500);
        let start = visible.start;
        assert!(heights.offset(start) <= 500);
        assert!(500 < heights.offset(start + 1));
        assert_eq!(visible, 10..20);
    }

    #[test]
    fn overscan_is_added_symmetrically() {
        let heights = HeightModel::new(100, 1);
        let mut calc = WindowCalculator::new(3);
        let window = calc.compute(&heights, 40, 10);
        assert_eq!(window.range(), 37..53);
        assert_eq!(window.before, 37);
        assert_eq!(window.after, 47);
    }

    #[test]
    fn overscan_clamps_at_edges() {
        let heights = HeightModel::new(5, 1);
        let mut calc = WindowCalculator::new(3);
        let window = calc.compute(&heights, 0, 10);
        assert_eq!(window.range(), 0..5);
        assert_eq!((window.before, window.after), (0, 0));
    }

    #[test]
    fn empty_view_renders_nothing() {
        let heights = HeightModel::new(0, 2);
        let mut calc = WindowCalculator::default();
        assert_eq!(calc.compute(&heights, 0, 20), RenderWindow::EMPTY);
    }

    #[test]
    fn zero_viewport_keeps_last_window() {
        let heights = HeightModel::new(100, 1);
        let mut calc = WindowCalculator::new(2);
        let good = calc.compute(&heights, 20, 10);
        let hidden = calc.compute(&heights, 20, 0);
        assert_eq!(good, hidden);
        assert!(hidden.len() > 1);
    }

    #[test]
    fn window_covers_total_height_with_measurements() {
        let mut heights = HeightModel::new(60, 2);
        for pos in (0..60).step_by(7) {
            heights.set_height(pos, 5);
        }
        let mut calc = WindowCalculator::new(3);
        for scroll in [0, 13, 40, 77, 200] {
            let window = calc.compute(&heights, scroll, 12);
            assert_eq!(covered(&window, &heights), heights.total());
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn coverage_holds_for_any_scroll(
                len in 1usize..300,
                estimate in 1u32..6,
                measured in proptest::collection::vec((0usize..300, 1u32..9), 0..40),
                scroll in 0u32..2_000,
                viewport in 1u32..80,
            ) {
                let mut heights = HeightModel::new(len, estimate);
                for (pos, h) in measured {
                    heights.set_height(pos, h);
                }
                let mut calc = WindowCalculator::new(3);
                let window = calc.compute(&heights, scroll, viewport);
                prop_assert_eq!(covered(&window, &heights), heights.total());
                prop_assert!(window.end <= len);
                prop_assert!(window.start < window.end);
            }
        }
    }
}
