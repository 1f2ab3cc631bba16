// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::collections::VecDeque;

use hashbrown::HashMap;
use kurbo::Point;

/// Main-axis direction of a [`DateAxis`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Pages advance along x (day pager, week ruler).
    Horizontal,
    /// Pages advance along y (month list, year list).
    Vertical,
}

/// How page extents along the main axis are determined.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Extent {
    /// Every page fills exactly one viewport (paging surfaces).
    Fill,
    /// Pages measure their own extent via [`AxisModel::measure`].
    Auto,
}

/// Page source and interaction sink for one [`DateAxis`].
///
/// `make_page` must be a pure function of `(index, calendar snapshot)`: the
/// axis drops and recreates pages freely, and recreation must be lossless.
pub trait AxisModel {
    /// Materialized page payload.
    type Page;

    /// Index the axis should center on when (re)built.
    fn initial_index(&self) -> i64;

    /// Materializes the page at `index`.
    fn make_page(&mut self, index: i64) -> Self::Page;

    /// Extent policy for this axis.
    fn extent(&self) -> Extent {
        Extent::Fill
    }

    /// Measured main-axis extent of a page; consulted only under
    /// [`Extent::Auto`].
    fn measure(&mut self, index: i64, page: &Self::Page, viewport: f64) -> f64 {
        let _ = (index, page);
        viewport
    }

    /// The page at `index` became the centered page.
    fn shown(&mut self, page: &Self::Page, index: i64) {
        let _ = (page, index);
    }

    /// The page at `index` left the materialization window and is being
    /// dropped. Models that mirror pages into external state (surface trees)
    /// tear that state down here.
    fn retire(&mut self, index: i64, page: Self::Page) {
        let _ = (index, page);
    }

    /// A tap landed on the page at `index`, at a page-local point.
    fn tap(&mut self, page: &mut Self::Page, index: i64, point: Point) {
        let _ = (page, index, point);
    }
}

/// One materialized page with its window bookkeeping.
#[derive(Debug)]
pub struct PageEntry<P> {
    /// Signed axis index of the page.
    pub index: i64,
    /// Main-axis extent.
    pub extent: f64,
    /// Page payload.
    pub page: P,
}

/// Virtualizing controller for one infinite date axis.
///
/// See the crate docs for the coordinate model and guarantees.
pub struct DateAxis<M: AxisModel> {
    model: M,
    orientation: Orientation,
    pages: VecDeque<PageEntry<M::Page>>,
    /// Main-axis offset of the leading edge of `pages.front()`.
    window_origin: f64,
    /// Current scroll offset (leading edge of the viewport).
    scroll: f64,
    viewport: f64,
    cross: f64,
    reserve: f64,
    centered: Option<i64>,
    /// Scroll target recorded before the viewport was known; consumed by the
    /// first fill.
    pending: Option<i64>,
}

impl<M: AxisModel> core::fmt::Debug for DateAxis<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DateAxis")
            .field("orientation", &self.orientation)
            .field("scroll", &self.scroll)
            .field("viewport", &self.viewport)
            .field("pages", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl<M: AxisModel> DateAxis<M> {
    /// Creates an axis with an empty viewport. Pages materialize once
    /// [`DateAxis::set_viewport`] provides a non-empty extent.
    #[must_use]
    pub fn new(model: M, orientation: Orientation) -> Self {
        Self {
            model,
            orientation,
            pages: VecDeque::new(),
            window_origin: 0.0,
            scroll: 0.0,
            viewport: 0.0,
            cross: 0.0,
            reserve: 0.0,
            centered: None,
            pending: None,
        }
    }

    /// The axis orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Shared access to the model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Sets the main- and cross-axis viewport extents, re-measuring pages.
    pub fn set_viewport(&mut self, main: f64, cross: f64) {
        if self.viewport == main && self.cross == cross {
            return;
        }
        self.viewport = main.max(0.0);
        self.cross = cross.max(0.0);
        self.remeasure();
        self.fill();
    }

    /// Sets the reserve distance materialized beyond both viewport edges.
    pub fn set_reserve(&mut self, reserve: f64) {
        self.reserve = reserve.max(0.0);
        self.fill();
    }

    /// Current scroll offset.
    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.scroll
    }

    /// Scrolls to an absolute offset, materializing newly exposed indices.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        if offset != self.scroll {
            self.scroll = offset;
            self.fill();
        }
    }

    /// Materialized pages in index order.
    pub fn pages(&self) -> impl Iterator<Item = &PageEntry<M::Page>> {
        self.pages.iter()
    }

    /// Mutable access to materialized pages in index order.
    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut PageEntry<M::Page>> {
        self.pages.iter_mut()
    }

    /// The materialized page at `index`, if any.
    #[must_use]
    pub fn page_at(&self, index: i64) -> Option<&PageEntry<M::Page>> {
        let front = self.pages.front()?.index;
        let slot = usize::try_from(index.checked_sub(front)?).ok()?;
        self.pages.get(slot)
    }

    /// Mutable variant of [`DateAxis::page_at`].
    pub fn page_at_mut(&mut self, index: i64) -> Option<&mut PageEntry<M::Page>> {
        let front = self.pages.front()?.index;
        let slot = usize::try_from(index.checked_sub(front)?).ok()?;
        self.pages.get_mut(slot)
    }

    /// Main-axis range `[start, end)` of the page at `index`, if
    /// materialized.
    #[must_use]
    pub fn position(&self, index: i64) -> Option<(f64, f64)> {
        let front = self.pages.front()?.index;
        let slot = usize::try_from(index.checked_sub(front)?).ok()?;
        if slot >= self.pages.len() {
            return None;
        }
        let mut start = self.window_origin;
        for entry in self.pages.iter().take(slot) {
            start += entry.extent;
        }
        Some((start, start + self.pages[slot].extent))
    }

    /// Index of the page under the viewport center, if any.
    #[must_use]
    pub fn centered_index(&self) -> Option<i64> {
        self.index_at(self.scroll + self.viewport * 0.5)
    }

    /// Index of the page containing the main-axis offset, if materialized.
    #[must_use]
    pub fn index_at(&self, offset: f64) -> Option<i64> {
        let mut start = self.window_origin;
        for entry in &self.pages {
            let end = start + entry.extent;
            if offset >= start && offset < end {
                return Some(entry.index);
            }
            start = end;
        }
        None
    }

    /// Scrolls so the page at `index` is positioned at the viewport start,
    /// rebuilding the window when the index is far outside it.
    ///
    /// The `animated` flag is advisory: the axis positions immediately, and
    /// hosts that animate scrolling interpolate their own offset toward the
    /// result.
    pub fn scroll_to_index(&mut self, index: i64, animated: bool) {
        let _ = animated;
        if self.viewport <= 0.0 {
            // The viewport is not known yet; the first fill honors the
            // target instead of the model's initial index.
            self.pending = Some(index);
            return;
        }
        if self.pages.is_empty() {
            self.seed(index);
            self.fill();
            self.announce();
            return;
        }

        if let Some((start, _)) = self.position(index) {
            self.scroll = start;
            self.fill();
        } else {
            self.rebuild_around(index);
        }
        self.announce();
    }

    /// Drops every page and re-derives the initial index.
    pub fn reset(&mut self) {
        while let Some(entry) = self.pages.pop_front() {
            self.model.retire(entry.index, entry.page);
        }
        self.centered = None;
        self.pending = None;
        self.window_origin = 0.0;
        self.scroll = 0.0;
        self.fill();
        self.announce();
    }

    /// Delivers a tap at a viewport-local point to the page under it.
    pub fn tap(&mut self, point: Point) {
        let (main, cross) = match self.orientation {
            Orientation::Horizontal => (point.x, point.y),
            Orientation::Vertical => (point.y, point.x),
        };
        let offset = self.scroll + main;
        let Some(index) = self.index_at(offset) else {
            return;
        };
        let Some((start, _)) = self.position(index) else {
            return;
        };
        let local_main = offset - start;
        let local = match self.orientation {
            Orientation::Horizontal => Point::new(local_main, cross),
            Orientation::Vertical => Point::new(cross, local_main),
        };

        let front = self.pages.front().map(|p| p.index).unwrap_or_default();
        if let Ok(slot) = usize::try_from(index - front)
            && let Some(entry) = self.pages.get_mut(slot)
        {
            self.model.tap(&mut entry.page, index, local);
        }
    }

    /// Re-announces the centered page after external scrolling settles.
    pub fn announce(&mut self) {
        let Some(index) = self.centered_index() else {
            return;
        };
        if self.centered == Some(index) {
            return;
        }
        self.centered = Some(index);
        let front = self.pages.front().map(|p| p.index).unwrap_or_default();
        if let Ok(slot) = usize::try_from(index - front)
            && slot < self.pages.len()
        {
            let entry = &self.pages[slot];
            self.model.shown(&entry.page, index);
        }
    }

    /// Ensures the materialized window covers the viewport plus reserve.
    fn fill(&mut self) {
        if self.viewport <= 0.0 {
            return;
        }
        if let Some(index) = self.pending.take() {
            if self.pages.is_empty() {
                self.seed(index);
            } else {
                self.rebuild_around(index);
            }
        }
        if self.pages.is_empty() {
            self.seed(self.model.initial_index());
        }

        let lead = self.scroll - self.reserve;
        let trail = self.scroll + self.viewport + self.reserve;

        // Extend backward.
        while self.window_origin > lead {
            let Some(front) = self.pages.front() else {
                break;
            };
            let index = front.index - 1;
            let entry = self.materialize(index, None);
            self.window_origin -= entry.extent;
            self.pages.push_front(entry);
        }

        // Extend forward.
        loop {
            let end = self.window_end();
            if end >= trail {
                break;
            }
            let index = self.pages.back().map_or(0, |p| p.index + 1);
            let entry = self.materialize(index, None);
            self.pages.push_back(entry);
        }

        // Trim pages fully outside the reserve window, keeping the centered
        // page materialized at all times.
        let keep = self.centered_index();
        while let Some(front) = self.pages.front() {
            let end = self.window_origin + front.extent;
            if end < lead && Some(front.index) != keep {
                self.window_origin = end;
                if let Some(entry) = self.pages.pop_front() {
                    self.model.retire(entry.index, entry.page);
                }
            } else {
                break;
            }
        }
        loop {
            let end = self.window_end();
            let Some(back) = self.pages.back() else {
                break;
            };
            if end - back.extent > trail && Some(back.index) != keep {
                if let Some(entry) = self.pages.pop_back() {
                    self.model.retire(entry.index, entry.page);
                }
            } else {
                break;
            }
        }
    }

    fn window_end(&self) -> f64 {
        self.window_origin + self.pages.iter().map(|p| p.extent).sum::<f64>()
    }

    fn seed(&mut self, index: i64) {
        let entry = self.materialize(index, None);
        self.window_origin = 0.0;
        self.scroll = 0.0;
        self.pages.push_back(entry);
    }

    /// Rebuilds the window around a distant index, recycling any still-
    /// materialized pages whose indices survive the move.
    fn rebuild_around(&mut self, index: i64) {
        let mut recycled: HashMap<i64, PageEntry<M::Page>> = HashMap::new();
        for entry in self.pages.drain(..) {
            recycled.insert(entry.index, entry);
        }
        self.centered = None;
        self.window_origin = 0.0;
        self.scroll = 0.0;
        let entry = self.materialize(index, Some(&mut recycled));
        self.pages.push_back(entry);
        self.fill_recycling(&mut recycled);
        for (index, entry) in recycled.drain() {
            self.model.retire(index, entry.page);
        }
    }

    fn fill_recycling(&mut self, recycled: &mut HashMap<i64, PageEntry<M::Page>>) {
        if self.viewport <= 0.0 {
            return;
        }
        let lead = self.scroll - self.reserve;
        let trail = self.scroll + self.viewport + self.reserve;

        while self.window_origin > lead {
            let Some(front) = self.pages.front() else {
                break;
            };
            let index = front.index - 1;
            let entry = self.materialize(index, Some(recycled));
            self.window_origin -= entry.extent;
            self.pages.push_front(entry);
        }
        loop {
            if self.window_end() >= trail {
                break;
            }
            let index = self.pages.back().map_or(0, |p| p.index + 1);
            let entry = self.materialize(index, Some(recycled));
            self.pages.push_back(entry);
        }
    }

    fn materialize(
        &mut self,
        index: i64,
        recycled: Option<&mut HashMap<i64, PageEntry<M::Page>>>,
    ) -> PageEntry<M::Page> {
        if let Some(pool) = recycled
            && let Some(entry) = pool.remove(&index)
        {
            return entry;
        }
        let page = self.model.make_page(index);
        let extent = match self.model.extent() {
            Extent::Fill => self.viewport,
            Extent::Auto => self.model.measure(index, &page, self.viewport),
        };
        PageEntry {
            index,
            extent,
            page,
        }
    }

    fn remeasure(&mut self) {
        match self.model.extent() {
            Extent::Fill => {
                for entry in &mut self.pages {
                    entry.extent = self.viewport;
                }
            }
            Extent::Auto => {
                for entry in &mut self.pages {
                    entry.extent = self.model.measure(entry.index, &entry.page, self.viewport);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    /// Model that materializes its index and counts page constructions.
    struct Counting {
        made: Vec<i64>,
        shown: Vec<i64>,
        taps: Vec<(i64, Point)>,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                made: Vec::new(),
                shown: Vec::new(),
                taps: Vec::new(),
            }
        }
    }

    impl AxisModel for Counting {
        type Page = i64;

        fn initial_index(&self) -> i64 {
            100
        }

        fn make_page(&mut self, index: i64) -> Self::Page {
            self.made.push(index);
            index
        }

        fn shown(&mut self, _page: &Self::Page, index: i64) {
            self.shown.push(index);
        }

        fn tap(&mut self, _page: &mut Self::Page, index: i64, point: Point) {
            self.taps.push((index, point));
        }
    }

    fn axis() -> DateAxis<Counting> {
        let mut axis = DateAxis::new(Counting::new(), Orientation::Horizontal);
        axis.set_viewport(100.0, 50.0);
        axis
    }

    #[test]
    fn seeds_at_initial_index() {
        let mut axis = axis();
        axis.announce();
        assert_eq!(axis.centered_index(), Some(100));
        assert_eq!(axis.model().shown, [100]);
    }

    #[test]
    fn one_page_per_index() {
        let mut axis = axis();
        axis.set_reserve(150.0);
        let mut indices: Vec<i64> = axis.pages().map(|p| p.index).collect();
        indices.dedup();
        assert_eq!(indices.len(), axis.pages().count());
        // Window covers [scroll - reserve, scroll + viewport + reserve).
        assert!(axis.page_at(99).is_some());
        assert!(axis.page_at(102).is_some());
    }

    #[test]
    fn pages_outside_reserve_are_dropped_and_recreated() {
        let mut axis = axis();
        axis.set_reserve(100.0);
        assert!(axis.page_at(99).is_some());

        // Scroll three pages forward: page 99 leaves the reserve window.
        axis.set_scroll_offset(300.0);
        assert!(axis.page_at(99).is_none());

        // Scrolling back recreates it from scratch.
        axis.set_scroll_offset(0.0);
        assert!(axis.page_at(99).is_some());
        let created = axis.model().made.iter().filter(|&&i| i == 99).count();
        assert_eq!(created, 2, "page 99 must be recreated, not retained");
    }

    #[test]
    fn page_recreation_is_pure() {
        let mut axis = axis();
        let first = axis.page_at(100).map(|p| p.page);
        axis.reset();
        let second = axis.page_at(100).map(|p| p.page);
        assert_eq!(first, second);
    }

    #[test]
    fn scroll_to_far_index_rebuilds_window() {
        let mut axis = axis();
        axis.scroll_to_index(5_000, false);
        assert_eq!(axis.centered_index(), Some(5_000));
        assert!(axis.page_at(100).is_none());
        assert_eq!(axis.model().shown.last(), Some(&5_000));
    }

    #[test]
    fn scroll_to_nearby_index_keeps_window() {
        let mut axis = axis();
        axis.set_reserve(200.0);
        let made_before = axis.model().made.len();
        axis.scroll_to_index(101, true);
        assert_eq!(axis.centered_index(), Some(101));
        // Page 101 was already materialized; only window extension may
        // allocate.
        assert!(axis.model().made.len() >= made_before);
        assert!(axis.page_at(100).is_some());
    }

    #[test]
    fn shown_fires_once_per_center_change() {
        let mut axis = axis();
        axis.announce();
        axis.announce();
        assert_eq!(axis.model().shown, [100]);

        axis.set_scroll_offset(100.0);
        axis.announce();
        assert_eq!(axis.model().shown, [100, 101]);
    }

    #[test]
    fn tap_is_delivered_page_local() {
        let mut axis = axis();
        axis.set_scroll_offset(100.0);
        axis.tap(Point::new(30.0, 20.0));
        assert_eq!(axis.model().taps, [(101, Point::new(30.0, 20.0))]);
    }

    #[test]
    fn reset_redrives_initial_index() {
        let mut axis = axis();
        axis.scroll_to_index(5_000, false);
        axis.reset();
        assert_eq!(axis.centered_index(), Some(100));
    }

    #[test]
    fn scroll_target_set_before_layout_survives_the_first_fill() {
        let mut axis = DateAxis::new(Counting::new(), Orientation::Horizontal);
        axis.scroll_to_index(250, false);
        assert_eq!(axis.centered_index(), None, "nothing materializes at zero viewport");

        axis.set_viewport(100.0, 50.0);
        assert_eq!(axis.centered_index(), Some(250));
    }
}
