// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Month section: a vertical list of month grids built from live surfaces.
//!
//! Day cells sit on a 7-column grid: the column is
//! `(weekday - first_weekday) mod days_in_week`, the row is the date's week
//! row within its month. Cell height derives from font metrics, not a fixed
//! constant, so the grid follows the embedder's type size.

use almanac_axis::{AxisModel, DateAxis, Extent, Orientation};
use almanac_events::Interval;
use almanac_info::{CalendarInfo, arith};
use almanac_surface::{Surface, SurfaceId, SurfaceTree};
use chrono::NaiveDate;
use kurbo::{Point, Rect, Size};

use crate::{
    DisplayInfo, Interaction, InteractionBus, MarkerStyle, RegularSection, Section, SectionKind,
    SharedInfo, SharedSource, SharedTree,
};

/// Font-derived cell metrics of the month grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MonthMetrics {
    /// Diameter of the today marker disc.
    pub today_diameter: f64,
    /// Height of one day cell row.
    pub day_height: f64,
    /// Width of one day cell layer.
    pub cell_width: f64,
    /// Height of the month title line.
    pub title_height: f64,
    /// Height of the events-marker strip at the cell bottom.
    pub marker_height: f64,
}

impl MonthMetrics {
    /// Derives the metrics from the active style.
    #[must_use]
    pub fn new(info: &CalendarInfo) -> Self {
        let inset = info.style.geometry.inset;
        let half = inset / 2.0;
        let today_diameter = info.style.fonts.month_day.line_height.ceil() + inset;
        let marker_diameter = 8.0;
        Self {
            today_diameter,
            day_height: half + today_diameter + half / 2.0 + marker_diameter + half * 2.5,
            cell_width: today_diameter + half,
            title_height: info.style.fonts.month_title.line_height.ceil(),
            marker_height: half * 6.0,
        }
    }
}

/// Grid slot of a date within its month, honoring the configured first
/// weekday.
#[must_use]
pub fn grid_position(date: NaiveDate, first_weekday: u32) -> (u32, u32) {
    (
        arith::week_position(date, first_weekday),
        arith::week_row(date, first_weekday),
    )
}

/// Natural height of one month page at the given metrics.
#[must_use]
pub fn page_height(info: &CalendarInfo, metrics: &MonthMetrics, month: NaiveDate) -> f64 {
    let rows = f64::from(arith::week_rows_in_month(month, info.metrics.first_weekday));
    (info.style.geometry.inset + metrics.title_height + rows * metrics.day_height).ceil()
}

/// One day cell: the cell layer plus its text, today-marker, and
/// events-marker sublayers.
#[derive(Clone, Debug)]
pub struct DayCell {
    /// The date the cell shows.
    pub date: NaiveDate,
    /// Cell layer.
    pub surface: SurfaceId,
    /// Day-number text layer.
    pub text: SurfaceId,
    /// Today marker disc behind the text.
    pub today: SurfaceId,
    /// Events marker strip at the cell bottom.
    pub marker: SurfaceId,
    /// Number of events on this day after the last refresh.
    pub event_count: usize,
}

/// One materialized month page.
#[derive(Debug)]
pub struct MonthPage {
    /// Start of the month this page shows.
    pub date: NaiveDate,
    /// Page surface (child of the section root).
    pub surface: SurfaceId,
    /// Month title layer.
    pub title: SurfaceId,
    /// Day cells in day order.
    pub days: Vec<DayCell>,
    /// One separator rule per week row.
    pub lines: Vec<SurfaceId>,
}

impl MonthPage {
    /// The cell showing `date`, if it belongs to this month page.
    #[must_use]
    pub fn cell_for(&self, date: NaiveDate) -> Option<&DayCell> {
        self.days.iter().find(|cell| cell.date == date)
    }

    /// Nearest cell to a page-local point, within the page bounds.
    #[must_use]
    pub fn date_at(&self, tree: &SurfaceTree, bounds: Size, point: Point) -> Option<NaiveDate> {
        if point.x < 0.0 || point.y < 0.0 || point.x > bounds.width || point.y > bounds.height {
            return None;
        }
        self.days
            .iter()
            .filter_map(|cell| {
                let center = tree.get(cell.surface)?.position();
                Some((cell.date, (center - point).hypot2()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(date, _)| date)
    }

    /// Page-local anchor of the day-number label for `date` (the point
    /// transitions align the week ruler to).
    #[must_use]
    pub fn point_for(&self, tree: &SurfaceTree, info: &CalendarInfo, date: NaiveDate) -> Option<Point> {
        let metrics = MonthMetrics::new(info);
        let cell = self.cell_for(date)?;
        let surface = tree.get(cell.surface)?;
        let center = surface.position();
        let local_text_y = info.style.geometry.inset / 2.0 + metrics.today_diameter / 2.0;
        let offset = local_text_y - surface.state.frame.height() / 2.0;
        Some(Point::new(center.x, center.y + offset))
    }
}

struct MonthModel {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    source: SharedSource,
    root: SurfaceId,
    cross: f64,
    marker: MarkerStyle,
}

impl core::fmt::Debug for MonthModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("MonthModel { .. }")
    }
}

impl MonthModel {
    fn build_page(&mut self, month: NaiveDate) -> MonthPage {
        let mut page = {
            let info = self.info.borrow();
            let mut tree = self.tree.borrow_mut();

            let surface = tree.insert(Some(self.root), Surface::default());
            let title = tree.insert(Some(surface), Surface::default());

            let day_count = arith::days_in_month(month);
            let mut days = Vec::with_capacity(day_count as usize);
            for day in 0..day_count {
                let Some(date) = arith::add_days(month, i64::from(day)) else {
                    continue;
                };
                let cell = tree.insert(Some(surface), Surface::default());
                let today = tree.insert(Some(cell), Surface::default());
                let text = tree.insert(Some(cell), Surface::default());
                let marker = tree.insert(Some(cell), Surface::default());
                if let Some(s) = tree.get_mut(text) {
                    s.state.z_index = 1;
                }
                days.push(DayCell {
                    date,
                    surface: cell,
                    text,
                    today,
                    marker,
                    event_count: 0,
                });
            }

            let rows = arith::week_rows_in_month(month, info.metrics.first_weekday);
            let lines = (0..rows)
                .map(|_| tree.insert(Some(surface), Surface::default()))
                .collect();

            let mut page = MonthPage {
                date: month,
                surface,
                title,
                days,
                lines,
            };
            layout_page(&mut tree, &info, &mut page, self.cross);
            page
        };
        refresh_events(&self.tree, &self.source, self.marker, &mut page);
        page
    }
}

/// Re-queries the month's events and updates the per-day marker state.
fn refresh_events(
    tree: &SharedTree,
    source: &SharedSource,
    marker: MarkerStyle,
    page: &mut MonthPage,
) {
    let Some(month_end) = arith::add_months(page.date, 1) else {
        return;
    };
    let interval = Interval::new(
        page.date.and_hms_opt(0, 0, 0).unwrap_or_default(),
        month_end.and_hms_opt(0, 0, 0).unwrap_or_default(),
    );
    let fetch = source.borrow().events_in(interval);
    let mut counts: Vec<usize> = Vec::new();
    fetch.start(|events| {
        for cell in &page.days {
            let day = Interval::day(cell.date);
            counts.push(
                events
                    .iter()
                    .filter(|event| event.interval.overlaps(&day))
                    .count(),
            );
        }
    });
    let mut tree = tree.borrow_mut();
    for (cell, count) in page.days.iter_mut().zip(counts) {
        cell.event_count = match marker {
            MarkerStyle::SingleDot => count.min(1),
            MarkerStyle::MultiDot => count.min(3),
        };
        if let Some(surface) = tree.get_mut(cell.marker) {
            surface.set_hidden(cell.event_count == 0);
        }
    }
}

/// Re-evaluates the today marker of every cell on the page.
fn refresh_today(info: &SharedInfo, tree: &SharedTree, page: &MonthPage) {
    let info = info.borrow();
    let mut tree = tree.borrow_mut();
    for cell in &page.days {
        if let Some(surface) = tree.get_mut(cell.today) {
            surface.set_hidden(!info.is_today(cell.date));
        }
    }
}

/// Positions the title, day cells, and week rules of one page.
fn layout_page(tree: &mut SurfaceTree, info: &CalendarInfo, page: &mut MonthPage, width: f64) {
    let metrics = MonthMetrics::new(info);
    let inset = info.style.geometry.inset;
    let half = inset / 2.0;
    let days_in_week = f64::from(info.metrics.days_in_week);
    let space = if width > 0.0 { width / days_in_week } else { 0.0 };
    let first_weekday = info.metrics.first_weekday;
    let today = info.now.date();

    let mut first_frame = Rect::ZERO;
    for cell in &page.days {
        if tree.get(cell.surface).is_some_and(Surface::is_frozen) {
            continue;
        }
        let (col, row) = grid_position(cell.date, first_weekday);
        let center = Point::new(
            space * 0.5 + f64::from(col) * space,
            inset + metrics.title_height + metrics.day_height * 0.5
                + f64::from(row) * metrics.day_height,
        );
        let size = Size::new(metrics.cell_width, metrics.day_height);
        if let Some(surface) = tree.get_mut(cell.surface) {
            surface.state.frame = Rect::from_center_size(center, size);
        }
        if cell.date == page.date {
            first_frame = Rect::from_center_size(center, size);
        }

        // Sublayers, in cell-local coordinates.
        let today_frame = Rect::new(
            (metrics.cell_width - metrics.today_diameter) / 2.0,
            half,
            (metrics.cell_width + metrics.today_diameter) / 2.0,
            half + metrics.today_diameter,
        );
        if let Some(surface) = tree.get_mut(cell.today) {
            surface.state.frame = today_frame;
            surface.set_hidden(cell.date != today);
        }
        if let Some(surface) = tree.get_mut(cell.text) {
            surface.state.frame = Rect::new(
                0.0,
                today_frame.y0,
                metrics.cell_width - half,
                today_frame.y1,
            );
        }
        if let Some(surface) = tree.get_mut(cell.marker) {
            surface.state.frame = Rect::new(
                0.0,
                metrics.day_height - metrics.marker_height,
                metrics.cell_width,
                metrics.day_height,
            );
        }
    }

    // Month title above the first day's column.
    let title_width = metrics.title_height * 4.0;
    let title_frame = Rect::new(
        (first_frame.x0).min(width - inset - title_width),
        first_frame.y0 - metrics.title_height,
        (first_frame.x0).min(width - inset - title_width) + title_width,
        first_frame.y0,
    );
    if let Some(surface) = tree.get_mut(page.title) {
        surface.state.frame = title_frame;
    }

    // One hairline per week row.
    let hairline = info.style.geometry.hairline;
    for (row, line) in page.lines.iter().enumerate() {
        let frames: Vec<Rect> = page
            .days
            .iter()
            .filter(|cell| arith::week_row(cell.date, first_weekday) as usize == row)
            .filter_map(|cell| tree.get(cell.surface).map(|s| s.state.frame))
            .collect();
        let Some(min_y) = frames.first().map(|f| f.y0) else {
            continue;
        };
        let min_x = if row == 0 {
            title_frame.x0
        } else {
            frames.iter().map(|f| f.x0).fold(f64::INFINITY, f64::min)
        };
        let max_x = frames.iter().map(|f| f.x1).fold(0.0_f64, f64::max);
        let x = if min_x < space { 0.0 } else { min_x };
        let x1 = if width - max_x < space { width } else { max_x };
        if let Some(surface) = tree.get_mut(*line) {
            surface.state.frame = Rect::new(x, min_y, x1, min_y + hairline);
        }
    }
}

impl AxisModel for MonthModel {
    type Page = MonthPage;

    fn initial_index(&self) -> i64 {
        let info = self.info.borrow();
        info.index_of(arith::start_of_month(info.date), arith::Unit::Months)
    }

    fn make_page(&mut self, index: i64) -> Self::Page {
        let month = self.info.borrow().date_of(arith::Unit::Months, index);
        self.build_page(arith::start_of_month(month))
    }

    fn extent(&self) -> Extent {
        Extent::Auto
    }

    fn measure(&mut self, _index: i64, page: &Self::Page, _viewport: f64) -> f64 {
        let info = self.info.borrow();
        let metrics = MonthMetrics::new(&info);
        page_height(&info, &metrics, page.date)
    }

    fn shown(&mut self, page: &Self::Page, _index: i64) {
        let date = {
            let info = self.info.borrow();
            let shift = (info.date - arith::start_of_month(info.date)).num_days();
            arith::add_days(page.date, shift).unwrap_or(page.date)
        };
        self.bus.push(Interaction::Shown {
            sender: SectionKind::Month,
            date,
        });
    }

    fn tap(&mut self, page: &mut Self::Page, _index: i64, point: Point) {
        let date = {
            let info = self.info.borrow();
            let tree = self.tree.borrow();
            let metrics = MonthMetrics::new(&info);
            let bounds = Size::new(self.cross, page_height(&info, &metrics, page.date));
            page.date_at(&tree, bounds, point)
        };
        if let Some(date) = date {
            self.bus.push(Interaction::Tapped {
                sender: SectionKind::Month,
                date,
            });
        }
    }

    fn retire(&mut self, _index: i64, page: Self::Page) {
        self.tree.borrow_mut().remove(page.surface);
    }
}

/// The month section controller.
#[derive(Debug)]
pub struct MonthSection {
    axis: DateAxis<MonthModel>,
    root: SurfaceId,
    bounds: Rect,
}

impl MonthSection {
    /// Creates the section, inserting its root under `parent`.
    #[must_use]
    pub fn new(
        info: SharedInfo,
        tree: SharedTree,
        bus: InteractionBus,
        source: SharedSource,
        marker: MarkerStyle,
        parent: SurfaceId,
    ) -> Self {
        let root = tree.borrow_mut().insert(Some(parent), Surface::default());
        let model = MonthModel {
            info,
            tree,
            bus,
            source,
            root,
            cross: 0.0,
            marker,
        };
        Self {
            axis: DateAxis::new(model, Orientation::Vertical),
            root,
            bounds: Rect::ZERO,
        }
    }

    /// The materialized page showing the month of `date`, if any.
    #[must_use]
    pub fn page_for(&self, date: NaiveDate) -> Option<&MonthPage> {
        let month = arith::start_of_month(date);
        self.axis
            .pages()
            .map(|entry| &entry.page)
            .find(|page| page.date == month)
    }

    /// Delivers a tap at a section-local point.
    pub fn tap(&mut self, point: Point) {
        self.axis.tap(point);
    }

    /// Scroll offset of the month list.
    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.axis.scroll_offset()
    }

    /// Viewport-local main-axis origin of the page showing `date`'s month.
    #[must_use]
    pub fn page_origin(&self, date: NaiveDate) -> Option<f64> {
        let index = {
            let info = self.axis.model().info.borrow();
            info.index_of(arith::start_of_month(date), arith::Unit::Months)
        };
        let (start, _) = self.axis.position(index)?;
        Some(start - self.axis.scroll_offset())
    }

    /// Scrolls by a host-driven delta and reports the newly centered month.
    pub fn scroll_by(&mut self, delta: f64) {
        let offset = self.axis.scroll_offset() + delta;
        self.axis.set_scroll_offset(offset);
        self.axis.announce();
        self.sync_page_frames();
    }

    fn sync_page_frames(&mut self) {
        let scroll = self.axis.scroll_offset();
        let width = self.bounds.width();
        let tree = self.axis.model().tree.clone();
        let mut tree = tree.borrow_mut();
        let mut ranges = Vec::new();
        for entry in self.axis.pages() {
            if let Some(range) = self.axis.position(entry.index) {
                ranges.push((entry.page.surface, range));
            }
        }
        for (surface, (start, end)) in ranges {
            if let Some(surface) = tree.get_mut(surface) {
                if surface.is_frozen() {
                    continue;
                }
                surface.state.frame = Rect::new(0.0, start - scroll, width, end - scroll);
            }
        }
    }
}

impl Section for MonthSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Month
    }

    fn root(&self) -> SurfaceId {
        self.root
    }

    fn reload(&mut self) {
        self.axis.reset();
        self.sync_page_frames();
    }

    fn update(&mut self) {
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let source = self.axis.model().source.clone();
        let marker = self.axis.model().marker;
        for entry in self.axis.pages_mut() {
            refresh_today(&info, &tree, &entry.page);
            refresh_events(&tree, &source, marker, &mut entry.page);
        }
    }

    fn scroll_to(&mut self, date: NaiveDate, animated: bool) {
        let index = {
            let info = self.axis.model().info.borrow();
            info.index_of(arith::start_of_month(date), arith::Unit::Months)
        };
        self.axis.scroll_to_index(index, animated);
        self.sync_page_frames();
    }

    fn layout(&mut self, bounds: Rect) {
        self.bounds = bounds;
        {
            let tree = self.axis.model().tree.clone();
            let mut tree = tree.borrow_mut();
            if let Some(surface) = tree.get_mut(self.root) {
                surface.state.frame = bounds;
            }
        }
        self.axis.model_mut().cross = bounds.width();
        self.axis.set_viewport(bounds.height(), bounds.width());
        self.axis.set_reserve(bounds.height() / 2.0);

        // Re-lay out materialized pages at the new width.
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let width = bounds.width();
        {
            let info = info.borrow();
            let mut tree = tree.borrow_mut();
            for entry in self.axis.pages_mut() {
                layout_page(&mut tree, &info, &mut entry.page, width);
            }
        }
        self.sync_page_frames();
    }
}

impl RegularSection for MonthSection {
    fn display(&self) -> DisplayInfo {
        let info = self.axis.model().info.borrow();
        DisplayInfo {
            date: Some(info.date),
            shows_month: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use almanac_events::StaticSource;
    use almanac_info::{CalendarConfig, CalendarInfo};

    use super::*;

    fn fixture() -> (MonthSection, SharedInfo, SharedTree, InteractionBus) {
        let mut calendar = CalendarInfo::new(CalendarConfig::default());
        calendar.date = NaiveDate::from_ymd_opt(2021, 11, 10).unwrap();
        let info: SharedInfo = Rc::new(RefCell::new(calendar));
        let tree: SharedTree = Rc::new(RefCell::new(SurfaceTree::new()));
        let bus = InteractionBus::new();
        let source: SharedSource = Rc::new(RefCell::new(StaticSource::new(Vec::new())));
        let parent = tree.borrow_mut().insert(None, Surface::default());
        let section = MonthSection::new(
            info.clone(),
            tree.clone(),
            bus.clone(),
            source,
            MarkerStyle::SingleDot,
            parent,
        );
        (section, info, tree, bus)
    }

    #[test]
    fn thirty_day_month_starting_monday_grid_positions() {
        // November 2021: 30 days, starts on a Monday.
        let first_weekday = 2;
        let day1 = NaiveDate::from_ymd_opt(2021, 11, 1).unwrap();
        let day8 = NaiveDate::from_ymd_opt(2021, 11, 8).unwrap();
        assert_eq!(grid_position(day1, first_weekday), (0, 0));
        assert_eq!(grid_position(day8, first_weekday), (0, 1));
    }

    #[test]
    fn materialized_page_places_cells_on_the_grid() {
        let (mut section, info, tree, _bus) = fixture();
        section.layout(Rect::new(0.0, 0.0, 350.0, 600.0));

        let page = section
            .page_for(NaiveDate::from_ymd_opt(2021, 11, 10).unwrap())
            .expect("centered month page materialized");
        assert_eq!(page.date, NaiveDate::from_ymd_opt(2021, 11, 1).unwrap());

        let info = info.borrow();
        let metrics = MonthMetrics::new(&info);
        let tree = tree.borrow();
        let space = 350.0 / 7.0;

        let day1 = page.cell_for(page.date).unwrap();
        let center1 = tree.get(day1.surface).unwrap().position();
        assert!((center1.x - space * 0.5).abs() < 1e-9);

        let day8 = page
            .cell_for(NaiveDate::from_ymd_opt(2021, 11, 8).unwrap())
            .unwrap();
        let center8 = tree.get(day8.surface).unwrap().position();
        assert!((center8.x - space * 0.5).abs() < 1e-9);
        assert!((center8.y - center1.y - metrics.day_height).abs() < 1e-9);
    }

    #[test]
    fn tap_resolves_nearest_cell_and_reports_it() {
        let (mut section, _info, tree, bus) = fixture();
        section.layout(Rect::new(0.0, 0.0, 350.0, 600.0));

        let page = section
            .page_for(NaiveDate::from_ymd_opt(2021, 11, 1).unwrap())
            .unwrap();
        let cell = page
            .cell_for(NaiveDate::from_ymd_opt(2021, 11, 17).unwrap())
            .unwrap();
        let center = tree.borrow().get(cell.surface).unwrap().position();
        let page_offset = section.axis.position(section.axis.centered_index().unwrap());
        let (start, _) = page_offset.unwrap();

        section.tap(Point::new(center.x, center.y + start - section.scroll_offset()));
        let drained = bus.drain();
        assert!(drained.contains(&Interaction::Tapped {
            sender: SectionKind::Month,
            date: NaiveDate::from_ymd_opt(2021, 11, 17).unwrap(),
        }));
    }

    #[test]
    fn scroll_to_other_month_keeps_day_shift() {
        let (mut section, _info, _tree, bus) = fixture();
        section.layout(Rect::new(0.0, 0.0, 350.0, 600.0));
        let _ = bus.drain();

        section.scroll_to(NaiveDate::from_ymd_opt(2022, 2, 1).unwrap(), false);
        assert!(
            section
                .page_for(NaiveDate::from_ymd_opt(2022, 2, 1).unwrap())
                .is_some()
        );
    }

    #[test]
    fn retired_pages_release_their_surfaces() {
        let (mut section, _info, tree, _bus) = fixture();
        section.layout(Rect::new(0.0, 0.0, 350.0, 600.0));
        let populated = tree.borrow().len();

        section.scroll_to(NaiveDate::from_ymd_opt(2035, 6, 1).unwrap(), false);
        let after = tree.borrow().len();
        // The window moved wholesale; the surface count stays in the same
        // order of magnitude instead of accumulating every visited month.
        assert!(after < populated * 2, "surfaces must be reclaimed");
    }
}
