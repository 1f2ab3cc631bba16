// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Week ruler: a horizontally paged strip of week rows.
//!
//! One page is one display week, seven day cells wide. The strip appears in
//! two places: as the compact day section's toolbar ruler (paging in lock
//! step with the day pager) and as the regular navigator's week section /
//! toolbar ruler. A tap or settle on the strip reports a `Shown`
//! interaction: ruler navigation presents a date, it does not drill down.

use almanac_axis::{AxisModel, DateAxis, Extent, Orientation};
use almanac_info::arith;
use almanac_surface::{Surface, SurfaceId};
use chrono::NaiveDate;
use kurbo::{Point, Rect, Size};

use crate::{
    DisplayInfo, Interaction, InteractionBus, RegularSection, Section, SectionKind, SharedInfo,
    SharedTree,
};

/// One day cell of a week row.
#[derive(Copy, Clone, Debug)]
pub struct WeekCell {
    /// The date the cell shows.
    pub date: NaiveDate,
    /// Cell surface.
    pub surface: SurfaceId,
}

/// One materialized week page.
#[derive(Debug)]
pub struct WeekPage {
    /// First day of the display week.
    pub start: NaiveDate,
    /// Page surface.
    pub surface: SurfaceId,
    /// Seven day cells in week order.
    pub cells: Vec<WeekCell>,
}

impl WeekPage {
    /// Nearest cell to a page-local point.
    #[must_use]
    pub fn cell_at(
        &self,
        tree: &almanac_surface::SurfaceTree,
        bounds: Size,
        point: Point,
    ) -> Option<&WeekCell> {
        if point.x < 0.0 || point.y < 0.0 || point.x > bounds.width || point.y > bounds.height {
            return None;
        }
        self.cells
            .iter()
            .filter_map(|cell| {
                let center = tree.get(cell.surface)?.position();
                Some((cell, (center - point).hypot2()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(cell, _)| cell)
    }

    /// The cell showing `date`, if it belongs to this week.
    #[must_use]
    pub fn cell_for(&self, date: NaiveDate) -> Option<&WeekCell> {
        self.cells.iter().find(|cell| cell.date == date)
    }
}

struct WeekModel {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    sender: SectionKind,
    root: SurfaceId,
    cross: f64,
}

impl core::fmt::Debug for WeekModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("WeekModel { .. }")
    }
}

impl AxisModel for WeekModel {
    type Page = WeekPage;

    fn initial_index(&self) -> i64 {
        let info = self.info.borrow();
        arith::offset_weeks(info.date, info.zero, info.metrics.first_weekday)
    }

    fn make_page(&mut self, index: i64) -> Self::Page {
        let (start, days_in_week) = {
            let info = self.info.borrow();
            let start = arith::week_at(info.zero, info.metrics.first_weekday, index)
                .unwrap_or_else(|| {
                    log::warn!("week index {index} overflowed; substituting the current week");
                    arith::start_of_week(info.now.date(), info.metrics.first_weekday)
                });
            (start, info.metrics.days_in_week)
        };

        let mut tree = self.tree.borrow_mut();
        let surface = tree.insert(Some(self.root), Surface::default());
        let cells = (0..days_in_week)
            .filter_map(|slot| {
                let date = arith::add_days(start, i64::from(slot))?;
                Some(WeekCell {
                    date,
                    surface: tree.insert(Some(surface), Surface::default()),
                })
            })
            .collect();
        WeekPage {
            start,
            surface,
            cells,
        }
    }

    fn extent(&self) -> Extent {
        Extent::Fill
    }

    fn shown(&mut self, page: &Self::Page, _index: i64) {
        let date = {
            let info = self.info.borrow();
            let shift =
                (info.date - arith::start_of_week(info.date, info.metrics.first_weekday)).num_days();
            arith::add_days(page.start, shift).unwrap_or(page.start)
        };
        self.bus.push(Interaction::Shown {
            sender: self.sender,
            date,
        });
    }

    fn tap(&mut self, page: &mut Self::Page, _index: i64, point: Point) {
        let date = {
            let tree = self.tree.borrow();
            let bounds = Size::new(self.cross, f64::INFINITY);
            page.cell_at(&tree, bounds, point).map(|cell| cell.date)
        };
        if let Some(date) = date {
            // Ruler taps present a date; they do not drill into a section.
            self.bus.push(Interaction::Shown {
                sender: self.sender,
                date,
            });
        }
    }

    fn retire(&mut self, _index: i64, page: Self::Page) {
        self.tree.borrow_mut().remove(page.surface);
    }
}

/// The week ruler strip.
#[derive(Debug)]
pub struct WeekStrip {
    axis: DateAxis<WeekModel>,
    root: SurfaceId,
    bounds: Rect,
}

impl WeekStrip {
    /// Creates a strip reporting interactions as `sender`, inserted under
    /// `parent`.
    #[must_use]
    pub fn new(
        info: SharedInfo,
        tree: SharedTree,
        bus: InteractionBus,
        sender: SectionKind,
        parent: SurfaceId,
    ) -> Self {
        let root = tree.borrow_mut().insert(Some(parent), Surface::default());
        let model = WeekModel {
            info,
            tree,
            bus,
            sender,
            root,
            cross: 0.0,
        };
        Self {
            axis: DateAxis::new(model, Orientation::Horizontal),
            root,
            bounds: Rect::ZERO,
        }
    }

    /// Root surface of the strip.
    #[must_use]
    pub fn root(&self) -> SurfaceId {
        self.root
    }

    /// Natural height of the strip.
    #[must_use]
    pub fn natural_height(&self) -> f64 {
        let info = self.axis.model().info.borrow();
        (info.style.fonts.ruler_day.line_height + info.style.geometry.inset * 1.5).ceil()
    }

    /// The centered week page, if materialized.
    #[must_use]
    pub fn centered_page(&self) -> Option<&WeekPage> {
        let index = self.axis.centered_index()?;
        self.axis.page_at(index).map(|entry| &entry.page)
    }

    /// The materialized page containing `date`, if any.
    #[must_use]
    pub fn page_for(&self, date: NaiveDate) -> Option<&WeekPage> {
        let start = {
            let info = self.axis.model().info.borrow();
            arith::start_of_week(date, info.metrics.first_weekday)
        };
        self.axis
            .pages()
            .map(|entry| &entry.page)
            .find(|page| page.start == start)
    }

    /// Scrolls so the week containing `date` is presented.
    pub fn scroll_to(&mut self, date: NaiveDate, animated: bool) {
        let index = {
            let info = self.axis.model().info.borrow();
            arith::offset_weeks(date, info.zero, info.metrics.first_weekday)
        };
        self.axis.scroll_to_index(index, animated);
        self.sync_frames();
    }

    /// Delivers a tap at a strip-local point.
    pub fn tap(&mut self, point: Point) {
        self.axis.tap(point);
    }

    /// Drops and rebuilds all pages.
    pub fn reload(&mut self) {
        self.axis.reset();
        self.sync_frames();
    }

    /// Refreshes cell highlight state in place.
    pub fn update(&mut self) {
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let info = info.borrow();
        let mut tree = tree.borrow_mut();
        for entry in self.axis.pages() {
            for cell in &entry.page.cells {
                if let Some(surface) = tree.get_mut(cell.surface) {
                    // The selected day's cell rises above its row siblings so
                    // the highlight disc can render behind its label.
                    surface.state.z_index = i32::from(cell.date == info.date);
                }
            }
        }
    }

    /// Lays the strip out in `bounds` (parent coordinates).
    pub fn layout(&mut self, bounds: Rect) {
        self.bounds = bounds;
        {
            let tree = self.axis.model().tree.clone();
            let mut tree = tree.borrow_mut();
            if let Some(surface) = tree.get_mut(self.root) {
                surface.state.frame = bounds;
            }
        }
        self.axis.model_mut().cross = bounds.width();
        self.axis.set_viewport(bounds.width(), bounds.height());
        self.layout_cells();
        self.sync_frames();
    }

    fn layout_cells(&mut self) {
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let info = info.borrow();
        let mut tree = tree.borrow_mut();

        let width = self.bounds.width();
        let height = self.bounds.height();
        let days = f64::from(info.metrics.days_in_week);
        let space = if width > 0.0 { width / days } else { 0.0 };
        let diameter = info.style.fonts.ruler_day.line_height + info.style.geometry.inset / 2.0;

        for entry in self.axis.pages() {
            for (slot, cell) in entry.page.cells.iter().enumerate() {
                if let Some(surface) = tree.get_mut(cell.surface) {
                    let center =
                        Point::new(space * 0.5 + slot as f64 * space, height / 2.0);
                    surface.state.frame =
                        Rect::from_center_size(center, Size::new(diameter, diameter));
                }
            }
        }
    }

    fn sync_frames(&mut self) {
        self.layout_cells();
        let scroll = self.axis.scroll_offset();
        let height = self.bounds.height();
        let tree = self.axis.model().tree.clone();
        let mut tree = tree.borrow_mut();
        let mut frames = Vec::new();
        for entry in self.axis.pages() {
            if let Some((start, end)) = self.axis.position(entry.index) {
                frames.push((entry.page.surface, start, end));
            }
        }
        for (surface, start, end) in frames {
            if let Some(surface) = tree.get_mut(surface) {
                if surface.is_frozen() {
                    continue;
                }
                surface.state.frame = Rect::new(start - scroll, 0.0, end - scroll, height);
            }
        }
    }
}

/// The regular navigator's week section: a full-width ruler strip.
#[derive(Debug)]
pub struct WeekSection {
    strip: WeekStrip,
    root: SurfaceId,
}

impl WeekSection {
    /// Creates the section, inserting its root under `parent`.
    #[must_use]
    pub fn new(info: SharedInfo, tree: SharedTree, bus: InteractionBus, parent: SurfaceId) -> Self {
        let root = tree.borrow_mut().insert(Some(parent), Surface::default());
        let strip = WeekStrip::new(info, tree, bus, SectionKind::Week, root);
        Self { strip, root }
    }
}

impl Section for WeekSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Week
    }

    fn root(&self) -> SurfaceId {
        self.root
    }

    fn reload(&mut self) {
        self.strip.reload();
    }

    fn update(&mut self) {
        self.strip.update();
    }

    fn scroll_to(&mut self, date: NaiveDate, animated: bool) {
        self.strip.scroll_to(date, animated);
    }

    fn layout(&mut self, bounds: Rect) {
        let tree = self.strip.axis.model().tree.clone();
        if let Some(surface) = tree.borrow_mut().get_mut(self.root) {
            surface.state.frame = bounds;
        }
        let height = self.strip.natural_height();
        self.strip
            .layout(Rect::new(0.0, 0.0, bounds.width(), height));
    }
}

impl RegularSection for WeekSection {
    fn display(&self) -> DisplayInfo {
        let info = self.strip.axis.model().info.borrow();
        DisplayInfo {
            date: Some(info.date),
            shows_month: true,
        }
    }

    fn ruler(&mut self) -> Option<&mut WeekStrip> {
        Some(&mut self.strip)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use almanac_info::{CalendarConfig, CalendarInfo};
    use almanac_surface::SurfaceTree;

    use super::*;

    fn fixture() -> (WeekStrip, InteractionBus, SharedTree) {
        let mut calendar = CalendarInfo::new(CalendarConfig::default());
        calendar.date = NaiveDate::from_ymd_opt(2021, 6, 9).unwrap();
        let info: SharedInfo = Rc::new(RefCell::new(calendar));
        let tree: SharedTree = Rc::new(RefCell::new(SurfaceTree::new()));
        let bus = InteractionBus::new();
        let parent = tree.borrow_mut().insert(None, Surface::default());
        let strip = WeekStrip::new(info, tree.clone(), bus.clone(), SectionKind::Week, parent);
        (strip, bus, tree)
    }

    #[test]
    fn pages_cover_full_display_weeks() {
        let (mut strip, _bus, _tree) = fixture();
        strip.layout(Rect::new(0.0, 0.0, 350.0, 44.0));

        let page = strip.centered_page().expect("centered week page");
        // 2021-06-09 is a Wednesday; the Monday-first week starts on 06-07.
        assert_eq!(page.start, NaiveDate::from_ymd_opt(2021, 6, 7).unwrap());
        assert_eq!(page.cells.len(), 7);
        assert_eq!(
            page.cells.last().unwrap().date,
            NaiveDate::from_ymd_opt(2021, 6, 13).unwrap(),
        );
    }

    #[test]
    fn tap_reports_shown_for_the_nearest_day() {
        let (mut strip, bus, tree) = fixture();
        strip.layout(Rect::new(0.0, 0.0, 350.0, 44.0));
        let _ = bus.drain();

        let page = strip.centered_page().unwrap();
        let cell = page
            .cell_for(NaiveDate::from_ymd_opt(2021, 6, 11).unwrap())
            .unwrap();
        let center = tree.borrow().get(cell.surface).unwrap().position();
        let (start, _) = strip
            .axis
            .position(strip.axis.centered_index().unwrap())
            .unwrap();

        strip.tap(Point::new(center.x + start - strip.axis.scroll_offset(), center.y));
        assert!(bus.drain().contains(&Interaction::Shown {
            sender: SectionKind::Week,
            date: NaiveDate::from_ymd_opt(2021, 6, 11).unwrap(),
        }));
    }

    #[test]
    fn scroll_to_distant_week_lands_on_its_page() {
        let (mut strip, _bus, _tree) = fixture();
        strip.layout(Rect::new(0.0, 0.0, 350.0, 44.0));

        let target = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        strip.scroll_to(target, false);
        let page = strip.centered_page().unwrap();
        assert_eq!(page.start, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }
}
