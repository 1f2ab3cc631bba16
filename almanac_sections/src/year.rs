// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Year section: a vertical list of year grids rendered to raster surfaces.
//!
//! A year page shows up to `12 × ~35` day cells. Materializing those as live
//! surfaces would dwarf the rest of the tree, so the year view renders each
//! page into a single offscreen bitmap and publishes its hit-test geometry
//! as plain data ([`YearCoordinates`]) instead of view objects. This
//! duality (raster page, coordinates-as-data) is a deliberate
//! architectural choice, and the transition engine relies on it: month↔year
//! morphs read day centers and month plate frames straight from the
//! coordinates.
//!
//! Text is compressed with a size-dependent `fonts_ratio`, soft-clamped by
//! the hyperbolic-tangent [`elastic`] rubber band rather than a hard clamp,
//! so shrinking containers never snap the type size at the boundary.
//!
//! Rasterization runs on a background worker (see [`crate::raster`]);
//! results are published on the coordinating thread with a staleness check
//! against the geometry the job was submitted for.

use almanac_info::{CalendarInfo, FontMetrics, arith};
use almanac_surface::{Surface, SurfaceId};
use chrono::{Datelike, NaiveDate};
use kurbo::{Point, Rect, Size};
use peniko::Color;

use almanac_axis::{AxisModel, DateAxis, Extent, Orientation};

use crate::raster::{Bitmap, RenderJob, RenderWorker};
use crate::{
    DisplayInfo, Interaction, InteractionBus, RegularSection, Section, SectionKind, SharedInfo,
    SharedTree,
};

/// Rubber-band soft clamp.
///
/// Inside `[min, max]` the value passes through unchanged. Outside, the
/// excursion is compressed through `tanh` so the result approaches (but
/// never reaches) `span` beyond the violated bound, with no visual snapping at
/// the boundary.
#[must_use]
pub fn elastic(value: f64, min: f64, max: f64, span: f64) -> f64 {
    if value < min {
        return min - span * ((min - value) / span).tanh();
    }
    if value > max {
        return max + span * ((value - max) / span).tanh();
    }
    value
}

/// Horizontal alignment of a text run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextAlign {
    /// Align to the leading edge.
    Leading,
    /// Center within the rect.
    Center,
}

/// One drawing operation of a year scene.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneOp {
    /// A text run.
    Text {
        /// Placement rect.
        rect: Rect,
        /// Rendered string.
        content: String,
        /// Font metrics the run was measured with.
        metrics: FontMetrics,
        /// Fill color.
        color: Color,
        /// Alignment within the rect.
        align: TextAlign,
    },
    /// A filled disc (today marker).
    Disc {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
        /// Fill color.
        color: Color,
    },
    /// A filled rect (hairline rules).
    Rule {
        /// The rect.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
}

/// A recorded year page: target size plus draw operations in paint order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YearScene {
    /// Raster target size.
    pub size: Size,
    /// Operations in paint order.
    pub ops: Vec<SceneOp>,
}

impl YearScene {
    /// An empty scene.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One month plate of the year grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MonthPlate {
    /// Start of the month.
    pub date: NaiveDate,
    /// Plate frame in page coordinates.
    pub frame: Rect,
    /// Frame of the weekday header row (the hole a transition mask keeps
    /// visible). Zero when the compressed layout drops the header.
    pub hole: Rect,
}

/// Hit-test and transition geometry of one rendered year page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YearCoordinates {
    /// Day-label centers, one per day of the year.
    pub days: Vec<(NaiveDate, Point)>,
    /// Month title frames.
    pub titles: Vec<(NaiveDate, Rect)>,
    /// Month plate frames.
    pub months: Vec<MonthPlate>,
}

impl YearCoordinates {
    /// Nearest day to a page-local point, within `bounds`.
    #[must_use]
    pub fn date_at(&self, bounds: Size, point: Point) -> Option<NaiveDate> {
        if point.x < 0.0 || point.y < 0.0 || point.x > bounds.width || point.y > bounds.height {
            return None;
        }
        self.days
            .iter()
            .map(|(date, center)| (*date, (*center - point).hypot2()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(date, _)| date)
    }

    /// The plate of the month containing `date`.
    #[must_use]
    pub fn month_plate(&self, date: NaiveDate) -> Option<&MonthPlate> {
        let month = arith::start_of_month(date);
        self.months.iter().find(|plate| plate.date == month)
    }

    /// The day center for `date`.
    #[must_use]
    pub fn day_center(&self, date: NaiveDate) -> Option<Point> {
        self.days
            .iter()
            .find(|(day, _)| *day == date)
            .map(|(_, center)| *center)
    }
}

/// Size-derived layout of one year page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct YearGeometry {
    /// The container size the geometry was computed for. The staleness guard
    /// compares this against the page's current size before publishing a
    /// background render.
    pub reference: Size,
    /// Resulting page size (width of the container, derived height).
    pub size: Size,
    /// Month plate grid columns.
    pub cols: u32,
    /// Month plate grid rows.
    pub rows: u32,
    /// Year heading line height (unscaled).
    pub year_line_height: f64,
    /// Horizontal / vertical compression of month plates.
    pub ratio: (f64, f64),
    /// Elastic-clamped font compression.
    pub fonts_ratio: f64,
    /// Today marker radius at the compressed font size.
    pub marker_radius: f64,
    /// Compressed month plate size.
    pub month_size: Size,
    /// Inter-plate spacing.
    pub space: Size,
}

impl YearGeometry {
    /// Computes the geometry for a container of `size`.
    ///
    /// `regular_class` widens the grid to four columns in landscape and
    /// allows the taller fitted layout in portrait, the way size-class
    /// regular environments do.
    #[must_use]
    pub fn new(info: &CalendarInfo, size: Size, regular_class: bool) -> Self {
        if size.width <= 0.0 || size.height <= 0.0 {
            return Self {
                reference: size,
                ..Self::default()
            };
        }

        let inset = info.style.geometry.inset;
        let landscape = size.width > size.height;
        let wide = regular_class && landscape && size.width > 320.0;
        let tall = regular_class && !landscape && size.height > 320.0;

        let days_in_week = f64::from(info.metrics.days_in_week);
        let weeks_in_month = f64::from(info.metrics.weeks_in_month);
        let month_line_height = info.style.fonts.month_title.line_height.ceil();
        let month_x_height = info.style.fonts.month_title.x_height.ceil();
        let weekday_line_height = info.style.fonts.year_weekday.line_height.ceil();
        let day_line_height = info.style.fonts.month_day.line_height.ceil();

        let preferred = Size::new(
            (days_in_week * day_line_height * 1.4).ceil(),
            (month_line_height
                + month_x_height
                + weekday_line_height
                + weeks_in_month * day_line_height * 1.5)
                .ceil(),
        );

        let cols: u32 = if wide { 4 } else { 3 };
        let row_count = info.metrics.months_in_year.div_ceil(cols);
        let rows = f64::from(row_count);

        let spaces_x = f64::from(cols) + 1.0;
        let spaces_y = rows + 0.5;
        let year_line_height = info.style.fonts.year_year.line_height;

        let fitted = Size::new(
            (size.width - spaces_x * inset) / f64::from(cols),
            (size.height - spaces_y * inset - year_line_height) / rows,
        );

        let ratio_width = (fitted.width / preferred.width).min(1.0);
        let ratio_height = if (wide || tall) && fitted.height / preferred.height >= 0.75 {
            (size.height - inset * spaces_y) / (year_line_height + preferred.height * rows)
        } else {
            ratio_width
        };
        let ratio = (ratio_width, ratio_width.min(ratio_height));

        let fonts_ratio = elastic(ratio.0.min(ratio.1), 1.0, 1.0, 0.75);
        let day_font = info.style.fonts.month_day.scaled(fonts_ratio);
        let marker_radius = day_font.line_height * 0.7;

        let month_size = Size::new(preferred.width * ratio.0, preferred.height * ratio.1);
        let space = Size::new(
            ((size.width - month_size.width * f64::from(cols)) / spaces_x)
                .min(inset * 2.0)
                .max(inset / 2.0),
            ((size.height - month_size.height * rows - year_line_height * ratio.1) / spaces_y)
                .min(inset * 2.0)
                .max(inset / 2.0),
        );

        let height = space.height
            + year_line_height * ratio.1
            + space.height * 0.5
            + rows * month_size.height
            + (rows - 1.0) * space.height;

        Self {
            reference: size,
            size: Size::new(size.width, height.ceil()),
            cols,
            rows: row_count,
            year_line_height,
            ratio,
            fonts_ratio,
            marker_radius,
            month_size,
            space,
        }
    }

    /// Records the scene and geometry data for the year starting at
    /// `start_of_year`.
    #[must_use]
    pub fn build(&self, info: &CalendarInfo, start_of_year: NaiveDate) -> (YearScene, YearCoordinates) {
        let mut scene = YearScene {
            size: self.size,
            ops: Vec::new(),
        };
        let mut coordinates = YearCoordinates::default();
        if self.size.width <= 0.0 || self.size.height <= 0.0 {
            return (scene, coordinates);
        }

        let style = &info.style;
        let now = info.now.date();
        let days_in_week = info.metrics.days_in_week;
        let weeks_in_month = f64::from(info.metrics.weeks_in_month);
        let first_weekday = info.metrics.first_weekday;

        let inset_x = (self.size.width
            - self.month_size.width * f64::from(self.cols)
            - self.space.width * (f64::from(self.cols) - 1.0))
            / 2.0;

        // Year heading.
        let year_font = style.fonts.year_year.scaled(self.ratio.1);
        scene.ops.push(SceneOp::Text {
            rect: Rect::new(
                inset_x,
                self.space.height,
                self.size.width - inset_x,
                self.space.height + year_font.line_height,
            ),
            content: info.label(&info.config.formats.year, start_of_year),
            metrics: year_font,
            color: if start_of_year.year() == now.year() {
                style.colors.tint
            } else {
                style.colors.primary
            },
            align: TextAlign::Leading,
        });
        scene.ops.push(SceneOp::Rule {
            rect: Rect::new(
                inset_x,
                self.space.height + self.year_line_height * self.ratio.1,
                self.size.width - inset_x,
                self.space.height + self.year_line_height * self.ratio.1 + style.geometry.hairline,
            ),
            color: style.colors.separator,
        });

        let grid_top =
            self.space.height + self.year_line_height * self.ratio.1 + self.space.height * 0.5;
        let compressed = self.ratio.1 < 0.75;

        let month_font = style.fonts.month_title.scaled(self.fonts_ratio);
        let weekday_font = style.fonts.year_weekday.scaled(self.fonts_ratio);
        let day_font = style.fonts.month_day.scaled(self.fonts_ratio);

        let space_x = self.month_size.width / f64::from(days_in_week);
        let month_inset = space_x / 2.0 - weekday_font.line_height / 4.0;
        let day_width = (self.month_size.width - month_inset * 2.0) / f64::from(days_in_week);

        for month_index in 0..info.metrics.months_in_year {
            let Some(start_of_month) = arith::add_months(start_of_year, i64::from(month_index))
            else {
                return (YearScene::empty(), YearCoordinates::default());
            };

            let origin = Point::new(
                (f64::from(month_index % self.cols) * (self.month_size.width + self.space.width)
                    + inset_x)
                    .ceil(),
                (f64::from(month_index / self.cols) * (self.month_size.height + self.space.height)
                    + grid_top)
                    .ceil(),
            );
            let mut shift = 0.0;

            // Month title.
            let title_rect = Rect::new(
                origin.x + month_inset,
                origin.y + shift,
                origin.x + self.month_size.width - month_inset,
                origin.y + shift + month_font.line_height,
            );
            coordinates.titles.push((start_of_month, title_rect));
            scene.ops.push(SceneOp::Text {
                rect: title_rect,
                content: info.label(&info.config.formats.month, start_of_month),
                metrics: month_font,
                color: if start_of_month.year() == now.year() && start_of_month.month() == now.month()
                {
                    style.colors.tint
                } else {
                    style.colors.primary
                },
                align: TextAlign::Leading,
            });

            shift += month_font.line_height;
            if !compressed {
                shift += month_font.x_height;
            }

            // Weekday header row.
            let mut hole: Option<Rect> = None;
            if !compressed {
                for weekday_index in 0..days_in_week {
                    let number = (first_weekday - 1 + weekday_index) % 7 + 1;
                    let Some(day) = reference_weekday(start_of_month, first_weekday, number) else {
                        continue;
                    };
                    let label: String = info.label("%a", day).chars().take(1).collect();
                    let rect = Rect::new(
                        origin.x + space_x / 2.0 + f64::from(weekday_index) * space_x
                            - day_width / 2.0,
                        origin.y + shift,
                        origin.x + space_x / 2.0 + f64::from(weekday_index) * space_x
                            + day_width / 2.0,
                        origin.y + shift + weekday_font.line_height,
                    );
                    scene.ops.push(SceneOp::Text {
                        rect,
                        content: label,
                        metrics: weekday_font,
                        color: style.colors.primary,
                        align: TextAlign::Center,
                    });
                    hole = Some(match hole {
                        Some(acc) => acc.union(rect),
                        None => rect,
                    });
                }
                shift += weekday_font.line_height;
            }

            coordinates.months.push(MonthPlate {
                date: start_of_month,
                frame: Rect::from_origin_size(origin, self.month_size).expand(),
                hole: hole.unwrap_or(Rect::ZERO),
            });

            // Day grid.
            let space_y = (self.month_size.height - shift) / weeks_in_month;
            for day_index in 0..arith::days_in_month(start_of_month) {
                let Some(date) = arith::add_days(start_of_month, i64::from(day_index)) else {
                    return (YearScene::empty(), YearCoordinates::default());
                };
                let col = arith::week_position(date, first_weekday);
                let row = arith::week_row(date, first_weekday);
                let center = Point::new(
                    origin.x + space_x / 2.0 + f64::from(col) * space_x,
                    origin.y + space_y / 2.0 + f64::from(row) * space_y + shift,
                );
                coordinates.days.push((date, center));

                let today = date == now;
                if today {
                    scene.ops.push(SceneOp::Disc {
                        center,
                        radius: self.marker_radius,
                        color: style.colors.tint,
                    });
                }
                scene.ops.push(SceneOp::Text {
                    rect: Rect::new(
                        center.x - day_width / 2.0,
                        center.y - day_font.line_height / 2.0,
                        center.x + day_width / 2.0,
                        center.y + day_font.line_height / 2.0,
                    ),
                    content: info.label(&info.config.formats.day, date),
                    metrics: day_font,
                    color: if today {
                        style.colors.inverted
                    } else if info.is_weekend(date) {
                        style.colors.weekend
                    } else {
                        style.colors.primary
                    },
                    align: TextAlign::Center,
                });
            }
        }

        (scene, coordinates)
    }
}

/// Finds the date in the first grid week of `month` that falls on the given
/// 1-based weekday number.
fn reference_weekday(month: NaiveDate, first_weekday: u32, number: u32) -> Option<NaiveDate> {
    let week_start = arith::start_of_week(month, first_weekday);
    let shift = (number + 7 - first_weekday) % 7;
    arith::add_days(week_start, i64::from(shift))
}

/// One materialized year page.
#[derive(Debug)]
pub struct YearPage {
    /// Start of the year this page shows.
    pub date: NaiveDate,
    /// Raster-backed page surface.
    pub surface: SurfaceId,
    /// Geometry the page was last laid out with.
    pub geometry: YearGeometry,
    /// Published hit-test geometry (empty until the first publish).
    pub coordinates: YearCoordinates,
    /// Published raster, if a rasterizer is attached.
    pub bitmap: Option<Bitmap>,
}

struct YearModel {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    root: SurfaceId,
    cross: f64,
    regular_class: bool,
    worker: Option<RenderWorker>,
}

impl core::fmt::Debug for YearModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("YearModel { .. }")
    }
}

impl YearModel {
    fn geometry_for(&self, viewport: f64) -> YearGeometry {
        let info = self.info.borrow();
        YearGeometry::new(&info, Size::new(self.cross, viewport), self.regular_class)
    }

    fn submit(&self, page: &YearPage, index: i64) {
        let (scene, coordinates) = {
            let info = self.info.borrow();
            page.geometry.build(&info, page.date)
        };
        if let Some(worker) = &self.worker {
            worker.submit(RenderJob {
                index,
                reference: page.geometry.reference,
                scene,
                coordinates,
            });
        }
    }
}

impl AxisModel for YearModel {
    type Page = YearPage;

    fn initial_index(&self) -> i64 {
        let info = self.info.borrow();
        info.index_of(arith::start_of_year(info.date), arith::Unit::Years)
    }

    fn make_page(&mut self, index: i64) -> Self::Page {
        let date = {
            let info = self.info.borrow();
            arith::start_of_year(info.date_of(arith::Unit::Years, index))
        };
        let surface = self
            .tree
            .borrow_mut()
            .insert(Some(self.root), Surface::default());
        // Geometry and the first render are driven by the owning section's
        // layout pass, which re-derives geometry and submits render jobs.
        YearPage {
            date,
            surface,
            geometry: YearGeometry::default(),
            coordinates: YearCoordinates::default(),
            bitmap: None,
        }
    }

    fn extent(&self) -> Extent {
        Extent::Auto
    }

    fn measure(&mut self, _index: i64, _page: &Self::Page, viewport: f64) -> f64 {
        self.geometry_for(viewport).size.height.max(1.0)
    }

    fn shown(&mut self, page: &Self::Page, _index: i64) {
        let date = {
            let info = self.info.borrow();
            let shift = (info.date - arith::start_of_year(info.date)).num_days();
            arith::add_days(page.date, shift).unwrap_or(page.date)
        };
        self.bus.push(Interaction::Shown {
            sender: SectionKind::Year,
            date,
        });
    }

    fn tap(&mut self, page: &mut Self::Page, _index: i64, point: Point) {
        let bounds = page.geometry.size;
        if let Some(date) = page.coordinates.date_at(bounds, point) {
            self.bus.push(Interaction::Tapped {
                sender: SectionKind::Year,
                date,
            });
        }
    }

    fn retire(&mut self, _index: i64, page: Self::Page) {
        self.tree.borrow_mut().remove(page.surface);
    }
}

/// The year section controller.
#[derive(Debug)]
pub struct YearSection {
    axis: DateAxis<YearModel>,
    root: SurfaceId,
    bounds: Rect,
}

impl YearSection {
    /// Creates the section, inserting its root under `parent`.
    ///
    /// Pass a rasterizer to enable bitmap rendering; without one the section
    /// still publishes hit-test coordinates (synchronously) so navigation
    /// and transitions work headlessly.
    #[must_use]
    pub fn new(
        info: SharedInfo,
        tree: SharedTree,
        bus: InteractionBus,
        parent: SurfaceId,
        regular_class: bool,
        rasterizer: Option<Box<dyn crate::raster::Rasterizer + Send>>,
    ) -> Self {
        let root = tree.borrow_mut().insert(Some(parent), Surface::default());
        let model = YearModel {
            info,
            tree,
            bus,
            root,
            cross: 0.0,
            regular_class,
            worker: rasterizer.map(RenderWorker::spawn),
        };
        Self {
            axis: DateAxis::new(model, Orientation::Vertical),
            root,
            bounds: Rect::ZERO,
        }
    }

    /// The materialized page showing the year of `date`, if any.
    #[must_use]
    pub fn page_for(&self, date: NaiveDate) -> Option<&YearPage> {
        let year = arith::start_of_year(date);
        self.axis
            .pages()
            .map(|entry| &entry.page)
            .find(|page| page.date == year)
    }

    /// Synchronously re-derives and publishes coordinates for the page
    /// showing `date`, so transition builders can read them immediately.
    /// Raster pixels still arrive through the worker.
    pub fn render_now(&mut self, date: NaiveDate) {
        let info = self.axis.model().info.clone();
        let year = arith::start_of_year(date);
        for entry in self.axis.pages_mut() {
            if entry.page.date != year {
                continue;
            }
            let info = info.borrow();
            let (_, coordinates) = entry.page.geometry.build(&info, entry.page.date);
            entry.page.coordinates = coordinates;
        }
    }

    /// Delivers a tap at a section-local point.
    pub fn tap(&mut self, point: Point) {
        self.axis.tap(point);
    }

    /// Scrolls by a host-driven delta and reports the newly centered year.
    pub fn scroll_by(&mut self, delta: f64) {
        let offset = self.axis.scroll_offset() + delta;
        self.axis.set_scroll_offset(offset);
        self.axis.announce();
        self.sync_pages();
    }

    fn sync_pages(&mut self) {
        // Recompute geometry, position page surfaces, and submit render jobs
        // for pages whose geometry reference moved.
        let scroll = self.axis.scroll_offset();
        let width = self.bounds.width();
        let viewport = self.bounds.height();
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let regular_class = self.axis.model().regular_class;

        let mut jobs: Vec<i64> = Vec::new();
        {
            let info = info.borrow();
            for entry in self.axis.pages_mut() {
                let geometry =
                    YearGeometry::new(&info, Size::new(width, viewport), regular_class);
                if geometry.reference != entry.page.geometry.reference {
                    entry.page.geometry = geometry;
                    entry.page.bitmap = None;
                    jobs.push(entry.index);
                }
            }
        }

        {
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
                    surface.state.frame = Rect::new(0.0, start - scroll, width, end - scroll);
                }
            }
        }

        for index in jobs {
            let has_worker = self.axis.model().worker.is_some();
            if has_worker {
                if let Some(entry) = self.axis.page_at(index) {
                    self.axis.model().submit(&entry.page, index);
                }
            } else {
                // Headless: publish coordinates synchronously.
                let info = self.axis.model().info.clone();
                if let Some(entry) = self.axis.page_at_mut(index) {
                    let info = info.borrow();
                    let (_, coordinates) = entry.page.geometry.build(&info, entry.page.date);
                    entry.page.coordinates = coordinates;
                }
            }
        }
    }
}

impl Section for YearSection {
    fn kind(&self) -> SectionKind {
        SectionKind::Year
    }

    fn root(&self) -> SurfaceId {
        self.root
    }

    fn reload(&mut self) {
        self.axis.reset();
        self.sync_pages();
    }

    fn update(&mut self) {
        // Re-render every materialized page (today marker moved, events
        // changed upstream of the marker-free year view, or fonts changed).
        let indices: Vec<i64> = self.axis.pages().map(|entry| entry.index).collect();
        for index in indices {
            let has_worker = self.axis.model().worker.is_some();
            if has_worker {
                if let Some(entry) = self.axis.page_at(index) {
                    self.axis.model().submit(&entry.page, index);
                }
            } else {
                let info = self.axis.model().info.clone();
                if let Some(entry) = self.axis.page_at_mut(index) {
                    let info = info.borrow();
                    let (_, coordinates) = entry.page.geometry.build(&info, entry.page.date);
                    entry.page.coordinates = coordinates;
                }
            }
        }
    }

    fn scroll_to(&mut self, date: NaiveDate, animated: bool) {
        let index = {
            let info = self.axis.model().info.borrow();
            info.index_of(arith::start_of_year(date), arith::Unit::Years)
        };
        self.axis.scroll_to_index(index, animated);
        self.sync_pages();
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
        self.sync_pages();
    }

    fn pump(&mut self) {
        let Some(worker) = self.axis.model().worker.as_ref() else {
            return;
        };
        let results = worker.drain();
        for result in results {
            let Some(entry) = self.axis.page_at_mut(result.index) else {
                continue;
            };
            // Staleness guard: the geometry captured at submit time must
            // still match the page's current reference size, else the view
            // was resized while the render was in flight and the result is
            // discarded.
            if result.reference != entry.page.geometry.reference {
                log::debug!(
                    "discarding stale year raster for index {} ({:?} != {:?})",
                    result.index,
                    result.reference,
                    entry.page.geometry.reference,
                );
                continue;
            }
            entry.page.bitmap = Some(result.bitmap);
            entry.page.coordinates = result.coordinates;
        }
    }
}

impl RegularSection for YearSection {
    fn display(&self) -> DisplayInfo {
        // Hide the period label while a page edge is near the toolbar.
        let probe = self.axis.scroll_offset();
        let Some(index) = self.axis.index_at(probe) else {
            return DisplayInfo::default();
        };
        let Some((start, end)) = self.axis.position(index) else {
            return DisplayInfo::default();
        };
        if probe - start < 32.0 || end - probe < 32.0 {
            return DisplayInfo::default();
        }
        let date = self.axis.page_at(index).map(|entry| entry.page.date);
        DisplayInfo {
            date,
            shows_month: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use almanac_info::{CalendarConfig, Style};
    use almanac_surface::SurfaceTree;

    use super::*;

    #[test]
    fn elastic_passes_values_inside_bounds() {
        assert_eq!(elastic(0.5, 0.0, 1.0, 0.75), 0.5);
        assert_eq!(elastic(0.0, 0.0, 1.0, 0.75), 0.0);
    }

    #[test]
    fn elastic_soft_clamps_below_the_bound() {
        let span = 0.75;
        let squeezed = elastic(0.2, 1.0, 1.0, span);
        // Compressed toward the bound, bounded by the span, monotone.
        assert!(squeezed < 1.0);
        assert!(squeezed > 1.0 - span);
        assert!(elastic(0.1, 1.0, 1.0, span) < squeezed);
        // No snapping: approaching the bound approaches identity.
        assert!((elastic(0.999, 1.0, 1.0, span) - 0.999).abs() < 1e-2);
    }

    #[test]
    fn geometry_compresses_to_fit_narrow_containers() {
        let info = almanac_info::CalendarInfo::with_style(CalendarConfig::default(), Style::default());
        let geometry = YearGeometry::new(&info, Size::new(375.0, 667.0), false);
        assert_eq!(geometry.cols, 3);
        assert_eq!(geometry.rows, 4);
        assert!(geometry.ratio.0 < 1.0);
        assert!(geometry.fonts_ratio <= 1.0);
        assert!(geometry.size.height > 0.0);
        // Compression never exceeds the rubber-band span.
        assert!(geometry.fonts_ratio > 1.0 - 0.75);
    }

    #[test]
    fn scene_records_coordinates_for_every_day() {
        let mut calendar =
            almanac_info::CalendarInfo::with_style(CalendarConfig::default(), Style::default());
        calendar.date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
        let geometry = YearGeometry::new(&calendar, Size::new(375.0, 667.0), false);
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let (scene, coordinates) = geometry.build(&calendar, start);

        assert_eq!(coordinates.days.len(), 365);
        assert_eq!(coordinates.titles.len(), 12);
        assert_eq!(coordinates.months.len(), 12);
        assert!(!scene.ops.is_empty());

        // Hit-testing resolves the nearest day center.
        let (date, center) = coordinates.days[40];
        assert_eq!(coordinates.date_at(geometry.size, center), Some(date));
    }

    #[test]
    fn stale_rasters_are_discarded_on_resize() {
        use crate::raster::{Bitmap, Rasterizer};
        use std::sync::Arc;

        struct OnePixel;
        impl Rasterizer for OnePixel {
            fn rasterize(&mut self, _scene: &YearScene) -> Bitmap {
                Bitmap {
                    width: 1,
                    height: 1,
                    scale: 1.0,
                    data: Arc::from(vec![0, 0, 0, 255].into_boxed_slice()),
                }
            }
        }

        let mut calendar =
            almanac_info::CalendarInfo::with_style(CalendarConfig::default(), Style::default());
        calendar.date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
        let info: SharedInfo = Rc::new(RefCell::new(calendar));
        let tree: SharedTree = Rc::new(RefCell::new(SurfaceTree::new()));
        let parent = tree.borrow_mut().insert(None, Surface::default());
        let mut section = YearSection::new(
            info.clone(),
            tree,
            InteractionBus::new(),
            parent,
            false,
            Some(Box::new(OnePixel)),
        );

        // Submit for the first size, then resize before the render lands.
        section.layout(Rect::new(0.0, 0.0, 375.0, 667.0));
        section.layout(Rect::new(0.0, 0.0, 500.0, 900.0));

        // Drain until the fresh render publishes; the stale one is dropped by
        // the geometry-reference guard.
        for _ in 0..200 {
            section.pump();
            let done = section
                .page_for(NaiveDate::from_ymd_opt(2021, 6, 15).unwrap())
                .is_some_and(|page| page.bitmap.is_some());
            if done {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let page = section
            .page_for(NaiveDate::from_ymd_opt(2021, 6, 15).unwrap())
            .expect("year page materialized");
        assert!(page.bitmap.is_some(), "fresh render must publish");
        assert_eq!(page.geometry.reference, Size::new(500.0, 900.0));
        // Published coordinates belong to the fresh geometry, not the stale
        // submission.
        let expected = {
            let info = info.borrow();
            page.geometry.build(&info, page.date).1
        };
        assert_eq!(page.coordinates, expected);
    }

    #[test]
    fn headless_section_publishes_coordinates_synchronously() {
        let mut calendar =
            almanac_info::CalendarInfo::with_style(CalendarConfig::default(), Style::default());
        calendar.date = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
        let info: SharedInfo = Rc::new(RefCell::new(calendar));
        let tree: SharedTree = Rc::new(RefCell::new(SurfaceTree::new()));
        let bus = InteractionBus::new();
        let parent = tree.borrow_mut().insert(None, Surface::default());

        let mut section = YearSection::new(info, tree, bus.clone(), parent, false, None);
        section.layout(Rect::new(0.0, 0.0, 375.0, 667.0));

        let page = section
            .page_for(NaiveDate::from_ymd_opt(2021, 6, 15).unwrap())
            .expect("year page materialized");
        assert!(!page.coordinates.days.is_empty());

        // A tap near a recorded day center reports that date.
        let (date, center) = page.coordinates.days[100];
        let (start, _) = section
            .axis
            .position(section.axis.centered_index().unwrap())
            .unwrap();
        section.tap(Point::new(center.x, center.y + start - section.axis.scroll_offset()));
        assert!(bus.drain().contains(&Interaction::Tapped {
            sender: SectionKind::Year,
            date,
        }));
    }
}
