// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Day section: a horizontally paged timeline of single days.
//!
//! Timed events lay out on a 24-hour vertical axis. Events whose starts
//! chain within the overlap tolerance form a *cluster* (the transitive
//! closure of "starts inside my look-back window") and share the horizontal
//! space in equal-width columns. Untimed ("all day") events render in a
//! separate horizontally scrolling strip capped at two and a half visible
//! rows.
//!
//! The overlap tolerance is an explicit parameter. The default at the
//! construction site derives it from two time-label line heights converted
//! to minutes through the hour height, so events cluster exactly when their
//! labels would collide; the clustering itself never reads font metrics.

use almanac_axis::{AxisModel, DateAxis, Extent, Orientation};
use almanac_events::{Event, Interval};
use almanac_info::CalendarInfo;
use almanac_info::arith;
use almanac_surface::{Surface, SurfaceId};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use kurbo::{Point, Rect, Size};
use std::cell::Cell;
use std::rc::Rc;

use crate::week::WeekStrip;
use crate::{
    DisplayInfo, Interaction, InteractionBus, RegularSection, Section, SectionKind, SharedInfo,
    SharedSelection, SharedSource, SharedTree,
};

/// Look-back window for overlap clustering, in minutes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OverlapTolerance(pub i64);

impl OverlapTolerance {
    /// Two time-label line heights, converted to minutes through the hour
    /// height: the tolerance at which events visually collide.
    #[must_use]
    pub fn from_label_metrics(label_height: f64, hour_height: f64) -> Self {
        if hour_height <= 0.0 {
            return Self(0);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tolerance is a small positive minute count"
        )]
        Self((60.0 * (label_height * 2.0) / hour_height).ceil() as i64)
    }
}

/// One cluster of mutually leveled events.
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    /// Indices into the input slice, ordered by `(start, title)`.
    pub indices: Vec<usize>,
    /// Horizontal cascade offset: clusters whose seed starts inside an
    /// earlier cluster shift right by 4 px per preceding overlapping seed.
    pub lead: f64,
}

/// Groups timed events into overlap clusters.
///
/// Membership is transitive: an event belongs to the cluster of any event
/// whose start lies within `tolerance` minutes after its own start. The
/// input need not be sorted; cluster indices come back ordered by
/// `(start, title)`.
#[must_use]
pub fn cluster_events(events: &[Event], tolerance: OverlapTolerance) -> Vec<Cluster> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by(|&a, &b| {
        events[a]
            .interval
            .start
            .cmp(&events[b].interval.start)
            .then_with(|| events[a].title.cmp(&events[b].title))
    });

    let mut clusters = Vec::new();
    let mut seeds: Vec<usize> = Vec::new();
    let mut remaining = order;

    while let Some(&seed) = remaining.first() {
        seeds.push(seed);

        let preceding = seeds
            .iter()
            .filter(|&&s| {
                events[s].interval.start <= events[seed].interval.end
                    && events[s].interval.end > events[seed].interval.start
            })
            .count();
        let lead = if preceding > 1 {
            4.0 * (preceding as f64 - 1.0)
        } else {
            0.0
        };

        // Transitive closure of the look-back window, seeded here.
        let mut members = vec![seed];
        let mut cursor = 0;
        while cursor < members.len() {
            let member = members[cursor];
            cursor += 1;
            let start = events[member].interval.start;
            let window_end = start + chrono::Duration::minutes(tolerance.0);
            for &candidate in &remaining {
                if members.contains(&candidate) {
                    continue;
                }
                let candidate_start = events[candidate].interval.start;
                if candidate_start >= start && candidate_start < window_end {
                    members.push(candidate);
                }
            }
        }

        members.sort_by(|&a, &b| {
            events[a]
                .interval
                .start
                .cmp(&events[b].interval.start)
                .then_with(|| events[a].title.cmp(&events[b].title))
        });
        remaining.retain(|index| !members.contains(index));
        clusters.push(Cluster {
            indices: members,
            lead,
        });
    }
    clusters
}

/// Font-derived metrics of the day timeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DayMetrics {
    /// Height of one hour on the time axis.
    pub hour_height: f64,
    /// Nominal size of a tick time label.
    pub tick_label: Size,
    /// Left gutter: inset + label column + inset.
    pub spine: f64,
    /// Gap between side-by-side event columns.
    pub gutter: f64,
    /// Height of one all-day event row.
    pub allday_event_height: f64,
    /// Gap between all-day rows.
    pub allday_inset: f64,
    /// Total scrollable height of the timeline.
    pub content_height: f64,
}

impl DayMetrics {
    /// Derives the metrics from the active style.
    #[must_use]
    pub fn new(info: &CalendarInfo) -> Self {
        let style = &info.style;
        let inset = style.geometry.inset;
        let hour_height = (style.fonts.event_normal.line_height * 4.0).ceil();
        let tick_label = Size::new(
            style.fonts.day_time.size * 3.0,
            style.fonts.day_time.line_height,
        );
        let allday_label_width = style.fonts.day_allday.size * 4.0;
        let spine = inset + tick_label.width.max(allday_label_width) + inset;
        Self {
            hour_height,
            tick_label,
            spine,
            gutter: inset / 4.0,
            allday_event_height: (style.fonts.event_normal.line_height + inset / 2.0).ceil(),
            allday_inset: inset / 4.0,
            content_height: tick_label.height + hour_height * 24.0 + tick_label.height,
        }
    }

    /// Default overlap tolerance for these metrics.
    #[must_use]
    pub fn overlap_tolerance(&self) -> OverlapTolerance {
        OverlapTolerance::from_label_metrics(self.tick_label.height, self.hour_height)
    }

    /// Y of a time on the axis.
    #[must_use]
    pub fn y_of(&self, day_start: NaiveDateTime, time: NaiveDateTime) -> f64 {
        let minutes = (time - day_start).num_minutes() as f64;
        self.tick_label.height + self.hour_height * (minutes / 60.0)
    }
}

/// Frames for the timed events of one day, aligned with the input order.
///
/// Width is the page width; clusters divide `width - spine - gutter` into
/// equal columns. Frames are in timeline-content coordinates.
#[must_use]
pub fn timed_frames(
    events: &[Event],
    date: NaiveDate,
    metrics: &DayMetrics,
    tolerance: OverlapTolerance,
    width: f64,
) -> Vec<Rect> {
    let day_start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let day_end = Interval::day(date).end;
    let full_width = (width - metrics.spine - metrics.allday_inset).max(0.0);

    let mut frames = vec![Rect::ZERO; events.len()];
    for cluster in cluster_events(events, tolerance) {
        let count = cluster.indices.len() as f64;
        let column = (full_width - cluster.lead) / count;
        for (slot, &index) in cluster.indices.iter().enumerate() {
            let event = &events[index];
            let start = event.interval.start.max(day_start);
            let end = event.interval.end.min(day_end);
            let top = metrics.y_of(day_start, start);
            let bottom = metrics.y_of(day_start, end);
            let x = metrics.spine + cluster.lead + column * slot as f64 + 1.0;
            frames[index] = Rect::new(
                x.ceil(),
                (top + 1.0).ceil(),
                (x + column - metrics.gutter).ceil(),
                (top + 1.0 + (bottom - top - 2.0).max(24.0)).ceil(),
            );
        }
    }
    frames
}

/// Frames for the all-day strip plus its visible height.
///
/// Two columns, the last odd item spanning the full width; visible height is
/// capped at two and a half rows.
#[must_use]
pub fn allday_frames(count: usize, metrics: &DayMetrics, width: f64) -> (Vec<Rect>, f64) {
    let full = (width - metrics.spine - metrics.allday_inset).max(0.0);
    let half = (full - metrics.allday_inset) / 2.0;
    let mut frames = Vec::with_capacity(count);
    let mut max_y = 0.0_f64;
    for index in 0..count {
        let row = (index / 2) as f64;
        let col = (index % 2) as f64;
        let spans_full = index + 1 == count && index % 2 == 0;
        let x = col * (half + metrics.allday_inset);
        let y = metrics.allday_inset + row * (metrics.allday_event_height + metrics.allday_inset);
        let w = if spans_full { full } else { half };
        let frame = Rect::new(x, y, x + w, y + metrics.allday_event_height);
        max_y = max_y.max(frame.y1);
        frames.push(frame);
    }
    let height = if count == 0 {
        0.0
    } else {
        (max_y + metrics.allday_inset)
            .min((metrics.allday_event_height + metrics.allday_inset) * 2.5)
    };
    (frames, height)
}

/// One placed event view.
#[derive(Clone, Debug)]
pub struct EventPlacement {
    /// The event value.
    pub event: Event,
    /// Its surface.
    pub surface: SurfaceId,
    /// Frame in the owning scroller's content coordinates.
    pub frame: Rect,
}

/// One hour tick of the timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    /// Hour, `0..=24`.
    pub hour: u32,
    /// Y on the content axis.
    pub y: f64,
    /// Rendered time label.
    pub label: String,
    /// Ticks colliding with the now notch hide their label.
    pub hidden: bool,
}

/// The now marker, present only on today's page.
#[derive(Clone, Debug, PartialEq)]
pub struct NowNotch {
    /// Y on the content axis.
    pub y: f64,
    /// Rendered time label.
    pub label: String,
}

/// One materialized day page.
#[derive(Debug)]
pub struct DayPage {
    /// The day this page shows.
    pub date: NaiveDate,
    /// Page surface.
    pub surface: SurfaceId,
    /// Scrolling timeline content surface.
    pub timeline: SurfaceId,
    /// All-day strip surface.
    pub allday: SurfaceId,
    /// Timed event placements (timeline coordinates).
    pub timed: Vec<EventPlacement>,
    /// All-day event placements (strip coordinates).
    pub allday_events: Vec<EventPlacement>,
    /// Hour ticks.
    pub ticks: Vec<Tick>,
    /// Now marker, today only.
    pub notch: Option<NowNotch>,
    /// Visible height of the all-day strip.
    pub allday_height: f64,
}

impl DayPage {
    /// Event surfaces under a page-local point, topmost first.
    #[must_use]
    pub fn events_at(&self, offset: f64, point: Point) -> Vec<(&Event, SurfaceId)> {
        // All-day strip sits above the timeline and does not scroll
        // vertically.
        if point.y < self.allday_height {
            return self
                .allday_events
                .iter()
                .filter(|placement| placement.frame.contains(point))
                .map(|placement| (&placement.event, placement.surface))
                .collect();
        }
        let content = Point::new(point.x, point.y + offset);
        let mut hits: Vec<(&Event, SurfaceId)> = self
            .timed
            .iter()
            .filter(|placement| placement.frame.contains(content))
            .map(|placement| (&placement.event, placement.surface))
            .collect();
        hits.reverse();
        hits
    }
}

struct DayModel {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    inner: InteractionBus,
    source: SharedSource,
    selection: SharedSelection,
    root: SurfaceId,
    cross: f64,
    offset: Rc<Cell<f64>>,
    tolerance: Option<OverlapTolerance>,
    standard_selection: bool,
}

impl core::fmt::Debug for DayModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("DayModel { .. }")
    }
}

impl DayModel {
    fn build_page(&mut self, date: NaiveDate) -> DayPage {
        let (surface, timeline, allday) = {
            let mut tree = self.tree.borrow_mut();
            let surface = tree.insert(Some(self.root), Surface::default());
            let timeline = tree.insert(Some(surface), Surface::default());
            let allday = tree.insert(Some(surface), Surface::default());
            if let Some(s) = tree.get_mut(allday) {
                s.state.z_index = 1;
            }
            (surface, timeline, allday)
        };
        let mut page = DayPage {
            date,
            surface,
            timeline,
            allday,
            timed: Vec::new(),
            allday_events: Vec::new(),
            ticks: Vec::new(),
            notch: None,
            allday_height: 0.0,
        };
        refresh_page(
            &self.info,
            &self.tree,
            &self.source,
            self.offset.get(),
            self.tolerance,
            self.cross,
            &mut page,
        );
        page
    }
}

/// Re-queries events and lays one page out at the given width.
fn refresh_page(
    info: &SharedInfo,
    tree: &SharedTree,
    source: &SharedSource,
    offset: f64,
    tolerance: Option<OverlapTolerance>,
    width: f64,
    page: &mut DayPage,
) {
    let mut events = Vec::new();
    source
        .borrow()
        .events_in(Interval::day(page.date))
        .start(|fetched| events = fetched);
    events.sort_by(|a, b| {
        a.interval
            .start
            .cmp(&b.interval.start)
            .then_with(|| a.title.cmp(&b.title))
    });

    let info = info.borrow();
    let metrics = DayMetrics::new(&info);
    let tolerance = tolerance.unwrap_or_else(|| metrics.overlap_tolerance());

    let (timed, allday): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|event| !event.all_day);

    let mut tree = tree.borrow_mut();

    // Reconcile event surfaces: drop the vanished, keep the surviving,
    // create the appeared.
    let reconcile = |tree: &mut almanac_surface::SurfaceTree,
                     parent: SurfaceId,
                     old: &mut Vec<EventPlacement>,
                     new_events: Vec<Event>|
     -> Vec<EventPlacement> {
        let mut next = Vec::with_capacity(new_events.len());
        for event in new_events {
            let surface = old
                .iter()
                .position(|placement| placement.event.id == event.id)
                .map(|slot| old.swap_remove(slot).surface)
                .unwrap_or_else(|| tree.insert(Some(parent), Surface::default()));
            next.push(EventPlacement {
                event,
                surface,
                frame: Rect::ZERO,
            });
        }
        for stale in old.drain(..) {
            tree.remove(stale.surface);
        }
        next
    };

    page.timed = reconcile(&mut tree, page.timeline, &mut page.timed, timed);
    page.allday_events = reconcile(&mut tree, page.allday, &mut page.allday_events, allday);

    // Timed frames.
    let events: Vec<Event> = page.timed.iter().map(|p| p.event.clone()).collect();
    let frames = timed_frames(&events, page.date, &metrics, tolerance, width);
    for (placement, frame) in page.timed.iter_mut().zip(frames) {
        placement.frame = frame;
        if let Some(surface) = tree.get_mut(placement.surface) {
            surface.state.frame = frame;
        }
    }

    // All-day strip.
    let (frames, height) = allday_frames(page.allday_events.len(), &metrics, width);
    for (placement, frame) in page.allday_events.iter_mut().zip(frames) {
        placement.frame = frame;
        if let Some(surface) = tree.get_mut(placement.surface) {
            surface.state.frame = frame;
        }
    }
    page.allday_height = height;
    if let Some(surface) = tree.get_mut(page.allday) {
        surface.state.frame = Rect::new(0.0, 0.0, width, height);
        surface.set_hidden(page.allday_events.is_empty());
    }

    // Ticks and the now notch.
    let day_start = page.date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let is_today = info.is_today(page.date);
    let notch = is_today.then(|| NowNotch {
        y: metrics.tick_label.height
            + f64::from(info.now.time().hour()) * metrics.hour_height
            + f64::from(info.now.time().minute()) * (metrics.hour_height / 60.0),
        label: info.now.time().format(&info.config.formats.hour).to_string(),
    });

    page.ticks = (0..=24)
        .map(|hour| {
            let y = metrics.tick_label.height + f64::from(hour) * metrics.hour_height;
            let time = day_start + chrono::Duration::hours(i64::from(hour));
            let hidden = notch
                .as_ref()
                .is_some_and(|n| (n.y - y).abs() < metrics.tick_label.height);
            Tick {
                hour,
                y,
                label: time.time().format(&info.config.formats.hour).to_string(),
                hidden,
            }
        })
        .collect();
    page.notch = notch;

    // Apply the shared scroll offset to the timeline content.
    if let Some(surface) = tree.get_mut(page.timeline) {
        surface.state.frame = Rect::new(0.0, -offset, width, metrics.content_height - offset);
    }
}

impl AxisModel for DayModel {
    type Page = DayPage;

    fn initial_index(&self) -> i64 {
        let info = self.info.borrow();
        info.index_of(info.date, arith::Unit::Days)
    }

    fn make_page(&mut self, index: i64) -> Self::Page {
        let date = self.info.borrow().date_of(arith::Unit::Days, index);
        self.build_page(date)
    }

    fn extent(&self) -> Extent {
        Extent::Fill
    }

    fn shown(&mut self, page: &Self::Page, _index: i64) {
        self.inner.push(Interaction::Shown {
            sender: SectionKind::Day,
            date: page.date,
        });
    }

    fn tap(&mut self, page: &mut Self::Page, _index: i64, point: Point) {
        // Custom day renderers own their event interaction; the standard
        // selection behavior steps aside for them.
        if !self.standard_selection {
            return;
        }
        let hits: Vec<(almanac_events::EventId, SurfaceId)> = page
            .events_at(self.offset.get(), point)
            .into_iter()
            .map(|(event, surface)| (event.id, surface))
            .collect();

        let mut selection = self.selection.borrow_mut();
        if hits.is_empty() {
            selection.deselect();
            return;
        }
        // Repeated taps over a stack of events cycle through it.
        let current = selection.selected().copied();
        let next = match current.and_then(|id| hits.iter().position(|(hit, _)| *hit == id)) {
            Some(slot) if hits.len() > 1 => hits[(slot + 1) % hits.len()],
            Some(slot) => hits[slot],
            None => hits[0],
        };
        selection.select(next.0, next.1);
    }

    fn retire(&mut self, _index: i64, page: Self::Page) {
        self.tree.borrow_mut().remove(page.surface);
    }
}

/// The day section controller.
#[derive(Debug)]
pub struct DaySection {
    axis: DateAxis<DayModel>,
    ruler: WeekStrip,
    root: SurfaceId,
    bounds: Rect,
    selection_revision: u64,
}

impl DaySection {
    /// Creates the section, inserting its root under `parent`.
    ///
    /// `tolerance` overrides the overlap-clustering look-back window; `None`
    /// derives the label-metric default. `standard_selection` is disabled by
    /// embedders whose custom day renderer owns event taps.
    #[must_use]
    pub fn new(
        info: SharedInfo,
        tree: SharedTree,
        bus: InteractionBus,
        source: SharedSource,
        selection: SharedSelection,
        parent: SurfaceId,
        tolerance: Option<OverlapTolerance>,
        standard_selection: bool,
    ) -> Self {
        let root = tree.borrow_mut().insert(Some(parent), Surface::default());
        let inner = InteractionBus::new();
        let ruler = WeekStrip::new(
            info.clone(),
            tree.clone(),
            inner.clone(),
            SectionKind::Day,
            root,
        );
        let model = DayModel {
            info,
            tree,
            bus,
            inner,
            source,
            selection,
            root,
            cross: 0.0,
            offset: Rc::new(Cell::new(0.0)),
            tolerance,
            standard_selection,
        };
        Self {
            axis: DateAxis::new(model, Orientation::Horizontal),
            ruler,
            root,
            bounds: Rect::ZERO,
            selection_revision: 0,
        }
    }

    /// The week-ruler strip of this section.
    #[must_use]
    pub fn ruler(&self) -> &WeekStrip {
        &self.ruler
    }

    /// The week-ruler strip, mutably.
    pub fn ruler_mut(&mut self) -> &mut WeekStrip {
        &mut self.ruler
    }

    /// The materialized page showing `date`, if any.
    #[must_use]
    pub fn page_for(&self, date: NaiveDate) -> Option<&DayPage> {
        self.axis
            .pages()
            .map(|entry| &entry.page)
            .find(|page| page.date == date)
    }

    /// Shared vertical offset of the day timelines.
    #[must_use]
    pub fn time_offset(&self) -> f64 {
        self.axis.model().offset.get()
    }

    /// Sets the shared vertical offset, moving every live page except the
    /// one that originated the change.
    pub fn set_time_offset(&mut self, offset: f64, sender: Option<NaiveDate>) {
        self.axis.model().offset.set(offset);
        let tree = self.axis.model().tree.clone();
        let info = self.axis.model().info.clone();
        let metrics = DayMetrics::new(&info.borrow());
        let mut tree = tree.borrow_mut();
        for entry in self.axis.pages() {
            if Some(entry.page.date) == sender {
                continue;
            }
            if let Some(surface) = tree.get_mut(entry.page.timeline) {
                let width = surface.state.frame.width();
                surface.state.frame =
                    Rect::new(0.0, -offset, width, metrics.content_height - offset);
            }
        }
    }

    /// Scrolls the timeline so the now notch is visible, when today is
    /// centered.
    pub fn scroll_to_now(&mut self) {
        let today = self.axis.model().info.borrow().now.date();
        let Some(page) = self.page_for(today) else {
            return;
        };
        let Some(notch) = page.notch.clone() else {
            return;
        };
        let viewport = self.bounds.height();
        let offset = (notch.y - viewport / 2.0).max(0.0);
        self.set_time_offset(offset, None);
    }

    /// Delivers a tap at a section-local point.
    pub fn tap(&mut self, point: Point) {
        self.axis.tap(point);
    }

    fn sync_page_frames(&mut self) {
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

    /// Re-renders selection highlight state when the shared selection moved.
    fn sync_selection(&mut self) {
        let selection = self.axis.model().selection.clone();
        let revision = selection.borrow().revision();
        if revision == self.selection_revision {
            return;
        }
        self.selection_revision = revision;
        let selected = selection.borrow().selected().copied();
        let tree = self.axis.model().tree.clone();
        let mut tree = tree.borrow_mut();
        for entry in self.axis.pages() {
            for placement in entry.page.timed.iter().chain(&entry.page.allday_events) {
                if let Some(surface) = tree.get_mut(placement.surface) {
                    // Selected events rise above their cluster siblings.
                    surface.state.z_index = if Some(placement.event.id) == selected { 1 } else { 0 };
                }
            }
        }
    }
}

impl Section for DaySection {
    fn kind(&self) -> SectionKind {
        SectionKind::Day
    }

    fn root(&self) -> SurfaceId {
        self.root
    }

    fn reload(&mut self) {
        self.axis.reset();
        self.ruler.reload();
        self.sync_page_frames();
    }

    fn update(&mut self) {
        let info = self.axis.model().info.clone();
        let tree = self.axis.model().tree.clone();
        let source = self.axis.model().source.clone();
        let offset = self.axis.model().offset.get();
        let tolerance = self.axis.model().tolerance;
        let cross = self.axis.model().cross;
        for entry in self.axis.pages_mut() {
            refresh_page(&info, &tree, &source, offset, tolerance, cross, &mut entry.page);
        }
        self.ruler.update();
    }

    fn scroll_to(&mut self, date: NaiveDate, animated: bool) {
        let index = {
            let info = self.axis.model().info.borrow();
            info.index_of(date, arith::Unit::Days)
        };
        self.axis.scroll_to_index(index, animated);
        self.ruler.scroll_to(date, true);
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
        self.axis.set_viewport(bounds.width(), bounds.height());

        let ruler_height = self.ruler.natural_height();
        self.ruler
            .layout(Rect::new(0.0, 0.0, bounds.width(), ruler_height));
        self.sync_page_frames();
        self.update();
    }

    fn pump(&mut self) {
        // Route ruler interactions into the day pager, then outward with
        // this section as the sender; scrolling one surface never feeds back
        // into itself.
        let inner = self.axis.model().inner.clone();
        for interaction in inner.drain() {
            match interaction {
                Interaction::Shown { date, .. } | Interaction::Tapped { date, .. } => {
                    let index = {
                        let info = self.axis.model().info.borrow();
                        info.index_of(date, arith::Unit::Days)
                    };
                    if self.axis.centered_index() != Some(index) {
                        self.axis.scroll_to_index(index, true);
                        self.sync_page_frames();
                    }
                    self.ruler.scroll_to(date, true);
                    self.axis.model().bus.push(Interaction::Shown {
                        sender: SectionKind::Day,
                        date,
                    });
                }
                Interaction::Today => self.axis.model().bus.push(Interaction::Today),
            }
        }
        self.sync_selection();
    }
}

impl RegularSection for DaySection {
    fn display(&self) -> DisplayInfo {
        let info = self.axis.model().info.borrow();
        DisplayInfo {
            date: Some(info.date),
            shows_month: true,
        }
    }

    fn ruler(&mut self) -> Option<&mut WeekStrip> {
        Some(&mut self.ruler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_info::{CalendarConfig, Style};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn timed(id: u64, title: &str, start: NaiveDateTime, end: NaiveDateTime) -> Event {
        Event::timed(id, title, Interval::new(start, end))
    }

    fn metrics() -> DayMetrics {
        let info = almanac_info::CalendarInfo::with_style(CalendarConfig::default(), Style::default());
        DayMetrics::new(&info)
    }

    #[test]
    fn overlapping_pair_shares_the_width_in_halves() {
        let events = [
            timed(1, "a", at(9, 0), at(10, 0)),
            timed(2, "b", at(9, 30), at(10, 30)),
            timed(3, "c", at(11, 0), at(11, 30)),
        ];
        let m = metrics();
        let width = 400.0;
        let frames = timed_frames(
            &events,
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            &m,
            OverlapTolerance(45),
            width,
        );

        let full = width - m.spine - m.allday_inset;
        // The 09:00 pair sits side by side at half width.
        assert!((frames[0].width() - (full / 2.0 - m.gutter)).abs() < 2.0);
        assert!((frames[1].width() - (full / 2.0 - m.gutter)).abs() < 2.0);
        assert!(frames[0].x1 <= frames[1].x0 + 2.0);
        // The isolated 11:00 event spans the full column width.
        assert!((frames[2].width() - (full - m.gutter)).abs() < 2.0);
    }

    #[test]
    fn clustering_is_transitive() {
        // a..b chain within tolerance, c chained to b, d separate.
        let events = [
            timed(1, "a", at(9, 0), at(9, 30)),
            timed(2, "b", at(9, 20), at(9, 50)),
            timed(3, "c", at(9, 40), at(10, 0)),
            timed(4, "d", at(12, 0), at(12, 30)),
        ];
        let clusters = cluster_events(&events, OverlapTolerance(30));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].indices, vec![0, 1, 2]);
        assert_eq!(clusters[1].indices, vec![3]);
    }

    #[test]
    fn frames_respect_minimum_height_and_day_bounds() {
        let events = [timed(1, "blink", at(9, 0), at(9, 1))];
        let m = metrics();
        let frames = timed_frames(
            &events,
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            &m,
            OverlapTolerance(10),
            400.0,
        );
        assert!(frames[0].height() >= 24.0);
    }

    #[test]
    fn allday_strip_caps_at_two_and_a_half_rows() {
        let m = metrics();
        let (frames, height) = allday_frames(7, &m, 400.0);
        assert_eq!(frames.len(), 7);
        // Odd tail spans the full width.
        let full = 400.0 - m.spine - m.allday_inset;
        assert!((frames[6].width() - full).abs() < 1e-9);
        assert!(frames[6].width() > frames[0].width() * 1.5);
        assert!(height <= (m.allday_event_height + m.allday_inset) * 2.5 + 1e-9);

        let (_, empty_height) = allday_frames(0, &m, 400.0);
        assert_eq!(empty_height, 0.0);
    }

    #[test]
    fn tolerance_derivation_matches_label_metrics() {
        let m = metrics();
        let tolerance = m.overlap_tolerance();
        let expected = (60.0 * m.tick_label.height * 2.0 / m.hour_height).ceil();
        assert!((tolerance.0 as f64 - expected).abs() < 1e-9);
        assert!(tolerance.0 > 0);
    }
}
