// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Sections: the four calendar section controllers and their
//! geometry.
//!
//! A *section* displays one time granularity (day, week, month, or year)
//! by owning one virtualized date axis and materializing its pages into the
//! shared surface tree. All sections speak the same [`Section`] contract:
//! they can be asked to reload (drop every page and re-derive, after locale
//! changes that invalidate geometry), to update (refresh materialized pages
//! in place, after event-data or day-boundary changes), and to scroll to a
//! date. Top-level sections of the regular navigator additionally expose
//! [`RegularSection`]: a display label for the shared toolbar and an
//! optional week-ruler strip.
//!
//! Sections communicate upward exclusively through the [`InteractionBus`]:
//! pages report `shown` and `tapped` dates, the navigator drains the queue
//! and fans the new date out to every *other* live section. No section ever
//! holds a reference back to its navigator.
//!
//! The shared calendar read model, the surface tree, the selection, and the
//! event source are shared single-threaded handles ([`SharedInfo`],
//! [`SharedTree`], [`SharedSelection`], [`SharedSource`]); everything is
//! driven from the host's UI thread except the year section's raster worker
//! (see [`raster`]).

pub mod day;
pub mod month;
pub mod raster;
pub mod week;
pub mod year;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use almanac_events::EventQuery;
use almanac_info::CalendarInfo;
use almanac_selection::Selection;
use almanac_surface::{SurfaceId, SurfaceTree};
use chrono::NaiveDate;
use kurbo::Rect;

/// Section granularity, totally ordered from finest to coarsest.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    /// Single-day timeline.
    Day,
    /// Week ruler strip.
    Week,
    /// Month grid list.
    Month,
    /// Year raster list.
    Year,
}

/// Shared handle to the calendar read model.
pub type SharedInfo = Rc<RefCell<CalendarInfo>>;
/// Shared handle to the surface tree.
pub type SharedTree = Rc<RefCell<SurfaceTree>>;
/// Shared handle to the single-event selection.
pub type SharedSelection = Rc<RefCell<Selection<almanac_events::EventId, SurfaceId>>>;
/// Shared handle to the event query capability.
pub type SharedSource = Rc<RefCell<dyn EventQuery>>;

/// One user interaction reported by a section.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interaction {
    /// Scrolling settled with `date` presented.
    Shown {
        /// Originating section.
        sender: SectionKind,
        /// Presented date.
        date: NaiveDate,
    },
    /// The user tapped the element for `date`.
    Tapped {
        /// Originating section.
        sender: SectionKind,
        /// Tapped date.
        date: NaiveDate,
    },
    /// The user asked to re-center on the current day.
    Today,
}

/// Drained queue connecting sections to their navigator.
///
/// Pages push, the navigator drains once per pump. This is the reverse-
/// direction observer seam that replaces back-references from views to
/// controllers.
#[derive(Clone, Debug, Default)]
pub struct InteractionBus {
    queue: Rc<RefCell<VecDeque<Interaction>>>,
}

impl InteractionBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues one interaction.
    pub fn push(&self, interaction: Interaction) {
        self.queue.borrow_mut().push_back(interaction);
    }

    /// Drains all pending interactions in arrival order.
    #[must_use]
    pub fn drain(&self) -> Vec<Interaction> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

/// Toolbar display state of a regular section.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Date to show in the period label, if any.
    pub date: Option<NaiveDate>,
    /// Whether the label should include the month.
    pub shows_month: bool,
}

/// Common contract of every section controller.
pub trait Section {
    /// The granularity this section displays.
    fn kind(&self) -> SectionKind;

    /// Root surface of the section, inserted under the navigator container.
    fn root(&self) -> SurfaceId;

    /// Drops all materialized pages and re-renders from scratch. Used after
    /// locale changes that invalidate cached geometry.
    fn reload(&mut self);

    /// Re-renders materialized pages' content without discarding them. Used
    /// after event-data or day-boundary changes.
    fn update(&mut self);

    /// Scrolls the section to present `date`.
    fn scroll_to(&mut self, date: NaiveDate, animated: bool);

    /// Lays the section out in `bounds` (navigator-container coordinates).
    fn layout(&mut self, bounds: Rect);

    /// Drives deferred work (raster publishes, settle notifications).
    fn pump(&mut self) {}
}

/// Extended contract for sections hosted by the regular navigator.
pub trait RegularSection: Section {
    /// Current toolbar display state.
    fn display(&self) -> DisplayInfo;

    /// The week-ruler strip this section wants in the shared toolbar, with
    /// its natural height.
    fn ruler(&mut self) -> Option<&mut week::WeekStrip> {
        None
    }
}

/// How day cells mark the presence of events.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MarkerStyle {
    /// One dot whenever the day has any events.
    #[default]
    SingleDot,
    /// One dot per event, capped at three.
    MultiDot,
}
