// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Regular (side-by-side) navigation.
//!
//! All four sections coexist; a segmented selection switches the presented
//! one with a cross-fade; no morphing transitions in this mode. The shared
//! toolbar reads the current section's display label and hosts its optional
//! week ruler.

use almanac_sections::day::{DaySection, OverlapTolerance};
use almanac_sections::month::MonthSection;
use almanac_sections::raster::Rasterizer;
use almanac_sections::week::{WeekSection, WeekStrip};
use almanac_sections::year::YearSection;
use almanac_sections::{
    DisplayInfo, Interaction, InteractionBus, MarkerStyle, RegularSection, Section, SectionKind,
    SharedInfo, SharedSelection, SharedSource, SharedTree,
};
use almanac_surface::SurfaceId;
use almanac_transition::{Blocks, Driver, Edit, Op, Script, Target};
use chrono::NaiveDate;
use kurbo::Rect;

const FADE_DURATION: f64 = 0.25;

/// Side-by-side navigator: four coexisting sections, one presented.
pub struct RegularNavigator {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    day: DaySection,
    week: WeekSection,
    month: MonthSection,
    year: YearSection,
    current: SectionKind,
    fade: Option<(Driver, f64)>,
    bounds: Rect,
}

impl core::fmt::Debug for RegularNavigator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegularNavigator")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl RegularNavigator {
    #[expect(clippy::too_many_arguments, reason = "construction-time wiring")]
    pub(crate) fn new(
        info: SharedInfo,
        tree: SharedTree,
        bus: InteractionBus,
        source: SharedSource,
        selection: SharedSelection,
        container: SurfaceId,
        initial: SectionKind,
        marker: MarkerStyle,
        tolerance: Option<OverlapTolerance>,
        rasterizer: Option<Box<dyn Rasterizer + Send>>,
        standard_selection: bool,
        regular_class: bool,
    ) -> Self {
        let day = DaySection::new(
            info.clone(),
            tree.clone(),
            bus.clone(),
            source.clone(),
            selection,
            container,
            tolerance,
            standard_selection,
        );
        let week = WeekSection::new(info.clone(), tree.clone(), bus.clone(), container);
        let month = MonthSection::new(
            info.clone(),
            tree.clone(),
            bus.clone(),
            source,
            marker,
            container,
        );
        let year = YearSection::new(
            info.clone(),
            tree.clone(),
            bus.clone(),
            container,
            regular_class,
            rasterizer,
        );
        let mut navigator = Self {
            info,
            tree,
            bus,
            day,
            week,
            month,
            year,
            current: initial,
            fade: None,
            bounds: Rect::ZERO,
        };
        navigator.apply_visibility();
        navigator
    }

    /// The presented section kind.
    #[must_use]
    pub fn current(&self) -> SectionKind {
        self.current
    }

    /// Toolbar display state of the presented section.
    #[must_use]
    pub fn display(&self) -> DisplayInfo {
        match self.current {
            SectionKind::Day => self.day.display(),
            SectionKind::Week => self.week.display(),
            SectionKind::Month => self.month.display(),
            SectionKind::Year => self.year.display(),
        }
    }

    /// The presented section's week ruler, for the shared toolbar.
    pub fn ruler(&mut self) -> Option<&mut WeekStrip> {
        match self.current {
            SectionKind::Day => RegularSection::ruler(&mut self.day),
            SectionKind::Week => RegularSection::ruler(&mut self.week),
            SectionKind::Month => RegularSection::ruler(&mut self.month),
            SectionKind::Year => RegularSection::ruler(&mut self.year),
        }
    }

    /// Presents a section, cross-fading from the previous one.
    pub fn select(&mut self, kind: SectionKind) {
        if kind == self.current || self.fade.is_some() {
            return;
        }
        let from_root = self.root_of(self.current);
        let to_root = self.root_of(kind);
        self.current = kind;

        // Destination joins at zero opacity; the fade is a pair of opacity
        // scripts for the shared driver.
        {
            let mut tree = self.tree.borrow_mut();
            if let Some(surface) = tree.get_mut(to_root) {
                surface.set_hidden(false);
            }
        }
        let from_script = Script {
            foreign: Blocks {
                animate: vec![Edit::new(Target::Surface(from_root), Op::Opacity(0.0))],
                ..Blocks::default()
            },
            ..Script::default()
        };
        let to_script = Script {
            foreign: Blocks {
                animate: vec![Edit::new(Target::Surface(to_root), Op::Opacity(0.0))],
                ..Blocks::default()
            },
            native: Blocks {
                animate: vec![Edit::new(Target::Surface(to_root), Op::Opacity(1.0))],
                ..Blocks::default()
            },
            ..Script::default()
        };
        let mut tree = self.tree.borrow_mut();
        let driver = Driver::begin(&mut tree, from_script, to_script);
        drop(tree);
        self.fade = Some((driver, 0.0));
    }

    /// Advances a running cross-fade by `dt` seconds.
    pub fn tick_fade(&mut self, dt: f64) {
        let Some((driver, elapsed)) = &mut self.fade else {
            return;
        };
        *elapsed += dt.max(0.0);
        let progress = (*elapsed / FADE_DURATION).clamp(0.0, 1.0);
        {
            let mut tree = self.tree.borrow_mut();
            driver.set_progress(&mut tree, progress);
        }
        if progress >= 1.0 {
            if let Some((mut driver, _)) = self.fade.take() {
                let mut tree = self.tree.borrow_mut();
                driver.finish(&mut tree, true);
            }
            self.apply_visibility();
        }
    }

    /// Re-centers every section on the current day without changing kind.
    pub fn today(&mut self) {
        let now = self.info.borrow().now.date();
        self.set_date(now, None);
    }

    /// The day section.
    #[must_use]
    pub fn day(&self) -> &DaySection {
        &self.day
    }

    /// The month section.
    #[must_use]
    pub fn month(&self) -> &MonthSection {
        &self.month
    }

    /// The year section.
    #[must_use]
    pub fn year(&self) -> &YearSection {
        &self.year
    }

    /// The day section, mutably.
    pub fn day_mut(&mut self) -> &mut DaySection {
        &mut self.day
    }

    /// The month section, mutably.
    pub fn month_mut(&mut self) -> &mut MonthSection {
        &mut self.month
    }

    /// The year section, mutably.
    pub fn year_mut(&mut self) -> &mut YearSection {
        &mut self.year
    }

    /// The presented section, mutably, for input forwarding.
    pub fn current_section_mut(&mut self) -> &mut dyn Section {
        match self.current {
            SectionKind::Day => &mut self.day,
            SectionKind::Week => &mut self.week,
            SectionKind::Month => &mut self.month,
            SectionKind::Year => &mut self.year,
        }
    }

    pub(crate) fn layout(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.day.layout(bounds);
        self.week.layout(bounds);
        self.month.layout(bounds);
        self.year.layout(bounds);
    }

    pub(crate) fn reload(&mut self) {
        self.day.reload();
        self.week.reload();
        self.month.reload();
        self.year.reload();
    }

    pub(crate) fn update(&mut self) {
        self.day.update();
        self.week.update();
        self.month.update();
        self.year.update();
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        let root = self.root_of(self.current);
        let mut tree = self.tree.borrow_mut();
        if let Some(surface) = tree.get_mut(root) {
            surface.state.opacity = if hidden { 0.0 } else { 1.0 };
        }
    }

    pub(crate) fn pump(&mut self) {
        self.day.pump();
        self.year.pump();
        for interaction in self.bus.drain() {
            self.handle(interaction);
        }
    }

    fn handle(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Shown { sender, date } => self.set_date(date, Some(sender)),
            Interaction::Tapped { sender, date } => {
                // Only the year grid drills down in regular mode: a tapped
                // day jumps straight to the day section.
                if sender == SectionKind::Year {
                    self.set_date(date, Some(sender));
                    self.select(SectionKind::Day);
                }
            }
            Interaction::Today => {
                let now = self.info.borrow().now.date();
                self.set_date(now, None);
            }
        }
    }

    fn set_date(&mut self, date: NaiveDate, sender: Option<SectionKind>) {
        {
            let mut info = self.info.borrow_mut();
            if sender.is_some() && info.date == date {
                return;
            }
            info.date = date;
        }
        for kind in [
            SectionKind::Day,
            SectionKind::Week,
            SectionKind::Month,
            SectionKind::Year,
        ] {
            if Some(kind) == sender {
                continue;
            }
            match kind {
                SectionKind::Day => self.day.scroll_to(date, true),
                SectionKind::Week => self.week.scroll_to(date, true),
                SectionKind::Month => self.month.scroll_to(date, true),
                SectionKind::Year => self.year.scroll_to(date, true),
            }
        }
    }

    fn root_of(&self, kind: SectionKind) -> SurfaceId {
        match kind {
            SectionKind::Day => self.day.root(),
            SectionKind::Week => self.week.root(),
            SectionKind::Month => self.month.root(),
            SectionKind::Year => self.year.root(),
        }
    }

    fn apply_visibility(&mut self) {
        let current = self.current;
        let mut tree = self.tree.borrow_mut();
        for kind in [
            SectionKind::Day,
            SectionKind::Week,
            SectionKind::Month,
            SectionKind::Year,
        ] {
            let root = match kind {
                SectionKind::Day => self.day.root(),
                SectionKind::Week => self.week.root(),
                SectionKind::Month => self.month.root(),
                SectionKind::Year => self.year.root(),
            };
            if let Some(surface) = tree.get_mut(root) {
                surface.set_hidden(kind != current);
            }
        }
    }
}
