// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact (stack-based) navigation.
//!
//! The year section is the permanent root of the stack. A tap on a month
//! plate pushes the month section; a tap on a day cell pushes the day
//! section; back navigation pops, optionally driven by an interactive
//! gesture whose cancellation is a first-class outcome. There is no direct
//! day↔year animated transition; crossing two levels composes two pushes.

use almanac_sections::day::{DaySection, OverlapTolerance};
use almanac_sections::month::MonthSection;
use almanac_sections::raster::Rasterizer;
use almanac_sections::year::YearSection;
use almanac_sections::{
    Interaction, InteractionBus, MarkerStyle, Section, SectionKind, SharedInfo, SharedSelection,
    SharedSource, SharedTree,
};
use almanac_surface::SurfaceId;
use almanac_transition::{Driver, Script};
use chrono::NaiveDate;
use kurbo::Rect;

const TRANSITION_DURATION: f64 = 0.5;

/// Sections a date change must be fanned out to, excluding the sender.
///
/// Every *other* live section scrolls exactly once; the originating section
/// never scrolls itself, which is what prevents feedback loops between
/// linked surfaces.
fn scroll_targets(live: &[SectionKind], sender: Option<SectionKind>) -> Vec<SectionKind> {
    live.iter()
        .copied()
        .filter(|kind| Some(*kind) != sender)
        .collect()
}

struct ActiveTransition {
    driver: Driver,
    /// Kind being pushed or revealed by a pop.
    to: SectionKind,
    /// `true` while popping (interactive or programmatic).
    pop: bool,
    elapsed: f64,
    interactive: bool,
}

/// Stack-based navigator: year-rooted push/pop with morphing transitions.
pub struct CompactNavigator {
    info: SharedInfo,
    tree: SharedTree,
    bus: InteractionBus,
    source: SharedSource,
    selection: SharedSelection,
    container: SurfaceId,
    marker: MarkerStyle,
    tolerance: Option<OverlapTolerance>,
    standard_selection: bool,
    year: YearSection,
    month: Option<MonthSection>,
    day: Option<DaySection>,
    stack: Vec<SectionKind>,
    transition: Option<ActiveTransition>,
    bounds: Rect,
}

impl core::fmt::Debug for CompactNavigator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompactNavigator")
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl CompactNavigator {
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
    ) -> Self {
        let year = YearSection::new(
            info.clone(),
            tree.clone(),
            bus.clone(),
            container,
            false,
            rasterizer,
        );
        let mut navigator = Self {
            info,
            tree,
            bus,
            source,
            selection,
            container,
            marker,
            tolerance,
            standard_selection,
            year,
            month: None,
            day: None,
            stack: vec![SectionKind::Year],
            transition: None,
            bounds: Rect::ZERO,
        };

        // Deeper initial granularities pre-push their stack un-animated.
        match initial {
            SectionKind::Day => {
                navigator.push_unanimated(SectionKind::Month);
                navigator.push_unanimated(SectionKind::Day);
            }
            SectionKind::Month => navigator.push_unanimated(SectionKind::Month),
            SectionKind::Year | SectionKind::Week => {}
        }
        navigator
    }

    /// The stack, bottom to top.
    #[must_use]
    pub fn stack(&self) -> &[SectionKind] {
        &self.stack
    }

    /// The currently presented kind.
    #[must_use]
    pub fn current(&self) -> SectionKind {
        *self.stack.last().unwrap_or(&SectionKind::Year)
    }

    /// Returns `true` while a transition is in flight.
    #[must_use]
    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// The year section (stack root).
    #[must_use]
    pub fn year(&self) -> &YearSection {
        &self.year
    }

    /// The year section, mutably.
    pub fn year_mut(&mut self) -> &mut YearSection {
        &mut self.year
    }

    /// The month section, once it has been pushed.
    #[must_use]
    pub fn month(&self) -> Option<&MonthSection> {
        self.month.as_ref()
    }

    /// The month section, mutably.
    pub fn month_mut(&mut self) -> Option<&mut MonthSection> {
        self.month.as_mut()
    }

    /// The day section, once it has been pushed.
    #[must_use]
    pub fn day(&self) -> Option<&DaySection> {
        self.day.as_ref()
    }

    /// The day section, mutably.
    pub fn day_mut(&mut self) -> Option<&mut DaySection> {
        self.day.as_mut()
    }

    pub(crate) fn layout(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.year.layout(bounds);
        if let Some(month) = &mut self.month {
            month.layout(bounds);
        }
        if let Some(day) = &mut self.day {
            day.layout(bounds);
        }
        self.apply_visibility();
    }

    pub(crate) fn reload(&mut self) {
        self.year.reload();
        if let Some(month) = &mut self.month {
            month.reload();
        }
        if let Some(day) = &mut self.day {
            day.reload();
        }
    }

    pub(crate) fn update(&mut self) {
        self.year.update();
        if let Some(month) = &mut self.month {
            month.update();
        }
        if let Some(day) = &mut self.day {
            day.update();
        }
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        let mut tree = self.tree.borrow_mut();
        let mut roots = vec![self.year.root()];
        if let Some(month) = &self.month {
            roots.push(month.root());
        }
        if let Some(day) = &self.day {
            roots.push(day.root());
        }
        for root in roots {
            if let Some(surface) = tree.get_mut(root) {
                surface.state.opacity = if hidden { 0.0 } else { 1.0 };
            }
        }
    }

    pub(crate) fn pump(&mut self) {
        if let Some(day) = &mut self.day {
            day.pump();
        }
        self.year.pump();
        for interaction in self.bus.drain() {
            self.handle(interaction);
        }
    }

    /// Advances a non-interactive transition by `dt` seconds.
    pub fn tick_transition(&mut self, dt: f64) {
        let Some(transition) = &mut self.transition else {
            return;
        };
        if transition.interactive {
            return;
        }
        transition.elapsed += dt.max(0.0);
        let progress = (transition.elapsed / TRANSITION_DURATION).clamp(0.0, 1.0);
        {
            let mut tree = self.tree.borrow_mut();
            transition.driver.set_progress(&mut tree, progress);
        }
        if progress >= 1.0 {
            self.finish_transition(true);
        }
    }

    /// Starts the interactive back gesture; returns `false` when there is
    /// nothing to pop or a transition is already running.
    pub fn begin_interactive_pop(&mut self) -> bool {
        if self.transition.is_some() || self.stack.len() < 2 {
            return false;
        }
        self.begin_pop(true)
    }

    /// Feeds the back gesture's fraction.
    pub fn set_pop_progress(&mut self, fraction: f64) {
        if let Some(transition) = &mut self.transition {
            if transition.interactive {
                let mut tree = self.tree.borrow_mut();
                transition.driver.set_progress(&mut tree, fraction);
            }
        }
    }

    /// Ends the back gesture. Releasing before the threshold passes
    /// `committed = false`, and the stack and every surface return to their
    /// pre-gesture state.
    pub fn end_interactive_pop(&mut self, committed: bool) {
        if self.transition.as_ref().is_some_and(|t| t.interactive) {
            self.finish_transition(committed);
        }
    }

    /// Programmatic back navigation.
    pub fn pop(&mut self) {
        if self.transition.is_some() || self.stack.len() < 2 {
            return;
        }
        self.begin_pop(false);
    }

    fn handle(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::Shown { sender, date } => self.set_date(date, Some(sender)),
            Interaction::Tapped { sender, date } => {
                self.set_date(date, Some(sender));
                match sender {
                    SectionKind::Year => self.push(SectionKind::Month),
                    SectionKind::Month => self.push(SectionKind::Day),
                    SectionKind::Day | SectionKind::Week => {}
                }
            }
            Interaction::Today => self.today(),
        }
    }

    /// Re-centers every section on the current day without changing kind.
    /// When the day section already shows today, it additionally re-scrolls
    /// its time axis to the now notch.
    pub fn today(&mut self) {
        let now = self.info.borrow().now.date();
        if self.current() == SectionKind::Day {
            if let Some(day) = &mut self.day {
                day.scroll_to_now();
            }
        }
        self.set_date(now, None);
    }

    fn set_date(&mut self, date: NaiveDate, sender: Option<SectionKind>) {
        {
            let mut info = self.info.borrow_mut();
            if sender.is_some() && info.date == date {
                return;
            }
            info.date = date;
        }
        for kind in scroll_targets(&self.stack.clone(), sender) {
            match kind {
                SectionKind::Year => self.year.scroll_to(date, true),
                SectionKind::Month => {
                    if let Some(month) = &mut self.month {
                        month.scroll_to(date, true);
                    }
                }
                SectionKind::Day => {
                    if let Some(day) = &mut self.day {
                        day.scroll_to(date, true);
                    }
                }
                SectionKind::Week => {}
            }
        }
    }

    fn ensure_section(&mut self, kind: SectionKind) {
        match kind {
            SectionKind::Month if self.month.is_none() => {
                let mut month = MonthSection::new(
                    self.info.clone(),
                    self.tree.clone(),
                    self.bus.clone(),
                    self.source.clone(),
                    self.marker,
                    self.container,
                );
                if self.bounds.width() > 0.0 {
                    month.layout(self.bounds);
                }
                let date = self.info.borrow().date;
                month.scroll_to(date, false);
                self.month = Some(month);
            }
            SectionKind::Day if self.day.is_none() => {
                let mut day = DaySection::new(
                    self.info.clone(),
                    self.tree.clone(),
                    self.bus.clone(),
                    self.source.clone(),
                    self.selection.clone(),
                    self.container,
                    self.tolerance,
                    self.standard_selection,
                );
                if self.bounds.width() > 0.0 {
                    day.layout(self.bounds);
                }
                let date = self.info.borrow().date;
                day.scroll_to(date, false);
                self.day = Some(day);
            }
            _ => {}
        }
    }

    fn push_unanimated(&mut self, kind: SectionKind) {
        self.ensure_section(kind);
        self.stack.push(kind);
        self.apply_visibility();
    }

    fn push(&mut self, kind: SectionKind) {
        if self.transition.is_some() || self.stack.contains(&kind) {
            return;
        }
        let from = self.current();
        self.ensure_section(kind);
        {
            let date = self.info.borrow().date;
            match kind {
                SectionKind::Month => {
                    if let Some(month) = &mut self.month {
                        month.scroll_to(date, false);
                    }
                }
                SectionKind::Day => {
                    if let Some(day) = &mut self.day {
                        day.scroll_to(date, false);
                    }
                }
                SectionKind::Year | SectionKind::Week => {}
            }
        }
        // Both endpoints stay visible for the ride; the snapshot taken by
        // the driver must record the destination as presented.
        self.set_section_hidden(kind, false);

        let scripts = self.build_scripts(from, kind);
        self.stack.push(kind);
        match scripts {
            Some((from_script, to_script)) => {
                let mut tree = self.tree.borrow_mut();
                let driver = Driver::begin(&mut tree, from_script, to_script);
                drop(tree);
                self.transition = Some(ActiveTransition {
                    driver,
                    to: kind,
                    pop: false,
                    elapsed: 0.0,
                    interactive: false,
                });
            }
            // Endpoint geometry unresolved: degrade to a cut. Never surfaced
            // to the user.
            None => {
                log::debug!("push {from:?} -> {kind:?} degraded to a cut");
                self.apply_visibility();
            }
        }
    }

    fn begin_pop(&mut self, interactive: bool) -> bool {
        let from = self.current();
        let Some(&to) = self.stack.get(self.stack.len().saturating_sub(2)) else {
            return false;
        };
        // The revealed section participates; make it visible for the ride.
        self.set_section_hidden(to, false);

        let scripts = self.build_scripts(from, to);
        match scripts {
            Some((from_script, to_script)) => {
                let mut tree = self.tree.borrow_mut();
                let driver = Driver::begin(&mut tree, from_script, to_script);
                drop(tree);
                self.transition = Some(ActiveTransition {
                    driver,
                    to,
                    pop: true,
                    elapsed: 0.0,
                    interactive,
                });
                true
            }
            None => {
                // Cut: pop immediately.
                log::debug!("pop {from:?} -> {to:?} degraded to a cut");
                self.stack.pop();
                self.apply_visibility();
                false
            }
        }
    }

    /// Builds the `(from, to)` script pair for an adjacent kind change.
    fn build_scripts(&mut self, from: SectionKind, to: SectionKind) -> Option<(Script, Script)> {
        let date = self.info.borrow().date;
        match (from, to) {
            (SectionKind::Year, SectionKind::Month) | (SectionKind::Month, SectionKind::Year) => {
                // Year pages publish their geometry before the morph reads it.
                self.year.render_now(date);
                let info = self.info.borrow();
                let tree = self.tree.borrow();
                let month = self.month.as_ref()?;
                let (year_script, month_script) = crate::animations::year_month_scripts(
                    &info,
                    &tree,
                    self.container,
                    &self.year,
                    month,
                )?;
                if from == SectionKind::Year {
                    Some((year_script, month_script))
                } else {
                    Some((month_script, year_script))
                }
            }
            (SectionKind::Month, SectionKind::Day) | (SectionKind::Day, SectionKind::Month) => {
                let info = self.info.borrow();
                let tree = self.tree.borrow();
                let month = self.month.as_ref()?;
                let day = self.day.as_ref()?;
                let ruler = day.ruler();
                let (month_script, day_script) = crate::animations::month_day_scripts(
                    &info,
                    &tree,
                    self.container,
                    month,
                    day.root(),
                    ruler,
                    Rect::new(0.0, 0.0, self.bounds.width(), self.bounds.height()),
                )?;
                if from == SectionKind::Month {
                    Some((month_script, day_script))
                } else {
                    Some((day_script, month_script))
                }
            }
            // No direct day↔year animation; those changes are cuts.
            _ => None,
        }
    }

    fn finish_transition(&mut self, committed: bool) {
        let Some(mut transition) = self.transition.take() else {
            return;
        };
        {
            let mut tree = self.tree.borrow_mut();
            transition.driver.finish(&mut tree, committed);
        }

        if transition.pop {
            if committed {
                self.stack.pop();
                // The user may have landed on an off-center element; snap the
                // revealed section back onto the shared date.
                let date = self.info.borrow().date;
                match transition.to {
                    SectionKind::Year => self.year.reload(),
                    SectionKind::Month => {
                        if let Some(month) = &mut self.month {
                            month.scroll_to(date, false);
                        }
                    }
                    SectionKind::Day | SectionKind::Week => {}
                }
            }
        } else if committed {
            // Push committed: the covered section may sit off-center from
            // the tap; normalize it while it is invisible.
            match transition.to {
                SectionKind::Month => self.year.reload(),
                SectionKind::Day => {
                    if let Some(month) = &mut self.month {
                        month.reload();
                    }
                }
                SectionKind::Year | SectionKind::Week => {}
            }
        } else {
            // Push cancelled: the stack keeps its pre-push shape.
            self.stack.pop();
        }
        self.apply_visibility();
    }

    fn set_section_hidden(&mut self, kind: SectionKind, hidden: bool) {
        let root = match kind {
            SectionKind::Year => Some(self.year.root()),
            SectionKind::Month => self.month.as_ref().map(Section::root),
            SectionKind::Day => self.day.as_ref().map(Section::root),
            SectionKind::Week => None,
        };
        if let Some(root) = root {
            let mut tree = self.tree.borrow_mut();
            if let Some(surface) = tree.get_mut(root) {
                surface.set_hidden(hidden);
            }
        }
    }

    fn apply_visibility(&mut self) {
        let top = self.current();
        let during_transition = self.transition.is_some();
        // The section beneath the top stays visible mid-transition.
        let beneath = self
            .stack
            .len()
            .checked_sub(2)
            .and_then(|slot| self.stack.get(slot))
            .copied();
        for kind in [SectionKind::Year, SectionKind::Month, SectionKind::Day] {
            let visible = kind == top || (during_transition && Some(kind) == beneath);
            self.set_section_hidden(kind, !visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_targets_exclude_the_sender() {
        let live = [SectionKind::Year, SectionKind::Month, SectionKind::Day];
        let targets = scroll_targets(&live, Some(SectionKind::Month));
        assert_eq!(targets, vec![SectionKind::Year, SectionKind::Day]);
    }

    #[test]
    fn scroll_targets_hit_every_section_for_today() {
        let live = [SectionKind::Year, SectionKind::Month];
        let targets = scroll_targets(&live, None);
        assert_eq!(targets, vec![SectionKind::Year, SectionKind::Month]);
    }

    #[test]
    fn scroll_targets_visit_each_live_section_once() {
        let live = [SectionKind::Year, SectionKind::Month, SectionKind::Day];
        let targets = scroll_targets(&live, Some(SectionKind::Day));
        let mut deduped = targets.clone();
        deduped.dedup();
        assert_eq!(targets, deduped);
        assert!(!targets.contains(&SectionKind::Day));
    }
}
