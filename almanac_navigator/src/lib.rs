// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Navigator: the embeddable calendar component.
//!
//! [`CalendarComponent`] is the construction surface an application embeds:
//! it owns the shared calendar read model, the surface tree, the selection,
//! the injected data source, and one of two navigators:
//!
//! - **Regular** (tablet-style): all four sections coexist and a segmented
//!   selection switches between them with a cross-fade;
//! - **Compact** (phone-style): sections live on a navigation stack rooted
//!   at the year grid; tapping a month cell pushes the month section,
//!   tapping a day cell pushes the day section, and popping can be driven
//!   interactively (the back-swipe), with cancellation as a first-class
//!   outcome.
//!
//! The component is host-pumped: the embedder forwards input (taps, scroll
//! deltas, gesture fractions), calls [`CalendarComponent::pump`] once per
//! frame to drain interactions, data-source streams, and raster publishes,
//! and ticks [`CalendarComponent::minute_tick`] from a pausable one-minute
//! timer for now-dependent re-renders.
//!
//! On every date-bearing interaction the navigator updates the shared date
//! and asks every *other* live section to scroll to it, never the section
//! that originated the change, which is what keeps linked surfaces
//! (day pager + week ruler, month list + year grid) synchronized without
//! feedback loops.

mod animations;
mod compact;
mod regular;

pub use compact::CompactNavigator;
pub use regular::RegularNavigator;

use std::cell::RefCell;
use std::rc::Rc;

use almanac_events::{DataSource, EventId, SourceError, SourceState};
use almanac_info::{CalendarConfig, CalendarInfo, Style};
use almanac_sections::day::OverlapTolerance;
use almanac_sections::raster::Rasterizer;
use almanac_sections::{
    InteractionBus, MarkerStyle, SectionKind, SharedInfo, SharedSelection, SharedSource,
    SharedTree,
};
use almanac_selection::Selection;
use almanac_surface::{Surface, SurfaceId, SurfaceTree};
use chrono::NaiveDateTime;
use kurbo::Rect;

/// Presentation mode of the navigation layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavigationMode {
    /// Side-by-side sections with a segmented switcher.
    Regular,
    /// Stack-based push/pop navigation.
    Compact,
    /// Choose by device class: regular on pads, compact on phones.
    Auto,
}

/// Coarse device class used by [`NavigationMode::Auto`] and the year grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    /// Phone-class environment.
    Compact,
    /// Pad-class environment.
    Regular,
}

/// Injection points beyond the core options.
pub struct Customization {
    /// Events-marker renderer for month day cells.
    pub marker: MarkerStyle,
    /// Override for the day view's overlap-clustering window; `None` derives
    /// the label-metric default.
    pub overlap_tolerance: Option<OverlapTolerance>,
    /// Rasterizer for year pages; `None` renders coordinates only.
    pub rasterizer: Option<Box<dyn Rasterizer + Send>>,
    /// Whether day pages drive the shared selection from taps. Embedders
    /// whose custom day renderer owns event interaction switch this off.
    pub standard_selection: bool,
    /// Sink for data-source errors.
    pub errors: Option<Box<dyn FnMut(&SourceError)>>,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            marker: MarkerStyle::SingleDot,
            overlap_tolerance: None,
            rasterizer: None,
            standard_selection: true,
            errors: None,
        }
    }
}

impl core::fmt::Debug for Customization {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Customization")
            .field("marker", &self.marker)
            .field("overlap_tolerance", &self.overlap_tolerance)
            .finish_non_exhaustive()
    }
}

/// Construction contract of the component. All options are frozen for the
/// component's lifetime.
pub struct Options<S> {
    /// Display title of the component.
    pub title: String,
    /// Calendar/locale configuration.
    pub calendar: CalendarConfig,
    /// Navigation mode.
    pub navigation: NavigationMode,
    /// Initially presented granularity.
    pub initial: SectionKind,
    /// The injected events capability.
    pub data_source: S,
    /// Visual configuration.
    pub style: Style,
    /// Handler invoked when an event becomes selected.
    pub selection: Option<Box<dyn FnMut(&EventId, &SurfaceId)>>,
    /// Renderer and sink injection points.
    pub customization: Customization,
    /// Device class for [`NavigationMode::Auto`] and grid density.
    pub device: DeviceClass,
}

impl<S> core::fmt::Debug for Options<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Options")
            .field("title", &self.title)
            .field("navigation", &self.navigation)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

/// Host notifications the component reacts to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The locale changed; formats and metrics are stale.
    LocaleChanged,
    /// The timezone or wall clock changed; geometry is stale.
    TimeZoneChanged,
    /// The calendar day rolled over while running.
    DayChanged,
}

enum Navigator {
    Regular(RegularNavigator),
    Compact(CompactNavigator),
}

/// The embeddable calendar component.
pub struct CalendarComponent<S: DataSource + 'static> {
    title: String,
    info: SharedInfo,
    tree: SharedTree,
    selection: SharedSelection,
    source: Rc<RefCell<S>>,
    errors: Option<Box<dyn FnMut(&SourceError)>>,
    navigator: Navigator,
    container: SurfaceId,
    placeholder: Option<(SurfaceId, S::Placeholder)>,
    ready: bool,
    bounds: Rect,
}

impl<S: DataSource + 'static> core::fmt::Debug for CalendarComponent<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CalendarComponent")
            .field("title", &self.title)
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

impl<S: DataSource + 'static> CalendarComponent<S> {
    /// Builds the component per the construction contract.
    #[must_use]
    pub fn new(options: Options<S>) -> Self {
        let Options {
            title,
            calendar,
            navigation,
            initial,
            data_source,
            style,
            selection,
            customization,
            device,
        } = options;

        let info: SharedInfo = Rc::new(RefCell::new(CalendarInfo::with_style(calendar, style)));
        let tree: SharedTree = Rc::new(RefCell::new(SurfaceTree::new()));
        let bus = InteractionBus::new();
        let selection: SharedSelection = Rc::new(RefCell::new(match selection {
            Some(handler) => Selection::with_handler(handler),
            None => Selection::new(),
        }));
        let source = Rc::new(RefCell::new(data_source));
        let shared_source: SharedSource = source.clone();

        let container = tree.borrow_mut().insert(None, Surface::default());

        let Customization {
            marker,
            overlap_tolerance,
            rasterizer,
            standard_selection,
            errors,
        } = customization;

        let use_regular = match navigation {
            NavigationMode::Regular => true,
            NavigationMode::Compact => false,
            NavigationMode::Auto => device == DeviceClass::Regular,
        };
        let regular_class = device == DeviceClass::Regular;

        let navigator = if use_regular {
            Navigator::Regular(RegularNavigator::new(
                info.clone(),
                tree.clone(),
                bus.clone(),
                shared_source,
                selection.clone(),
                container,
                initial,
                marker,
                overlap_tolerance,
                rasterizer,
                standard_selection,
                regular_class,
            ))
        } else {
            Navigator::Compact(CompactNavigator::new(
                info.clone(),
                tree.clone(),
                bus.clone(),
                shared_source,
                selection.clone(),
                container,
                initial,
                marker,
                overlap_tolerance,
                rasterizer,
                standard_selection,
            ))
        };

        let mut component = Self {
            title,
            info,
            tree,
            selection,
            source,
            errors,
            navigator,
            container,
            placeholder: None,
            ready: false,
            bounds: Rect::ZERO,
        };
        component.sync_source_state();
        component
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The shared surface tree embedders mirror into their view hierarchy.
    #[must_use]
    pub fn tree(&self) -> SharedTree {
        self.tree.clone()
    }

    /// The shared calendar read model.
    #[must_use]
    pub fn info(&self) -> SharedInfo {
        self.info.clone()
    }

    /// The shared selection; deselect through here.
    #[must_use]
    pub fn selection(&self) -> SharedSelection {
        self.selection.clone()
    }

    /// Root surface of the component.
    #[must_use]
    pub fn container(&self) -> SurfaceId {
        self.container
    }

    /// Surface carrying the data-source placeholder, when one is presented.
    #[must_use]
    pub fn placeholder_surface(&self) -> Option<SurfaceId> {
        self.placeholder.as_ref().map(|(surface, _)| *surface)
    }

    /// The compact navigator, when in compact mode.
    pub fn compact_mut(&mut self) -> Option<&mut CompactNavigator> {
        match &mut self.navigator {
            Navigator::Compact(navigator) => Some(navigator),
            Navigator::Regular(_) => None,
        }
    }

    /// The regular navigator, when in regular mode.
    pub fn regular_mut(&mut self) -> Option<&mut RegularNavigator> {
        match &mut self.navigator {
            Navigator::Regular(navigator) => Some(navigator),
            Navigator::Compact(_) => None,
        }
    }

    /// Lays the component out in `bounds` (host coordinates).
    pub fn layout(&mut self, bounds: Rect) {
        self.bounds = bounds;
        {
            let mut tree = self.tree.borrow_mut();
            if let Some(surface) = tree.get_mut(self.container) {
                surface.state.frame = bounds;
            }
            if let Some((surface, _)) = &self.placeholder {
                if let Some(surface) = tree.get_mut(*surface) {
                    surface.state.frame = Rect::new(0.0, 0.0, bounds.width(), bounds.height());
                }
            }
        }
        let local = Rect::new(0.0, 0.0, bounds.width(), bounds.height());
        match &mut self.navigator {
            Navigator::Regular(navigator) => navigator.layout(local),
            Navigator::Compact(navigator) => navigator.layout(local),
        }
    }

    /// Drains interactions, data-source streams, and deferred section work.
    /// Call once per frame from the UI thread.
    pub fn pump(&mut self) {
        self.sync_source_state();

        // Data-source errors go to the application sink.
        let drained = self.source.borrow_mut().drain_errors();
        if let Some(sink) = &mut self.errors {
            for error in &drained {
                sink(error);
            }
        }

        // Event data changed: refresh materialized pages in place.
        if self.source.borrow_mut().drain_changes() > 0 {
            match &mut self.navigator {
                Navigator::Regular(navigator) => navigator.update(),
                Navigator::Compact(navigator) => navigator.update(),
            }
        }

        match &mut self.navigator {
            Navigator::Regular(navigator) => navigator.pump(),
            Navigator::Compact(navigator) => navigator.pump(),
        }
    }

    /// Applies a host notification.
    pub fn notify(&mut self, notice: Notice) {
        self.info.borrow_mut().update();
        match notice {
            Notice::DayChanged => match &mut self.navigator {
                Navigator::Regular(navigator) => navigator.update(),
                Navigator::Compact(navigator) => navigator.update(),
            },
            Notice::LocaleChanged | Notice::TimeZoneChanged => match &mut self.navigator {
                Navigator::Regular(navigator) => navigator.reload(),
                Navigator::Compact(navigator) => navigator.reload(),
            },
        }
    }

    /// Advances the minute clock; drives the now notch and today highlight.
    /// The host pauses the timer (stops calling) while backgrounded.
    pub fn minute_tick(&mut self, now: NaiveDateTime) {
        let crossed = self.info.borrow_mut().set_now(now);
        if crossed {
            self.notify(Notice::DayChanged);
        } else {
            match &mut self.navigator {
                Navigator::Regular(navigator) => navigator.update(),
                Navigator::Compact(navigator) => navigator.update(),
            }
        }
    }

    /// Re-evaluates the data-source readiness, presenting or dismissing the
    /// placeholder and hiding the calendar while undetermined.
    fn sync_source_state(&mut self) {
        let state = self.source.borrow().state();
        match state {
            SourceState::Ready => {
                if let Some((surface, _)) = self.placeholder.take() {
                    self.tree.borrow_mut().remove(surface);
                }
                if !self.ready {
                    self.ready = true;
                    self.set_hidden(false);
                }
            }
            SourceState::Undetermined => {
                if let Some((surface, _)) = self.placeholder.take() {
                    self.tree.borrow_mut().remove(surface);
                }
                self.ready = false;
                self.set_hidden(true);
            }
            SourceState::Placeholder(payload) => {
                self.ready = false;
                self.set_hidden(true);
                if self.placeholder.is_none() {
                    let surface = self.tree.borrow_mut().insert(
                        Some(self.container),
                        Surface::with_frame(Rect::new(
                            0.0,
                            0.0,
                            self.bounds.width(),
                            self.bounds.height(),
                        )),
                    );
                    if let Some(s) = self.tree.borrow_mut().get_mut(surface) {
                        s.state.z_index = 10;
                    }
                    self.placeholder = Some((surface, payload));
                }
            }
        }
    }

    fn set_hidden(&mut self, hidden: bool) {
        match &mut self.navigator {
            Navigator::Regular(navigator) => navigator.set_hidden(hidden),
            Navigator::Compact(navigator) => navigator.set_hidden(hidden),
        }
    }
}
