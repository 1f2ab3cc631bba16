// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integration tests for the calendar component: navigation, date
//! dispatch, and transition commit/cancel behavior.

use almanac_events::{Event, Interval, StaticSource};
use almanac_info::CalendarConfig;
use almanac_navigator::{
    CalendarComponent, Customization, DeviceClass, NavigationMode, Options,
};
use almanac_sections::Section;
use almanac_sections::SectionKind;
use chrono::NaiveDate;
use kurbo::{Point, Rect};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn component(navigation: NavigationMode, initial: SectionKind) -> CalendarComponent<StaticSource> {
    let start = date(2021, 6, 9).and_hms_opt(9, 0, 0).unwrap();
    let end = date(2021, 6, 9).and_hms_opt(10, 0, 0).unwrap();
    let mut component = CalendarComponent::new(Options {
        title: "Calendar".into(),
        calendar: CalendarConfig::default(),
        navigation,
        initial,
        data_source: StaticSource::new(vec![Event::timed(
            1,
            "standup",
            Interval::new(start, end),
        )]),
        style: almanac_info::Style::default(),
        selection: None,
        customization: Customization::default(),
        device: DeviceClass::Compact,
    });
    {
        let info = component.info();
        let mut info = info.borrow_mut();
        info.date = date(2021, 6, 9);
        let now = date(2021, 6, 9).and_hms_opt(12, 0, 0).unwrap();
        info.set_now(now);
    }
    component.layout(Rect::new(0.0, 0.0, 375.0, 667.0));
    // Recenter every section on the fixed test date.
    match navigation {
        NavigationMode::Compact => component.compact_mut().unwrap().today(),
        _ => component.regular_mut().unwrap().today(),
    }
    component.pump();
    component
}

#[test]
fn initial_month_prepushes_the_stack() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);
    let navigator = component.compact_mut().unwrap();
    assert_eq!(navigator.stack(), &[SectionKind::Year, SectionKind::Month]);
    assert_eq!(navigator.current(), SectionKind::Month);
    assert!(navigator.month().is_some());
}

#[test]
fn initial_day_prepushes_month_and_day() {
    let mut component = component(NavigationMode::Compact, SectionKind::Day);
    let navigator = component.compact_mut().unwrap();
    assert_eq!(
        navigator.stack(),
        &[SectionKind::Year, SectionKind::Month, SectionKind::Day],
    );
}

#[test]
fn month_cell_tap_sets_date_and_pushes_day() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);
    let tree = component.tree();
    let target = date(2021, 6, 17);

    // Find the tapped cell's viewport position inside the month section.
    let tap = {
        let navigator = component.compact_mut().unwrap();
        let month = navigator.month().unwrap();
        let page = month.page_for(target).unwrap();
        let cell = page.cell_for(target).unwrap();
        let center = tree.borrow().get(cell.surface).unwrap().position();
        let origin = month.page_origin(target).unwrap();
        Point::new(center.x, center.y + origin)
    };

    component.compact_mut().unwrap().month_mut().unwrap().tap(tap);
    component.pump();

    assert_eq!(component.info().borrow().date, target);
    let navigator = component.compact_mut().unwrap();
    assert_eq!(navigator.current(), SectionKind::Day);
    assert!(navigator.in_transition());

    // Drive the push to completion.
    navigator.tick_transition(0.6);
    assert!(!navigator.in_transition());
    assert_eq!(
        navigator.stack(),
        &[SectionKind::Year, SectionKind::Month, SectionKind::Day],
    );
    let day = navigator.day().unwrap();
    assert!(day.page_for(target).is_some());
}

#[test]
fn shown_interaction_never_scrolls_the_sender() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);

    // The user drags the month list far enough that a new month settles.
    {
        let navigator = component.compact_mut().unwrap();
        let month = navigator.month_mut().unwrap();
        let origin_before = month.page_origin(date(2021, 6, 9)).unwrap();
        month.scroll_by(700.0);
        let origin_after = month.page_origin(date(2021, 6, 9));
        assert!(origin_after.is_none() || origin_after != Some(origin_before));
    }

    let shown = component.info().borrow().date;
    component.pump();

    // The shared date moved with the month list, and the month list was not
    // re-scrolled by its own notification.
    let after = component.info().borrow().date;
    assert_ne!(shown, after, "settling a new month updates the shared date");
    let navigator = component.compact_mut().unwrap();
    let month = navigator.month().unwrap();
    assert!(
        month.page_for(after).is_some(),
        "the month the user landed on stays presented",
    );
}

#[test]
fn cancelled_interactive_pop_restores_surfaces_and_stack() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);
    let tree = component.tree();

    let reference = tree.borrow().snapshot();
    let navigator = component.compact_mut().unwrap();
    assert!(navigator.begin_interactive_pop());
    navigator.set_pop_progress(0.6);
    navigator.end_interactive_pop(false);

    assert_eq!(navigator.stack(), &[SectionKind::Year, SectionKind::Month]);
    assert_eq!(navigator.current(), SectionKind::Month);

    // Every surface the gesture touched is back to its pre-gesture state.
    let tree = tree.borrow();
    let month_root = navigator.month().unwrap().page_for(date(2021, 6, 9)).unwrap().surface;
    assert_eq!(
        tree.get(month_root).unwrap().state,
        *reference.state_of(month_root).unwrap(),
    );
}

#[test]
fn committed_interactive_pop_reveals_the_year() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);
    let navigator = component.compact_mut().unwrap();

    assert!(navigator.begin_interactive_pop());
    navigator.set_pop_progress(0.9);
    navigator.end_interactive_pop(true);

    assert_eq!(navigator.stack(), &[SectionKind::Year]);
    assert_eq!(navigator.current(), SectionKind::Year);
    assert!(!navigator.in_transition());
}

#[test]
fn today_recenters_without_changing_kind() {
    let mut component = component(NavigationMode::Compact, SectionKind::Month);
    {
        let info = component.info();
        info.borrow_mut().date = date(2022, 3, 5);
    }
    let navigator = component.compact_mut().unwrap();
    navigator.today();

    assert_eq!(navigator.current(), SectionKind::Month);
    assert_eq!(component.info().borrow().date, date(2021, 6, 9));
    let navigator = component.compact_mut().unwrap();
    assert!(navigator.month().unwrap().page_for(date(2021, 6, 9)).is_some());
}

#[test]
fn regular_mode_switches_sections_with_a_fade() {
    let mut component = component(NavigationMode::Regular, SectionKind::Month);
    let tree = component.tree();

    let navigator = component.regular_mut().unwrap();
    assert_eq!(navigator.current(), SectionKind::Month);

    navigator.select(SectionKind::Year);
    assert_eq!(navigator.current(), SectionKind::Year);

    // Mid-fade both endpoints are live; completion leaves only the year.
    navigator.tick_fade(0.1);
    let year_root = navigator.year().root();
    let month_root = navigator.month().root();
    {
        let tree = tree.borrow();
        let year_opacity = tree.get(year_root).unwrap().state.opacity;
        assert!(year_opacity > 0.0 && year_opacity < 1.0);
    }

    navigator.tick_fade(0.3);
    let tree = tree.borrow();
    assert!(tree.get(year_root).unwrap().is_visible());
    assert_eq!(tree.get(year_root).unwrap().state.opacity, 1.0);
    assert!(!tree.get(month_root).unwrap().is_visible());
}

#[test]
fn regular_year_tap_jumps_to_the_day_section() {
    let mut component = component(NavigationMode::Regular, SectionKind::Year);

    let (target, point) = {
        let navigator = component.regular_mut().unwrap();
        let page = navigator.year().page_for(date(2021, 6, 9)).unwrap();
        let (tapped, center) = page.coordinates.days[160];
        (tapped, Point::new(center.x, center.y))
    };
    component.regular_mut().unwrap().year_mut().tap(point);
    component.pump();

    assert_eq!(component.info().borrow().date, target);
    let navigator = component.regular_mut().unwrap();
    assert_eq!(navigator.current(), SectionKind::Day);
}

#[test]
fn placeholder_state_presents_a_substitute_surface() {
    // A source that reports a placeholder.
    struct Denied;
    impl almanac_events::DataSource for Denied {
        type Placeholder = &'static str;

        fn state(&self) -> almanac_events::SourceState<&'static str> {
            almanac_events::SourceState::Placeholder("no access")
        }

        fn drain_changes(&mut self) -> usize {
            0
        }

        fn drain_errors(&mut self) -> Vec<almanac_events::SourceError> {
            vec![almanac_events::SourceError::AccessDenied]
        }

        fn events(&self, _interval: Interval) -> almanac_events::Fetch<Vec<Event>> {
            almanac_events::Fetch::ready(Vec::new())
        }

        fn save(
            &mut self,
            _event: Event,
        ) -> almanac_events::Fetch<Result<(), almanac_events::SourceError>> {
            almanac_events::Fetch::ready(Ok(()))
        }
    }

    use std::cell::RefCell;
    use std::rc::Rc;

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let mut component = CalendarComponent::new(Options {
        title: "Calendar".into(),
        calendar: CalendarConfig::default(),
        navigation: NavigationMode::Compact,
        initial: SectionKind::Year,
        data_source: Denied,
        style: almanac_info::Style::default(),
        selection: None,
        customization: Customization {
            errors: Some(Box::new(move |error| sink.borrow_mut().push(error.clone()))),
            ..Customization::default()
        },
        device: DeviceClass::Compact,
    });
    component.layout(Rect::new(0.0, 0.0, 375.0, 667.0));
    component.pump();

    assert!(component.placeholder_surface().is_some());
    assert_eq!(
        seen.borrow().as_slice(),
        &[almanac_events::SourceError::AccessDenied],
    );
}
