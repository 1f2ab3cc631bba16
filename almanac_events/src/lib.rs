// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Events: the event model and the data-source capability.
//!
//! The calendar core never embeds a concrete events provider. Whatever
//! supplies events (a device calendar store, a network sync layer, a test
//! fixture) satisfies [`DataSource`] and is injected at construction. The
//! capability is pull-based: sections ask for the events of a date interval
//! and receive a lazy, single-shot [`Fetch`] they start when (and if) the
//! page actually renders.
//!
//! Change and error reporting are drainable streams in keeping with the
//! single-threaded, host-pumped concurrency model: the component drains
//! [`DataSource::drain_changes`] and [`DataSource::drain_errors`] once per
//! pump and reacts on its own thread.
//!
//! [`StaticSource`] is the in-memory implementation used by tests and
//! examples, in the way a virtualization core ships a fixed-extent model
//! alongside the trait.

use chrono::{NaiveDate, NaiveDateTime};
use peniko::Color;
use thiserror::Error;

/// Stable identity of an event within its source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventId(pub u64);

/// Half-open time interval `[start, end)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    /// Inclusive start.
    pub start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
}

impl Interval {
    /// Creates an interval, swapping the endpoints if reversed.
    #[must_use]
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// The whole day containing `date`.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let end = date
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .unwrap_or(start);
        Self { start, end }
    }

    /// Returns `true` when the two intervals overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Duration in whole minutes.
    #[must_use]
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// One calendar event value.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Identity within the source.
    pub id: EventId,
    /// Display title.
    pub title: String,
    /// Optional location line.
    pub location: Option<String>,
    /// Occupied time interval.
    pub interval: Interval,
    /// All-day events render in the day section's separate strip.
    pub all_day: bool,
    /// Calendar color of the event.
    pub color: Color,
    /// Read-only events reject [`DataSource::save`].
    pub read_only: bool,
}

impl Event {
    /// A timed event covering `interval`.
    #[must_use]
    pub fn timed(id: u64, title: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: EventId(id),
            title: title.into(),
            location: None,
            interval,
            all_day: false,
            color: Color::from_rgb8(0x3b, 0x82, 0xf6),
            read_only: false,
        }
    }

    /// An all-day event on `date`.
    #[must_use]
    pub fn all_day(id: u64, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            all_day: true,
            ..Self::timed(id, title, Interval::day(date))
        }
    }
}

/// Readiness of a data source.
///
/// `P` is whatever the embedder renders as the full-bleed substitute while
/// the source cannot provide events (commonly a surface handle or a factory).
#[derive(Clone, Debug)]
pub enum SourceState<P> {
    /// Access has not been determined yet; the calendar hides itself.
    Undetermined,
    /// Events are available.
    Ready,
    /// The source cannot provide events; render the payload instead.
    Placeholder(P),
}

impl<P> SourceState<P> {
    /// Returns `true` for [`SourceState::Ready`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl<P> PartialEq for SourceState<P> {
    /// Placeholder states never compare equal: a new placeholder always
    /// replaces the previous one.
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Undetermined, Self::Undetermined) | (Self::Ready, Self::Ready)
        )
    }
}

/// Errors a data source surfaces through its error stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The user denied access to the underlying store.
    #[error("access to the event store was denied")]
    AccessDenied,
    /// The store is temporarily unavailable.
    #[error("event store unavailable: {0}")]
    Unavailable(String),
    /// A save was rejected.
    #[error("event could not be saved: {0}")]
    Rejected(String),
}

/// A lazy, single-shot producer.
///
/// Nothing happens until [`Fetch::start`] consumes it; starting yields the
/// value to the provided consumer exactly once. This keeps event queries
/// pull-based: an axis page that is dropped before rendering never pays for
/// its query.
pub struct Fetch<T>(Box<dyn FnOnce() -> T>);

impl<T> core::fmt::Debug for Fetch<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Fetch { .. }")
    }
}

impl<T: 'static> Fetch<T> {
    /// Wraps a deferred computation.
    #[must_use]
    pub fn new(thunk: impl FnOnce() -> T + 'static) -> Self {
        Self(Box::new(thunk))
    }

    /// An already-computed value.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self::new(move || value)
    }

    /// Starts the producer, handing the value to `consumer`.
    pub fn start(self, consumer: impl FnOnce(T)) {
        consumer((self.0)());
    }

    /// Maps the produced value.
    #[must_use]
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Fetch<U> {
        Fetch::new(move || f((self.0)()))
    }
}

/// The injected events capability.
pub trait DataSource {
    /// Placeholder payload rendered while the source is not ready.
    type Placeholder;

    /// Current readiness.
    fn state(&self) -> SourceState<Self::Placeholder>;

    /// Drains pending change notifications, returning how many arrived since
    /// the last drain. Any non-zero count invalidates rendered event data.
    fn drain_changes(&mut self) -> usize;

    /// Drains pending errors for the application-supplied sink.
    fn drain_errors(&mut self) -> Vec<SourceError>;

    /// Lazily fetches the events overlapping `interval`.
    fn events(&self, interval: Interval) -> Fetch<Vec<Event>>;

    /// Lazily persists an event.
    fn save(&mut self, event: Event) -> Fetch<Result<(), SourceError>>;
}

/// Object-safe, read-only view of a data source: just the event query.
///
/// Sections hold this instead of the full [`DataSource`] so they stay
/// independent of the placeholder payload type.
pub trait EventQuery {
    /// Lazily fetches the events overlapping `interval`.
    fn events_in(&self, interval: Interval) -> Fetch<Vec<Event>>;
}

impl<T: DataSource> EventQuery for T {
    fn events_in(&self, interval: Interval) -> Fetch<Vec<Event>> {
        self.events(interval)
    }
}

/// In-memory data source for tests and examples.
#[derive(Debug, Default)]
pub struct StaticSource {
    events: std::rc::Rc<std::cell::RefCell<Vec<Event>>>,
    pending_changes: usize,
    pending_errors: Vec<SourceError>,
}

impl StaticSource {
    /// A ready source over the given events.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: std::rc::Rc::new(std::cell::RefCell::new(events)),
            pending_changes: 0,
            pending_errors: Vec::new(),
        }
    }

    /// Replaces the stored events and queues a change notification.
    pub fn replace(&mut self, events: Vec<Event>) {
        *self.events.borrow_mut() = events;
        self.pending_changes += 1;
    }

    /// Queues an error for the next drain.
    pub fn push_error(&mut self, error: SourceError) {
        self.pending_errors.push(error);
    }
}

impl DataSource for StaticSource {
    type Placeholder = ();

    fn state(&self) -> SourceState<()> {
        SourceState::Ready
    }

    fn drain_changes(&mut self) -> usize {
        core::mem::take(&mut self.pending_changes)
    }

    fn drain_errors(&mut self) -> Vec<SourceError> {
        core::mem::take(&mut self.pending_errors)
    }

    fn events(&self, interval: Interval) -> Fetch<Vec<Event>> {
        let events = self.events.clone();
        Fetch::new(move || {
            events
                .borrow()
                .iter()
                .filter(|event| event.interval.overlaps(&interval))
                .cloned()
                .collect()
        })
    }

    fn save(&mut self, event: Event) -> Fetch<Result<(), SourceError>> {
        if event.read_only {
            return Fetch::ready(Err(SourceError::Rejected("event is read-only".into())));
        }
        let events = self.events.clone();
        self.pending_changes += 1;
        Fetch::new(move || {
            let mut events = events.borrow_mut();
            match events.iter_mut().find(|existing| existing.id == event.id) {
                Some(existing) => *existing = event,
                None => events.push(event),
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn interval_overlap_is_half_open() {
        let a = Interval::new(at(2021, 6, 1, 9, 0), at(2021, 6, 1, 10, 0));
        let b = Interval::new(at(2021, 6, 1, 10, 0), at(2021, 6, 1, 11, 0));
        let c = Interval::new(at(2021, 6, 1, 9, 30), at(2021, 6, 1, 10, 30));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn fetch_is_lazy_and_single_shot() {
        use std::cell::Cell;
        use std::rc::Rc;

        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let fetch = Fetch::new(move || {
            counter.set(counter.get() + 1);
            42
        });
        assert_eq!(runs.get(), 0, "nothing runs before start");

        let mut seen = None;
        fetch.start(|value| seen = Some(value));
        assert_eq!(seen, Some(42));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn static_source_filters_by_interval() {
        let source = StaticSource::new(vec![
            Event::timed(
                1,
                "breakfast",
                Interval::new(at(2021, 6, 1, 9, 0), at(2021, 6, 1, 10, 0)),
            ),
            Event::timed(
                2,
                "far away",
                Interval::new(at(2021, 7, 1, 9, 0), at(2021, 7, 1, 10, 0)),
            ),
        ]);

        let mut seen = Vec::new();
        source
            .events(Interval::day(date(2021, 6, 1)))
            .start(|events| seen = events);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, EventId(1));
    }

    #[test]
    fn save_rejects_read_only_and_notifies_changes() {
        let mut source = StaticSource::new(Vec::new());
        let mut event = Event::timed(
            1,
            "standup",
            Interval::new(at(2021, 6, 1, 9, 0), at(2021, 6, 1, 9, 15)),
        );

        source.save(event.clone()).start(|result| assert!(result.is_ok()));
        assert_eq!(source.drain_changes(), 1);
        assert_eq!(source.drain_changes(), 0);

        event.read_only = true;
        source
            .save(event)
            .start(|result| assert_eq!(result, Err(SourceError::Rejected("event is read-only".into()))));
    }

    #[test]
    fn placeholder_states_never_compare_equal() {
        let a: SourceState<u32> = SourceState::Placeholder(1);
        let b: SourceState<u32> = SourceState::Placeholder(1);
        assert_ne!(a, b);
        assert_eq!(
            SourceState::<u32>::Ready,
            SourceState::<u32>::Ready,
        );
    }
}
