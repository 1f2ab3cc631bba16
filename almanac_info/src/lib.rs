// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Info: the shared calendar read model.
//!
//! Every other Almanac crate queries one [`CalendarInfo`] instance for
//! calendar metrics and the currently selected date. The instance is created
//! by the embedding component, shared by reference across the component
//! tree, and mutated only by the navigator and by the host's
//! locale/timezone/day-boundary notifications (via [`CalendarInfo::update`]).
//!
//! The core concepts are:
//!
//! - [`CalendarConfig`]: the immutable-per-update configuration (first
//!   weekday, weekend rule, epoch reference, format patterns).
//! - [`CalendarInfo`]: the derived snapshot: `zero` (the epoch anchor all
//!   axis indices are measured from), the selected `date`, the
//!   minute-precision `now`, and [`Metrics`].
//! - [`arith`]: date arithmetic between dates and signed axis offsets, per
//!   [`arith::Unit`]. Indexing is invertible: for every date `d` and unit
//!   `u`, `date_at(zero, u, offset(d, u, zero)) == start_of(d, u)`.
//!
//! Consumers must treat the metrics as a snapshot valid only until the next
//! [`CalendarInfo::update`]; nothing here is cached beyond one render pass.
//!
//! ## Minimal example
//!
//! ```rust
//! use almanac_info::{CalendarConfig, CalendarInfo};
//! use almanac_info::arith::{self, Unit};
//! use chrono::NaiveDate;
//!
//! let info = CalendarInfo::new(CalendarConfig::default());
//!
//! // Monday-first weeks put Saturday and Sunday in positions 6 and 7.
//! assert_eq!(info.metrics.weekends.positions(), vec![6, 7]);
//!
//! // Axis indexing is derived from dates, and is invertible.
//! let d = NaiveDate::from_ymd_opt(2021, 6, 15).unwrap();
//! let index = info.index_of(d, Unit::Months);
//! assert_eq!(
//!     info.date_of(Unit::Months, index),
//!     NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
//! );
//! # let _ = arith::start_of_year(d);
//! ```

pub mod arith;
mod style;

pub use style::{Colors, FontMetrics, Fonts, GeometryStyle, Style};

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

/// Configuration the calendar read model is derived from.
///
/// The embedder constructs one of these from its locale/platform calendar and
/// re-applies it through [`CalendarInfo::update`] whenever the locale,
/// timezone, or day changes.
#[derive(Clone, Debug)]
pub struct CalendarConfig {
    /// First day of the display week, 1-based with `1 = Sunday` through
    /// `7 = Saturday` (the Unicode calendar convention).
    pub first_weekday: u32,
    /// Which physical weekdays count as weekend.
    pub weekend: Vec<Weekday>,
    /// Reference date whose year start becomes the epoch anchor `zero`.
    pub reference: NaiveDate,
    /// Format patterns for the labels the component renders.
    pub formats: Formats,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            first_weekday: 2,
            weekend: vec![Weekday::Sat, Weekday::Sun],
            // Start of the third millennium, matching the platform reference
            // epoch the component was designed around.
            reference: NaiveDate::from_ymd_opt(2001, 1, 1).expect("valid reference date"),
            formats: Formats::default(),
        }
    }
}

/// Chrono format patterns for the eight label roles of the component.
///
/// Localized rendering is the embedder's concern; the core only threads the
/// patterns through to [`CalendarInfo::label`].
#[derive(Clone, Debug)]
pub struct Formats {
    /// `2021`
    pub year: String,
    /// `February`
    pub month: String,
    /// `Feb`
    pub month_short: String,
    /// `31`
    pub day: String,
    /// `04:56`
    pub hour: String,
    /// `30 May`
    pub day_and_month: String,
    /// `We 30`
    pub weekday_and_day: String,
    /// `Wednesday, 2 June 2021`
    pub full: String,
}

impl Default for Formats {
    fn default() -> Self {
        Self {
            year: "%Y".into(),
            month: "%B".into(),
            month_short: "%b".into(),
            day: "%-d".into(),
            hour: "%H:%M".into(),
            day_and_month: "%-d %b".into(),
            weekday_and_day: "%a %-d".into(),
            full: "%A, %-d %B %Y".into(),
        }
    }
}

/// A set of 1-based positions within the display week.
///
/// Positions are counted from the configured first weekday: position 1 is the
/// first column of a week row. Stored as a bitset so metrics stay `Copy`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// An empty set.
    pub const EMPTY: Self = Self(0);

    /// Inserts a position (`1..=7`). Out-of-range positions are ignored.
    pub fn insert(&mut self, position: u32) {
        if (1..=7).contains(&position) {
            self.0 |= 1 << (position - 1);
        }
    }

    /// Returns `true` if the set contains `position`.
    #[must_use]
    pub const fn contains(self, position: u32) -> bool {
        position >= 1 && position <= 7 && (self.0 & (1 << (position - 1))) != 0
    }

    /// Returns the contained positions in ascending order.
    #[must_use]
    pub fn positions(self) -> Vec<u32> {
        (1..=7).filter(|&p| self.contains(p)).collect()
    }
}

/// Derived calendar metrics, recomputed by [`CalendarInfo::update`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Metrics {
    /// Days per display week.
    pub days_in_week: u32,
    /// Maximum week rows a month grid can need.
    pub weeks_in_month: u32,
    /// Months per year row group.
    pub months_in_year: u32,
    /// First day of the display week, 1-based with `1 = Sunday`.
    pub first_weekday: u32,
    /// Weekend positions within the display week.
    pub weekends: WeekdaySet,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            days_in_week: 7,
            weeks_in_month: 6,
            months_in_year: 12,
            first_weekday: 2,
            weekends: WeekdaySet::EMPTY,
        }
    }
}

/// The shared calendar read model.
///
/// One instance exists per calendar component tree. `zero` anchors every axis
/// index: a page index is always a signed offset from `zero` in the axis's
/// unit, so axis position is derivable from a date (and back) via [`arith`].
#[derive(Clone, Debug)]
pub struct CalendarInfo {
    /// Active configuration.
    pub config: CalendarConfig,
    /// Visual configuration constants.
    pub style: Style,
    /// Epoch anchor: start of the year containing the configured reference.
    pub zero: NaiveDate,
    /// Currently selected date, day precision.
    pub date: NaiveDate,
    /// Current time at minute precision, advanced by the host's timer tick.
    pub now: NaiveDateTime,
    /// Derived calendar metrics.
    pub metrics: Metrics,
}

impl CalendarInfo {
    /// Creates the read model and derives the initial snapshot.
    #[must_use]
    pub fn new(config: CalendarConfig) -> Self {
        Self::with_style(config, Style::default())
    }

    /// Creates the read model with explicit style constants.
    #[must_use]
    pub fn with_style(config: CalendarConfig, style: Style) -> Self {
        let now = chrono::Local::now().naive_local();
        let mut info = Self {
            config,
            style,
            zero: NaiveDate::default(),
            date: now.date(),
            now,
            metrics: Metrics::default(),
        };
        info.update();
        info
    }

    /// Recomputes `zero` and all derived metrics from the configuration.
    ///
    /// Call on construction and on every locale-change, timezone-change, or
    /// day-boundary notification.
    pub fn update(&mut self) {
        self.zero = arith::start_of_year(self.config.reference);

        let first_weekday = self.config.first_weekday.clamp(1, 7);
        let mut weekends = WeekdaySet::EMPTY;
        for position in 1..=7 {
            let number = (first_weekday - 1 + position - 1) % 7 + 1;
            if self
                .config
                .weekend
                .iter()
                .any(|day| day.number_from_sunday() == number)
            {
                weekends.insert(position);
            }
        }

        self.metrics = Metrics {
            days_in_week: 7,
            weeks_in_month: 6,
            months_in_year: 12,
            first_weekday,
            weekends,
        };
    }

    /// Replaces the configuration and re-derives the snapshot.
    pub fn set_config(&mut self, config: CalendarConfig) {
        self.config = config;
        self.update();
    }

    /// Advances the minute-precision clock; returns `true` when the day
    /// boundary was crossed since the previous value.
    pub fn set_now(&mut self, now: NaiveDateTime) -> bool {
        let crossed = now.date() != self.now.date();
        self.now = now;
        crossed
    }

    /// Returns `true` if `date` is the current day.
    #[must_use]
    pub fn is_today(&self, date: NaiveDate) -> bool {
        date == self.now.date()
    }

    /// Returns `true` if `date` falls on a weekend position of the display
    /// week.
    #[must_use]
    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        let position = arith::week_position(date, self.metrics.first_weekday) + 1;
        self.metrics.weekends.contains(position)
    }

    /// Renders a date with one of the configured format patterns.
    #[must_use]
    pub fn label(&self, pattern: &str, date: NaiveDate) -> String {
        date.format(pattern).to_string()
    }

    /// Signed axis index of `date` in `unit`, measured from `zero`.
    #[must_use]
    pub fn index_of(&self, date: NaiveDate, unit: arith::Unit) -> i64 {
        arith::offset(date, unit, self.zero, self.metrics.first_weekday)
    }

    /// The period start at axis index `index` in `unit`.
    ///
    /// Calendar overflow degrades to the current day (and logs); axis pages
    /// must always resolve to *some* date.
    #[must_use]
    pub fn date_of(&self, unit: arith::Unit, index: i64) -> NaiveDate {
        match arith::date_at(self.zero, unit, index, self.metrics.first_weekday) {
            Some(date) => date,
            None => {
                log::warn!("calendar index {index} in {unit:?} overflowed; substituting today");
                self.now.date()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_with_first_weekday(first_weekday: u32) -> CalendarInfo {
        CalendarInfo::new(CalendarConfig {
            first_weekday,
            ..CalendarConfig::default()
        })
    }

    #[test]
    fn weekend_positions_with_monday_first() {
        let info = info_with_first_weekday(2);
        assert_eq!(info.metrics.weekends.positions(), vec![6, 7]);
    }

    #[test]
    fn weekend_positions_with_sunday_first() {
        let info = info_with_first_weekday(1);
        // Sunday leads the week, Saturday closes it.
        assert_eq!(info.metrics.weekends.positions(), vec![1, 7]);
    }

    #[test]
    fn zero_is_start_of_reference_year() {
        let info = CalendarInfo::new(CalendarConfig::default());
        assert_eq!(info.zero, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
    }

    #[test]
    fn weekend_check_uses_display_positions() {
        let info = info_with_first_weekday(2);
        let saturday = NaiveDate::from_ymd_opt(2021, 6, 5).unwrap();
        let monday = NaiveDate::from_ymd_opt(2021, 6, 7).unwrap();
        assert!(info.is_weekend(saturday));
        assert!(!info.is_weekend(monday));
    }

    #[test]
    fn set_now_reports_day_boundary() {
        let mut info = CalendarInfo::new(CalendarConfig::default());
        let base = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        info.set_now(base);
        let next = NaiveDate::from_ymd_opt(2021, 6, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(info.set_now(next));
        assert!(!info.set_now(next));
    }
}
