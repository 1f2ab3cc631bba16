// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Date arithmetic between calendar dates and signed axis offsets.
//!
//! Every virtualized axis indexes its pages as signed offsets from the epoch
//! anchor `zero` in one [`Unit`]. [`offset`] and [`date_at`] convert between
//! the two representations; for every date `d`,
//! `date_at(zero, unit, offset(d, unit, zero)) == start_of(d, unit)`.
//!
//! Arithmetic that can leave the representable date range returns `None`.
//! Callers recover by substituting "now" and logging; overflow is a
//! recoverable degradation, never fatal.

use chrono::{Datelike, Days, Months, NaiveDate};

/// Axis unit: the granularity pages of one axis are spaced by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    /// One page per day.
    Days,
    /// One page per display week.
    Weeks,
    /// One page per month.
    Months,
    /// One page per year.
    Years,
}

/// Start of the month containing `date`.
#[must_use]
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Start of the year containing `date`.
#[must_use]
pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// Zero-based position of `date` within its display week.
///
/// `first_weekday` is 1-based with `1 = Sunday`. The result is the grid
/// column a month view places the date in.
#[must_use]
pub fn week_position(date: NaiveDate, first_weekday: u32) -> u32 {
    (date.weekday().number_from_sunday() + 7 - first_weekday.clamp(1, 7)) % 7
}

/// Start of the display week containing `date`.
#[must_use]
pub fn start_of_week(date: NaiveDate, first_weekday: u32) -> NaiveDate {
    let back = week_position(date, first_weekday);
    date.checked_sub_days(Days::new(u64::from(back))).unwrap_or(date)
}

/// Number of days in the month containing `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = start_of_month(date);
    let next = first
        .checked_add_months(Months::new(1))
        .unwrap_or(first);
    u32::try_from((next - first).num_days()).unwrap_or(1).max(1)
}

/// Number of week rows the month containing `date` occupies in a grid that
/// starts weeks on `first_weekday`.
#[must_use]
pub fn week_rows_in_month(date: NaiveDate, first_weekday: u32) -> u32 {
    let first = start_of_month(date);
    let lead = week_position(first, first_weekday);
    (lead + days_in_month(date)).div_ceil(7)
}

/// Zero-based week row of `date` within its month grid.
#[must_use]
pub fn week_row(date: NaiveDate, first_weekday: u32) -> u32 {
    let first = start_of_month(date);
    let lead = week_position(first, first_weekday);
    (lead + date.day() - 1) / 7
}

/// Signed offset of `date` from `zero` in `unit`.
///
/// Offsets are measured between the period starts containing each endpoint,
/// so any date within the same period maps to the same index. Week offsets
/// depend on the configured `first_weekday`; the other units ignore it.
#[must_use]
pub fn offset(date: NaiveDate, unit: Unit, zero: NaiveDate, first_weekday: u32) -> i64 {
    match unit {
        Unit::Days => (date - zero).num_days(),
        Unit::Weeks => offset_weeks(date, zero, first_weekday),
        Unit::Months => {
            let a = i64::from(date.year()) * 12 + i64::from(date.month0());
            let b = i64::from(zero.year()) * 12 + i64::from(zero.month0());
            a - b
        }
        Unit::Years => i64::from(date.year()) - i64::from(zero.year()),
    }
}

/// Signed offset of `date`'s display week from `zero`'s display week.
#[must_use]
pub fn offset_weeks(date: NaiveDate, zero: NaiveDate, first_weekday: u32) -> i64 {
    let a = start_of_week(date, first_weekday);
    let b = start_of_week(zero, first_weekday);
    (a - b).num_days() / 7
}

/// The date at signed offset `index` from `zero` in `unit`.
///
/// Returns the *start* of the indexed period, or `None` when the arithmetic
/// leaves the representable range.
#[must_use]
pub fn date_at(zero: NaiveDate, unit: Unit, index: i64, first_weekday: u32) -> Option<NaiveDate> {
    match unit {
        Unit::Days => add_days(zero, index),
        Unit::Weeks => week_at(zero, first_weekday, index),
        Unit::Months => add_months(start_of_month(zero), index),
        Unit::Years => add_months(start_of_year(zero), index.checked_mul(12)?),
    }
}

/// The date at signed week offset `index`, honoring the configured first
/// weekday.
#[must_use]
pub fn week_at(zero: NaiveDate, first_weekday: u32, index: i64) -> Option<NaiveDate> {
    add_days(start_of_week(zero, first_weekday), index.checked_mul(7)?)
}

/// `date + days`, signed and checked.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// `date + months`, signed and checked.
#[must_use]
pub fn add_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = u32::try_from(months.unsigned_abs()).ok()?;
    if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_positions_follow_first_weekday() {
        // 2021-06-07 is a Monday.
        let monday = date(2021, 6, 7);
        assert_eq!(week_position(monday, 2), 0);
        assert_eq!(week_position(monday, 1), 1);

        let sunday = date(2021, 6, 6);
        assert_eq!(week_position(sunday, 2), 6);
        assert_eq!(week_position(sunday, 1), 0);
    }

    #[test]
    fn start_of_week_rolls_back_to_first_weekday() {
        let wednesday = date(2021, 6, 9);
        assert_eq!(start_of_week(wednesday, 2), date(2021, 6, 7));
        assert_eq!(start_of_week(wednesday, 1), date(2021, 6, 6));
    }

    #[test]
    fn offsets_round_trip_to_period_starts() {
        let zero = date(2001, 1, 1);
        let samples = [
            date(2021, 6, 15),
            date(1999, 12, 31),
            date(2001, 1, 1),
            date(2024, 2, 29),
        ];

        for d in samples {
            for unit in [Unit::Days, Unit::Weeks, Unit::Months, Unit::Years] {
                let start = match unit {
                    Unit::Days => d,
                    Unit::Weeks => start_of_week(d, 2),
                    Unit::Months => start_of_month(d),
                    Unit::Years => start_of_year(d),
                };
                assert_eq!(
                    date_at(zero, unit, offset(d, unit, zero, 2), 2),
                    Some(start),
                    "round trip failed for {d} in {unit:?}",
                );
            }
        }
    }

    #[test]
    fn month_shape_queries() {
        // June 2021: 30 days, first day is a Tuesday.
        let june = date(2021, 6, 1);
        assert_eq!(days_in_month(june), 30);
        assert_eq!(week_rows_in_month(june, 2), 5);
        assert_eq!(week_row(date(2021, 6, 1), 2), 0);
        assert_eq!(week_row(date(2021, 6, 7), 2), 1);
        assert_eq!(week_row(date(2021, 6, 30), 2), 4);
    }

    #[test]
    fn overflow_degrades_to_none() {
        assert_eq!(add_days(NaiveDate::MAX, 2), None);
        assert_eq!(date_at(NaiveDate::MAX, Unit::Years, 10, 2), None);
    }
}
