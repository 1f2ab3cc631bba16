// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual configuration constants consumed by the section geometry.
//!
//! The component never shapes or rasterizes text itself; it only needs the
//! metrics that drive layout. [`FontMetrics`] therefore carries measured
//! numbers supplied by the embedder (or the defaults below, which match a
//! typical system font at each role's point size).

use peniko::Color;

/// Visual configuration for one component instance.
///
/// Injected at construction and frozen for the component's lifetime.
#[derive(Clone, Debug, Default)]
pub struct Style {
    /// Color roles.
    pub colors: Colors,
    /// Font metrics per label role.
    pub fonts: Fonts,
    /// Geometry constants.
    pub geometry: GeometryStyle,
}

/// Color roles used across the sections.
#[derive(Copy, Clone, Debug)]
pub struct Colors {
    /// Surface background.
    pub background: Color,
    /// Primary text.
    pub primary: Color,
    /// Secondary text (hour ticks, all-day label).
    pub secondary: Color,
    /// Weekend day labels.
    pub weekend: Color,
    /// Text drawn over the tint (today marker label).
    pub inverted: Color,
    /// Hairline rules.
    pub separator: Color,
    /// Accent: today markers, the now notch, selected period.
    pub tint: Color,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            background: Color::from_rgb8(0xff, 0xff, 0xff),
            primary: Color::from_rgb8(0x00, 0x00, 0x00),
            secondary: Color::from_rgb8(0x6c, 0x6c, 0x70),
            weekend: Color::from_rgb8(0x6c, 0x6c, 0x70),
            inverted: Color::from_rgb8(0xff, 0xff, 0xff),
            separator: Color::from_rgb8(0xc6, 0xc6, 0xc8),
            tint: Color::from_rgb8(0xf2, 0x26, 0x00),
        }
    }
}

/// Measured metrics of one font role.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FontMetrics {
    /// Point size.
    pub size: f64,
    /// Line height.
    pub line_height: f64,
    /// Height of a lowercase "x"; drives the title/grid gap in month plates.
    pub x_height: f64,
}

impl FontMetrics {
    /// Plausible metrics for a system font at `size` points.
    #[must_use]
    pub const fn system(size: f64) -> Self {
        Self {
            size,
            line_height: size * 1.2,
            x_height: size * 0.5,
        }
    }

    /// Uniformly scaled metrics.
    #[must_use]
    pub fn scaled(self, ratio: f64) -> Self {
        Self {
            size: self.size * ratio,
            line_height: self.line_height * ratio,
            x_height: self.x_height * ratio,
        }
    }
}

/// Font metrics per label role.
#[derive(Copy, Clone, Debug)]
pub struct Fonts {
    /// Toolbar period label.
    pub period: FontMetrics,
    /// Week-ruler day numbers.
    pub ruler_day: FontMetrics,
    /// "all day" strip label.
    pub day_allday: FontMetrics,
    /// Hour tick labels in the day section.
    pub day_time: FontMetrics,
    /// Month plate title.
    pub month_title: FontMetrics,
    /// Day numbers in the month grid.
    pub month_day: FontMetrics,
    /// Year heading in the year grid.
    pub year_year: FontMetrics,
    /// Weekday header row inside year month plates.
    pub year_weekday: FontMetrics,
    /// Event titles.
    pub event_normal: FontMetrics,
}

impl Default for Fonts {
    fn default() -> Self {
        Self {
            period: FontMetrics::system(16.0),
            ruler_day: FontMetrics::system(16.0),
            day_allday: FontMetrics::system(12.0),
            day_time: FontMetrics::system(12.0),
            month_title: FontMetrics::system(24.0),
            month_day: FontMetrics::system(17.0),
            year_year: FontMetrics::system(48.0),
            year_weekday: FontMetrics::system(12.0),
            event_normal: FontMetrics::system(13.0),
        }
    }
}

/// Geometry constants.
#[derive(Copy, Clone, Debug)]
pub struct GeometryStyle {
    /// Base inset between elements.
    pub inset: f64,
    /// Hairline thickness (one device pixel at the current scale).
    pub hairline: f64,
}

impl Default for GeometryStyle {
    fn default() -> Self {
        Self {
            inset: 8.0,
            hairline: 0.5,
        }
    }
}
