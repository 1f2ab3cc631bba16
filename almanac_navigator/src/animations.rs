// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transition script builders for the compact navigator.
//!
//! Each builder is a pure function of the two endpoints' current geometry:
//! it reads anchor-element positions out of both sections' coordinate
//! spaces, converts them through the surface tree, and produces a script
//! pair for the generic driver. If any required geometry cannot be resolved
//! (a page not materialized, a surface gone), the builder returns `None` and
//! the navigator degrades to an un-animated cut.
//!
//! Direction is the caller's concern: the same pair serves push and pop,
//! with the navigator choosing which script is the outgoing `from` and which
//! the incoming `to`.

use almanac_info::CalendarInfo;
use almanac_sections::Section;
use almanac_sections::month::{MonthMetrics, MonthSection};
use almanac_sections::week::WeekStrip;
use almanac_sections::year::YearSection;
use almanac_surface::{Surface, SurfaceId, SurfaceState, SurfaceTree};
use almanac_transition::{Blocks, Cleanup, Edit, Op, Script, Target, TempSpec};
use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Scripts for the year↔month transition: `(year, month)`.
///
/// The year grid scales about the target month plate while the live month
/// grid's day cells morph between their grid slots and the corresponding
/// day centers of the year raster, with text compensated by the year's
/// `fonts_ratio`.
pub fn year_month_scripts(
    info: &CalendarInfo,
    tree: &SurfaceTree,
    container: SurfaceId,
    year: &YearSection,
    month: &MonthSection,
) -> Option<(Script, Script)> {
    let date = info.date;
    let year_page = year.page_for(date)?;
    let plate = *year_page.coordinates.month_plate(date)?;
    let month_page = month.page_for(date)?;

    // Anchor geometry in container coordinates.
    let plate_frame = tree.convert_rect(plate.frame, year_page.surface, container)?;
    let month_bounds = tree.get(month_page.surface)?.state.frame;
    let month_frame = tree.convert_rect(
        Rect::new(0.0, 0.0, month_bounds.width(), month_bounds.height()),
        month_page.surface,
        container,
    )?;
    if plate_frame.width() <= 0.0 || plate_frame.height() <= 0.0 {
        return None;
    }
    let diff_ratio = (month_frame.width() / plate_frame.width())
        .max(month_frame.height() / plate_frame.height());
    let month_center = month_frame.center();

    // Re-anchor the year root's pivot to the plate center so one
    // scale+translate morphs the whole grid into the month's place.
    let year_root = year.root();
    let root_frame = tree.get(year_root)?.state.frame;
    if root_frame.width() <= 0.0 || root_frame.height() <= 0.0 {
        return None;
    }
    let pivot = Point::new(
        (plate_frame.center().x - root_frame.x0) / root_frame.width(),
        (plate_frame.center().y - root_frame.y0) / root_frame.height(),
    );
    let rest_position = Point::new(
        root_frame.x0 + pivot.x * root_frame.width(),
        root_frame.y0 + pivot.y * root_frame.height(),
    );

    // Stand-in plate covering the target month of the raster, with an
    // even-odd hole keeping the weekday header visible.
    let plate_local_hole = (plate.hole.width() > 0.0).then(|| {
        plate.hole - Vec2::new(plate.frame.x0, plate.frame.y0)
    });
    let year_script = Script {
        temporaries: vec![TempSpec {
            parent: year_page.surface,
            state: SurfaceState {
                frame: plate.frame,
                hole: plate_local_hole,
                z_index: 5,
                ..SurfaceState::default()
            },
        }],
        native: Blocks {
            prepare: vec![Edit::new(Target::Surface(year_root), Op::Pivot(pivot))],
            animate: vec![
                Edit::new(Target::Surface(year_root), Op::Position(rest_position)),
                Edit::new(Target::Surface(year_root), Op::Transform(Affine::IDENTITY)),
                Edit::new(Target::Surface(year_root), Op::Opacity(1.0)),
            ],
            cleanup: Cleanup {
                committed: vec![Edit::new(
                    Target::Surface(year_root),
                    Op::Pivot(Point::new(0.5, 0.5)),
                )],
                cancelled: vec![],
            },
        },
        foreign: Blocks {
            prepare: vec![Edit::new(Target::Surface(year_root), Op::Pivot(pivot))],
            animate: vec![
                Edit::new(Target::Surface(year_root), Op::Position(month_center)),
                Edit::new(
                    Target::Surface(year_root),
                    Op::Transform(Affine::scale(diff_ratio)),
                ),
                Edit::new(Target::Surface(year_root), Op::Opacity(0.0)),
            ],
            cleanup: Cleanup {
                committed: vec![
                    Edit::new(Target::Surface(year_root), Op::Opacity(1.0)),
                    Edit::new(Target::Surface(year_root), Op::Transform(Affine::IDENTITY)),
                    Edit::new(Target::Surface(year_root), Op::Pivot(Point::new(0.5, 0.5))),
                ],
                cancelled: vec![],
            },
        },
    };

    // Month side: every day cell morphs between its grid slot and the
    // matching day center of the raster.
    let metrics = MonthMetrics::new(info);
    let fonts_ratio = year_page.geometry.fonts_ratio;
    let text_anchor_y = (info.style.geometry.inset / 2.0 + metrics.today_diameter / 2.0)
        / metrics.day_height;
    // The today disc lands at the raster's marker size, compensating for the
    // cell's own scale.
    let marker_ratio = if metrics.today_diameter > 0.0 && fonts_ratio > 0.0 {
        (year_page.geometry.marker_radius * 2.0) / metrics.today_diameter / fonts_ratio
    } else {
        1.0
    };

    let mut foreign_prepare = vec![Edit::new(
        Target::Surface(month_page.surface),
        Op::Frozen(true),
    )];
    let mut foreign_animate = Vec::new();
    let mut native_animate = Vec::new();
    let mut commit_cleanup = vec![Edit::new(
        Target::Surface(month_page.surface),
        Op::Frozen(false),
    )];

    for cell in &month_page.days {
        let Some(year_center) = year_page.coordinates.day_center(cell.date) else {
            continue;
        };
        let Some(foreign_center) =
            tree.convert_point(year_center, year_page.surface, month_page.surface)
        else {
            continue;
        };
        let surface = tree.get(cell.surface)?;
        let rest = surface.position();

        foreign_prepare.push(Edit::new(
            Target::Surface(cell.surface),
            Op::Pivot(Point::new(0.5, text_anchor_y)),
        ));
        foreign_prepare.push(Edit::new(Target::Surface(cell.marker), Op::Hidden(true)));
        foreign_animate.push(Edit::new(
            Target::Surface(cell.surface),
            Op::Position(foreign_center),
        ));
        foreign_animate.push(Edit::new(
            Target::Surface(cell.surface),
            Op::Transform(Affine::scale(fonts_ratio)),
        ));
        foreign_animate.push(Edit::new(
            Target::Surface(cell.today),
            Op::Transform(Affine::scale(marker_ratio)),
        ));

        native_animate.push(Edit::new(Target::Surface(cell.surface), Op::Position(rest)));
        native_animate.push(Edit::new(
            Target::Surface(cell.surface),
            Op::Transform(Affine::IDENTITY),
        ));
        native_animate.push(Edit::new(
            Target::Surface(cell.today),
            Op::Transform(Affine::IDENTITY),
        ));
        commit_cleanup.push(Edit::new(Target::Surface(cell.marker), Op::Hidden(false)));
        commit_cleanup.push(Edit::new(
            Target::Surface(cell.surface),
            Op::Pivot(Point::new(0.5, 0.5)),
        ));
    }

    // Title morphs onto the raster's month title; rules fade.
    if let Some((_, title_frame)) = year_page
        .coordinates
        .titles
        .iter()
        .find(|(month_date, _)| *month_date == month_page.date)
    {
        if let Some(foreign_title) =
            tree.convert_rect(*title_frame, year_page.surface, month_page.surface)
        {
            let rest = tree.get(month_page.title)?.state.frame;
            foreign_animate.push(Edit::new(
                Target::Surface(month_page.title),
                Op::Frame(foreign_title),
            ));
            native_animate.push(Edit::new(Target::Surface(month_page.title), Op::Frame(rest)));
        }
    }
    for line in &month_page.lines {
        foreign_animate.push(Edit::new(Target::Surface(*line), Op::Opacity(0.0)));
        native_animate.push(Edit::new(Target::Surface(*line), Op::Opacity(1.0)));
    }

    let month_script = Script {
        temporaries: Vec::new(),
        native: Blocks {
            prepare: Vec::new(),
            animate: native_animate,
            cleanup: Cleanup {
                committed: commit_cleanup,
                cancelled: vec![],
            },
        },
        foreign: Blocks {
            prepare: foreign_prepare,
            animate: foreign_animate,
            cleanup: Cleanup::default(),
        },
    };

    Some((year_script, month_script))
}

/// Scripts for the month↔day transition: `(month, day)`.
///
/// The month grid splits at the selected week row: rows above slide up past
/// the ruler, rows below slide off the bottom, while stand-in week cells
/// morph between their grid slots and the ruler positions. The day timeline
/// hides behind two background masks that open apart as the transition
/// lands.
pub fn month_day_scripts(
    info: &CalendarInfo,
    tree: &SurfaceTree,
    container: SurfaceId,
    month: &MonthSection,
    day_root: SurfaceId,
    ruler: &WeekStrip,
    bounds: Rect,
) -> Option<(Script, Script)> {
    let date = info.date;
    let month_page = month.page_for(date)?;
    let metrics = MonthMetrics::new(info);

    let target_local = month_page.point_for(tree, info, date)?;
    let target = tree.convert_point(target_local, month_page.surface, container)?;

    let ruler_page = ruler.page_for(date).or_else(|| ruler.centered_page())?;
    let first_cell = ruler_page.cells.first()?;
    let first_center = tree.get(first_cell.surface)?.position();
    let ruler_center = tree.convert_point(first_center, ruler_page.surface, container)?;

    let delta_up = target.y - ruler_center.y;
    let delta_down = bounds.y1 - target.y;

    // The split line sits below the selected week's labels.
    let mask_shift = metrics.day_height - info.style.geometry.inset / 2.0
        - metrics.today_diameter / 2.0;
    let split = (target.y + mask_shift).clamp(bounds.y0, bounds.y1);
    let slice = Rect::new(bounds.x0, bounds.y0, bounds.x1, split);
    let remainder = Rect::new(bounds.x0, split, bounds.x1, bounds.y1);

    // Day side: two masks spawned apart (day visible), closed over the
    // timeline for the start frame, opened by the incoming animation.
    let day_script = Script {
        temporaries: vec![
            TempSpec {
                parent: day_root,
                state: SurfaceState {
                    frame: slice - Vec2::new(0.0, delta_up),
                    z_index: 8,
                    ..SurfaceState::default()
                },
            },
            TempSpec {
                parent: day_root,
                state: SurfaceState {
                    frame: remainder + Vec2::new(0.0, delta_down),
                    z_index: 8,
                    ..SurfaceState::default()
                },
            },
        ],
        native: Blocks {
            prepare: Vec::new(),
            animate: vec![
                Edit::new(Target::Temp(0), Op::Frame(slice - Vec2::new(0.0, delta_up))),
                Edit::new(
                    Target::Temp(1),
                    Op::Frame(remainder + Vec2::new(0.0, delta_down)),
                ),
            ],
            cleanup: Cleanup::default(),
        },
        foreign: Blocks {
            prepare: Vec::new(),
            animate: vec![
                Edit::new(Target::Temp(0), Op::Frame(slice)),
                Edit::new(Target::Temp(1), Op::Frame(remainder)),
            ],
            cleanup: Cleanup::default(),
        },
    };

    // Month side.
    let mut temporaries = Vec::new();
    let mut foreign_prepare = vec![Edit::new(
        Target::Surface(month_page.surface),
        Op::Frozen(true),
    )];
    let mut foreign_animate = Vec::new();
    let mut native_animate = Vec::new();
    let mut commit_cleanup = vec![Edit::new(
        Target::Surface(month_page.surface),
        Op::Frozen(false),
    )];

    // Stand-in week cells morph between grid and ruler positions.
    let cell_size = Size::new(metrics.cell_width, metrics.today_diameter);
    for ruler_cell in &ruler_page.cells {
        // Ruler days outside the presented month have no grid slot to morph
        // from; they fade in with the toolbar instead.
        let Some(month_cell) = month_page.cell_for(ruler_cell.date) else {
            continue;
        };
        let Some(grid_center) = month_page.point_for(tree, info, ruler_cell.date) else {
            continue;
        };
        let Some(grid) = tree.convert_point(grid_center, month_page.surface, container) else {
            continue;
        };
        let Some(ruler_local) = tree.get(ruler_cell.surface).map(Surface::position) else {
            continue;
        };
        let Some(ruler_pos) = tree.convert_point(ruler_local, ruler_page.surface, container)
        else {
            continue;
        };

        temporaries.push(TempSpec {
            parent: container,
            state: SurfaceState {
                frame: Rect::from_center_size(grid, cell_size),
                z_index: 9,
                ..SurfaceState::default()
            },
        });
        let temp = Target::Temp(temporaries.len() - 1);
        foreign_animate.push(Edit::new(temp, Op::Position(ruler_pos)));
        native_animate.push(Edit::new(temp, Op::Position(grid)));

        // Hide the live cell while its stand-in travels.
        foreign_prepare.push(Edit::new(Target::Surface(month_cell.surface), Op::Hidden(true)));
        commit_cleanup.push(Edit::new(Target::Surface(month_cell.surface), Op::Hidden(false)));
    }

    // Rows split around the target week; rules fade out.
    let split_local = target_local.y;
    for cell in &month_page.days {
        let Some(surface) = tree.get(cell.surface) else {
            continue;
        };
        let rest = surface.position();
        let moved = if rest.y <= split_local {
            Point::new(rest.x, rest.y - delta_up)
        } else {
            Point::new(rest.x, rest.y + delta_down)
        };
        foreign_animate.push(Edit::new(Target::Surface(cell.surface), Op::Position(moved)));
        native_animate.push(Edit::new(Target::Surface(cell.surface), Op::Position(rest)));
    }
    {
        let title = tree.get(month_page.title)?;
        let rest = title.position();
        let moved = if rest.y <= split_local {
            Point::new(rest.x, rest.y - delta_up)
        } else {
            Point::new(rest.x, rest.y + delta_down)
        };
        foreign_animate.push(Edit::new(Target::Surface(month_page.title), Op::Position(moved)));
        native_animate.push(Edit::new(Target::Surface(month_page.title), Op::Position(rest)));
    }
    for line in &month_page.lines {
        let Some(surface) = tree.get(*line) else {
            continue;
        };
        let rest = surface.position();
        let moved = if rest.y <= split_local {
            Point::new(rest.x, rest.y - delta_up)
        } else {
            Point::new(rest.x, rest.y + delta_down)
        };
        foreign_animate.push(Edit::new(Target::Surface(*line), Op::Position(moved)));
        foreign_animate.push(Edit::new(Target::Surface(*line), Op::Opacity(0.0)));
        native_animate.push(Edit::new(Target::Surface(*line), Op::Position(rest)));
        native_animate.push(Edit::new(Target::Surface(*line), Op::Opacity(1.0)));
    }

    let month_script = Script {
        temporaries,
        native: Blocks {
            prepare: Vec::new(),
            animate: native_animate,
            cleanup: Cleanup {
                committed: commit_cleanup.clone(),
                cancelled: vec![],
            },
        },
        foreign: Blocks {
            prepare: foreign_prepare,
            animate: foreign_animate,
            cleanup: Cleanup {
                committed: commit_cleanup,
                cancelled: vec![],
            },
        },
    };

    Some((month_script, day_script))
}
