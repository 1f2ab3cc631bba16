// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use almanac_surface::{Snapshot, Surface, SurfaceId, SurfaceTree};
use kurbo::{Affine, Point, Rect};

use crate::script::{Cleanup, Edit, Op, Script, Target};

/// The platform-default timing curve: cubic bezier (0.25, 0.1), (0.25, 1.0).
///
/// Input and output are in `[0, 1]`. Interactive transitions feed raw
/// gesture fractions through [`Driver::set_progress`], which applies this
/// curve.
#[must_use]
pub fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);

    // Horner-form coefficients for x(u) and y(u).
    const CX: f64 = 0.75;
    const BX: f64 = -0.75;
    const AX: f64 = 1.0;
    const CY: f64 = 0.3;
    const BY: f64 = 2.4;
    const AY: f64 = -1.7;

    let sample_x = |u: f64| ((AX * u + BX) * u + CX) * u;
    let sample_y = |u: f64| ((AY * u + BY) * u + CY) * u;
    let slope_x = |u: f64| (3.0 * AX * u + 2.0 * BX) * u + CX;

    // Newton iterations with a bisection fallback for flat spots.
    let mut u = t;
    for _ in 0..8 {
        let x = sample_x(u) - t;
        if x.abs() < 1e-7 {
            return sample_y(u);
        }
        let d = slope_x(u);
        if d.abs() < 1e-6 {
            break;
        }
        u -= x / d;
        u = u.clamp(0.0, 1.0);
    }

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    let mut u = t;
    for _ in 0..32 {
        let x = sample_x(u);
        if (x - t).abs() < 1e-7 {
            break;
        }
        if x < t {
            lo = u;
        } else {
            hi = u;
        }
        u = (lo + hi) * 0.5;
    }
    sample_y(u)
}

#[derive(Debug)]
struct AnimatedEdit {
    id: SurfaceId,
    start: Op,
    end: Op,
}

#[derive(Debug)]
struct ResolvedCleanup {
    committed: Vec<(SurfaceId, Op)>,
    cancelled: Vec<(SurfaceId, Op)>,
}

/// Executes one script pair over a surface tree.
///
/// Stage ordering:
///
/// 1. [`Driver::begin`], un-animated: spawn temporaries, run
///    `from.foreign.prepare`, `to.foreign.prepare`, apply
///    `to.foreign.animate` fully to establish the start frame, run
///    `to.native.prepare`, then capture start values for every interpolated
///    edit of `from.foreign.animate` and `to.native.animate` (their discrete
///    edits apply immediately).
/// 2. [`Driver::set_progress`]: eased interpolation of the captured edits,
///    driven by host ticks or an interactive gesture fraction.
/// 3. [`Driver::finish`], exactly once: on commit, snap interpolated edits
///    to their targets, run the commit cleanups, and drop temporaries; on
///    cancel, run the cancel cleanups and restore the pre-transition
///    snapshot exactly.
#[derive(Debug)]
pub struct Driver {
    snapshot: Snapshot,
    temporaries: Vec<SurfaceId>,
    animated: Vec<AnimatedEdit>,
    from_cleanup: ResolvedCleanup,
    to_cleanup: ResolvedCleanup,
    progress: f64,
    finished: bool,
}

impl Driver {
    /// Stages a transition from the outgoing script to the incoming one.
    #[must_use]
    pub fn begin(tree: &mut SurfaceTree, from: Script, to: Script) -> Self {
        let snapshot = tree.snapshot();
        let mut temporaries = Vec::new();

        let from_temps = spawn(tree, &from, &mut temporaries);
        let to_temps = spawn(tree, &to, &mut temporaries);

        apply_edits(tree, &from.foreign.prepare, &from_temps);
        apply_edits(tree, &to.foreign.prepare, &to_temps);
        apply_edits(tree, &to.foreign.animate, &to_temps);
        apply_edits(tree, &to.native.prepare, &to_temps);

        let mut animated = Vec::new();
        stage_animated(tree, &from.foreign.animate, &from_temps, &mut animated);
        stage_animated(tree, &to.native.animate, &to_temps, &mut animated);

        let from_cleanup = resolve_cleanup(&from.foreign.cleanup, &from_temps);
        let to_cleanup = resolve_cleanup(&to.native.cleanup, &to_temps);

        Self {
            snapshot,
            temporaries,
            animated,
            from_cleanup,
            to_cleanup,
            progress: 0.0,
            finished: false,
        }
    }

    /// Current raw (un-eased) progress.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Applies the eased interpolation at fraction `t` of the duration.
    pub fn set_progress(&mut self, tree: &mut SurfaceTree, t: f64) {
        if self.finished {
            return;
        }
        self.progress = t.clamp(0.0, 1.0);
        let eased = ease(self.progress);
        for edit in &self.animated {
            if let Some(op) = lerp_op(&edit.start, &edit.end, eased) {
                apply_op(tree, edit.id, &op);
            }
        }
    }

    /// Completes the transition; `committed` reflects whether the navigation
    /// actually happened (an interactive back-swipe released before the
    /// threshold finishes with `false`).
    ///
    /// Cleanup runs exactly once; later calls are no-ops.
    pub fn finish(&mut self, tree: &mut SurfaceTree, committed: bool) {
        if self.finished {
            return;
        }
        self.finished = true;

        if committed {
            for edit in &self.animated {
                apply_op(tree, edit.id, &edit.end);
            }
            for (id, op) in &self.from_cleanup.committed {
                apply_op(tree, *id, op);
            }
            for (id, op) in &self.to_cleanup.committed {
                apply_op(tree, *id, op);
            }
            for id in self.temporaries.drain(..) {
                tree.remove(id);
            }
        } else {
            for (id, op) in &self.from_cleanup.cancelled {
                apply_op(tree, *id, op);
            }
            for (id, op) in &self.to_cleanup.cancelled {
                apply_op(tree, *id, op);
            }
            // The snapshot is the authority for the cancelled outcome: every
            // touched surface returns to its exact pre-transition state and
            // the temporaries disappear with it.
            tree.restore(&self.snapshot);
            self.temporaries.clear();
        }
    }

    /// Returns `true` once [`Driver::finish`] ran.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn spawn(tree: &mut SurfaceTree, script: &Script, all: &mut Vec<SurfaceId>) -> Vec<SurfaceId> {
    let mut ids = Vec::with_capacity(script.temporaries.len());
    for spec in &script.temporaries {
        let id = tree.insert(Some(spec.parent), Surface::with_state(spec.state.clone()));
        ids.push(id);
        all.push(id);
    }
    ids
}

fn resolve(target: Target, temps: &[SurfaceId]) -> Option<SurfaceId> {
    match target {
        Target::Surface(id) => Some(id),
        Target::Temp(index) => temps.get(index).copied(),
    }
}

fn apply_edits(tree: &mut SurfaceTree, edits: &[Edit], temps: &[SurfaceId]) {
    for edit in edits {
        if let Some(id) = resolve(edit.target, temps) {
            apply_op(tree, id, &edit.op);
        }
    }
}

fn stage_animated(
    tree: &SurfaceTree,
    edits: &[Edit],
    temps: &[SurfaceId],
    out: &mut Vec<AnimatedEdit>,
) {
    for edit in edits {
        let Some(id) = resolve(edit.target, temps) else {
            continue;
        };
        let Some(surface) = tree.get(id) else {
            continue;
        };
        let start = match edit.op {
            Op::Frame(_) => Some(Op::Frame(surface.state.frame)),
            Op::Position(_) => Some(Op::Position(surface.position())),
            Op::Transform(_) => Some(Op::Transform(surface.state.transform)),
            Op::Opacity(_) => Some(Op::Opacity(surface.state.opacity)),
            _ => None,
        };
        match start {
            Some(start) => out.push(AnimatedEdit {
                id,
                start,
                end: edit.op,
            }),
            // Discrete properties mutate un-animated at stage entry, the way
            // non-animatable layer properties behave inside animation blocks.
            None => out.push(AnimatedEdit {
                id,
                start: edit.op,
                end: edit.op,
            }),
        }
    }
}

fn resolve_cleanup(cleanup: &Cleanup, temps: &[SurfaceId]) -> ResolvedCleanup {
    let resolve_list = |edits: &[Edit]| {
        edits
            .iter()
            .filter_map(|edit| resolve(edit.target, temps).map(|id| (id, edit.op)))
            .collect()
    };
    ResolvedCleanup {
        committed: resolve_list(&cleanup.committed),
        cancelled: resolve_list(&cleanup.cancelled),
    }
}

fn apply_op(tree: &mut SurfaceTree, id: SurfaceId, op: &Op) {
    let Some(surface) = tree.get_mut(id) else {
        return;
    };
    match *op {
        Op::Frame(frame) => surface.state.frame = frame,
        Op::Position(position) => surface.set_position(position),
        Op::Transform(transform) => surface.state.transform = transform,
        Op::Opacity(opacity) => surface.state.opacity = opacity.clamp(0.0, 1.0),
        Op::Pivot(pivot) => surface.shift_pivot(pivot),
        Op::Hidden(hidden) => surface.set_hidden(hidden),
        Op::Frozen(frozen) => surface.set_frozen(frozen),
        Op::Hole(hole) => surface.state.hole = hole,
        Op::ZIndex(z) => surface.state.z_index = z,
    }
}

fn lerp_op(start: &Op, end: &Op, t: f64) -> Option<Op> {
    let lerp = |a: f64, b: f64| a + (b - a) * t;
    match (start, end) {
        (Op::Frame(a), Op::Frame(b)) => Some(Op::Frame(Rect::new(
            lerp(a.x0, b.x0),
            lerp(a.y0, b.y0),
            lerp(a.x1, b.x1),
            lerp(a.y1, b.y1),
        ))),
        (Op::Position(a), Op::Position(b)) => {
            Some(Op::Position(Point::new(lerp(a.x, b.x), lerp(a.y, b.y))))
        }
        (Op::Transform(a), Op::Transform(b)) => {
            let ac = a.as_coeffs();
            let bc = b.as_coeffs();
            let mut out = [0.0; 6];
            for (slot, (&from, &to)) in out.iter_mut().zip(ac.iter().zip(bc.iter())) {
                *slot = lerp(from, to);
            }
            Some(Op::Transform(Affine::new(out)))
        }
        (Op::Opacity(a), Op::Opacity(b)) => Some(Op::Opacity(lerp(*a, *b))),
        // Discrete pairs snap to the target immediately.
        _ => Some(*end),
    }
}

#[cfg(test)]
mod tests {
    use almanac_surface::SurfaceState;
    use kurbo::Size;

    use super::*;
    use crate::script::{Blocks, TempSpec};

    fn tree_with_two() -> (SurfaceTree, SurfaceId, SurfaceId) {
        let mut tree = SurfaceTree::new();
        let root = tree.insert(
            None,
            Surface::with_frame(Rect::from_origin_size(Point::ZERO, Size::new(320.0, 480.0))),
        );
        let child = tree.insert(
            Some(root),
            Surface::with_frame(Rect::new(10.0, 10.0, 110.0, 110.0)),
        );
        (tree, root, child)
    }

    #[test]
    fn ease_is_monotone_with_fixed_endpoints() {
        assert!(ease(0.0).abs() < 1e-6);
        assert!((ease(1.0) - 1.0).abs() < 1e-6);
        let mut prev = 0.0;
        for i in 1..=100 {
            let y = ease(f64::from(i) / 100.0);
            assert!(y >= prev - 1e-9, "easing must be monotone");
            prev = y;
        }
    }

    #[test]
    fn begin_establishes_destination_start_frame_unanimated() {
        let (mut tree, _root, child) = tree_with_two();
        let to = Script {
            foreign: Blocks {
                animate: vec![Edit::new(Target::Surface(child), Op::Opacity(0.25))],
                ..Blocks::default()
            },
            ..Script::default()
        };

        let _driver = Driver::begin(&mut tree, Script::empty(), to);
        // `to.foreign.animate` is applied fully before any interpolation.
        assert_eq!(tree.get(child).unwrap().state.opacity, 0.25);
    }

    #[test]
    fn interpolated_edits_hit_endpoints() {
        let (mut tree, _root, child) = tree_with_two();
        let from = Script {
            foreign: Blocks {
                animate: vec![
                    Edit::new(Target::Surface(child), Op::Opacity(0.0)),
                    Edit::new(
                        Target::Surface(child),
                        Op::Frame(Rect::new(50.0, 50.0, 250.0, 250.0)),
                    ),
                ],
                ..Blocks::default()
            },
            ..Script::default()
        };

        let mut driver = Driver::begin(&mut tree, from, Script::empty());
        driver.set_progress(&mut tree, 0.0);
        assert_eq!(tree.get(child).unwrap().state.opacity, 1.0);
        assert_eq!(tree.get(child).unwrap().state.frame, Rect::new(10.0, 10.0, 110.0, 110.0));

        driver.set_progress(&mut tree, 0.5);
        let mid = tree.get(child).unwrap().state.opacity;
        assert!(mid > 0.0 && mid < 1.0);

        driver.finish(&mut tree, true);
        assert_eq!(tree.get(child).unwrap().state.opacity, 0.0);
        assert_eq!(tree.get(child).unwrap().state.frame, Rect::new(50.0, 50.0, 250.0, 250.0));
    }

    #[test]
    fn committed_transition_removes_temporaries_and_runs_commit_cleanup() {
        let (mut tree, root, child) = tree_with_two();
        let from = Script {
            temporaries: vec![TempSpec {
                parent: root,
                state: SurfaceState {
                    frame: Rect::new(0.0, 0.0, 320.0, 40.0),
                    ..SurfaceState::default()
                },
            }],
            foreign: Blocks {
                prepare: vec![Edit::new(Target::Surface(child), Op::Frozen(true))],
                animate: vec![Edit::new(Target::Temp(0), Op::Opacity(0.0))],
                cleanup: Cleanup {
                    committed: vec![Edit::new(Target::Surface(child), Op::Frozen(false))],
                    cancelled: vec![],
                },
            },
            ..Script::default()
        };

        let before = tree.len();
        let mut driver = Driver::begin(&mut tree, from, Script::empty());
        assert_eq!(tree.len(), before + 1, "temporary spawned");
        assert!(tree.get(child).unwrap().is_frozen());

        driver.finish(&mut tree, true);
        assert_eq!(tree.len(), before, "temporary removed on commit");
        assert!(!tree.get(child).unwrap().is_frozen());
    }

    #[test]
    fn cancelled_transition_restores_pre_transition_state_exactly() {
        let (mut tree, root, child) = tree_with_two();
        let reference = tree.snapshot();

        let from = Script {
            temporaries: vec![TempSpec {
                parent: root,
                state: SurfaceState::default(),
            }],
            foreign: Blocks {
                prepare: vec![
                    Edit::new(Target::Surface(child), Op::Pivot(Point::new(0.1, 0.2))),
                    Edit::new(Target::Surface(child), Op::Frozen(true)),
                ],
                animate: vec![
                    Edit::new(Target::Surface(child), Op::Transform(Affine::scale(4.0))),
                    Edit::new(Target::Surface(child), Op::Opacity(0.0)),
                ],
                ..Blocks::default()
            },
            ..Script::default()
        };

        let mut driver = Driver::begin(&mut tree, from, Script::empty());
        driver.set_progress(&mut tree, 0.7);
        driver.finish(&mut tree, false);

        let state = &tree.get(child).unwrap().state;
        assert_eq!(state, reference.state_of(child).unwrap());
        assert_eq!(tree.len(), 2, "temporary removed on cancel");
    }

    #[test]
    fn cleanup_runs_exactly_once() {
        let (mut tree, _root, child) = tree_with_two();
        let from = Script {
            foreign: Blocks {
                animate: vec![Edit::new(Target::Surface(child), Op::Opacity(0.0))],
                cleanup: Cleanup {
                    committed: vec![Edit::new(Target::Surface(child), Op::Hidden(true))],
                    cancelled: vec![],
                },
                ..Blocks::default()
            },
            ..Script::default()
        };

        let mut driver = Driver::begin(&mut tree, from, Script::empty());
        driver.finish(&mut tree, true);
        assert!(!tree.get(child).unwrap().is_visible());

        // Un-hide out of band; a second finish must not re-run cleanup.
        tree.get_mut(child).unwrap().set_hidden(false);
        driver.finish(&mut tree, true);
        driver.finish(&mut tree, false);
        assert!(tree.get(child).unwrap().is_visible());
    }

    #[test]
    fn empty_scripts_are_a_cut() {
        let (mut tree, _root, child) = tree_with_two();
        let reference = tree.snapshot();
        let mut driver = Driver::begin(&mut tree, Script::empty(), Script::empty());
        driver.set_progress(&mut tree, 0.5);
        driver.finish(&mut tree, true);
        assert_eq!(
            tree.get(child).unwrap().state,
            *reference.state_of(child).unwrap(),
        );
    }
}
