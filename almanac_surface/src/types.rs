// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the surface tree: identifiers, flags, and local state.

use kurbo::{Affine, Point, Rect, Vec2};

/// Identifier for a surface in the tree.
///
/// A small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused. It consists of a slot index
/// and a generation counter: removal frees the slot, and reuse increments the
/// generation, so a stale `SurfaceId` never aliases a different live surface.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SurfaceId(pub(crate) u32, pub(crate) u32);

impl SurfaceId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Surface flags controlling visibility and layout participation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u8 {
        /// Surface is visible.
        const VISIBLE = 0b0000_0001;
        /// Surface participates in hit testing.
        const PICKABLE = 0b0000_0010;
        /// Layout passes must leave this surface untouched (set while a
        /// transition owns its geometry).
        const FROZEN = 0b0000_0100;
    }
}

impl Default for SurfaceFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::PICKABLE
    }
}

/// Mutable visual state of one surface.
///
/// This is the portion of a surface the transition engine snapshots and
/// restores; the containment relation lives in the tree itself.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceState {
    /// Frame in parent coordinates (untransformed).
    pub frame: Rect,
    /// Pivot in unit coordinates of the frame; local transforms apply about
    /// this point. Defaults to the center.
    pub pivot: Point,
    /// Local transform relative to the (pivot-anchored) frame.
    pub transform: Affine,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Z-order within the parent stacking context. Higher draws on top.
    pub z_index: i32,
    /// Visibility and layout flags.
    pub flags: SurfaceFlags,
    /// Optional even-odd hole punched out of the surface, in local
    /// coordinates. Used by transition masks.
    pub hole: Option<Rect>,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            frame: Rect::ZERO,
            pivot: Point::new(0.5, 0.5),
            transform: Affine::IDENTITY,
            opacity: 1.0,
            z_index: 0,
            flags: SurfaceFlags::default(),
            hole: None,
        }
    }
}

/// One surface: visual state plus containment bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct Surface {
    /// Mutable visual state.
    pub state: SurfaceState,
    pub(crate) parent: Option<SurfaceId>,
    pub(crate) children: smallvec::SmallVec<[SurfaceId; 8]>,
}

impl Surface {
    /// A default surface with the given frame.
    #[must_use]
    pub fn with_frame(frame: Rect) -> Self {
        Self::with_state(SurfaceState {
            frame,
            ..SurfaceState::default()
        })
    }

    /// A surface with explicit initial state.
    #[must_use]
    pub fn with_state(state: SurfaceState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Parent surface, if any.
    #[must_use]
    pub fn parent(&self) -> Option<SurfaceId> {
        self.parent
    }

    /// Child surfaces in insertion order.
    #[must_use]
    pub fn children(&self) -> &[SurfaceId] {
        &self.children
    }

    /// Pivot location in parent coordinates.
    ///
    /// This is the point the local transform is anchored at; moving a surface
    /// by its position (rather than its frame origin) is how transitions
    /// express "center this element over that one".
    #[must_use]
    pub fn position(&self) -> Point {
        let state = &self.state;
        Point::new(
            state.frame.x0 + state.pivot.x * state.frame.width(),
            state.frame.y0 + state.pivot.y * state.frame.height(),
        )
    }

    /// Moves the frame so the pivot lands on `position` (size unchanged).
    pub fn set_position(&mut self, position: Point) {
        let delta = position - self.position();
        self.state.frame = self.state.frame + delta;
    }

    /// Re-anchors the pivot without moving the surface on screen.
    ///
    /// The frame keeps its place; only the anchor for subsequent transforms
    /// and [`Surface::position`] reads changes.
    pub fn shift_pivot(&mut self, pivot: Point) {
        self.state.pivot = pivot;
    }

    /// The local transformation matrix: frame translation with `transform`
    /// applied about the pivot.
    #[must_use]
    pub fn local_matrix(&self) -> Affine {
        let state = &self.state;
        let anchor = Vec2::new(
            state.pivot.x * state.frame.width(),
            state.pivot.y * state.frame.height(),
        );
        Affine::translate(Vec2::new(state.frame.x0, state.frame.y0))
            * Affine::translate(anchor)
            * state.transform
            * Affine::translate(-anchor)
    }

    /// Returns `true` if the surface is visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.flags.contains(SurfaceFlags::VISIBLE)
    }

    /// Returns `true` if layout must leave this surface untouched.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state.flags.contains(SurfaceFlags::FROZEN)
    }

    /// Shows or hides the surface.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.state.flags.set(SurfaceFlags::VISIBLE, !hidden);
    }

    /// Freezes or unfreezes layout for the surface.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.state.flags.set(SurfaceFlags::FROZEN, frozen);
    }
}
