// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use almanac_surface::{SurfaceId, SurfaceState};
use kurbo::{Affine, Point, Rect};

/// What an [`Edit`] addresses: an existing surface or a transition
/// temporary.
///
/// Temporaries (masks, stand-in cells) do not exist when a script is built;
/// they are declared in [`Script::temporaries`] and spawned by the driver,
/// which resolves `Temp(i)` to the `i`-th spawned surface of that script.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// A surface that already exists in the tree.
    Surface(SurfaceId),
    /// The `i`-th temporary declared by the owning script.
    Temp(usize),
}

/// One property mutation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Op {
    /// Set the frame (interpolated corner-wise).
    Frame(Rect),
    /// Move the pivot point to a parent-space position (interpolated).
    Position(Point),
    /// Set the pivot-anchored local transform (coefficients interpolated;
    /// transition transforms are uniform scale + translate, for which this
    /// is exact).
    Transform(Affine),
    /// Set opacity (interpolated).
    Opacity(f64),
    /// Re-anchor the pivot (discrete; applied un-animated).
    Pivot(Point),
    /// Show or hide (discrete).
    Hidden(bool),
    /// Freeze or unfreeze layout (discrete).
    Frozen(bool),
    /// Set or clear the even-odd hole (discrete).
    Hole(Option<Rect>),
    /// Set the z-order (discrete).
    ZIndex(i32),
}

impl Op {
    /// Returns `true` for properties the driver interpolates; discrete ops
    /// apply un-animated at stage entry.
    #[must_use]
    pub fn is_interpolated(&self) -> bool {
        matches!(
            self,
            Self::Frame(_) | Self::Position(_) | Self::Transform(_) | Self::Opacity(_)
        )
    }
}

/// One targeted property mutation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edit {
    /// Addressed surface.
    pub target: Target,
    /// Property target value.
    pub op: Op,
}

impl Edit {
    /// Creates an edit.
    #[must_use]
    pub fn new(target: Target, op: Op) -> Self {
        Self { target, op }
    }
}

/// Declaration of a transition temporary (mask layer, stand-in cell).
#[derive(Clone, Debug)]
pub struct TempSpec {
    /// Parent the temporary is inserted under.
    pub parent: SurfaceId,
    /// Initial visual state.
    pub state: SurfaceState,
}

/// Commit/cancel halves of the cleanup step.
///
/// Cleanup must be idempotent and leave the tree consistent for both
/// outcomes. The driver additionally restores its pre-transition snapshot on
/// cancellation, so `cancelled` only needs edits for state the snapshot does
/// not cover (none, in the common case; it exists for parity with scripts
/// that must re-trigger layout).
#[derive(Clone, Debug, Default)]
pub struct Cleanup {
    /// Applied when the transition committed.
    pub committed: Vec<Edit>,
    /// Applied when the transition was cancelled, before snapshot rollback.
    pub cancelled: Vec<Edit>,
}

/// The three named steps of one side of a script.
#[derive(Clone, Debug, Default)]
pub struct Blocks {
    /// Un-animated one-time setup.
    pub prepare: Vec<Edit>,
    /// Property targets to interpolate.
    pub animate: Vec<Edit>,
    /// Final fixups.
    pub cleanup: Cleanup,
}

/// One endpoint's transition description.
///
/// `native` mutates this endpoint toward its at-rest representation;
/// `foreign` mutates it toward the *other* endpoint's representation. The
/// driver decides which side of each script runs un-animated and which is
/// interpolated, per its stage ordering.
#[derive(Clone, Debug, Default)]
pub struct Script {
    /// Temporaries this script spawns; [`Target::Temp`] indices refer here.
    pub temporaries: Vec<TempSpec>,
    /// Destination-at-rest side.
    pub native: Blocks,
    /// Transformed-away side.
    pub foreign: Blocks,
}

impl Script {
    /// The degenerate cut: no temporaries, no edits. Used whenever endpoint
    /// geometry cannot be resolved.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when executing the script would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temporaries.is_empty()
            && self.native.prepare.is_empty()
            && self.native.animate.is_empty()
            && self.foreign.prepare.is_empty()
            && self.foreign.animate.is_empty()
    }
}
