// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Surface: the "positionable, paintable surface" the calendar core
//! requires from its platform.
//!
//! The component does not own a renderer. What it needs from the platform is
//! exactly: a surface with a frame, a parent-child containment relation, a
//! pivot-anchored local transform, opacity, and hide/freeze flags, plus the
//! ability to convert geometry between any two surfaces' coordinate spaces.
//! [`SurfaceTree`] provides that as a headless arena: embedders mirror it
//! into their real view/layer hierarchy, and the transition engine mutates
//! and snapshots it directly.
//!
//! Identifiers are generational handles in the manner of a scene tree: a
//! removed slot invalidates every outstanding [`SurfaceId`] pointing at it,
//! and reuse bumps the generation so stale handles can never alias a live
//! surface.
//!
//! ## Minimal example
//!
//! ```rust
//! use almanac_surface::{Surface, SurfaceTree};
//! use kurbo::{Point, Rect};
//!
//! let mut tree = SurfaceTree::new();
//! let root = tree.insert(None, Surface::with_frame(Rect::new(0.0, 0.0, 320.0, 480.0)));
//! let child = tree.insert(
//!     Some(root),
//!     Surface::with_frame(Rect::new(10.0, 20.0, 110.0, 70.0)),
//! );
//!
//! // A child-local point expressed in root coordinates.
//! let p = tree.convert_point(Point::new(5.0, 5.0), child, root).unwrap();
//! assert_eq!(p, Point::new(15.0, 25.0));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod tree;
mod types;

pub use tree::{Snapshot, SurfaceTree};
pub use types::{Surface, SurfaceFlags, SurfaceId, SurfaceState};
