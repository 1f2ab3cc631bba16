// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Transition: two-sided transition scripts and the driver that
//! executes them.
//!
//! A section-kind change is described by a pair of [`Script`]s, one for the
//! outgoing side, one for the incoming side. Each script carries two
//! [`Blocks`]: `native` (this side's destination-at-rest representation) and
//! `foreign` (this side transformed into the *other* side's representation).
//! A block is three named steps:
//!
//! - `prepare`: one-time, un-animated setup (freeze layout, spawn masks,
//!   re-anchor pivots),
//! - `animate`: the property targets the driver interpolates,
//! - `cleanup`: final fixups, parameterized by whether the transition
//!   committed.
//!
//! Steps are plain data ([`Edit`] lists), produced by pure functions of the
//! endpoints' geometry and executed by one generic [`Driver`]. The driver
//! guarantees a fixed stage ordering (all prepares un-animated, the
//! destination's foreign representation established as the start frame, then
//! both `animate` lists interpolated concurrently) and it guarantees that
//! `cleanup` runs exactly once per script pair, with full snapshot rollback
//! when the transition is cancelled.
//!
//! ## Minimal example
//!
//! ```rust
//! use almanac_surface::{Surface, SurfaceTree};
//! use almanac_transition::{Blocks, Driver, Edit, Op, Script, Target};
//! use kurbo::Rect;
//!
//! let mut tree = SurfaceTree::new();
//! let id = tree.insert(None, Surface::with_frame(Rect::new(0.0, 0.0, 10.0, 10.0)));
//!
//! // The outgoing side fades its surface away.
//! let from = Script {
//!     foreign: Blocks {
//!         animate: vec![Edit::new(Target::Surface(id), Op::Opacity(0.0))],
//!         ..Blocks::default()
//!     },
//!     ..Script::default()
//! };
//!
//! let mut driver = Driver::begin(&mut tree, from, Script::default());
//! driver.set_progress(&mut tree, 0.5);
//! driver.finish(&mut tree, true);
//! assert_eq!(tree.get(id).unwrap().state.opacity, 0.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod driver;
mod script;

pub use driver::{Driver, ease};
pub use script::{Blocks, Cleanup, Edit, Op, Script, Target, TempSpec};
