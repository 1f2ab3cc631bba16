// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Axis: an infinite, lazily materialized strip of date-anchored
//! pages.
//!
//! A [`DateAxis`] virtualizes a strip of pages indexed by *signed* offsets
//! from an epoch anchor: day pages, week rows, month plates, or year grids,
//! depending on the owning section. The axis owns scroll state and the
//! materialization window; it owns **no date arithmetic** (the page model
//! derives dates from indices through the shared calendar read model).
//!
//! Guarantees:
//!
//! - At most one page is materialized per visited index at a time.
//! - Pages outside the visible window plus reserve are dropped; pages whose
//!   index re-enters the window are recycled when still materialized,
//!   otherwise losslessly recreated. [`AxisModel::make_page`] must be a pure
//!   function of `(index, calendar snapshot)`, so a page may carry no state
//!   that is not derivable from those.
//! - [`DateAxis::reset`] drops every page and re-derives the initial index.
//!
//! Scroll offsets are expressed in a window-relative 1D coordinate space:
//! offset `0.0` is the leading edge of the page the window was last rebuilt
//! around. Hosts map the single axis coordinate onto x or y according to the
//! axis [`Orientation`].
//!
//! ## Minimal example
//!
//! ```rust
//! use almanac_axis::{AxisModel, DateAxis, Extent, Orientation};
//!
//! struct Days;
//!
//! impl AxisModel for Days {
//!     type Page = i64;
//!
//!     fn initial_index(&self) -> i64 {
//!         7_300 // some day offset from the epoch anchor
//!     }
//!
//!     fn make_page(&mut self, index: i64) -> Self::Page {
//!         index
//!     }
//!
//!     fn extent(&self) -> Extent {
//!         Extent::Fill
//!     }
//! }
//!
//! let mut axis = DateAxis::new(Days, Orientation::Horizontal);
//! axis.set_viewport(320.0, 160.0);
//! assert_eq!(axis.centered_index(), Some(7_300));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod axis;

pub use axis::{AxisModel, DateAxis, Extent, Orientation, PageEntry};
