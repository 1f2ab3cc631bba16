// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Almanac Selection: single-event selection bookkeeping.
//!
//! At most one event is highlighted across the whole calendar component at
//! any time. This crate tracks that invariant and nothing else: day-
//! granularity views resolve taps to events, call [`Selection::select`], and
//! re-render their highlight state whenever the [`Selection::revision`]
//! counter moves. The crate knows nothing about views or event payloads;
//! callers choose the key type (typically an event identifier) and the
//! origin type (typically a surface handle).
//!
//! Semantics, mirrored by the tests:
//!
//! - Selecting the already-selected key is a **no-op**: no handler call, no
//!   revision bump.
//! - Selecting a different key replaces the previous one, bumps the
//!   revision, and invokes the handler with the key and its originating
//!   view. The embedder deselects through whatever owns the `Selection`
//!   (the component exposes it), which is the deselect capability the
//!   handler contract promises.
//! - [`Selection::deselect`] clears the selection and bumps the revision
//!   (when something was selected).
//!
//! ## Minimal example
//!
//! ```rust
//! use almanac_selection::Selection;
//!
//! let mut selection = Selection::<u32, &'static str>::new();
//! selection.select(7, "day-view");
//! assert_eq!(selection.selected(), Some(&7));
//!
//! let before = selection.revision();
//! selection.select(7, "day-view");
//! assert_eq!(selection.revision(), before, "re-selecting is a no-op");
//!
//! selection.deselect();
//! assert_eq!(selection.selected(), None);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::boxed::Box;
use core::fmt;

/// Handler invoked when the selection changes to a new key.
pub type SelectionHandler<K, O> = Box<dyn FnMut(&K, &O)>;

/// Tracks the single selected event plus a change revision.
pub struct Selection<K, O> {
    selected: Option<K>,
    revision: u64,
    handler: Option<SelectionHandler<K, O>>,
}

impl<K, O> Default for Selection<K, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, O> fmt::Debug for Selection<K, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("selected", &self.selected.is_some())
            .field("revision", &self.revision)
            .finish()
    }
}

impl<K, O> Selection<K, O> {
    /// Creates an empty selection with no handler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            selected: None,
            revision: 0,
            handler: None,
        }
    }

    /// Creates an empty selection that notifies `handler` on each new
    /// selection.
    #[must_use]
    pub fn with_handler(handler: SelectionHandler<K, O>) -> Self {
        Self {
            selected: None,
            revision: 0,
            handler: Some(handler),
        }
    }

    /// The selected key, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&K> {
        self.selected.as_ref()
    }

    /// Monotonically increasing change counter.
    ///
    /// Bumped only when the selection actually changes; observers use it as
    /// a cheap "did anything change?" marker between render passes.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Clears the selection.
    pub fn deselect(&mut self) {
        if self.selected.is_some() {
            self.selected = None;
            self.revision = self.revision.wrapping_add(1);
        }
    }
}

impl<K: PartialEq, O> Selection<K, O> {
    /// Selects `key`, reporting the change to the handler.
    ///
    /// Returns `true` when the selection changed; selecting the key that is
    /// already selected returns `false` and has no other effect.
    pub fn select(&mut self, key: K, origin: O) -> bool {
        if self.selected.as_ref() == Some(&key) {
            return false;
        }
        self.selected = Some(key);
        self.revision = self.revision.wrapping_add(1);
        if let (Some(handler), Some(selected)) = (self.handler.as_mut(), self.selected.as_ref()) {
            handler(selected, &origin);
        }
        true
    }

    /// Returns `true` if `key` is the selected key.
    #[must_use]
    pub fn is_selected(&self, key: &K) -> bool {
        self.selected.as_ref() == Some(key)
    }
}
