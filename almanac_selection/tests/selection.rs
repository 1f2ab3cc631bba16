// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `almanac_selection` crate.
//!
//! These exercise the single-selection contract: idempotent selection,
//! handler invocation, and the revision counter.

use std::cell::RefCell;
use std::rc::Rc;

use almanac_selection::Selection;

#[test]
fn empty_selection_basics() {
    let sel = Selection::<u32, ()>::new();
    assert_eq!(sel.selected(), None);
    assert_eq!(sel.revision(), 0);
}

#[test]
fn select_stores_key_and_bumps_revision() {
    let mut sel = Selection::<u32, ()>::new();
    assert!(sel.select(3, ()));
    assert_eq!(sel.selected(), Some(&3));
    assert_eq!(sel.revision(), 1);
}

#[test]
fn reselecting_the_selected_key_is_a_noop() {
    let calls = Rc::new(RefCell::new(0_u32));
    let seen = calls.clone();
    let mut sel = Selection::<u32, &'static str>::with_handler(Box::new(move |_, _| {
        *seen.borrow_mut() += 1;
    }));

    assert!(sel.select(3, "month"));
    assert_eq!(*calls.borrow(), 1);
    let revision = sel.revision();

    // Same key again: no callback invocation, no state change.
    assert!(!sel.select(3, "month"));
    assert_eq!(*calls.borrow(), 1);
    assert_eq!(sel.revision(), revision);
}

#[test]
fn selecting_a_different_key_replaces_and_notifies() {
    let last = Rc::new(RefCell::new(None));
    let seen = last.clone();
    let mut sel = Selection::<u32, &'static str>::with_handler(Box::new(move |key, origin| {
        *seen.borrow_mut() = Some((*key, *origin));
    }));

    sel.select(3, "month");
    sel.select(4, "day");
    assert_eq!(sel.selected(), Some(&4));
    assert_eq!(*last.borrow(), Some((4, "day")));
    assert_eq!(sel.revision(), 2);
}

#[test]
fn deselect_clears_and_bumps_only_when_selected() {
    let mut sel = Selection::<u32, ()>::new();
    sel.deselect();
    assert_eq!(sel.revision(), 0);

    sel.select(9, ());
    sel.deselect();
    assert_eq!(sel.selected(), None);
    assert_eq!(sel.revision(), 2);

    sel.deselect();
    assert_eq!(sel.revision(), 2);
}

#[test]
fn is_selected_tracks_the_single_key() {
    let mut sel = Selection::<u32, ()>::new();
    sel.select(1, ());
    assert!(sel.is_selected(&1));
    assert!(!sel.is_selected(&2));

    sel.select(2, ());
    assert!(!sel.is_selected(&1));
    assert!(sel.is_selected(&2));
}
