// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect};

use crate::types::{Surface, SurfaceId, SurfaceState};

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    surface: Option<Surface>,
}

/// Arena of surfaces with parent-child containment.
///
/// Roots are surfaces inserted with no parent. The tree is deliberately
/// renderer-free: embedders walk it to mirror the structure into their real
/// view hierarchy, and the calendar core mutates it directly.
#[derive(Clone, Debug, Default)]
pub struct SurfaceTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<SurfaceId>,
}

impl SurfaceTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.surface.is_some()).count()
    }

    /// Returns `true` if the tree holds no live surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root surfaces in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[SurfaceId] {
        &self.roots
    }

    /// Returns `true` if `id` still refers to a live surface.
    #[must_use]
    pub fn is_alive(&self, id: SurfaceId) -> bool {
        self.slots
            .get(id.idx())
            .is_some_and(|slot| slot.generation == id.1 && slot.surface.is_some())
    }

    /// Inserts a surface under `parent` (or as a root) and returns its
    /// handle.
    pub fn insert(&mut self, parent: Option<SurfaceId>, mut surface: Surface) -> SurfaceId {
        surface.parent = parent.filter(|&p| self.is_alive(p));
        surface.children.clear();

        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.surface = Some(surface);
            SurfaceId::new(idx, slot.generation)
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 1,
                surface: Some(surface),
            });
            SurfaceId::new(idx, 1)
        };

        match self.get(id).and_then(Surface::parent) {
            Some(parent_id) => {
                if let Some(parent_surface) = self.get_mut_internal(parent_id) {
                    parent_surface.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    /// Removes a surface and its whole subtree. Stale ids are ignored.
    pub fn remove(&mut self, id: SurfaceId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.get(id).and_then(Surface::parent) {
            if let Some(parent_surface) = self.get_mut_internal(parent) {
                parent_surface.children.retain(|child| *child != id);
            }
        } else {
            self.roots.retain(|&root| root != id);
        }
        self.remove_subtree(id);
    }

    fn remove_subtree(&mut self, id: SurfaceId) {
        let children: Vec<SurfaceId> = self
            .get(id)
            .map(|surface| surface.children.to_vec())
            .unwrap_or_default();
        for child in children {
            self.remove_subtree(child);
        }
        if let Some(slot) = self.slots.get_mut(id.idx()) {
            slot.surface = None;
            self.free.push(id.0);
        }
    }

    /// Shared access to a live surface.
    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.surface.as_ref()
    }

    /// Mutable access to a live surface.
    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.get_mut_internal(id)
    }

    fn get_mut_internal(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.surface.as_mut()
    }

    /// Transform from a surface's local space into the space of the tree
    /// root it belongs to.
    #[must_use]
    pub fn world_transform(&self, id: SurfaceId) -> Option<Affine> {
        let mut matrix = self.get(id)?.local_matrix();
        let mut cursor = self.get(id)?.parent();
        while let Some(parent) = cursor {
            let surface = self.get(parent)?;
            matrix = surface.local_matrix() * matrix;
            cursor = surface.parent();
        }
        Some(matrix)
    }

    /// Converts a point between two surfaces' coordinate spaces.
    ///
    /// Both surfaces must belong to the same root. Degenerate (non-
    /// invertible) destination transforms yield `None`.
    #[must_use]
    pub fn convert_point(&self, point: Point, from: SurfaceId, to: SurfaceId) -> Option<Point> {
        let world = self.world_transform(from)? * point;
        let into = self.world_transform(to)?;
        if into.determinant().abs() < f64::EPSILON {
            return None;
        }
        Some(into.inverse() * world)
    }

    /// Converts a rect between two surfaces' coordinate spaces, returning the
    /// bounding box of the transformed corners.
    #[must_use]
    pub fn convert_rect(&self, rect: Rect, from: SurfaceId, to: SurfaceId) -> Option<Rect> {
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let mut out: Option<Rect> = None;
        for corner in corners {
            let p = self.convert_point(corner, from, to)?;
            let r = Rect::new(p.x, p.y, p.x, p.y);
            out = Some(match out {
                Some(acc) => acc.union(r),
                None => r,
            });
        }
        out
    }

    /// Captures the visual state of every live surface.
    ///
    /// Transitions snapshot before mutating; [`SurfaceTree::restore`] rolls
    /// the tree back on cancellation.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut states = Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(surface) = &slot.surface {
                let idx = u32::try_from(idx).unwrap_or(u32::MAX);
                states.push((SurfaceId::new(idx, slot.generation), surface.state.clone()));
            }
        }
        Snapshot { states }
    }

    /// Restores a snapshot: surfaces recorded in it regain their exact
    /// state; surfaces created after the snapshot (transition temporaries)
    /// are removed.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        let recorded: Vec<SurfaceId> = snapshot.states.iter().map(|(id, _)| *id).collect();
        let stray: Vec<SurfaceId> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let idx = u32::try_from(idx).ok()?;
                slot.surface
                    .as_ref()
                    .map(|_| SurfaceId::new(idx, slot.generation))
            })
            .filter(|id| !recorded.contains(id))
            .collect();
        for id in stray {
            self.remove(id);
        }
        for (id, state) in &snapshot.states {
            if let Some(surface) = self.get_mut_internal(*id) {
                surface.state = state.clone();
            }
        }
    }
}

/// Captured visual state of a whole tree at one instant.
#[derive(Clone, Debug)]
pub struct Snapshot {
    states: Vec<(SurfaceId, SurfaceState)>,
}

impl Snapshot {
    /// Recorded state for one surface, if it was alive at capture time.
    #[must_use]
    pub fn state_of(&self, id: SurfaceId) -> Option<&SurfaceState> {
        self.states
            .iter()
            .find(|(recorded, _)| *recorded == id)
            .map(|(_, state)| state)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Affine, Point, Rect, Size};

    use super::*;
    use crate::types::SurfaceFlags;

    fn frame(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::from_origin_size(Point::new(x, y), Size::new(w, h))
    }

    #[test]
    fn stale_ids_never_alias() {
        let mut tree = SurfaceTree::new();
        let a = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 10.0, 10.0)));
        tree.remove(a);
        let b = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 20.0, 20.0)));
        assert!(!tree.is_alive(a));
        assert!(tree.is_alive(b));
        assert!(tree.get(a).is_none());
    }

    #[test]
    fn remove_takes_subtree() {
        let mut tree = SurfaceTree::new();
        let root = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 100.0, 100.0)));
        let child = tree.insert(Some(root), Surface::default());
        let grandchild = tree.insert(Some(child), Surface::default());
        tree.remove(child);
        assert!(tree.is_alive(root));
        assert!(!tree.is_alive(child));
        assert!(!tree.is_alive(grandchild));
        assert!(tree.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn world_transform_composes_frames() {
        let mut tree = SurfaceTree::new();
        let root = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 100.0, 100.0)));
        let child = tree.insert(Some(root), Surface::with_frame(frame(10.0, 20.0, 50.0, 50.0)));
        let p = tree.convert_point(Point::new(1.0, 2.0), child, root).unwrap();
        assert_eq!(p, Point::new(11.0, 22.0));
    }

    #[test]
    fn pivot_anchored_scale_keeps_pivot_fixed() {
        let mut tree = SurfaceTree::new();
        let root = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 100.0, 100.0)));
        let child = tree.insert(Some(root), Surface::with_frame(frame(20.0, 20.0, 40.0, 40.0)));

        let before = tree.get(child).unwrap().position();
        tree.get_mut(child).unwrap().state.transform = Affine::scale(2.0);
        let after = tree
            .convert_point(Point::new(20.0, 20.0), child, root)
            .unwrap();

        // The pivot (frame center) stays put under a pivot-anchored scale.
        assert_eq!(before, Point::new(40.0, 40.0));
        assert!((after - before).hypot() < 1e-9);
    }

    #[test]
    fn set_position_moves_pivot_point() {
        let mut tree = SurfaceTree::new();
        let id = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 10.0, 10.0)));
        tree.get_mut(id).unwrap().set_position(Point::new(50.0, 50.0));
        let surface = tree.get(id).unwrap();
        assert_eq!(surface.state.frame, frame(45.0, 45.0, 10.0, 10.0));
    }

    #[test]
    fn snapshot_restore_is_exact_and_drops_temporaries() {
        let mut tree = SurfaceTree::new();
        let root = tree.insert(None, Surface::with_frame(frame(0.0, 0.0, 100.0, 100.0)));
        let child = tree.insert(Some(root), Surface::with_frame(frame(10.0, 10.0, 30.0, 30.0)));

        let snapshot = tree.snapshot();

        // Mutate everything a transition would: transform, pivot, opacity,
        // flags, plus a temporary mask surface.
        {
            let surface = tree.get_mut(child).unwrap();
            surface.shift_pivot(Point::new(0.1, 0.9));
            surface.state.transform = Affine::scale(3.0);
            surface.state.opacity = 0.0;
            surface.state.flags.set(SurfaceFlags::FROZEN, true);
        }
        let mask = tree.insert(Some(root), Surface::with_frame(frame(0.0, 0.0, 100.0, 10.0)));

        tree.restore(&snapshot);

        assert!(!tree.is_alive(mask));
        let surface = tree.get(child).unwrap();
        assert_eq!(surface.state, *snapshot.state_of(child).unwrap());
        assert_eq!(surface.state.pivot, Point::new(0.5, 0.5));
        assert_eq!(surface.state.transform, Affine::IDENTITY);
        assert_eq!(surface.state.opacity, 1.0);
    }
}
