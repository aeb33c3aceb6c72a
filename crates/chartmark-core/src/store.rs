//! The authoritative collection of shapes.
//!
//! Writes are crate-private: shapes change only through
//! [`crate::commands`] (and the initial mount from storage).

use crate::shapes::{Shape, ShapeId};
use std::collections::HashMap;

/// In-memory shape collection with stable insertion order.
#[derive(Debug, Clone, Default)]
pub struct ShapeStore {
    shapes: HashMap<ShapeId, Shape>,
    /// Insertion order, used to break z-index ties.
    order: Vec<ShapeId>,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shapes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Shapes back to front: ascending z-index, then insertion order.
    pub fn shapes_ordered(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.iter().collect();
        // stable sort keeps insertion order within a z-index
        shapes.sort_by_key(|s| s.z_index);
        shapes
    }

    /// Shapes front to back, for hit testing (highest z wins).
    pub fn topmost_first(&self) -> Vec<&Shape> {
        let mut shapes = self.shapes_ordered();
        shapes.reverse();
        shapes
    }

    /// Highest z-index in use (0 when empty).
    pub fn max_z(&self) -> i32 {
        self.shapes.values().map(|s| s.z_index).max().unwrap_or(0)
    }

    /// Lowest z-index in use (0 when empty).
    pub fn min_z(&self) -> i32 {
        self.shapes.values().map(|s| s.z_index).min().unwrap_or(0)
    }

    /// Owned copy of all shapes in insertion order.
    pub fn snapshot(&self) -> Vec<Shape> {
        self.iter().cloned().collect()
    }

    /// Order-independent content comparison, ignoring edit timestamps.
    pub fn content_eq(&self, shapes: &[Shape]) -> bool {
        shapes.len() == self.len()
            && shapes
                .iter()
                .all(|s| self.get(s.id()).is_some_and(|mine| mine.same_content(s)))
    }

    /// Add a shape at the end. Returns `false` if the id is taken.
    pub(crate) fn insert(&mut self, shape: Shape) -> bool {
        let at = self.order.len();
        self.insert_at(at, shape)
    }

    /// Add a shape at a position in insertion order.
    pub(crate) fn insert_at(&mut self, position: usize, shape: Shape) -> bool {
        let id = shape.id();
        if self.shapes.contains_key(&id) {
            return false;
        }
        let position = position.min(self.order.len());
        self.order.insert(position, id);
        self.shapes.insert(id, shape);
        true
    }

    /// Remove a shape, returning it with its insertion position.
    pub(crate) fn remove(&mut self, id: ShapeId) -> Option<(usize, Shape)> {
        let shape = self.shapes.remove(&id)?;
        let position = self.order.iter().position(|&s| s == id).unwrap_or(self.order.len());
        if position < self.order.len() {
            self.order.remove(position);
        }
        Some((position, shape))
    }

    /// Overwrite an existing shape, returning the previous value.
    pub(crate) fn replace(&mut self, shape: Shape) -> Option<Shape> {
        let slot = self.shapes.get_mut(&shape.id())?;
        Some(std::mem::replace(slot, shape))
    }

    /// Drop everything and load `shapes` (mount from storage).
    pub(crate) fn reset(&mut self, shapes: Vec<Shape>) {
        self.shapes.clear();
        self.order.clear();
        for shape in shapes {
            if !self.insert(shape) {
                log::warn!("duplicate shape id while mounting; keeping the first");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ChartPoint, ShapeKind};
    use crate::tools::ToolRegistry;

    fn hline(price: f64) -> Shape {
        ToolRegistry::build(ShapeKind::Horizontal, vec![ChartPoint::new(0, price)], None).unwrap()
    }

    #[test]
    fn test_insert_and_remove_keeps_position() {
        let mut store = ShapeStore::new();
        let (a, b, c) = (hline(1.0), hline(2.0), hline(3.0));
        let b_id = b.id();
        store.insert(a);
        store.insert(b);
        store.insert(c);
        let (pos, removed) = store.remove(b_id).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(store.len(), 2);
        store.insert_at(pos, removed);
        let ids: Vec<_> = store.iter().map(|s| s.id()).collect();
        assert_eq!(ids[1], b_id);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = ShapeStore::new();
        let a = hline(1.0);
        assert!(store.insert(a.clone()));
        assert!(!store.insert(a));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_topmost_first_by_z_then_insertion() {
        let mut store = ShapeStore::new();
        let mut low = hline(1.0);
        low.z_index = -1;
        let first = hline(2.0);
        let second = hline(3.0);
        let (low_id, first_id, second_id) = (low.id(), first.id(), second.id());
        store.insert(first);
        store.insert(low);
        store.insert(second);
        let order: Vec<_> = store.topmost_first().iter().map(|s| s.id()).collect();
        assert_eq!(order, vec![second_id, first_id, low_id]);
        assert_eq!(store.max_z(), 0);
        assert_eq!(store.min_z(), -1);
    }

    #[test]
    fn test_content_eq_is_order_independent() {
        let mut store = ShapeStore::new();
        let (a, b) = (hline(1.0), hline(2.0));
        store.insert(a.clone());
        store.insert(b.clone());
        assert!(store.content_eq(&[b.clone(), a.clone()]));
        assert!(!store.content_eq(&[a]));
    }

    #[test]
    fn test_replace_requires_existing() {
        let mut store = ShapeStore::new();
        let a = hline(1.0);
        assert!(store.replace(a.clone()).is_none());
        store.insert(a.clone());
        let mut changed = a.clone();
        changed.locked = true;
        let previous = store.replace(changed).unwrap();
        assert!(!previous.locked);
        assert!(store.get(a.id()).unwrap().locked);
    }
}
