//! Ordered collection of the native views a host owns.
//!
//! A host's paint tree is the only owner of its views. Insertion order is
//! paint order, so the last view is drawn on top.

use launchpad_core::SurfaceId;

/// Views owned by one host, bottom to top.
#[derive(Debug)]
pub struct PaintTree<V> {
    entries: Vec<(SurfaceId, V)>,
}

impl<V> Default for PaintTree<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V> PaintTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a view on top. Returns the view back if the id is already present.
    pub fn push(&mut self, id: SurfaceId, view: V) -> Result<(), V> {
        if self.contains(&id) {
            return Err(view);
        }
        self.entries.push((id, view));
        Ok(())
    }

    /// Remove and return the view of `id`, handing over its ownership.
    pub fn take(&mut self, id: &SurfaceId) -> Option<V> {
        let index = self.position(id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: &SurfaceId) -> Option<&V> {
        self.entries.iter().find(|(entry, _)| entry == id).map(|(_, view)| view)
    }

    pub fn contains(&self, id: &SurfaceId) -> bool {
        self.position(id).is_some()
    }

    /// Position of `id` in paint order.
    pub fn position(&self, id: &SurfaceId) -> Option<usize> {
        self.entries.iter().position(|(entry, _)| entry == id)
    }

    /// Surface ids in paint order.
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SurfaceId, &V)> {
        self.entries.iter().map(|(id, view)| (id, view))
    }

    /// Remove every view, top first.
    pub fn drain(&mut self) -> Vec<(SurfaceId, V)> {
        let mut drained: Vec<_> = self.entries.drain(..).collect();
        drained.reverse();
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_paint_order() {
        let mut tree = PaintTree::new();
        tree.push(SurfaceId::from("main-view"), 1).unwrap();
        tree.push(SurfaceId::from("settings-view"), 2).unwrap();
        assert_eq!(tree.ids(), vec![SurfaceId::from("main-view"), SurfaceId::from("settings-view")]);
        assert_eq!(tree.position(&SurfaceId::from("settings-view")), Some(1));
    }

    #[test]
    fn test_push_duplicate_returns_view() {
        let mut tree = PaintTree::new();
        tree.push(SurfaceId::from("a"), 1).unwrap();
        assert_eq!(tree.push(SurfaceId::from("a"), 2), Err(2));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_take_transfers_ownership() {
        let mut tree = PaintTree::new();
        tree.push(SurfaceId::from("a"), String::from("view-a")).unwrap();
        assert_eq!(tree.take(&SurfaceId::from("a")).as_deref(), Some("view-a"));
        assert!(tree.take(&SurfaceId::from("a")).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_drain_is_top_first() {
        let mut tree = PaintTree::new();
        tree.push(SurfaceId::from("a"), 1).unwrap();
        tree.push(SurfaceId::from("b"), 2).unwrap();
        let drained: Vec<_> = tree.drain().into_iter().map(|(_, v)| v).collect();
        assert_eq!(drained, vec![2, 1]);
    }
}
