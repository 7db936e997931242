//! Per-node screen rectangle cache.
//!
//! The external render pass writes each node's on-screen bounding box
//! here after painting; hit-testing and the link painters only ever
//! read whatever was last written. The core never computes layout.

use crate::pool::Uid;
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Screen-space bounding boxes keyed by node uid. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct LayoutCache {
    rects: HashMap<Uid, Rect>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a node's rectangle. Called by the render layer after paint.
    pub fn set_rect(&mut self, uid: Uid, rect: Rect) {
        self.rects.insert(uid, rect);
    }

    /// Last known rectangle for a node, if any.
    pub fn rect(&self, uid: Uid) -> Option<Rect> {
        self.rects.get(&uid).copied()
    }

    /// Drop a stale entry. Called when a node is removed.
    pub fn remove(&mut self, uid: Uid) {
        self.rects.remove(&uid);
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// The node under a screen point. When rectangles overlap the node
    /// with the highest uid wins, matching the created-later-on-top
    /// stacking of the shell.
    pub fn node_at_point(&self, point: Point) -> Option<Uid> {
        self.rects
            .iter()
            .filter(|(_, rect)| rect.contains(point))
            .map(|(&uid, _)| uid)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut cache = LayoutCache::new();
        cache.set_rect(1, Rect::new(0.0, 0.0, 100.0, 50.0));

        assert_eq!(cache.rect(1), Some(Rect::new(0.0, 0.0, 100.0, 50.0)));
        assert_eq!(cache.rect(2), None);
    }

    #[test]
    fn test_overwrite_per_paint() {
        let mut cache = LayoutCache::new();
        cache.set_rect(1, Rect::new(0.0, 0.0, 100.0, 50.0));
        cache.set_rect(1, Rect::new(10.0, 10.0, 110.0, 60.0));
        assert_eq!(cache.rect(1).unwrap().x0, 10.0);
    }

    #[test]
    fn test_node_at_point() {
        let mut cache = LayoutCache::new();
        cache.set_rect(1, Rect::new(0.0, 0.0, 100.0, 100.0));
        cache.set_rect(2, Rect::new(50.0, 50.0, 150.0, 150.0));

        assert_eq!(cache.node_at_point(Point::new(25.0, 25.0)), Some(1));
        // Overlap resolves to the higher uid.
        assert_eq!(cache.node_at_point(Point::new(75.0, 75.0)), Some(2));
        assert_eq!(cache.node_at_point(Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn test_remove() {
        let mut cache = LayoutCache::new();
        cache.set_rect(1, Rect::new(0.0, 0.0, 10.0, 10.0));
        cache.remove(1);
        assert_eq!(cache.rect(1), None);
    }
}
