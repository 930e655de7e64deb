//! Consumer-side store of the latest geometry per chunk.
//!
//! The read buffer only carries what changed in one round; the renderer keeps a
//! `MeshCache` and applies each swapped batch to it. Capacity is bounded with an
//! LRU so a long-running session cannot grow without limit; the least recently
//! updated mesh is dropped first.

use std::num::NonZeroUsize;
use std::sync::Arc;

use cgmath::Point3;
use lru::LruCache;

use super::double_buffer::GeometryBatch;
use super::Vertex;

/// Latest geometry of every visible chunk, as seen by the consumer.
pub struct MeshCache {
    meshes: LruCache<Point3<i32>, Arc<[Vertex]>>,
}

impl MeshCache {
    /// Creates a cache holding at most `capacity` chunk meshes.
    pub fn new(capacity: NonZeroUsize) -> Self {
        MeshCache {
            meshes: LruCache::new(capacity),
        }
    }

    /// Applies one swapped batch.
    ///
    /// Empty geometry is stored too, so callers can tell "meshed, nothing to draw"
    /// apart from "never meshed".
    pub fn apply(&mut self, batch: &GeometryBatch) {
        for position in batch.removed() {
            self.meshes.pop(position);
        }
        for (position, geometry) in batch.updated() {
            if let Some((evicted, _)) = self.meshes.push(*position, geometry.clone()) {
                if evicted != *position {
                    log::debug!("Mesh cache full, dropped chunk {:?}", evicted);
                }
            }
        }
    }

    /// Geometry of one chunk.
    pub fn get(&self, position: &Point3<i32>) -> Option<&Arc<[Vertex]>> {
        self.meshes.peek(position)
    }

    /// Number of cached chunk meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Sum of vertex counts across all cached meshes.
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|(_, geometry)| geometry.len()).sum()
    }

    /// Iterates over cached meshes, most recently updated first.
    pub fn iter(&self) -> impl Iterator<Item = (&Point3<i32>, &Arc<[Vertex]>)> {
        self.meshes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(len: usize) -> Arc<[Vertex]> {
        Arc::from(vec![Vertex::new(Point3::new(0, 0, 0), 0, [0.0, 0.0], 0); len])
    }

    #[test]
    fn applies_updates_and_removals() {
        let mut cache = MeshCache::new(NonZeroUsize::new(8).unwrap());
        let mut batch = GeometryBatch::default();
        batch.insert(Point3::new(0, 0, 0), geometry(6));
        batch.insert(Point3::new(1, 0, 0), geometry(12));
        cache.apply(&batch);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.vertex_count(), 18);

        let mut batch = GeometryBatch::default();
        batch.remove(Point3::new(0, 0, 0));
        cache.apply(&batch);
        assert!(cache.get(&Point3::new(0, 0, 0)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_drops_least_recently_updated() {
        let mut cache = MeshCache::new(NonZeroUsize::new(2).unwrap());
        for x in 0..3 {
            let mut batch = GeometryBatch::default();
            batch.insert(Point3::new(x, 0, 0), geometry(6));
            cache.apply(&batch);
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&Point3::new(0, 0, 0)).is_none());
        assert!(cache.get(&Point3::new(2, 0, 0)).is_some());
    }
}
