//! Producer/consumer geometry handoff.
//!
//! Producers (mesh workers) only ever touch the write side; the consumer only
//! ever reads the read side. `swap` exchanges the two sides as a whole, so the
//! consumer observes either every change since the previous swap or none of them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use cgmath::Point3;

use super::Vertex;

/// Geometry changes accumulated between two swaps.
///
/// A position is either updated or removed in a batch, never both: the later of
/// the two operations wins.
#[derive(Debug, Clone, Default)]
pub struct GeometryBatch {
    updated: HashMap<Point3<i32>, Arc<[Vertex]>>,
    removed: HashSet<Point3<i32>>,
}

impl GeometryBatch {
    /// Records fresh geometry for a chunk.
    pub fn insert(&mut self, position: Point3<i32>, geometry: Arc<[Vertex]>) {
        self.removed.remove(&position);
        self.updated.insert(position, geometry);
    }

    /// Records that a chunk was evicted.
    pub fn remove(&mut self, position: Point3<i32>) {
        self.updated.remove(&position);
        self.removed.insert(position);
    }

    /// Folds a later batch into this one.
    pub fn merge(&mut self, later: GeometryBatch) {
        for position in later.removed {
            self.remove(position);
        }
        for (position, geometry) in later.updated {
            self.insert(position, geometry);
        }
    }

    /// Geometry rebuilt since the previous swap, by chunk position.
    pub fn updated(&self) -> &HashMap<Point3<i32>, Arc<[Vertex]>> {
        &self.updated
    }

    /// Chunks evicted since the previous swap.
    pub fn removed(&self) -> &HashSet<Point3<i32>> {
        &self.removed
    }

    /// The geometry recorded for a position in this batch.
    pub fn get(&self, position: &Point3<i32>) -> Option<&Arc<[Vertex]>> {
        self.updated.get(position)
    }

    /// Returns `true` if the batch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Two containers with a coordinated identity swap.
pub struct DoubleBuffer<T: Default> {
    write: Mutex<T>,
    read: Mutex<T>,
}

impl<T: Default> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> DoubleBuffer<T> {
    /// Creates a double buffer with both sides empty.
    pub fn new() -> Self {
        DoubleBuffer {
            write: Mutex::new(T::default()),
            read: Mutex::new(T::default()),
        }
    }

    /// The producer side.
    pub fn write(&self) -> MutexGuard<'_, T> {
        self.write.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The consumer side.
    pub fn read(&self) -> MutexGuard<'_, T> {
        self.read.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Exchanges the two sides and clears the new write side.
    ///
    /// Callers must ensure no producer is mid-write; the chunk manager only swaps
    /// while holding its round lock.
    pub fn swap(&self) {
        let mut write = self.write();
        let mut read = self.read();
        std::mem::swap(&mut *write, &mut *read);
        *write = T::default();
    }
}
