//! Out-of-band remesh requests.
//!
//! Player edits must show up within a frame or two, so the edit path queues the
//! affected chunks here instead of waiting for the next sweep over the load
//! radius. The queue is drained by the consumer's swap, between rounds.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use cgmath::Point3;

#[derive(Default)]
struct QueueState {
    order: VecDeque<Point3<i32>>,
    queued: HashSet<Point3<i32>>,
}

/// A FIFO of chunk positions in which each position appears at most once.
#[derive(Default)]
pub struct PriorityQueue {
    state: Mutex<QueueState>,
}

impl PriorityQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Queues a position unless it is already waiting.
    ///
    /// # Returns
    /// `true` if the position was not queued before
    pub fn push(&self, position: Point3<i32>) -> bool {
        let mut state = self.state();
        if !state.queued.insert(position) {
            return false;
        }
        state.order.push_back(position);
        true
    }

    /// Removes and returns every queued position in arrival order.
    pub fn take_all(&self) -> Vec<Point3<i32>> {
        let mut state = self.state();
        state.queued.clear();
        state.order.drain(..).collect()
    }

    /// Returns `true` if the position is waiting.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        self.state().queued.contains(&position)
    }

    /// Number of waiting positions.
    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.state().order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_push_is_ignored() {
        let queue = PriorityQueue::new();
        assert!(queue.push(Point3::new(1, 0, 0)));
        assert!(queue.push(Point3::new(2, 0, 0)));
        assert!(!queue.push(Point3::new(1, 0, 0)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn take_all_preserves_order_and_allows_requeue() {
        let queue = PriorityQueue::new();
        for x in [3, 1, 2] {
            queue.push(Point3::new(x, 0, 0));
        }
        let drained: Vec<i32> = queue.take_all().into_iter().map(|p| p.x).collect();
        assert_eq!(drained, vec![3, 1, 2]);
        assert!(queue.is_empty());
        assert!(queue.push(Point3::new(3, 0, 0)));
        assert!(queue.contains(Point3::new(3, 0, 0)));
    }
}
