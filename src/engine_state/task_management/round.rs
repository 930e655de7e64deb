//! # Streaming Rounds
//!
//! The work a single mesh worker performs in one round, and the rebuild routine
//! shared with the priority drain.
//!
//! Workers partition the vertical extent of the load region into disjoint bands
//! of Y layers, so no two workers ever load or rebuild the same chunk in the same
//! round. Every lock taken here is either shared or a `try_` lock; a chunk whose
//! lock is contended stays dirty and is retried next round, so a worker never
//! stalls the round barrier.

use std::ops::Range;
use std::sync::{Arc, RwLockReadGuard};

use cgmath::{Point3, Vector3};

use crate::core::MtResource;
use crate::engine_state::priority_queue::PriorityQueue;
use crate::engine_state::rendering::{GeometryBatch, Vertex};
use crate::engine_state::voxels::chunk::Chunk;
use crate::engine_state::voxels::world::World;

/// What workers need to know about the round they are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundParams {
    /// Chunk the viewer is in
    pub center: Point3<i32>,
    /// Horizontal load radius of this round
    pub radius: i32,
    /// Vertical load radius cap
    pub vertical_radius: i32,
    /// Zero-based round number
    pub round: u64,
}

impl RoundParams {
    /// Vertical radius actually covered this round.
    pub fn effective_vertical_radius(&self) -> i32 {
        self.vertical_radius.min(self.radius)
    }

    /// Returns `true` if a chunk position is inside this round's load region.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        let offset = position - self.center;
        offset.x.abs() <= self.radius
            && offset.z.abs() <= self.radius
            && offset.y.abs() <= self.effective_vertical_radius()
    }
}

/// Per-round counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    /// Chunks loaded into the index
    pub loaded: usize,
    /// Chunks whose geometry was rebuilt
    pub rebuilt: usize,
    /// Dirty chunks skipped because a lock was contended
    pub deferred: usize,
}

impl RoundStats {
    /// Adds another worker's counters.
    pub fn accumulate(&mut self, other: RoundStats) {
        self.loaded += other.loaded;
        self.rebuilt += other.rebuilt;
        self.deferred += other.deferred;
    }
}

/// Result of trying to rebuild one chunk.
pub enum RebuildOutcome {
    /// The chunk was not dirty
    Clean,
    /// New geometry was built
    Rebuilt(Arc<[Vertex]>),
    /// The chunk or one of its neighbors was locked for writing
    Contended,
}

/// Rebuilds a chunk if it is dirty.
///
/// Takes a shared guard on the chunk and on every loaded neighbor without
/// blocking.
pub fn rebuild_chunk(
    world: &World,
    position: Point3<i32>,
    chunk: &MtResource<Chunk>,
) -> RebuildOutcome {
    let Some(guard) = chunk.try_get() else {
        return RebuildOutcome::Contended;
    };
    if !guard.is_dirty() {
        return RebuildOutcome::Clean;
    }

    let resources = world.neighbors_of(position);
    let mut neighbors: [Option<RwLockReadGuard<'_, Chunk>>; 6] = Default::default();
    for (slot, resource) in neighbors.iter_mut().zip(resources.iter()) {
        if let Some(resource) = resource {
            match resource.try_get() {
                Some(neighbor) => *slot = Some(neighbor),
                None => return RebuildOutcome::Contended,
            }
        }
    }

    RebuildOutcome::Rebuilt(guard.rebuild_geometry(&neighbors))
}

/// Splits the layers `-vertical_radius..=vertical_radius` into `worker_count`
/// disjoint contiguous bands of Y offsets from the viewer chunk.
///
/// Bands are as even as possible; with more workers than layers some bands are
/// empty.
pub fn layer_bands(vertical_radius: i32, worker_count: usize) -> Vec<Range<i32>> {
    let layers = 2 * i64::from(vertical_radius.max(0)) + 1;
    let workers = worker_count.max(1) as i64;
    (0..workers)
        .map(|w| {
            let start = (w * layers / workers) as i32 - vertical_radius.max(0);
            let end = ((w + 1) * layers / workers) as i32 - vertical_radius.max(0);
            start..end
        })
        .collect()
}

/// Processes one worker's band for one round.
///
/// Every in-range, in-bounds position is touched (protecting it from eviction),
/// loaded if missing, and rebuilt if dirty. New geometry is collected in `batch`.
pub fn process_band(
    world: &World,
    params: &RoundParams,
    band: Range<i32>,
    batch: &mut GeometryBatch,
) -> RoundStats {
    let mut stats = RoundStats::default();
    let vertical = params.effective_vertical_radius();
    let radius = params.radius;

    for dy in band.filter(|dy| dy.abs() <= vertical) {
        for dx in -radius..=radius {
            for dz in -radius..=radius {
                let position = params.center + Vector3::new(dx, dy, dz);
                if !world.bounds().contains(position) {
                    continue;
                }

                let entry = match world.get_entry(position) {
                    Some(entry) => entry,
                    None => {
                        if world.load_chunk(position) {
                            stats.loaded += 1;
                        }
                        match world.get_entry(position) {
                            Some(entry) => entry,
                            None => continue,
                        }
                    }
                };
                entry.touch();

                match rebuild_chunk(world, position, &entry.chunk) {
                    RebuildOutcome::Clean => {}
                    RebuildOutcome::Rebuilt(geometry) => {
                        batch.insert(position, geometry);
                        stats.rebuilt += 1;
                    }
                    RebuildOutcome::Contended => {
                        log::trace!("Chunk {:?} is locked, deferring rebuild", position);
                        stats.deferred += 1;
                    }
                }
            }
        }
    }

    stats
}

/// Rebuilds every queued chunk on the calling thread.
///
/// Must only run between rounds. Chunks that are no longer loaded are dropped
/// from the queue, chunks a round already rebuilt are skipped, and chunks whose
/// locks are contended are queued again.
///
/// # Returns
/// The number of chunks rebuilt
pub fn drain_priority_queue(world: &World, queue: &PriorityQueue, batch: &mut GeometryBatch) -> usize {
    let mut rebuilt = 0;
    let mut requeued = 0;

    for position in queue.take_all() {
        let Some(chunk) = world.get_chunk_at(position) else {
            continue;
        };
        match rebuild_chunk(world, position, &chunk) {
            RebuildOutcome::Rebuilt(geometry) => {
                batch.insert(position, geometry);
                rebuilt += 1;
            }
            RebuildOutcome::Clean => {}
            RebuildOutcome::Contended => {
                queue.push(position);
                requeued += 1;
            }
        }
    }

    if rebuilt + requeued > 0 {
        log::trace!("Priority drain rebuilt {} chunks, requeued {}", rebuilt, requeued);
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldBounds;
    use crate::engine_state::voxels::block::EMPTY_BLOCK;
    use crate::engine_state::voxels::generation::patterns::SolidGenerator;

    fn solid_world() -> World {
        World::new(Arc::new(SolidGenerator), None, WorldBounds::UNBOUNDED)
    }

    fn params(radius: i32, vertical_radius: i32) -> RoundParams {
        RoundParams {
            center: Point3::new(0, 0, 0),
            radius,
            vertical_radius,
            round: 0,
        }
    }

    #[test]
    fn bands_cover_every_layer_once() {
        for workers in 1..=7 {
            let bands = layer_bands(2, workers);
            assert_eq!(bands.len(), workers);
            let layers: Vec<i32> = bands.into_iter().flatten().collect();
            assert_eq!(layers, vec![-2, -1, 0, 1, 2]);
        }
    }

    #[test]
    fn vertical_reach_is_capped_by_radius() {
        let p = params(1, 3);
        assert!(p.contains(Point3::new(1, 1, -1)));
        assert!(!p.contains(Point3::new(0, 2, 0)));
        assert!(!p.contains(Point3::new(2, 0, 0)));
    }

    #[test]
    fn band_loads_and_meshes_its_layers_only() {
        let world = solid_world();
        let mut batch = GeometryBatch::default();
        let stats = process_band(&world, &params(1, 1), 0..1, &mut batch);

        assert_eq!(stats.loaded, 9);
        assert_eq!(world.loaded_count(), 9);
        assert!(world.positions().iter().all(|p| p.y == 0));
        assert!(stats.rebuilt >= 1);
        assert_eq!(batch.updated().len(), stats.rebuilt);
    }

    #[test]
    fn second_pass_rebuilds_only_dirty_chunks() {
        let world = solid_world();
        let mut batch = GeometryBatch::default();
        let p = params(1, 1);
        process_band(&world, &p, -1..2, &mut batch);
        process_band(&world, &p, -1..2, &mut batch);

        let mut batch = GeometryBatch::default();
        let stats = process_band(&world, &p, -1..2, &mut batch);
        assert_eq!(stats.loaded, 0);
        assert_eq!(stats.rebuilt, 0);
    }

    #[test]
    fn write_locked_chunk_is_deferred() {
        let world = solid_world();
        world.load_chunk(Point3::new(0, 0, 0));
        let chunk = world.get_chunk_at(Point3::new(0, 0, 0)).unwrap();
        let _edit = chunk.get_mut();

        let mut batch = GeometryBatch::default();
        let stats = process_band(&world, &params(0, 0), 0..1, &mut batch);
        assert_eq!(stats.deferred, 1);
        assert!(batch.is_empty());

        drop(_edit);
        assert!(chunk.get().is_dirty());
        let stats = process_band(&world, &params(0, 0), 0..1, &mut batch);
        assert_eq!(stats.rebuilt, 1);
        assert!(!chunk.get().is_dirty());
    }

    #[test]
    fn queued_chunk_rebuilt_by_a_round_is_not_rebuilt_again() {
        let world = solid_world();
        let position = Point3::new(0, 0, 0);
        world.load_chunk(position);
        let chunk = world.get_chunk_at(position).unwrap();
        chunk.get_mut().set_block(3, 3, 3, EMPTY_BLOCK);

        let queue = PriorityQueue::new();
        queue.push(position);
        queue.push(position);

        let mut round_batch = GeometryBatch::default();
        let stats = process_band(&world, &params(0, 0), 0..1, &mut round_batch);
        assert_eq!(stats.rebuilt, 1);

        let mut drain_batch = GeometryBatch::default();
        assert_eq!(drain_priority_queue(&world, &queue, &mut drain_batch), 0);
        assert!(drain_batch.is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_priority_requests_rebuild_once() {
        let world = solid_world();
        world.load_chunk(Point3::new(0, 0, 0));
        let queue = PriorityQueue::new();
        queue.push(Point3::new(0, 0, 0));
        queue.push(Point3::new(0, 0, 0));
        queue.push(Point3::new(9, 9, 9));

        let mut batch = GeometryBatch::default();
        assert_eq!(drain_priority_queue(&world, &queue, &mut batch), 1);
        assert_eq!(batch.updated().len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn contended_priority_request_is_requeued() {
        let world = solid_world();
        world.load_chunk(Point3::new(0, 0, 0));
        world.load_chunk(Point3::new(1, 0, 0));
        let neighbor = world.get_chunk_at(Point3::new(1, 0, 0)).unwrap();
        let queue = PriorityQueue::new();
        queue.push(Point3::new(0, 0, 0));

        let mut batch = GeometryBatch::default();
        {
            let _edit = neighbor.get_mut();
            assert_eq!(drain_priority_queue(&world, &queue, &mut batch), 0);
        }
        assert!(queue.contains(Point3::new(0, 0, 0)));
        assert_eq!(drain_priority_queue(&world, &queue, &mut batch), 1);
    }
}
