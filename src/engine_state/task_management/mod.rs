//! # Task Management System
//!
//! Round-based coordination of the mesh workers and the management thread.
//!
//! ## Architecture Overview
//! - `StreamingState`: everything the threads share (world, buffers, priority
//!   queue, round parameters, barriers, counters)
//! - `StreamingThreads`: handles of the spawned threads
//! - `round`: the per-worker work of one round and the priority drain
//!
//! ## Round Lifecycle
//! 1. The manager waits for the consumer's "ready" signal
//! 2. It takes the round lock, clears every chunk's touched flag and publishes
//!    the round parameters
//! 3. Workers pass the start barrier, process their bands and merge their
//!    geometry into the write buffer
//! 4. Everyone meets at the end barrier
//! 5. The manager evicts chunks no worker touched, grows the load radius and
//!    releases the round lock
//!
//! The consumer's `try_swap` only succeeds while the round lock is free, so a
//! swap always observes whole rounds. Evictions and the priority drain also run
//! only while the round lock is held and no worker is inside a round.
//!
//! ## Shutdown
//! The manager sets the shutdown flag and passes the start barrier one last time;
//! workers check the flag right after that barrier and exit.

pub mod round;

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex, MutexGuard, RwLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cgmath::Point3;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info};
use web_time::Instant;

use round::{drain_priority_queue, layer_bands, process_band, RoundParams, RoundStats};

use super::priority_queue::PriorityQueue;
use super::rendering::{DoubleBuffer, GeometryBatch};
use super::voxels::world::{panic_message, World};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// How often the manager re-checks the shutdown flag while waiting for the consumer.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Mutable state owned by whoever holds the round lock.
#[derive(Debug)]
pub struct RoundState {
    /// Load radius of the next round
    pub radius: i32,
    /// Number of the next round
    pub round: u64,
}

/// Summary of one completed round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    /// Zero-based round number
    pub round: u64,
    /// Load radius the round ran with
    pub radius: i32,
    /// Worker counters
    pub stats: RoundStats,
    /// Chunks unloaded after the round
    pub evicted: usize,
    /// Chunks indexed after the round
    pub loaded_total: usize,
}

/// State shared by the manager, the workers and the consumer-facing facade.
pub struct StreamingState {
    /// Spatial index and chunk lifecycle
    pub world: World,
    /// Geometry handoff to the consumer
    pub buffers: DoubleBuffer<GeometryBatch>,
    /// Out-of-band remesh requests
    pub priority: PriorityQueue,
    config: EngineConfig,
    round_lock: Mutex<RoundState>,
    params: RwLock<RoundParams>,
    worker_stats: Mutex<RoundStats>,
    viewer: Mutex<Point3<i32>>,
    start_barrier: Barrier,
    end_barrier: Barrier,
    shutdown: AtomicBool,
    rounds_completed: AtomicU64,
    current_radius: AtomicI32,
}

impl StreamingState {
    /// Creates the shared state for `config.worker_count` workers.
    pub fn new(world: World, config: EngineConfig) -> Self {
        let radius = config.initial_radius.min(config.target_radius);
        let participants = config.worker_count + 1;
        StreamingState {
            world,
            buffers: DoubleBuffer::new(),
            priority: PriorityQueue::new(),
            round_lock: Mutex::new(RoundState { radius, round: 0 }),
            params: RwLock::new(RoundParams {
                center: Point3::new(0, 0, 0),
                radius,
                vertical_radius: config.vertical_radius,
                round: 0,
            }),
            worker_stats: Mutex::new(RoundStats::default()),
            viewer: Mutex::new(Point3::new(0, 0, 0)),
            start_barrier: Barrier::new(participants),
            end_barrier: Barrier::new(participants),
            shutdown: AtomicBool::new(false),
            rounds_completed: AtomicU64::new(0),
            current_radius: AtomicI32::new(radius),
            config,
        }
    }

    /// The configuration streaming runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Requests shutdown; threads exit at their next suspension point.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Chunk the viewer is in.
    pub fn viewer_chunk(&self) -> Point3<i32> {
        *self.viewer.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Moves the center of the load region; takes effect next round.
    pub fn set_viewer_chunk(&self, position: Point3<i32>) {
        *self.viewer.lock().unwrap_or_else(|p| p.into_inner()) = position;
    }

    /// Number of rounds finished so far.
    pub fn rounds_completed(&self) -> u64 {
        self.rounds_completed.load(Ordering::Acquire)
    }

    /// Load radius of the next round.
    pub fn current_radius(&self) -> i32 {
        self.current_radius.load(Ordering::Acquire)
    }

    fn lock_round(&self) -> MutexGuard<'_, RoundState> {
        self.round_lock.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn round_params(&self) -> RoundParams {
        *self.params.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Runs one round with the workers executing on their own threads.
    ///
    /// Blocks at both barriers; every worker thread must be parked at the start
    /// barrier.
    fn run_threaded_round(&self) -> RoundSummary {
        self.run_round(|| {
            self.start_barrier.wait();
            self.end_barrier.wait();
        })
    }

    /// Runs one round with every band processed on the calling thread.
    ///
    /// Produces the same result as a threaded round; used where no worker
    /// threads are running.
    pub fn run_inline_round(&self) -> RoundSummary {
        self.run_round(|| {
            let params = self.round_params();
            for band in layer_bands(self.config.vertical_radius, self.config.worker_count) {
                self.run_band(&params, band);
            }
        })
    }

    fn run_round(&self, execute: impl FnOnce()) -> RoundSummary {
        let mut round_state = self.lock_round();
        let started = Instant::now();

        let candidates = self.world.mark_eviction_candidates();
        let params = RoundParams {
            center: self.viewer_chunk(),
            radius: round_state.radius,
            vertical_radius: self.config.vertical_radius,
            round: round_state.round,
        };
        *self.params.write().unwrap_or_else(|p| p.into_inner()) = params;

        execute();

        let evicted = self.world.evict_untouched(candidates);
        {
            let mut write = self.buffers.write();
            for position in &evicted {
                write.remove(*position);
            }
        }

        let stats = std::mem::take(&mut *self.worker_stats.lock().unwrap_or_else(|p| p.into_inner()));
        round_state.radius = (round_state.radius + self.config.radius_step).min(self.config.target_radius);
        round_state.round += 1;
        self.current_radius.store(round_state.radius, Ordering::Release);
        self.rounds_completed.fetch_add(1, Ordering::AcqRel);

        let summary = RoundSummary {
            round: params.round,
            radius: params.radius,
            stats,
            evicted: evicted.len(),
            loaded_total: self.world.loaded_count(),
        };
        debug!(
            "Round {} (radius {}): {} loaded, {} evicted, {} rebuilt, {} deferred, {} indexed in {:?}",
            summary.round,
            summary.radius,
            stats.loaded,
            summary.evicted,
            stats.rebuilt,
            stats.deferred,
            summary.loaded_total,
            started.elapsed()
        );
        summary
    }

    fn run_band(&self, params: &RoundParams, band: std::ops::Range<i32>) {
        let mut batch = GeometryBatch::default();
        let stats = process_band(&self.world, params, band, &mut batch);
        self.buffers.write().merge(batch);
        self.worker_stats
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .accumulate(stats);
    }

    /// Swaps the geometry buffers if no round is in progress.
    ///
    /// On success the priority queue is drained into the new read buffer and the
    /// manager is told it may start the next round.
    ///
    /// # Returns
    /// `false` if a round holds the lock; the read buffer is unchanged
    pub fn try_swap(&self, ready: &Sender<()>) -> bool {
        let _round = match self.round_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };

        self.buffers.swap();
        drain_priority_queue(&self.world, &self.priority, &mut self.buffers.read());

        // A full channel already holds an unconsumed signal.
        let _ = ready.try_send(());
        true
    }
}

/// Handles of the streaming threads.
pub struct StreamingThreads {
    manager: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl StreamingThreads {
    /// Spawns the mesh workers and the management thread.
    ///
    /// Rounds start once `ready` delivers a signal.
    pub fn spawn(state: Arc<StreamingState>, ready: Receiver<()>) -> Result<Self, EngineError> {
        Self::spawn_with(state, ready, |name, body| {
            thread::Builder::new().name(name).spawn(body)
        })
    }

    /// Spawns every thread through `spawn_thread`.
    ///
    /// Workers hold off on the round barriers until every thread is running. If
    /// any spawn fails, the workers already started exit and are joined before
    /// the error is returned.
    fn spawn_with<S>(
        state: Arc<StreamingState>,
        ready: Receiver<()>,
        mut spawn_thread: S,
    ) -> Result<Self, EngineError>
    where
        S: FnMut(String, Box<dyn FnOnce() + Send>) -> io::Result<JoinHandle<()>>,
    {
        let bands = layer_bands(state.config.vertical_radius, state.config.worker_count);
        let (launch, launched) = crossbeam_channel::bounded::<()>(bands.len());

        let mut workers = Vec::with_capacity(bands.len());
        let mut failure = None;
        for (index, band) in bands.into_iter().enumerate() {
            let state = state.clone();
            let launched = launched.clone();
            let body = Box::new(move || {
                if launched.recv().is_ok() {
                    worker_loop(&state, band);
                }
            });
            match spawn_thread(format!("mesh-worker-{index}"), body) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let manager = match failure {
            None => {
                let state = state.clone();
                spawn_thread(
                    String::from("chunk-manager"),
                    Box::new(move || manager_loop(&state, ready)),
                )
            }
            Some(err) => Err(err),
        };

        match manager {
            Ok(manager) => {
                for _ in 0..workers.len() {
                    let _ = launch.send(());
                }
                info!("Started chunk manager with {} mesh workers", workers.len());
                Ok(StreamingThreads { manager, workers })
            }
            Err(err) => {
                state.request_shutdown();
                drop(launch);
                for worker in workers {
                    let _ = worker.join();
                }
                Err(EngineError::ThreadSpawn(err))
            }
        }
    }

    /// Waits for every thread to exit. Shutdown must already be requested.
    pub fn join(self) {
        if self.manager.join().is_err() {
            log::error!("Chunk manager thread panicked");
        }
        for worker in self.workers {
            if worker.join().is_err() {
                log::error!("Mesh worker thread panicked");
            }
        }
    }
}

fn worker_loop(state: &StreamingState, band: std::ops::Range<i32>) {
    loop {
        state.start_barrier.wait();
        if state.is_shutting_down() {
            break;
        }

        let params = state.round_params();
        let band_result = panic::catch_unwind(AssertUnwindSafe(|| {
            state.run_band(&params, band.clone());
        }));
        if let Err(payload) = band_result {
            log::error!(
                "Mesh worker panicked in round {}, band {:?} skipped: {}",
                params.round,
                band,
                panic_message(payload.as_ref())
            );
        }

        // Reached on every path so the manager is never left at the barrier.
        state.end_barrier.wait();
    }
}

fn manager_loop(state: &StreamingState, ready: Receiver<()>) {
    'rounds: loop {
        loop {
            if state.is_shutting_down() {
                break 'rounds;
            }
            match ready.recv_timeout(READY_POLL_INTERVAL) {
                Ok(()) => break,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break 'rounds,
            }
        }
        if state.is_shutting_down() {
            break;
        }

        state.run_threaded_round();
    }

    state.request_shutdown();
    state.start_barrier.wait();
    info!(
        "Chunk manager stopped after {} rounds",
        state.rounds_completed()
    );
}
