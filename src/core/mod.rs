//! # Core Module
//!
//! Concurrency primitives shared by every subsystem of the streamer.
//!
//! ## Key Components
//! - `MtResource`: Thread-safe reference-counted resource with read-write locking,
//!   including non-blocking `try_get`/`try_get_mut` used by mesh workers to defer
//!   contended chunks to the next round.
//!
//! ## Usage
//! ```rust
//! use voxel_streamer::core::MtResource;
//!
//! let counter = MtResource::new(0);
//! *counter.get_mut() += 1;
//! assert_eq!(*counter.get(), 1);
//! ```

pub mod mt_resource;

pub use mt_resource::MtResource;
