//! # Error Types
//!
//! Error enums for every fallible surface of the streamer. Bounds violations on
//! chunk-local coordinates are caller bugs and panic instead of appearing here;
//! lock contention is deferred internally and never surfaced.

use std::path::PathBuf;

use cgmath::Point3;
use thiserror::Error;

/// Failures raised by a world generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// No generator is registered under the requested name.
    #[error("unknown world generator `{0}`")]
    UnknownGenerator(String),
    /// Generator settings were rejected while preparing the world.
    #[error("invalid generator settings: {0}")]
    InvalidSettings(String),
    /// Generation of a single chunk failed; the chunk is loaded empty.
    #[error("failed to generate chunk {position:?}: {reason}")]
    ChunkFailed {
        /// Chunk coordinate that failed
        position: Point3<i32>,
        /// Human readable cause
        reason: String,
    },
}

/// Failures while reading or writing persisted chunks.
#[derive(Debug, Error)]
pub enum ChunkIoError {
    /// Underlying file system or stream error.
    #[error("chunk i/o failed: {0}")]
    Io(#[from] std::io::Error),
    /// The payload does not start with the chunk magic bytes.
    #[error("not a chunk file (bad magic {0:?})")]
    BadMagic([u8; 4]),
    /// The payload was written by an unknown format version.
    #[error("unsupported chunk format version {0}")]
    UnsupportedVersion(u16),
    /// The payload was written with different chunk dimensions.
    #[error("chunk dimensions {found:?} do not match {expected:?}")]
    DimensionMismatch {
        /// Dimensions stored in the payload
        found: [u16; 3],
        /// Dimensions compiled into this build
        expected: [u16; 3],
    },
    /// The file name and stored position disagree.
    #[error("chunk file {path:?} holds position {found:?}, expected {expected:?}")]
    PositionMismatch {
        /// File that was read
        path: PathBuf,
        /// Position stored in the payload
        found: Point3<i32>,
        /// Position derived from the file name
        expected: Point3<i32>,
    },
}

/// Misuse of a chunk pool handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The handle's slot was released (and possibly reused) since it was issued.
    #[error("stale chunk handle (slot {index}, generation {generation})")]
    StaleHandle {
        /// Slot index carried by the handle
        index: usize,
        /// Generation carried by the handle
        generation: u32,
    },
}

/// Failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path:?}: {source}")]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// The configuration is not valid JSON for `EngineConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error returned by the chunk manager.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The world generator could not be created or prepared.
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    /// Saving or loading chunks failed.
    #[error(transparent)]
    ChunkIo(#[from] ChunkIoError),
    /// A global position lies outside the configured world bounds.
    #[error("position {0:?} is outside the world bounds")]
    OutOfBounds(Point3<i32>),
    /// A streaming thread could not be started.
    #[error("failed to spawn streaming thread: {0}")]
    ThreadSpawn(std::io::Error),
}
