//! # Chunk I/O Module
//!
//! Binary encoding of a chunk's position and block grid.
//!
//! ## Layout (little endian)
//!
//! | Field      | Type         | Notes                                   |
//! |------------|--------------|-----------------------------------------|
//! | magic      | `[u8; 4]`    | `VXCK`                                  |
//! | version    | `u16`        | currently 1                             |
//! | dimensions | `[u16; 3]`   | must match the compiled chunk size      |
//! | position   | `[i32; 3]`   | chunk coordinate                        |
//! | blocks     | `[u16; N]`   | x outer, y middle, z inner              |

use std::io::{Read, Write};

use cgmath::Point3;

use super::{Chunk, LoadLevel, CHUNK_DIMENSION_X, CHUNK_DIMENSION_Y, CHUNK_DIMENSION_Z, CHUNK_SIZE};
use crate::engine_state::voxels::block::BlockId;
use crate::error::ChunkIoError;

/// Magic bytes at the start of every chunk payload.
pub const CHUNK_MAGIC: [u8; 4] = *b"VXCK";

/// Current payload version.
pub const CHUNK_FORMAT_VERSION: u16 = 1;

const DIMENSIONS: [u16; 3] = [
    CHUNK_DIMENSION_X as u16,
    CHUNK_DIMENSION_Y as u16,
    CHUNK_DIMENSION_Z as u16,
];

/// Size of an encoded chunk in bytes.
pub const ENCODED_CHUNK_SIZE: usize = 4 + 2 + 3 * 2 + 3 * 4 + CHUNK_SIZE * 2;

/// Serializes a chunk's position and grid.
pub fn write_chunk(writer: &mut impl Write, chunk: &Chunk) -> Result<(), ChunkIoError> {
    let mut bytes = Vec::with_capacity(ENCODED_CHUNK_SIZE);
    bytes.extend_from_slice(&CHUNK_MAGIC);
    bytes.extend_from_slice(&CHUNK_FORMAT_VERSION.to_le_bytes());
    for dimension in DIMENSIONS {
        bytes.extend_from_slice(&dimension.to_le_bytes());
    }
    for coordinate in [chunk.position.x, chunk.position.y, chunk.position.z] {
        bytes.extend_from_slice(&coordinate.to_le_bytes());
    }
    for id in chunk.blocks() {
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    writer.write_all(&bytes)?;
    Ok(())
}

/// Reads a payload header and grid, validating the header before returning.
///
/// # Returns
/// The stored chunk position and the block identifiers in storage order
pub fn read_chunk_data(reader: &mut impl Read) -> Result<(Point3<i32>, Vec<BlockId>), ChunkIoError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != CHUNK_MAGIC {
        return Err(ChunkIoError::BadMagic(magic));
    }

    let version = read_u16(reader)?;
    if version != CHUNK_FORMAT_VERSION {
        return Err(ChunkIoError::UnsupportedVersion(version));
    }

    let found = [read_u16(reader)?, read_u16(reader)?, read_u16(reader)?];
    if found != DIMENSIONS {
        return Err(ChunkIoError::DimensionMismatch {
            found,
            expected: DIMENSIONS,
        });
    }

    let position = Point3::new(read_i32(reader)?, read_i32(reader)?, read_i32(reader)?);

    let mut raw = vec![0u8; CHUNK_SIZE * 2];
    reader.read_exact(&mut raw)?;
    let ids = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok((position, ids))
}

/// Replaces a chunk's grid with a stored payload.
///
/// The chunk is left untouched if the payload is rejected. On success the chunk
/// takes the stored position, is fully decorated and has no unsaved edits.
pub fn read_chunk_into(reader: &mut impl Read, chunk: &mut Chunk) -> Result<(), ChunkIoError> {
    let (position, ids) = read_chunk_data(reader)?;
    install_chunk_data(chunk, position, ids);
    Ok(())
}

/// Moves decoded payload data into a chunk.
pub(crate) fn install_chunk_data(chunk: &mut Chunk, position: Point3<i32>, ids: Vec<BlockId>) {
    chunk.position = position;
    chunk.fill_from_ids(ids);
    chunk.set_load_level(LoadLevel::Decorated);
    chunk.mark_persisted();
}

fn read_u16(reader: &mut impl Read) -> Result<u16, ChunkIoError> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn read_i32(reader: &mut impl Read) -> Result<i32, ChunkIoError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}
