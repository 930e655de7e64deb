//! On-disk chunk persistence.
//!
//! One file per chunk, named after its position, holding the binary payload
//! described in `chunk::chunk_io`. Writes go to a temporary file that is renamed
//! into place, so a crash mid-save never leaves a truncated chunk behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use cgmath::Point3;

use super::chunk::chunk_io::{install_chunk_data, read_chunk_data, write_chunk};
use super::chunk::Chunk;
use crate::error::ChunkIoError;

const FILE_PREFIX: &str = "chunk_";
const FILE_EXTENSION: &str = "bin";

/// A directory of persisted chunks.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    directory: PathBuf,
}

impl ChunkStore {
    /// Opens a store, creating the directory if needed.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, ChunkIoError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(ChunkStore { directory })
    }

    /// The directory backing this store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file a chunk position is stored in.
    pub fn path_for(&self, position: Point3<i32>) -> PathBuf {
        self.directory.join(format!(
            "{FILE_PREFIX}{}_{}_{}.{FILE_EXTENSION}",
            position.x, position.y, position.z
        ))
    }

    /// Returns `true` if a file exists for the position.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        self.path_for(position).is_file()
    }

    /// Persists a chunk, replacing any previous file for its position.
    pub fn save(&self, chunk: &Chunk) -> Result<(), ChunkIoError> {
        let path = self.path_for(chunk.position);
        let temporary = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&temporary)?);
            write_chunk(&mut writer, chunk)?;
            writer.flush()?;
        }
        fs::rename(&temporary, &path)?;
        Ok(())
    }

    /// Loads the stored grid for `position` into `chunk`.
    ///
    /// # Returns
    /// `Ok(false)` if nothing is stored for the position. The chunk is untouched
    /// unless `Ok(true)` is returned.
    pub fn load_into(&self, position: Point3<i32>, chunk: &mut Chunk) -> Result<bool, ChunkIoError> {
        let path = self.path_for(position);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let (found, ids) = read_chunk_data(&mut BufReader::new(file))?;
        if found != position {
            return Err(ChunkIoError::PositionMismatch {
                path,
                found,
                expected: position,
            });
        }

        install_chunk_data(chunk, position, ids);
        Ok(true)
    }

    /// Every position with a stored file, in no particular order.
    ///
    /// Files that do not follow the naming scheme are ignored.
    pub fn stored_positions(&self) -> Result<Vec<Point3<i32>>, ChunkIoError> {
        let mut positions = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if let Some(position) = entry.file_name().to_str().and_then(parse_file_name) {
                positions.push(position);
            }
        }
        Ok(positions)
    }
}

fn parse_file_name(name: &str) -> Option<Point3<i32>> {
    let coords = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    let mut parts = coords.split('_').map(|part| part.parse::<i32>().ok());
    let position = Point3::new(parts.next()??, parts.next()??, parts.next()??);
    parts.next().is_none().then_some(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::LoadLevel;

    fn scratch_store(name: &str) -> ChunkStore {
        let directory = std::env::temp_dir().join(format!(
            "voxel-streamer-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&directory);
        ChunkStore::open(directory).unwrap()
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = scratch_store("round-trip");
        let mut chunk = Chunk::new(Point3::new(-2, 0, 9));
        chunk.fill_with(|p| (p.x + p.z) as u16 % 4);
        chunk.set_block(0, 0, 0, 5);
        store.save(&chunk).unwrap();

        let mut loaded = Chunk::new(Point3::new(0, 0, 0));
        assert!(store.load_into(chunk.position, &mut loaded).unwrap());
        assert_eq!(loaded.blocks(), chunk.blocks());
        assert_eq!(loaded.load_level(), LoadLevel::Decorated);
        assert!(!loaded.is_modified());

        assert_eq!(store.stored_positions().unwrap(), vec![chunk.position]);
        fs::remove_dir_all(store.directory()).unwrap();
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let store = scratch_store("missing");
        let mut chunk = Chunk::new(Point3::new(0, 0, 0));
        assert!(!store.load_into(Point3::new(1, 1, 1), &mut chunk).unwrap());
        fs::remove_dir_all(store.directory()).unwrap();
    }

    #[test]
    fn misnamed_file_is_rejected() {
        let store = scratch_store("misnamed");
        let chunk = Chunk::new(Point3::new(3, 0, 0));
        store.save(&chunk).unwrap();
        fs::rename(store.path_for(chunk.position), store.path_for(Point3::new(4, 0, 0))).unwrap();

        let mut target = Chunk::new(Point3::new(0, 0, 0));
        let err = store.load_into(Point3::new(4, 0, 0), &mut target).unwrap_err();
        assert!(matches!(err, ChunkIoError::PositionMismatch { .. }));
        fs::remove_dir_all(store.directory()).unwrap();
    }

    #[test]
    fn file_names_parse_back_to_positions() {
        assert_eq!(parse_file_name("chunk_-1_2_-3.bin"), Some(Point3::new(-1, 2, -3)));
        assert_eq!(parse_file_name("chunk_1_2.bin"), None);
        assert_eq!(parse_file_name("chunk_1_2_3_4.bin"), None);
        assert_eq!(parse_file_name("chunk_1_2_3.tmp"), None);
    }
}
