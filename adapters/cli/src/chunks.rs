use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
};

use overworld_core::ChunkCoord;
use overworld_world::{
    map::{ChunkMap, LoadError},
    session::ChunkSource,
};

const FILE_PREFIX: &str = "chunk_";
const FILE_EXTENSION: &str = ".tmj";

/// Chunk maps stored as `chunk_<x>_<y>.tmj` files in one directory.
#[derive(Clone, Debug)]
pub(crate) struct DirectorySource {
    root: PathBuf,
    available: BTreeSet<ChunkCoord>,
}

impl DirectorySource {
    /// Lists the chunk files present under `root`.
    pub(crate) fn scan(root: &Path) -> io::Result<Self> {
        let mut available = BTreeSet::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if let Some(chunk) = entry.file_name().to_str().and_then(parse_file_name) {
                let _ = available.insert(chunk);
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            available,
        })
    }

    /// Number of chunk files found by the scan.
    pub(crate) fn len(&self) -> usize {
        self.available.len()
    }

    fn path(&self, chunk: ChunkCoord) -> PathBuf {
        self.root.join(file_name(chunk))
    }
}

impl ChunkSource for DirectorySource {
    fn load(&self, chunk: ChunkCoord) -> Result<ChunkMap, LoadError> {
        let path = self.path(chunk);
        let document = fs::read_to_string(&path).map_err(|error| LoadError::Unavailable {
            chunk,
            reason: format!("{}: {error}", path.display()),
        })?;
        ChunkMap::parse(&document)
    }

    fn contains(&self, chunk: ChunkCoord) -> bool {
        self.available.contains(&chunk)
    }
}

fn file_name(chunk: ChunkCoord) -> String {
    format!("{FILE_PREFIX}{}_{}{FILE_EXTENSION}", chunk.x(), chunk.y())
}

fn parse_file_name(name: &str) -> Option<ChunkCoord> {
    let coordinates = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?;
    let (x, y) = coordinates.split_once('_')?;
    Some(ChunkCoord::new(x.parse().ok()?, y.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_carry_signed_coordinates() {
        assert_eq!(
            parse_file_name("chunk_-2_7.tmj"),
            Some(ChunkCoord::new(-2, 7))
        );
        assert_eq!(file_name(ChunkCoord::new(-2, 7)), "chunk_-2_7.tmj");
        assert_eq!(parse_file_name("chunk_1.tmj"), None);
        assert_eq!(parse_file_name("chunk_1_2.json"), None);
        assert_eq!(parse_file_name("notes.txt"), None);
    }

    #[test]
    fn missing_files_are_unavailable() {
        let source = DirectorySource {
            root: PathBuf::from("/nonexistent/overworld"),
            available: BTreeSet::new(),
        };
        assert!(!source.contains(ChunkCoord::new(0, 0)));
        assert!(matches!(
            source.load(ChunkCoord::new(0, 0)),
            Err(LoadError::Unavailable { .. })
        ));
    }
}
