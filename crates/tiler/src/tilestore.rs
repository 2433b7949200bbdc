use std::path::{Path, PathBuf};

use crate::{Result, TileIndex, TileKey};

pub const INDEX_FILE_NAME: &str = "index.json";

/// Tile storage in a directory: tiles are stored as `{zoom}/{row}/{col}.bin` next to the `index.json` file
#[derive(Debug, Clone)]
pub struct DirectoryTileStore {
    root: PathBuf,
}

impl DirectoryTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryTileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// An index left behind by a previous run no longer describes the tiles once they get overwritten
    pub fn remove_index(&self) -> Result<()> {
        let index_path = self.index_path();
        if index_path.exists() {
            log::info!("Removing stale tile index {}", index_path.display());
        }

        Ok(inf::fs::remove_file_if_exists(&index_path)?)
    }

    pub fn write_tile(&self, key: &TileKey, data: &[u8]) -> Result<()> {
        let path = self.tile_path(key);
        inf::fs::create_directory_for_file(&path)?;
        std::fs::write(&path, data)?;
        Ok(())
    }

    pub fn read_tile(&self, key: &TileKey) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.tile_path(key))?)
    }

    /// The index is written to a temporary file that replaces the index file when complete
    pub fn write_index(&self, index: &TileIndex) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(inf::fs::write_atomically(&self.index_path(), index.to_json()?.as_bytes())?)
    }

    pub fn read_index(&self) -> Result<TileIndex> {
        TileIndex::from_file(&self.index_path())
    }
}
