use std::path::PathBuf;

/// Address of a tile in the pyramid, zoom 0 holds the single root tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub zoom: u32,
    pub row: usize,
    pub col: usize,
}

impl TileKey {
    pub const fn new(zoom: u32, row: usize, col: usize) -> Self {
        TileKey { zoom, row, col }
    }

    /// The four children on the next zoom level in quadtree order:
    /// top left, top right, bottom left, bottom right
    pub fn children(&self) -> [TileKey; 4] {
        let (zoom, row, col) = (self.zoom + 1, self.row * 2, self.col * 2);
        [
            TileKey::new(zoom, row, col),
            TileKey::new(zoom, row, col + 1),
            TileKey::new(zoom, row + 1, col),
            TileKey::new(zoom, row + 1, col + 1),
        ]
    }

    pub fn parent(&self) -> Option<TileKey> {
        if self.zoom == 0 {
            return None;
        }

        Some(TileKey::new(self.zoom - 1, self.row / 2, self.col / 2))
    }

    /// Location of the tile file relative to the pyramid root: `{zoom}/{row}/{col}.bin`
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.zoom.to_string())
            .join(self.row.to_string())
            .join(format!("{}.bin", self.col))
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.row, self.col)
    }
}
