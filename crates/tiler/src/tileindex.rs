use std::{collections::BTreeMap, path::Path};

use geo::StatAccumulator;
use serde::{Deserialize, Serialize};

use crate::{Result, TileKey, tiledata::EncodedTile};

/// Index information of a single present tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    /// Quantization range of the stored values, `None` when the tile holds no valid pixel
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bins: u32,
    pub err: f64,
    /// Statistics of the native raster pixels covered by the tile, one accumulator per band
    pub bands: Vec<StatAccumulator>,
}

impl TileEntry {
    pub fn new(encoded: &EncodedTile, bands: Vec<StatAccumulator>) -> Self {
        TileEntry {
            min: encoded.range.map(|(min, _)| min),
            max: encoded.range.map(|(_, max)| max),
            bins: encoded.bins,
            err: encoded.err,
            bands,
        }
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.min.zip(self.max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileRow {
    pub row: usize,
    pub index: BTreeMap<usize, TileEntry>,
}

/// Index of the present tiles of a pyramid: zoom -> row -> col.
/// Tiles that are not part of the index are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileIndex {
    levels: BTreeMap<u32, BTreeMap<usize, TileRow>>,
}

impl TileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: TileKey, entry: TileEntry) {
        self.levels
            .entry(key.zoom)
            .or_default()
            .entry(key.row)
            .or_insert_with(|| TileRow {
                row: key.row,
                index: BTreeMap::new(),
            })
            .index
            .insert(key.col, entry);
    }

    pub fn get(&self, key: &TileKey) -> Option<&TileEntry> {
        self.levels.get(&key.zoom)?.get(&key.row)?.index.get(&key.col)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.levels.values().flat_map(|rows| rows.values()).map(|row| row.index.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zoom_levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels.keys().copied()
    }

    /// All entries ordered by zoom, row and column
    pub fn iter(&self) -> impl Iterator<Item = (TileKey, &TileEntry)> + '_ {
        self.levels.iter().flat_map(|(&zoom, rows)| {
            rows.iter()
                .flat_map(move |(&row, tile_row)| tile_row.index.iter().map(move |(&col, entry)| (TileKey::new(zoom, row, col), entry)))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(inf::Error::InvalidPath(path.to_path_buf()).into());
        }

        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
