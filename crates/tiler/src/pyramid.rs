//! Bottom-up construction of a tile quadtree with per tile statistics.
//!
//! The leaves on the highest zoom level hold native raster pixels, every parent tile is the 2x2 downsampled mosaic of its children.
//! A tile is present when it covers at least one valid pixel, parents are present when any of their children is present.

use std::{ops::RangeInclusive, path::Path};

use geo::{NodataPolicy, PixelWindow, RasterGrid, RasterSize, StatAccumulator, algo};
use inf::progressinfo::AsyncProgressNotification;
use rayon::prelude::*;

use crate::{DirectoryTileStore, Error, Result, TileData, TileEntry, TileIndex, TileKey};

pub const DEFAULT_TILE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PyramidOptions {
    /// Edge length of a tile in pixels
    pub tile_size: usize,
    /// When no sentinel is configured the nodata value of the raster is used
    pub nodata: NodataPolicy,
    /// Lowest zoom level that is stored, defaults to the root level 0
    pub min_zoom: Option<u32>,
    /// Highest zoom level that is stored, defaults to the level of the native resolution leaves
    pub max_zoom: Option<u32>,
}

impl Default for PyramidOptions {
    fn default() -> Self {
        PyramidOptions {
            tile_size: DEFAULT_TILE_SIZE,
            nodata: NodataPolicy::default(),
            min_zoom: None,
            max_zoom: None,
        }
    }
}

/// The smallest zoom level on which a single tile covers `tile_size * 2^zoom` pixels, enough to cover the largest raster dimension
pub fn max_zoom_for(size: RasterSize, tile_size: usize) -> u32 {
    let mut zoom = 0;
    let mut span = tile_size.max(1);
    while span < size.max_dimension() {
        span *= 2;
        zoom += 1;
    }

    zoom
}

pub struct PyramidTile {
    /// Statistics of the native pixels covered by the tile, one accumulator per band
    pub stats: Vec<StatAccumulator>,
    pub data: TileData,
}

/// All tile slots of a zoom level in row major order, absent tiles are `None`
pub struct PyramidLevel {
    zoom: u32,
    rows: usize,
    cols: usize,
    span: usize,
    tiles: Vec<Option<PyramidTile>>,
}

impl PyramidLevel {
    fn empty(zoom: u32, max_zoom: u32, raster_size: RasterSize, tile_size: usize) -> Self {
        let span = tile_size << (max_zoom - zoom);
        PyramidLevel {
            zoom,
            rows: raster_size.rows.div_ceil(span),
            cols: raster_size.cols.div_ceil(span),
            span,
            tiles: Vec::new(),
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of native pixels covered by a tile edge
    pub fn span(&self) -> usize {
        self.span
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<&PyramidTile> {
        if row >= self.rows || col >= self.cols {
            return None;
        }

        self.tiles.get(row * self.cols + col)?.as_ref()
    }

    pub fn present_tiles(&self) -> impl Iterator<Item = (TileKey, &PyramidTile)> + '_ {
        self.tiles.iter().enumerate().filter_map(|(slot, tile)| {
            tile.as_ref()
                .map(|tile| (TileKey::new(self.zoom, slot / self.cols, slot % self.cols), tile))
        })
    }

    pub fn present_tile_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_some()).count()
    }
}

/// In memory tile pyramid, the levels of the stored zoom range ordered by zoom
pub struct TilePyramid {
    tile_size: usize,
    band_count: usize,
    levels: Vec<PyramidLevel>,
}

impl TilePyramid {
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn min_zoom(&self) -> u32 {
        self.levels.first().map_or(0, PyramidLevel::zoom)
    }

    pub fn max_zoom(&self) -> u32 {
        self.levels.last().map_or(0, PyramidLevel::zoom)
    }

    pub fn level(&self, zoom: u32) -> Option<&PyramidLevel> {
        self.levels.get(zoom.checked_sub(self.min_zoom())? as usize)
    }

    pub fn tile(&self, key: &TileKey) -> Option<&PyramidTile> {
        self.level(key.zoom)?.tile(key.row, key.col)
    }

    pub fn present_tile_count(&self) -> usize {
        self.levels.iter().map(PyramidLevel::present_tile_count).sum()
    }

    /// Persists the pyramid in the store.
    ///
    /// A stale index is removed first, then the tiles are written level by level.
    /// The index is only written after all tiles were stored successfully.
    pub fn write<P: AsyncProgressNotification>(&self, store: &DirectoryTileStore, progress: &P) -> Result<TileIndex> {
        let mut writer = LevelWriter::new(store, progress, self.levels.len())?;
        for level in self.levels.iter().rev() {
            writer.write_level(level)?;
        }

        writer.finish()
    }
}

/// Writes the tiles of complete levels to the store and collects their index entries
struct LevelWriter<'a, P: AsyncProgressNotification> {
    store: &'a DirectoryTileStore,
    progress: &'a P,
    index: TileIndex,
}

impl<'a, P: AsyncProgressNotification> LevelWriter<'a, P> {
    fn new(store: &'a DirectoryTileStore, progress: &'a P, level_count: usize) -> Result<Self> {
        store.remove_index()?;
        progress.reset(level_count as u64);

        Ok(LevelWriter {
            store,
            progress,
            index: TileIndex::new(),
        })
    }

    fn write_level(&mut self, level: &PyramidLevel) -> Result<()> {
        let store = self.store;
        let tiles: Vec<(TileKey, &PyramidTile)> = level.present_tiles().collect();
        let entries = tiles
            .into_par_iter()
            .map(|(key, tile)| {
                let encoded = tile.data.encode();
                store.write_tile(&key, &encoded.bytes)?;
                Ok((key, TileEntry::new(&encoded, tile.stats.clone())))
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Zoom level {}: {} tiles written", level.zoom, entries.len());
        for (key, entry) in entries {
            self.index.insert(key, entry);
        }

        Ok(self.progress.tick()?)
    }

    fn finish(self) -> Result<TileIndex> {
        self.store.write_index(&self.index)?;
        self.progress.done()?;
        log::info!("Tile pyramid written to {} ({} tiles)", self.store.root().display(), self.index.len());
        Ok(self.index)
    }
}

pub struct TilePyramidBuilder {
    options: PyramidOptions,
}

impl TilePyramidBuilder {
    pub fn new(options: PyramidOptions) -> Result<Self> {
        if options.tile_size == 0 || options.tile_size % 2 != 0 {
            return Err(Error::InvalidArgument(format!(
                "Tile size must be a positive even number ({})",
                options.tile_size
            )));
        }

        if let (Some(min_zoom), Some(max_zoom)) = (options.min_zoom, options.max_zoom) {
            if min_zoom > max_zoom {
                return Err(Error::InvalidArgument(format!(
                    "Minimum zoom level {min_zoom} exceeds the maximum zoom level {max_zoom}"
                )));
            }
        }

        Ok(TilePyramidBuilder { options })
    }

    pub fn options(&self) -> &PyramidOptions {
        &self.options
    }

    fn nodata_policy(&self, raster: &RasterGrid) -> NodataPolicy {
        let mut policy = self.options.nodata;
        if policy.sentinel.is_none() {
            policy.sentinel = raster.nodata();
        }

        policy
    }

    /// The stored zoom levels, limited to the levels that exist for the raster
    pub fn zoom_range(&self, raster_size: RasterSize) -> RangeInclusive<u32> {
        let leaf_zoom = max_zoom_for(raster_size, self.options.tile_size);
        let clamp = |zoom: u32, name: &str| {
            if zoom > leaf_zoom {
                log::warn!("Requested {name} zoom level {zoom} exceeds the leaf zoom level {leaf_zoom}");
            }
            zoom.min(leaf_zoom)
        };

        let max_zoom = self.options.max_zoom.map_or(leaf_zoom, |zoom| clamp(zoom, "maximum"));
        let min_zoom = self.options.min_zoom.map_or(0, |zoom| clamp(zoom, "minimum"));
        min_zoom..=max_zoom
    }

    /// Computes the levels of the pyramid in the configured zoom range, fails with `EmptyRaster` when the raster contains no valid pixel
    pub fn compute(&self, raster: &RasterGrid) -> Result<TilePyramid> {
        let zoom_range = self.zoom_range(raster.size());
        let leaves = self.leaves(raster, &zoom_range)?;

        let mut levels = Vec::new();
        self.for_each_level(raster, leaves, &zoom_range, |level| {
            levels.push(level);
            Ok(())
        })?;

        levels.reverse();
        Ok(TilePyramid {
            tile_size: self.options.tile_size,
            band_count: raster.band_count(),
            levels,
        })
    }

    /// Computes the pyramid and persists it in `output_dir`.
    ///
    /// Every level is written as soon as its parent level is computed, so only two levels are kept in memory.
    /// Nothing is written when the raster contains no valid pixel, the index is written after the last level.
    pub fn build<P: AsyncProgressNotification>(&self, raster: &RasterGrid, output_dir: &Path, progress: &P) -> Result<TileIndex> {
        let zoom_range = self.zoom_range(raster.size());
        let leaves = self.leaves(raster, &zoom_range)?;

        let store = DirectoryTileStore::new(output_dir);
        let mut writer = LevelWriter::new(&store, progress, zoom_range.clone().count())?;
        self.for_each_level(raster, leaves, &zoom_range, |level| writer.write_level(&level))?;
        writer.finish()
    }

    fn leaves(&self, raster: &RasterGrid, zoom_range: &RangeInclusive<u32>) -> Result<PyramidLevel> {
        let tile_size = self.options.tile_size;
        let leaf_zoom = max_zoom_for(raster.size(), tile_size);

        log::info!(
            "Building tile pyramid for raster {} with tile size {tile_size}: zoom levels {}-{} (leaves at {leaf_zoom})",
            raster.size(),
            zoom_range.start(),
            zoom_range.end(),
        );

        let leaves = self.leaf_level(raster, &self.nodata_policy(raster), leaf_zoom);
        if leaves.present_tile_count() == 0 {
            return Err(Error::GeoError(geo::Error::EmptyRaster));
        }

        log::debug!("Zoom level {leaf_zoom}: {} of {} leaves present", leaves.present_tile_count(), leaves.tiles.len());
        Ok(leaves)
    }

    /// Derives the parent levels from the leaves up to the minimum zoom level.
    /// The levels in the zoom range are passed to `sink` from the leaves upwards, a level is handed over once its parent is computed.
    fn for_each_level(
        &self,
        raster: &RasterGrid,
        leaves: PyramidLevel,
        zoom_range: &RangeInclusive<u32>,
        mut sink: impl FnMut(PyramidLevel) -> Result<()>,
    ) -> Result<()> {
        let leaf_zoom = leaves.zoom;

        let mut current = leaves;
        for zoom in (*zoom_range.start()..leaf_zoom).rev() {
            let parent = self.parent_level(&current, raster, leaf_zoom, zoom);
            log::debug!("Zoom level {zoom}: {} tiles present", parent.present_tile_count());

            let child = std::mem::replace(&mut current, parent);
            if zoom_range.contains(&child.zoom) {
                sink(child)?;
            }
        }

        sink(current)
    }

    fn leaf_level(&self, raster: &RasterGrid, policy: &NodataPolicy, max_zoom: u32) -> PyramidLevel {
        let tile_size = self.options.tile_size;
        let mut level = PyramidLevel::empty(max_zoom, max_zoom, raster.size(), tile_size);
        let cols = level.cols;

        level.tiles = (0..level.rows * level.cols)
            .into_par_iter()
            .map(|slot| {
                let (row_offset, col_offset) = ((slot / cols) * tile_size, (slot % cols) * tile_size);
                let window = PixelWindow::new(
                    row_offset,
                    col_offset,
                    tile_size.min(raster.rows() - row_offset),
                    tile_size.min(raster.cols() - col_offset),
                );

                let stats = algo::scan_window(raster, policy, &window);
                if stats.iter().all(StatAccumulator::is_empty) {
                    return None;
                }

                Some(PyramidTile {
                    stats,
                    data: TileData::from_raster_window(raster, policy, &window, tile_size),
                })
            })
            .collect();

        level
    }

    fn parent_level(&self, children: &PyramidLevel, raster: &RasterGrid, max_zoom: u32, zoom: u32) -> PyramidLevel {
        let tile_size = self.options.tile_size;
        let band_count = raster.band_count();
        let mut level = PyramidLevel::empty(zoom, max_zoom, raster.size(), tile_size);
        let cols = level.cols;

        level.tiles = (0..level.rows * level.cols)
            .into_par_iter()
            .map(|slot| {
                let key = TileKey::new(zoom, slot / cols, slot % cols);
                let child_tiles = key.children().map(|child| children.tile(child.row, child.col));
                if child_tiles.iter().all(Option::is_none) {
                    return None;
                }

                let mut stats = vec![StatAccumulator::new(); band_count];
                for child in child_tiles.iter().flatten() {
                    for (acc, child_acc) in stats.iter_mut().zip(&child.stats) {
                        acc.merge_from(child_acc);
                    }
                }

                Some(PyramidTile {
                    stats,
                    data: TileData::downsample(child_tiles.map(|child| child.map(|tile| &tile.data)), tile_size, band_count),
                })
            })
            .collect();

        level
    }
}

#[cfg(test)]
mod tests {
    use geo::{GeoGrid, GeoTransform};
    use inf::progressinfo::DummyProgress;

    use super::*;

    fn raster(rows: usize, cols: usize, data: Vec<f64>) -> RasterGrid {
        let grid = GeoGrid::new(
            "EPSG:31370",
            RasterSize::with_rows_cols(rows, cols),
            GeoTransform::new([0.0, 1.0, 0.0, rows as f64, 0.0, -1.0]),
        );
        RasterGrid::single_band(grid, data).expect("valid raster")
    }

    #[test]
    fn max_zoom() {
        assert_eq!(max_zoom_for(RasterSize::with_rows_cols(0, 0), 256), 0);
        assert_eq!(max_zoom_for(RasterSize::with_rows_cols(100, 256), 256), 0);
        assert_eq!(max_zoom_for(RasterSize::with_rows_cols(100, 257), 256), 1);
        assert_eq!(max_zoom_for(RasterSize::with_rows_cols(1024, 10), 256), 2);
        assert_eq!(max_zoom_for(RasterSize::with_rows_cols(1025, 10), 256), 3);
    }

    #[test]
    fn invalid_tile_size() {
        for tile_size in [0, 3, 255] {
            let options = PyramidOptions {
                tile_size,
                ..Default::default()
            };
            assert!(matches!(TilePyramidBuilder::new(options), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn level_layout() -> Result<()> {
        // 5 x 9 raster with 2 x 2 tiles: zoom 3 has 3 x 5 leaves
        let builder = TilePyramidBuilder::new(PyramidOptions {
            tile_size: 2,
            ..Default::default()
        })?;
        let pyramid = builder.compute(&raster(5, 9, (0..45).map(f64::from).collect()))?;

        assert_eq!(pyramid.max_zoom(), 3);
        let dims: Vec<(usize, usize, usize)> = (0..=3)
            .filter_map(|zoom| pyramid.level(zoom))
            .map(|level| (level.rows(), level.cols(), level.span()))
            .collect();
        assert_eq!(dims, vec![(1, 1, 16), (1, 2, 8), (2, 3, 4), (3, 5, 2)]);
        assert_eq!(pyramid.present_tile_count(), 1 + 2 + 6 + 15);
        Ok(())
    }

    #[test]
    fn written_pyramid_matches_streamed_build() -> Result<()> {
        let builder = TilePyramidBuilder::new(PyramidOptions {
            tile_size: 2,
            max_zoom: Some(2),
            ..Default::default()
        })?;
        let raster = raster(5, 9, (0..45).map(f64::from).collect());

        let computed_dir = tempfile::tempdir()?;
        let computed = builder.compute(&raster)?.write(&DirectoryTileStore::new(computed_dir.path()), &DummyProgress)?;

        let streamed_dir = tempfile::tempdir()?;
        let streamed = builder.build(&raster, streamed_dir.path(), &DummyProgress)?;
        assert_eq!(computed, streamed);
        assert_eq!(streamed.zoom_levels().collect::<Vec<_>>(), vec![0, 1, 2]);
        Ok(())
    }

    #[test]
    fn zoom_range_limits_the_levels() -> Result<()> {
        let builder = TilePyramidBuilder::new(PyramidOptions {
            tile_size: 2,
            min_zoom: Some(1),
            max_zoom: Some(2),
            ..Default::default()
        })?;
        let pyramid = builder.compute(&raster(5, 9, (0..45).map(f64::from).collect()))?;

        assert_eq!((pyramid.min_zoom(), pyramid.max_zoom()), (1, 2));
        assert!(pyramid.level(0).is_none());
        assert!(pyramid.level(3).is_none());
        assert_eq!(pyramid.level(2).map(PyramidLevel::span), Some(4));

        // The statistics still cover the native pixels
        let level = pyramid.level(1).expect("zoom level 1");
        assert_eq!(level.present_tiles().map(|(_, tile)| tile.stats[0].count()).sum::<u64>(), 45);

        let clamped = TilePyramidBuilder::new(PyramidOptions {
            tile_size: 2,
            min_zoom: Some(7),
            ..Default::default()
        })?;
        assert_eq!(clamped.zoom_range(RasterSize::with_rows_cols(5, 9)), 3..=3);

        let inverted = PyramidOptions {
            min_zoom: Some(3),
            max_zoom: Some(2),
            ..Default::default()
        };
        assert!(matches!(TilePyramidBuilder::new(inverted), Err(Error::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn parent_statistics_and_pixels() -> Result<()> {
        #[rustfmt::skip]
        let data = vec![
            1.0, 2.0, 3.0, 4.0,
            5.0, 6.0, 7.0, 8.0,
            9.0, -1.0, -1.0, -1.0,
            13.0, -1.0, -1.0, -1.0,
        ];

        let builder = TilePyramidBuilder::new(PyramidOptions {
            tile_size: 2,
            nodata: NodataPolicy::with_sentinel(-1.0),
            ..Default::default()
        })?;
        let pyramid = builder.compute(&raster(4, 4, data))?;

        assert_eq!(pyramid.max_zoom(), 1);
        assert!(pyramid.tile(&TileKey::new(1, 1, 1)).is_none());
        assert!(pyramid.tile(&TileKey::new(1, 1, 0)).is_some());

        let root = pyramid.tile(&TileKey::new(0, 0, 0)).expect("root present");
        assert_eq!(root.stats[0].count(), 10);
        assert_eq!(root.stats[0].sum(), 58.0);
        assert_eq!(root.stats[0].min(), Some(1.0));
        assert_eq!(root.stats[0].max(), Some(13.0));

        let pixels = &root.data.bands()[0];
        assert_eq!(pixels[0], 3.5);
        assert_eq!(pixels[1], 5.5);
        assert_eq!(pixels[2], 11.0);
        assert!(pixels[3].is_nan());
        Ok(())
    }

    #[test]
    fn empty_raster() -> Result<()> {
        let builder = TilePyramidBuilder::new(PyramidOptions::default())?;
        let all_nan = raster(3, 3, vec![f64::NAN; 9]);
        assert!(matches!(builder.compute(&all_nan), Err(Error::GeoError(geo::Error::EmptyRaster))));

        let zeros = raster(3, 3, vec![0.0; 9]);
        let zero_is_nodata = TilePyramidBuilder::new(PyramidOptions {
            nodata: NodataPolicy::default().zero_is_nodata(true),
            ..Default::default()
        })?;
        assert!(matches!(zero_is_nodata.compute(&zeros), Err(Error::GeoError(geo::Error::EmptyRaster))));
        assert!(builder.compute(&zeros).is_ok());
        Ok(())
    }

    #[test]
    fn raster_nodata_is_used_without_configured_sentinel() -> Result<()> {
        let builder = TilePyramidBuilder::new(PyramidOptions::default())?;
        let raster = raster(2, 2, vec![255.0, 1.0, 255.0, 255.0]).with_nodata(Some(255.0));

        let pyramid = builder.compute(&raster)?;
        let root = pyramid.tile(&TileKey::new(0, 0, 0)).expect("root present");
        assert_eq!(root.stats[0].count(), 1);
        Ok(())
    }
}
