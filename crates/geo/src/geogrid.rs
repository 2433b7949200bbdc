use crate::{Cell, Error, GeoTransform, Point, RasterSize, Result, rect::WorldRect};

/// A rectangular block of pixels inside a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelWindow {
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PixelWindow {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        PixelWindow {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    pub fn size(&self) -> RasterSize {
        RasterSize::with_rows_cols(self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.size().is_empty()
    }
}

/// The georeferencing of a raster: its size, the affine pixel to world transform and the coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    size: RasterSize,
    transform: GeoTransform,
    inverse: Option<GeoTransform>,
    /// Opaque coordinate reference system identifier (e.g. "EPSG:31370"), empty when unknown
    crs: String,
}

impl GeoGrid {
    pub fn new(crs: impl Into<String>, size: RasterSize, transform: GeoTransform) -> Self {
        let inverse = transform.invert().ok();
        if inverse.is_none() {
            log::debug!("Singular geo transform: {transform:?}");
        }

        GeoGrid {
            size,
            transform,
            inverse,
            crs: crs.into(),
        }
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.size.rows
    }

    pub fn cols(&self) -> usize {
        self.size.cols
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.transform.is_axis_aligned()
    }

    pub fn pixel_area(&self) -> f64 {
        self.transform.pixel_area()
    }

    /// World coordinate of a (fractional) pixel position, (0, 0) is the outer corner of the first pixel
    pub fn pixel_to_world(&self, row: f64, col: f64) -> Point {
        self.transform.apply(col, row)
    }

    pub fn cell_center(&self, cell: Cell) -> Point {
        self.pixel_to_world(cell.row as f64 + 0.5, cell.col as f64 + 0.5)
    }

    /// Fractional (row, col) pixel position of a world coordinate
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let inverse = self.inverse.as_ref().ok_or(Error::SingularTransform)?;
        let p = inverse.apply(x, y);
        Ok((p.y(), p.x()))
    }

    /// The cell containing the world coordinate, `None` when it is located outside of the grid
    pub fn cell_at(&self, p: Point) -> Result<Option<Cell>> {
        let (row, col) = self.world_to_pixel(p.x(), p.y())?;
        let (row, col) = (row.floor(), col.floor());
        if row < 0.0 || col < 0.0 || row >= self.rows() as f64 || col >= self.cols() as f64 {
            return Ok(None);
        }

        Ok(Some(Cell::from_row_col(row as usize, col as usize)))
    }

    /// Bounding box of the grid in world coordinates
    pub fn footprint(&self) -> WorldRect {
        let (rows, cols) = (self.rows() as f64, self.cols() as f64);
        WorldRect::bounding_box([
            self.pixel_to_world(0.0, 0.0),
            self.pixel_to_world(0.0, cols),
            self.pixel_to_world(rows, cols),
            self.pixel_to_world(rows, 0.0),
        ])
        .unwrap_or_else(|| WorldRect::from_points(self.transform.origin(), self.transform.origin()))
    }

    /// World space intersection of the footprints, `None` when the grids are disjoint
    pub fn overlap(&self, other: &GeoGrid) -> Option<WorldRect> {
        if !self.crs.is_empty() && !other.crs.is_empty() && self.crs != other.crs {
            log::warn!("Comparing grids with different coordinate systems ({} <-> {})", self.crs, other.crs);
        }

        self.footprint().intersection(&other.footprint())
    }

    /// The grid of a block of pixels of this grid, sharing the same pixel lattice
    pub fn window(&self, window: &PixelWindow) -> Result<GeoGrid> {
        if window.row_offset + window.rows > self.rows() || window.col_offset + window.cols > self.cols() {
            return Err(Error::InvalidArgument(format!(
                "Pixel window {window:?} exceeds the grid size {}",
                self.size
            )));
        }

        let transform = self.transform.translated(window.col_offset as f64, window.row_offset as f64);
        Ok(GeoGrid::new(self.crs.clone(), window.size(), transform))
    }
}
