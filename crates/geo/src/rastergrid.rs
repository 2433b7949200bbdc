use crate::{Cell, Error, GeoGrid, NodataPolicy, RasterSize, Result};

/// A georeferenced multi-band raster with row-major `f64` band buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    grid: GeoGrid,
    nodata: Option<f64>,
    bands: Vec<Vec<f64>>,
}

impl RasterGrid {
    pub fn new(grid: GeoGrid, bands: Vec<Vec<f64>>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::InvalidArgument("A raster needs at least one band".into()));
        }

        let cell_count = grid.size().cell_count();
        if let Some((index, band)) = bands.iter().enumerate().find(|(_, band)| band.len() != cell_count) {
            return Err(Error::InvalidArgument(format!(
                "Band {} contains {} values, expected {} for raster size {}",
                index + 1,
                band.len(),
                cell_count,
                grid.size()
            )));
        }

        Ok(RasterGrid { grid, nodata: None, bands })
    }

    pub fn single_band(grid: GeoGrid, data: Vec<f64>) -> Result<Self> {
        Self::new(grid, vec![data])
    }

    /// The nodata value as declared by the raster container
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn grid(&self) -> &GeoGrid {
        &self.grid
    }

    pub fn size(&self) -> RasterSize {
        self.grid.size()
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Policy that treats the declared nodata value and NaN as nodata
    pub fn nodata_policy(&self) -> NodataPolicy {
        NodataPolicy::with_sentinel_opt(self.nodata)
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Result<&[f64]> {
        self.bands
            .get(index)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::InvalidArgument(format!("Band index {index} out of range ({} bands)", self.bands.len())))
    }

    /// The values of all bands at the given cell
    pub fn pixel(&self, cell: Cell) -> impl Iterator<Item = f64> + '_ {
        let index = cell.index_in_raster(self.cols());
        self.bands.iter().map(move |band| band[index])
    }

    pub fn into_bands(self) -> Vec<Vec<f64>> {
        self.bands
    }
}

#[cfg(test)]
mod tests {
    use crate::GeoTransform;

    use super::*;

    fn grid_2x3() -> GeoGrid {
        GeoGrid::new("", RasterSize::with_rows_cols(2, 3), GeoTransform::new([0.0, 1.0, 0.0, 2.0, 0.0, -1.0]))
    }

    #[test]
    fn create_raster() -> Result<()> {
        #[rustfmt::skip]
        let raster = RasterGrid::new(grid_2x3(), vec![
            vec![
                1.0, 2.0, 3.0,
                4.0, 5.0, 6.0,
            ],
            vec![
                10.0, 20.0, 30.0,
                40.0, 50.0, 60.0,
            ],
        ])?
        .with_nodata(Some(-1.0));

        assert_eq!(raster.band_count(), 2);
        assert_eq!(raster.band(1)?[4], 50.0);
        assert!(raster.band(2).is_err());
        assert_eq!(raster.pixel(Cell::from_row_col(1, 2)).collect::<Vec<_>>(), vec![6.0, 60.0]);
        assert_eq!(raster.nodata_policy(), NodataPolicy::with_sentinel(-1.0));
        Ok(())
    }

    #[test]
    fn invalid_band_size() {
        assert!(RasterGrid::single_band(grid_2x3(), vec![1.0; 5]).is_err());
        assert!(RasterGrid::new(grid_2x3(), vec![]).is_err());
    }
}
