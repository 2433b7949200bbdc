use geo::{NodataPolicy, PixelWindow, RasterGrid};
use itertools::{Itertools, MinMaxResult};

use crate::{Error, Result};

/// Number of quantization levels used for the stored tile values
pub const QUANTIZATION_BINS: u32 = 65535;
pub const NODATA_CODE: u16 = 0;

/// Square block of pixels for every band, NaN marks nodata and pixels outside of the raster
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    tile_size: usize,
    bands: Vec<Vec<f64>>,
}

/// The stored representation of a tile together with the parameters needed to decode it
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTile {
    pub bytes: Vec<u8>,
    /// Value range of the quantization, absent when the tile contains no valid pixels
    pub range: Option<(f64, f64)>,
    pub bins: u32,
    /// Largest absolute difference between a decoded and an original value
    pub err: f64,
}

impl TileData {
    pub fn new(tile_size: usize, bands: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(band) = bands.iter().find(|band| band.len() != tile_size * tile_size) {
            return Err(Error::InvalidTileData(format!(
                "Tile band contains {} values, expected {}",
                band.len(),
                tile_size * tile_size
            )));
        }

        Ok(TileData { tile_size, bands })
    }

    pub fn empty(tile_size: usize, band_count: usize) -> Self {
        TileData {
            tile_size,
            bands: vec![vec![f64::NAN; tile_size * tile_size]; band_count],
        }
    }

    /// Native raster pixels of the window, nodata pixels are replaced by NaN.
    /// The window is anchored at the top left corner of the tile, the part of the tile outside of the window stays NaN.
    pub fn from_raster_window(raster: &RasterGrid, nodata: &NodataPolicy, window: &PixelWindow, tile_size: usize) -> Self {
        let mut tile = TileData::empty(tile_size, raster.band_count());
        let rows = window.rows.min(tile_size);
        let cols = window.cols.min(tile_size);

        for row in 0..rows {
            for col in 0..cols {
                let index = (window.row_offset + row) * raster.cols() + window.col_offset + col;
                if nodata.is_nodata_pixel(raster.bands().iter().map(|band| band[index])) {
                    continue;
                }

                for (tile_band, band) in tile.bands.iter_mut().zip(raster.bands()) {
                    let value = band[index];
                    if !nodata.is_nodata(value) {
                        tile_band[row * tile_size + col] = value;
                    }
                }
            }
        }

        tile
    }

    /// Builds the parent tile from its four children in quadtree order (top left, top right, bottom left, bottom right).
    /// Every parent pixel is the mean of the non NaN values of the corresponding 2x2 block in the mosaic of the children.
    pub fn downsample(children: [Option<&TileData>; 4], tile_size: usize, band_count: usize) -> TileData {
        let mut parent = TileData::empty(tile_size, band_count);

        for (band_index, parent_band) in parent.bands.iter_mut().enumerate() {
            for row in 0..tile_size {
                for col in 0..tile_size {
                    let mut sum = 0.0;
                    let mut count = 0;

                    for (mosaic_row, mosaic_col) in itertools::iproduct!(2 * row..2 * row + 2, 2 * col..2 * col + 2) {
                        let child = (mosaic_row / tile_size) * 2 + mosaic_col / tile_size;
                        if let Some(child) = children[child] {
                            let value = child.bands[band_index][(mosaic_row % tile_size) * tile_size + mosaic_col % tile_size];
                            if !value.is_nan() {
                                sum += value;
                                count += 1;
                            }
                        }
                    }

                    if count > 0 {
                        parent_band[row * tile_size + col] = sum / count as f64;
                    }
                }
            }
        }

        parent
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Vec<f64>] {
        &self.bands
    }

    pub fn valid_pixel_count(&self) -> usize {
        self.bands.iter().flatten().filter(|v| !v.is_nan()).count()
    }

    /// Minimum and maximum over all bands, ignoring NaN
    pub fn value_range(&self) -> Option<(f64, f64)> {
        match self
            .bands
            .iter()
            .flatten()
            .copied()
            .filter(|v| !v.is_nan())
            .minmax_by(f64::total_cmp)
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(v) => Some((v, v)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    /// Quantizes the values over the value range of the tile into big endian u16 codes, band after band.
    /// Code 0 is nodata, a value maps to `1 + round((v - min) / (max - min) * (bins - 1))`.
    pub fn encode(&self) -> EncodedTile {
        let range = self.value_range();
        let mut bytes = Vec::with_capacity(self.bands.len() * self.tile_size * self.tile_size * 2);
        let mut err: f64 = 0.0;

        for value in self.bands.iter().flatten().copied() {
            let code = match range {
                Some((min, max)) if !value.is_nan() => {
                    let code = quantize(value, min, max);
                    err = err.max((dequantize(code, min, max) - value).abs());
                    code
                }
                _ => NODATA_CODE,
            };

            bytes.extend_from_slice(&code.to_be_bytes());
        }

        EncodedTile {
            bytes,
            range,
            bins: QUANTIZATION_BINS,
            err,
        }
    }

    pub fn decode(bytes: &[u8], tile_size: usize, band_count: usize, range: Option<(f64, f64)>) -> Result<TileData> {
        let expected_size = band_count * tile_size * tile_size * 2;
        if bytes.len() != expected_size {
            return Err(Error::InvalidTileData(format!(
                "Tile contains {} bytes, expected {expected_size}",
                bytes.len()
            )));
        }

        let values = bytes
            .chunks_exact(2)
            .map(|code| match (u16::from_be_bytes([code[0], code[1]]), range) {
                (NODATA_CODE, _) => Ok(f64::NAN),
                (code, Some((min, max))) => Ok(dequantize(code, min, max)),
                (_, None) => Err(Error::InvalidTileData("Valid tile value without a quantization range".into())),
            })
            .collect::<Result<Vec<f64>>>()?;

        let bands = if tile_size == 0 {
            vec![Vec::new(); band_count]
        } else {
            values.chunks(tile_size * tile_size).map(<[f64]>::to_vec).collect()
        };

        TileData::new(tile_size, bands)
    }
}

fn quantize(value: f64, min: f64, max: f64) -> u16 {
    let bins = QUANTIZATION_BINS as f64;
    let step = if max > min {
        ((value - min) / (max - min) * (bins - 1.0)).round().clamp(0.0, bins - 1.0)
    } else {
        0.0
    };

    step as u16 + 1
}

fn dequantize(code: u16, min: f64, max: f64) -> f64 {
    let bins = QUANTIZATION_BINS as f64;
    min + f64::from(code - 1) / (bins - 1.0) * (max - min)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use geo::{GeoGrid, GeoTransform, RasterSize};

    use super::*;

    const NAN: f64 = f64::NAN;

    fn assert_tile_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "pixel {index}: expected NaN, got {a}");
            } else {
                assert_eq!(a, e, "pixel {index}");
            }
        }
    }

    #[test]
    fn tile_from_raster_window() -> Result<()> {
        let grid = GeoGrid::new("", RasterSize::with_rows_cols(3, 3), GeoTransform::new([0.0, 1.0, 0.0, 3.0, 0.0, -1.0]));
        #[rustfmt::skip]
        let raster = RasterGrid::new(grid, vec![
            vec![
                1.0, 2.0, 3.0,
                4.0, -1.0, 0.0,
                7.0, 8.0, 9.0,
            ],
            vec![
                1.0, 1.0, 1.0,
                1.0, 1.0, 0.0,
                1.0, 1.0, 1.0,
            ],
        ])?
        .with_nodata(Some(-1.0));

        let policy = raster.nodata_policy().zero_is_nodata(true);
        let tile = TileData::from_raster_window(&raster, &policy, &PixelWindow::new(1, 1, 2, 2), 4);

        #[rustfmt::skip]
        assert_tile_eq(&tile.bands()[0], &[
            NAN, NAN, NAN, NAN,
            8.0, 9.0, NAN, NAN,
            NAN, NAN, NAN, NAN,
            NAN, NAN, NAN, NAN,
        ]);

        #[rustfmt::skip]
        assert_tile_eq(&tile.bands()[1], &[
            1.0, NAN, NAN, NAN,
            1.0, 1.0, NAN, NAN,
            NAN, NAN, NAN, NAN,
            NAN, NAN, NAN, NAN,
        ]);

        Ok(())
    }

    #[test]
    fn downsample_ignores_nan() -> Result<()> {
        #[rustfmt::skip]
        let top_left = TileData::new(2, vec![vec![
            1.0, 3.0,
            NAN, 2.0,
        ]])?;
        #[rustfmt::skip]
        let bottom_right = TileData::new(2, vec![vec![
            NAN, NAN,
            NAN, NAN,
        ]])?;

        let parent = TileData::downsample([Some(&top_left), None, None, Some(&bottom_right)], 2, 1);

        #[rustfmt::skip]
        assert_tile_eq(&parent.bands()[0], &[
            2.0, NAN,
            NAN, NAN,
        ]);
        Ok(())
    }

    #[test]
    fn downsample_mosaic_layout() -> Result<()> {
        let children: Vec<TileData> = (0..4)
            .map(|child| TileData::new(2, vec![vec![child as f64; 4]]))
            .collect::<Result<_>>()?;

        let parent = TileData::downsample([Some(&children[0]), Some(&children[1]), Some(&children[2]), Some(&children[3])], 2, 1);
        assert_tile_eq(&parent.bands()[0], &[0.0, 1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn quantized_codec() -> Result<()> {
        #[rustfmt::skip]
        let tile = TileData::new(2, vec![
            vec![
                -10.0, 0.0,
                NAN,   3.3,
            ],
            vec![
                90.0, NAN,
                12.5, 1.0,
            ],
        ])?;

        let encoded = tile.encode();
        assert_eq!(encoded.bytes.len(), 16);
        assert_eq!(encoded.range, Some((-10.0, 90.0)));
        assert_eq!(encoded.bins, 65535);
        assert_eq!(&encoded.bytes[0..2], &1u16.to_be_bytes());
        assert_eq!(&encoded.bytes[4..6], &0u16.to_be_bytes());
        assert_eq!(&encoded.bytes[8..10], &65535u16.to_be_bytes());

        let max_step_error = 100.0 / 65534.0 / 2.0;
        assert!(encoded.err <= max_step_error + 1e-12);

        let decoded = TileData::decode(&encoded.bytes, 2, 2, encoded.range)?;
        for (decoded_band, band) in decoded.bands().iter().zip(tile.bands()) {
            for (d, v) in decoded_band.iter().zip(band) {
                if v.is_nan() {
                    assert!(d.is_nan());
                } else {
                    assert_abs_diff_eq!(d, v, epsilon = encoded.err + 1e-12);
                }
            }
        }

        Ok(())
    }

    #[test]
    fn constant_and_empty_tiles() -> Result<()> {
        let constant = TileData::new(2, vec![vec![5.0, 5.0, NAN, 5.0]])?;
        let encoded = constant.encode();
        assert_eq!(encoded.range, Some((5.0, 5.0)));
        assert_eq!(encoded.err, 0.0);
        assert_tile_eq(&TileData::decode(&encoded.bytes, 2, 1, encoded.range)?.bands()[0], &[5.0, 5.0, NAN, 5.0]);

        let empty = TileData::empty(2, 1);
        let encoded = empty.encode();
        assert_eq!(encoded.range, None);
        assert!(encoded.bytes.iter().all(|&b| b == 0));
        assert_eq!(TileData::decode(&encoded.bytes, 2, 1, None)?.valid_pixel_count(), 0);
        Ok(())
    }

    #[test]
    fn decode_invalid_data() {
        assert!(matches!(TileData::decode(&[0, 1, 0], 1, 1, None), Err(Error::InvalidTileData(_))));
        assert!(matches!(TileData::decode(&[0, 1], 1, 1, None), Err(Error::InvalidTileData(_))));
    }
}
