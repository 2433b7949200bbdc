use std::{
    fs::File,
    io::{BufWriter, Seek, Write},
    path::Path,
};

use tiff::{
    encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue},
    tags::Tag,
};

use crate::{ArrayDataType, Error, GeoTransform, RasterGrid, Result, geotiff::projectioninfo::ProjectionInfo};

const SAMPLE_FORMAT_UINT: u16 = 1;
const SAMPLE_FORMAT_INT: u16 = 2;
const SAMPLE_FORMAT_IEEEFP: u16 = 3;

/// Write the raster as a single image GeoTIFF file, the bands are stored as pixel interleaved samples.
///
/// Values are converted to the requested data type, integer conversions saturate and map NaN to 0.
pub fn write_raster(path: impl AsRef<Path>, raster: &RasterGrid, data_type: ArrayDataType) -> Result<()> {
    let path = path.as_ref();
    inf::fs::create_directory_for_file(path)?;

    log::debug!("Writing {} raster {} ({} band(s))", data_type, path.display(), raster.band_count());
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    match data_type {
        ArrayDataType::Uint8 => write_image(&mut encoder, raster, SAMPLE_FORMAT_UINT, &interleave(raster, |v| v as u8)),
        ArrayDataType::Uint16 => write_image(&mut encoder, raster, SAMPLE_FORMAT_UINT, &interleave(raster, |v| v as u16)),
        ArrayDataType::Int32 => write_image(&mut encoder, raster, SAMPLE_FORMAT_INT, &interleave(raster, |v| v as i32)),
        ArrayDataType::Float32 => write_image(&mut encoder, raster, SAMPLE_FORMAT_IEEEFP, &interleave(raster, |v| v as f32)),
        ArrayDataType::Float64 => write_image(&mut encoder, raster, SAMPLE_FORMAT_IEEEFP, &interleave(raster, |v| v)),
    }
}

/// Pixel interleaved samples: all band values of the first pixel, then all band values of the second pixel, ...
fn interleave<T>(raster: &RasterGrid, convert: impl Fn(f64) -> T) -> Vec<T> {
    let bands = raster.bands();
    let mut samples = Vec::with_capacity(raster.size().cell_count() * bands.len());
    for index in 0..raster.size().cell_count() {
        samples.extend(bands.iter().map(|band| convert(band[index])));
    }

    samples
}

fn write_image<W: Write + Seek, K: TiffKind, T>(encoder: &mut TiffEncoder<W, K>, raster: &RasterGrid, sample_format: u16, samples: &[T]) -> Result<()>
where
    [T]: TiffValue,
{
    let band_count = raster.band_count();
    let samples_per_pixel = u16::try_from(band_count).map_err(|_| Error::InvalidArgument(format!("Too many bands to write: {band_count}")))?;
    let bits_per_sample = (std::mem::size_of::<T>() * 8) as u16;

    let mut dir = encoder.image_directory()?;
    dir.write_tag(Tag::ImageWidth, raster.cols() as u32)?;
    dir.write_tag(Tag::ImageLength, raster.rows() as u32)?;
    dir.write_tag(Tag::BitsPerSample, &vec![bits_per_sample; band_count][..])?;
    dir.write_tag(Tag::SampleFormat, &vec![sample_format; band_count][..])?;
    dir.write_tag(Tag::SamplesPerPixel, samples_per_pixel)?;
    // BlackIsZero, no compression, chunky planar configuration
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::Compression, 1u16)?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    if band_count > 1 {
        // Unspecified extra samples
        dir.write_tag(Tag::ExtraSamples, &vec![0u16; band_count - 1][..])?;
    }

    let offset = dir.write_data(samples)?;
    let byte_count = std::mem::size_of_val(samples);
    let too_large = |_| Error::Runtime(String::from("Raster does not fit in a classic TIFF file"));
    dir.write_tag(Tag::RowsPerStrip, raster.rows() as u32)?;
    dir.write_tag(Tag::StripOffsets, u32::try_from(offset).map_err(too_large)?)?;
    dir.write_tag(Tag::StripByteCounts, u32::try_from(byte_count).map_err(too_large)?)?;

    write_spatial_reference_tags(&mut dir, raster)?;
    dir.finish()?;
    Ok(())
}

fn write_spatial_reference_tags<W: Write + Seek, K: TiffKind>(dir_encoder: &mut DirectoryEncoder<W, K>, raster: &RasterGrid) -> Result<()> {
    let transform = raster.grid().transform();
    let [x0, dx, rx, y0, ry, dy] = transform.coefficients();

    if is_north_up(transform) {
        dir_encoder.write_tag(Tag::ModelPixelScaleTag, &[dx, -dy, 0.0][..])?;
        dir_encoder.write_tag(Tag::ModelTiepointTag, &[0.0, 0.0, 0.0, x0, y0, 0.0][..])?;
    } else {
        #[rustfmt::skip]
        let model_transformation = [
            dx,  rx,  0.0, x0,
            ry,  dy,  0.0, y0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir_encoder.write_tag(Tag::ModelTransformationTag, &model_transformation[..])?;
    }

    if let Some(nodata) = raster.nodata() {
        let nodata_str = nodata.to_string();
        dir_encoder.write_tag(Tag::GdalNodata, nodata_str.as_str())?;
    }

    if let Some(projection) = ProjectionInfo::from_crs(raster.grid().crs()) {
        write_coordinate_system_tags(dir_encoder, &projection)?;
    }

    Ok(())
}

fn is_north_up(transform: &GeoTransform) -> bool {
    transform.is_axis_aligned() && transform.pixel_width() > 0.0 && transform.pixel_height() < 0.0
}

fn write_coordinate_system_tags<W: Write + Seek, K: TiffKind>(
    dir_encoder: &mut DirectoryEncoder<W, K>,
    projection: &ProjectionInfo,
) -> Result<()> {
    // Header: version, revision, minor revision, number of keys
    let mut geo_keys: Vec<u16> = vec![1, 1, 0, 0];

    // GTModelTypeGeoKey
    geo_keys.extend_from_slice(&[1024, 0, 1, projection.model_type.geokey_value()]);
    // GTRasterTypeGeoKey: pixel is area
    geo_keys.extend_from_slice(&[1025, 0, 1, 1]);

    if let Some(epsg) = projection.geographic_epsg {
        geo_keys.extend_from_slice(&[2048, 0, 1, epsg]);
    }

    if let Some(epsg) = projection.projected_epsg {
        geo_keys.extend_from_slice(&[3072, 0, 1, epsg]);
    }

    geo_keys[3] = ((geo_keys.len() - 4) / 4) as u16;
    dir_encoder.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;
    Ok(())
}
