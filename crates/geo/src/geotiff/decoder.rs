use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
};

use crate::{
    Error, GeoGrid, GeoTransform, RasterGrid, RasterSize, Result,
    geotiff::projectioninfo::{ModelType, ProjectionInfo},
};

/// Read all bands of a GeoTIFF file.
///
/// Interleaved samples of a page become separate bands, additional full resolution pages are appended as extra bands.
/// Reduced resolution pages (overviews) are skipped.
pub fn read_raster(path: impl AsRef<Path>) -> Result<RasterGrid> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::InfError(inf::Error::InvalidPath(path.to_path_buf())));
    }

    log::debug!("Reading raster {}", path.display());
    read_raster_from(BufReader::new(File::open(path)?))
}

pub fn read_raster_from<R: Read + Seek>(stream: R) -> Result<RasterGrid> {
    let mut decoder = Decoder::new(stream)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let size = RasterSize::with_rows_cols(height as usize, width as usize);
    let transform = read_geo_transform(&mut decoder)?;
    let nodata = read_nodata_value(&mut decoder);
    let crs = read_projection_info(&mut decoder)?.map(|info| info.crs()).unwrap_or_default();

    let mut bands = Vec::new();
    loop {
        if decoder.dimensions()? == (width, height) && !is_reduced_resolution(&mut decoder) {
            let samples_per_pixel = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
            let values = decoded_values(decoder.read_image()?)?;
            bands.extend(deinterleave(values, samples_per_pixel));
        } else {
            log::debug!("Skipping reduced resolution image");
        }

        if !decoder.more_images() {
            break;
        }

        decoder.next_image()?;
    }

    log::debug!("Raster {size} with {} band(s), crs '{crs}', nodata {nodata:?}", bands.len());
    Ok(RasterGrid::new(GeoGrid::new(crs, size, transform), bands)?.with_nodata(nodata))
}

fn is_reduced_resolution<R: Read + Seek>(decoder: &mut Decoder<R>) -> bool {
    decoder
        .get_tag_u32(Tag::NewSubfileType)
        .map(|subfile_type| subfile_type & 1 == 1)
        .unwrap_or(false)
}

fn decoded_values(result: DecodingResult) -> Result<Vec<f64>> {
    Ok(match result {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
        #[allow(unreachable_patterns)]
        _ => return Err(Error::Runtime("Unsupported TIFF sample format".into())),
    })
}

fn deinterleave(values: Vec<f64>, samples_per_pixel: usize) -> Vec<Vec<f64>> {
    if samples_per_pixel <= 1 {
        return vec![values];
    }

    (0..samples_per_pixel)
        .map(|sample| values.iter().skip(sample).step_by(samples_per_pixel).copied().collect())
        .collect()
}

fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Ok(values) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if values.len() < 8 {
            return Err(Error::Runtime("ModelTransformation must have 16 values".into()));
        }

        return Ok(GeoTransform::new([values[3], values[0], values[1], values[7], values[4], values[5]]));
    }

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Runtime("Failed to obtain pixel transformation from tiff: no ModelPixelScale tag".into()))?;
    let tie_points = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Runtime("Failed to obtain pixel transformation from tiff: no ModelTiepoint tag".into()))?;

    if pixel_scale.len() < 2 {
        return Err(Error::Runtime("ModelPixelScale must have at least 2 values".into()));
    }

    if tie_points.len() < 6 {
        return Err(Error::Runtime("ModelTiepoint must have 6 values".into()));
    }

    let pixel_width = pixel_scale[0];
    let pixel_height = -pixel_scale[1];
    if pixel_width == 0.0 || pixel_height == 0.0 {
        return Err(Error::Runtime("No cell sizes present in geotiff".into()));
    }

    Ok(GeoTransform::new([
        tie_points[3] - tie_points[0] * pixel_width,
        pixel_width,
        0.0,
        tie_points[4] - tie_points[1] * pixel_height,
        0.0,
        pixel_height,
    ]))
}

fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|nodata| nodata.trim().trim_end_matches('\0').parse::<f64>().ok())
}

const USER_DEFINED: u16 = 32767;

fn read_projection_info<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<ProjectionInfo>> {
    let Ok(key_dir) = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag) else {
        return Ok(None);
    };

    if key_dir.len() < 4 {
        return Ok(None);
    }

    if key_dir[0] != 1 {
        return Err(Error::Runtime(format!("Unexpected key directory version: {}", key_dir[0])));
    }

    let mut proj_info = ProjectionInfo::default();
    for key in key_dir[4..].chunks_exact(4) {
        // Only inline values (no tag location) are of interest
        if key[1] != 0 {
            continue;
        }

        match key[0] {
            1024 => {
                proj_info.model_type = match key[3] {
                    2 => ModelType::Geographic,
                    3 => ModelType::Geocentric,
                    _ => ModelType::Projected,
                };
            }
            2048 => proj_info.geographic_epsg = Some(key[3]).filter(|&code| code != USER_DEFINED),
            3072 => proj_info.projected_epsg = Some(key[3]).filter(|&code| code != USER_DEFINED),
            _ => {}
        }
    }

    Ok(Some(proj_info))
}
