use std::path::Path;

use geo::{
    ArrayDataType, HistogramConfig, NodataPolicy,
    algo::{self, DiffOptions},
    geotiff,
};
use inf::{duration::Recorder, progressinfo::AsyncProgressNotification};
use tiler::{PyramidOptions, TilePyramidBuilder};

use crate::Result;

/// Pixel values of the difference raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DiffOutputType {
    /// The difference values
    #[default]
    Value,
    /// The histogram class of the difference values, requires a histogram
    Discretized,
}

/// Output locations of a diff run, the summary goes to stdout when `json` is omitted
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOutputs<'a> {
    pub raster: Option<&'a Path>,
    pub raster_type: DiffOutputType,
    pub json: Option<&'a Path>,
    pub histogram: Option<&'a Path>,
}

/// Writes the value as pretty printed JSON to the file, or to stdout when no path is given
fn write_json(value: &impl serde::Serialize, path: Option<&Path>) -> Result {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            inf::fs::create_directory_for_file(path)?;
            std::fs::write(path, json)?;
            log::info!("Output written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Per band statistics, the nodata value of the raster is used when no explicit value is configured
pub fn raster_stats(input: &Path, output: Option<&Path>, nodata: Option<f64>, zero_is_nodata: bool) -> Result {
    let recorder = Recorder::new();
    let raster = geotiff::read_raster(input)?;
    let policy = NodataPolicy::with_sentinel_opt(nodata.or(raster.nodata())).zero_is_nodata(zero_is_nodata);

    let stats = algo::band_statistics(&raster, &policy);
    log::info!("Statistics of {} bands computed in {}", stats.len(), recorder.elapsed_time_string());
    write_json(&stats, output)
}

/// Histogram bins from the command line options, a bin count takes precedence over a bin width
pub fn histogram_config(min: Option<f64>, max: Option<f64>, bins: Option<usize>, step: Option<f64>) -> Result<HistogramConfig> {
    let (Some(min), Some(max)) = (min, max) else {
        return Err(tiler::Error::InvalidArgument("A histogram requires --min and --max".into()));
    };

    Ok(match (bins, step) {
        (Some(bins), _) => HistogramConfig::from_min_max_bins(min, max, bins)?,
        (None, Some(step)) => HistogramConfig::from_min_max_step(min, max, step)?,
        (None, None) => return Err(tiler::Error::InvalidArgument("A histogram requires --bins or --step".into())),
    })
}

pub fn raster_diff(first: &Path, second: &Path, options: &DiffOptions, outputs: DiffOutputs) -> Result {
    if outputs.raster_type == DiffOutputType::Discretized && options.histogram.is_none() {
        return Err(tiler::Error::InvalidArgument("The discretized output requires a histogram (--hist)".into()));
    }

    let recorder = Recorder::new();
    let first = geotiff::read_raster(first)?;
    let second = geotiff::read_raster(second)?;

    let result = algo::diff(&first, &second, options)?;
    log::info!("Difference computed in {}", recorder.elapsed_time_string());

    if let Some(output) = outputs.raster {
        match (outputs.raster_type, &result.discretized) {
            (DiffOutputType::Value, _) => geotiff::write_raster(output, &result.raster, ArrayDataType::Float32)?,
            (DiffOutputType::Discretized, Some(discretized)) => geotiff::write_raster(output, discretized, ArrayDataType::Int32)?,
            (DiffOutputType::Discretized, None) => {
                return Err(tiler::Error::InvalidArgument("No histogram classes were computed".into()));
            }
        }
        log::info!("Difference raster written to {}", output.display());
    }

    if let (Some(path), Some(histogram)) = (outputs.histogram, &result.histogram) {
        write_json(histogram, Some(path))?;
    }

    write_json(&result.summary, outputs.json)
}

/// Mask of the non empty pixels, the empty value defaults to the nodata value of the raster and otherwise to 0
pub fn raster_mask(input: &Path, output: &Path, empty_value: Option<f64>) -> Result {
    let raster = geotiff::read_raster(input)?;
    let mask = algo::mask_with_value(&raster, empty_value.or(raster.nodata()).unwrap_or(0.0))?;
    geotiff::write_raster(output, &mask, ArrayDataType::Uint8)?;
    log::info!("Mask written to {}", output.display());
    Ok(())
}

pub fn create_tiles(input: &Path, output_dir: &Path, options: PyramidOptions, progress: &impl AsyncProgressNotification) -> Result {
    let recorder = Recorder::new();
    let builder = TilePyramidBuilder::new(options)?;
    let raster = geotiff::read_raster(input)?;

    let index = builder.build(&raster, output_dir, progress)?;
    log::info!("Created {} tiles in {}", index.len(), recorder.elapsed_time_string());
    Ok(())
}
