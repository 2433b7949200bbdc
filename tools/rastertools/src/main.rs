use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use env_logger::{Env, TimestampPrecision};
use geo::{NodataPolicy, algo::DiffOptions};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use inf::progressinfo::{CallbackProgress, ComputationStatus};
use tiler::PyramidOptions;

use crate::commands::DiffOutputType;

pub type Result<T = ()> = tiler::Result<T>;

mod commands;

#[derive(Parser, Debug)]
#[clap(name = "rastertools", about = "Raster statistics, differences, masks and tile pyramids")]
pub struct Opt {
    /// Number of worker threads, the results do not depend on it
    #[clap(long = "threads", short = 't', env = "RASTERTOOLS_THREADS", global = true)]
    pub threads: Option<usize>,

    #[clap(long = "noprogress", global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(about = "Per band statistics as JSON")]
    Stats {
        input: PathBuf,
        #[clap(long = "output", short = 'o', help = "JSON output path, stdout when omitted")]
        output: Option<PathBuf>,
        #[clap(long = "nodata", allow_negative_numbers = true)]
        nodata: Option<f64>,
        #[clap(long = "zero-is-nodata")]
        zero_is_nodata: bool,
    },
    #[command(about = "Difference of the second raster and the first raster")]
    Diff {
        first: PathBuf,
        second: PathBuf,
        #[clap(long = "output", short = 'o', help = "Difference raster output path")]
        output: Option<PathBuf>,
        #[clap(long = "json", help = "JSON summary output path, stdout when omitted")]
        json: Option<PathBuf>,
        #[clap(long = "negate", help = "Compute first - second")]
        negate: bool,
        #[clap(long = "hist", help = "Histogram JSON output path, requires --min, --max and --bins or --step")]
        hist: Option<PathBuf>,
        #[clap(long = "min", allow_negative_numbers = true, requires = "hist")]
        min: Option<f64>,
        #[clap(long = "max", allow_negative_numbers = true, requires = "hist")]
        max: Option<f64>,
        #[clap(long = "bins", requires = "hist", help = "Number of bins, overrides --step")]
        bins: Option<usize>,
        #[clap(long = "step", requires = "hist", help = "Bin width")]
        step: Option<f64>,
        #[clap(long = "output-type", value_enum, default_value_t = DiffOutputType::Value)]
        output_type: DiffOutputType,
    },
    #[command(about = "Mask of the pixels with a value different from the empty value in any band")]
    Mask {
        input: PathBuf,
        output: PathBuf,
        #[clap(long = "value", allow_negative_numbers = true, help = "Empty value (default 0)")]
        value: Option<f64>,
    },
    #[command(about = "Tile pyramid with per tile statistics")]
    Tile {
        input: PathBuf,
        output_dir: PathBuf,
        #[clap(long = "tile-size", default_value_t = tiler::pyramid::DEFAULT_TILE_SIZE)]
        tile_size: usize,
        #[clap(long = "nodata", allow_negative_numbers = true)]
        nodata: Option<f64>,
        #[clap(long = "zero-is-nodata")]
        zero_is_nodata: bool,
        #[clap(long = "min-zoom", help = "Lowest stored zoom level (default 0)")]
        min_zoom: Option<u32>,
        #[clap(long = "max-zoom", help = "Highest stored zoom level (default: the native resolution level)")]
        max_zoom: Option<u32>,
    },
}

fn run(opt: Opt, multi: &MultiProgress) -> Result {
    match opt.command {
        Command::Stats {
            input,
            output,
            nodata,
            zero_is_nodata,
        } => commands::raster_stats(&input, output.as_deref(), nodata, zero_is_nodata),
        Command::Diff {
            first,
            second,
            output,
            json,
            negate,
            hist,
            min,
            max,
            bins,
            step,
            output_type,
        } => {
            let histogram = match hist {
                Some(_) => Some(commands::histogram_config(min, max, bins, step)?),
                None => None,
            };

            commands::raster_diff(
                &first,
                &second,
                &DiffOptions { negate, histogram },
                commands::DiffOutputs {
                    raster: output.as_deref(),
                    raster_type: output_type,
                    json: json.as_deref(),
                    histogram: hist.as_deref(),
                },
            )
        }
        Command::Mask { input, output, value } => commands::raster_mask(&input, &output, value),
        Command::Tile {
            input,
            output_dir,
            tile_size,
            nodata,
            zero_is_nodata,
            min_zoom,
            max_zoom,
        } => {
            let options = PyramidOptions {
                tile_size,
                nodata: NodataPolicy::with_sentinel_opt(nodata).zero_is_nodata(zero_is_nodata),
                min_zoom,
                max_zoom,
            };

            let progress = if opt.no_progress {
                ProgressBar::hidden()
            } else {
                multi.add(ProgressBar::new(100))
            };

            let bar = progress.clone();
            commands::create_tiles(
                &input,
                &output_dir,
                options,
                &CallbackProgress::with_cb(move |pos| {
                    bar.set_position((pos * 100.0) as u64);
                    ComputationStatus::Continue
                }),
            )?;

            progress.finish_with_message("Tile creation done");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let opt = Opt::parse();

    let logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .build();

    let multi = MultiProgress::new();
    let level = logger.filter();
    if let Err(err) = LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("Failed to initialize logging: {err}");
    }
    log::set_max_level(level);

    if let Some(threads) = opt.threads {
        if let Err(err) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            log::warn!("Failed to configure {threads} worker threads: {err}");
        }
    }

    match run(opt, &multi) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
