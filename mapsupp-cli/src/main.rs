//! mapsupp CLI - build a combined Garmin image from OpenMTBMap downloads.

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

use mapsupp::config::{defaults, Layout, PipelineConfig};
use mapsupp::extract::SevenZipExtractor;
use mapsupp::pipeline::Pipeline;
use mapsupp::tool::GmtCompiler;
use mapsupp::transfer::HttpFetcher;
use tracing::info;

mod error;
mod logging;

use error::CliError;

#[derive(Debug, Clone, ValueEnum)]
enum LayoutArg {
    /// Classic layout, optimized for Vista/Legend series
    Clas,
    /// Thinner tracks and paths, optimized for Gpsmap60/76 series
    Thin,
    /// High contrast layout with white forest, for Oregon/Colorado displays
    Wide,
    /// Big screen layout, do not use on GPS devices
    Trad,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Clas => Layout::Clas,
            LayoutArg::Thin => Layout::Thin,
            LayoutArg::Wide => Layout::Wide,
            LayoutArg::Trad => Layout::Trad,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mapsupp",
    version,
    about = "Combine OpenMTBMap tiles into a single gmapsupp.img",
    after_help = "Example: mapsupp -g gmapsupp.img -w /mnt/geo/openmtbmap \
                  -p '[7,6]*.img' -d /mnt/geo/openmtbmap.txt -l thin"
)]
struct Args {
    /// Be moderately verbose
    #[arg(short, long)]
    verbose: bool,

    /// The destination image file
    #[arg(short = 'g', long = "gmapsupp", default_value = defaults::DEFAULT_OUTPUT_IMAGE)]
    gmapsupp: PathBuf,

    /// The working directory holding maps, style files and gmt.exe
    #[arg(short = 'w', long = "working-dir", default_value = ".")]
    working_dir: PathBuf,

    /// Force extraction of archives even when they are unchanged
    #[arg(short = 'e', long = "force-extract")]
    force_extract: bool,

    /// Glob for image files to combine; quote it to keep the shell from
    /// expanding it (e.g. '[7,6]*.img')
    #[arg(short, long, default_value = defaults::DEFAULT_TILE_PATTERN)]
    pattern: String,

    /// Batch mode: file listing one archive URL per line to download first
    #[arg(short, long)]
    download: Option<PathBuf>,

    /// Style layout to apply
    #[arg(short, long, value_enum, default_value = "thin")]
    layout: LayoutArg,
}

fn main() {
    // Bare invocation is a request for help, not a run with defaults.
    if std::env::args_os().len() <= 1 {
        let _ = Args::command().print_help();
        return;
    }

    let args = Args::parse();
    if let Err(message) = logging::init(args.verbose) {
        CliError::Logging(message).exit();
    }
    info!("mapsupp v{}", mapsupp::VERSION);

    let mut config = PipelineConfig::new(args.working_dir)
        .with_output(args.gmapsupp)
        .with_tile_pattern(args.pattern)
        .with_layout(args.layout.into())
        .with_force_extract(args.force_extract);
    if let Some(manifest) = args.download {
        config = config.with_download_manifest(manifest);
    }

    match build_image(config) {
        Ok(image) => print_success(&image),
        Err(error) => error.exit(),
    }
}

fn build_image(config: PipelineConfig) -> Result<PathBuf, CliError> {
    let fetcher = HttpFetcher::new().map_err(|e| CliError::Pipeline(e.into()))?;
    let compiler = GmtCompiler::resolve(config.working_dir(), config.metadata_label())
        .map_err(|e| CliError::Pipeline(e.into()))?;
    let extractor = SevenZipExtractor::new(defaults::SEVENZIP_COMMAND);

    Pipeline::new(config, fetcher, extractor, compiler)
        .run()
        .map_err(CliError::Pipeline)
}

fn print_success(image: &Path) {
    println!();
    println!("SUCCESS");
    println!("{} generated", image.display());
    println!();
    println!(
        "Put the image into the /garmin/ folder of your GPS memory (connect the \
         device and choose mass storage mode), or write it directly to a memory \
         card in a reader for a faster transfer. Back up any gmapsupp.img that \
         was there before. If you want address search you have to send the maps \
         with Mapsource instead."
    );
}
