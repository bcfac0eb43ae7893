//! Mapsupp - combined Garmin map image assembly.
//!
//! This library builds a single `gmapsupp.img` for a GPS device out of
//! separately downloaded OpenMTBMap regional tiles and a `*.TYP` style file,
//! by orchestrating the external `7z` extractor and the `gmt.exe` map
//! compiler (run under `wine` on POSIX hosts).
//!
//! # High-Level API
//!
//! ```ignore
//! use mapsupp::config::{defaults, PipelineConfig};
//! use mapsupp::extract::SevenZipExtractor;
//! use mapsupp::pipeline::Pipeline;
//! use mapsupp::tool::GmtCompiler;
//! use mapsupp::transfer::HttpFetcher;
//!
//! let config = PipelineConfig::new("/mnt/geo/openmtbmap");
//! let compiler = GmtCompiler::resolve(config.working_dir(), config.metadata_label())?;
//! let pipeline = Pipeline::new(
//!     config,
//!     HttpFetcher::new()?,
//!     SevenZipExtractor::new(defaults::SEVENZIP_COMMAND),
//!     compiler,
//! );
//! let image = pipeline.run()?;
//! ```

pub mod classify;
pub mod config;
pub mod extract;
pub mod pipeline;
pub mod tool;
pub mod transfer;

/// Version of the mapsupp library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
