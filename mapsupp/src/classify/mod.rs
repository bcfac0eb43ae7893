//! Working-directory classification.
//!
//! Selects the style file for the configured layout, copies it to the
//! canonical name the compiler expects, partitions the tile files and derives
//! the numeric format identifier (FID) from which partitions are non-empty.
//!
//! Directory-listing order is filesystem dependent; nothing here relies on it
//! beyond "first style match wins".

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::defaults::CANONICAL_STYLE_FILENAME;
use crate::config::Layout;

/// Errors that can occur during classification.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// No style file for the requested layout is present.
    #[error("no style file matching '{pattern}' in {dir}")]
    StyleFileNotFound { pattern: String, dir: PathBuf },

    /// No tile files to combine are present.
    #[error("no map tiles matching '{pattern}' in {dir}, nothing to join")]
    NoTilesFound { pattern: String, dir: PathBuf },

    /// A configured glob does not parse.
    #[error("invalid glob pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The working directory could not be listed.
    #[error("failed to list {dir}: {source}")]
    ListDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The selected style file could not be copied to the canonical name.
    #[error("failed to copy style {from} to {to}: {source}")]
    CopyStyle {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Numeric format identifier consumed by the map compiler.
///
/// Encodes which categories of map content go into the combined image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatId {
    /// Regular and elevation tiles combined.
    OsmAndSrtm,
    /// Regular tiles only.
    OsmOnly,
    /// Elevation tiles only.
    SrtmOnly,
}

impl FormatId {
    /// The FID string passed to the compiler's `-f` and `-wy` arguments.
    pub fn code(&self) -> &'static str {
        match self {
            FormatId::OsmAndSrtm => "7352",
            FormatId::OsmOnly => "7350",
            FormatId::SrtmOnly => "7351",
        }
    }

    /// Derive the identifier from which tile partitions are populated.
    /// Returns `None` when both are empty.
    pub fn derive(has_osm: bool, has_srtm: bool) -> Option<Self> {
        match (has_osm, has_srtm) {
            (true, true) => Some(FormatId::OsmAndSrtm),
            (true, false) => Some(FormatId::OsmOnly),
            (false, true) => Some(FormatId::SrtmOnly),
            (false, false) => None,
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The two disjoint tile partitions, in directory-listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSet {
    /// Regular map tiles.
    pub osm: Vec<PathBuf>,
    /// Elevation tiles.
    pub srtm: Vec<PathBuf>,
}

/// Outcome of classifying a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The style file the layout selected.
    pub selected_style: PathBuf,
    /// The canonical copy the compiler operates on.
    pub canonical_style: PathBuf,
    /// The partitioned tile files.
    pub tiles: TileSet,
    /// The derived format identifier.
    pub format: FormatId,
}

/// Classify `working_dir` for the given layout and tile globs.
///
/// Selects the first `*.TYP` entry matching the layout prefix
/// (case-sensitive, listing order), copies it to the canonical compiler name,
/// then partitions tile files and derives the [`FormatId`].
///
/// # Errors
///
/// [`ClassifyError::StyleFileNotFound`] when no style file matches,
/// [`ClassifyError::NoTilesFound`] when both tile partitions are empty.
pub fn classify(
    working_dir: &Path,
    layout: Layout,
    tile_pattern: &str,
    srtm_pattern: Option<&str>,
) -> Result<Classification, ClassifyError> {
    let selected_style = select_style_file(working_dir, layout)?;

    let canonical_style = working_dir.join(CANONICAL_STYLE_FILENAME);
    fs::copy(&selected_style, &canonical_style).map_err(|e| ClassifyError::CopyStyle {
        from: selected_style.clone(),
        to: canonical_style.clone(),
        source: e,
    })?;
    info!(style = %selected_style.display(), "style file selected");

    let tiles = partition_tiles(working_dir, tile_pattern, srtm_pattern)?;
    let format = FormatId::derive(!tiles.osm.is_empty(), !tiles.srtm.is_empty()).ok_or_else(
        || ClassifyError::NoTilesFound {
            pattern: tile_pattern.to_string(),
            dir: working_dir.to_path_buf(),
        },
    )?;
    debug!(fid = format.code(), osm = tiles.osm.len(), srtm = tiles.srtm.len(), "tiles classified");

    Ok(Classification {
        selected_style,
        canonical_style,
        tiles,
        format,
    })
}

fn select_style_file(dir: &Path, layout: Layout) -> Result<PathBuf, ClassifyError> {
    let pattern_text = layout.style_pattern();
    let pattern = parse_pattern(&pattern_text)?;

    for entry in list_dir(dir)? {
        let entry = entry.map_err(|e| ClassifyError::ListDir {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if pattern.matches(name) {
                return Ok(dir.join(name));
            }
        }
    }

    Err(ClassifyError::StyleFileNotFound {
        pattern: pattern_text,
        dir: dir.to_path_buf(),
    })
}

fn partition_tiles(
    dir: &Path,
    tile_pattern: &str,
    srtm_pattern: Option<&str>,
) -> Result<TileSet, ClassifyError> {
    let tiles_glob = parse_pattern(tile_pattern)?;
    let srtm_glob = srtm_pattern.map(parse_pattern).transpose()?;

    let mut tiles = TileSet::default();
    for entry in list_dir(dir)? {
        let entry = entry.map_err(|e| ClassifyError::ListDir {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if let Some(srtm_glob) = &srtm_glob {
            if srtm_glob.matches(name) {
                tiles.srtm.push(dir.join(name));
                continue;
            }
        }
        if tiles_glob.matches(name) {
            tiles.osm.push(dir.join(name));
        }
    }
    Ok(tiles)
}

fn parse_pattern(text: &str) -> Result<Pattern, ClassifyError> {
    Pattern::new(text).map_err(|e| ClassifyError::BadPattern {
        pattern: text.to_string(),
        source: e,
    })
}

fn list_dir(dir: &Path) -> Result<fs::ReadDir, ClassifyError> {
    fs::read_dir(dir).map_err(|e| ClassifyError::ListDir {
        dir: dir.to_path_buf(),
        source: e,
    })
}
