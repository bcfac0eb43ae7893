//! Pipeline run configuration.

use std::path::{Path, PathBuf};

use super::defaults::{
    DEFAULT_DOWNLOAD_SUBDIR, DEFAULT_INSTALLER_PATTERN, DEFAULT_METADATA_LABEL,
    DEFAULT_OUTPUT_IMAGE, DEFAULT_TILE_PATTERN,
};
use super::Layout;

/// Configuration for one pipeline run.
///
/// Constructed once by the caller and read-only afterwards. The working
/// directory is supplied, never created: it has to exist before the run
/// starts and owns every intermediate artifact (style files, tiles,
/// downloaded archives, the compiler binary).
///
/// # Example
///
/// ```
/// use mapsupp::config::{Layout, PipelineConfig};
///
/// let config = PipelineConfig::new("/mnt/geo/openmtbmap")
///     .with_output("europe.img")
///     .with_tile_pattern("[7,6]*.img")
///     .with_layout(Layout::Thin);
/// assert_eq!(config.output().to_str(), Some("europe.img"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    working_dir: PathBuf,
    output: PathBuf,
    tile_pattern: String,
    srtm_pattern: Option<String>,
    layout: Layout,
    download_manifest: Option<PathBuf>,
    force_extract: bool,
    download_subdir: String,
    installer_pattern: String,
    metadata_label: String,
}

impl PipelineConfig {
    /// Create a configuration for the given working directory with defaults
    /// for everything else.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            output: PathBuf::from(DEFAULT_OUTPUT_IMAGE),
            tile_pattern: DEFAULT_TILE_PATTERN.to_string(),
            srtm_pattern: None,
            layout: Layout::default(),
            download_manifest: None,
            force_extract: false,
            download_subdir: DEFAULT_DOWNLOAD_SUBDIR.to_string(),
            installer_pattern: DEFAULT_INSTALLER_PATTERN.to_string(),
            metadata_label: DEFAULT_METADATA_LABEL.to_string(),
        }
    }

    /// Set the destination image path.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the glob for tile files to combine.
    pub fn with_tile_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.tile_pattern = pattern.into();
        self
    }

    /// Set a glob for elevation tiles.
    ///
    /// No CLI flag feeds this today, so the elevation partition stays empty
    /// in practice; it is kept so the format table stays fully expressible.
    pub fn with_srtm_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.srtm_pattern = Some(pattern.into());
        self
    }

    /// Set the style layout.
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Enable batch mode: fetch every URL listed in the manifest file before
    /// extracting and joining.
    pub fn with_download_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.download_manifest = Some(manifest.into());
        self
    }

    /// Extract downloaded archives even when they are unchanged.
    pub fn with_force_extract(mut self, force: bool) -> Self {
        self.force_extract = force;
        self
    }

    /// Set the subdirectory of the working directory holding downloads.
    pub fn with_download_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.download_subdir = subdir.into();
        self
    }

    /// Set the glob for installer archives eligible for extraction.
    pub fn with_installer_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.installer_pattern = pattern.into();
        self
    }

    /// Set the metadata label stamped into the combined image.
    pub fn with_metadata_label(mut self, label: impl Into<String>) -> Self {
        self.metadata_label = label.into();
        self
    }

    /// The working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The destination image path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The glob for tile files to combine.
    pub fn tile_pattern(&self) -> &str {
        &self.tile_pattern
    }

    /// The glob for elevation tiles, when one was configured.
    pub fn srtm_pattern(&self) -> Option<&str> {
        self.srtm_pattern.as_deref()
    }

    /// The style layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The download manifest path, when batch mode was requested.
    pub fn download_manifest(&self) -> Option<&Path> {
        self.download_manifest.as_deref()
    }

    /// Whether archives are extracted regardless of change detection.
    pub fn force_extract(&self) -> bool {
        self.force_extract
    }

    /// The directory downloaded archives land in.
    pub fn download_dir(&self) -> PathBuf {
        self.working_dir.join(&self.download_subdir)
    }

    /// The glob for installer archives eligible for extraction.
    pub fn installer_pattern(&self) -> &str {
        &self.installer_pattern
    }

    /// The metadata label stamped into the combined image.
    pub fn metadata_label(&self) -> &str {
        &self.metadata_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::{DEFAULT_METADATA_LABEL, DEFAULT_TILE_PATTERN};

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("/maps");
        assert_eq!(config.working_dir(), Path::new("/maps"));
        assert_eq!(config.output(), Path::new("gmapsupp.img"));
        assert_eq!(config.tile_pattern(), DEFAULT_TILE_PATTERN);
        assert_eq!(config.srtm_pattern(), None);
        assert_eq!(config.layout(), Layout::Thin);
        assert_eq!(config.download_manifest(), None);
        assert!(!config.force_extract());
        assert_eq!(config.installer_pattern(), "mtb*.exe");
        assert_eq!(config.metadata_label(), DEFAULT_METADATA_LABEL);
    }

    #[test]
    fn test_download_dir_defaults_to_working_dir() {
        let config = PipelineConfig::new("/maps");
        assert_eq!(config.download_dir(), PathBuf::from("/maps/."));
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::new("/maps")
            .with_output("alps.img")
            .with_tile_pattern("6*.img")
            .with_srtm_pattern("srtm*.img")
            .with_layout(Layout::Trad)
            .with_download_manifest("/maps/list.txt")
            .with_force_extract(true)
            .with_download_subdir("downloads")
            .with_metadata_label("alps");

        assert_eq!(config.output(), Path::new("alps.img"));
        assert_eq!(config.tile_pattern(), "6*.img");
        assert_eq!(config.srtm_pattern(), Some("srtm*.img"));
        assert_eq!(config.layout(), Layout::Trad);
        assert_eq!(config.download_manifest(), Some(Path::new("/maps/list.txt")));
        assert!(config.force_extract());
        assert_eq!(config.download_dir(), PathBuf::from("/maps/downloads"));
        assert_eq!(config.metadata_label(), "alps");
    }
}
