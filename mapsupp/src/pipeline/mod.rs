//! The build pipeline.
//!
//! A strictly linear run: validate the working directory, optionally fetch
//! every archive in the download manifest, extract the archives that changed,
//! classify the working directory, rewrite the style, join the tiles. The
//! first failing step aborts the run; there are no retries and nothing is
//! rolled back, partial artifacts stay on disk for inspection.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info};

use crate::classify::{classify, ClassifyError};
use crate::config::PipelineConfig;
use crate::extract::{ArchiveExtractor, ArchiveSnapshot, ExtractError};
use crate::tool::{MapCompiler, ToolError};
use crate::transfer::{Fetcher, TransferError};

/// Errors that can abort a pipeline run.
///
/// Component errors pass through unchanged; the variants defined here cover
/// the orchestration steps themselves.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configured working directory does not exist.
    #[error("working directory {0} does not exist")]
    WorkingDirectoryNotFound(PathBuf),

    /// The download manifest could not be read.
    #[error("failed to read download manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The download directory could not be created.
    #[error("failed to create download directory {path}: {source}")]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configured installer glob does not parse.
    #[error("invalid installer pattern '{pattern}': {source}")]
    InstallerPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// The download directory could not be listed.
    #[error("failed to list download directory {path}: {source}")]
    ListDownloads {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Sequences the whole build: fetch, extract, classify, compile.
///
/// Collaborators come in through their traits so tests can drive the
/// orchestration with recording mocks. Execution is single-threaded and
/// strictly sequential; the working directory is treated as exclusively
/// owned for the duration of the run.
///
/// # Example
///
/// ```ignore
/// use mapsupp::config::{defaults, PipelineConfig};
/// use mapsupp::extract::SevenZipExtractor;
/// use mapsupp::pipeline::Pipeline;
/// use mapsupp::tool::GmtCompiler;
/// use mapsupp::transfer::HttpFetcher;
///
/// let config = PipelineConfig::new("/mnt/geo/openmtbmap");
/// let compiler = GmtCompiler::resolve(config.working_dir(), config.metadata_label())?;
/// let pipeline = Pipeline::new(
///     config,
///     HttpFetcher::new()?,
///     SevenZipExtractor::new(defaults::SEVENZIP_COMMAND),
///     compiler,
/// );
/// let image = pipeline.run()?;
/// ```
pub struct Pipeline<F, X, C> {
    config: PipelineConfig,
    fetcher: F,
    extractor: X,
    compiler: C,
}

impl<F: Fetcher, X: ArchiveExtractor, C: MapCompiler> Pipeline<F, X, C> {
    /// Create a pipeline over the given configuration and collaborators.
    pub fn new(config: PipelineConfig, fetcher: F, extractor: X, compiler: C) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            compiler,
        }
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline to completion and return the output image path.
    ///
    /// Steps in order: working-directory validation, manifest fetch (when
    /// batch mode is configured), archive extraction, classification, style
    /// rewrite, join. The first error ends the run.
    pub fn run(&self) -> Result<PathBuf, PipelineError> {
        let working_dir = self.config.working_dir();
        if !working_dir.is_dir() {
            return Err(PipelineError::WorkingDirectoryNotFound(
                working_dir.to_path_buf(),
            ));
        }

        let changed = match self.config.download_manifest() {
            Some(manifest) => self.fetch_archives(manifest)?,
            None => HashMap::new(),
        };

        self.extract_archives(&changed)?;

        let classification = classify(
            working_dir,
            self.config.layout(),
            self.config.tile_pattern(),
            self.config.srtm_pattern(),
        )?;
        info!(
            fid = classification.format.code(),
            osm = classification.tiles.osm.len(),
            srtm = classification.tiles.srtm.len(),
            "working directory classified"
        );

        // The join consumes the corrected style, so the rewrite has to land first.
        self.compiler
            .correct_style(classification.format, &classification.canonical_style)?;
        self.compiler.join_maps(
            classification.format,
            &classification.canonical_style,
            &classification.tiles.osm,
            &classification.tiles.srtm,
            self.config.output(),
        )?;

        info!(output = %self.config.output().display(), "combined image written");
        Ok(self.config.output().to_path_buf())
    }

    /// Fetch every manifest URL sequentially, in file order.
    ///
    /// Returns, per downloaded filename, whether the local archive changed
    /// across the fetch; extraction uses this to skip untouched archives.
    /// A failure on any URL aborts before the next one is attempted.
    fn fetch_archives(&self, manifest: &Path) -> Result<HashMap<String, bool>, PipelineError> {
        let download_dir = self.config.download_dir();
        if !download_dir.exists() {
            fs::create_dir_all(&download_dir).map_err(|e| PipelineError::DownloadDir {
                path: download_dir.clone(),
                source: e,
            })?;
        }

        let manifest_text =
            fs::read_to_string(manifest).map_err(|e| PipelineError::Manifest {
                path: manifest.to_path_buf(),
                source: e,
            })?;

        let mut changed = HashMap::new();
        for line in manifest_text.lines() {
            let url = line.trim_end();
            if url.is_empty() {
                continue;
            }
            let filename = url.rsplit('/').next().unwrap_or(url);
            let local = download_dir.join(filename);

            let before = ArchiveSnapshot::capture(&local);
            info!(url, file = filename, "fetching archive");
            self.fetcher.fetch(&local, url)?;
            let after = ArchiveSnapshot::capture(&local);

            changed.insert(filename.to_string(), before != after);
        }
        Ok(changed)
    }

    /// Extract installer archives from the download directory into the
    /// working directory, in listing order.
    ///
    /// An archive is extracted when force-extract is set or when this run's
    /// fetch changed it; anything else is left alone.
    fn extract_archives(&self, changed: &HashMap<String, bool>) -> Result<(), PipelineError> {
        let download_dir = self.config.download_dir();
        if !download_dir.is_dir() {
            debug!(path = %download_dir.display(), "no download directory, skipping extraction");
            return Ok(());
        }

        let pattern_text = self.config.installer_pattern();
        let pattern = Pattern::new(pattern_text).map_err(|e| PipelineError::InstallerPattern {
            pattern: pattern_text.to_string(),
            source: e,
        })?;

        let entries = fs::read_dir(&download_dir).map_err(|e| PipelineError::ListDownloads {
            path: download_dir.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::ListDownloads {
                path: download_dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !pattern.matches(name) {
                continue;
            }

            let archive_changed = changed.get(name).copied().unwrap_or(false);
            if self.config.force_extract() || archive_changed {
                self.extractor.extract(&path, self.config.working_dir())?;
            } else {
                debug!(archive = name, "archive unchanged, skipping extraction");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FormatId;
    use crate::config::Layout;
    use reqwest::StatusCode;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Fetcher that records URLs and writes a small payload, optionally
    /// failing at a fixed call index.
    struct RecordingFetcher {
        calls: RefCell<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl RecordingFetcher {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_at: Some(index),
            }
        }
    }

    impl Fetcher for RecordingFetcher {
        fn fetch(&self, local_path: &Path, url: &str) -> Result<(), TransferError> {
            let index = self.calls.borrow().len();
            self.calls.borrow_mut().push(url.to_string());
            if self.fail_at == Some(index) {
                return Err(TransferError::Status {
                    url: url.to_string(),
                    status: StatusCode::NOT_FOUND,
                });
            }
            fs::write(local_path, url).unwrap();
            Ok(())
        }
    }

    struct RecordingExtractor {
        calls: RefCell<Vec<PathBuf>>,
    }

    impl RecordingExtractor {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArchiveExtractor for RecordingExtractor {
        fn extract(&self, archive_path: &Path, _destination_dir: &Path) -> Result<(), ExtractError> {
            self.calls.borrow_mut().push(archive_path.to_path_buf());
            Ok(())
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    enum CompilerCall {
        CorrectStyle {
            fid: &'static str,
            style: PathBuf,
        },
        JoinMaps {
            fid: &'static str,
            style: PathBuf,
            osm: Vec<PathBuf>,
            srtm: Vec<PathBuf>,
            output: PathBuf,
        },
    }

    struct RecordingCompiler {
        calls: RefCell<Vec<CompilerCall>>,
    }

    impl RecordingCompiler {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl MapCompiler for RecordingCompiler {
        fn correct_style(&self, format: FormatId, style_file: &Path) -> Result<(), ToolError> {
            self.calls.borrow_mut().push(CompilerCall::CorrectStyle {
                fid: format.code(),
                style: style_file.to_path_buf(),
            });
            Ok(())
        }

        fn join_maps(
            &self,
            format: FormatId,
            style_file: &Path,
            osm_tiles: &[PathBuf],
            srtm_tiles: &[PathBuf],
            output: &Path,
        ) -> Result<(), ToolError> {
            self.calls.borrow_mut().push(CompilerCall::JoinMaps {
                fid: format.code(),
                style: style_file.to_path_buf(),
                osm: osm_tiles.to_vec(),
                srtm: srtm_tiles.to_vec(),
                output: output.to_path_buf(),
            });
            Ok(())
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    fn pipeline(
        config: PipelineConfig,
    ) -> Pipeline<RecordingFetcher, RecordingExtractor, RecordingCompiler> {
        Pipeline::new(
            config,
            RecordingFetcher::new(),
            RecordingExtractor::new(),
            RecordingCompiler::new(),
        )
    }

    #[test]
    fn test_missing_working_dir_fails_before_any_work() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path().join("absent"));
        let p = pipeline(config);

        let err = p.run().unwrap_err();
        assert!(matches!(err, PipelineError::WorkingDirectoryNotFound(_)));
        assert!(p.fetcher.calls.borrow().is_empty());
        assert!(p.extractor.calls.borrow().is_empty());
        assert!(p.compiler.calls.borrow().is_empty());
    }

    #[test]
    fn test_manifest_urls_fetched_in_order_then_extracted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thinAT.TYP");
        touch(dir.path(), "7_region.img");
        let manifest = dir.path().join("list.txt");
        fs::write(
            &manifest,
            "http://maps.example/mtbalps.exe\n\nhttp://maps.example/mtbharz.exe \n",
        )
        .unwrap();

        let config = PipelineConfig::new(dir.path()).with_download_manifest(&manifest);
        let p = pipeline(config);
        p.run().unwrap();

        assert_eq!(
            *p.fetcher.calls.borrow(),
            vec![
                "http://maps.example/mtbalps.exe".to_string(),
                "http://maps.example/mtbharz.exe".to_string(),
            ]
        );
        // Both archives were new this run, so both get extracted.
        let extracted: Vec<String> = p
            .extractor
            .calls
            .borrow()
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        let mut sorted = extracted.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["mtbalps.exe", "mtbharz.exe"]);
    }

    #[test]
    fn test_fetch_failure_aborts_run() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thinAT.TYP");
        touch(dir.path(), "7_region.img");
        let manifest = dir.path().join("list.txt");
        fs::write(
            &manifest,
            "http://maps.example/mtbalps.exe\nhttp://maps.example/mtbharz.exe\nhttp://maps.example/mtbjura.exe\n",
        )
        .unwrap();

        let config = PipelineConfig::new(dir.path()).with_download_manifest(&manifest);
        let p = Pipeline::new(
            config,
            RecordingFetcher::failing_at(1),
            RecordingExtractor::new(),
            RecordingCompiler::new(),
        );

        let err = p.run().unwrap_err();
        assert!(matches!(err, PipelineError::Transfer(_)));
        // The second URL failed; the third was never attempted, and nothing
        // downstream ran.
        assert_eq!(p.fetcher.calls.borrow().len(), 2);
        assert!(p.extractor.calls.borrow().is_empty());
        assert!(p.compiler.calls.borrow().is_empty());
    }

    #[test]
    fn test_unchanged_archive_is_not_extracted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thinAT.TYP");
        touch(dir.path(), "7_region.img");
        touch(dir.path(), "mtbalps.exe");

        let p = pipeline(PipelineConfig::new(dir.path()));
        p.run().unwrap();

        assert!(p.extractor.calls.borrow().is_empty());
    }

    #[test]
    fn test_force_extract_overrides_change_detection() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thinAT.TYP");
        touch(dir.path(), "7_region.img");
        touch(dir.path(), "mtbalps.exe");

        let config = PipelineConfig::new(dir.path()).with_force_extract(true);
        let p = pipeline(config);
        p.run().unwrap();

        let calls = p.extractor.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], dir.path().join("./mtbalps.exe"));
    }

    #[test]
    fn test_style_rewrite_happens_before_join() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "thinAT.TYP");
        touch(dir.path(), "7_region.img");
        touch(dir.path(), "6_region.img");

        let config = PipelineConfig::new(dir.path()).with_output("combined.img");
        let p = pipeline(config);
        let output = p.run().unwrap();
        assert_eq!(output, PathBuf::from("combined.img"));

        let calls = p.compiler.calls.borrow();
        assert_eq!(calls.len(), 2);

        let canonical = dir.path().join("01002468.TYP");
        assert_eq!(
            calls[0],
            CompilerCall::CorrectStyle {
                fid: "7350",
                style: canonical.clone(),
            }
        );
        match &calls[1] {
            CompilerCall::JoinMaps {
                fid,
                style,
                osm,
                srtm,
                output,
            } => {
                assert_eq!(*fid, "7350");
                assert_eq!(*style, canonical);
                assert_eq!(osm.len(), 2);
                assert!(osm.contains(&dir.path().join("7_region.img")));
                assert!(osm.contains(&dir.path().join("6_region.img")));
                assert!(srtm.is_empty());
                assert_eq!(*output, PathBuf::from("combined.img"));
            }
            other => panic!("expected JoinMaps, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_style_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::new(dir.path()).with_layout(Layout::Wide);
        let p = pipeline(config);

        let err = p.run().unwrap_err();
        assert!(err.to_string().contains("wide"));
        assert!(matches!(
            err,
            PipelineError::Classify(ClassifyError::StyleFileNotFound { .. })
        ));
        assert!(p.compiler.calls.borrow().is_empty());
        assert!(p.extractor.calls.borrow().is_empty());
    }
}
