//! Archive extraction through the external `7z` utility.
//!
//! Downloaded OpenMTBMap installers are self-extracting archives; `7z` can
//! unpack them without running the installer. Extraction is skipped for
//! archives whose on-disk state did not change across the most recent fetch,
//! unless the force-extract flag is set.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while extracting an archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extraction utility could not be launched at all.
    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The extraction utility ran but reported failure.
    #[error("{command} failed on {archive} ({status}): {stderr}")]
    CommandFailed {
        command: String,
        archive: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Unpacks a downloaded archive into a destination directory.
pub trait ArchiveExtractor {
    /// Extract `archive_path` into `destination_dir`, answering yes to any
    /// prompt the utility would raise.
    fn extract(&self, archive_path: &Path, destination_dir: &Path) -> Result<(), ExtractError>;
}

/// Production [`ArchiveExtractor`] invoking the external `7z` binary.
pub struct SevenZipExtractor {
    command: String,
}

impl SevenZipExtractor {
    /// Create an extractor invoking the given command, resolved from `PATH`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ArchiveExtractor for SevenZipExtractor {
    fn extract(&self, archive_path: &Path, destination_dir: &Path) -> Result<(), ExtractError> {
        debug!(archive = %archive_path.display(), "extracting archive");

        let output = Command::new(&self.command)
            .arg("x")
            .arg("-y")
            .arg(format!("-o{}", destination_dir.display()))
            .arg(archive_path)
            .output()
            .map_err(|e| ExtractError::Spawn {
                command: self.command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ExtractError::CommandFailed {
                command: self.command.clone(),
                archive: archive_path.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(archive = %archive_path.display(), "archive extracted");
        Ok(())
    }
}

/// On-disk state of an archive, compared across a fetch to decide whether
/// re-extraction is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSnapshot {
    len: u64,
    modified: Option<SystemTime>,
}

impl ArchiveSnapshot {
    /// Capture the current state of `path`, or `None` when it does not exist.
    pub fn capture(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_of_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ArchiveSnapshot::capture(&dir.path().join("absent.exe")), None);
    }

    #[test]
    fn test_snapshot_stable_for_untouched_file() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mtbalps.exe");
        fs::write(&archive, b"payload").unwrap();

        let before = ArchiveSnapshot::capture(&archive);
        let after = ArchiveSnapshot::capture(&archive);
        assert!(before.is_some());
        assert_eq!(before, after);
    }

    #[test]
    fn test_snapshot_changes_when_content_grows() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mtbalps.exe");
        fs::write(&archive, b"payload").unwrap();

        let before = ArchiveSnapshot::capture(&archive);
        fs::write(&archive, b"payload plus a refreshed download").unwrap();
        let after = ArchiveSnapshot::capture(&archive);
        assert_ne!(before, after);
    }

    #[test]
    fn test_spawn_failure_for_unknown_command() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("mtbalps.exe");
        fs::write(&archive, b"payload").unwrap();

        let extractor = SevenZipExtractor::new("definitely-not-a-real-extractor");
        let result = extractor.extract(&archive, dir.path());
        assert!(matches!(result, Err(ExtractError::Spawn { .. })));
    }
}
