//! Invocation of the external map compiler.
//!
//! The compiler binary (`gmt.exe`) is a Windows executable that ships next to
//! the downloaded maps, so on POSIX hosts every call goes through `wine`.
//! Which launch style applies is resolved once, up front; missing `wine` is a
//! hard error before any pipeline work starts.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::classify::FormatId;
use crate::config::defaults::{GMT_COMMAND, WINE_COMMAND};

/// Errors that can occur while resolving or running the compiler.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The compatibility layer needed to run the compiler is not installed.
    #[error("{command} must be installed to run {tool} on this platform")]
    MissingCompatibilityLayer { command: String, tool: String },

    /// The compiler binary is not in the working directory.
    #[error(
        "{path} not found. Put gmt.exe into the folder holding the maps; it must \
         be version 048a or later (the copy bundled with contourline downloads is \
         outdated). gmt.exe is part of gmaptool."
    )]
    BinaryNotFound { path: PathBuf },

    /// The compiler process could not be launched.
    #[error("failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The compiler ran but reported failure.
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// How the compiler binary is launched on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Invoke the binary directly.
    Direct,
    /// Invoke through the compatibility layer at the given path.
    Wrapped(PathBuf),
}

impl Launcher {
    /// Resolve the launch style for this host.
    ///
    /// POSIX hosts need `wine` on `PATH` to run the Windows binary; anywhere
    /// else the binary runs directly.
    ///
    /// # Errors
    ///
    /// [`ToolError::MissingCompatibilityLayer`] when `wine` is required but
    /// not installed.
    #[cfg(unix)]
    pub fn resolve() -> Result<Self, ToolError> {
        match find_in_path(WINE_COMMAND) {
            Some(wine) => Ok(Launcher::Wrapped(wine)),
            None => Err(ToolError::MissingCompatibilityLayer {
                command: WINE_COMMAND.to_string(),
                tool: GMT_COMMAND.to_string(),
            }),
        }
    }

    /// Resolve the launch style for this host.
    #[cfg(not(unix))]
    pub fn resolve() -> Result<Self, ToolError> {
        Ok(Launcher::Direct)
    }
}

/// Locate an executable on `PATH`.
#[cfg(unix)]
fn find_in_path(command: &str) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(command);
        if let Ok(metadata) = std::fs::metadata(&candidate) {
            if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
                return Some(candidate);
            }
        }
    }
    None
}

/// Rewrites styles and joins tiles into the combined image.
///
/// The seam the orchestrator drives; tests substitute a recording mock.
pub trait MapCompiler {
    /// Rewrite the canonical style file for the given format identifier.
    fn correct_style(&self, format: FormatId, style_file: &Path) -> Result<(), ToolError>;

    /// Join the tiles and the style file into the combined image at `output`.
    ///
    /// Argument order on the compiler command line is fixed: output, format,
    /// metadata label, regular tiles, elevation tiles, style file.
    fn join_maps(
        &self,
        format: FormatId,
        style_file: &Path,
        osm_tiles: &[PathBuf],
        srtm_tiles: &[PathBuf],
        output: &Path,
    ) -> Result<(), ToolError>;
}

/// Production [`MapCompiler`] invoking `gmt.exe` from the working directory.
pub struct GmtCompiler {
    binary: PathBuf,
    launcher: Launcher,
    metadata_label: String,
}

impl GmtCompiler {
    /// Resolve a compiler for `working_dir`, checking the compatibility layer
    /// for this host up front.
    pub fn resolve(
        working_dir: &Path,
        metadata_label: impl Into<String>,
    ) -> Result<Self, ToolError> {
        Ok(Self::with_launcher(
            working_dir,
            Launcher::resolve()?,
            metadata_label,
        ))
    }

    /// Create a compiler with an explicitly chosen launcher.
    pub fn with_launcher(
        working_dir: &Path,
        launcher: Launcher,
        metadata_label: impl Into<String>,
    ) -> Self {
        Self {
            binary: working_dir.join(GMT_COMMAND),
            launcher,
            metadata_label: metadata_label.into(),
        }
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), ToolError> {
        // The binary ships next to the maps; report its absence before spawning.
        if !self.binary.is_file() {
            return Err(ToolError::BinaryNotFound {
                path: self.binary.clone(),
            });
        }

        let mut command = match &self.launcher {
            Launcher::Wrapped(wrapper) => {
                let mut command = Command::new(wrapper);
                command.arg(&self.binary);
                command
            }
            Launcher::Direct => Command::new(&self.binary),
        };
        command.args(args);
        debug!(?command, "invoking map compiler");

        let output = command.output().map_err(|e| ToolError::Spawn {
            command: self.binary.display().to_string(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(ToolError::CommandFailed {
                command: self.binary.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl MapCompiler for GmtCompiler {
    fn correct_style(&self, format: FormatId, style_file: &Path) -> Result<(), ToolError> {
        info!(fid = format.code(), style = %style_file.display(), "rewriting style");
        self.run(vec![
            OsString::from("-wy"),
            OsString::from(format.code()),
            style_file.as_os_str().to_os_string(),
        ])
    }

    fn join_maps(
        &self,
        format: FormatId,
        style_file: &Path,
        osm_tiles: &[PathBuf],
        srtm_tiles: &[PathBuf],
        output: &Path,
    ) -> Result<(), ToolError> {
        let mut args = vec![
            OsString::from("-j"),
            OsString::from("-o"),
            output.as_os_str().to_os_string(),
            OsString::from("-f"),
            OsString::from(format.code()),
            OsString::from("-m"),
            OsString::from(&self.metadata_label),
        ];
        args.extend(osm_tiles.iter().map(|tile| tile.as_os_str().to_os_string()));
        args.extend(srtm_tiles.iter().map(|tile| tile.as_os_str().to_os_string()));
        args.push(style_file.as_os_str().to_os_string());

        info!(
            fid = format.code(),
            tiles = osm_tiles.len() + srtm_tiles.len(),
            output = %output.display(),
            "joining maps"
        );
        self.run(args)
    }
}
