//! Default command names, patterns and transfer limits.

/// Name of the map compiler binary, expected inside the working directory.
pub const GMT_COMMAND: &str = "gmt.exe";

/// Compatibility layer used to run the compiler on POSIX hosts.
pub const WINE_COMMAND: &str = "wine";

/// External archive extraction utility, resolved from `PATH`.
pub const SEVENZIP_COMMAND: &str = "7z";

/// Canonical style filename the compiler expects; the selected `*.TYP` file
/// is copied to this name before any compiler invocation.
pub const CANONICAL_STYLE_FILENAME: &str = "01002468.TYP";

/// Default destination image filename.
pub const DEFAULT_OUTPUT_IMAGE: &str = "gmapsupp.img";

/// Default glob for the regional tile files to combine.
pub const DEFAULT_TILE_PATTERN: &str = "[7,6]*.img";

/// Glob for downloaded installer archives eligible for extraction.
pub const DEFAULT_INSTALLER_PATTERN: &str = "mtb*.exe";

/// Subdirectory of the working directory that holds downloaded archives.
/// `.` means the working directory itself.
pub const DEFAULT_DOWNLOAD_SUBDIR: &str = ".";

/// Metadata label stamped into the combined image.
pub const DEFAULT_METADATA_LABEL: &str = "openmtbmap_srtm";

/// Connection timeout for archive downloads (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Total per-transfer timeout for archive downloads (seconds).
pub const TRANSFER_TIMEOUT_SECS: u64 = 3600;

/// Maximum number of HTTP redirects followed per download.
pub const MAX_REDIRECTS: usize = 5;
