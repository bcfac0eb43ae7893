//! Conditional HTTP transfer of map archives.
//!
//! Downloads a remote archive to a local path, asking the server to skip the
//! body when the local copy is already current (`If-Modified-Since`). The
//! body streams into a `.part` sibling and is renamed over the destination
//! only once complete, so an interrupted transfer never leaves a truncated
//! file that looks finished.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::IF_MODIFIED_SINCE;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::defaults::{CONNECT_TIMEOUT_SECS, MAX_REDIRECTS, TRANSFER_TIMEOUT_SECS};

/// Errors that can occur while fetching an archive.
///
/// Every variant carries the triggering URL; a transfer failure is always
/// fatal for the run.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request itself failed (network error, timeout, too many redirects).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// Writing the response body to disk failed.
    #[error("failed to write {path} while fetching {url}: {source}")]
    Write {
        url: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Fetches a remote resource to a local path.
///
/// This seam lets the pipeline be driven with a mock in tests instead of a
/// live HTTP stack.
pub trait Fetcher {
    /// Fetch `url` into `local_path`, skipping the transfer when the server
    /// reports the resource unchanged since the local copy's mtime.
    fn fetch(&self, local_path: &Path, url: &str) -> Result<(), TransferError>;
}

/// Production [`Fetcher`] over a blocking reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the transfer limits from [`crate::config::defaults`]:
    /// 30 s connect timeout, 3600 s total timeout, at most 5 redirect hops.
    pub fn new() -> Result<Self, TransferError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TRANSFER_TIMEOUT_SECS))
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(TransferError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, local_path: &Path, url: &str) -> Result<(), TransferError> {
        let mut request = self.client.get(url);

        if let Ok(metadata) = fs::metadata(local_path) {
            if let Ok(modified) = metadata.modified() {
                request = request.header(IF_MODIFIED_SINCE, http_date(modified));
            }
        }

        let mut response = request.send().map_err(|e| TransferError::Request {
            url: url.to_string(),
            source: e,
        })?;

        if response.status() == StatusCode::NOT_MODIFIED {
            debug!(url, "archive unchanged on server, keeping local copy");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let part = partial_path(local_path);
        let mut file = fs::File::create(&part).map_err(|e| TransferError::Write {
            url: url.to_string(),
            path: part.clone(),
            source: e,
        })?;
        io::copy(&mut response, &mut file).map_err(|e| TransferError::Write {
            url: url.to_string(),
            path: part.clone(),
            source: e,
        })?;
        drop(file);

        fs::rename(&part, local_path).map_err(|e| TransferError::Write {
            url: url.to_string(),
            path: local_path.to_path_buf(),
            source: e,
        })?;

        info!(url, path = %local_path.display(), "archive downloaded");
        Ok(())
    }
}

/// RFC 7231 date for the `If-Modified-Since` header.
fn http_date(time: SystemTime) -> String {
    let utc: DateTime<Utc> = time.into();
    utc.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Sibling path the body streams into before the final rename.
fn partial_path(local_path: &Path) -> PathBuf {
    match local_path.file_name() {
        Some(name) => {
            let mut partial = name.to_os_string();
            partial.push(".part");
            local_path.with_file_name(partial)
        }
        None => local_path.with_file_name(".part"),
    }
}
