//! Upstream archive download and extraction

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ureq::Agent;

use crate::error::{ExtractError, FetchError};

/// Default bound on the whole download, connect included.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Source of the upstream theme archive.
///
/// The pipeline is generic over this seam so tests can stub the network
/// and count fetch invocations.
pub trait ArchiveSource {
    /// Stream the resource at `url` into `destination`.
    ///
    /// Implementations must not replace a previously valid archive at
    /// `destination` with a partial download: the production source
    /// writes to a temporary sibling and renames it into place only on
    /// success.
    ///
    /// # Errors
    ///
    /// [`FetchError::Network`] on transport failure, [`FetchError::Io`]
    /// when the destination cannot be opened or written.
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError>;
}

/// HTTP implementation backed by `ureq`, following redirects and
/// bounded by a global timeout.
#[derive(Debug, Clone)]
pub struct HttpArchiveSource {
    agent: Agent,
}

impl HttpArchiveSource {
    /// Create a source with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a source with a custom global timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for HttpArchiveSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), FetchError> {
        let response = self.agent.get(url).call().map_err(|err| {
            FetchError::Network {
                url: url.to_owned(),
                source: Box::new(err),
            }
        })?;

        // Download next to the destination and rename on success, so a
        // failed fetch never clobbers a previously good cached archive.
        // The partial name is request-unique: concurrent fetchers must
        // not interleave writes into a shared temporary file.
        let partial = partial_download_path(destination);
        let io_err = |source| FetchError::Io {
            path: partial.clone(),
            source,
        };

        let mut file = File::create(&partial).map_err(io_err)?;
        let mut reader = response.into_body().into_reader();
        if let Err(err) = io::copy(&mut reader, &mut file) {
            drop(file);
            let _ = fs::remove_file(&partial);
            return Err(io_err(err));
        }
        drop(file);

        fs::rename(&partial, destination).map_err(|source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        tracing::debug!(url, path = %destination.display(), "downloaded upstream archive");
        Ok(())
    }
}

/// Unique temporary sibling of `destination` for an in-flight
/// download. Two requests racing on the same refetch each write their
/// own partial file; whichever renames last wins with a complete
/// archive either way.
fn partial_download_path(destination: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    let file_name = destination
        .file_name()
        .map_or_else(|| "download".into(), |name| name.to_string_lossy());
    destination.with_file_name(format!(
        "{file_name}.part-{}-{nanos}",
        std::process::id()
    ))
}

/// Unpack `archive_path` into `destination_dir`, preserving the
/// archive's internal root folder name.
///
/// # Errors
///
/// [`ExtractError::Corrupt`] when the file is not a readable zip
/// archive, [`ExtractError::Io`] on write failure during extraction.
pub fn extract_archive(archive_path: &Path, destination_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|source| ExtractError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| ExtractError::Corrupt {
        path: archive_path.to_path_buf(),
        source,
    })?;
    archive
        .extract(destination_dir)
        .map_err(|err| match err {
            zip::result::ZipError::Io(source) => ExtractError::Io {
                path: destination_dir.to_path_buf(),
                source,
            },
            other => ExtractError::Corrupt {
                path: archive_path.to_path_buf(),
                source: other,
            },
        })?;
    tracing::debug!(
        archive = %archive_path.display(),
        destination = %destination_dir.display(),
        "extracted upstream archive"
    );
    Ok(())
}
