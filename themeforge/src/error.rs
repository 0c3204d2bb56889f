//! Error types for the generation pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Validation failure in a theme configuration.
///
/// Always fatal to the current request and reported with a
/// field-specific message; never retried automatically.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Theme name is empty or whitespace
    #[error("theme name is required and must not be empty")]
    EmptyName,

    /// Theme name contains disallowed punctuation
    #[error("theme name contains disallowed punctuation: {0:?}")]
    InvalidNamePunctuation(char),

    /// Slug cannot be used to build identifiers
    #[error("theme slug {0:?} cannot be used to generate valid function and class names")]
    InvalidSlug(String),

    /// Author URI is not an absolute http(s) URI
    #[error("author URI {0:?} is not a valid absolute URI (be sure to include http://)")]
    InvalidAuthorUri(String),
}

/// Failure while downloading the upstream archive.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, timeout, non-success status)
    #[error("failed to download {url}")]
    Network {
        /// URL that was being fetched
        url: String,
        /// Underlying transport error
        #[source]
        source: Box<ureq::Error>,
    },

    /// Destination file could not be opened or written
    #[error("failed to write downloaded archive to {path}")]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Failure while extracting the upstream archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file is not a readable zip archive
    #[error("archive {path} could not be opened as a zip file")]
    Corrupt {
        /// Archive path
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// Write failure while unpacking entries
    #[error("failed to extract archive into {path}")]
    Io {
        /// Extraction target
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Failure while building the output archive.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The output archive file could not be created
    #[error("failed to create output archive at {path}")]
    Open {
        /// Archive path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be added to the archive
    #[error("failed to add {entry} to the output archive")]
    Write {
        /// Entry name inside the archive
        entry: String,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// The archive's central directory could not be written
    #[error("failed to finalize the output archive")]
    Finish(#[source] zip::result::ZipError),

    /// The finished archive could not be read back
    #[error("failed to read finished archive at {path}")]
    Read {
        /// Archive path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Umbrella error for a generation request.
///
/// Every variant is terminal for the request; the shared upstream cache
/// is never left corrupted and the per-request staging directory is
/// cleaned up before this surfaces to the caller.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Invalid theme configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Upstream download failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Upstream archive extraction failed
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Output packaging failed
    #[error(transparent)]
    Package(#[from] PackageError),

    /// Directory creation, copy, or deletion failed
    #[error("filesystem operation failed on {path}")]
    Io {
        /// Path the operation was touching
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
