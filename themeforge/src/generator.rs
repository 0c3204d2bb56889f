//! Pipeline orchestrator: cache check, fetch, stage, validate, package
//!
//! Each generation request is an independent, stateless run. The only
//! shared state is the on-disk cache of the fetched upstream archive;
//! per-request staging lives under a config-hash-derived directory and
//! is removed on every exit path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{CacheState, DEFAULT_EXPIRY_SECS};
use crate::config::{ThemeConfig, ThemeRequest};
use crate::error::GenerateError;
use crate::fetch::{extract_archive, ArchiveSource};
use crate::fsutil::{ensure_directory, recursive_copy, recursive_delete};
use crate::package::{package, PackagedTheme};

/// Upstream theme archive on GitHub.
pub const UPSTREAM_REPO_URL: &str =
    "https://github.com/olefredrik/FoundationPress/archive/master.zip";
/// File name the downloaded archive is cached under.
pub const UPSTREAM_ARCHIVE_FILE: &str = "master.zip";
/// Root folder name inside the upstream archive.
pub const UPSTREAM_ROOT: &str = "FoundationPress-master";

/// Repository housekeeping files left out of generated themes. Applied
/// to the top level of the staging copy and to packaging.
pub const EXCLUDED_FILES: &[&str] = &[
    ".travis.yml",
    "codesniffer.ruleset.xml",
    "README.md",
    "CONTRIBUTING.md",
    ".git",
    ".svn",
    ".DS_Store",
    ".gitignore",
];

/// Directory subtrees left out of generated themes.
pub const EXCLUDED_DIRS: &[&str] = &[".git", ".github", ".svn"];

/// Pipeline stage, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Deciding whether the cached archive is still fresh
    CacheCheck,
    /// Downloading and extracting the upstream archive
    Fetching,
    /// Copying the cached extraction into a per-request prototype
    Staging,
    /// Re-asserting configuration invariants
    Validating,
    /// Rewriting and zipping the prototype
    Packaging,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CacheCheck => "cache-check",
            Self::Fetching => "fetching",
            Self::Staging => "staging",
            Self::Validating => "validating",
            Self::Packaging => "packaging",
        };
        f.write_str(name)
    }
}

/// Where the generator works and which upstream it mirrors.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Directory holding the cached archive, the cached extraction,
    /// and per-request staging under `tmp/`
    pub build_dir: PathBuf,
    /// Upstream archive URL
    pub repo_url: String,
    /// File name for the cached archive
    pub archive_file: String,
    /// Root folder name inside the archive
    pub upstream_root: String,
    /// Seconds before the cached archive goes stale
    pub cache_expiry_secs: u64,
    /// Always refetch, ignoring the cache
    pub bypass_cache: bool,
}

impl GeneratorSettings {
    /// Settings pointing at the upstream FoundationPress repository.
    #[must_use]
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            repo_url: UPSTREAM_REPO_URL.to_owned(),
            archive_file: UPSTREAM_ARCHIVE_FILE.to_owned(),
            upstream_root: UPSTREAM_ROOT.to_owned(),
            cache_expiry_secs: DEFAULT_EXPIRY_SECS,
            bypass_cache: false,
        }
    }
}

/// The fetch-cache-transform-package pipeline.
#[derive(Debug)]
pub struct Generator<S> {
    settings: GeneratorSettings,
    source: S,
}

impl<S: ArchiveSource> Generator<S> {
    /// Create a generator over the given archive source.
    pub fn new(settings: GeneratorSettings, source: S) -> Self {
        Self { settings, source }
    }

    /// Run one generation request end to end.
    ///
    /// The raw fields are validated into a [`ThemeConfig`] before
    /// anything touches the network, so an invalid request never
    /// triggers a fetch. A failed run leaves the shared cached
    /// extraction intact and never leaves its staging directory
    /// behind.
    ///
    /// # Errors
    ///
    /// Any [`GenerateError`] variant; all are terminal for the request.
    pub fn generate(&self, request: &ThemeRequest) -> Result<PackagedTheme, GenerateError> {
        let config = ThemeConfig::from_request(request)?;
        tracing::info!(name = %config.name, slug = %config.slug, "generation request accepted");

        let settings = &self.settings;
        ensure_directory(&settings.build_dir, false)?;

        tracing::debug!(stage = %Stage::CacheCheck, "checking cached archive");
        let archive_path = settings.build_dir.join(&settings.archive_file);
        let cache = CacheState::probe(
            &archive_path,
            settings.cache_expiry_secs,
            settings.bypass_cache,
        );
        let cached_root = settings.build_dir.join(&settings.upstream_root);
        if cache.needs_refresh(SystemTime::now()) {
            tracing::info!(stage = %Stage::Fetching, url = %settings.repo_url, "refreshing upstream archive");
            self.source.fetch(&settings.repo_url, &archive_path)?;
            self.install_extraction(&archive_path)?;
        } else if !cached_root.is_dir() {
            // Fresh archive but the extraction was cleared out from
            // under us: re-extract rather than staging an empty tree.
            tracing::info!(stage = %Stage::Fetching, "cached extraction missing, re-extracting");
            self.install_extraction(&archive_path)?;
        }

        tracing::debug!(stage = %Stage::Staging, "staging prototype copy");
        let staging = settings
            .build_dir
            .join("tmp")
            .join(format!("{}-{}", settings.upstream_root, config.content_hash()));
        let _guard = StagingGuard::new(staging.clone());
        recursive_copy(&cached_root, &staging, EXCLUDED_FILES)?;

        tracing::debug!(stage = %Stage::Validating, "re-asserting config invariants");
        config.validate()?;

        tracing::debug!(stage = %Stage::Packaging, "packaging theme");
        let theme = package(&staging, &config, EXCLUDED_FILES, EXCLUDED_DIRS)?;
        Ok(theme)
    }

    /// Extract into a scratch directory and swap the root into place,
    /// so a concurrent staging step never sees a half-extracted tree.
    fn install_extraction(&self, archive_path: &Path) -> Result<(), GenerateError> {
        let settings = &self.settings;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.subsec_nanos());
        let scratch = settings
            .build_dir
            .join(format!(".extract-{}-{nanos}", std::process::id()));
        ensure_directory(&scratch, true)?;

        let result = extract_archive(archive_path, &scratch)
            .map_err(GenerateError::from)
            .and_then(|()| {
                let extracted_root = scratch.join(&settings.upstream_root);
                let cached_root = settings.build_dir.join(&settings.upstream_root);
                if cached_root.exists() {
                    recursive_delete(&cached_root)?;
                }
                fs::rename(&extracted_root, &cached_root)
                    .map_err(|err| GenerateError::io(&cached_root, err))
            });
        if let Err(err) = recursive_delete(&scratch) {
            tracing::warn!(error = %err, "failed to clear extraction scratch directory");
        }
        result
    }
}

/// Removes the per-request staging directory when dropped, so cleanup
/// runs on every exit path, error paths included.
struct StagingGuard {
    path: PathBuf,
}

impl StagingGuard {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if let Err(err) = recursive_delete(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to remove staging directory");
        }
    }
}
