//! Cache freshness decision for the downloaded upstream archive
//!
//! The archive's modification time is the only persisted cache state;
//! there is no separate metadata file. The decision itself is a pure
//! function so it can be tested without touching the network.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Default cache expiry: refetch the upstream archive after 30 minutes.
pub const DEFAULT_EXPIRY_SECS: u64 = 1800;

/// Snapshot of the cached archive taken at the start of a run.
#[derive(Debug, Clone)]
pub struct CacheState {
    /// Where the cached archive lives
    pub archive_path: PathBuf,
    /// Modification time of the archive, `None` when it is absent
    pub last_fetch: Option<SystemTime>,
    /// Seconds after which the cached archive is considered stale
    pub expiry_secs: u64,
    /// Skip the cache entirely and always refetch
    pub bypass: bool,
}

impl CacheState {
    /// Probe the filesystem for the archive's modification time.
    #[must_use]
    pub fn probe(archive_path: &Path, expiry_secs: u64, bypass: bool) -> Self {
        let last_fetch = std::fs::metadata(archive_path)
            .and_then(|meta| meta.modified())
            .ok();
        Self {
            archive_path: archive_path.to_path_buf(),
            last_fetch,
            expiry_secs,
            bypass,
        }
    }

    /// Whether the fetch step must re-run.
    ///
    /// True when the cache is bypassed, the archive is absent, the
    /// expiry window is zero, or the archive is older than the window.
    /// A modification time in the future (clock skew) counts as fresh
    /// so a skewed clock cannot trigger refetch loops.
    #[must_use]
    pub fn needs_refresh(&self, now: SystemTime) -> bool {
        if self.bypass {
            return true;
        }
        let Some(last_fetch) = self.last_fetch else {
            return true;
        };
        if self.expiry_secs == 0 {
            return true;
        }
        match now.duration_since(last_fetch) {
            Ok(elapsed) => elapsed.as_secs() >= self.expiry_secs,
            Err(_) => false,
        }
    }
}
