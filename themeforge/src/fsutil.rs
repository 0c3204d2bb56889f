//! Directory utilities: ensure, copy, delete, and exclusion-aware walks

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::GenerateError;

/// One file surviving an exclusion-aware tree walk.
///
/// Produced lazily by [`walk_files`] and consumed once by the packager.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path on disk
    pub source_path: PathBuf,
    /// Path relative to the walked root
    pub relative_path: PathBuf,
}

/// Create `path` and all missing ancestors; no-op when it already is a
/// directory. With `reset_if_exists`, an existing directory is deleted
/// recursively first so the caller starts from a clean staging area.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] when creation is blocked, for example
/// by a non-directory file occupying the path.
pub fn ensure_directory(path: &Path, reset_if_exists: bool) -> Result<(), GenerateError> {
    if reset_if_exists && path.is_dir() {
        recursive_delete(path)?;
    }
    fs::create_dir_all(path).map_err(|err| GenerateError::io(path, err))
}

/// Copy every file and subdirectory from `source` into `target`.
///
/// A `source` that is not a directory is a silent no-op, not an error:
/// `target` is left untouched and the caller is expected to have
/// checked (or re-created) the source tree beforehand, as the
/// orchestrator does when the cached extraction has gone missing.
///
/// Exclusions are matched against the first-level listing of the
/// directory being copied and are not passed down when recursing, so in
/// practice only the top-level entries of `source` are filtered. An
/// entry with an excluded name nested one level deep is still copied.
/// Downstream archives rely on nested dotfiles surviving, so this
/// asymmetry is load-bearing.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] on the first failed read or write; a
/// partial copy is treated as a failed copy by the caller.
pub fn recursive_copy(
    source: &Path,
    target: &Path,
    root_exclusions: &[&str],
) -> Result<(), GenerateError> {
    if !source.is_dir() {
        return Ok(());
    }
    ensure_directory(target, true)?;
    copy_level(source, target, root_exclusions)
}

fn copy_level(source: &Path, target: &Path, exclusions: &[&str]) -> Result<(), GenerateError> {
    let entries = fs::read_dir(source).map_err(|err| GenerateError::io(source, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| GenerateError::io(source, err))?;
        let name = entry.file_name();
        if exclusions
            .iter()
            .any(|excluded| name.to_string_lossy() == *excluded)
        {
            continue;
        }
        let child_source = entry.path();
        let child_target = target.join(&name);
        let file_type = entry
            .file_type()
            .map_err(|err| GenerateError::io(&child_source, err))?;
        if file_type.is_dir() {
            ensure_directory(&child_target, false)?;
            copy_level(&child_source, &child_target, &[])?;
        } else {
            fs::copy(&child_source, &child_target)
                .map_err(|err| GenerateError::io(&child_source, err))?;
        }
    }
    Ok(())
}

/// Delete `path` and everything under it, children before parents.
///
/// A single entry that cannot be removed (already gone, dangling
/// symlink) is logged and skipped so one stubborn file does not strand
/// the rest of the tree; the parent removal is still attempted.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] when `path` itself still exists after
/// the sweep.
pub fn recursive_delete(path: &Path) -> Result<(), GenerateError> {
    for entry in WalkDir::new(path).contents_first(true).into_iter() {
        let Ok(entry) = entry else {
            continue;
        };
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };
        if let Err(err) = result {
            tracing::warn!(path = %entry.path().display(), error = %err, "failed to delete entry");
        }
    }
    if path.exists() {
        return Err(GenerateError::io(
            path,
            std::io::Error::other("directory could not be fully deleted"),
        ));
    }
    Ok(())
}

/// Lazily walk `root`, yielding every file that survives the
/// exclusions: a file whose base name is in `excluded_files` is
/// skipped, and any subtree whose directory name matches
/// `excluded_dirs` is pruned entirely.
pub fn walk_files<'a>(
    root: &'a Path,
    excluded_files: &'a [&'a str],
    excluded_dirs: &'a [&'a str],
) -> impl Iterator<Item = walkdir::Result<FileEntry>> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !excluded_dirs.iter().any(|excluded| name == *excluded)
        })
        .filter_map(move |result| {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let name = entry.file_name().to_string_lossy();
            if excluded_files.iter().any(|excluded| name == *excluded) {
                return None;
            }
            let relative_path = entry
                .path()
                .strip_prefix(root)
                .expect("walked entries live under the walk root")
                .to_path_buf();
            Some(Ok(FileEntry {
                source_path: entry.into_path(),
                relative_path,
            }))
        })
}
