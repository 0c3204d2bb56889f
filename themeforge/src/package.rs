//! Packaging: walk the prototype tree, rewrite, and zip under the slug

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::ThemeConfig;
use crate::error::PackageError;
use crate::fsutil::walk_files;
use crate::rewrite::RewriteEngine;

/// The SCSS entry point that is renamed after the theme slug.
const SCSS_ENTRY_POINT: &str = "assets/scss/foundation.scss";

/// A finished theme archive, ready to stream to the caller.
#[derive(Debug)]
pub struct PackagedTheme {
    /// Suggested download filename, `<slug>.zip`
    pub filename: String,
    /// Complete zip archive content
    pub bytes: Vec<u8>,
}

/// Walk `prototype_dir`, rewrite every surviving file, and collect the
/// results into a single zip archive rooted at the theme slug.
///
/// The archive is assembled in a temporary file next to the prototype
/// directory, read back, and deleted before returning; it never
/// outlives the request, on success or failure. Cleaning up the
/// prototype directory itself is the caller's job.
///
/// # Errors
///
/// [`PackageError::Open`] when the temporary archive cannot be
/// created, [`PackageError::Write`] when an entry cannot be added,
/// [`PackageError::Read`] when the tree walk or the final read-back
/// fails.
pub fn package(
    prototype_dir: &Path,
    config: &ThemeConfig,
    excluded_files: &[&str],
    excluded_dirs: &[&str],
) -> Result<PackagedTheme, PackageError> {
    let archive_path = prototype_dir.with_extension("zip");
    let built = build_archive(
        prototype_dir,
        &archive_path,
        config,
        excluded_files,
        excluded_dirs,
    );
    let bytes = built.and_then(|count| {
        let bytes = fs::read(&archive_path).map_err(|source| PackageError::Read {
            path: archive_path.clone(),
            source,
        })?;
        tracing::info!(slug = %config.slug, entries = count, size = bytes.len(), "packaged theme");
        Ok(bytes)
    });
    let _ = fs::remove_file(&archive_path);
    Ok(PackagedTheme {
        filename: format!("{}.zip", config.slug),
        bytes: bytes?,
    })
}

fn build_archive(
    prototype_dir: &Path,
    archive_path: &Path,
    config: &ThemeConfig,
    excluded_files: &[&str],
    excluded_dirs: &[&str],
) -> Result<usize, PackageError> {
    let file = File::create(archive_path).map_err(|source| PackageError::Open {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut zip = ZipWriter::new(file);
    // Fixed entry timestamp: identical configs must yield identical
    // archives, with no wall-clock dependence.
    let options = SimpleFileOptions::default().last_modified_time(zip::DateTime::default());
    let engine = RewriteEngine::new(config);
    let mut count = 0_usize;

    for entry in walk_files(prototype_dir, excluded_files, excluded_dirs) {
        let entry = entry.map_err(|err| PackageError::Read {
            path: prototype_dir.to_path_buf(),
            source: err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
        })?;

        let relative = entry.relative_path.to_string_lossy().replace('\\', "/");
        let local_name = if relative == SCSS_ENTRY_POINT {
            format!("assets/scss/{}.scss", config.slug)
        } else {
            relative
        };

        let contents = fs::read(&entry.source_path).map_err(|source| PackageError::Read {
            path: entry.source_path.clone(),
            source,
        })?;
        let rewritten = engine.rewrite(&contents, &local_name);

        let entry_name = format!("{}/{local_name}", config.slug);
        zip.start_file(entry_name.as_str(), options)
            .map_err(|source| PackageError::Write {
                entry: entry_name.clone(),
                source,
            })?;
        zip.write_all(&rewritten)
            .map_err(|source| PackageError::Write {
                entry: entry_name,
                source: zip::result::ZipError::Io(source),
            })?;
        count += 1;
    }

    zip.finish().map_err(PackageError::Finish)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeRequest;
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::TempDir;

    fn config(name: &str) -> ThemeConfig {
        ThemeConfig::from_request(&ThemeRequest {
            name: name.to_owned(),
            ..ThemeRequest::default()
        })
        .unwrap()
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn entries(bytes: &[u8]) -> BTreeMap<String, String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut out = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).unwrap();
            let mut contents = String::new();
            file.read_to_string(&mut contents).unwrap();
            out.insert(file.name().to_owned(), contents);
        }
        out
    }

    #[test]
    fn archive_is_rooted_at_the_slug_and_rewritten() {
        let dir = TempDir::new().unwrap();
        let proto = dir.path().join("proto");
        write(&proto.join("style.css"), "Theme Name: FoundationPress\n");
        write(&proto.join("functions.php"), "foundationpress_setup();");
        write(&proto.join("assets/scss/foundation.scss"), "$gutter: 1rem;");
        write(&proto.join(".github/ci.yml"), "ci");
        write(&proto.join("README.md"), "dev docs");

        let theme = package(
            &proto,
            &config("Acme Starter"),
            &["README.md"],
            &[".github"],
        )
        .unwrap();
        assert_eq!(theme.filename, "acme-starter.zip");

        let entries = entries(&theme.bytes);
        assert_eq!(
            entries.get("acme-starter/style.css").unwrap(),
            "Theme Name: Acme Starter\n"
        );
        assert_eq!(
            entries.get("acme-starter/functions.php").unwrap(),
            "acme_starter_setup();"
        );
        assert!(
            entries.contains_key("acme-starter/assets/scss/acme-starter.scss"),
            "scss entry point is renamed after the slug"
        );
        assert!(!entries.keys().any(|name| name.contains("README.md")));
        assert!(!entries.keys().any(|name| name.contains(".github")));
    }

    #[test]
    fn temporary_archive_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let proto = dir.path().join("proto");
        write(&proto.join("index.php"), "<?php");

        package(&proto, &config("Acme Starter"), &[], &[]).unwrap();
        assert_eq!(
            fs::read_dir(dir.path()).unwrap().count(),
            1,
            "only the prototype directory remains"
        );
    }

    #[test]
    fn missing_prototype_read_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        let result = package(
            &dir.path().join("missing"),
            &config("Acme Starter"),
            &[],
            &[],
        );
        assert!(matches!(result, Err(PackageError::Read { .. })));
    }
}
