//! End-to-end pipeline tests over a stubbed archive source

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use themeforge::{
    ArchiveSource, ConfigError, FetchError, GenerateError, Generator, GeneratorSettings,
    ThemeRequest,
};

/// Archive source that serves fixture bytes and counts invocations.
#[derive(Clone)]
struct StubSource {
    fixture: Arc<Vec<u8>>,
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl StubSource {
    fn new(fixture: Vec<u8>) -> Self {
        Self {
            fixture: Arc::new(fixture),
            calls: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    fn failing(&self) -> Self {
        Self {
            fixture: Arc::clone(&self.fixture),
            calls: Arc::clone(&self.calls),
            fail: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArchiveSource for StubSource {
    fn fetch(&self, _url: &str, destination: &Path) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::Io {
                path: destination.to_path_buf(),
                source: std::io::Error::other("stub transport failure"),
            });
        }
        fs::write(destination, self.fixture.as_slice()).map_err(|source| FetchError::Io {
            path: destination.to_path_buf(),
            source,
        })
    }
}

const STYLESHEET: &str = "/*\n\
Theme Name: FoundationPress\n\
Theme URI: https://foundationpress.olefredrik.com\n\
Author: Ole Fredrik Lie\n\
Author URI: http://olefredrik.com/\n\
Description: FoundationPress is a WordPress starter theme.\n\
Text Domain: foundationpress\n\
FoundationPress is distributed under the terms of the GNU GPL v2 or later.\n\
*/\n";

/// Build a fixture of the upstream archive with its known root folder.
fn upstream_fixture() -> Vec<u8> {
    let entries: &[(&str, &[u8])] = &[
        ("FoundationPress-master/style.css", STYLESHEET.as_bytes()),
        (
            "FoundationPress-master/functions.php",
            b"<?php\n/**\n * @package FoundationPress\n */\nfunction foundationpress_setup() {}\nnew Foundationpress_Walker();\nload_theme_textdomain( 'foundationpress' );\n",
        ),
        (
            "FoundationPress-master/assets/scss/foundation.scss",
            b"$global-width: rem-calc(1200);\n",
        ),
        (
            "FoundationPress-master/gulpfile.js",
            b"gulp.src('assets/scss/foundation.scss');\n",
        ),
        (
            "FoundationPress-master/readme.txt",
            b"== Description ==\nFoundationPress pitch.\n== Installation ==\n1. Upload.\n",
        ),
        (
            "FoundationPress-master/screenshot.png",
            &[0x89, b'P', b'N', b'G', 0x0d, 0x0a],
        ),
        ("FoundationPress-master/README.md", b"contributor docs"),
        (
            "FoundationPress-master/.github/workflows/build.yml",
            b"on: push",
        ),
    ];
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn archive_entries(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).unwrap();
        out.insert(file.name().to_owned(), contents);
    }
    out
}

fn request(name: &str) -> ThemeRequest {
    ThemeRequest {
        name: name.to_owned(),
        author_uri: Some("http://acme.example/".to_owned()),
        ..ThemeRequest::default()
    }
}

#[test]
fn end_to_end_generation_renames_and_repackages() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());

    let theme = generator.generate(&request("Acme Starter")).unwrap();
    assert_eq!(source.calls(), 1);
    assert_eq!(theme.filename, "acme-starter.zip");

    let entries = archive_entries(&theme.bytes);
    assert!(
        entries.keys().all(|name| name.starts_with("acme-starter/")),
        "all entries live under the renamed root"
    );

    let style = String::from_utf8(entries["acme-starter/style.css"].clone()).unwrap();
    assert!(style.contains("Theme Name: Acme Starter\n"));
    assert!(style.contains("Author URI: http://acme.example/\n"));
    assert!(style.contains("Text Domain: acme-starter\n"));
    assert!(
        style.contains("FoundationPress is distributed under the terms"),
        "license attribution still credits upstream"
    );

    let functions = String::from_utf8(entries["acme-starter/functions.php"].clone()).unwrap();
    assert!(functions.contains("@package Acme_Starter"));
    assert!(functions.contains("acme_starter_setup"));
    assert!(functions.contains("Acme_Starter_Walker"));
    assert!(functions.contains("load_theme_textdomain( 'acme-starter' )"));

    assert!(entries.contains_key("acme-starter/assets/scss/acme-starter.scss"));
    let gulpfile = String::from_utf8(entries["acme-starter/gulpfile.js"].clone()).unwrap();
    assert!(gulpfile.contains("assets/scss/acme-starter.scss"));

    assert_eq!(
        entries["acme-starter/screenshot.png"],
        vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a],
        "binary assets pass through untouched"
    );
    assert!(!entries.keys().any(|name| name.contains("README.md")));
    assert!(!entries.keys().any(|name| name.contains(".github")));

    // Cache artifacts persist, per-request staging does not.
    assert!(build.path().join("master.zip").is_file());
    assert!(build.path().join("FoundationPress-master").is_dir());
    let staged: Vec<_> = fs::read_dir(build.path().join("tmp")).unwrap().collect();
    assert!(staged.is_empty(), "staging directory is removed after the run");
}

#[test]
fn warm_cache_skips_the_fetch_and_bypass_forces_it() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());

    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());
    generator.generate(&request("First Theme")).unwrap();
    assert_eq!(source.calls(), 1);

    generator.generate(&request("Second Theme")).unwrap();
    assert_eq!(source.calls(), 1, "fresh cache serves the second request");

    let mut bypass_settings = GeneratorSettings::new(build.path());
    bypass_settings.bypass_cache = true;
    let bypassing = Generator::new(bypass_settings, source.clone());
    bypassing.generate(&request("Third Theme")).unwrap();
    assert_eq!(source.calls(), 2, "bypass refetches regardless of freshness");
}

#[test]
fn invalid_name_fails_before_any_fetch() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());

    let result = generator.generate(&ThemeRequest::default());
    assert!(matches!(
        result,
        Err(GenerateError::Config(ConfigError::EmptyName))
    ));
    assert_eq!(source.calls(), 0, "invalid configs never reach the network");
}

#[test]
fn invalid_author_uri_fails_with_a_field_specific_error() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());

    let result = generator.generate(&ThemeRequest {
        name: "Acme Starter".to_owned(),
        author_uri: Some("not-a-url".to_owned()),
        ..ThemeRequest::default()
    });
    assert!(matches!(
        result,
        Err(GenerateError::Config(ConfigError::InvalidAuthorUri(uri))) if uri == "not-a-url"
    ));
    assert_eq!(source.calls(), 0);
}

#[test]
fn failed_refetch_leaves_the_cached_archive_intact() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());
    generator.generate(&request("Acme Starter")).unwrap();
    let cached = fs::read(build.path().join("master.zip")).unwrap();

    let mut stale_settings = GeneratorSettings::new(build.path());
    stale_settings.cache_expiry_secs = 0;
    let failing = Generator::new(stale_settings, source.failing());
    let result = failing.generate(&request("Acme Starter"));
    assert!(matches!(result, Err(GenerateError::Fetch(_))));

    assert_eq!(
        fs::read(build.path().join("master.zip")).unwrap(),
        cached,
        "a failed fetch must not overwrite a good cached archive"
    );
    assert!(
        build.path().join("FoundationPress-master").is_dir(),
        "the shared cached extraction survives a failed request"
    );
}

#[test]
fn corrupt_upstream_archive_is_reported_and_staging_is_clean() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(b"definitely not a zip".to_vec());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source.clone());

    let result = generator.generate(&request("Acme Starter"));
    assert!(matches!(result, Err(GenerateError::Extract(_))));
    let tmp = build.path().join("tmp");
    if tmp.exists() {
        assert_eq!(fs::read_dir(&tmp).unwrap().count(), 0);
    }
}

#[test]
fn determinism_same_config_yields_identical_archives() {
    let build = TempDir::new().unwrap();
    let source = StubSource::new(upstream_fixture());
    let generator = Generator::new(GeneratorSettings::new(build.path()), source);

    let first = generator.generate(&request("Acme Starter")).unwrap();
    let second = generator.generate(&request("Acme Starter")).unwrap();
    assert_eq!(
        archive_entries(&first.bytes),
        archive_entries(&second.bytes),
        "rewriting is deterministic for a fixed config"
    );
}
