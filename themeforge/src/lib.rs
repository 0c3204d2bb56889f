//! Themeforge library
//!
//! Generates renamed, redistributable copies of the FoundationPress
//! starter theme: the upstream archive is fetched and cached, a fresh
//! per-request prototype is staged from it, a rule-driven set of
//! identifier and branding substitutions is applied across the tree,
//! and the result is repackaged as a single zip archive rooted at the
//! theme slug.
//!
//! The pipeline is a stateless function of a validated [`ThemeConfig`];
//! the hosting application (here, the CLI binary) only supplies the raw
//! request fields and streams the finished archive.

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fsutil;
pub mod generator;
pub mod package;
pub mod rewrite;

pub use cache::CacheState;
pub use config::{ThemeConfig, ThemeRequest};
pub use error::{ConfigError, ExtractError, FetchError, GenerateError, PackageError};
pub use fetch::{ArchiveSource, HttpArchiveSource};
pub use generator::{Generator, GeneratorSettings};
pub use package::PackagedTheme;
pub use rewrite::RewriteEngine;
