//! Theme configuration: raw request fields, defaults, and validation
//!
//! A [`ThemeConfig`] is created once per generation request from the
//! user-supplied fields plus upstream defaults, validated eagerly, and
//! passed immutably through the rest of the pipeline. Per-request data
//! is never stored on a long-lived object.

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::ConfigError;

/// Default Theme URI header value, kept from the upstream theme.
const DEFAULT_URI: &str = "https://foundationpress.olefredrik.com";
/// Default author, kept from the upstream theme.
const DEFAULT_AUTHOR: &str = "Ole Fredrik Lie";
/// Default author URI, kept from the upstream theme.
const DEFAULT_AUTHOR_URI: &str = "http://olefredrik.com/";
/// Default description when the request leaves it blank.
const DEFAULT_DESCRIPTION: &str = "Description";

/// Punctuation that may not appear in a theme name.
const NAME_BLACKLIST: &[char] = &[
    '\'', '^', '£', '$', '%', '&', '*', '(', ')', '}', '{', '@', '#', '~', '?', '>', '<', ',',
    '|', '=', '+', '¬', '"',
];

/// Identifier pattern the slug must satisfy so it can be turned into
/// function and class name prefixes.
static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("slug pattern is valid"));

/// Absolute http(s) URI: scheme, host labels, optional port and path.
static URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9-]+(\.[a-z0-9-]+)*(:[0-9]+)?(/.*)?$")
        .expect("uri pattern is valid")
});

/// Raw field set collected by the hosting collaborator.
///
/// Empty strings and `None` are equivalent: both fall back to the
/// defaults carried over from the upstream theme.
#[derive(Debug, Clone, Default)]
pub struct ThemeRequest {
    /// Display name of the generated theme (required)
    pub name: String,
    /// Identifier-safe slug; derived from `name` when absent
    pub slug: Option<String>,
    /// Author name
    pub author: Option<String>,
    /// Author URI
    pub author_uri: Option<String>,
    /// One-line theme description
    pub description: Option<String>,
}

/// Validated, immutable configuration for a single generation run.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeConfig {
    /// Display name
    pub name: String,
    /// Identifier-safe slug (lowercase, hyphen-separated)
    pub slug: String,
    /// Theme URI header value
    pub uri: String,
    /// Author name
    pub author: String,
    /// Author URI header value
    pub author_uri: String,
    /// Theme description
    pub description: String,
}

impl ThemeConfig {
    /// Build and validate a configuration from raw request fields.
    ///
    /// # Errors
    ///
    /// Returns a field-specific [`ConfigError`] when the name is empty
    /// or contains blacklisted punctuation, the slug cannot serve as an
    /// identifier prefix, or the author URI is not an absolute http(s)
    /// URI.
    pub fn from_request(request: &ThemeRequest) -> Result<Self, ConfigError> {
        let name = request.name.trim().to_owned();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }

        let slug = match nonempty(request.slug.as_deref()) {
            Some(given) => given.to_lowercase(),
            None => name.to_case(Case::Kebab),
        };

        let config = Self {
            name,
            slug,
            uri: DEFAULT_URI.to_owned(),
            author: nonempty(request.author.as_deref())
                .unwrap_or(DEFAULT_AUTHOR)
                .to_owned(),
            author_uri: nonempty(request.author_uri.as_deref())
                .unwrap_or(DEFAULT_AUTHOR_URI)
                .to_owned(),
            description: nonempty(request.description.as_deref())
                .unwrap_or(DEFAULT_DESCRIPTION)
                .to_owned(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-assert every configuration invariant.
    ///
    /// Construction already validates; the pipeline's validating stage
    /// calls this again before packaging so no partial generation can
    /// proceed with a config that stopped holding its invariants.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`ThemeConfig::from_request`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if let Some(bad) = self.name.chars().find(|c| NAME_BLACKLIST.contains(c)) {
            return Err(ConfigError::InvalidNamePunctuation(bad));
        }
        if !SLUG_PATTERN.is_match(&self.slug) {
            return Err(ConfigError::InvalidSlug(self.slug.clone()));
        }
        if !URI_PATTERN.is_match(&self.author_uri) {
            return Err(ConfigError::InvalidAuthorUri(self.author_uri.clone()));
        }
        Ok(())
    }

    /// Slug with hyphens replaced by underscores, the function-name
    /// prefix form.
    #[must_use]
    pub fn slug_underscored(&self) -> String {
        self.slug.replace('-', "_")
    }

    /// Class-name prefix form: each underscore-separated segment of the
    /// underscored slug capitalized (`my-theme` becomes `My_Theme`).
    #[must_use]
    pub fn class_prefix(&self) -> String {
        self.slug_underscored()
            .split('_')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Display name with spaces replaced by underscores, used for the
    /// `@package` and `@since` declarations.
    #[must_use]
    pub fn name_underscored(&self) -> String {
        self.name.replace(' ', "_")
    }

    /// Deterministic content hash of the configuration, used to derive
    /// the per-request staging directory name so concurrent requests
    /// never collide.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let json = serde_json::to_string(self).expect("config serializes to JSON");
        let digest = Sha256::digest(json.as_bytes());
        hex::encode(digest)[..32].to_owned()
    }
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
