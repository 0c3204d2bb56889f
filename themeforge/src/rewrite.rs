//! Rule-driven identifier and branding rewriting
//!
//! The substitution cascade is an explicit ordered list of rules
//! evaluated top to bottom. Ordering is load-bearing: the generic
//! display-name replacement runs last so it cannot corrupt strings
//! already rewritten by the more specific rules before it.

use std::borrow::Cow;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::config::ThemeConfig;

/// Extensions eligible for rewriting; everything else passes through
/// byte-identical, binary assets included.
const ELIGIBLE_EXTENSIONS: &[&str] = &["php", "css", "scss", "js", "txt"];

/// The stylesheet carrying the theme header block, and its SCSS mirror.
const STYLESHEET_PATHS: &[&str] = &["style.css", "assets/stylesheets/style.scss"];

const README_PATH: &str = "readme.txt";
const BUILD_SCRIPT_PATH: &str = "gulpfile.js";

/// Whole-word occurrences of the upstream display name.
static DISPLAY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bFoundationPress\b").expect("display name pattern is valid"));

/// Stylesheet header keys, paired with their value-capturing patterns.
/// Not line-anchored: a `Key: value` occurrence anywhere in the
/// stylesheet is rewritten, matching the upstream generator exactly.
static HEADER_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        "Theme Name",
        "Theme URI",
        "Author",
        "Author URI",
        "Description",
        "Text Domain",
    ]
    .into_iter()
    .map(|key| {
        let pattern = Regex::new(&format!(r"({}:)\s?(.+)", regex::escape(key)))
            .expect("escaped header key forms a valid pattern");
        (key, pattern)
    })
    .collect()
});

/// Readme body between the Description and Installation sections.
static DESCRIPTION_SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(== Description ==).*?(== Installation)")
        .expect("description section pattern is valid")
});

/// Which files a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Every eligible file outside the stylesheet header pass
    General,
    /// Only the file at this exact relative path
    Exact(&'static str),
}

/// A single substitution.
#[derive(Debug)]
enum Transform {
    /// Case-sensitive substring replacement
    Literal { from: &'static str, to: String },
    /// Whole-word upstream display name to the configured name
    DisplayName,
    /// Replace the readme Description section body
    DescriptionSection,
}

/// One (path predicate, transform) pair in the cascade.
#[derive(Debug)]
struct Rule {
    scope: Scope,
    transform: Transform,
}

impl Rule {
    fn general(from: &'static str, to: String) -> Self {
        Self {
            scope: Scope::General,
            transform: Transform::Literal { from, to },
        }
    }

    fn exact(path: &'static str, from: &'static str, to: String) -> Self {
        Self {
            scope: Scope::Exact(path),
            transform: Transform::Literal { from, to },
        }
    }

    fn applies_to(&self, relative_path: &str) -> bool {
        match self.scope {
            Scope::General => true,
            Scope::Exact(path) => relative_path == path,
        }
    }

    fn apply(&self, content: &str, config: &ThemeConfig) -> String {
        match &self.transform {
            Transform::Literal { from, to } => content.replace(from, to),
            Transform::DisplayName => DISPLAY_NAME
                .replace_all(content, NoExpand(&config.name))
                .into_owned(),
            Transform::DescriptionSection => DESCRIPTION_SECTION
                .replace_all(content, |caps: &regex::Captures<'_>| {
                    format!("{}\n\n{}\n\n{}", &caps[1], config.description, &caps[2])
                })
                .into_owned(),
        }
    }
}

/// Rewrite engine for one theme configuration.
///
/// Holds two disjoint rulesets: a line-anchored header rewrite for the
/// canonical stylesheet, and the ordered identifier cascade for every
/// other eligible file. A given file goes through exactly one of them.
#[derive(Debug)]
pub struct RewriteEngine {
    config: ThemeConfig,
    rules: Vec<Rule>,
    /// `<config name> is distributed`, re-credited to upstream
    attribution: Regex,
}

impl RewriteEngine {
    /// Build the ordered ruleset for `config`.
    #[must_use]
    pub fn new(config: &ThemeConfig) -> Self {
        let slug_u = config.slug_underscored();
        let rules = vec![
            Rule::general(
                "@package FoundationPress",
                format!("@package {}", config.name_underscored()),
            ),
            Rule::general(
                "@since FoundationPress",
                format!("@since {}", config.name_underscored()),
            ),
            Rule::general("foundation.css", format!("{slug_u}.css")),
            Rule::general("foundation.js", format!("{slug_u}.js")),
            Rule::general(
                "wp_enqueue_script( 'foundation'",
                format!("wp_enqueue_script( '{slug_u}'"),
            ),
            Rule::general("'foundationpress'", format!("'{}'", config.slug)),
            Rule::general("foundationpress_", format!("{slug_u}_")),
            Rule::general("Foundationpress_", format!("{}_", config.class_prefix())),
            Rule {
                scope: Scope::General,
                transform: Transform::DisplayName,
            },
            Rule {
                scope: Scope::Exact(README_PATH),
                transform: Transform::DescriptionSection,
            },
            Rule::exact(
                README_PATH,
                "FoundationPress, or foundationpress",
                config.name.clone(),
            ),
            Rule::exact(
                BUILD_SCRIPT_PATH,
                "assets/scss/foundation.scss",
                format!("assets/scss/{}.scss", config.slug),
            ),
        ];
        let attribution = Regex::new(&format!(
            r"\b{} is distributed\b",
            regex::escape(&config.name)
        ))
        .expect("escaped name forms a valid pattern");
        Self {
            config: config.clone(),
            rules,
            attribution,
        }
    }

    /// Rewrite one file's content given its path relative to the
    /// prototype root (forward-slash separated).
    ///
    /// Files with ineligible extensions, and eligible files that are
    /// not valid UTF-8, are returned unchanged.
    #[must_use]
    pub fn rewrite<'a>(&self, content: &'a [u8], relative_path: &str) -> Cow<'a, [u8]> {
        if !is_eligible(relative_path) {
            return Cow::Borrowed(content);
        }
        let Ok(text) = std::str::from_utf8(content) else {
            tracing::debug!(path = relative_path, "eligible file is not UTF-8, passing through");
            return Cow::Borrowed(content);
        };

        let rewritten = if STYLESHEET_PATHS.contains(&relative_path) {
            self.rewrite_stylesheet(text)
        } else {
            self.rewrite_general(text, relative_path)
        };
        Cow::Owned(rewritten.into_bytes())
    }

    /// Header-block pass for the canonical stylesheet.
    fn rewrite_stylesheet(&self, content: &str) -> String {
        let mut out = content.to_owned();
        for (key, pattern) in HEADER_PATTERNS.iter() {
            let value = self.header_value(key);
            out = pattern
                .replace_all(&out, |caps: &regex::Captures<'_>| {
                    format!("{} {value}", &caps[1])
                })
                .into_owned();
        }
        out = DISPLAY_NAME
            .replace_all(&out, NoExpand(&self.config.name))
            .into_owned();
        // The license line keeps crediting the upstream project even
        // after renaming. One-off carve-out, not a general rule.
        self.attribution
            .replace_all(&out, NoExpand("FoundationPress is distributed"))
            .into_owned()
    }

    /// Configuration value for one stylesheet header key.
    fn header_value(&self, key: &str) -> &str {
        match key {
            "Theme Name" => &self.config.name,
            "Theme URI" => &self.config.uri,
            "Author" => &self.config.author,
            "Author URI" => &self.config.author_uri,
            "Description" => &self.config.description,
            _ => &self.config.slug,
        }
    }

    /// Ordered identifier cascade for all other eligible files.
    fn rewrite_general(&self, content: &str, relative_path: &str) -> String {
        let mut out = content.to_owned();
        for rule in &self.rules {
            if rule.applies_to(relative_path) {
                out = rule.apply(&out, &self.config);
            }
        }
        out
    }
}

fn is_eligible(relative_path: &str) -> bool {
    Path::new(relative_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ELIGIBLE_EXTENSIONS.contains(&ext))
}
