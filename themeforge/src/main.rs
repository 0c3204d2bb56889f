//! Themeforge CLI

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use themeforge::{Generator, GeneratorSettings, HttpArchiveSource, ThemeRequest};

/// Generate a renamed copy of the FoundationPress starter theme
#[derive(Parser)]
#[command(name = "themeforge")]
#[command(version)]
#[command(about = "Generate a renamed FoundationPress theme", long_about = None)]
struct Cli {
    /// Theme name (e.g. "Awesome Theme")
    #[arg(long)]
    name: String,

    /// Theme slug; derived from the name when omitted
    #[arg(long)]
    slug: Option<String>,

    /// Author name
    #[arg(long)]
    author: Option<String>,

    /// Author URI (must include http:// or https://)
    #[arg(long)]
    author_uri: Option<String>,

    /// One-line theme description
    #[arg(long)]
    description: Option<String>,

    /// Directory for the cached upstream archive and staging
    #[arg(long, default_value = "build")]
    build_dir: PathBuf,

    /// Where to write the generated archive; defaults to <slug>.zip
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Refetch the upstream archive even if the cache is fresh
    #[arg(long)]
    no_cache: bool,

    /// Suppress diagnostic output
    #[arg(long, short)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let request = ThemeRequest {
        name: cli.name.clone(),
        slug: cli.slug.clone(),
        author: cli.author.clone(),
        author_uri: cli.author_uri.clone(),
        description: cli.description.clone(),
    };

    let mut settings = GeneratorSettings::new(&cli.build_dir);
    settings.bypass_cache = cli.no_cache;
    let generator = Generator::new(settings, HttpArchiveSource::new());

    println!(
        "{} {}",
        style("Generating theme:").bold(),
        style(&cli.name).cyan().bold()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Failed to set progress style")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Fetching, rewriting, and packaging...");

    let result = generator.generate(&request);
    spinner.finish_and_clear();

    let theme = result.context("Theme generation failed")?;
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&theme.filename));
    fs::write(&output, &theme.bytes)
        .with_context(|| format!("Failed to write archive to {}", output.display()))?;

    println!(
        "{} {} ({} bytes)",
        style("Created").green().bold(),
        style(output.display()).cyan(),
        theme.bytes.len()
    );
    Ok(())
}

fn init_tracing(quiet: bool) {
    let default_filter = if quiet { "themeforge=error" } else { "themeforge=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
