//! Themekit preview: boots the theme runtime on a static page and prints the
//! resulting document.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{EnvFilter, fmt};

use themekit_core::config::RuntimeConfig;
use themekit_dom::{DomHost, MemoryDocument};
use themekit_runtime::ThemeRuntime;

/// Boot a page through the theme runtime and print the rendered HTML
#[derive(Debug, Parser)]
#[command(name = "themekit-preview", version, about, long_about = None)]
struct Cli {
    /// Configuration file; defaults to config/default plus the environment overlay
    #[arg(short, long)]
    config: Option<String>,

    /// Environment overlay (config/{env}.toml)
    #[arg(short, long, default_value = "development")]
    env: String,

    /// HTML page to load; an empty page when omitted
    page: Option<String>,

    /// Content file whose shortcodes are expanded into the content area
    #[arg(long)]
    content: Option<String>,

    /// Path the page was loaded at
    #[arg(long, default_value = "/")]
    entry: String,

    /// Paths to navigate to after boot, in order
    #[arg(short, long = "navigate")]
    navigate: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!("Preview failed: {e:#}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration(cli: &Cli) -> Result<RuntimeConfig> {
    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("Config load error for '{path}'"))?,
        None => RuntimeConfig::load(&cli.env).context("Config load error")?,
    };
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &RuntimeConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(cli: Cli, config: RuntimeConfig) -> Result<()> {
    tracing::info!("Starting themekit-preview v{}", env!("CARGO_PKG_VERSION"));

    let doc = match &cli.page {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read page '{path}'"))?;
            Arc::new(MemoryDocument::from_html(&html))
        }
        None => Arc::new(MemoryDocument::new()),
    };

    let settle = config.scheduler.fallback() + config.scheduler.debounce();
    let selectors = config.scheduler.content_selectors.join(", ");
    let site = json!({ "origin": config.site.origin, "locale": config.site.locale });

    let runtime = ThemeRuntime::new(config, doc.clone(), &cli.entry)?;
    register_builtin_shortcodes(&runtime);

    runtime.boot(site).await?;

    if let Some(path) = &cli.content {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read content '{path}'"))?;
        let html = runtime
            .render_content(&source, &json!({ "path": cli.entry }))
            .await?;
        match doc.query_selector(&selectors)? {
            Some(area) => doc.set_inner_html(area, &html)?,
            None => tracing::warn!(selectors = %selectors, "No content area to fill"),
        }
    }
    tokio::time::sleep(settle).await;

    for path in &cli.navigate {
        runtime.navigate(path).await?;
        tokio::time::sleep(settle).await;
    }

    let stats = runtime.scheduler.stats();
    tracing::info!(
        navigations = stats.navigations,
        renders = stats.renders,
        stale_timers = stats.stale_timers,
        "Preview finished"
    );
    runtime.shutdown();

    println!("{}", doc.html());
    Ok(())
}

fn register_builtin_shortcodes(runtime: &ThemeRuntime) {
    runtime
        .shortcodes
        .register_fn("bold", |inner, _, _| Ok(format!("<strong>{inner}</strong>")));
    runtime
        .shortcodes
        .register_fn("italic", |inner, _, _| Ok(format!("<em>{inner}</em>")));
    runtime.shortcodes.register_fn("note", |inner, attrs, _| {
        let kind = attrs.get("type").map(String::as_str).unwrap_or("info");
        Ok(format!(r#"<div class="note note-{kind}">{inner}</div>"#))
    });
}
