//! src/main.rs
//! Lists a directory through the render pipeline and prints the view.
//!
//! Usage: `fsv [DIR]` (defaults to the current directory)

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use tracing::info;

use fsv_core::{
    Config, ListingEngine, Logger, RenderOptions,
    fs::{AdapterRegistry, LocalAdapter, url_for_dir},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load().await.unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        Config::default()
    });

    let _guard = Logger::init(&config.logging).context("Failed to initialize logging")?;
    info!("Starting fsv");

    let dir = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    let dir = tokio::fs::canonicalize(&dir)
        .await
        .with_context(|| format!("Failed to resolve {}", dir.display()))?;

    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(LocalAdapter::default()));

    let mut engine =
        ListingEngine::new(config, adapters).context("Failed to create listing engine")?;
    let view_id = engine
        .open_view_url(url_for_dir(&dir))
        .context("Failed to open view")?;

    let report = engine
        .render_view(
            view_id,
            RenderOptions {
                jump_first: true,
                ..RenderOptions::default()
            },
        )
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    let view = engine.view(view_id)?;
    for line in &view.lines {
        println!("{line}");
    }

    info!(
        pages = report.pages,
        entries = report.entries,
        intermediate = report.intermediate_after.len(),
        "Listing rendered"
    );

    Ok(())
}
