//! Publish command implementation.

use super::{connect, load_config};
use anyhow::{bail, Context, Result};
use notepress_core::PublishPipeline;
use std::path::Path;
use tokio::process::Command;

/// Run the full pipeline, then the site generator if one is configured
pub async fn publish_notes(
    config_path: &Path,
    token: Option<String>,
    skip_generator: bool,
) -> Result<()> {
    let config = load_config(config_path, token)?;
    let store = connect(&config)?;
    let pipeline = PublishPipeline::new(config, store);

    let report = pipeline.publish().await.context("Publish failed")?;
    let config = pipeline.config();

    println!(
        "✓ Published {} notes to {:?} ({} assets)",
        report.emitted.len(),
        config.content_dir(),
        report.assets_copied
    );
    for skipped in &report.skipped {
        println!("  skipped {} ({}): {}", skipped.title, skipped.id, skipped.reason);
    }
    if !report.unresolved.is_empty() {
        println!(
            "  {} references left as plain text (run with --verbose for details)",
            report.unresolved.len()
        );
    }

    match config.site.generator.as_deref().map(str::trim) {
        Some(generator) if !generator.is_empty() && !skip_generator => {
            run_generator(generator, &config.site_root()).await
        }
        _ => Ok(()),
    }
}

async fn run_generator(command: &str, site_root: &Path) -> Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts.next().context("Empty site generator command")?;

    tracing::info!(generator = %command, root = %site_root.display(), "Running site generator");
    let status = Command::new(program)
        .args(parts)
        .current_dir(site_root)
        .status()
        .await
        .with_context(|| format!("Failed to run site generator {:?}", command))?;

    if !status.success() {
        bail!("Site generator {:?} exited with {}", command, status);
    }
    println!("✓ Site generator finished");
    Ok(())
}
