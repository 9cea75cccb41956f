//! Plan command implementation.

use super::{connect, load_config};
use anyhow::{Context, Result};
use notepress_core::slug::link_path;
use notepress_core::{Plan, PublishPipeline};
use serde_json::json;
use std::path::Path;

/// Compute the closure and print it without writing anything
pub async fn plan_notes(config_path: &Path, token: Option<String>, json: bool) -> Result<()> {
    let config = load_config(config_path, token)?;
    let store = connect(&config)?;
    let pipeline = PublishPipeline::new(config, store);

    let plan = pipeline.plan().await.context("Planning failed")?;
    let section = pipeline.config().section();

    if json {
        let output = plan_json(&plan, section);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} notes would be published:", plan.documents.len());
    for doc in &plan.documents {
        println!(
            "  {}  {}  ({})",
            link_path(section, &doc.metadata.slug()),
            doc.title(),
            doc.id()
        );
        for backlink in &doc.backlinks {
            println!("      ← {}", backlink.title);
        }
    }

    if !plan.report.skipped.is_empty() {
        println!("\nSkipped:");
        for skipped in &plan.report.skipped {
            println!("  {} ({}): {}", skipped.title, skipped.id, skipped.reason);
        }
    }
    if !plan.report.unresolved.is_empty() {
        println!("\nUnresolved references:");
        for unresolved in &plan.report.unresolved {
            println!("  {} → {}", unresolved.source, unresolved.target);
        }
    }

    Ok(())
}

fn plan_json(plan: &Plan, section: &str) -> serde_json::Value {
    let notes: Vec<serde_json::Value> = plan
        .documents
        .iter()
        .map(|doc| {
            let slug = doc.metadata.slug();
            json!({
                "id": doc.id(),
                "title": doc.title(),
                "slug": slug,
                "url": link_path(section, &slug),
                "tags": doc.metadata.tags,
                "links": doc.link_targets(),
                "backlinks": doc.backlinks,
            })
        })
        .collect();

    json!({
        "notes": notes,
        "skipped": plan.report.skipped,
        "unresolved": plan.report.unresolved,
    })
}
