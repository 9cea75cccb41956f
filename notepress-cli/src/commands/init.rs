//! Init command implementation.

use anyhow::{bail, Context, Result};
use notepress_core::config::SAMPLE_CONFIG;
use std::fs;
use std::path::Path;

/// Write a commented notepress.yml into `path`
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    let config_path = root.join("notepress.yml");
    if config_path.exists() {
        bail!("{:?} already exists; not overwriting", config_path);
    }

    fs::write(&config_path, SAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;

    println!("✓ Created {:?}", config_path);
    println!("  - Set store.workspace and site.root, then run `notepress plan`");
    println!("  - Mark notes for publication with the custom-publish=1 attribute");
    Ok(())
}
