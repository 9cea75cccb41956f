//! Copies note assets from the store workspace into the note directory.

use crate::models::NoteMetadata;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to prepare asset directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy asset {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves asset file names against a fixed asset root
#[derive(Debug, Clone)]
pub struct AssetLocator {
    root: PathBuf,
}

impl AssetLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source path of an asset, or `None` when the name would escape the root
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if name.is_empty() || !plain {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Copy the note's assets into `<note_dir>/assets`
    ///
    /// The output directory is recreated on the first file actually copied,
    /// so files from an earlier run never survive. When nothing is copied, a
    /// leftover directory is removed. Returns the number of files copied.
    pub fn copy_assets(&self, note: &NoteMetadata, note_dir: &Path) -> Result<usize, AssetError> {
        let out_dir = note_dir.join("assets");
        let mut copied = 0;

        for name in &note.asset_filenames {
            let Some(source) = self.locate(name) else {
                tracing::warn!(note_id = %note.id, asset = %name, "Skipping asset outside the asset root");
                continue;
            };
            if !source.is_file() {
                tracing::debug!(note_id = %note.id, path = %source.display(), "Asset not found, skipping");
                continue;
            }

            if copied == 0 {
                recreate_dir(&out_dir)?;
            }

            let dest = out_dir.join(name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|source| AssetError::Prepare {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(&source, &dest).map_err(|e| AssetError::Copy {
                from: source.clone(),
                to: dest.clone(),
                source: e,
            })?;
            copied += 1;
        }

        if copied == 0 && out_dir.exists() {
            fs::remove_dir_all(&out_dir).map_err(|source| AssetError::Prepare {
                path: out_dir.clone(),
                source,
            })?;
        }

        Ok(copied)
    }
}

fn recreate_dir(dir: &Path) -> Result<(), AssetError> {
    let prepare = |source| AssetError::Prepare {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(prepare)?;
    }
    fs::create_dir_all(dir).map_err(prepare)
}
