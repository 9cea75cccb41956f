//! Writes finished notes to the site content tree.

use crate::frontmatter::{render_frontmatter, FrontmatterError};
use crate::models::{Backlink, NoteDocument};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Receives each finished document exactly once
pub trait Emitter {
    /// Write `doc` into `note_dir`, returning the main file written
    fn emit(&self, doc: &NoteDocument, note_dir: &Path) -> Result<PathBuf, EmitError>;
}

/// Emits Hugo page bundles: `<note_dir>/index.md`
#[derive(Debug, Clone)]
pub struct MarkdownEmitter {
    backlinks_heading: String,
}

impl MarkdownEmitter {
    pub fn new(backlinks_heading: impl Into<String>) -> Self {
        Self {
            backlinks_heading: backlinks_heading.into(),
        }
    }

    /// Full `index.md` text for a document
    pub fn render(&self, doc: &NoteDocument) -> Result<String, EmitError> {
        let mut out = render_frontmatter(&doc.metadata)?;
        out.push('\n');
        out.push_str(&doc.formatted_content);

        if !doc.backlinks.is_empty() {
            out.push_str("\n\n---\n\n");
            out.push_str(&self.backlinks_heading);
            out.push_str("\n\n");
            out.push_str(&backlinks_list(&doc.backlinks));
        }

        Ok(out)
    }
}

impl Default for MarkdownEmitter {
    fn default() -> Self {
        Self::new("Backlinks")
    }
}

impl Emitter for MarkdownEmitter {
    fn emit(&self, doc: &NoteDocument, note_dir: &Path) -> Result<PathBuf, EmitError> {
        let contents = self.render(doc)?;
        let path = note_dir.join("index.md");

        fs::create_dir_all(note_dir).map_err(|source| EmitError::Io {
            path: note_dir.to_path_buf(),
            source,
        })?;
        fs::write(&path, contents).map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(note_id = %doc.id(), path = %path.display(), "Wrote note");
        Ok(path)
    }
}

/// Numbered markdown list, one `[title](url)` per line
fn backlinks_list(backlinks: &[Backlink]) -> String {
    backlinks
        .iter()
        .enumerate()
        .map(|(i, b)| {
            format!(
                "{}. [{}]({})\n",
                i + 1,
                crate::markdown::escape_link_label(&b.title),
                b.url
            )
        })
        .collect()
}
