//! TOML front matter rendering for emitted notes.

use crate::models::{AttrValue, NoteMetadata};
use crate::row::ATTR_TIME_FORMAT;
use chrono::NaiveDateTime;
use thiserror::Error;
use toml::value::{Datetime, DatetimeParseError};
use toml::{Table, Value};

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid date-time {0}: {1}")]
    DateTime(NaiveDateTime, DatetimeParseError),

    #[error("Failed to serialize TOML: {0}")]
    TomlError(#[from] toml::ser::Error),
}

/// Local date-time (no offset) as TOML sees it
fn local_datetime(at: &NaiveDateTime) -> Result<Value, FrontmatterError> {
    at.format(ATTR_TIME_FORMAT)
        .to_string()
        .parse::<Datetime>()
        .map(Value::Datetime)
        .map_err(|e| FrontmatterError::DateTime(*at, e))
}

/// Build the front matter table
///
/// Keys come in a fixed order: `title`, `date`, `lastmod`, `tags`, then the
/// custom attributes sorted by name. A custom `date` or `lastmod` replaces
/// the value from the store in place.
pub fn frontmatter_table(meta: &NoteMetadata) -> Result<Table, FrontmatterError> {
    let mut table = Table::new();
    table.insert("title".into(), Value::String(meta.title.clone()));
    table.insert("date".into(), local_datetime(&meta.created_at)?);
    table.insert("lastmod".into(), local_datetime(&meta.updated_at)?);
    table.insert(
        "tags".into(),
        Value::Array(meta.tags.iter().cloned().map(Value::String).collect()),
    );

    for (key, value) in &meta.custom_attributes {
        let value = match value {
            AttrValue::DateTime(at) => local_datetime(at)?,
            AttrValue::Text(text) => Value::String(text.clone()),
        };
        table.insert(key.clone(), value);
    }

    Ok(table)
}

/// Render the `+++` delimited front matter block, trailing newline included
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use notepress_core::frontmatter::render_frontmatter;
/// use notepress_core::NoteMetadata;
///
/// let at = NaiveDate::from_ymd_opt(2021, 8, 8).unwrap().and_hms_opt(18, 1, 17).unwrap();
/// let meta = NoteMetadata {
///     id: "20210808180117-czj9bvb".into(),
///     title: "My Notes".to_string(),
///     created_at: at,
///     updated_at: at,
///     tags: vec![],
///     asset_filenames: vec![],
///     custom_attributes: Default::default(),
/// };
///
/// let block = render_frontmatter(&meta).unwrap();
/// assert!(block.starts_with("+++\ntitle = \"My Notes\"\ndate = 2021-08-08T18:01:17\n"));
/// assert!(block.ends_with("+++\n"));
/// ```
pub fn render_frontmatter(meta: &NoteMetadata) -> Result<String, FrontmatterError> {
    let body = toml::to_string(&frontmatter_table(meta)?)?;
    Ok(format!("+++\n{body}+++\n"))
}
