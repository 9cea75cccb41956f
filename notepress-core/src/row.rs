//! Strict parsing of the loosely typed rows returned by the note store.

use crate::models::{AttrValue, NoteMetadata};
use chrono::NaiveDateTime;
use notepress_types::NoteId;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A row as returned by the store: column name to JSON value
pub type RawRow = serde_json::Map<String, Value>;

/// Timestamp format of the `created`/`updated` columns
pub const ROW_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Timestamp format of `date`/`lastmod` custom attributes
pub const ATTR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field `{field}`: {reason}")]
pub struct ParseError {
    pub field: String,
    pub reason: String,
}

impl ParseError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Document row with named, typed fields
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRow {
    pub id: NoteId,
    pub title: String,
    pub created: NaiveDateTime,
    pub updated: NaiveDateTime,
    pub tags: Vec<String>,
}

impl NoteRow {
    /// Parse a document row
    ///
    /// `updated` falls back to `created` when empty.
    pub fn parse(row: &RawRow) -> Result<Self, ParseError> {
        let id = string_field(row, "id")?;
        if id.is_empty() {
            return Err(ParseError::new("id", "must not be empty"));
        }
        let title = string_field(row, "content")?.to_string();

        let created_raw = string_field(row, "created")?;
        let created = parse_time("created", created_raw, ROW_TIME_FORMAT)?;

        let updated_raw = string_field(row, "updated")?;
        let updated = if updated_raw.is_empty() {
            created
        } else {
            parse_time("updated", updated_raw, ROW_TIME_FORMAT)?
        };

        let tags = parse_tags(string_field(row, "tag")?);

        Ok(Self {
            id: NoteId::new(id),
            title,
            created,
            updated,
            tags,
        })
    }

    /// Combine with the separately fetched asset list and attributes
    pub fn into_metadata(
        self,
        asset_filenames: Vec<String>,
        custom_attributes: BTreeMap<String, AttrValue>,
    ) -> NoteMetadata {
        NoteMetadata {
            id: self.id,
            title: self.title,
            created_at: self.created,
            updated_at: self.updated,
            tags: self.tags,
            asset_filenames,
            custom_attributes,
        }
    }
}

fn string_field<'a>(row: &'a RawRow, field: &str) -> Result<&'a str, ParseError> {
    match row.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(Value::Null) | None => Err(ParseError::new(field, "missing")),
        Some(other) => Err(ParseError::new(
            field,
            format!("expected string, found {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_time(field: &str, raw: &str, format: &str) -> Result<NaiveDateTime, ParseError> {
    NaiveDateTime::parse_from_str(raw, format)
        .map_err(|e| ParseError::new(field, format!("`{raw}` is not a {format} timestamp: {e}")))
}

/// Split the space separated tag column, stripping `#` markers
fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split_whitespace() {
        let tag = tag.trim_matches('#');
        if tag.is_empty() || tags.iter().any(|t| t == tag) {
            continue;
        }
        tags.push(tag.to_string());
    }
    tags
}

/// Strip the `assets/` prefix the store reports asset paths with
pub fn asset_filename(path: &str) -> Option<String> {
    let name = path.trim().trim_start_matches("assets/");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse `{name, value}` attribute rows into front-matter overrides
///
/// Names lose the reserved prefix. `date` and `lastmod` must be local
/// date-times; a malformed attribute is dropped on its own without failing
/// the rest.
pub fn parse_custom_attributes(
    note: &NoteId,
    rows: &[RawRow],
    prefix: &str,
) -> BTreeMap<String, AttrValue> {
    let mut attrs = BTreeMap::new();

    for row in rows {
        let (name, value) = match (string_field(row, "name"), string_field(row, "value")) {
            (Ok(name), Ok(value)) => (name, value),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(note_id = %note, "Dropping attribute row: {}", e);
                continue;
            }
        };

        let Some(key) = name.strip_prefix(prefix) else {
            tracing::debug!(note_id = %note, "Ignoring attribute {} without prefix", name);
            continue;
        };
        if key.is_empty() {
            continue;
        }

        let parsed = match key {
            "date" | "lastmod" => match parse_time(key, value, ATTR_TIME_FORMAT) {
                Ok(at) => AttrValue::DateTime(at),
                Err(e) => {
                    tracing::warn!(note_id = %note, "Dropping attribute {}: {}", key, e);
                    continue;
                }
            },
            _ => AttrValue::Text(value.to_string()),
        };
        attrs.insert(key.to_string(), parsed);
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_valid_row() {
        let raw = row(json!({
            "id": "20210808180117-czj9bvb",
            "content": "My Notes",
            "created": "20210808180117",
            "updated": "20210910120000",
            "tag": "#rust# #notes# #rust#",
            "type": "d"
        }));

        let parsed = NoteRow::parse(&raw).unwrap();
        assert_eq!(parsed.id.as_str(), "20210808180117-czj9bvb");
        assert_eq!(parsed.title, "My Notes");
        assert_eq!(
            parsed.created.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2021-08-08 18:01:17"
        );
        assert_eq!(
            parsed.updated.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2021-09-10 12:00:00"
        );
        assert_eq!(parsed.tags, vec!["rust", "notes"]);
    }

    #[test]
    fn test_empty_updated_falls_back_to_created() {
        let raw = row(json!({
            "id": "a",
            "content": "A",
            "created": "20210808180117",
            "updated": "",
            "tag": ""
        }));

        let parsed = NoteRow::parse(&raw).unwrap();
        assert_eq!(parsed.updated, parsed.created);
        assert!(parsed.tags.is_empty());
    }

    #[test]
    fn test_missing_field_is_named() {
        let raw = row(json!({
            "id": "a",
            "created": "20210808180117",
            "updated": "",
            "tag": ""
        }));

        let err = NoteRow::parse(&raw).unwrap_err();
        assert_eq!(err.field, "content");
        assert_eq!(err.reason, "missing");
    }

    #[test]
    fn test_mistyped_field_is_named() {
        let raw = row(json!({
            "id": "a",
            "content": "A",
            "created": 20210808180117u64,
            "updated": "",
            "tag": ""
        }));

        let err = NoteRow::parse(&raw).unwrap_err();
        assert_eq!(err.field, "created");
        assert!(err.reason.contains("number"));
    }

    #[test]
    fn test_malformed_timestamp() {
        let raw = row(json!({
            "id": "a",
            "content": "A",
            "created": "20210808180117",
            "updated": "yesterday",
            "tag": ""
        }));

        let err = NoteRow::parse(&raw).unwrap_err();
        assert_eq!(err.field, "updated");
    }

    #[test]
    fn test_asset_filename() {
        assert_eq!(
            asset_filename("assets/image-20210808.png").as_deref(),
            Some("image-20210808.png")
        );
        assert_eq!(asset_filename("plain.png").as_deref(), Some("plain.png"));
        assert_eq!(asset_filename("assets/"), None);
    }

    #[test]
    fn test_custom_attributes() {
        let note = NoteId::new("a");
        let rows = vec![
            row(json!({"name": "custom-sn-date", "value": "2021-01-02T03:04:05"})),
            row(json!({"name": "custom-sn-lastmod", "value": "not a date"})),
            row(json!({"name": "custom-sn-slug", "value": "hello"})),
            row(json!({"name": "custom-other", "value": "ignored"})),
            row(json!({"name": "custom-sn-weight", "value": 3})),
        ];

        let attrs = parse_custom_attributes(&note, &rows, "custom-sn-");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("slug"), Some(&AttrValue::Text("hello".into())));
        match attrs.get("date") {
            Some(AttrValue::DateTime(at)) => {
                assert_eq!(at.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-01-02 03:04:05")
            }
            other => panic!("expected date, got {other:?}"),
        }
        assert!(!attrs.contains_key("lastmod"));
    }
}
