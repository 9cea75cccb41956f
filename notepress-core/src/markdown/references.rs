//! Block reference scanning for `((id "anchor"))`, `((id 'anchor'))` and `((id))`.

use super::Node;
use regex::Regex;
use std::sync::OnceLock;

static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn reference_regex() -> &'static Regex {
    REFERENCE_REGEX.get_or_init(|| {
        Regex::new(r#"\(\((?P<id>[^\s()"']+)(?:\s+(?:"(?P<dq>[^"\n]*)"|'(?P<sq>[^'\n]*)'))?\)\)"#)
            .unwrap()
    })
}

/// Split prose into text and reference nodes
///
/// Empty text nodes are never produced; the concatenation of the returned
/// nodes' source equals the input.
pub fn split_references(prose: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut offset = 0;

    for captures in reference_regex().captures_iter(prose) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(id) = captures.name("id") else {
            continue;
        };

        if whole.start() > offset {
            nodes.push(Node::Text(prose[offset..whole.start()].to_string()));
        }

        let anchor = captures
            .name("dq")
            .or_else(|| captures.name("sq"))
            .map(|m| m.as_str().to_string());

        nodes.push(Node::Reference {
            target: id.as_str().to_string(),
            anchor,
            raw: whole.as_str().to_string(),
        });
        offset = whole.end();
    }

    if offset < prose.len() {
        nodes.push(Node::Text(prose[offset..].to_string()));
    }

    nodes
}
