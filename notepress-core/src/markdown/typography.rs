//! Spacing and term-casing normalization of prose.
//!
//! Only [`Node::Text`] is touched. Both passes are idempotent.

use super::{Node, Tree, Visit};

/// Terms whose casing is corrected when they appear as a whole word
const TERMS: &[(&str, &str)] = &[
    ("android", "Android"),
    ("api", "API"),
    ("css", "CSS"),
    ("docker", "Docker"),
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("html", "HTML"),
    ("http", "HTTP"),
    ("https", "HTTPS"),
    ("ios", "iOS"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("json", "JSON"),
    ("kubernetes", "Kubernetes"),
    ("linux", "Linux"),
    ("macos", "macOS"),
    ("markdown", "Markdown"),
    ("mysql", "MySQL"),
    ("nginx", "Nginx"),
    ("postgresql", "PostgreSQL"),
    ("python", "Python"),
    ("redis", "Redis"),
    ("sql", "SQL"),
    ("typescript", "TypeScript"),
    ("ubuntu", "Ubuntu"),
    ("url", "URL"),
    ("wifi", "Wi-Fi"),
    ("xml", "XML"),
    ("yaml", "YAML"),
];

/// Which typography passes run over a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typography {
    pub auto_space: bool,
    pub fix_term_typo: bool,
}

impl Typography {
    pub fn new(auto_space: bool, fix_term_typo: bool) -> Self {
        Self {
            auto_space,
            fix_term_typo,
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.auto_space && !self.fix_term_typo
    }

    pub fn apply_str(&self, text: &str) -> String {
        let mut out = text.to_string();
        if self.fix_term_typo {
            out = fix_term_typo(&out);
        }
        if self.auto_space {
            out = auto_space(&out);
        }
        out
    }

    pub fn apply(&self, tree: &mut Tree) {
        if self.is_noop() {
            return;
        }
        tree.walk(&mut |node: &mut Node| {
            if let Node::Text(text) = node {
                *text = self.apply_str(text);
            }
            Visit::Continue
        });
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{2E80}'..='\u{2FDF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{3100}'..='\u{312F}'
        | '\u{3190}'..='\u{31BF}'
        | '\u{31F0}'..='\u{31FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2FA1F}')
}

/// Insert a single space between CJK characters and ASCII letters or digits
///
/// Whitespace-separated tokens that look like URLs, paths or addresses are
/// copied unchanged.
pub fn auto_space(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut rest = text;

    while !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        if token.contains(is_attached) {
            out.push_str(token);
        } else {
            space_token(token, &mut out);
        }

        let gap = tail.find(|c: char| !c.is_whitespace()).unwrap_or(tail.len());
        out.push_str(&tail[..gap]);
        rest = &tail[gap..];
    }

    out
}

fn space_token(token: &str, out: &mut String) {
    let mut prev: Option<char> = None;
    for c in token.chars() {
        if let Some(p) = prev {
            let boundary = (is_cjk(p) && c.is_ascii_alphanumeric())
                || (p.is_ascii_alphanumeric() && is_cjk(c));
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }
}

/// Characters that mark a word as part of a URL, path, address or identifier
fn is_attached(c: char) -> bool {
    matches!(c, '/' | '\\' | '@' | '-' | '_' | '#' | '%' | '~')
}

/// Punctuation that only glues words when something follows it directly
fn is_joiner(c: char) -> bool {
    matches!(c, '.' | ':' | '?' | '&' | '=')
}

fn attached_before(chars: &[char], start: usize) -> bool {
    let Some(j) = start.checked_sub(1) else {
        return false;
    };
    if is_joiner(chars[j]) {
        j > 0 && !chars[j - 1].is_whitespace()
    } else {
        is_attached(chars[j])
    }
}

fn attached_after(chars: &[char], end: usize) -> bool {
    match chars.get(end) {
        Some(&c) if is_joiner(c) => chars
            .get(end + 1)
            .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '/'),
        Some(&c) => is_attached(c),
        None => false,
    }
}

/// Correct the casing of known terms appearing as standalone words
pub fn fix_term_typo(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_alphanumeric() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_ascii_alphanumeric() {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();

        let standalone = !attached_before(&chars, start) && !attached_after(&chars, i);

        let lower = word.to_ascii_lowercase();
        match TERMS.iter().find(|(term, _)| *term == lower) {
            Some((_, canonical)) if standalone => out.push_str(canonical),
            _ => out.push_str(&word),
        }
    }

    out
}
