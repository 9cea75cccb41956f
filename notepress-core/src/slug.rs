//! Slug generation and link paths.

use unicode_segmentation::UnicodeSegmentation;

/// Convert a note title to its slug
///
/// Rules:
/// - Trim surrounding whitespace
/// - Lowercase
/// - Replace each whitespace character and path separator with a hyphen
///
/// Everything else is kept as-is; [`link_path`] percent-encodes it for URLs.
///
/// # Examples
///
/// ```
/// use notepress_core::slugify;
///
/// assert_eq!(slugify("My Notes"), "my-notes");
/// assert_eq!(slugify("Rust & Safety"), "rust-&-safety");
/// assert_eq!(slugify("读书 笔记"), "读书-笔记");
/// ```
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .graphemes(true)
        .map(|g| {
            if g.chars().all(char::is_whitespace) || g == "/" || g == "\\" {
                "-"
            } else {
                g
            }
        })
        .collect()
}

/// Link path for a slug inside a section: `/<section>/<percent-encoded slug>/`
///
/// ```
/// use notepress_core::slug::link_path;
///
/// assert_eq!(link_path("notes", "my-notes"), "/notes/my-notes/");
/// ```
pub fn link_path(section: &str, slug: &str) -> String {
    format!(
        "/{}/{}/",
        section.trim_matches('/'),
        urlencoding::encode(slug)
    )
}
