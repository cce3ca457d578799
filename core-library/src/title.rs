//! Title splitting shared by album and track normalization
//!
//! Catalog titles carry edition information inline: `"So What (Remastered)"`,
//! `"Blue in Green [Take 3]"`, `"Freddie Freeloader - Live at Newport"`. The
//! host stores the bare name and the version separately so identical
//! recordings from different providers can be matched.

/// Markers that identify a ` - ` suffix as a version rather than part of the name
const VERSION_KEYWORDS: &[&str] = &[
    "remaster",
    "live",
    "version",
    "edit",
    "mix",
    "remix",
    "acoustic",
    "demo",
    "mono",
    "stereo",
    "instrumental",
    "radio",
    "extended",
    "single",
    "deluxe",
];

/// Split a title into its display name and optional version.
///
/// Trailing `(...)` / `[...]` groups and ` - <version keyword>` suffixes are
/// peeled off repeatedly, so the returned name never carries one of them and
/// splitting it again yields the same name with no version. A title made only
/// of a bracket group is kept as is.
///
/// ```
/// use core_library::title::parse_title;
///
/// let (name, version) = parse_title("Kind of Blue (Legacy Edition) [Remastered]");
/// assert_eq!(name, "Kind of Blue");
/// assert_eq!(version.as_deref(), Some("Legacy Edition Remastered"));
/// ```
pub fn parse_title(title: &str) -> (String, Option<String>) {
    let mut name = title.trim().to_string();
    let mut parts: Vec<String> = Vec::new();

    while let Some((rest, part)) = split_trailing(&name) {
        if rest.is_empty() {
            break;
        }
        if !part.is_empty() {
            parts.insert(0, part);
        }
        name = rest;
    }

    let version = if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    };

    (name, version)
}

/// Remove one trailing version marker, returning `(rest, version_part)`
fn split_trailing(title: &str) -> Option<(String, String)> {
    let title = title.trim_end();

    for (open, close) in [('(', ')'), ('[', ']')] {
        if !title.ends_with(close) {
            continue;
        }

        let mut depth = 0usize;
        for (idx, ch) in title.char_indices().rev() {
            if ch == close {
                depth += 1;
            } else if ch == open {
                depth -= 1;
                if depth == 0 {
                    let inner = title[idx + open.len_utf8()..title.len() - close.len_utf8()].trim();
                    let rest = title[..idx].trim_end();
                    return Some((rest.to_string(), inner.to_string()));
                }
            }
        }

        // Unbalanced brackets stay part of the name
        return None;
    }

    let pos = title.rfind(" - ")?;
    let suffix = title[pos + 3..].trim();
    let lowered = suffix.to_lowercase();

    if VERSION_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
        Some((title[..pos].trim_end().to_string(), suffix.to_string()))
    } else {
        None
    }
}
