// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caption rendering at delivery time.

/// Placeholder replaced by the item's display name.
pub const FILE_NAME: &str = "{file_name}";

/// Caption sent with an item.
///
/// A global template wins over the stored caption. An empty result is sent
/// as no caption at all.
pub fn render(template: Option<&str>, display_name: &str, stored: Option<&str>) -> Option<String> {
    let text = match template {
        Some(t) => t.replace(FILE_NAME, display_name),
        None => stored?.to_string(),
    };
    if text.trim().is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_overrides_stored_caption() {
        assert_eq!(
            render(Some("Now showing: {file_name}"), "movie.mkv", Some("old")),
            Some("Now showing: movie.mkv".into())
        );
    }

    #[test]
    fn template_without_placeholder_is_used_verbatim() {
        assert_eq!(render(Some("static"), "x", None), Some("static".into()));
    }

    #[test]
    fn stored_caption_is_fallback() {
        assert_eq!(render(None, "x", Some("kept")), Some("kept".into()));
        assert_eq!(render(None, "x", None), None);
    }

    #[test]
    fn blank_caption_becomes_none() {
        assert_eq!(render(None, "x", Some("  ")), None);
        assert_eq!(render(Some(""), "x", Some("kept")), None);
    }
}
