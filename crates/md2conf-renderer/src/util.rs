//! Shared utility functions for markdown rendering.

use pulldown_cmark::HeadingLevel;

/// Convert heading level enum to number (1-6).
#[must_use]
pub(crate) fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Language identifier from a fenced code block info string.
///
/// Takes the first token, so `rust,ignore` and `python title="x"` both work.
pub(crate) fn fence_language(info: &str) -> Option<String> {
    let language = info
        .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .unwrap_or_default();
    if language.is_empty() {
        None
    } else {
        Some(language.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_to_num() {
        assert_eq!(heading_level_to_num(HeadingLevel::H1), 1);
        assert_eq!(heading_level_to_num(HeadingLevel::H6), 6);
    }

    #[test]
    fn test_fence_language() {
        assert_eq!(fence_language("rust"), Some("rust".to_owned()));
        assert_eq!(fence_language("rust,ignore"), Some("rust".to_owned()));
        assert_eq!(fence_language("python title=\"x\""), Some("python".to_owned()));
        assert_eq!(fence_language(""), None);
    }
}
