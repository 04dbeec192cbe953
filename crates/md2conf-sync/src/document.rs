//! Local Markdown documents.

use std::path::{Path, PathBuf};

use md2conf_renderer::extract_title;

/// File names that stand for their directory.
pub(crate) const INDEX_FILENAMES: [&str; 2] = ["index.md", "readme.md"];

/// A Markdown file read from the input tree.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the publish root with `/` separators (e.g. `guide/intro.md`).
    pub path: String,
    /// Location on disk.
    pub source: PathBuf,
    /// Page title.
    pub title: String,
    pub markdown: String,
}

impl Document {
    /// Build a document from its source text.
    ///
    /// The title is the front matter `title`, else the first H1, else derived
    /// from the file name. Index files fall back to their directory's name,
    /// `root_name` for the root index.
    pub(crate) fn new(path: String, source: PathBuf, markdown: String, root_name: &str) -> Self {
        let title = extract_title(&markdown).unwrap_or_else(|| fallback_title(&path, root_name));
        Self {
            path,
            source,
            title,
            markdown,
        }
    }
}

pub(crate) fn is_index_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    INDEX_FILENAMES.contains(&lower.as_str())
}

pub(crate) fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn fallback_title(path: &str, root_name: &str) -> String {
    let mut segments = path.rsplit('/');
    let name = segments.next().unwrap_or(path);
    if is_index_name(name) {
        return titlecase_from_slug(segments.next().unwrap_or(root_name));
    }
    let stem = name
        .rsplit_once('.')
        .map_or(name, |(stem, _)| stem);
    titlecase_from_slug(stem)
}

/// Convert a slug (kebab-case or `snake_case`) to title case.
///
/// Replaces `-` and `_` with spaces, then capitalizes the first letter of each word.
pub(crate) fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn doc(path: &str, markdown: &str) -> Document {
        Document::new(
            path.to_owned(),
            PathBuf::from(path),
            markdown.to_owned(),
            "my-docs",
        )
    }

    #[test]
    fn test_titlecase_from_slug() {
        assert_eq!(titlecase_from_slug("setup-guide"), "Setup Guide");
        assert_eq!(titlecase_from_slug("my_page"), "My Page");
        assert_eq!(titlecase_from_slug("--"), "");
    }

    #[test]
    fn test_title_from_heading() {
        assert_eq!(doc("intro.md", "# Getting Started\n\nText").title, "Getting Started");
    }

    #[test]
    fn test_title_from_front_matter() {
        let markdown = "---\ntitle: Custom\n---\n\n# Heading\n";
        assert_eq!(doc("intro.md", markdown).title, "Custom");
    }

    #[test]
    fn test_title_falls_back_to_file_name() {
        assert_eq!(doc("guide/first_steps.md", "No heading").title, "First Steps");
    }

    #[test]
    fn test_index_title_falls_back_to_directory() {
        assert_eq!(doc("user-guide/index.md", "").title, "User Guide");
        assert_eq!(doc("README.md", "").title, "My Docs");
    }

    #[test]
    fn test_is_index_name() {
        assert!(is_index_name("README.md"));
        assert!(is_index_name("index.md"));
        assert!(!is_index_name("intro.md"));
    }

    #[test]
    fn test_is_markdown() {
        assert!(is_markdown(Path::new("a/b.md")));
        assert!(is_markdown(Path::new("B.MD")));
        assert!(!is_markdown(Path::new("b.markdown.txt")));
    }
}
