//! Link and image target classification.
//!
//! Local targets are normalized to paths relative to the publish root using
//! `/` separators, the same form documents are keyed by.

use percent_encoding::percent_decode_str;

/// URL scheme used for links whose target page does not exist yet.
pub const PENDING_SCHEME: &str = "md2conf://pending/";

/// Kind of an outgoing reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `#anchor` within the same document.
    IntraDocument,
    /// Link to another local document.
    InterDocument,
    /// Embedded image, local or external.
    Image,
}

/// An outgoing reference found while converting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Normalized local path, anchor, or external URL.
    pub target: String,
    pub kind: ReferenceKind,
}

/// A published page a link can point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub page_id: String,
    pub url: String,
}

/// Outcome of resolving a local document target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The target page exists.
    Resolved(PageLink),
    /// The target page will exist after the first publish pass.
    Pending,
    /// The target document failed and has no page.
    Unavailable,
}

/// Answers questions about local targets during conversion.
pub trait ReferenceResolver {
    /// Resolve a document (or directory) path. `None` if it is not a document
    /// of this run.
    fn resolve_document(&self, path: &str) -> Option<Resolution>;

    /// Whether a non-document local file exists and can be attached.
    fn has_asset(&self, path: &str) -> bool;
}

/// Resolver that knows nothing. Every local target is invalid.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferences;

impl ReferenceResolver for NoReferences {
    fn resolve_document(&self, _path: &str) -> Option<Resolution> {
        None
    }

    fn has_asset(&self, _path: &str) -> bool {
        false
    }
}

/// Classified link or image destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// `#fragment` in the current document.
    Anchor(String),
    /// URL with a scheme.
    External(String),
    /// Normalized local path. Any fragment or query is dropped.
    Local(String),
    /// Local path that cannot be normalized (escapes the root, bad encoding).
    Invalid(String),
}

/// Classify a destination relative to the document at `document_path`.
pub(crate) fn classify(document_path: &str, dest: &str) -> Target {
    let dest = dest.trim();
    if dest.is_empty() {
        return Target::Invalid(String::new());
    }
    if let Some(fragment) = dest.strip_prefix('#') {
        return Target::Anchor(fragment.to_owned());
    }
    if has_scheme(dest) {
        return Target::External(dest.to_owned());
    }

    let without_fragment = dest.split_once('#').map_or(dest, |(path, _)| path);
    let without_query = without_fragment
        .split_once('?')
        .map_or(without_fragment, |(path, _)| path);

    let Ok(decoded) = percent_decode_str(without_query).decode_utf8() else {
        return Target::Invalid(dest.to_owned());
    };

    match resolve_relative(document_path, &decoded) {
        Some(path) => Target::Local(path),
        None => Target::Invalid(dest.to_owned()),
    }
}

/// Whether `dest` starts with an RFC 3986 scheme (`ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`).
pub(crate) fn has_scheme(dest: &str) -> bool {
    let Some((scheme, _)) = dest.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve `target` against the directory of `document_path`.
///
/// A leading `/` resolves from the publish root. Returns `None` if the result
/// would leave the root. Trailing slashes are dropped, so `guide/` and `guide`
/// are the same directory.
pub(crate) fn resolve_relative(document_path: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        let mut dir: Vec<&str> = document_path.split('/').filter(|s| !s.is_empty()).collect();
        dir.pop();
        dir
    };

    for segment in target.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}

/// Placeholder URL for a link to a page that does not exist yet.
#[must_use]
pub fn pending_url(path: &str) -> String {
    format!("{PENDING_SCHEME}{path}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("mailto:someone@example.com"));
        assert!(has_scheme("svn+ssh://host/repo"));
        assert!(!has_scheme("guide/intro.md"));
        assert!(!has_scheme("1http://nope"));
        assert!(!has_scheme("./a:b.md"));
    }

    #[test]
    fn test_resolve_relative_sibling() {
        assert_eq!(
            resolve_relative("guide/intro.md", "setup.md"),
            Some("guide/setup.md".to_owned())
        );
    }

    #[test]
    fn test_resolve_relative_parent_and_dot() {
        assert_eq!(
            resolve_relative("guide/deep/page.md", "./../../README.md"),
            Some("README.md".to_owned())
        );
    }

    #[test]
    fn test_resolve_relative_root_absolute() {
        assert_eq!(
            resolve_relative("guide/intro.md", "/img/logo.png"),
            Some("img/logo.png".to_owned())
        );
    }

    #[test]
    fn test_resolve_relative_escaping_root() {
        assert_eq!(resolve_relative("intro.md", "../outside.md"), None);
    }

    #[test]
    fn test_resolve_relative_directory() {
        assert_eq!(
            resolve_relative("index.md", "guide/"),
            Some("guide".to_owned())
        );
    }

    #[test]
    fn test_classify_variants() {
        assert_eq!(
            classify("a.md", "#usage"),
            Target::Anchor("usage".to_owned())
        );
        assert_eq!(
            classify("a.md", "https://example.com/x"),
            Target::External("https://example.com/x".to_owned())
        );
        assert_eq!(
            classify("docs/a.md", "b%20c.md#part"),
            Target::Local("docs/b c.md".to_owned())
        );
        assert_eq!(
            classify("a.md", "../b.md"),
            Target::Invalid("../b.md".to_owned())
        );
    }

    #[test]
    fn test_pending_url() {
        assert_eq!(pending_url("guide/intro.md"), "md2conf://pending/guide/intro.md");
    }
}
