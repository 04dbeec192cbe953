//! Markdown document to storage body conversion.

use std::collections::HashMap;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::error::ConvertError;
use crate::references::{Reference, ReferenceResolver};
use crate::renderer::StorageRenderer;
use crate::state::slugify;
use crate::storage;

/// Parser options used for every document.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_MATH
        | Options::ENABLE_GFM
        | Options::ENABLE_DEFINITION_LIST
}

/// Conversion settings.
#[derive(Debug, Clone, Default)]
pub struct ConverterOptions {
    /// Render invalid link targets as text with a warning instead of failing.
    pub ignore_invalid_url: bool,
    /// Footer line appended to every page; `None` disables it.
    pub generated_by: Option<String>,
}

/// Local file to upload as an attachment of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Path relative to the publish root.
    pub path: String,
    /// Filename on the page.
    pub filename: String,
}

/// A converted document.
#[derive(Debug, Clone, Default)]
pub struct StorageBody {
    /// Front matter title, else the first H1.
    pub title: Option<String>,
    /// Storage-format markup.
    pub body: String,
    /// Every outgoing link and image reference.
    pub references: Vec<Reference>,
    pub attachments: Vec<Attachment>,
    /// Document paths linked through placeholders.
    pub pending: Vec<String>,
    /// Document paths whose pages do not exist; links rendered as text.
    pub unavailable: Vec<String>,
    pub warnings: Vec<String>,
}

/// Converts Markdown documents to Confluence storage format.
///
/// Conversion is pure: link targets are answered by a [`ReferenceResolver`]
/// and nothing touches the network.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConverterOptions,
}

impl Converter {
    #[must_use]
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert one document.
    ///
    /// `path` is the document's path relative to the publish root; relative
    /// link targets resolve against its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidReference`] when a link or image target
    /// is neither a document, an existing local file nor a URL, unless
    /// invalid URLs are ignored.
    pub fn convert(
        &self,
        path: &str,
        markdown: &str,
        resolver: &dyn ReferenceResolver,
    ) -> Result<StorageBody, ConvertError> {
        let anchors = heading_anchors(markdown);
        let output = StorageRenderer::new(path, resolver, &anchors, self.options.ignore_invalid_url)
            .render(Parser::new_ext(markdown, parser_options()));

        if !output.invalid.is_empty() && !self.options.ignore_invalid_url {
            return Err(ConvertError::InvalidReference {
                document: path.to_owned(),
                targets: output.invalid,
            });
        }

        let mut body = output.body;
        self.push_footer(&mut body);

        Ok(StorageBody {
            title: output.title,
            body,
            references: output.references,
            attachments: output.attachments,
            pending: output.pending,
            unavailable: output.unavailable,
            warnings: output.warnings,
        })
    }

    /// Body of a page standing in for a directory without an index document.
    #[must_use]
    pub fn directory_page(&self) -> String {
        let mut body = storage::CHILDREN_MACRO.to_owned();
        self.push_footer(&mut body);
        body
    }

    fn push_footer(&self, body: &mut String) {
        if let Some(text) = self.options.generated_by.as_deref()
            && !text.trim().is_empty()
        {
            body.push_str(&storage::footer(text));
        }
    }
}

/// Title of a document: front matter `title`, else the first H1.
#[must_use]
pub fn extract_title(markdown: &str) -> Option<String> {
    let mut in_metadata = false;
    let mut metadata = String::new();
    let mut in_h1 = false;
    let mut h1 = String::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::MetadataBlock(_)) => in_metadata = true,
            Event::End(TagEnd::MetadataBlock(_)) => {
                in_metadata = false;
                if let Ok(Some(title)) = front_matter_title(&metadata) {
                    return Some(title);
                }
            }
            Event::Start(Tag::Heading { level, .. }) if level == pulldown_cmark::HeadingLevel::H1 => {
                in_h1 = true;
            }
            Event::End(TagEnd::Heading(_)) if in_h1 => {
                let title = h1.trim();
                return (!title.is_empty()).then(|| title.to_owned());
            }
            Event::Text(text) | Event::Code(text) if in_metadata => metadata.push_str(&text),
            Event::Text(text) | Event::Code(text) if in_h1 => h1.push_str(&text),
            Event::SoftBreak if in_h1 => h1.push(' '),
            _ => {}
        }
    }
    None
}

/// `title` field of YAML front matter, if present and non-empty.
pub(crate) fn front_matter_title(yaml: &str) -> Result<Option<String>, serde_yaml::Error> {
    #[derive(serde::Deserialize)]
    struct FrontMatter {
        title: Option<String>,
    }

    let front_matter: FrontMatter = serde_yaml::from_str(yaml)?;
    Ok(front_matter
        .title
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty()))
}

/// Map heading slugs to heading text, numbering repeated slugs `-1`, `-2`, ...
fn heading_anchors(markdown: &str) -> HashMap<String, String> {
    let mut anchors = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut current: Option<String> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = current.take() {
                    let text = text.trim().to_owned();
                    let base = slugify(&text);
                    let count = counts.entry(base.clone()).or_default();
                    let slug = match *count {
                        0 => base,
                        n => format!("{base}-{n}"),
                    };
                    *count += 1;
                    anchors.entry(slug).or_insert(text);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            _ => {}
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::references::{NoReferences, PageLink, Resolution};

    /// Resolver over a fixed set of documents and assets.
    struct Fixture {
        documents: HashMap<&'static str, Resolution>,
        assets: Vec<&'static str>,
    }

    impl ReferenceResolver for Fixture {
        fn resolve_document(&self, path: &str) -> Option<Resolution> {
            self.documents.get(path).cloned()
        }

        fn has_asset(&self, path: &str) -> bool {
            self.assets.iter().any(|asset| *asset == path)
        }
    }

    fn fixture() -> Fixture {
        Fixture {
            documents: HashMap::from([
                (
                    "guide/setup.md",
                    Resolution::Resolved(PageLink {
                        page_id: "42".to_owned(),
                        url: "https://wiki.example.com/pages/viewpage.action?pageId=42".to_owned(),
                    }),
                ),
                ("guide/later.md", Resolution::Pending),
                ("broken.md", Resolution::Unavailable),
            ]),
            assets: vec!["guide/img/flow.png", "img/flow.png", "files/report.pdf"],
        }
    }

    fn strict() -> Converter {
        Converter::new(ConverterOptions {
            ignore_invalid_url: false,
            generated_by: None,
        })
    }

    #[test]
    fn test_resolved_link_points_at_page_id() {
        let body = strict()
            .convert("guide/intro.md", "[Setup](setup.md)", &fixture())
            .unwrap();
        assert_eq!(
            body.body,
            r#"<p><a href="https://wiki.example.com/pages/viewpage.action?pageId=42">Setup</a></p>"#
        );
        assert!(body.pending.is_empty());
    }

    #[test]
    fn test_pending_link_uses_placeholder() {
        let body = strict()
            .convert("guide/intro.md", "[Later](./later.md#top)", &fixture())
            .unwrap();
        assert_eq!(
            body.body,
            r#"<p><a href="md2conf://pending/guide/later.md">Later</a></p>"#
        );
        assert_eq!(body.pending, vec!["guide/later.md".to_owned()]);
    }

    #[test]
    fn test_unavailable_link_is_text_with_warning() {
        let body = strict()
            .convert("index.md", "See [broken](broken.md).", &fixture())
            .unwrap();
        assert_eq!(body.body, "<p>See broken.</p>");
        assert_eq!(body.unavailable, vec!["broken.md".to_owned()]);
        assert_eq!(body.warnings.len(), 1);
    }

    #[test]
    fn test_strict_invalid_reference_fails() {
        let err = strict()
            .convert("index.md", "[a](nope.md) and ![b](missing.png)", &fixture())
            .unwrap_err();
        let ConvertError::InvalidReference { document, targets } = err;
        assert_eq!(document, "index.md");
        assert_eq!(targets, vec!["nope.md".to_owned(), "missing.png".to_owned()]);
    }

    #[test]
    fn test_lenient_invalid_reference_is_text() {
        let converter = Converter::new(ConverterOptions {
            ignore_invalid_url: true,
            generated_by: None,
        });
        let body = converter
            .convert("index.md", "[a](nope.md)", &fixture())
            .unwrap();
        assert_eq!(body.body, "<p>a</p>");
        assert_eq!(
            body.warnings,
            vec!["invalid link target 'nope.md' rendered as text".to_owned()]
        );
    }

    #[test]
    fn test_local_images_become_attachments() {
        let body = strict()
            .convert(
                "guide/intro.md",
                "![one](img/flow.png) ![again](img/flow.png) ![root](/img/flow.png)",
                &fixture(),
            )
            .unwrap();
        assert_eq!(
            body.attachments,
            vec![
                Attachment {
                    path: "guide/img/flow.png".to_owned(),
                    filename: "flow.png".to_owned(),
                },
                Attachment {
                    path: "img/flow.png".to_owned(),
                    filename: "img_flow.png".to_owned(),
                },
            ]
        );
        assert!(body.body.contains(r#"<ri:attachment ri:filename="img_flow.png" />"#));
    }

    #[test]
    fn test_link_to_local_file_is_attachment_link() {
        let body = strict()
            .convert("index.md", "[Report](files/report.pdf)", &fixture())
            .unwrap();
        assert_eq!(
            body.body,
            r#"<p><ac:link><ri:attachment ri:filename="report.pdf" /><ac:link-body>Report</ac:link-body></ac:link></p>"#
        );
        assert_eq!(body.attachments.len(), 1);
    }

    #[test]
    fn test_anchor_link_uses_heading_text() {
        let body = strict()
            .convert(
                "index.md",
                "# Title\n\nJump to [usage](#usage-notes).\n\n## Usage Notes\n",
                &NoReferences,
            )
            .unwrap();
        assert!(body.body.contains(
            r#"<ac:link ac:anchor="Usage Notes"><ac:link-body>usage</ac:link-body></ac:link>"#
        ));
    }

    #[test]
    fn test_footer_appended_once() {
        let converter = Converter::new(ConverterOptions {
            ignore_invalid_url: false,
            generated_by: Some("Generated.".to_owned()),
        });
        let body = converter.convert("a.md", "Text", &NoReferences).unwrap();
        assert_eq!(body.body, "<p>Text</p><p><em>Generated.</em></p>");
        assert_eq!(body.body.matches("Generated.").count(), 1);
    }

    #[test]
    fn test_footer_disabled() {
        let body = strict().convert("a.md", "Text", &NoReferences).unwrap();
        assert_eq!(body.body, "<p>Text</p>");
    }

    #[test]
    fn test_directory_page() {
        let converter = Converter::new(ConverterOptions {
            ignore_invalid_url: false,
            generated_by: Some("Generated.".to_owned()),
        });
        let body = converter.directory_page();
        assert!(body.starts_with(r#"<ac:structured-macro ac:name="children""#));
        assert!(body.ends_with("<p><em>Generated.</em></p>"));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("Intro\n\n# Real Title\n\n# Other"),
            Some("Real Title".to_owned())
        );
        assert_eq!(
            extract_title("---\ntitle: Meta\n---\n# Heading"),
            Some("Meta".to_owned())
        );
        assert_eq!(extract_title("## Only H2"), None);
    }

    #[test]
    fn test_heading_anchors_deduplicate() {
        let anchors = heading_anchors("## Setup\n\n## Setup\n");
        assert_eq!(anchors.get("setup").map(String::as_str), Some("Setup"));
        assert_eq!(anchors.get("setup-1").map(String::as_str), Some("Setup"));
    }
}
