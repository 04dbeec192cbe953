//! Event renderer producing Confluence storage format.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Tag, TagEnd};

use crate::converter::{Attachment, front_matter_title};
use crate::references::{
    Reference, ReferenceKind, ReferenceResolver, Resolution, Target, classify, pending_url,
};
use crate::state::{CodeBlockState, HeadingState, ImageState, TableState, Warnings, escape_html};
use crate::storage::{self, ImageSource, Panel};
use crate::util::{fence_language, heading_level_to_num};

/// Result of rendering one document.
#[derive(Debug, Default)]
pub(crate) struct RenderOutput {
    /// Front matter title, else the first H1.
    pub title: Option<String>,
    pub body: String,
    pub references: Vec<Reference>,
    pub attachments: Vec<Attachment>,
    pub pending: Vec<String>,
    pub unavailable: Vec<String>,
    /// Targets that are neither documents, assets nor URLs.
    pub invalid: Vec<String>,
    pub warnings: Vec<String>,
}

/// Renders pulldown-cmark events to Confluence storage format.
pub(crate) struct StorageRenderer<'a> {
    /// Path of the document being rendered, relative to the publish root.
    document: &'a str,
    resolver: &'a dyn ReferenceResolver,
    /// Heading slug to heading text.
    anchors: &'a HashMap<String, String>,
    ignore_invalid_url: bool,
    output: String,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    heading: HeadingState,
    /// Image source (None if unresolvable) and title waiting for alt text.
    pending_image: Option<(Option<ImageSource>, String)>,
    /// Closing markup for each open link.
    link_stack: Vec<&'static str>,
    /// Buffer while inside a YAML metadata block.
    metadata: Option<String>,
    front_matter_title: Option<String>,
    /// Buffer while inside a raw HTML block.
    html_block: Option<String>,
    in_html_comment: bool,
    /// Footnote label to prefix the next paragraph with.
    footnote_label: Option<String>,
    references: Vec<Reference>,
    attachments: Vec<Attachment>,
    pending: Vec<String>,
    unavailable: Vec<String>,
    invalid: Vec<String>,
    warnings: Warnings,
}

impl<'a> StorageRenderer<'a> {
    pub fn new(
        document: &'a str,
        resolver: &'a dyn ReferenceResolver,
        anchors: &'a HashMap<String, String>,
        ignore_invalid_url: bool,
    ) -> Self {
        Self {
            document,
            resolver,
            anchors,
            ignore_invalid_url,
            output: String::with_capacity(4096),
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            heading: HeadingState::new(true),
            pending_image: None,
            link_stack: Vec::new(),
            metadata: None,
            front_matter_title: None,
            html_block: None,
            in_html_comment: false,
            footnote_label: None,
            references: Vec::new(),
            attachments: Vec::new(),
            pending: Vec::new(),
            unavailable: Vec::new(),
            invalid: Vec::new(),
            warnings: Warnings::default(),
        }
    }

    /// Render markdown events and return the result.
    pub fn render<'e, I>(mut self, events: I) -> RenderOutput
    where
        I: Iterator<Item = Event<'e>>,
    {
        for event in events {
            self.process_event(event);
        }

        let h1_title = self.heading.take_title();
        RenderOutput {
            title: self.front_matter_title.or(h1_title),
            body: self.output,
            references: self.references,
            attachments: self.attachments,
            pending: self.pending,
            unavailable: self.unavailable,
            invalid: self.invalid,
            warnings: self.warnings.into_vec(),
        }
    }

    /// Push inline content to output or heading buffer based on context.
    fn push_inline(&mut self, content: &str) {
        if self.heading.is_in_first_h1() || self.image.is_active() {
            return;
        }
        if self.heading.is_active() {
            self.heading.push_html(content);
        } else {
            self.output.push_str(content);
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.warnings
                    .once("math", "math rendered as inline code");
                self.inline_code(&math);
            }
            Event::Html(html) => self.html_block_chunk(&html),
            Event::InlineHtml(html) => self.inline_html(&html),
            Event::FootnoteReference(label) => {
                self.warnings
                    .once("footnote", "footnotes rendered as bracketed text");
                self.push_inline(&format!("<sup>[{}]</sup>", escape_html(&label)));
            }
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.output.push_str(if checked { "[x] " } else { "[ ] " });
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.output.push_str("<p>");
                if let Some(label) = self.footnote_label.take() {
                    self.output
                        .push_str(&format!("<sup>[{}]</sup> ", escape_html(&label)));
                }
            }
            Tag::Heading { level, .. } => {
                // Opening tag is written in end_tag once the level is final.
                self.heading.start_heading(heading_level_to_num(level));
            }
            Tag::BlockQuote(kind) => {
                let panel = kind.map_or(Panel::Info, Panel::from);
                storage::panel_start(panel, &mut self.output);
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(ref info) => fence_language(info),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(lang);
            }
            Tag::HtmlBlock => {
                self.html_block = Some(String::new());
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => self.output.push_str(&format!(r#"<ol start="{n}">"#)),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => {
                self.output.push_str("<li>");
            }
            Tag::FootnoteDefinition(label) => {
                self.warnings
                    .once("footnote", "footnotes rendered as bracketed text");
                self.footnote_label = Some(label.to_string());
            }
            Tag::DefinitionList => {
                self.warnings.once(
                    "definition-list",
                    "definition lists rendered as paragraphs and lists",
                );
            }
            Tag::DefinitionListTitle => {
                self.output.push_str("<p><strong>");
            }
            Tag::DefinitionListDefinition => {
                self.output.push_str("<ul><li>");
            }
            Tag::Table(alignments) => {
                self.table.start(alignments);
                self.output.push_str("<table>");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => {
                self.table.start_row();
                self.output.push_str("<tr>");
            }
            Tag::TableCell => {
                let align = self.table.current_alignment_style();
                let tag = if self.table.is_in_head() { "th" } else { "td" };
                self.output.push_str(&format!("<{tag}{align}>"));
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                ..
            } => self.start_link(link_type, &dest_url),
            Tag::Image {
                dest_url, title, ..
            } => {
                let source = self.resolve_image(&dest_url);
                // Alt text is collected until the end tag.
                self.image.start();
                self.pending_image = Some((source, title.to_string()));
            }
            Tag::MetadataBlock(_) => {
                self.metadata = Some(String::new());
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.output.push_str("</p>");
            }
            TagEnd::Heading(_level) => {
                if self.heading.is_in_first_h1() {
                    self.heading.complete_first_h1();
                } else if let Some((level, html)) = self.heading.complete_heading() {
                    self.output
                        .push_str(&format!("<h{level}>{}</h{level}>", html.trim()));
                }
            }
            TagEnd::BlockQuote(_) => storage::panel_end(&mut self.output),
            TagEnd::CodeBlock => {
                let (lang, content) = self.code.end();
                storage::code_block(lang.as_deref(), &content, &mut self.output);
            }
            TagEnd::HtmlBlock => self.flush_html_block(),
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => {
                self.output.push_str("</li>");
            }
            TagEnd::FootnoteDefinition => {
                self.footnote_label = None;
            }
            TagEnd::DefinitionList => {}
            TagEnd::DefinitionListTitle => {
                self.output.push_str("</strong></p>");
            }
            TagEnd::DefinitionListDefinition => {
                self.output.push_str("</li></ul>");
            }
            TagEnd::Table => {
                self.output.push_str("</tbody></table>");
            }
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.table.end_head();
            }
            TagEnd::TableRow => {
                self.output.push_str("</tr>");
            }
            TagEnd::TableCell => {
                self.output.push_str(if self.table.is_in_head() {
                    "</th>"
                } else {
                    "</td>"
                });
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => {
                let close = self.link_stack.pop().unwrap_or_default();
                self.push_inline(close);
            }
            TagEnd::Image => {
                let alt = self.image.end();
                if let Some((source, title)) = self.pending_image.take() {
                    match source {
                        Some(source) => self.push_inline(&storage::image(&source, &alt, &title)),
                        None => self.push_inline(&escape_html(&alt)),
                    }
                }
            }
            TagEnd::MetadataBlock(_) => self.finish_metadata(),
        }
    }

    fn text(&mut self, text: &str) {
        // Priority: metadata > code > image > first H1 > heading > normal text
        if let Some(metadata) = self.metadata.as_mut() {
            metadata.push_str(text);
            return;
        }

        if self.code.is_active() {
            self.code.push_str(text);
            return;
        }

        if self.image.is_active() {
            self.image.push_str(text);
            return;
        }

        if self.heading.is_in_first_h1() {
            self.heading.push_text(text);
            return;
        }

        if self.heading.is_active() {
            self.heading.push_text(text);
            self.heading.push_html(&escape_html(text));
            return;
        }

        self.output.push_str(&escape_html(text));
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
            return;
        }
        if self.heading.is_in_first_h1() || self.heading.is_active() {
            self.heading.push_text(code);
        }
        self.push_inline(&format!("<code>{}</code>", escape_html(code)));
    }

    fn soft_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str(" ");
        } else if self.heading.is_in_first_h1() || self.heading.is_active() {
            self.heading.push_text(" ");
            self.push_inline(" ");
        } else {
            self.output.push('\n');
        }
    }

    fn start_link(&mut self, link_type: LinkType, dest: &CowStr<'_>) {
        if link_type == LinkType::Email {
            self.open_link(&storage::href_start(&format!("mailto:{dest}")), storage::HREF_END);
            return;
        }

        match classify(self.document, dest) {
            Target::Anchor(fragment) => {
                self.references.push(Reference {
                    target: format!("#{fragment}"),
                    kind: ReferenceKind::IntraDocument,
                });
                let anchor = self
                    .anchors
                    .get(&fragment)
                    .cloned()
                    .unwrap_or(fragment);
                self.open_link(&storage::anchor_link_start(&anchor), storage::AC_LINK_END);
            }
            Target::External(url) => {
                self.open_link(&storage::href_start(&url), storage::HREF_END);
            }
            Target::Local(path) => match self.resolver.resolve_document(&path) {
                Some(resolution) => self.start_document_link(path, resolution),
                None if self.resolver.has_asset(&path) => {
                    let filename = self.attach(&path);
                    self.open_link(
                        &storage::attachment_link_start(&filename),
                        storage::AC_LINK_END,
                    );
                }
                None => {
                    self.invalid_target(dest);
                    self.link_stack.push("");
                }
            },
            Target::Invalid(_) => {
                self.invalid_target(dest);
                self.link_stack.push("");
            }
        }
    }

    fn start_document_link(&mut self, path: String, resolution: Resolution) {
        match resolution {
            Resolution::Resolved(link) => {
                self.open_link(&storage::href_start(&link.url), storage::HREF_END);
            }
            Resolution::Pending => {
                self.open_link(&storage::href_start(&pending_url(&path)), storage::HREF_END);
                if !self.pending.contains(&path) {
                    self.pending.push(path.clone());
                }
            }
            Resolution::Unavailable => {
                self.warnings.push(format!(
                    "link to '{path}' rendered as text: the document was not published"
                ));
                self.link_stack.push("");
                if !self.unavailable.contains(&path) {
                    self.unavailable.push(path.clone());
                }
            }
        }
        self.references.push(Reference {
            target: path,
            kind: ReferenceKind::InterDocument,
        });
    }

    fn open_link(&mut self, open: &str, close: &'static str) {
        self.push_inline(open);
        self.link_stack.push(close);
    }

    fn resolve_image(&mut self, dest: &str) -> Option<ImageSource> {
        match classify(self.document, dest) {
            Target::External(url) => {
                self.references.push(Reference {
                    target: url.clone(),
                    kind: ReferenceKind::Image,
                });
                Some(ImageSource::Url(url))
            }
            Target::Local(path) if self.resolver.has_asset(&path) => {
                let filename = self.attach(&path);
                self.references.push(Reference {
                    target: path,
                    kind: ReferenceKind::Image,
                });
                Some(ImageSource::Attachment(filename))
            }
            Target::Anchor(_) | Target::Local(_) | Target::Invalid(_) => {
                self.invalid_target(dest);
                None
            }
        }
    }

    /// Register a local file as an attachment and return its filename on the page.
    ///
    /// Distinct files sharing a basename get their full path, `/` replaced by `_`.
    fn attach(&mut self, path: &str) -> String {
        if let Some(existing) = self.attachments.iter().find(|a| a.path == path) {
            return existing.filename.clone();
        }
        let basename = path.rsplit('/').next().unwrap_or(path);
        let filename = if self.attachments.iter().any(|a| a.filename == basename) {
            path.replace('/', "_")
        } else {
            basename.to_owned()
        };
        self.attachments.push(Attachment {
            path: path.to_owned(),
            filename: filename.clone(),
        });
        filename
    }

    fn invalid_target(&mut self, dest: &str) {
        if self.ignore_invalid_url {
            self.warnings
                .push(format!("invalid link target '{dest}' rendered as text"));
        }
        self.invalid.push(dest.to_owned());
    }

    fn html_block_chunk(&mut self, html: &str) {
        let visible = self.strip_html_comments(html);
        if let Some(buffer) = self.html_block.as_mut() {
            buffer.push_str(&visible);
        } else if !visible.trim().is_empty() {
            self.warnings.once("html", "raw HTML rendered as text");
            self.output
                .push_str(&format!("<p>{}</p>", escape_html(visible.trim())));
        }
    }

    fn flush_html_block(&mut self) {
        let Some(html) = self.html_block.take() else {
            return;
        };
        let html = html.trim();
        if !html.is_empty() {
            self.warnings.once("html", "raw HTML rendered as text");
            self.output
                .push_str(&format!("<p>{}</p>", escape_html(html)));
        }
    }

    fn inline_html(&mut self, html: &str) {
        let visible = self.strip_html_comments(html);
        if !visible.is_empty() {
            self.warnings.once("html", "raw HTML rendered as text");
            if self.heading.is_in_first_h1() || self.heading.is_active() {
                self.heading.push_text(&visible);
            }
            self.push_inline(&escape_html(&visible));
        }
    }

    /// Remove `<!-- ... -->` comments, which may span several events.
    fn strip_html_comments(&mut self, html: &str) -> String {
        let mut visible = String::new();
        let mut rest = html;
        loop {
            if self.in_html_comment {
                let Some(end) = rest.find("-->") else {
                    return visible;
                };
                rest = &rest[end + 3..];
                self.in_html_comment = false;
            } else {
                let Some(start) = rest.find("<!--") else {
                    visible.push_str(rest);
                    return visible;
                };
                visible.push_str(&rest[..start]);
                rest = &rest[start + 4..];
                self.in_html_comment = true;
            }
        }
    }

    fn finish_metadata(&mut self) {
        let Some(yaml) = self.metadata.take() else {
            return;
        };
        if yaml.trim().is_empty() {
            return;
        }
        match front_matter_title(&yaml) {
            Ok(Some(title)) => {
                self.front_matter_title = Some(title);
                self.heading.disable_title_extraction();
            }
            Ok(None) => {}
            Err(e) => {
                self.warnings
                    .push(format!("front matter ignored: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use pulldown_cmark::Parser;

    use super::*;
    use crate::converter::parser_options;
    use crate::references::NoReferences;

    fn render(markdown: &str) -> RenderOutput {
        let anchors = HashMap::new();
        StorageRenderer::new("doc.md", &NoReferences, &anchors, true)
            .render(Parser::new_ext(markdown, parser_options()))
    }

    #[test]
    fn test_title_skipped_and_levels_shifted() {
        let out = render("# Title\n\n## Section\n\nText\n\n### Sub");
        assert_eq!(out.title.as_deref(), Some("Title"));
        assert_eq!(out.body, "<h1>Section</h1><p>Text</p><h2>Sub</h2>");
    }

    #[test]
    fn test_title_markup_not_rendered() {
        let out = render("# The *big* `idea`\n\nBody");
        assert_eq!(out.title.as_deref(), Some("The big idea"));
        assert_eq!(out.body, "<p>Body</p>");
    }

    #[test]
    fn test_front_matter_title_keeps_h1() {
        let out = render("---\ntitle: From Meta\n---\n\n# Heading\n\n## Sub");
        assert_eq!(out.title.as_deref(), Some("From Meta"));
        assert_eq!(out.body, "<h1>Heading</h1><h2>Sub</h2>");
    }

    #[test]
    fn test_no_heading_no_title() {
        let out = render("Just text.");
        assert_eq!(out.title, None);
        assert_eq!(out.body, "<p>Just text.</p>");
    }

    #[test]
    fn test_inline_formatting() {
        let out = render("**bold** *em* ~~gone~~ `code`");
        assert_eq!(
            out.body,
            "<p><strong>bold</strong> <em>em</em> <s>gone</s> <code>code</code></p>"
        );
    }

    #[test]
    fn test_ordered_list_with_start() {
        let out = render("3. three\n4. four");
        assert_eq!(out.body, r#"<ol start="3"><li>three</li><li>four</li></ol>"#);
    }

    #[test]
    fn test_nested_list() {
        let out = render("- a\n  - b");
        assert_eq!(out.body, "<ul><li>a<ul><li>b</li></ul></li></ul>");
    }

    #[test]
    fn test_table_with_alignment() {
        let out = render("| A | B |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(
            out.body,
            r#"<table><thead><tr><th style="text-align:left">A</th><th style="text-align:right">B</th></tr></thead><tbody><tr><td style="text-align:left">1</td><td style="text-align:right">2</td></tr></tbody></table>"#
        );
    }

    #[test]
    fn test_code_block() {
        let out = render("```rust\nfn main() {}\n```");
        assert!(out.body.contains(r#"<ac:parameter ac:name="language">rust</ac:parameter>"#));
        assert!(out.body.contains("<![CDATA[fn main() {}\n]]>"));
    }

    #[test]
    fn test_blockquote_is_info_panel() {
        let out = render("> quoted");
        assert_eq!(
            out.body,
            r#"<ac:structured-macro ac:name="info" ac:schema-version="1"><ac:rich-text-body><p>quoted</p></ac:rich-text-body></ac:structured-macro>"#
        );
    }

    #[test]
    fn test_alert_maps_to_panel() {
        let out = render("> [!WARNING]\n> Careful");
        assert!(out.body.starts_with(r#"<ac:structured-macro ac:name="note""#));
        assert!(out.body.contains("<p>Careful</p>"));
    }

    #[test]
    fn test_task_list() {
        let out = render("- [x] done\n- [ ] todo");
        assert_eq!(out.body, "<ul><li>[x] done</li><li>[ ] todo</li></ul>");
    }

    #[test]
    fn test_hard_break_and_rule() {
        let out = render("a  \nb\n\n---");
        assert_eq!(out.body, "<p>a<br />b</p><hr />");
    }

    #[test]
    fn test_raw_html_escaped_with_single_warning() {
        let out = render("<div>one</div>\n\nText <b>two</b>");
        assert!(out.body.contains("&lt;div&gt;one&lt;/div&gt;"));
        assert!(out.body.contains("&lt;b&gt;two&lt;/b&gt;"));
        assert_eq!(out.warnings, vec!["raw HTML rendered as text".to_owned()]);
    }

    #[test]
    fn test_html_comments_dropped_silently() {
        let out = render("<!--\nhidden\n-->\n\nVisible <!-- inline -->");
        assert!(!out.body.contains("hidden"));
        assert!(!out.body.contains("inline"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_footnotes_degrade() {
        let out = render("Claim[^1].\n\n[^1]: Source.");
        assert!(out.body.contains("Claim<sup>[1]</sup>."));
        assert!(out.body.contains("<p><sup>[1]</sup> Source.</p>"));
        assert_eq!(
            out.warnings,
            vec!["footnotes rendered as bracketed text".to_owned()]
        );
    }

    #[test]
    fn test_math_degrades_to_code() {
        let out = render("Euler: $e^{i\\pi}$");
        assert!(out.body.contains("<code>e^{i\\pi}</code>"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_external_link_and_email() {
        let out = render("[site](https://example.com) <me@example.com>");
        assert_eq!(
            out.body,
            r#"<p><a href="https://example.com">site</a> <a href="mailto:me@example.com">me@example.com</a></p>"#
        );
        assert!(out.invalid.is_empty());
    }

    #[test]
    fn test_invalid_link_rendered_as_text() {
        let out = render("See [missing](missing.md).");
        assert_eq!(out.body, "<p>See missing.</p>");
        assert_eq!(out.invalid, vec!["missing.md".to_owned()]);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_external_image() {
        let out = render("![Logo](https://example.com/logo.png)");
        assert_eq!(
            out.body,
            r#"<p><ac:image ac:alt="Logo"><ri:url ri:value="https://example.com/logo.png" /></ac:image></p>"#
        );
        assert_eq!(out.references.len(), 1);
        assert_eq!(out.references[0].kind, ReferenceKind::Image);
    }

    #[test]
    fn test_definition_list_degrades() {
        let out = render("Term\n: Meaning");
        assert_eq!(
            out.body,
            "<p><strong>Term</strong></p><ul><li>Meaning</li></ul>"
        );
        assert_eq!(out.warnings.len(), 1);
    }
}
