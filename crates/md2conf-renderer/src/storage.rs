//! Confluence storage format markup.
//!
//! Produces Confluence XHTML storage format elements:
//! - `ac:structured-macro` for code blocks, panels and child listings
//! - `ac:image` with `ri:url` or `ri:attachment` for images
//! - `ac:link` for anchors and attachments

use crate::state::escape_html;

/// Panel macro a block quote or alert is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Info,
    Tip,
    Note,
    Warning,
}

impl Panel {
    fn macro_name(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Tip => "tip",
            Self::Note => "note",
            Self::Warning => "warning",
        }
    }
}

impl From<pulldown_cmark::BlockQuoteKind> for Panel {
    fn from(kind: pulldown_cmark::BlockQuoteKind) -> Self {
        use pulldown_cmark::BlockQuoteKind;
        match kind {
            BlockQuoteKind::Note => Self::Info,
            BlockQuoteKind::Tip => Self::Tip,
            BlockQuoteKind::Important | BlockQuoteKind::Warning => Self::Note,
            BlockQuoteKind::Caution => Self::Warning,
        }
    }
}

/// Image source in storage format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImageSource {
    Url(String),
    Attachment(String),
}

/// Wrap text in CDATA, splitting any `]]>` so the section stays well-formed.
pub(crate) fn cdata(content: &str) -> String {
    format!("<![CDATA[{}]]>", content.replace("]]>", "]]]]><![CDATA[>"))
}

pub(crate) fn code_block(lang: Option<&str>, content: &str, out: &mut String) {
    out.push_str(r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#);
    if let Some(lang) = lang {
        out.push_str(&format!(
            r#"<ac:parameter ac:name="language">{}</ac:parameter>"#,
            escape_html(lang)
        ));
    }
    out.push_str(r#"<ac:parameter ac:name="linenumbers">true</ac:parameter>"#);
    out.push_str("<ac:plain-text-body>");
    out.push_str(&cdata(content));
    out.push_str("</ac:plain-text-body></ac:structured-macro>");
}

pub(crate) fn panel_start(panel: Panel, out: &mut String) {
    out.push_str(&format!(
        r#"<ac:structured-macro ac:name="{}" ac:schema-version="1"><ac:rich-text-body>"#,
        panel.macro_name()
    ));
}

pub(crate) fn panel_end(out: &mut String) {
    out.push_str("</ac:rich-text-body></ac:structured-macro>");
}

pub(crate) fn image(source: &ImageSource, alt: &str, title: &str) -> String {
    let mut attrs = String::new();
    if !alt.is_empty() {
        attrs.push_str(&format!(r#" ac:alt="{}""#, escape_html(alt)));
    }
    if !title.is_empty() {
        attrs.push_str(&format!(r#" ac:title="{}""#, escape_html(title)));
    }
    let inner = match source {
        ImageSource::Url(url) => format!(r#"<ri:url ri:value="{}" />"#, escape_html(url)),
        ImageSource::Attachment(filename) => {
            format!(r#"<ri:attachment ri:filename="{}" />"#, escape_html(filename))
        }
    };
    format!("<ac:image{attrs}>{inner}</ac:image>")
}

/// Opening markup of a plain hyperlink.
pub(crate) fn href_start(href: &str) -> String {
    format!(r#"<a href="{}">"#, escape_html(href))
}

pub(crate) const HREF_END: &str = "</a>";

/// Opening markup of a link to a heading on the same page.
pub(crate) fn anchor_link_start(anchor: &str) -> String {
    format!(
        r#"<ac:link ac:anchor="{}"><ac:link-body>"#,
        escape_html(anchor)
    )
}

/// Opening markup of a link to a file attached to the same page.
pub(crate) fn attachment_link_start(filename: &str) -> String {
    format!(
        r#"<ac:link><ri:attachment ri:filename="{}" /><ac:link-body>"#,
        escape_html(filename)
    )
}

pub(crate) const AC_LINK_END: &str = "</ac:link-body></ac:link>";

/// Macro listing the page's children, used for directory pages.
pub(crate) const CHILDREN_MACRO: &str = r#"<ac:structured-macro ac:name="children" ac:schema-version="2"><ac:parameter ac:name="all">true</ac:parameter></ac:structured-macro>"#;

/// "Generated by" footer line.
pub(crate) fn footer(text: &str) -> String {
    format!("<p><em>{}</em></p>", escape_html(text))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_code_block_with_language() {
        let mut out = String::new();
        code_block(Some("python"), "print('hello')", &mut out);
        assert_eq!(
            out,
            r#"<ac:structured-macro ac:name="code" ac:schema-version="1"><ac:parameter ac:name="language">python</ac:parameter><ac:parameter ac:name="linenumbers">true</ac:parameter><ac:plain-text-body><![CDATA[print('hello')]]></ac:plain-text-body></ac:structured-macro>"#
        );
    }

    #[test]
    fn test_code_block_without_language() {
        let mut out = String::new();
        code_block(None, "plain", &mut out);
        assert!(!out.contains(r#"ac:name="language""#));
        assert!(out.contains("<![CDATA[plain]]>"));
    }

    #[test]
    fn test_cdata_splits_terminator() {
        assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn test_panel() {
        let mut out = String::new();
        panel_start(Panel::Tip, &mut out);
        out.push_str("<p>x</p>");
        panel_end(&mut out);
        assert_eq!(
            out,
            r#"<ac:structured-macro ac:name="tip" ac:schema-version="1"><ac:rich-text-body><p>x</p></ac:rich-text-body></ac:structured-macro>"#
        );
    }

    #[test]
    fn test_alert_kinds_map_to_panels() {
        use pulldown_cmark::BlockQuoteKind;
        assert_eq!(Panel::from(BlockQuoteKind::Note), Panel::Info);
        assert_eq!(Panel::from(BlockQuoteKind::Warning), Panel::Note);
        assert_eq!(Panel::from(BlockQuoteKind::Caution), Panel::Warning);
    }

    #[test]
    fn test_external_image() {
        let out = image(
            &ImageSource::Url("https://example.com/a.png".to_owned()),
            "",
            "",
        );
        assert_eq!(
            out,
            r#"<ac:image><ri:url ri:value="https://example.com/a.png" /></ac:image>"#
        );
    }

    #[test]
    fn test_attachment_image_with_alt() {
        let out = image(&ImageSource::Attachment("d.png".to_owned()), "Diagram", "");
        assert_eq!(
            out,
            r#"<ac:image ac:alt="Diagram"><ri:attachment ri:filename="d.png" /></ac:image>"#
        );
    }

    #[test]
    fn test_footer_escapes_text() {
        assert_eq!(footer("A & B"), "<p><em>A &amp; B</em></p>");
    }
}
