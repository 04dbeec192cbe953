//! Markdown to Confluence storage format conversion.
//!
//! [`Converter`] turns one Markdown document into a [`StorageBody`]: storage
//! markup plus everything the publisher needs to know about it (title,
//! references, attachments, unresolved links, warnings).
//!
//! Link targets are answered by a [`ReferenceResolver`]. Links to documents
//! without a page yet are emitted as placeholders (`md2conf://pending/<path>`)
//! so a second conversion can fill them in.
//!
//! # Example
//!
//! ```
//! use md2conf_renderer::{Converter, ConverterOptions, NoReferences};
//!
//! let converter = Converter::new(ConverterOptions::default());
//! let body = converter
//!     .convert("intro.md", "# Intro\n\n**Bold** text", &NoReferences)
//!     .unwrap();
//! assert_eq!(body.title.as_deref(), Some("Intro"));
//! assert_eq!(body.body, "<p><strong>Bold</strong> text</p>");
//! ```

mod converter;
mod error;
mod references;
mod renderer;
mod state;
mod storage;
mod util;

pub use converter::{Attachment, Converter, ConverterOptions, StorageBody, extract_title};
pub use error::ConvertError;
pub use references::{
    NoReferences, PENDING_SCHEME, PageLink, Reference, ReferenceKind, ReferenceResolver,
    Resolution, pending_url,
};
pub use state::{escape_html, slugify};
