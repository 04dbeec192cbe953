//! Synchronization errors.

use std::path::PathBuf;

use md2conf_confluence::ConfluenceError;
use md2conf_renderer::ConvertError;

/// Error that aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Input path does not exist.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input file is not a Markdown document.
    #[error("not a Markdown file: {}", .0.display())]
    NotMarkdown(PathBuf),

    /// Two local documents would publish to the same page title.
    #[error("duplicate page title '{title}' for {first} and {second}")]
    DuplicateTitle {
        title: String,
        first: String,
        second: String,
    },

    /// Configured root page does not exist in the space.
    #[error("root page '{0}' not found in the space")]
    RootPageNotFound(String),

    /// Failed to read the input tree.
    #[error("I/O error reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run-level remote failure (configuration, authentication).
    #[error("Confluence error: {0}")]
    Remote(#[source] ConfluenceError),
}

impl SyncError {
    /// Server response body for remote errors.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Remote(e) => e.payload(),
            _ => None,
        }
    }
}

/// Error that fails a single document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Conversion(#[from] ConvertError),

    #[error(transparent)]
    Remote(#[from] ConfluenceError),

    /// Local attachment could not be read.
    #[error("cannot read attachment {path}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Parent page was not published.
    #[error("parent {parent} was not published")]
    ParentUnavailable { parent: String },
}
