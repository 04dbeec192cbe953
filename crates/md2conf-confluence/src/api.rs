//! Page operations used by the synchronizer.
//!
//! [`PageApi`] is implemented by the live [`ConfluenceSession`](crate::ConfluenceSession)
//! and, with the `mock` feature, by [`MockConfluence`](crate::MockConfluence).

use crate::error::ConfluenceError;
use crate::types::Page;

/// A page as stored in the target space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePage {
    /// Stable page ID.
    pub id: String,
    pub title: String,
    pub space_key: String,
    /// Current version number.
    pub version: u32,
    /// Storage-format body.
    pub body: String,
    /// Direct parent page ID.
    pub parent_id: Option<String>,
}

impl RemotePage {
    /// Build from an API payload, using `space_key` when the payload has none.
    pub(crate) fn from_page(page: Page, space_key: &str) -> Self {
        let parent_id = page.parent_id().map(str::to_owned);
        let body = page.storage_value().to_owned();
        Self {
            id: page.id,
            title: page.title,
            space_key: page
                .space
                .map_or_else(|| space_key.to_owned(), |s| s.key),
            version: page.version.number,
            body,
            parent_id,
        }
    }
}

/// Final state to push to an existing page.
#[derive(Debug, Clone, Copy)]
pub struct PageUpdate<'a> {
    pub page_id: &'a str,
    pub title: &'a str,
    /// New parent. `None` leaves the page where it is.
    pub parent_id: Option<&'a str>,
    pub body: &'a str,
    /// Version the update is based on; the new version is one higher.
    pub expected_version: u32,
}

/// Uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: String,
    pub filename: String,
    pub page_id: String,
}

/// Remote page operations within one space.
pub trait PageApi {
    /// Key of the space all operations target.
    fn space_key(&self) -> &str;

    /// Browser URL of a page.
    fn page_url(&self, page_id: &str) -> String;

    /// Find a page by exact title in the space.
    fn find_page_by_title(&self, title: &str) -> Result<Option<RemotePage>, ConfluenceError>;

    /// Fetch a page with its body and version.
    fn get_page(&self, page_id: &str) -> Result<RemotePage, ConfluenceError>;

    /// Create a page. Fails with [`ConfluenceError::Conflict`] if the title is taken.
    fn create_page(
        &self,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<RemotePage, ConfluenceError>;

    /// Update a page. Fails with [`ConfluenceError::VersionConflict`] if the
    /// remote version is no longer `expected_version`.
    fn update_page(&self, update: &PageUpdate<'_>) -> Result<RemotePage, ConfluenceError>;

    /// Upload or replace an attachment, keyed by filename.
    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<AttachmentRef, ConfluenceError>;
}

/// Guess a MIME type from a filename extension.
pub(crate) fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("diagram.PNG"), "image/png");
        assert_eq!(content_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("logo.svg"), "image/svg+xml");
        assert_eq!(content_type_for("archive"), "application/octet-stream");
    }

    #[test]
    fn test_remote_page_falls_back_to_session_space() {
        let page: Page =
            serde_json::from_str(r#"{"id": "9", "title": "T", "version": {"number": 2}}"#)
                .unwrap();
        let remote = RemotePage::from_page(page, "DOCS");
        assert_eq!(remote.space_key, "DOCS");
        assert_eq!(remote.version, 2);
        assert_eq!(remote.parent_id, None);
    }
}
