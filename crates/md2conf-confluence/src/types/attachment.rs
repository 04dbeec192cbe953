//! Attachment payloads.

use serde::Deserialize;

/// File attached to a page. Confluence stores the filename as the title.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub title: String,
}

/// Page of results from `/content/{id}/child/attachment`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsResponse {
    #[serde(default)]
    pub results: Vec<Attachment>,
}
