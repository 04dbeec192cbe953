//! Attachment operations for Confluence API.

use rand::RngExt;
use tracing::info;

use super::{ConfluenceSession, encode_component, read_error_body};
use crate::api::{AttachmentRef, content_type_for};
use crate::error::ConfluenceError;
use crate::types::{Attachment, AttachmentsResponse};

impl ConfluenceSession {
    /// Upload a file to a page, replacing the attachment with the same filename.
    ///
    /// New files are posted to the page's attachment collection; existing ones
    /// get a new version through their `data` endpoint.
    pub(crate) fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<AttachmentRef, ConfluenceError> {
        let collection = format!("{}/content/{}/child/attachment", self.api_url(), page_id);
        let existing = self.find_attachment(&collection, filename)?;

        let url = match &existing {
            Some(att) => format!("{collection}/{}/data", att.id),
            None => collection,
        };
        info!(
            page_id,
            filename,
            bytes = data.len(),
            replace = existing.is_some(),
            "Uploading attachment"
        );

        let boundary = format!(
            "----Md2confFormBoundary{:016x}",
            rand::rng().random::<u64>()
        );
        let form = MultipartForm::new(&boundary)
            .field("minorEdit", "true")
            .file(filename, content_type_for(filename), data)
            .finish();

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .send(&form[..])?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();
        if status >= 400 {
            return Err(ConfluenceError::from_status(
                status,
                read_error_body(&mut body_reader),
            ));
        }

        // The data endpoint answers with the attachment, the collection with a list.
        let attachment = if existing.is_some() {
            body_reader.read_json::<Attachment>()?
        } else {
            body_reader
                .read_json::<AttachmentsResponse>()?
                .results
                .into_iter()
                .next()
                .ok_or_else(|| ConfluenceError::HttpResponse {
                    status,
                    body: "empty attachment response".to_owned(),
                })?
        };

        Ok(AttachmentRef {
            id: attachment.id,
            filename: attachment.title,
            page_id: page_id.to_owned(),
        })
    }

    /// Attachment of the collection with exactly this filename.
    fn find_attachment(
        &self,
        collection: &str,
        filename: &str,
    ) -> Result<Option<Attachment>, ConfluenceError> {
        let url = format!("{collection}?filename={}", encode_component(filename));

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();
        if status >= 400 {
            return Err(ConfluenceError::from_status(
                status,
                read_error_body(&mut body_reader),
            ));
        }

        let attachments: AttachmentsResponse = body_reader.read_json()?;
        Ok(attachments
            .results
            .into_iter()
            .find(|a| a.title == filename))
    }
}

/// `multipart/form-data` body builder.
struct MultipartForm<'b> {
    boundary: &'b str,
    body: Vec<u8>,
}

impl<'b> MultipartForm<'b> {
    fn new(boundary: &'b str) -> Self {
        Self {
            boundary,
            body: Vec::with_capacity(512),
        }
    }

    fn field(mut self, name: &str, value: &str) -> Self {
        self.part_header(&format!("form-data; name=\"{name}\""), None);
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn file(mut self, filename: &str, content_type: &str, data: &[u8]) -> Self {
        let filename = filename.replace('"', "%22");
        self.part_header(
            &format!("form-data; name=\"file\"; filename=\"{filename}\""),
            Some(content_type),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }

    fn part_header(&mut self, disposition: &str, content_type: Option<&str>) {
        let mut header = format!(
            "--{}\r\nContent-Disposition: {disposition}\r\n",
            self.boundary
        );
        if let Some(content_type) = content_type {
            header.push_str(&format!("Content-Type: {content_type}\r\n"));
        }
        header.push_str("\r\n");
        self.body.extend_from_slice(header.as_bytes());
    }
}
