//! Page operations for Confluence API.

use serde_json::json;
use tracing::info;

use super::{ConfluenceSession, encode_component, read_error_body};
use crate::api::{PageUpdate, RemotePage};
use crate::error::ConfluenceError;
use crate::types::{Page, PagesResponse};

/// Expansions needed to build a [`RemotePage`].
const PAGE_EXPAND: &str = "body.storage,version,ancestors,space";

/// Version comment attached to every update.
const VERSION_MESSAGE: &str = "Synchronized from Markdown source";

impl ConfluenceSession {
    /// Find page by exact title within the session space.
    pub(crate) fn find_page_by_title(
        &self,
        title: &str,
    ) -> Result<Option<RemotePage>, ConfluenceError> {
        let url = format!(
            "{}/content?type=page&spaceKey={}&title={}&expand={}",
            self.api_url(),
            encode_component(&self.space_key),
            encode_component(title),
            PAGE_EXPAND
        );

        info!("Looking up page '{}' in space {}", title, self.space_key);

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

        let pages: PagesResponse = body_reader.read_json()?;
        Ok(pages
            .results
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| RemotePage::from_page(p, &self.space_key)))
    }

    /// Get page by ID with body, version and ancestors.
    pub(crate) fn get_page(&self, page_id: &str) -> Result<RemotePage, ConfluenceError> {
        let url = format!(
            "{}/content/{}?expand={}",
            self.api_url(),
            page_id,
            PAGE_EXPAND
        );

        info!("Getting page {}", page_id);

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

        let page: Page = body_reader.read_json()?;
        Ok(RemotePage::from_page(page, &self.space_key))
    }

    /// Create page in the session space.
    pub(crate) fn create_page(
        &self,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<RemotePage, ConfluenceError> {
        let url = format!("{}/content", self.api_url());

        let mut payload = json!({
            "type": "page",
            "title": title,
            "space": {"key": self.space_key},
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            }
        });

        if let Some(parent) = parent_id {
            payload["ancestors"] = json!([{"id": parent}]);
        }

        info!(
            "Creating page '{}' in space {} (parent: {})",
            title,
            self.space_key,
            parent_id.unwrap_or("none")
        );

        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            let error_body = read_error_body(&mut body_reader);
            if matches!(status, 400 | 409) && is_duplicate_title(&error_body) {
                return Err(ConfluenceError::Conflict {
                    title: title.to_owned(),
                });
            }
            return Err(ConfluenceError::from_status(status, error_body));
        }

        let page: Page = body_reader.read_json()?;
        info!("Created page '{}' with id {}", title, page.id);
        Ok(RemotePage::from_page(page, &self.space_key))
    }

    /// Update existing page (increments version).
    pub(crate) fn update_page(
        &self,
        update: &PageUpdate<'_>,
    ) -> Result<RemotePage, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), update.page_id);
        let next_version = update.expected_version + 1;

        let mut payload = json!({
            "type": "page",
            "title": update.title,
            "body": {
                "storage": {
                    "value": update.body,
                    "representation": "storage"
                }
            },
            "version": {"number": next_version, "message": VERSION_MESSAGE}
        });

        if let Some(parent) = update.parent_id {
            payload["ancestors"] = json!([{"id": parent}]);
        }

        info!(
            "Updating page {} from version {} to {}",
            update.page_id, update.expected_version, next_version
        );

        let payload_bytes = serde_json::to_vec(&payload)?;

        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload_bytes[..])?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            return Err(update_error(
                update,
                status,
                read_error_body(&mut body_reader),
            ));
        }

        let page: Page = body_reader.read_json()?;
        info!(
            "Updated page {} to version {}",
            update.page_id, page.version.number
        );
        Ok(RemotePage::from_page(page, &self.space_key))
    }
}

/// Classify a failed page update.
///
/// A 409 is a version conflict unless the body reports a title collision.
fn update_error(update: &PageUpdate<'_>, status: u16, body: String) -> ConfluenceError {
    if matches!(status, 400 | 409) && is_duplicate_title(&body) {
        return ConfluenceError::Conflict {
            title: update.title.to_owned(),
        };
    }
    if status == 409 {
        return ConfluenceError::VersionConflict {
            page_id: update.page_id.to_owned(),
            expected: update.expected_version,
        };
    }
    ConfluenceError::from_status(status, body)
}

/// Whether an error body reports a title collision.
fn is_duplicate_title(body: &str) -> bool {
    body.to_ascii_lowercase().contains("already exists")
}
