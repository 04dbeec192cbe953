//! Confluence REST API client.
//!
//! Provides a sync HTTP session for the Confluence REST API with basic
//! (user name + API token) authentication.

mod attachments;
mod pages;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md2conf_config::ConfluenceSettings;
use tracing::{debug, info};
use ureq::Agent;

use crate::api::{AttachmentRef, PageApi, PageUpdate, RemotePage};
use crate::error::ConfluenceError;
use crate::types::{Space, User};

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Authenticated Confluence session bound to one space.
///
/// Created by [`ConfluenceSession::connect`]; released when dropped or
/// when [`ConfluenceSession::close`] is called.
pub struct ConfluenceSession {
    agent: Agent,
    base_url: String,
    auth_header: String,
    space_key: String,
}

impl ConfluenceSession {
    /// Authenticate and resolve the target space.
    ///
    /// Without a space key the user's personal space is used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::Config`] if the endpoint is malformed or the
    /// space does not exist, and [`ConfluenceError::Auth`] if the credentials
    /// are rejected.
    pub fn connect(settings: &ConfluenceSettings) -> Result<Self, ConfluenceError> {
        let base_url = endpoint(&settings.domain, &settings.base_path)?;

        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        let credentials = format!("{}:{}", settings.username, settings.api_key);
        let mut session = Self {
            agent,
            base_url,
            auth_header: format!("Basic {}", STANDARD.encode(credentials)),
            space_key: String::new(),
        };

        info!("Connecting to {} as {}", session.base_url, settings.username);
        let user = session.current_user()?;

        session.space_key = match settings.space_key.as_deref() {
            Some(key) => session.get_space(key)?.key,
            None => user.personal_space.map_or_else(
                || format!("~{}", settings.username),
                |space| space.key,
            ),
        };
        info!("Using space {}", session.space_key);

        Ok(session)
    }

    /// Release the session.
    pub fn close(self) {
        drop(self);
    }

    /// Site base URL, e.g. `https://example.atlassian.net/wiki`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the API base URL.
    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }

    fn current_user(&self) -> Result<User, ConfluenceError> {
        let url = format!("{}/user/current?expand=personalSpace", self.api_url());
        debug!("Checking credentials");

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

        Ok(body_reader.read_json()?)
    }

    fn get_space(&self, key: &str) -> Result<Space, ConfluenceError> {
        let url = format!("{}/space/{}", self.api_url(), encode_component(key));
        debug!("Resolving space {}", key);

        let response = self
            .agent
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status == 404 {
            return Err(ConfluenceError::Config(format!("space '{key}' not found")));
        }
        if status >= 400 {
            return Err(ConfluenceError::from_status(
                status,
                read_error_body(&mut body_reader),
            ));
        }

        Ok(body_reader.read_json()?)
    }
}

impl Drop for ConfluenceSession {
    fn drop(&mut self) {
        debug!("Closing Confluence session for {}", self.base_url);
    }
}

impl PageApi for ConfluenceSession {
    fn space_key(&self) -> &str {
        &self.space_key
    }

    fn page_url(&self, page_id: &str) -> String {
        format!("{}/pages/viewpage.action?pageId={}", self.base_url, page_id)
    }

    fn find_page_by_title(&self, title: &str) -> Result<Option<RemotePage>, ConfluenceError> {
        self.find_page_by_title(title)
    }

    fn get_page(&self, page_id: &str) -> Result<RemotePage, ConfluenceError> {
        self.get_page(page_id)
    }

    fn create_page(
        &self,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<RemotePage, ConfluenceError> {
        self.create_page(title, parent_id, body)
    }

    fn update_page(&self, update: &PageUpdate<'_>) -> Result<RemotePage, ConfluenceError> {
        self.update_page(update)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<AttachmentRef, ConfluenceError> {
        self.upload_attachment(page_id, filename, data)
    }
}

/// Build the site URL from a domain and base path.
fn endpoint(domain: &str, base_path: &str) -> Result<String, ConfluenceError> {
    let domain = domain.trim();
    if domain.is_empty() || domain.contains("://") || domain.contains('/') {
        return Err(ConfluenceError::Config(format!(
            "invalid Confluence domain: '{domain}'"
        )));
    }
    if !base_path.starts_with('/') {
        return Err(ConfluenceError::Config(format!(
            "invalid Confluence base path: '{base_path}'"
        )));
    }

    let url = format!("https://{domain}{}", base_path.trim_end_matches('/'));
    let uri: ureq::http::Uri = url
        .parse()
        .map_err(|e| ConfluenceError::Config(format!("invalid Confluence endpoint '{url}': {e}")))?;
    if uri.host().is_none_or(str::is_empty) {
        return Err(ConfluenceError::Config(format!(
            "invalid Confluence endpoint '{url}'"
        )));
    }
    Ok(url)
}

/// Percent-encode a path segment or query value.
pub(crate) fn encode_component(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC).to_string()
}

/// Read an error response body, tolerating read failures.
pub(crate) fn read_error_body(body: &mut ureq::Body) -> String {
    body.read_to_string()
        .unwrap_or_else(|_| "(unable to read error body)".to_owned())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_endpoint_default_wiki_path() {
        assert_eq!(
            endpoint("example.atlassian.net", "/wiki/").unwrap(),
            "https://example.atlassian.net/wiki"
        );
    }

    #[test]
    fn test_endpoint_root_path() {
        assert_eq!(
            endpoint("confluence.example.com", "/").unwrap(),
            "https://confluence.example.com"
        );
    }

    #[test]
    fn test_endpoint_rejects_scheme() {
        let err = endpoint("https://example.com", "/wiki/").unwrap_err();
        assert!(matches!(err, ConfluenceError::Config(_)));
    }

    #[test]
    fn test_endpoint_rejects_relative_base_path() {
        let err = endpoint("example.com", "wiki").unwrap_err();
        assert!(matches!(err, ConfluenceError::Config(_)));
    }

    #[test]
    fn test_endpoint_rejects_spaces_in_domain() {
        let err = endpoint("exa mple.com", "/wiki/").unwrap_err();
        assert!(matches!(err, ConfluenceError::Config(_)));
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("Getting Started"), "Getting%20Started");
        assert_eq!(encode_component("A&B"), "A%26B");
    }
}
