//! In-memory Confluence for testing.
//!
//! Provides [`MockConfluence`], a [`PageApi`] implementation that keeps pages
//! and attachments in memory and counts mutations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use crate::api::{AttachmentRef, PageApi, PageUpdate, RemotePage};
use crate::error::ConfluenceError;

#[derive(Debug, Default)]
struct MockState {
    pages: BTreeMap<String, RemotePage>,
    attachments: BTreeMap<(String, String), Vec<u8>>,
    next_id: u64,
    creates: usize,
    updates: usize,
    uploads: usize,
    /// Page ID to the number of updates still to reject.
    version_conflicts: HashMap<String, usize>,
    failing_titles: HashSet<String>,
    failing_updates: HashSet<String>,
    auth_failure: bool,
}

/// Mock Confluence space for testing.
///
/// Use the builder methods to seed pages and inject faults.
///
/// # Example
///
/// ```ignore
/// use md2conf_confluence::{MockConfluence, PageApi};
///
/// let remote = MockConfluence::new("DOCS").with_page("Home", None, "<p>Hi</p>");
/// let page = remote.find_page_by_title("Home")?.unwrap();
/// ```
#[derive(Debug)]
pub struct MockConfluence {
    space_key: String,
    state: RwLock<MockState>,
}

impl Default for MockConfluence {
    fn default() -> Self {
        Self::new("DOCS")
    }
}

impl MockConfluence {
    /// Create an empty mock space.
    #[must_use]
    pub fn new(space_key: impl Into<String>) -> Self {
        Self {
            space_key: space_key.into(),
            state: RwLock::new(MockState {
                next_id: 1000,
                ..MockState::default()
            }),
        }
    }

    /// Seed a page. Seeded pages do not count as creates.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, title: &str, parent_id: Option<&str>, body: &str) -> Self {
        {
            let mut state = self.state.write().unwrap();
            let page = new_page(&mut state, &self.space_key, title, parent_id, body);
            state.pages.insert(page.id.clone(), page);
        }
        self
    }

    /// Make the next update of `page_id` fail with a version conflict, as if
    /// someone edited the page concurrently.
    #[must_use]
    pub fn with_version_conflict(self, page_id: &str) -> Self {
        self.with_version_conflicts(page_id, 1)
    }

    /// Make the next `times` updates of `page_id` fail with a version conflict.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_version_conflicts(self, page_id: &str, times: usize) -> Self {
        self.state
            .write()
            .unwrap()
            .version_conflicts
            .insert(page_id.to_owned(), times);
        self
    }

    /// Reject every update that sets this title with a server error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_update(self, title: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .failing_updates
            .insert(title.to_owned());
        self
    }

    /// Reject every create of a page with this title with a server error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_title(self, title: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .failing_titles
            .insert(title.to_owned());
        self
    }

    /// Reject every call with an authentication error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_auth_failure(self) -> Self {
        self.state.write().unwrap().auth_failure = true;
        self
    }

    /// All pages, ordered by ID.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn pages(&self) -> Vec<RemotePage> {
        self.state.read().unwrap().pages.values().cloned().collect()
    }

    /// Page with this title, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page(&self, title: &str) -> Option<RemotePage> {
        self.state
            .read()
            .unwrap()
            .pages
            .values()
            .find(|p| p.title == title)
            .cloned()
    }

    /// Filenames attached to a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn attachments(&self, page_id: &str) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .attachments
            .keys()
            .filter(|(id, _)| id == page_id)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Number of pages created through the API.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.state.read().unwrap().creates
    }

    /// Number of successful page updates.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.state.read().unwrap().updates
    }

    /// Number of attachment uploads.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.state.read().unwrap().uploads
    }

    fn check_auth(state: &MockState) -> Result<(), ConfluenceError> {
        if state.auth_failure {
            return Err(ConfluenceError::Auth {
                status: 401,
                body: r#"{"message":"Unauthorized"}"#.to_owned(),
            });
        }
        Ok(())
    }
}

fn new_page(
    state: &mut MockState,
    space_key: &str,
    title: &str,
    parent_id: Option<&str>,
    body: &str,
) -> RemotePage {
    state.next_id += 1;
    RemotePage {
        id: state.next_id.to_string(),
        title: title.to_owned(),
        space_key: space_key.to_owned(),
        version: 1,
        body: body.to_owned(),
        parent_id: parent_id.map(str::to_owned),
    }
}

impl PageApi for MockConfluence {
    fn space_key(&self) -> &str {
        &self.space_key
    }

    fn page_url(&self, page_id: &str) -> String {
        format!("https://mock.example.com/wiki/pages/viewpage.action?pageId={page_id}")
    }

    fn find_page_by_title(&self, title: &str) -> Result<Option<RemotePage>, ConfluenceError> {
        let state = self.state.read().unwrap();
        Self::check_auth(&state)?;
        Ok(state.pages.values().find(|p| p.title == title).cloned())
    }

    fn get_page(&self, page_id: &str) -> Result<RemotePage, ConfluenceError> {
        let state = self.state.read().unwrap();
        Self::check_auth(&state)?;
        state
            .pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| ConfluenceError::NotFound(format!("page {page_id}")))
    }

    fn create_page(
        &self,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<RemotePage, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        Self::check_auth(&state)?;
        if state.failing_titles.contains(title) {
            return Err(ConfluenceError::HttpResponse {
                status: 500,
                body: format!(r#"{{"message":"cannot create {title}"}}"#),
            });
        }
        if state.pages.values().any(|p| p.title == title) {
            return Err(ConfluenceError::Conflict {
                title: title.to_owned(),
            });
        }
        if let Some(parent) = parent_id
            && !state.pages.contains_key(parent)
        {
            return Err(ConfluenceError::NotFound(format!("parent page {parent}")));
        }
        let page = new_page(&mut state, &self.space_key, title, parent_id, body);
        state.pages.insert(page.id.clone(), page.clone());
        state.creates += 1;
        Ok(page)
    }

    fn update_page(&self, update: &PageUpdate<'_>) -> Result<RemotePage, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        Self::check_auth(&state)?;
        if state.failing_updates.contains(update.title) {
            return Err(ConfluenceError::HttpResponse {
                status: 500,
                body: format!(r#"{{"message":"cannot update {}"}}"#, update.title),
            });
        }
        let conflict = match state.version_conflicts.get_mut(update.page_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        let page = state
            .pages
            .get_mut(update.page_id)
            .ok_or_else(|| ConfluenceError::NotFound(format!("page {}", update.page_id)))?;
        if conflict {
            // Someone else saved a version in between.
            page.version += 1;
        }
        if page.version != update.expected_version {
            return Err(ConfluenceError::VersionConflict {
                page_id: update.page_id.to_owned(),
                expected: update.expected_version,
            });
        }
        page.title = update.title.to_owned();
        page.body = update.body.to_owned();
        if let Some(parent) = update.parent_id {
            page.parent_id = Some(parent.to_owned());
        }
        page.version += 1;
        let page = page.clone();
        state.updates += 1;
        Ok(page)
    }

    fn upload_attachment(
        &self,
        page_id: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<AttachmentRef, ConfluenceError> {
        let mut state = self.state.write().unwrap();
        Self::check_auth(&state)?;
        if !state.pages.contains_key(page_id) {
            return Err(ConfluenceError::NotFound(format!("page {page_id}")));
        }
        state
            .attachments
            .insert((page_id.to_owned(), filename.to_owned()), data.to_vec());
        state.uploads += 1;
        Ok(AttachmentRef {
            id: format!("att-{page_id}-{filename}"),
            filename: filename.to_owned(),
            page_id: page_id.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_create_then_find() {
        let remote = MockConfluence::new("DOCS");
        let created = remote.create_page("Guide", None, "<p>x</p>").unwrap();
        let found = remote.find_page_by_title("Guide").unwrap().unwrap();
        assert_eq!(created, found);
        assert_eq!(remote.create_count(), 1);
    }

    #[test]
    fn test_create_duplicate_is_conflict() {
        let remote = MockConfluence::new("DOCS").with_page("Guide", None, "");
        let err = remote.create_page("Guide", None, "").unwrap_err();
        assert!(matches!(err, ConfluenceError::Conflict { .. }));
    }

    #[test]
    fn test_update_with_stale_version_conflicts() {
        let remote = MockConfluence::new("DOCS").with_page("Guide", None, "");
        let id = remote.page("Guide").unwrap().id;
        let update = PageUpdate {
            page_id: &id,
            title: "Guide",
            parent_id: None,
            body: "<p>new</p>",
            expected_version: 7,
        };
        let err = remote.update_page(&update).unwrap_err();
        assert!(matches!(err, ConfluenceError::VersionConflict { expected: 7, .. }));
    }

    #[test]
    fn test_injected_version_conflict_fires_once() {
        let remote = MockConfluence::new("DOCS").with_page("Guide", None, "");
        let id = remote.page("Guide").unwrap().id;
        let remote = remote.with_version_conflict(&id);
        let update = PageUpdate {
            page_id: &id,
            title: "Guide",
            parent_id: None,
            body: "<p>new</p>",
            expected_version: 1,
        };
        assert!(remote.update_page(&update).is_err());

        let current = remote.get_page(&id).unwrap();
        let retry = PageUpdate {
            expected_version: current.version,
            ..update
        };
        let updated = remote.update_page(&retry).unwrap();
        assert_eq!(updated.version, 3);
        assert_eq!(remote.update_count(), 1);
    }

    #[test]
    fn test_repeated_version_conflicts() {
        let remote = MockConfluence::new("DOCS").with_page("Guide", None, "");
        let id = remote.page("Guide").unwrap().id;
        let remote = remote.with_version_conflicts(&id, 2);

        for _ in 0..2 {
            let current = remote.get_page(&id).unwrap();
            let update = PageUpdate {
                page_id: &id,
                title: "Guide",
                parent_id: None,
                body: "<p>new</p>",
                expected_version: current.version,
            };
            assert!(matches!(
                remote.update_page(&update),
                Err(ConfluenceError::VersionConflict { .. })
            ));
        }
        assert_eq!(remote.update_count(), 0);
    }

    #[test]
    fn test_failing_update() {
        let remote = MockConfluence::new("DOCS")
            .with_page("Guide", None, "<p>old</p>")
            .with_failing_update("Guide");
        let id = remote.page("Guide").unwrap().id;
        let update = PageUpdate {
            page_id: &id,
            title: "Guide",
            parent_id: None,
            body: "<p>new</p>",
            expected_version: 1,
        };

        let err = remote.update_page(&update).unwrap_err();

        assert!(matches!(err, ConfluenceError::HttpResponse { status: 500, .. }));
        assert_eq!(remote.page("Guide").unwrap().body, "<p>old</p>");
    }

    #[test]
    fn test_auth_failure() {
        let remote = MockConfluence::new("DOCS").with_auth_failure();
        let err = remote.find_page_by_title("x").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_upload_replaces_by_filename() {
        let remote = MockConfluence::new("DOCS").with_page("Guide", None, "");
        let id = remote.page("Guide").unwrap().id;
        remote.upload_attachment(&id, "a.png", b"1").unwrap();
        remote.upload_attachment(&id, "a.png", b"2").unwrap();
        assert_eq!(remote.attachments(&id), vec!["a.png".to_owned()]);
        assert_eq!(remote.upload_count(), 2);
    }
}
