//! Mapping from local documents to remote pages.
//!
//! A page is identified by its title within the space. Each title is claimed
//! by exactly one local page per run, and each title is looked up or created
//! at most once.

use std::collections::HashMap;

use md2conf_confluence::{ConfluenceError, PageApi, RemotePage};
use tracing::{debug, info};

use crate::error::SyncError;

/// A resolved remote page.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPage {
    pub page: RemotePage,
    /// Whether the page was created by this run.
    pub created: bool,
}

/// Per-run title to page resolution.
pub(crate) struct IdentityResolver<'a, A: PageApi + ?Sized> {
    api: &'a A,
    /// Title to the key of the local page that claimed it.
    claims: HashMap<String, String>,
    resolved: HashMap<String, RemotePage>,
}

impl<'a, A: PageApi + ?Sized> IdentityResolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            claims: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Reserve `title` for the page `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateTitle`] if another page already claimed it.
    pub fn claim(&mut self, key: &str, title: &str) -> Result<(), SyncError> {
        if let Some(first) = self.claims.get(title) {
            return Err(SyncError::DuplicateTitle {
                title: title.to_owned(),
                first: first.clone(),
                second: key.to_owned(),
            });
        }
        self.claims.insert(title.to_owned(), key.to_owned());
        Ok(())
    }

    /// Find an existing page by title without creating it.
    pub fn lookup(&mut self, title: &str) -> Result<Option<RemotePage>, ConfluenceError> {
        if let Some(page) = self.resolved.get(title) {
            return Ok(Some(page.clone()));
        }
        let found = self.api.find_page_by_title(title)?;
        if let Some(page) = &found {
            self.resolved.insert(title.to_owned(), page.clone());
        }
        Ok(found)
    }

    /// Find the page titled `title`, creating it under `parent_id` with
    /// `body` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::Conflict`] if the page is created by someone
    /// else between the lookup and the create.
    pub fn resolve(
        &mut self,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<ResolvedPage, ConfluenceError> {
        if let Some(page) = self.lookup(title)? {
            debug!(page_id = %page.id, title, "Found existing page");
            return Ok(ResolvedPage {
                page,
                created: false,
            });
        }

        let page = self.api.create_page(title, parent_id, body)?;
        info!(page_id = %page.id, title, "Created page");

        self.resolved.insert(title.to_owned(), page.clone());
        Ok(ResolvedPage {
            page,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use md2conf_confluence::MockConfluence;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_claim_rejects_duplicate_title() {
        let mock = MockConfluence::new("DOCS");
        let mut identity = IdentityResolver::new(&mock);

        identity.claim("a.md", "Intro").unwrap();
        identity.claim("b.md", "Other").unwrap();
        let err = identity.claim("guide/a.md", "Intro").unwrap_err();

        match err {
            SyncError::DuplicateTitle {
                title,
                first,
                second,
            } => {
                assert_eq!(title, "Intro");
                assert_eq!(first, "a.md");
                assert_eq!(second, "guide/a.md");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_finds_existing_page() {
        let mock = MockConfluence::new("DOCS").with_page("Intro", None, "<p>old</p>");
        let mut identity = IdentityResolver::new(&mock);

        let resolved = identity.resolve("Intro", None, "<p>new</p>").unwrap();

        assert!(!resolved.created);
        assert_eq!(resolved.page.body, "<p>old</p>");
        assert_eq!(mock.create_count(), 0);
    }

    #[test]
    fn test_resolve_creates_once() {
        let mock = MockConfluence::new("DOCS");
        let mut identity = IdentityResolver::new(&mock);

        let first = identity.resolve("Intro", None, "<p>x</p>").unwrap();
        let second = identity.resolve("Intro", None, "<p>x</p>").unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.page.id, second.page.id);
        assert_eq!(mock.create_count(), 1);
    }

    #[test]
    fn test_lookup_missing_page() {
        let mock = MockConfluence::new("DOCS");
        let mut identity = IdentityResolver::new(&mock);
        assert!(identity.lookup("Nowhere").unwrap().is_none());
    }
}
