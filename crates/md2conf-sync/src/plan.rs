//! Publish plan state and link resolution.

use std::path::Path;

use md2conf_confluence::{PageApi, RemotePage};
use md2conf_renderer::{PageLink, ReferenceResolver, Resolution};

use crate::discovery::Discovery;
use crate::document::is_markdown;
use crate::error::DocumentError;
use crate::report::{DocumentReport, Outcome, SyncReport, UnresolvedReference};

/// Progress of one page through a run.
#[derive(Debug)]
pub(crate) enum EntryState {
    Pending,
    /// Body for the first pass, links to other pages still placeholders.
    Converted(String),
    /// The page exists remotely.
    Published { page: RemotePage, created: bool },
    /// Final body is on the page.
    Synced {
        page_id: String,
        outcome: Outcome,
        warnings: Vec<String>,
    },
    Failed {
        error: DocumentError,
        page_id: Option<String>,
    },
}

impl EntryState {
    pub fn failed(error: DocumentError) -> Self {
        Self::Failed {
            error,
            page_id: None,
        }
    }

    /// Remote page of the entry, if it got one.
    ///
    /// A page whose final update failed still exists, so its children keep it
    /// as their parent.
    fn page_id(&self) -> Option<&str> {
        match self {
            Self::Published { page, .. } => Some(&page.id),
            Self::Synced { page_id, .. } => Some(page_id),
            Self::Failed { page_id, .. } => page_id.as_deref(),
            Self::Pending | Self::Converted(_) => None,
        }
    }
}

/// Discovered pages and their state, indexed alike.
pub(crate) struct PublishPlan {
    pub discovery: Discovery,
    pub states: Vec<EntryState>,
    /// Parent of top-level pages.
    pub root_page_id: Option<String>,
    pub unresolved: Vec<UnresolvedReference>,
}

impl PublishPlan {
    pub fn new(discovery: Discovery, root_page_id: Option<String>) -> Self {
        let states = discovery.nodes.iter().map(|_| EntryState::Pending).collect();
        Self {
            discovery,
            states,
            root_page_id,
            unresolved: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Page ID the page at `index` goes under.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::ParentUnavailable`] if the parent has no page.
    pub fn parent_page_id(&self, index: usize) -> Result<Option<String>, DocumentError> {
        let Some(parent) = self.discovery.nodes[index].parent else {
            return Ok(self.root_page_id.clone());
        };
        self.states[parent]
            .page_id()
            .map(|id| Some(id.to_owned()))
            .ok_or_else(|| DocumentError::ParentUnavailable {
                parent: self.discovery.nodes[parent].key.clone(),
            })
    }

    pub fn into_report(self) -> SyncReport {
        let documents = self
            .discovery
            .nodes
            .into_iter()
            .zip(self.states)
            .map(|(node, state)| {
                let (outcome, page_id, warnings) = match state {
                    EntryState::Synced {
                        page_id,
                        outcome,
                        warnings,
                    } => (outcome, Some(page_id), warnings),
                    EntryState::Failed { error, page_id } => {
                        (Outcome::Failed(error.to_string()), page_id, Vec::new())
                    }
                    EntryState::Published { page, .. } => {
                        (Outcome::Failed("not synchronized".to_owned()), Some(page.id), Vec::new())
                    }
                    EntryState::Pending | EntryState::Converted(_) => {
                        (Outcome::Failed("not published".to_owned()), None, Vec::new())
                    }
                };
                DocumentReport {
                    key: node.key,
                    title: node.title,
                    outcome,
                    page_id,
                    warnings,
                }
            })
            .collect();

        SyncReport {
            documents,
            unresolved: self.unresolved,
        }
    }
}

/// Answers link targets from the plan.
pub(crate) struct PlanResolver<'p> {
    discovery: &'p Discovery,
    resolutions: Vec<Resolution>,
}

impl<'p> PlanResolver<'p> {
    /// Resolver for the first pass: every page is still to be published.
    pub fn pending(discovery: &'p Discovery) -> Self {
        Self {
            discovery,
            resolutions: vec![Resolution::Pending; discovery.nodes.len()],
        }
    }

    /// Resolver for the second pass: published pages resolve to their URL,
    /// everything else is unavailable.
    pub fn published<A: PageApi + ?Sized>(
        discovery: &'p Discovery,
        states: &[EntryState],
        api: &A,
    ) -> Self {
        let resolutions = states
            .iter()
            .map(|state| match state.page_id() {
                Some(page_id) => Resolution::Resolved(PageLink {
                    page_id: page_id.to_owned(),
                    url: api.page_url(page_id),
                }),
                None => Resolution::Unavailable,
            })
            .collect();
        Self {
            discovery,
            resolutions,
        }
    }
}

impl ReferenceResolver for PlanResolver<'_> {
    fn resolve_document(&self, path: &str) -> Option<Resolution> {
        let index = self.discovery.index_of(path)?;
        self.resolutions.get(index).cloned()
    }

    fn has_asset(&self, path: &str) -> bool {
        !path.is_empty()
            && !is_markdown(Path::new(path))
            && self.discovery.root.join(path).is_file()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use md2conf_confluence::MockConfluence;
    use pretty_assertions::assert_eq;

    use super::*;

    fn discovery(files: &[(&str, &str)]) -> (tempfile::TempDir, Discovery) {
        let temp = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let discovery = Discovery::discover(temp.path()).unwrap();
        (temp, discovery)
    }

    fn published(id: &str) -> EntryState {
        EntryState::Published {
            page: RemotePage {
                id: id.to_owned(),
                title: String::new(),
                space_key: "DOCS".to_owned(),
                version: 1,
                body: String::new(),
                parent_id: None,
            },
            created: true,
        }
    }

    #[test]
    fn test_parent_page_id() {
        let (_temp, discovery) = discovery(&[("guide/intro.md", "# Intro\n")]);
        let mut plan = PublishPlan::new(discovery, Some("42".to_owned()));

        assert_eq!(plan.parent_page_id(0).unwrap(), Some("42".to_owned()));

        let err = plan.parent_page_id(1).unwrap_err();
        assert!(matches!(err, DocumentError::ParentUnavailable { parent } if parent == "guide"));

        plan.states[0] = published("7");
        assert_eq!(plan.parent_page_id(1).unwrap(), Some("7".to_owned()));
    }

    #[test]
    fn test_parent_page_id_after_failed_update() {
        let (_temp, discovery) = discovery(&[("guide/intro.md", "# Intro\n")]);
        let mut plan = PublishPlan::new(discovery, None);
        plan.states[0] = EntryState::Failed {
            error: DocumentError::ParentUnavailable {
                parent: "x".to_owned(),
            },
            page_id: Some("7".to_owned()),
        };

        assert_eq!(plan.parent_page_id(1).unwrap(), Some("7".to_owned()));
    }

    #[test]
    fn test_pending_resolver() {
        let (_temp, discovery) = discovery(&[
            ("a.md", "# A\n"),
            ("guide/b.md", "# B\n"),
            ("img/logo.png", "png"),
            ("notes.md.bak", "x"),
        ]);
        let resolver = PlanResolver::pending(&discovery);

        assert_eq!(resolver.resolve_document("a.md"), Some(Resolution::Pending));
        assert_eq!(resolver.resolve_document("guide"), Some(Resolution::Pending));
        assert_eq!(resolver.resolve_document("missing.md"), None);
        assert!(resolver.has_asset("img/logo.png"));
        assert!(!resolver.has_asset("img/missing.png"));
        assert!(!resolver.has_asset("a.md"));
        assert!(!resolver.has_asset("img"));
    }

    #[test]
    fn test_published_resolver() {
        let (_temp, discovery) = discovery(&[("a.md", "# A\n"), ("b.md", "# B\n")]);
        let states = vec![
            published("1001"),
            EntryState::failed(DocumentError::ParentUnavailable {
                parent: "x".to_owned(),
            }),
        ];
        let mock = MockConfluence::new("DOCS");
        let resolver = PlanResolver::published(&discovery, &states, &mock);

        assert_eq!(
            resolver.resolve_document("a.md"),
            Some(Resolution::Resolved(PageLink {
                page_id: "1001".to_owned(),
                url: mock.page_url("1001"),
            }))
        );
        assert_eq!(
            resolver.resolve_document("b.md"),
            Some(Resolution::Unavailable)
        );
    }

    #[test]
    fn test_into_report() {
        let (_temp, discovery) = discovery(&[("a.md", "# A\n"), ("b.md", "# B\n")]);
        let mut plan = PublishPlan::new(discovery, None);
        plan.states[0] = EntryState::Synced {
            page_id: "1001".to_owned(),
            outcome: Outcome::Created,
            warnings: vec!["raw HTML".to_owned()],
        };
        plan.states[1] = EntryState::failed(DocumentError::ParentUnavailable {
            parent: "guide".to_owned(),
        });

        let report = plan.into_report();

        assert_eq!(report.documents[0].title, "A");
        assert_eq!(report.documents[0].page_id.as_deref(), Some("1001"));
        assert_eq!(
            report.documents[1].outcome,
            Outcome::Failed("parent guide was not published".to_owned())
        );
    }
}
