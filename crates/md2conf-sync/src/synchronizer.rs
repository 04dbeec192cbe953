//! Directory tree to Confluence synchronization.

use std::fs;
use std::path::Path;

use md2conf_confluence::{ConfluenceError, PageApi, PageUpdate, RemotePage};
use md2conf_renderer::{Attachment, ConvertError, Converter, StorageBody};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::discovery::{Discovery, PageSource};
use crate::error::{DocumentError, SyncError};
use crate::identity::IdentityResolver;
use crate::plan::{EntryState, PlanResolver, PublishPlan};
use crate::report::{Outcome, SyncReport, UnresolvedReference};

/// Key a configured root page claims its title under.
const ROOT_PAGE_KEY: &str = "(root page)";

/// Options for one synchronization run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub converter: Converter,
    /// Report success even when some pages fail.
    pub tolerate_partial: bool,
    /// Title of an existing page top-level pages are published under.
    pub root_page: Option<String>,
}

/// Publishes a Markdown tree to one Confluence space.
pub struct Synchronizer<'a, A: PageApi + ?Sized> {
    api: &'a A,
    options: SyncOptions,
}

/// Final state of a page after the second pass.
struct SyncedPage {
    page_id: String,
    updated: bool,
    warnings: Vec<String>,
    unavailable: Vec<String>,
}

impl<'a, A: PageApi + ?Sized> Synchronizer<'a, A> {
    #[must_use]
    pub fn new(api: &'a A, options: SyncOptions) -> Self {
        Self { api, options }
    }

    /// Synchronize the Markdown tree at `input`.
    ///
    /// Workflow:
    /// 1. Discover pages (nothing to do for an empty tree)
    /// 2. Reject duplicate titles before any remote call
    /// 3. Convert all documents in parallel, links to pages as placeholders
    /// 4. Find or create every page, parents first
    /// 5. Convert again with real page links, upload attachments and update
    ///    the pages whose body or parent differs
    ///
    /// A failing page fails its descendants but not its siblings.
    ///
    /// # Errors
    ///
    /// Returns an error for input problems, duplicate titles, a missing root
    /// page, and authentication or configuration failures. Per-page failures
    /// are recorded in the report instead.
    pub fn synchronize(&self, input: &Path) -> Result<SyncReport, SyncError> {
        let discovery = Discovery::discover(input)?;
        if discovery.is_empty() {
            info!(input = %input.display(), "No Markdown documents found");
            return Ok(SyncReport::default());
        }

        let mut identity = IdentityResolver::new(self.api);
        for node in &discovery.nodes {
            identity.claim(&node.key, &node.title)?;
        }
        let root_page_id = self.root_page_id(&mut identity)?;

        let mut plan = PublishPlan::new(discovery, root_page_id);
        self.convert_pending(&mut plan);
        self.publish_pages(&mut plan, &mut identity)?;
        self.finalize_pages(&mut plan)?;

        let report = plan.into_report();
        info!(
            space = self.api.space_key(),
            created = report.created(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            failed = report.failed(),
            "Synchronization finished"
        );
        Ok(report)
    }

    fn root_page_id(
        &self,
        identity: &mut IdentityResolver<'_, A>,
    ) -> Result<Option<String>, SyncError> {
        let Some(title) = &self.options.root_page else {
            return Ok(None);
        };
        identity.claim(ROOT_PAGE_KEY, title)?;
        let page = identity
            .lookup(title)
            .map_err(SyncError::Remote)?
            .ok_or_else(|| SyncError::RootPageNotFound(title.clone()))?;
        info!(page_id = %page.id, title = %title, "Publishing under root page");
        Ok(Some(page.id))
    }

    /// First pass: convert every page with placeholder links.
    fn convert_pending(&self, plan: &mut PublishPlan) {
        let converter = &self.options.converter;
        let resolver = PlanResolver::pending(&plan.discovery);

        let converted: Vec<Option<Result<StorageBody, ConvertError>>> = plan
            .discovery
            .nodes
            .par_iter()
            .map(|node| match &node.source {
                PageSource::Document(doc) => {
                    Some(converter.convert(&doc.path, &doc.markdown, &resolver))
                }
                PageSource::Directory => None,
            })
            .collect();

        for (index, result) in converted.into_iter().enumerate() {
            plan.states[index] = match result {
                Some(Ok(body)) => EntryState::Converted(body.body),
                Some(Err(e)) => {
                    let document = &plan.discovery.nodes[index].key;
                    warn!(%document, error = %e, "Conversion failed");
                    EntryState::failed(e.into())
                }
                None => EntryState::Converted(converter.directory_page()),
            };
        }
    }

    /// Find or create the page of every converted entry, parents first.
    fn publish_pages(
        &self,
        plan: &mut PublishPlan,
        identity: &mut IdentityResolver<'_, A>,
    ) -> Result<(), SyncError> {
        for index in 0..plan.len() {
            let EntryState::Converted(body) = &plan.states[index] else {
                continue;
            };
            let node = &plan.discovery.nodes[index];

            let result = plan.parent_page_id(index).and_then(|parent_id| {
                identity
                    .resolve(&node.title, parent_id.as_deref(), body)
                    .map_err(DocumentError::from)
            });

            let state = match result {
                Ok(resolved) => EntryState::Published {
                    page: resolved.page,
                    created: resolved.created,
                },
                Err(DocumentError::Remote(e)) if e.is_fatal() => return Err(SyncError::Remote(e)),
                Err(e) => {
                    warn!(document = %node.key, error = %e, "Failed to publish page");
                    EntryState::failed(e)
                }
            };
            plan.states[index] = state;
        }
        Ok(())
    }

    /// Second pass: push final bodies with resolved links.
    fn finalize_pages(&self, plan: &mut PublishPlan) -> Result<(), SyncError> {
        let resolver = PlanResolver::published(&plan.discovery, &plan.states, self.api);

        for index in 0..plan.len() {
            let EntryState::Published { page, created } = &plan.states[index] else {
                continue;
            };
            let created = *created;
            let node = &plan.discovery.nodes[index];

            let result = self.finalize_page(plan, &resolver, index, page);

            let state = match result {
                Ok(synced) => {
                    let outcome = if created {
                        Outcome::Created
                    } else if synced.updated {
                        Outcome::Updated
                    } else {
                        Outcome::Unchanged
                    };
                    info!(
                        document = %node.key,
                        page_id = %synced.page_id,
                        %outcome,
                        "Synchronized page"
                    );

                    if !self.options.converter.options().ignore_invalid_url {
                        plan.unresolved
                            .extend(synced.unavailable.into_iter().map(|target| {
                                UnresolvedReference {
                                    document: node.key.clone(),
                                    target,
                                }
                            }));
                    }
                    EntryState::Synced {
                        page_id: synced.page_id,
                        outcome,
                        warnings: synced.warnings,
                    }
                }
                Err(DocumentError::Remote(e)) if e.is_fatal() => return Err(SyncError::Remote(e)),
                Err(e) => {
                    warn!(document = %node.key, error = %e, "Failed to synchronize page");
                    EntryState::Failed {
                        error: e,
                        page_id: Some(page.id.clone()),
                    }
                }
            };
            plan.states[index] = state;
        }
        Ok(())
    }

    fn finalize_page(
        &self,
        plan: &PublishPlan,
        resolver: &PlanResolver<'_>,
        index: usize,
        page: &RemotePage,
    ) -> Result<SyncedPage, DocumentError> {
        let converter = &self.options.converter;
        let node = &plan.discovery.nodes[index];
        let parent_id = plan.parent_page_id(index)?;

        let (body, attachments, warnings, unavailable) = match &node.source {
            PageSource::Document(doc) => {
                let converted = converter.convert(&doc.path, &doc.markdown, resolver)?;
                (
                    converted.body,
                    converted.attachments,
                    converted.warnings,
                    converted.unavailable,
                )
            }
            PageSource::Directory => (converter.directory_page(), Vec::new(), Vec::new(), Vec::new()),
        };

        for attachment in &attachments {
            self.upload_attachment(&plan.discovery.root, &page.id, attachment)?;
        }

        // Pages without a parent of their own stay where they are.
        let parent_matches = parent_id.is_none() || page.parent_id == parent_id;
        let updated = if same_storage(&page.body, &body) && parent_matches {
            false
        } else {
            self.update_page(page, &node.title, parent_id.as_deref(), &body)?;
            true
        };

        Ok(SyncedPage {
            page_id: page.id.clone(),
            updated,
            warnings,
            unavailable,
        })
    }

    fn upload_attachment(
        &self,
        root: &Path,
        page_id: &str,
        attachment: &Attachment,
    ) -> Result<(), DocumentError> {
        let data = fs::read(root.join(&attachment.path)).map_err(|source| {
            DocumentError::Attachment {
                path: attachment.path.clone(),
                source,
            }
        })?;
        self.api
            .upload_attachment(page_id, &attachment.filename, &data)?;
        Ok(())
    }

    /// Update a page, retrying once against the current version if someone
    /// else saved it in between.
    fn update_page(
        &self,
        page: &RemotePage,
        title: &str,
        parent_id: Option<&str>,
        body: &str,
    ) -> Result<RemotePage, ConfluenceError> {
        let update = PageUpdate {
            page_id: &page.id,
            title,
            parent_id,
            body,
            expected_version: page.version,
        };
        match self.api.update_page(&update) {
            Err(ConfluenceError::VersionConflict { .. }) => {
                warn!(page_id = %page.id, title, "Version conflict, retrying with current version");
                let current = self.api.get_page(&page.id)?;
                self.api.update_page(&PageUpdate {
                    expected_version: current.version,
                    ..update
                })
            }
            result => result,
        }
    }
}

/// Compare storage bodies the way Confluence stores them.
///
/// Confluence rewrites some entities and void tags on save, so the body read
/// back differs textually from the one sent.
fn same_storage(remote: &str, local: &str) -> bool {
    remote == local || normalize_storage(remote) == normalize_storage(local)
}

fn normalize_storage(body: &str) -> String {
    body.trim()
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("<br/>", "<br />")
        .replace("<br>", "<br />")
        .replace("<hr/>", "<hr />")
        .replace("<hr>", "<hr />")
}
