//! Input tree discovery.
//!
//! Discovery runs in two phases:
//! 1. Walk the directory tree and collect Markdown files per directory
//! 2. Read the files and flatten the tree into [`PageNode`]s, parents first
//!
//! Every directory that contains Markdown somewhere below it becomes a page.
//! Its `index.md` (or `README.md`) is that page; without one a directory
//! page is synthesized. The input root itself gets no page of its own unless
//! it has an index file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{Document, INDEX_FILENAMES, is_markdown, titlecase_from_slug};
use crate::error::SyncError;

/// What a page is built from.
#[derive(Debug, Clone)]
pub enum PageSource {
    Document(Document),
    /// Directory without an index document.
    Directory,
}

/// One page of the publish plan.
#[derive(Debug, Clone)]
pub struct PageNode {
    /// Document path, or directory path for synthesized pages.
    pub key: String,
    pub title: String,
    /// Index of the parent node. Always lower than this node's index.
    pub parent: Option<usize>,
    pub source: PageSource,
}

/// Discovered pages of one input path.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Publish root all document paths are relative to.
    pub root: PathBuf,
    /// Pages in publish order.
    pub nodes: Vec<PageNode>,
    /// Node lookup by document path and by directory path.
    paths: HashMap<String, usize>,
}

impl Discovery {
    /// Discover the pages under `input`, a directory or a single Markdown file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InputNotFound`] if `input` does not exist,
    /// [`SyncError::NotMarkdown`] for a file that is not Markdown, and
    /// [`SyncError::Io`] if the tree cannot be read.
    pub fn discover(input: &Path) -> Result<Self, SyncError> {
        if !input.exists() {
            return Err(SyncError::InputNotFound(input.to_path_buf()));
        }
        let input = fs::canonicalize(input).map_err(|source| SyncError::Io {
            path: input.to_path_buf(),
            source,
        })?;

        let discovery = if input.is_file() {
            Self::discover_file(input)?
        } else {
            let mut discovery = Self {
                root: input.clone(),
                ..Self::default()
            };
            if let Some(tree) = scan_directory(&input, "")? {
                let root_name = dir_name(&input);
                discovery.flatten(tree, None, &root_name, true)?;
            }
            discovery
        };

        debug!(
            root = %discovery.root.display(),
            pages = discovery.nodes.len(),
            "Discovered pages"
        );
        Ok(discovery)
    }

    fn discover_file(input: PathBuf) -> Result<Self, SyncError> {
        if !is_markdown(&input) {
            return Err(SyncError::NotMarkdown(input));
        }
        let root = input
            .parent()
            .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
        let rel = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root_name = dir_name(&root);

        let mut discovery = Self {
            root,
            ..Self::default()
        };
        discovery.push_document(rel, input, None, &root_name)?;
        Ok(discovery)
    }

    /// Node for a document or directory path relative to the root.
    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.paths.get(path).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add the pages of `dir` (pre-order: directory page, files, subdirectories).
    fn flatten(
        &mut self,
        dir: ScannedDir,
        parent: Option<usize>,
        root_name: &str,
        is_root: bool,
    ) -> Result<(), SyncError> {
        let dir_parent = match dir.index {
            Some((rel, path)) => {
                let index = self.push_document(rel, path, parent, root_name)?;
                self.paths.insert(dir.rel.clone(), index);
                Some(index)
            }
            None if is_root => parent,
            None => Some(self.push_node(PageNode {
                key: dir.rel.clone(),
                title: titlecase_from_slug(&dir.name),
                parent,
                source: PageSource::Directory,
            })),
        };

        for (rel, path) in dir.files {
            self.push_document(rel, path, dir_parent, root_name)?;
        }
        for sub in dir.dirs {
            self.flatten(sub, dir_parent, root_name, false)?;
        }
        Ok(())
    }

    fn push_document(
        &mut self,
        rel: String,
        path: PathBuf,
        parent: Option<usize>,
        root_name: &str,
    ) -> Result<usize, SyncError> {
        let markdown = fs::read_to_string(&path).map_err(|source| SyncError::Io {
            path: path.clone(),
            source,
        })?;
        let document = Document::new(rel, path, markdown, root_name);
        Ok(self.push_node(PageNode {
            key: document.path.clone(),
            title: document.title.clone(),
            parent,
            source: PageSource::Document(document),
        }))
    }

    fn push_node(&mut self, node: PageNode) -> usize {
        let index = self.nodes.len();
        self.paths.insert(node.key.clone(), index);
        self.nodes.push(node);
        index
    }
}

/// Markdown files of one directory, before any file is read.
#[derive(Debug)]
struct ScannedDir {
    /// Path relative to the root (empty for the root).
    rel: String,
    name: String,
    /// Index document, if present.
    index: Option<(String, PathBuf)>,
    /// Other Markdown files, sorted by name.
    files: Vec<(String, PathBuf)>,
    /// Subdirectories containing Markdown, sorted by name.
    dirs: Vec<ScannedDir>,
}

/// Scan a directory. Returns `None` if no Markdown file exists below it.
fn scan_directory(dir_path: &Path, rel: &str) -> Result<Option<ScannedDir>, SyncError> {
    let io_error = |source| SyncError::Io {
        path: dir_path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir_path).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        // Skip hidden files/dirs
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        entries.push((name, entry.path(), is_dir));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for (name, path, is_dir) in entries {
        let child_rel = if rel.is_empty() {
            name.clone()
        } else {
            format!("{rel}/{name}")
        };
        if is_dir {
            if let Some(sub) = scan_directory(&path, &child_rel)? {
                dirs.push(sub);
            }
        } else if is_markdown(&path) {
            files.push((name, child_rel, path));
        }
    }

    if files.is_empty() && dirs.is_empty() {
        return Ok(None);
    }

    // index.md wins over README.md
    let index = INDEX_FILENAMES.iter().find_map(|candidate| {
        files
            .iter()
            .position(|(name, _, _)| name.to_lowercase() == *candidate)
    });
    let index = index.map(|position| {
        let (_, child_rel, path) = files.remove(position);
        (child_rel, path)
    });

    Ok(Some(ScannedDir {
        rel: rel.to_owned(),
        name: dir_name(dir_path),
        index,
        files: files
            .into_iter()
            .map(|(_, child_rel, path)| (child_rel, path))
            .collect(),
        dirs,
    }))
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
