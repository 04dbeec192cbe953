//! Markdown tree synchronization for md2conf.
//!
//! [`Synchronizer`] publishes a directory of Markdown files (or a single
//! file) to a Confluence space:
//! - each document maps to the page with the same title, created if missing
//! - directories become parent pages, via their `index.md`/`README.md` or a
//!   synthesized page listing the children
//! - links between documents become links between pages, resolved in a
//!   second pass once every page exists
//! - local images and files are uploaded as attachments
//!
//! Re-running against an unchanged tree modifies nothing.
//!
//! # Example
//!
//! ```ignore
//! use md2conf_sync::{SyncOptions, Synchronizer};
//!
//! let report = Synchronizer::new(&session, SyncOptions::default())
//!     .synchronize(Path::new("docs"))?;
//! println!("{} created, {} updated", report.created(), report.updated());
//! ```

mod discovery;
mod document;
mod error;
mod identity;
mod plan;
mod report;
mod synchronizer;

pub use discovery::{Discovery, PageNode, PageSource};
pub use document::Document;
pub use error::{DocumentError, SyncError};
pub use report::{DocumentReport, Outcome, SyncReport, UnresolvedReference};
pub use synchronizer::{SyncOptions, Synchronizer};
