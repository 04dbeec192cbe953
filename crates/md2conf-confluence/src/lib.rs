//! Confluence integration for md2conf.
//!
//! This crate provides the remote side of publishing:
//! - [`ConfluenceSession`]: REST API session with basic authentication, bound
//!   to one space
//! - [`PageApi`]: the page operations the synchronizer relies on
//! - `MockConfluence` (feature `mock`): in-memory [`PageApi`] for tests
//!
//! # Example
//!
//! ```ignore
//! use md2conf_confluence::{ConfluenceSession, PageApi};
//!
//! let session = ConfluenceSession::connect(&settings)?;
//! if let Some(page) = session.find_page_by_title("Getting Started")? {
//!     println!("{} is at version {}", page.id, page.version);
//! }
//! session.close();
//! ```

mod api;
pub use api::{AttachmentRef, PageApi, PageUpdate, RemotePage};

// API client
mod client;
pub use client::ConfluenceSession;

// Types (internal, exposed via RemotePage)
mod types;

// Errors
pub mod error;
pub use error::ConfluenceError;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::MockConfluence;
