//! Confluence REST API payload types.

mod attachment;
mod page;
mod space;

pub use attachment::{Attachment, AttachmentsResponse};
pub use page::{Page, PagesResponse};
pub use space::{Space, User};
