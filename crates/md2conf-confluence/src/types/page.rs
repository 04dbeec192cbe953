//! Confluence page types.

use serde::Deserialize;

use super::space::SpaceRef;

/// Confluence page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Version information.
    pub version: Version,
    /// Page body content.
    #[serde(default)]
    pub body: Option<Body>,
    /// Owning space.
    #[serde(default)]
    pub space: Option<SpaceRef>,
    /// Parent chain, root first.
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
}

impl Page {
    /// Storage-format body, empty when not expanded.
    #[must_use]
    pub fn storage_value(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map_or("", |s| s.value.as_str())
    }

    /// Direct parent page ID.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(|a| a.id.as_str())
    }
}

/// Page version.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
}

/// Page body content.
#[derive(Debug, Clone, Deserialize)]
pub struct Body {
    /// Storage format content.
    #[serde(default)]
    pub storage: Option<Storage>,
}

/// Storage format representation.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// HTML content in Confluence storage format.
    pub value: String,
}

/// Ancestor page reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Ancestor {
    pub id: String,
}

/// Content search response.
#[derive(Debug, Clone, Deserialize)]
pub struct PagesResponse {
    pub results: Vec<Page>,
}
