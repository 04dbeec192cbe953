//! Conversion errors.

/// Error converting one document.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Link or image targets that are neither documents, local files nor URLs.
    #[error("invalid reference(s) in {document}: {}", targets.join(", "))]
    InvalidReference {
        /// Document path relative to the publish root.
        document: String,
        /// Targets as written in the source.
        targets: Vec<String>,
    },
}
