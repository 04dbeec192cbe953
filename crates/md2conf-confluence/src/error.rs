//! Error types for Confluence integration.

/// Error from Confluence API operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfluenceError {
    /// Domain or base path cannot form an endpoint, or the space is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials rejected by the server.
    #[error("authentication failed ({status})")]
    Auth {
        /// HTTP status code (401 or 403).
        status: u16,
        /// Response body.
        body: String,
    },

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A page with this title already exists in the space.
    #[error("page '{title}' already exists in the space")]
    Conflict {
        /// Title that collided.
        title: String,
    },

    /// The remote page version advanced since it was read.
    #[error("version conflict on page {page_id} (expected version {expected})")]
    VersionConflict {
        /// Page being updated.
        page_id: String,
        /// Version the update was based on.
        expected: u32,
    },

    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("HTTP error: {status} - {body}")]
    HttpResponse {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

impl ConfluenceError {
    /// Whether this error should abort the whole run rather than one document.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Auth { .. })
    }

    /// Raw response body returned by the server, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Auth { body, .. } | Self::HttpResponse { body, .. } if !body.is_empty() => {
                Some(body.as_str())
            }
            _ => None,
        }
    }

    /// Classify an error status returned by the server.
    pub(crate) fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth { status, body },
            404 => Self::NotFound(body),
            _ => Self::HttpResponse { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_auth() {
        let err = ConfluenceError::from_status(401, "nope".to_owned());
        assert!(matches!(err, ConfluenceError::Auth { status: 401, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_from_status_classifies_not_found() {
        let err = ConfluenceError::from_status(404, String::new());
        assert!(matches!(err, ConfluenceError::NotFound(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_payload_exposes_server_body() {
        let err = ConfluenceError::from_status(500, r#"{"message":"boom"}"#.to_owned());
        assert_eq!(err.payload(), Some(r#"{"message":"boom"}"#));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_payload_empty_body_is_none() {
        let err = ConfluenceError::from_status(502, String::new());
        assert_eq!(err.payload(), None);
    }
}
