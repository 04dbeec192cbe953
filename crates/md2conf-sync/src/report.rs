//! Run summary.

use std::fmt;

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// Remote page already matched.
    Unchanged,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Result for one local page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    /// Document path, or directory path for synthesized pages.
    pub key: String,
    pub title: String,
    pub outcome: Outcome,
    /// Remote page, if one exists.
    pub page_id: Option<String>,
    pub warnings: Vec<String>,
}

/// Link that points at a document whose page failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// Document containing the link.
    pub document: String,
    /// Target document path.
    pub target: String,
}

/// Summary of one synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// One entry per page, in publish order.
    pub documents: Vec<DocumentReport>,
    /// Links left unresolved because their target failed (strict mode only).
    pub unresolved: Vec<UnresolvedReference>,
}

impl SyncReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Created))
    }

    #[must_use]
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated))
    }

    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Unchanged))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Failed pages with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&DocumentReport, &str)> {
        self.documents.iter().filter_map(|doc| match &doc.outcome {
            Outcome::Failed(reason) => Some((doc, reason.as_str())),
            _ => None,
        })
    }

    /// Report entry for a document or directory path.
    #[must_use]
    pub fn document(&self, key: &str) -> Option<&DocumentReport> {
        self.documents.iter().find(|doc| doc.key == key)
    }

    /// Whether the run counts as successful.
    ///
    /// Any failed page or unresolved reference fails the run unless partial
    /// success is tolerated.
    #[must_use]
    pub fn succeeded(&self, tolerate_partial: bool) -> bool {
        tolerate_partial || (self.failed() == 0 && self.unresolved.is_empty())
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.documents
            .iter()
            .filter(|doc| predicate(&doc.outcome))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(key: &str, outcome: Outcome) -> DocumentReport {
        DocumentReport {
            key: key.to_owned(),
            title: key.to_owned(),
            outcome,
            page_id: None,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let report = SyncReport {
            documents: vec![
                entry("a.md", Outcome::Created),
                entry("b.md", Outcome::Updated),
                entry("c.md", Outcome::Unchanged),
                entry("d.md", Outcome::Failed("boom".to_owned())),
            ],
            unresolved: Vec::new(),
        };

        assert_eq!(report.created(), 1);
        assert_eq!(report.updated(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.failed(), 1);
        let failures: Vec<_> = report.failures().map(|(d, r)| (d.key.as_str(), r)).collect();
        assert_eq!(failures, vec![("d.md", "boom")]);
    }

    #[test]
    fn test_succeeded() {
        let mut report = SyncReport {
            documents: vec![entry("a.md", Outcome::Created)],
            unresolved: Vec::new(),
        };
        assert!(report.succeeded(false));

        report.unresolved.push(UnresolvedReference {
            document: "a.md".to_owned(),
            target: "b.md".to_owned(),
        });
        assert!(!report.succeeded(false));
        assert!(report.succeeded(true));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Unchanged.to_string(), "unchanged");
        assert_eq!(
            Outcome::Failed("parent guide was not published".to_owned()).to_string(),
            "failed: parent guide was not published"
        );
    }
}
