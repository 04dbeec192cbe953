//! Colored terminal output for the run summary.

use console::{Style, Term};
use md2conf_sync::Outcome;

/// Writes the summary to stderr, colored by severity.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.styled(&self.green, msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.styled(&self.yellow, msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.styled(&self.red, msg);
    }

    /// Section heading (cyan bold).
    pub(crate) fn heading(&self, msg: &str) {
        self.styled(&self.cyan_bold, msg);
    }

    /// One page line of the summary: changes green, no-ops dim, failures red.
    pub(crate) fn page(&self, outcome: &Outcome, msg: &str) {
        let style = match outcome {
            Outcome::Created | Outcome::Updated => &self.green,
            Outcome::Unchanged => &self.dim,
            Outcome::Failed(_) => &self.red,
        };
        self.styled(style, msg);
    }

    fn styled(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}
