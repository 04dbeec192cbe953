//! State structs for tracking context during event processing.

use std::collections::HashSet;

use pulldown_cmark::Alignment;

/// State for tracking code block rendering.
#[derive(Default)]
pub(crate) struct CodeBlockState {
    /// Whether we're inside a code block.
    active: bool,
    /// Language of current code block (e.g., "rust", "python").
    language: Option<String>,
    /// Buffer for code block content.
    buffer: String,
}

impl CodeBlockState {
    /// Start a new code block with optional language.
    pub fn start(&mut self, language: Option<String>) {
        self.active = true;
        self.language = language;
        self.buffer.clear();
    }

    /// End the current code block and return (language, content).
    pub fn end(&mut self) -> (Option<String>, String) {
        self.active = false;
        (self.language.take(), std::mem::take(&mut self.buffer))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

/// State for tracking table rendering.
#[derive(Default)]
pub(crate) struct TableState {
    /// Whether we're inside the table header row.
    in_head: bool,
    /// Column alignments for current table.
    alignments: Vec<Alignment>,
    /// Current column index in table row.
    cell_index: usize,
}

impl TableState {
    /// Start a new table with column alignments.
    pub fn start(&mut self, alignments: Vec<Alignment>) {
        self.alignments = alignments;
        self.in_head = false;
        self.cell_index = 0;
    }

    pub fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    pub fn end_head(&mut self) {
        self.in_head = false;
    }

    pub fn start_row(&mut self) {
        self.cell_index = 0;
    }

    pub fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    pub fn is_in_head(&self) -> bool {
        self.in_head
    }

    /// Get the alignment style for the current cell.
    pub fn current_alignment_style(&self) -> &'static str {
        match self.alignments.get(self.cell_index) {
            Some(Alignment::Left) => r#" style="text-align:left""#,
            Some(Alignment::Center) => r#" style="text-align:center""#,
            Some(Alignment::Right) => r#" style="text-align:right""#,
            Some(Alignment::None) | None => "",
        }
    }
}

/// State for tracking image alt text capture.
#[derive(Default)]
pub(crate) struct ImageState {
    active: bool,
    alt_text: String,
}

impl ImageState {
    pub fn start(&mut self) {
        self.active = true;
        self.alt_text.clear();
    }

    /// End image capture and return the alt text.
    pub fn end(&mut self) -> String {
        self.active = false;
        std::mem::take(&mut self.alt_text)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn push_str(&mut self, text: &str) {
        self.alt_text.push_str(text);
    }
}

/// State for tracking headings and title extraction.
///
/// With title extraction on, the first H1 becomes the page title and is not
/// rendered; every later heading moves up one level (H2→H1, H3→H2, ...).
pub(crate) struct HeadingState {
    extract_title: bool,
    title: Option<String>,
    seen_first_h1: bool,
    /// Whether we're currently inside the first H1 (to capture its text).
    in_first_h1: bool,
    /// Current heading level being processed (None if not in a heading).
    current_level: Option<u8>,
    /// Buffer for heading plain text.
    text: String,
    /// Buffer for heading markup (with inline formatting).
    html: String,
}

impl HeadingState {
    pub fn new(extract_title: bool) -> Self {
        Self {
            extract_title,
            title: None,
            seen_first_h1: false,
            in_first_h1: false,
            current_level: None,
            text: String::new(),
            html: String::new(),
        }
    }

    /// Stop treating the first H1 as the title.
    ///
    /// Only effective before the first H1 has been seen.
    pub fn disable_title_extraction(&mut self) {
        if !self.seen_first_h1 {
            self.extract_title = false;
        }
    }

    /// Check if we're currently inside a rendered heading.
    pub fn is_active(&self) -> bool {
        self.current_level.is_some()
    }

    /// Check if we're inside the first H1 being captured for title.
    pub fn is_in_first_h1(&self) -> bool {
        self.in_first_h1
    }

    /// Start tracking a heading.
    ///
    /// Returns `true` if the heading should be rendered, `false` if it is the
    /// title and should be skipped.
    pub fn start_heading(&mut self, level: u8) -> bool {
        if self.extract_title && level == 1 && !self.seen_first_h1 {
            self.in_first_h1 = true;
            self.text.clear();
            return false;
        }

        self.current_level = Some(level);
        self.text.clear();
        self.html.clear();
        true
    }

    /// Get the adjusted heading level for output.
    pub fn adjusted_level(&self, level: u8) -> u8 {
        if self.extract_title && self.seen_first_h1 && level > 1 {
            level - 1
        } else {
            level
        }
    }

    /// Complete the first H1 and save as title.
    pub fn complete_first_h1(&mut self) {
        self.title = Some(self.text.trim().to_owned());
        self.text.clear();
        self.in_first_h1 = false;
        self.seen_first_h1 = true;
    }

    /// Complete heading. Returns (adjusted level, markup) or None if not in a heading.
    pub fn complete_heading(&mut self) -> Option<(u8, String)> {
        let level = self.current_level.take()?;
        self.text.clear();
        let html = std::mem::take(&mut self.html);
        Some((self.adjusted_level(level), html))
    }

    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn push_html(&mut self, html: &str) {
        self.html.push_str(html);
    }

    /// Take the extracted title.
    pub fn take_title(&mut self) -> Option<String> {
        self.title.take().filter(|t| !t.is_empty())
    }
}

/// Warnings collected for one document.
///
/// Degradation warnings are recorded once per construct kind.
#[derive(Default)]
pub(crate) struct Warnings {
    messages: Vec<String>,
    seen_kinds: HashSet<&'static str>,
}

impl Warnings {
    pub fn push(&mut self, message: String) {
        self.messages.push(message);
    }

    /// Record a warning only the first time `kind` is seen.
    pub fn once(&mut self, kind: &'static str, message: &str) {
        if self.seen_kinds.insert(kind) {
            self.messages.push(message.to_owned());
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.messages
    }
}

/// Convert text to URL-safe slug.
///
/// Converts to lowercase, replaces whitespace/dashes/underscores with single dashes,
/// and removes other non-alphanumeric characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true; // Prevents leading dash

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
