//! Search filter shared by the store and the in-memory view.

use std::fmt;

/// A normalized, non-empty search term.
///
/// Matches a record when the term occurs in its `name` or `email`,
/// ignoring ASCII case, which is how SQLite's `LIKE` compares.
///
/// "No filter" is represented as `Option::<SearchQuery>::None`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    term: String,
    folded: String,
}

impl SearchQuery {
    /// Normalize raw input into a query.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` when nothing is
    /// left, meaning every record matches.
    pub fn parse(input: Option<&str>) -> Option<Self> {
        let term = input?.trim();
        if term.is_empty() {
            return None;
        }
        Some(Self {
            term: term.to_string(),
            folded: term.to_ascii_lowercase(),
        })
    }

    /// The term as entered (trimmed).
    pub fn as_str(&self) -> &str {
        &self.term
    }

    /// Case-folded form. Queries with equal keys select the same records.
    pub fn key(&self) -> &str {
        &self.folded
    }

    /// Substring pattern for `LIKE ... ESCAPE '\'`.
    ///
    /// Wildcards typed by the user are matched literally.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.term.len() + 2);
        pattern.push('%');
        for ch in self.term.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        pattern
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term)
    }
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchQuery({:?})", self.term)
    }
}
