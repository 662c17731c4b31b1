use serde::Serialize;

/// The fundamental patch primitive: an exact literal substring replacement.
///
/// There is no pattern syntax. `search` must appear verbatim for anything to
/// change, and every occurrence is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Stable identifier used in reports and logs
    pub id: String,
    /// Exact text to look for
    pub search: String,
    /// Text substituted for every occurrence of `search`
    pub replace: String,
}

/// Outcome of a single replacement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplaceOutcome {
    /// `search` was found and substituted
    Replaced { occurrences: usize },
    /// `search` did not occur; content left untouched
    NotFound,
}

impl ReplaceOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, ReplaceOutcome::Replaced { .. })
    }
}

impl Replacement {
    pub fn new(
        id: impl Into<String>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            search: search.into(),
            replace: replace.into(),
        }
    }

    /// Apply this replacement to `content`, returning the new text and what happened.
    ///
    /// An empty `search` never matches; `str::replace` would otherwise splice
    /// `replace` between every character.
    pub fn apply(&self, content: &str) -> (String, ReplaceOutcome) {
        if self.search.is_empty() {
            return (content.to_string(), ReplaceOutcome::NotFound);
        }

        let occurrences = content.matches(self.search.as_str()).count();
        if occurrences == 0 {
            return (content.to_string(), ReplaceOutcome::NotFound);
        }

        (
            content.replace(self.search.as_str(), &self.replace),
            ReplaceOutcome::Replaced { occurrences },
        )
    }

    /// True when the search text is gone and the replacement text is present.
    pub fn is_applied_in(&self, content: &str) -> bool {
        !content.contains(self.search.as_str()) && content.contains(self.replace.as_str())
    }
}
