use crate::replace::Replacement;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub replacements: Vec<ReplacementDef>,
}

impl PatchSet {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.replacements.is_empty() {
            issues.push(ValidationIssue::EmptyReplacementList);
        }

        let mut seen = HashSet::new();
        for def in &self.replacements {
            if def.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    replacement_id: None,
                    field: "id",
                });
            } else if !seen.insert(def.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    replacement_id: def.id.clone(),
                });
            }

            // Whitespace-only search text is legal: it is still an exact literal.
            if def.search.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    replacement_id: Some(def.id.clone()),
                    field: "search",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Replacements in declaration order.
    pub fn replacements(&self) -> Vec<Replacement> {
        self.replacements
            .iter()
            .map(|def| Replacement::new(&def.id, &def.search, &def.replace))
            .collect()
    }

    pub fn display_name(&self) -> &str {
        if self.meta.name.trim().is_empty() {
            "unnamed"
        } else {
            &self.meta.name
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Target file, relative to the workspace root unless absolute
    #[serde(default)]
    pub target: Option<String>,
    /// Confirmation line printed after a successful run
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReplacementDef {
    pub id: String,
    pub search: String,
    /// Empty means "delete the search text"
    #[serde(default)]
    pub replace: String,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Distinct ids of the replacements involved, in first-seen order.
    pub fn replacement_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.issues.iter().filter_map(ValidationIssue::replacement_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            ids.push("<none>");
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyReplacementList,
    MissingField {
        replacement_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        replacement_id: String,
    },
}

impl ValidationIssue {
    pub fn replacement_id(&self) -> Option<&str> {
        match self {
            ValidationIssue::EmptyReplacementList => None,
            ValidationIssue::MissingField { replacement_id, .. } => replacement_id
                .as_deref()
                .filter(|id| !id.trim().is_empty()),
            ValidationIssue::DuplicateId { replacement_id } => Some(replacement_id),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyReplacementList => {
                write!(f, "patch set contains no replacements")
            }
            ValidationIssue::MissingField {
                replacement_id,
                field,
            } => match replacement_id {
                Some(id) => write!(f, "replacement '{id}' missing required field '{field}'"),
                None => write!(f, "replacement missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { replacement_id } => {
                write!(f, "replacement id '{replacement_id}' is used more than once")
            }
        }
    }
}
