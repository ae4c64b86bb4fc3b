use crate::error::GlossaryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// One glossary entry.
///
/// Absent fields load as empty strings; records are not validated on load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TermRecord {
    #[serde(default, alias = "glossary-term")]
    pub term: String,
    #[serde(default, alias = "glossary-definition")]
    pub definition: String,
}

impl TermRecord {
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            definition: definition.into(),
        }
    }

    pub fn key(&self) -> String {
        normalize_term(&self.term)
    }
}

/// Lower-cases a term for case-insensitive matching.
pub fn normalize_term(term: &str) -> String {
    term.to_lowercase()
}

pub fn parse_terms(json: &str) -> Result<Vec<TermRecord>, GlossaryError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_terms(path: impl AsRef<Path>) -> Result<Vec<TermRecord>, GlossaryError> {
    let raw = fs::read_to_string(path)?;
    parse_terms(&raw)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TermIssue {
    BlankTerm { index: usize },
    BlankDefinition { index: usize, term: String },
    DuplicateKey { key: String, indices: Vec<usize> },
}

impl fmt::Display for TermIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermIssue::BlankTerm { index } => write!(f, "entry #{index} has no term"),
            TermIssue::BlankDefinition { index, term } => {
                write!(f, "entry #{index} ({term:?}) has no definition")
            }
            TermIssue::DuplicateKey { key, indices } => {
                let list = indices
                    .iter()
                    .map(|index| format!("#{index}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{key:?} is defined more than once ({list})")
            }
        }
    }
}

/// Lists entries that would render oddly or be unreachable by `find_term`.
pub fn audit_terms(terms: &[TermRecord]) -> Vec<TermIssue> {
    let mut issues = Vec::new();
    let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, record) in terms.iter().enumerate() {
        if record.term.trim().is_empty() {
            issues.push(TermIssue::BlankTerm { index });
            continue;
        }
        if record.definition.trim().is_empty() {
            issues.push(TermIssue::BlankDefinition {
                index,
                term: record.term.clone(),
            });
        }
        by_key.entry(record.key()).or_default().push(index);
    }
    let mut duplicates: Vec<_> = by_key
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(key, indices)| TermIssue::DuplicateKey { key, indices })
        .collect();
    duplicates.sort_by_key(|issue| match issue {
        TermIssue::DuplicateKey { indices, .. } => indices[0],
        _ => 0,
    });
    issues.extend(duplicates);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_keys_are_accepted() {
        let terms = parse_terms(
            r#"[
                {"glossary-term": "Foo", "glossary-definition": "definition of foo"},
                {"term": "bar", "definition": "definition of bar"}
            ]"#,
        )
        .unwrap();
        assert_eq!(terms[0], TermRecord::new("Foo", "definition of foo"));
        assert_eq!(terms[1].key(), "bar");
        assert_eq!(terms[0].key(), "foo");
    }

    #[test]
    fn missing_fields_load_empty() {
        let terms = parse_terms(r#"[{"term": "orphan"}, {}]"#).unwrap();
        assert_eq!(terms[0].definition, "");
        assert_eq!(terms[1], TermRecord::default());
    }

    #[test]
    fn audit_reports_blank_and_duplicate_entries() {
        let terms = vec![
            TermRecord::new("Foo", "one"),
            TermRecord::new(" ", "nothing"),
            TermRecord::new("bar", ""),
            TermRecord::new("foo", "two"),
        ];
        let issues = audit_terms(&terms);
        assert_eq!(
            issues,
            vec![
                TermIssue::BlankTerm { index: 1 },
                TermIssue::BlankDefinition {
                    index: 2,
                    term: "bar".to_string()
                },
                TermIssue::DuplicateKey {
                    key: "foo".to_string(),
                    indices: vec![0, 3]
                },
            ]
        );
        assert_eq!(
            issues[2].to_string(),
            "\"foo\" is defined more than once (#0, #3)"
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_terms("{not json"),
            Err(GlossaryError::Terms(_))
        ));
    }

    #[test]
    fn bundled_sample_is_clean() {
        let terms = parse_terms(include_str!("../data/terms.json")).unwrap();
        assert!(terms.len() > 10);
        assert!(audit_terms(&terms).is_empty());
    }
}
