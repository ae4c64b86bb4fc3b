use crate::dom::Document;
use crate::error::GlossaryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_BODY_SELECTOR: &str = "#glossary";
pub const DEFAULT_TOGGLE_SELECTOR: &str = ".js-glossary-toggle";
pub const DEFAULT_CLOSE_SELECTOR: &str = ".js-glossary-close";
pub const DEFAULT_TERM_SELECTOR: &str = ".term";

/// CSS selectors for each element the controller looks up.
///
/// Omitted keys keep their defaults and unknown keys are ignored, so a
/// partial JSON object such as `{"body": "#terms"}` is a valid override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub body: String,
    pub toggle: String,
    pub close: String,
    pub term: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            body: DEFAULT_BODY_SELECTOR.to_string(),
            toggle: DEFAULT_TOGGLE_SELECTOR.to_string(),
            close: DEFAULT_CLOSE_SELECTOR.to_string(),
            term: DEFAULT_TERM_SELECTOR.to_string(),
        }
    }
}

impl Selectors {
    pub fn all(&self) -> [&str; 4] {
        [
            self.body.as_str(),
            self.toggle.as_str(),
            self.close.as_str(),
            self.term.as_str(),
        ]
    }
}

/// Class names used when rendering list items and locating list parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryClasses {
    pub list: String,
    pub search: String,
    pub item: String,
    /// Space separated classes for an item's term button (its accordion header).
    pub term: String,
    /// Space separated classes for an item's definition (its accordion content).
    pub definition: String,
}

impl Default for GlossaryClasses {
    fn default() -> Self {
        Self {
            list: "glossary__list".to_string(),
            search: "glossary__search".to_string(),
            item: "glossary__item".to_string(),
            term: "accordion__header glossary-term".to_string(),
            definition: "glossary-definition".to_string(),
        }
    }
}

impl GlossaryClasses {
    pub fn list_selector(&self) -> String {
        class_selector(&self.list)
    }

    pub fn search_selector(&self) -> String {
        class_selector(&self.search)
    }

    pub fn item_selector(&self) -> String {
        class_selector(&self.item)
    }

    pub fn term_selector(&self) -> String {
        class_selector(&self.term)
    }

    pub fn definition_selector(&self) -> String {
        class_selector(&self.definition)
    }

    pub fn selectors(&self) -> [String; 5] {
        [
            self.list_selector(),
            self.search_selector(),
            self.item_selector(),
            self.term_selector(),
            self.definition_selector(),
        ]
    }
}

fn class_selector(classes: &str) -> String {
    classes
        .split_whitespace()
        .map(|class| format!(".{class}"))
        .collect()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Substring,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    /// Minimum `rapidfuzz` ratio (0-100) for a fuzzy hit.
    pub fuzzy_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Substring,
            fuzzy_threshold: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossaryConfig {
    pub selectors: Selectors,
    pub classes: GlossaryClasses,
    pub search: SearchConfig,
}

impl GlossaryConfig {
    pub fn with_selectors(selectors: Selectors) -> Self {
        Self {
            selectors,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, GlossaryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GlossaryError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Checks every selector against what `doc` can evaluate.
    pub fn validate<D: Document>(&self, doc: &D) -> Result<(), GlossaryError> {
        for selector in self.selectors.all() {
            doc.validate_selector(selector)?;
        }
        for selector in self.classes.selectors() {
            doc.validate_selector(&selector)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn partial_selectors_keep_defaults() {
        let selectors: Selectors =
            serde_json::from_str(r##"{"body": "#terms", "unknown": ".ignored"}"##).unwrap();
        assert_eq!(selectors.body, "#terms");
        assert_eq!(selectors.toggle, DEFAULT_TOGGLE_SELECTOR);
        assert_eq!(selectors.close, DEFAULT_CLOSE_SELECTOR);
        assert_eq!(selectors.term, DEFAULT_TERM_SELECTOR);
    }

    #[test]
    fn nested_config_merges_each_section() {
        let config = GlossaryConfig::from_json(
            r#"{
                "selectors": {"term": "span.gloss"},
                "classes": {"term": "usa-accordion__button", "definition": "usa-accordion__content"},
                "search": {"mode": "fuzzy"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.selectors.term, "span.gloss");
        assert_eq!(config.selectors.body, DEFAULT_BODY_SELECTOR);
        assert_eq!(config.classes.term_selector(), ".usa-accordion__button");
        assert_eq!(config.classes.list, "glossary__list");
        assert_eq!(config.search.mode, SearchMode::Fuzzy);
        assert_eq!(config.search.fuzzy_threshold, 70.0);
        config.validate(&MemoryDocument::new()).unwrap();
    }

    #[test]
    fn class_selectors_join_every_token() {
        let classes = GlossaryClasses::default();
        assert_eq!(classes.term_selector(), ".accordion__header.glossary-term");
        assert_eq!(classes.list_selector(), ".glossary__list");
    }

    #[test]
    fn invalid_selector_is_rejected() {
        let doc = MemoryDocument::new();
        let config = GlossaryConfig::with_selectors(Selectors {
            toggle: "button[".to_string(),
            ..Selectors::default()
        });
        assert!(matches!(
            config.validate(&doc),
            Err(GlossaryError::InvalidSelector(_))
        ));

        let config = GlossaryConfig {
            classes: GlossaryClasses {
                search: "   ".to_string(),
                ..GlossaryClasses::default()
            },
            ..GlossaryConfig::default()
        };
        assert!(config.validate(&doc).is_err());
        GlossaryConfig::default().validate(&doc).unwrap();
    }
}
