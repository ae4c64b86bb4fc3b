//! A small CSS selector engine.
//!
//! Covers the subset the glossary widget relies on: type and universal
//! selectors, `#id`, `.class`, `[attr]` and `[attr=value]`, compound
//! selectors, descendant and child combinators, and comma separated lists.
//! Matching is written against the [`Subject`] trait so any element tree can
//! answer "does this concrete element match selector S".

use std::fmt;

/// An element as seen by the matcher.
pub trait Subject: Sized {
    fn tag_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn parent(&self) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    selector: String,
    position: usize,
    reason: &'static str,
}

impl SelectorError {
    pub(crate) fn new(selector: &str, position: usize, reason: &'static str) -> Self {
        Self {
            selector: selector.to_string(),
            position,
            reason,
        }
    }

    /// Byte offset of the offending character.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at offset {} in {:?}",
            self.reason, self.position, self.selector
        )
    }
}

impl std::error::Error for SelectorError {}

/// A parsed, comma separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(source);
        let selectors = parser.parse_list()?;
        Ok(Self { selectors })
    }

    pub fn matches<S: Subject>(&self, subject: &S) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches_at(selector.compounds.len() - 1, subject))
    }

    /// Returns the compound when the list is exactly one compound selector,
    /// e.g. `button.js-glossary-toggle` but not `a, b` or `div span`.
    pub fn as_compound(&self) -> Option<&Compound> {
        match self.selectors.as_slice() {
            [only] if only.compounds.len() == 1 => only.compounds.first(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    // combinators[i] joins compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    fn matches_at<S: Subject>(&self, index: usize, subject: &S) -> bool {
        if !self.compounds[index].matches(subject) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => subject
                .parent()
                .is_some_and(|parent| self.matches_at(index - 1, &parent)),
            Combinator::Descendant => {
                let mut current = subject.parent();
                while let Some(ancestor) = current {
                    if self.matches_at(index - 1, &ancestor) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// A sequence of simple selectors that all apply to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    pub fn matches<S: Subject>(&self, subject: &S) -> bool {
        if let Some(tag) = &self.tag {
            if !subject.tag_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if subject.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| subject.has_class(class))
            && self
                .attributes
                .iter()
                .all(|attribute| attribute.matches(subject))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub name: String,
    pub value: Option<String>,
}

impl AttributeMatch {
    fn matches<S: Subject>(&self, subject: &S) -> bool {
        match (subject.attribute(&self.name), &self.value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(offset, _)| offset)
            .unwrap_or(self.source.len())
    }

    fn error(&self, reason: &'static str) -> SelectorError {
        SelectorError {
            selector: self.source.to_string(),
            position: self.offset(),
            reason,
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(&mut self) -> Result<Vec<ComplexSelector>, SelectorError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.bump();
                }
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(selectors)
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.bump();
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_whitespace => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error("unexpected character")),
            }
            compounds.push(self.parse_compound()?);
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut universal = false;
        match self.peek() {
            Some('*') => {
                self.bump();
                universal = true;
            }
            Some(c) if is_ident_start(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }
        if compound.is_empty() && !universal {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            ident.push(c);
            self.pos += 1;
        }
        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }

    fn parse_attribute(&mut self) -> Result<AttributeMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.peek() {
            Some('=') => {
                self.bump();
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.bump();
                        self.parse_quoted(quote)?
                    }
                    _ => self.parse_ident()?,
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => None,
        };
        match self.bump() {
            Some(']') => Ok(AttributeMatch { name, value }),
            _ => Err(self.error("expected `]`")),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => match self.bump() {
                    Some(escaped) => value.push(escaped),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Fake<'a> {
        chain: &'a [(&'a str, &'a [(&'a str, &'a str)])],
        depth: usize,
    }

    impl<'a> Subject for Fake<'a> {
        fn tag_name(&self) -> &str {
            self.chain[self.depth].0
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.chain[self.depth]
                .1
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        }

        fn has_class(&self, class: &str) -> bool {
            self.attribute("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
        }

        fn parent(&self) -> Option<Self> {
            (self.depth > 0).then(|| Fake {
                chain: self.chain,
                depth: self.depth - 1,
            })
        }
    }

    fn leaf<'a>(chain: &'a [(&'a str, &'a [(&'a str, &'a str)])]) -> Fake<'a> {
        Fake {
            chain,
            depth: chain.len() - 1,
        }
    }

    const CHAIN: &[(&str, &[(&str, &str)])] = &[
        ("body", &[]),
        ("div", &[("id", "glossary"), ("class", "panel is-open")]),
        ("ul", &[("class", "glossary__list")]),
        ("span", &[("class", "term highlight"), ("data-term", "foo")]),
    ];

    fn matches(selector: &str) -> bool {
        SelectorList::parse(selector)
            .expect("selector parses")
            .matches(&leaf(CHAIN))
    }

    #[test]
    fn simple_selectors_match() {
        assert!(matches("span"));
        assert!(matches("SPAN"));
        assert!(matches("*"));
        assert!(matches(".term"));
        assert!(matches("span.term.highlight"));
        assert!(matches("[data-term]"));
        assert!(matches("[data-term=foo]"));
        assert!(matches("span[data-term=\"foo\"]"));
        assert!(!matches("span[data-term='bar']"));
        assert!(!matches("#glossary"));
        assert!(!matches("button"));
    }

    #[test]
    fn combinators_walk_ancestors() {
        assert!(matches("#glossary .term"));
        assert!(matches("div span"));
        assert!(matches("ul > span"));
        assert!(matches("#glossary > ul > .term"));
        assert!(!matches("div > span"));
        assert!(!matches(".missing .term"));
    }

    #[test]
    fn lists_match_any_member() {
        assert!(matches("a, button, input, [tabindex], span"));
        assert!(!matches("a, button, input, [tabindex]"));
    }

    #[test]
    fn parse_errors_report_position() {
        let err = SelectorList::parse(".term, ").unwrap_err();
        assert_eq!(err.reason(), "expected a selector");
        assert_eq!(err.position(), 7);

        let err = SelectorList::parse("span[data-term=\"foo]").unwrap_err();
        assert_eq!(err.reason(), "unterminated string");

        let err = SelectorList::parse("div:hover").unwrap_err();
        assert_eq!(err.reason(), "unexpected character");
        assert_eq!(err.position(), 3);

        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse(".").is_err());
    }

    #[test]
    fn single_compound_is_exposed() {
        let list = SelectorList::parse("button.js-glossary-toggle[aria-label=Glossary]").unwrap();
        let compound = list.as_compound().expect("compound");
        assert_eq!(compound.tag.as_deref(), Some("button"));
        assert_eq!(compound.classes, vec!["js-glossary-toggle".to_string()]);
        assert_eq!(compound.attributes[0].value.as_deref(), Some("Glossary"));

        assert!(SelectorList::parse("a, b").unwrap().as_compound().is_none());
        assert!(SelectorList::parse("div span").unwrap().as_compound().is_none());
    }
}
