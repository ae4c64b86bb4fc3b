//! The searchable term list.
//!
//! [`TermList`] is the contract the controller depends on; [`SearchableList`]
//! is the stock implementation. It renders one `<li>` per record into the
//! panel's list element and shows or hides items by attaching or detaching
//! them. Visibility is the conjunction of the current filter predicate and the
//! live search query typed into the panel's search box.

use crate::config::{GlossaryClasses, GlossaryConfig, SearchConfig, SearchMode};
use crate::dom::{Document, DomEvent, EventKind};
use crate::error::GlossaryError;
use crate::terms::TermRecord;
use rapidfuzz::fuzz;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use tracing::{debug, warn};

pub type TermPredicate = Box<dyn Fn(&TermRecord) -> bool>;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem<N> {
    pub values: TermRecord,
    pub node: N,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

pub trait TermList<D: Document>: Sized {
    /// Renders `terms` into the list element found inside `panel`.
    fn mount(
        doc: &D,
        panel: &D::Node,
        terms: Vec<TermRecord>,
        config: &GlossaryConfig,
    ) -> Result<Self, GlossaryError>;

    fn container(&self) -> D::Node;

    /// Orders items by term text.
    fn sort(&mut self, order: SortOrder);

    /// Replaces the filter; `None` clears it.
    fn filter(&mut self, predicate: Option<TermPredicate>);

    fn is_filtered(&self) -> bool;

    /// Re-runs the live search with `query`; `None` clears it.
    fn search(&mut self, query: Option<&str>);

    fn visible_items(&self) -> Vec<RenderedItem<D::Node>>;

    /// Releases anything the list registered on the document.
    fn teardown(&mut self) {}
}

pub struct SearchableList<D: Document> {
    shared: Rc<RefCell<ListState<D>>>,
    search_listener: Option<D::Listener>,
}

struct ListState<D: Document> {
    doc: D,
    container: D::Node,
    entries: Vec<Entry<D::Node>>,
    filter: Option<TermPredicate>,
    query: String,
    search: SearchConfig,
}

struct Entry<N> {
    record: TermRecord,
    node: N,
    visible: bool,
}

impl<D: Document> ListState<D> {
    fn update(&mut self) {
        for entry in &self.entries {
            self.doc.detach(&entry.node);
        }
        for entry in &mut self.entries {
            let passes_filter = self
                .filter
                .as_ref()
                .is_none_or(|predicate| predicate(&entry.record));
            entry.visible =
                passes_filter && search_matches(&self.query, &entry.record.term, &self.search);
            if entry.visible {
                self.doc.append_child(&self.container, &entry.node);
            }
        }
    }

    fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_lowercase();
        self.update();
    }
}

impl<D: Document + 'static> TermList<D> for SearchableList<D> {
    fn mount(
        doc: &D,
        panel: &D::Node,
        terms: Vec<TermRecord>,
        config: &GlossaryConfig,
    ) -> Result<Self, GlossaryError> {
        let list_selector = config.classes.list_selector();
        let container = doc.query_selector(panel, &list_selector).ok_or_else(|| {
            GlossaryError::MissingElement {
                role: "list",
                selector: list_selector.clone(),
            }
        })?;
        let entries = terms
            .into_iter()
            .map(|record| -> Result<_, GlossaryError> {
                Ok(Entry {
                    node: render_item(doc, &record, &config.classes)?,
                    record,
                    visible: false,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(items = entries.len(), "list mounted");

        let mut state = ListState {
            doc: doc.clone(),
            container,
            entries,
            filter: None,
            query: String::new(),
            search: config.search.clone(),
        };
        state.update();
        let shared = Rc::new(RefCell::new(state));

        let search_listener = doc
            .query_selector(panel, &config.classes.search_selector())
            .map(|input| {
                let weak = Rc::downgrade(&shared);
                doc.listen(
                    &input,
                    EventKind::Input,
                    Rc::new(move |event: &DomEvent<D::Node>| {
                        let Some(shared) = weak.upgrade() else {
                            return;
                        };
                        let Ok(mut state) = shared.try_borrow_mut() else {
                            warn!("list busy, live search skipped");
                            return;
                        };
                        let query = state.doc.value(&event.target);
                        state.set_query(&query);
                    }),
                )
            });

        Ok(Self {
            shared,
            search_listener,
        })
    }

    fn container(&self) -> D::Node {
        self.shared.borrow().container.clone()
    }

    fn sort(&mut self, order: SortOrder) {
        let mut state = self.shared.borrow_mut();
        state.entries.sort_by(|a, b| {
            let ordering = compare_terms(&a.record.term, &b.record.term);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        state.update();
    }

    fn filter(&mut self, predicate: Option<TermPredicate>) {
        let mut state = self.shared.borrow_mut();
        state.filter = predicate;
        state.update();
    }

    fn is_filtered(&self) -> bool {
        self.shared.borrow().filter.is_some()
    }

    fn search(&mut self, query: Option<&str>) {
        self.shared.borrow_mut().set_query(query.unwrap_or_default());
    }

    fn visible_items(&self) -> Vec<RenderedItem<D::Node>> {
        self.shared
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.visible)
            .map(|entry| RenderedItem {
                values: entry.record.clone(),
                node: entry.node.clone(),
            })
            .collect()
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.search_listener.take() {
            let doc = self.shared.borrow().doc.clone();
            doc.unlisten(listener);
        }
    }
}

impl<D: Document> SearchableList<D> {
    /// Number of rendered items, visible or not.
    pub fn len(&self) -> usize {
        self.shared.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live search query as last applied, lower-cased.
    pub fn query(&self) -> String {
        self.shared.borrow().query.clone()
    }
}

fn render_item<D: Document>(
    doc: &D,
    record: &TermRecord,
    classes: &GlossaryClasses,
) -> Result<D::Node, GlossaryError> {
    let item = doc.create_element("li")?;
    doc.set_attribute(&item, "class", &classes.item);

    let header = doc.create_element("button")?;
    doc.set_attribute(&header, "type", "button");
    doc.set_attribute(&header, "class", &classes.term);
    doc.set_text(&header, &record.term);

    let definition = doc.create_element("p")?;
    doc.set_attribute(&definition, "class", &classes.definition);
    doc.set_text(&definition, &record.definition);

    doc.append_child(&item, &header);
    doc.append_child(&item, &definition);
    Ok(item)
}

fn compare_terms(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// `query` is expected trimmed and lower-cased.
fn search_matches(query: &str, term: &str, config: &SearchConfig) -> bool {
    if query.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    if term.contains(query) {
        return true;
    }
    match config.mode {
        SearchMode::Substring => false,
        SearchMode::Fuzzy => {
            // rapidfuzz scores in 0..=1, the threshold is a percentage
            let threshold = config.fuzzy_threshold;
            let score = |candidate: &str| fuzz::ratio(query.chars(), candidate.chars()) * 100.0;
            score(&term) >= threshold || term.split_whitespace().any(|word| score(word) >= threshold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, NodeId};

    struct Setup {
        doc: MemoryDocument,
        panel: NodeId,
        list: NodeId,
        search: NodeId,
    }

    fn setup() -> Setup {
        let doc = MemoryDocument::new();
        let panel = doc.create(&doc.body(), "div", &[("id", "glossary")]);
        let search = doc.create(&panel, "input", &[("class", "glossary__search")]);
        let list = doc.create(&panel, "ul", &[("class", "glossary__list")]);
        Setup {
            doc,
            panel,
            list,
            search,
        }
    }

    fn records() -> Vec<TermRecord> {
        vec![
            TermRecord::new("Contribution", "money given"),
            TermRecord::new("bundler", "collects contributions"),
            TermRecord::new("Affiliated committee", "shares a sponsor"),
        ]
    }

    fn mount(setup: &Setup, config: &GlossaryConfig) -> SearchableList<MemoryDocument> {
        SearchableList::mount(&setup.doc, &setup.panel, records(), config).expect("mounts")
    }

    fn visible_terms(list: &SearchableList<MemoryDocument>) -> Vec<String> {
        list.visible_items()
            .into_iter()
            .map(|item| item.values.term)
            .collect()
    }

    #[test]
    fn renders_and_sorts_case_insensitively() {
        let setup = setup();
        let mut list = mount(&setup, &GlossaryConfig::default());
        assert_eq!(list.len(), 3);
        list.sort(SortOrder::Ascending);
        assert_eq!(
            visible_terms(&list),
            vec!["Affiliated committee", "bundler", "Contribution"]
        );
        let rendered: Vec<String> = setup
            .doc
            .children(&setup.list)
            .iter()
            .map(|node| setup.doc.text_content(node))
            .collect();
        assert_eq!(rendered[1], "bundlercollects contributions");
        let first = setup.doc.children(&setup.list)[0];
        let header = setup.doc.children(&first)[0];
        assert!(setup.doc.matches(
            &header,
            "li.glossary__item > button.accordion__header.glossary-term"
        ));
        assert!(setup.doc.query_selector(&first, "p.glossary-definition").is_some());

        list.sort(SortOrder::Descending);
        assert_eq!(visible_terms(&list)[0], "Contribution");
    }

    #[test]
    fn filter_and_search_combine() {
        let setup = setup();
        let mut list = mount(&setup, &GlossaryConfig::default());
        list.sort(SortOrder::Ascending);

        list.filter(Some(Box::new(|record: &TermRecord| record.term.len() > 8)));
        assert!(list.is_filtered());
        assert_eq!(
            visible_terms(&list),
            vec!["Affiliated committee", "Contribution"]
        );

        list.search(Some("  CONTRIB "));
        assert_eq!(list.query(), "contrib");
        assert_eq!(visible_terms(&list), vec!["Contribution"]);
        assert_eq!(setup.doc.children(&setup.list).len(), 1);

        list.filter(None);
        assert!(!list.is_filtered());
        assert_eq!(visible_terms(&list), vec!["Contribution"]);

        list.search(None);
        assert_eq!(visible_terms(&list).len(), 3);
    }

    #[test]
    fn typing_in_the_search_box_drives_live_search() {
        let setup = setup();
        let mut list = mount(&setup, &GlossaryConfig::default());
        list.sort(SortOrder::Ascending);

        setup.doc.input(&setup.search, "bund");
        assert_eq!(visible_terms(&list), vec!["bundler"]);

        list.teardown();
        setup.doc.input(&setup.search, "");
        assert_eq!(visible_terms(&list), vec!["bundler"]);
        assert_eq!(setup.doc.listener_count(), 0);
    }

    #[test]
    fn fuzzy_mode_tolerates_typos() {
        let plain = setup();
        let mut config = GlossaryConfig::default();
        let mut list = mount(&plain, &config);
        list.search(Some("contribtion"));
        assert!(visible_terms(&list).is_empty());

        config.search.mode = SearchMode::Fuzzy;
        let fuzzy = setup();
        let mut list = mount(&fuzzy, &config);
        list.search(Some("contribtion"));
        assert_eq!(visible_terms(&list), vec!["Contribution"]);
        list.search(Some("comittee"));
        assert_eq!(visible_terms(&list), vec!["Affiliated committee"]);
    }

    #[test]
    fn fuzzy_threshold_is_a_percentage() {
        // "glosa" against "gloss" scores 80
        let mut config = SearchConfig {
            mode: SearchMode::Fuzzy,
            ..SearchConfig::default()
        };
        assert!(search_matches("glosa", "Gloss", &config));
        config.fuzzy_threshold = 75.0;
        assert!(search_matches("glosa", "Gloss", &config));
        config.fuzzy_threshold = 85.0;
        assert!(!search_matches("glosa", "Gloss", &config));
        config.fuzzy_threshold = 100.0;
        assert!(!search_matches("glosa", "Gloss", &config));
        assert!(search_matches("gloss", "Gloss", &config));
        assert!(!search_matches("zzzzz", "Gloss", &config));
    }

    #[test]
    fn missing_list_element_is_an_error() {
        let doc = MemoryDocument::new();
        let panel = doc.create(&doc.body(), "div", &[]);
        let result = SearchableList::mount(&doc, &panel, records(), &GlossaryConfig::default());
        assert!(matches!(
            result,
            Err(GlossaryError::MissingElement { role: "list", .. })
        ));
    }
}
