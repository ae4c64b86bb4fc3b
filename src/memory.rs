//! An in-memory [`Document`] used by tests, benches and the CLI.

use crate::config::GlossaryConfig;
use crate::dom::{Document, DomEvent, EventKind, Handler, Key};
use crate::error::GlossaryError;
use crate::selector::{SelectorList, Subject};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::warn;

const BODY: NodeId = NodeId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct MemoryListener {
    id: u64,
}

/// The elements [`MemoryDocument::scaffold`] creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaffold {
    pub toggle: NodeId,
    pub panel: NodeId,
    pub close: NodeId,
    pub search: NodeId,
    pub list: NodeId,
}

/// A shared handle to an element tree rooted at `<body>`.
#[derive(Clone)]
pub struct MemoryDocument {
    tree: Rc<RefCell<Tree>>,
}

struct Tree {
    nodes: Vec<NodeData>,
    active: Option<NodeId>,
    listeners: Vec<ListenerEntry>,
    next_listener: u64,
    selectors: HashMap<String, Option<SelectorList>>,
}

struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    value: String,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            value: String::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(String::as_str)
            .unwrap_or_default()
            .split_whitespace()
    }
}

struct ListenerEntry {
    id: u64,
    node: NodeId,
    kind: EventKind,
    handler: Handler<NodeId>,
}

#[derive(Clone, Copy)]
struct TreeNode<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl Subject for TreeNode<'_> {
    fn tag_name(&self) -> &str {
        &self.tree.node(self.id).tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.tree
            .node(self.id)
            .attributes
            .get(name)
            .map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.tree.node(self.id).classes().any(|c| c == class)
    }

    fn parent(&self) -> Option<Self> {
        self.tree.node(self.id).parent.map(|id| TreeNode {
            tree: self.tree,
            id,
        })
    }
}

impl Tree {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn compile(&mut self, source: &str) {
        if self.selectors.contains_key(source) {
            return;
        }
        let compiled = match SelectorList::parse(source) {
            Ok(list) => Some(list),
            Err(err) => {
                warn!(%err, "ignoring unparsable selector");
                None
            }
        };
        self.selectors.insert(source.to_string(), compiled);
    }

    fn selector(&self, source: &str) -> Option<&SelectorList> {
        self.selectors.get(source).and_then(Option::as_ref)
    }

    fn matches(&self, id: NodeId, list: &SelectorList) -> bool {
        list.matches(&TreeNode { tree: self, id })
    }

    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(scope).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    fn path_to_root(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = vec![target];
        let mut current = self.node(target).parent;
        while let Some(id) = current {
            path.push(id);
            current = self.node(id).parent;
        }
        path
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|child| *child != id);
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            tree: Rc::new(RefCell::new(Tree {
                nodes: vec![NodeData::new("body")],
                active: None,
                listeners: Vec::new(),
                next_listener: 0,
                selectors: HashMap::new(),
            })),
        }
    }

    /// Creates an element with the given attributes and appends it to `parent`.
    pub fn create(&self, parent: &NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = self.new_node(tag);
        for (name, value) in attributes {
            self.set_attribute(&node, name, value);
        }
        self.append_child(parent, &node);
        node
    }

    pub fn create_with_text(
        &self,
        parent: &NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let node = self.create(parent, tag, attributes);
        self.set_text(&node, text);
        node
    }

    /// Creates an element that matches a single compound selector such as
    /// `button.js-glossary-toggle` or `#glossary`.
    pub fn create_matching(
        &self,
        parent: &NodeId,
        default_tag: &str,
        selector: &str,
    ) -> Result<NodeId, GlossaryError> {
        let list = SelectorList::parse(selector)?;
        let compound = list.as_compound().ok_or_else(|| {
            GlossaryError::Dom(format!("cannot build an element from {selector:?}"))
        })?;
        let node = self.new_node(compound.tag.as_deref().unwrap_or(default_tag));
        if let Some(id) = &compound.id {
            self.set_attribute(&node, "id", id);
        }
        if !compound.classes.is_empty() {
            self.set_attribute(&node, "class", &compound.classes.join(" "));
        }
        for attribute in &compound.attributes {
            self.set_attribute(&node, &attribute.name, attribute.value.as_deref().unwrap_or(""));
        }
        self.append_child(parent, &node);
        Ok(node)
    }

    /// Builds the panel markup `config` expects: a toggle in the body and
    /// the panel with its close button, search box and list.
    pub fn scaffold(&self, config: &GlossaryConfig) -> Result<Scaffold, GlossaryError> {
        let body = self.body();
        let toggle = self.create_matching(&body, "button", &config.selectors.toggle)?;
        let panel = self.create_matching(&body, "div", &config.selectors.body)?;
        let close = self.create_matching(&panel, "button", &config.selectors.close)?;
        let search = self.create_matching(&panel, "input", &config.classes.search_selector())?;
        let list = self.create_matching(&panel, "ul", &config.classes.list_selector())?;
        Ok(Scaffold {
            toggle,
            panel,
            close,
            search,
            list,
        })
    }

    /// Delivers `event` to listeners on the target and then on each ancestor.
    pub fn dispatch(&self, event: DomEvent<NodeId>) {
        let kind = event.kind;
        let handlers: Vec<(u64, Handler<NodeId>)> = {
            let tree = self.tree.borrow();
            tree.path_to_root(event.target)
                .into_iter()
                .flat_map(|node| {
                    tree.listeners
                        .iter()
                        .filter(move |entry| entry.node == node && entry.kind == kind)
                        .map(|entry| (entry.id, Rc::clone(&entry.handler)))
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        for (id, handler) in handlers {
            // a handler earlier in the path may have unregistered this one
            if self.is_listening(id) {
                handler(&event);
            }
        }
    }

    pub fn click(&self, node: &NodeId) {
        self.dispatch(DomEvent::click(*node));
    }

    pub fn keyup(&self, node: &NodeId, key: Key) {
        self.dispatch(DomEvent::keyup(*node, key));
    }

    /// Sets the control's value the way typing would, then fires `input`.
    pub fn input(&self, node: &NodeId, value: &str) {
        self.set_value(node, value);
        self.dispatch(DomEvent::input(*node));
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.tree.borrow().active
    }

    pub fn listener_count(&self) -> usize {
        self.tree.borrow().listeners.len()
    }

    fn new_node(&self, tag: &str) -> NodeId {
        let mut tree = self.tree.borrow_mut();
        tree.nodes.push(NodeData::new(tag));
        NodeId(tree.nodes.len() - 1)
    }

    fn is_listening(&self, id: u64) -> bool {
        self.tree
            .borrow()
            .listeners
            .iter()
            .any(|entry| entry.id == id)
    }
}

impl Document for MemoryDocument {
    type Node = NodeId;
    type Listener = MemoryListener;

    fn body(&self) -> NodeId {
        BODY
    }

    fn query_selector(&self, scope: &NodeId, selector: &str) -> Option<NodeId> {
        let mut tree = self.tree.borrow_mut();
        tree.compile(selector);
        let tree = &*tree;
        let list = tree.selector(selector)?;
        tree.descendants(*scope)
            .into_iter()
            .find(|id| tree.matches(*id, list))
    }

    fn query_selector_all(&self, scope: &NodeId, selector: &str) -> Vec<NodeId> {
        let mut tree = self.tree.borrow_mut();
        tree.compile(selector);
        let tree = &*tree;
        let Some(list) = tree.selector(selector) else {
            return Vec::new();
        };
        tree.descendants(*scope)
            .into_iter()
            .filter(|id| tree.matches(*id, list))
            .collect()
    }

    fn matches(&self, node: &NodeId, selector: &str) -> bool {
        let mut tree = self.tree.borrow_mut();
        tree.compile(selector);
        let tree = &*tree;
        tree.selector(selector)
            .is_some_and(|list| tree.matches(*node, list))
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.tree.borrow().node(*node).parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.tree.borrow().node(*node).children.clone()
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.tree
            .borrow()
            .node(*node)
            .attributes
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) {
        self.tree
            .borrow_mut()
            .node_mut(*node)
            .attributes
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.tree.borrow().node(*node).classes().any(|c| c == class)
    }

    fn add_class(&self, node: &NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let mut tree = self.tree.borrow_mut();
        let attributes = &mut tree.node_mut(*node).attributes;
        let classes = attributes.entry("class".to_string()).or_default();
        if !classes.trim().is_empty() {
            classes.push(' ');
        }
        classes.push_str(class);
    }

    fn remove_class(&self, node: &NodeId, class: &str) {
        let mut tree = self.tree.borrow_mut();
        let data = tree.node_mut(*node);
        let remaining: Vec<&str> = data.classes().filter(|c| *c != class).collect();
        let remaining = remaining.join(" ");
        if data.attributes.contains_key("class") {
            data.attributes.insert("class".to_string(), remaining);
        }
    }

    fn value(&self, node: &NodeId) -> String {
        self.tree.borrow().node(*node).value.clone()
    }

    fn set_value(&self, node: &NodeId, value: &str) {
        self.tree.borrow_mut().node_mut(*node).value = value.to_string();
    }

    fn text_content(&self, node: &NodeId) -> String {
        let tree = self.tree.borrow();
        let mut text = tree.node(*node).text.clone();
        for id in tree.descendants(*node) {
            text.push_str(&tree.node(id).text);
        }
        text
    }

    fn set_text(&self, node: &NodeId, text: &str) {
        let mut tree = self.tree.borrow_mut();
        for child in tree.node(*node).children.clone() {
            tree.detach(child);
        }
        tree.node_mut(*node).text = text.to_string();
    }

    fn focus(&self, node: &NodeId) {
        self.tree.borrow_mut().active = Some(*node);
    }

    fn validate_selector(&self, selector: &str) -> Result<(), GlossaryError> {
        SelectorList::parse(selector)?;
        Ok(())
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, GlossaryError> {
        Ok(self.new_node(tag))
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) {
        let mut tree = self.tree.borrow_mut();
        tree.detach(*child);
        tree.node_mut(*parent).children.push(*child);
        tree.node_mut(*child).parent = Some(*parent);
    }

    fn detach(&self, node: &NodeId) {
        self.tree.borrow_mut().detach(*node);
    }

    fn listen(&self, node: &NodeId, kind: EventKind, handler: Handler<NodeId>) -> MemoryListener {
        let mut tree = self.tree.borrow_mut();
        let id = tree.next_listener;
        tree.next_listener += 1;
        tree.listeners.push(ListenerEntry {
            id,
            node: *node,
            kind,
            handler,
        });
        MemoryListener { id }
    }

    fn unlisten(&self, listener: MemoryListener) {
        self.tree
            .borrow_mut()
            .listeners
            .retain(|entry| entry.id != listener.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &str) -> Handler<NodeId> {
        let log = Rc::clone(log);
        let label = label.to_string();
        Rc::new(move |event: &DomEvent<NodeId>| {
            log.borrow_mut().push(format!("{label}:{}", event.kind));
        })
    }

    #[test]
    fn queries_are_scoped_and_ordered() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let panel = doc.create(&body, "div", &[("id", "glossary")]);
        let outside = doc.create(&body, "button", &[]);
        let first = doc.create(&panel, "button", &[]);
        let list = doc.create(&panel, "ul", &[]);
        let nested = doc.create(&list, "a", &[("href", "#")]);

        assert_eq!(doc.query_selector(&body, "#glossary"), Some(panel));
        assert_eq!(
            doc.query_selector_all(&panel, "a, button"),
            vec![first, nested]
        );
        assert_eq!(doc.query_selector_all(&body, "button"), vec![first, outside]);
        assert!(doc.query_selector(&panel, "#glossary").is_none());
        assert!(doc.query_selector_all(&body, "div:hover").is_empty());
    }

    #[test]
    fn events_bubble_from_target_to_body() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let panel = doc.create(&body, "div", &[]);
        let button = doc.create(&panel, "button", &[]);
        let log = Rc::new(RefCell::new(Vec::new()));

        doc.listen(&body, EventKind::Click, recorder(&log, "body"));
        doc.listen(&button, EventKind::Click, recorder(&log, "button"));
        doc.listen(&panel, EventKind::Click, recorder(&log, "panel"));
        doc.listen(&panel, EventKind::KeyUp, recorder(&log, "panel"));

        doc.click(&button);
        assert_eq!(
            *log.borrow(),
            vec!["button:click", "panel:click", "body:click"]
        );
    }

    #[test]
    fn unlisten_skips_pending_handlers() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let button = doc.create(&body, "button", &[]);
        let log = Rc::new(RefCell::new(Vec::new()));

        let body_listener = doc.listen(&body, EventKind::Click, recorder(&log, "body"));
        let pending = Rc::new(RefCell::new(Some(body_listener)));
        let remover = {
            let doc = doc.clone();
            let pending = Rc::clone(&pending);
            Rc::new(move |_: &DomEvent<NodeId>| {
                if let Some(listener) = pending.borrow_mut().take() {
                    doc.unlisten(listener);
                }
            })
        };
        doc.listen(&button, EventKind::Click, remover);

        doc.click(&button);
        assert!(log.borrow().is_empty());
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn classes_and_attributes() {
        let doc = MemoryDocument::new();
        let node = doc.create(&doc.body(), "span", &[("data-Term", "Foo")]);
        assert_eq!(doc.attribute(&node, "data-term").as_deref(), Some("Foo"));

        doc.add_class(&node, "term");
        doc.add_class(&node, "term");
        doc.add_class(&node, "term--highlight");
        assert_eq!(
            doc.attribute(&node, "class").as_deref(),
            Some("term term--highlight")
        );
        doc.remove_class(&node, "term");
        assert!(!doc.has_class(&node, "term"));
        assert!(doc.has_class(&node, "term--highlight"));
        assert!(doc.matches(&node, "span.term--highlight[data-term=Foo]"));
    }

    #[test]
    fn text_and_tree_edits() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let item = doc.create(&body, "li", &[]);
        doc.create_with_text(&item, "button", &[], "foo");
        doc.create_with_text(&item, "p", &[], "definition of foo");
        assert_eq!(doc.text_content(&item), "foodefinition of foo");

        let other = doc.create(&body, "ul", &[]);
        doc.append_child(&other, &item);
        assert_eq!(doc.parent(&item), Some(other));
        assert_eq!(doc.children(&body), vec![other]);

        doc.detach(&item);
        assert!(doc.children(&other).is_empty());
        assert_eq!(doc.text_content(&item), "foodefinition of foo");

        doc.set_text(&item, "replaced");
        assert_eq!(doc.text_content(&item), "replaced");
        assert!(doc.children(&item).is_empty());
    }

    #[test]
    fn closest_includes_the_node_itself() {
        let doc = MemoryDocument::new();
        let item = doc.create(&doc.body(), "li", &[("class", "glossary__item")]);
        let header = doc.create(&item, "button", &[]);
        assert_eq!(doc.closest(&header, ".glossary__item"), Some(item));
        assert_eq!(doc.closest(&item, "li"), Some(item));
        assert_eq!(doc.closest(&header, "#missing"), None);
    }

    #[test]
    fn create_matching_builds_from_compound() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let toggle = doc
            .create_matching(&body, "button", ".js-glossary-toggle.primary")
            .unwrap();
        assert!(doc.matches(&toggle, "button.js-glossary-toggle.primary"));
        let panel = doc.create_matching(&body, "div", "aside#glossary").unwrap();
        assert!(doc.matches(&panel, "aside#glossary"));
        assert!(doc.create_matching(&body, "div", "div span").is_err());
    }

    #[test]
    fn scaffold_follows_the_configuration() {
        let doc = MemoryDocument::new();
        let mut config = GlossaryConfig::default();
        config.selectors.body = "aside#terms".to_string();
        config.classes.list = "terms-list".to_string();
        let scaffold = doc.scaffold(&config).unwrap();

        assert_eq!(doc.query_selector(&doc.body(), "aside#terms"), Some(scaffold.panel));
        assert_eq!(doc.query_selector(&doc.body(), ".js-glossary-toggle"), Some(scaffold.toggle));
        assert_eq!(doc.query_selector(&scaffold.panel, ".js-glossary-close"), Some(scaffold.close));
        assert_eq!(doc.query_selector(&scaffold.panel, "input.glossary__search"), Some(scaffold.search));
        assert_eq!(doc.query_selector(&scaffold.panel, "ul.terms-list"), Some(scaffold.list));

        config.selectors.close = "#panel .close".to_string();
        assert!(MemoryDocument::new().scaffold(&config).is_err());
    }

    #[test]
    fn input_sets_value_before_dispatch() {
        let doc = MemoryDocument::new();
        let input = doc.create(&doc.body(), "input", &[]);
        let seen = Rc::new(RefCell::new(String::new()));
        let handler = {
            let doc = doc.clone();
            let seen = Rc::clone(&seen);
            Rc::new(move |event: &DomEvent<NodeId>| {
                *seen.borrow_mut() = doc.value(&event.target);
            })
        };
        doc.listen(&input, EventKind::Input, handler);
        doc.input(&input, "fo");
        assert_eq!(*seen.borrow(), "fo");
    }
}
