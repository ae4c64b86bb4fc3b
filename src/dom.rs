//! The DOM capability the widget is written against.
//!
//! Every query is scoped to an explicit node. Implementations exist for an
//! in-memory tree ([`crate::memory::MemoryDocument`]) and, behind the
//! `browser` feature, for the live page through `web-sys`.

use crate::error::GlossaryError;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    KeyUp,
    Input,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::KeyUp => "keyup",
            EventKind::Input => "input",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other(String),
}

impl Key {
    /// Maps a `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent<N> {
    pub kind: EventKind,
    /// The element the event originated from, not the one listening.
    pub target: N,
    pub key: Option<Key>,
}

impl<N> DomEvent<N> {
    pub fn click(target: N) -> Self {
        Self {
            kind: EventKind::Click,
            target,
            key: None,
        }
    }

    pub fn keyup(target: N, key: Key) -> Self {
        Self {
            kind: EventKind::KeyUp,
            target,
            key: Some(key),
        }
    }

    pub fn input(target: N) -> Self {
        Self {
            kind: EventKind::Input,
            target,
            key: None,
        }
    }

    pub fn is_key(&self, key: &Key) -> bool {
        self.key.as_ref() == Some(key)
    }
}

pub type Handler<N> = Rc<dyn Fn(&DomEvent<N>)>;

pub trait Document: Clone {
    type Node: Clone + PartialEq + fmt::Debug + 'static;
    /// Proof of a registration, handed back to [`Document::unlisten`].
    type Listener: 'static;

    fn body(&self) -> Self::Node;

    /// First descendant of `scope` matching `selector`, in document order.
    fn query_selector(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node>;

    /// Every descendant of `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;

    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    fn add_class(&self, node: &Self::Node, class: &str);

    fn remove_class(&self, node: &Self::Node, class: &str);

    /// Current value of a form control; empty for other elements.
    fn value(&self, node: &Self::Node) -> String;

    fn set_value(&self, node: &Self::Node, value: &str);

    fn text_content(&self, node: &Self::Node) -> String;

    fn set_text(&self, node: &Self::Node, text: &str);

    fn focus(&self, node: &Self::Node);

    /// Fails with [`GlossaryError::InvalidSelector`] when this document cannot
    /// evaluate `selector`.
    fn validate_selector(&self, selector: &str) -> Result<(), GlossaryError>;

    /// Creates a detached element.
    fn create_element(&self, tag: &str) -> Result<Self::Node, GlossaryError>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node);

    /// Removes `node` from its parent, keeping it alive for reinsertion.
    fn detach(&self, node: &Self::Node);

    fn listen(
        &self,
        node: &Self::Node,
        kind: EventKind,
        handler: Handler<Self::Node>,
    ) -> Self::Listener;

    fn unlisten(&self, listener: Self::Listener);

    /// Nearest inclusive ancestor of `node` matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if self.matches(&candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(&candidate);
        }
        None
    }
}
