//! The glossary controller.
//!
//! Keeps three things in step: whether the panel is open, how the term list
//! is filtered, and which inline term references in the page are highlighted.

use crate::accordion::{Accordion, Disclosure};
use crate::config::{GlossaryConfig, Selectors};
use crate::dom::{Document, DomEvent, EventKind, Handler, Key};
use crate::error::GlossaryError;
use crate::list::{RenderedItem, SearchableList, SortOrder, TermList};
use crate::listeners::ListenerRegistry;
use crate::tabindex::{remove_tabindex, restore_tabindex};
use crate::terms::{TermRecord, normalize_term};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

pub const OPEN_CLASS: &str = "is-open";
pub const ACTIVE_CLASS: &str = "active";
pub const HIGHLIGHT_CLASS: &str = "term--highlight";
/// Elements inside the panel that toggle it when clicked.
pub const PANEL_TOGGLE_SELECTOR: &str = ".toggle";
pub const TERM_TITLE: &str = "Click to define";
pub const TERM_ATTRIBUTE: &str = "data-term";

type Shared<D, L, A> = Rc<RefCell<Option<GlossaryState<D, L, A>>>>;
type WeakShared<D, L, A> = Weak<RefCell<Option<GlossaryState<D, L, A>>>>;

/// A mounted glossary panel.
///
/// The handle is the only strong owner of the controller state; listeners
/// registered on the document hold weak references. [`Glossary::destroy`]
/// detaches them and drops every node reference, after which all methods
/// are no-ops. Dropping the handle does the same.
pub struct Glossary<D, L = SearchableList<D>, A = Accordion<D>>
where
    D: Document + 'static,
    L: TermList<D> + 'static,
    A: Disclosure<D> + 'static,
{
    shared: Shared<D, L, A>,
}

struct GlossaryState<D: Document, L, A> {
    doc: D,
    selectors: Selectors,
    panel: D::Node,
    toggle: Option<D::Node>,
    close: Option<D::Node>,
    search: Option<D::Node>,
    is_open: bool,
    list: L,
    accordion: A,
    listeners: ListenerRegistry<D>,
}

impl<D, L, A> Glossary<D, L, A>
where
    D: Document + 'static,
    L: TermList<D> + 'static,
    A: Disclosure<D> + 'static,
{
    pub fn new(
        doc: D,
        terms: Vec<TermRecord>,
        config: GlossaryConfig,
    ) -> Result<Self, GlossaryError> {
        config.validate(&doc)?;
        let selectors = config.selectors.clone();
        let body = doc.body();
        let panel = doc.query_selector(&body, &selectors.body).ok_or_else(|| {
            GlossaryError::MissingElement {
                role: "panel",
                selector: selectors.body.clone(),
            }
        })?;
        let toggle = doc.query_selector(&body, &selectors.toggle);
        let close = doc.query_selector(&body, &selectors.close);
        let search = doc.query_selector(&panel, &config.classes.search_selector());
        for (role, node) in [("toggle", &toggle), ("close", &close), ("search", &search)] {
            if node.is_none() {
                debug!(role, "optional element not found");
            }
        }

        let mut list = L::mount(&doc, &panel, terms, &config)?;
        list.sort(SortOrder::Ascending);
        let linked = link_terms(&doc, &selectors.term);
        remove_tabindex(&doc, &panel);
        let accordion = A::mount(&doc, &list.container(), &config.classes);

        let state = GlossaryState {
            doc,
            selectors,
            panel,
            toggle,
            close,
            search,
            is_open: false,
            list,
            accordion,
            listeners: ListenerRegistry::new(),
        };
        state.mark_closed();

        let glossary = Self {
            shared: Rc::new(RefCell::new(Some(state))),
        };
        glossary.attach_listeners();
        debug!(linked, "glossary mounted");
        Ok(glossary)
    }

    fn attach_listeners(&self) {
        let weak = Rc::downgrade(&self.shared);
        let mut guard = self.shared.borrow_mut();
        let Some(state) = guard.as_mut() else {
            return;
        };
        let doc = state.doc.clone();
        let body = doc.body();
        let panel = state.panel.clone();
        let toggle = state.toggle.clone();
        let close = state.close.clone();
        let search = state.search.clone();
        let listeners = &mut state.listeners;

        listeners.attach(
            &doc,
            toggle.as_ref(),
            "toggle",
            EventKind::Click,
            handler(&weak, |state, _| state.toggle()),
        );
        listeners.attach(
            &doc,
            close.as_ref(),
            "close",
            EventKind::Click,
            handler(&weak, |state, _| state.hide()),
        );
        listeners.attach(
            &doc,
            Some(&panel),
            "panel",
            EventKind::Click,
            handler(&weak, |state, event| {
                if state.doc.matches(&event.target, PANEL_TOGGLE_SELECTOR) {
                    state.toggle();
                }
            }),
        );
        listeners.attach(
            &doc,
            search.as_ref(),
            "search",
            EventKind::Input,
            handler(&weak, |state, _| state.handle_input()),
        );
        listeners.attach(
            &doc,
            Some(&body),
            "escape",
            EventKind::KeyUp,
            handler(&weak, |state, event| state.handle_keyup(event)),
        );
        listeners.attach(
            &doc,
            Some(&body),
            "term-click",
            EventKind::Click,
            handler(&weak, |state, event| state.handle_term_touch(event)),
        );
        listeners.attach(
            &doc,
            Some(&body),
            "term-key",
            EventKind::KeyUp,
            handler(&weak, |state, event| state.handle_term_touch(event)),
        );
    }

    fn with_state<R>(&self, action: impl FnOnce(&mut GlossaryState<D, L, A>) -> R) -> Option<R> {
        let Ok(mut guard) = self.shared.try_borrow_mut() else {
            warn!("glossary is busy, call ignored");
            return None;
        };
        match guard.as_mut() {
            Some(state) => Some(action(state)),
            None => {
                debug!("glossary destroyed, call ignored");
                None
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.with_state(|state| state.is_open).unwrap_or(false)
    }

    pub fn show(&self) {
        self.with_state(GlossaryState::show);
    }

    pub fn hide(&self) {
        self.with_state(GlossaryState::hide);
    }

    pub fn toggle(&self) {
        self.with_state(GlossaryState::toggle);
    }

    /// Highlights the inline references to `term` and narrows the list to it.
    pub fn find_term(&self, term: &str) {
        self.with_state(|state| state.find_term(term));
    }

    pub fn handle_input(&self) {
        self.with_state(GlossaryState::handle_input);
    }

    pub fn handle_keyup(&self, event: &DomEvent<D::Node>) {
        self.with_state(|state| state.handle_keyup(event));
    }

    pub fn handle_term_touch(&self, event: &DomEvent<D::Node>) {
        self.with_state(|state| state.handle_term_touch(event));
    }

    /// Detaches every listener the glossary registered, tears down its
    /// collaborators and drops all node references. Calling it again does
    /// nothing.
    pub fn destroy(&self) {
        let Ok(mut guard) = self.shared.try_borrow_mut() else {
            warn!("glossary is busy, destroy ignored");
            return;
        };
        match guard.take() {
            Some(state) => state.teardown(),
            None => debug!("glossary already destroyed"),
        }
    }

    fn release(&self) {
        let state = match self.shared.try_borrow_mut() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(state) = state {
            state.teardown();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.try_borrow().is_ok_and(|guard| guard.is_none())
    }

    pub fn visible_items(&self) -> Vec<RenderedItem<D::Node>> {
        self.with_state(|state| state.list.visible_items())
            .unwrap_or_default()
    }

    pub fn is_filtered(&self) -> bool {
        self.with_state(|state| state.list.is_filtered())
            .unwrap_or(false)
    }

    pub fn search_input(&self) -> Option<D::Node> {
        self.with_state(|state| state.search.clone()).flatten()
    }

    /// Number of listeners the controller itself holds.
    pub fn listener_count(&self) -> usize {
        self.with_state(|state| state.listeners.len())
            .unwrap_or(0)
    }

    /// Gives read access to the collaborators.
    pub fn inspect<R>(&self, view: impl FnOnce(&L, &A) -> R) -> Option<R> {
        self.with_state(|state| view(&state.list, &state.accordion))
    }
}

fn handler<D, L, A, F>(weak: &WeakShared<D, L, A>, action: F) -> Handler<D::Node>
where
    D: Document + 'static,
    L: TermList<D> + 'static,
    A: Disclosure<D> + 'static,
    F: Fn(&mut GlossaryState<D, L, A>, &DomEvent<D::Node>) + 'static,
{
    let weak = weak.clone();
    Rc::new(move |event: &DomEvent<D::Node>| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let Ok(mut guard) = shared.try_borrow_mut() else {
            warn!(event = %event.kind, "glossary is busy, event dropped");
            return;
        };
        if let Some(state) = guard.as_mut() {
            action(state, event);
        }
    })
}

/// Prepares inline references for activation; returns how many were found.
fn link_terms<D: Document>(doc: &D, selector: &str) -> usize {
    let terms = doc.query_selector_all(&doc.body(), selector);
    for term in &terms {
        let key = normalize_term(&doc.attribute(term, TERM_ATTRIBUTE).unwrap_or_default());
        doc.set_attribute(term, "title", TERM_TITLE);
        doc.set_attribute(term, "tabindex", "0");
        doc.set_attribute(term, TERM_ATTRIBUTE, &key);
    }
    terms.len()
}

impl<D, L, A> Drop for Glossary<D, L, A>
where
    D: Document + 'static,
    L: TermList<D> + 'static,
    A: Disclosure<D> + 'static,
{
    fn drop(&mut self) {
        self.release();
    }
}

impl<D, L, A> GlossaryState<D, L, A>
where
    D: Document,
    L: TermList<D>,
    A: Disclosure<D>,
{
    fn mark_closed(&self) {
        self.doc.remove_class(&self.panel, OPEN_CLASS);
        self.doc.set_attribute(&self.panel, "aria-hidden", "true");
        if let Some(toggle) = &self.toggle {
            self.doc.remove_class(toggle, ACTIVE_CLASS);
        }
    }

    fn show(&mut self) {
        self.doc.add_class(&self.panel, OPEN_CLASS);
        self.doc.set_attribute(&self.panel, "aria-hidden", "false");
        if let Some(toggle) = &self.toggle {
            self.doc.add_class(toggle, ACTIVE_CLASS);
        }
        self.is_open = true;
        restore_tabindex(&self.doc, &self.panel);
        if let Some(search) = &self.search {
            self.doc.focus(search);
        }
        debug!("glossary opened");
    }

    fn hide(&mut self) {
        self.mark_closed();
        self.is_open = false;
        remove_tabindex(&self.doc, &self.panel);
        if let Some(toggle) = &self.toggle {
            self.doc.focus(toggle);
        }
        debug!("glossary closed");
    }

    fn toggle(&mut self) {
        if self.is_open {
            self.hide();
        } else {
            self.show();
        }
    }

    /// Re-applies the tab order for the current state. Items the list
    /// re-attaches keep whatever tabindex they had when they were detached.
    fn sync_tab_order(&self) {
        if self.is_open {
            restore_tabindex(&self.doc, &self.panel);
        } else {
            remove_tabindex(&self.doc, &self.panel);
        }
    }

    fn find_term(&mut self, term: &str) {
        let key = normalize_term(term);
        if let Some(search) = &self.search {
            self.doc.set_value(search, &key);
        }

        let body = self.doc.body();
        let highlight_selector = format!(".{HIGHLIGHT_CLASS}");
        for node in self.doc.query_selector_all(&body, &highlight_selector) {
            self.doc.remove_class(&node, HIGHLIGHT_CLASS);
        }
        let mut highlighted = 0usize;
        for node in self.doc.query_selector_all(&body, &self.selectors.term) {
            let reference = self.doc.attribute(&node, TERM_ATTRIBUTE).unwrap_or_default();
            if normalize_term(&reference) == key {
                self.doc.add_class(&node, HIGHLIGHT_CLASS);
                highlighted += 1;
            }
        }

        let wanted = key.clone();
        self.list
            .filter(Some(Box::new(move |record: &TermRecord| record.key() == wanted)));
        // a stale live-search query would hide the match
        self.list.search(None);

        // Filtering re-renders the entry without re-running its disclosure,
        // so open whatever is left explicitly.
        for item in self.list.visible_items() {
            if self.accordion.is_collapsed(&item.node) {
                self.accordion.expand(&item.node);
            }
        }
        self.sync_tab_order();
        debug!(term = %key, highlighted, "term found");
    }

    fn handle_input(&mut self) {
        if self.list.is_filtered() {
            // hand filtering back to the list's own live search
            self.list.filter(None);
        }
        self.sync_tab_order();
    }

    fn handle_keyup(&mut self, event: &DomEvent<D::Node>) {
        if event.is_key(&Key::Escape) && self.is_open {
            self.hide();
        }
    }

    fn handle_term_touch(&mut self, event: &DomEvent<D::Node>) {
        let activated = match event.kind {
            EventKind::Click => true,
            EventKind::KeyUp => event.is_key(&Key::Enter),
            EventKind::Input => false,
        };
        if !activated || !self.doc.matches(&event.target, &self.selectors.term) {
            return;
        }
        let term = self
            .doc
            .attribute(&event.target, TERM_ATTRIBUTE)
            .unwrap_or_default();
        self.show();
        self.find_term(&term);
    }

    fn teardown(mut self) {
        let removed = self.listeners.drain(&self.doc);
        self.accordion.teardown();
        self.list.teardown();
        debug!(removed, "glossary destroyed");
    }
}
