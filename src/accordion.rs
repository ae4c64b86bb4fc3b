//! Disclosure behaviour for list items.
//!
//! Each rendered item is a region with a header (the term button) and a
//! content block (the definition). Regions start collapsed; activating a
//! header flips its region.

use crate::config::GlossaryClasses;
use crate::dom::{Document, DomEvent, EventKind};
use std::rc::Rc;
use tracing::debug;

pub const COLLAPSED_CLASS: &str = "accordion--collapsed";
pub const EXPANDED_CLASS: &str = "accordion--expanded";

pub trait Disclosure<D: Document>: Sized {
    /// Binds to every region currently inside `container`.
    fn mount(doc: &D, container: &D::Node, classes: &GlossaryClasses) -> Self;

    fn is_collapsed(&self, region: &D::Node) -> bool;

    fn expand(&mut self, region: &D::Node);

    /// Detaches the accordion from the document. Safe to call twice.
    fn teardown(&mut self);
}

pub struct Accordion<D: Document> {
    shared: Rc<AccordionShared<D>>,
    listener: Option<D::Listener>,
}

struct AccordionShared<D: Document> {
    doc: D,
    region_selector: String,
    header_selector: String,
    content_selector: String,
}

impl<D: Document> AccordionShared<D> {
    fn set_expanded(&self, region: &D::Node, expanded: bool) {
        let doc = &self.doc;
        let (add, remove) = if expanded {
            (EXPANDED_CLASS, COLLAPSED_CLASS)
        } else {
            (COLLAPSED_CLASS, EXPANDED_CLASS)
        };
        doc.remove_class(region, remove);
        doc.add_class(region, add);
        if let Some(header) = doc.query_selector(region, &self.header_selector) {
            doc.set_attribute(&header, "aria-expanded", if expanded { "true" } else { "false" });
        }
        if let Some(content) = doc.query_selector(region, &self.content_selector) {
            doc.set_attribute(&content, "aria-hidden", if expanded { "false" } else { "true" });
        }
    }

    fn is_collapsed(&self, region: &D::Node) -> bool {
        self.doc.has_class(region, COLLAPSED_CLASS)
    }

    fn activate(&self, target: &D::Node) {
        let Some(header) = self.doc.closest(target, &self.header_selector) else {
            return;
        };
        let Some(region) = self.doc.closest(&header, &self.region_selector) else {
            return;
        };
        let expand = self.is_collapsed(&region);
        self.set_expanded(&region, expand);
    }
}

impl<D: Document + 'static> Disclosure<D> for Accordion<D> {
    fn mount(doc: &D, container: &D::Node, classes: &GlossaryClasses) -> Self {
        let shared = Rc::new(AccordionShared {
            doc: doc.clone(),
            region_selector: classes.item_selector(),
            header_selector: classes.term_selector(),
            content_selector: classes.definition_selector(),
        });
        let regions = doc.query_selector_all(container, &shared.region_selector);
        for region in &regions {
            shared.set_expanded(region, false);
        }
        debug!(regions = regions.len(), "accordion mounted");

        let weak = Rc::downgrade(&shared);
        let listener = doc.listen(
            container,
            EventKind::Click,
            Rc::new(move |event: &DomEvent<D::Node>| {
                if let Some(shared) = weak.upgrade() {
                    shared.activate(&event.target);
                }
            }),
        );
        Self {
            shared,
            listener: Some(listener),
        }
    }

    fn is_collapsed(&self, region: &D::Node) -> bool {
        self.shared.is_collapsed(region)
    }

    fn expand(&mut self, region: &D::Node) {
        self.shared.set_expanded(region, true);
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.shared.doc.unlisten(listener);
            debug!("accordion torn down");
        }
    }
}
