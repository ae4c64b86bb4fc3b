//! Tab-order sweeps over a subtree.

use crate::dom::Document;
use tracing::debug;

/// Elements that take part in sequential focus navigation.
pub const FOCUSABLE_SELECTOR: &str = "a, button, input, [tabindex]";

/// Takes every focusable descendant of `scope` out of the tab order.
pub fn remove_tabindex<D: Document>(doc: &D, scope: &D::Node) {
    sweep(doc, scope, "-1");
}

/// Puts every focusable descendant of `scope` back into the tab order.
pub fn restore_tabindex<D: Document>(doc: &D, scope: &D::Node) {
    sweep(doc, scope, "0");
}

fn sweep<D: Document>(doc: &D, scope: &D::Node, value: &str) {
    let nodes = doc.query_selector_all(scope, FOCUSABLE_SELECTOR);
    debug!(count = nodes.len(), tabindex = value, "tabindex sweep");
    for node in &nodes {
        doc.set_attribute(node, "tabindex", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    #[test]
    fn sweep_stays_inside_scope() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let panel = doc.create(&body, "div", &[("tabindex", "0")]);
        let link = doc.create(&panel, "a", &[("href", "#")]);
        let input = doc.create(&panel, "input", &[]);
        let custom = doc.create(&panel, "div", &[("tabindex", "3")]);
        let plain = doc.create(&panel, "p", &[]);
        let outside = doc.create(&body, "button", &[]);

        remove_tabindex(&doc, &panel);
        for node in [link, input, custom] {
            assert_eq!(doc.attribute(&node, "tabindex").as_deref(), Some("-1"));
        }
        assert_eq!(doc.attribute(&plain, "tabindex"), None);
        assert_eq!(doc.attribute(&outside, "tabindex"), None);
        assert_eq!(doc.attribute(&panel, "tabindex").as_deref(), Some("0"));

        remove_tabindex(&doc, &panel);
        assert_eq!(doc.attribute(&link, "tabindex").as_deref(), Some("-1"));

        restore_tabindex(&doc, &panel);
        restore_tabindex(&doc, &panel);
        for node in [link, input, custom] {
            assert_eq!(doc.attribute(&node, "tabindex").as_deref(), Some("0"));
        }
        assert_eq!(doc.attribute(&plain, "tabindex"), None);
        assert_eq!(doc.attribute(&outside, "tabindex"), None);
    }
}
