//! [`Document`] over the live page, and the JavaScript entry point.

use crate::config::GlossaryConfig;
use crate::dom::{Document, DomEvent, EventKind, Handler, Key};
use crate::error::GlossaryError;
use crate::glossary::Glossary;
use crate::selector::SelectorError;
use crate::terms::parse_terms;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlElement, HtmlInputElement, KeyboardEvent};

#[derive(Clone)]
pub struct BrowserDocument {
    document: web_sys::Document,
    body: Element,
}

pub struct BrowserListener {
    target: Element,
    kind: EventKind,
    closure: Closure<dyn FnMut(Event)>,
}

impl BrowserDocument {
    /// Binds to `window.document`.
    pub fn current() -> Result<Self, GlossaryError> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| GlossaryError::Dom("no document".to_string()))?;
        let body = document
            .body()
            .ok_or_else(|| GlossaryError::Dom("document has no body".to_string()))?;
        Ok(Self {
            document,
            body: body.into(),
        })
    }
}

fn report(operation: &str, result: Result<(), JsValue>) {
    if let Err(err) = result {
        warn!(operation, error = ?err, "dom call failed");
    }
}

impl Document for BrowserDocument {
    type Node = Element;
    type Listener = BrowserListener;

    fn body(&self) -> Element {
        self.body.clone()
    }

    fn query_selector(&self, scope: &Element, selector: &str) -> Option<Element> {
        scope.query_selector(selector).ok().flatten()
    }

    fn query_selector_all(&self, scope: &Element, selector: &str) -> Vec<Element> {
        let Ok(nodes) = scope.query_selector_all(selector) else {
            warn!(selector, "query failed");
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|index| nodes.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn matches(&self, node: &Element, selector: &str) -> bool {
        node.matches(selector).unwrap_or(false)
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn children(&self, node: &Element) -> Vec<Element> {
        let children = node.children();
        (0..children.length())
            .filter_map(|index| children.item(index))
            .collect()
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn set_attribute(&self, node: &Element, name: &str, value: &str) {
        report("setAttribute", node.set_attribute(name, value));
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn add_class(&self, node: &Element, class: &str) {
        report("classList.add", node.class_list().add_1(class));
    }

    fn remove_class(&self, node: &Element, class: &str) {
        report("classList.remove", node.class_list().remove_1(class));
    }

    fn value(&self, node: &Element) -> String {
        node.dyn_ref::<HtmlInputElement>()
            .map(HtmlInputElement::value)
            .unwrap_or_default()
    }

    fn set_value(&self, node: &Element, value: &str) {
        if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn focus(&self, node: &Element) {
        if let Some(element) = node.dyn_ref::<HtmlElement>() {
            report("focus", element.focus());
        }
    }

    fn validate_selector(&self, selector: &str) -> Result<(), GlossaryError> {
        self.document
            .query_selector(selector)
            .map(|_| ())
            .map_err(|_| {
                GlossaryError::InvalidSelector(SelectorError::new(
                    selector,
                    0,
                    "rejected by the browser",
                ))
            })
    }

    fn create_element(&self, tag: &str) -> Result<Element, GlossaryError> {
        self.document
            .create_element(tag)
            .map_err(|err| GlossaryError::Dom(format!("cannot create <{tag}>: {err:?}")))
    }

    fn append_child(&self, parent: &Element, child: &Element) {
        report("appendChild", parent.append_child(child).map(|_| ()));
    }

    fn detach(&self, node: &Element) {
        node.remove();
    }

    fn listen(&self, node: &Element, kind: EventKind, handler: Handler<Element>) -> BrowserListener {
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(target) = event.target().and_then(|target| target.dyn_into::<Element>().ok())
            else {
                return;
            };
            let key = event
                .dyn_ref::<KeyboardEvent>()
                .map(|keyboard| Key::from_dom(&keyboard.key()));
            handler(&DomEvent { kind, target, key });
        });
        report(
            "addEventListener",
            node.add_event_listener_with_callback(kind.as_str(), closure.as_ref().unchecked_ref()),
        );
        BrowserListener {
            target: node.clone(),
            kind,
            closure,
        }
    }

    fn unlisten(&self, listener: BrowserListener) {
        report(
            "removeEventListener",
            listener.target.remove_event_listener_with_callback(
                listener.kind.as_str(),
                listener.closure.as_ref().unchecked_ref(),
            ),
        );
    }
}

fn to_js(err: GlossaryError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// The glossary as seen from JavaScript.
///
/// ```js
/// const glossary = new GlossaryHandle(JSON.stringify(terms));
/// glossary.findTerm("bundling");
/// glossary.destroy();
/// ```
#[wasm_bindgen]
pub struct GlossaryHandle {
    inner: Glossary<BrowserDocument>,
}

#[wasm_bindgen]
impl GlossaryHandle {
    /// `terms_json` is an array of `{"glossary-term", "glossary-definition"}`
    /// records; `config_json` optionally overrides selectors and classes.
    #[wasm_bindgen(constructor)]
    pub fn new(terms_json: &str, config_json: Option<String>) -> Result<GlossaryHandle, JsValue> {
        let terms = parse_terms(terms_json).map_err(to_js)?;
        let config = match config_json {
            Some(raw) => GlossaryConfig::from_json(&raw).map_err(to_js)?,
            None => GlossaryConfig::default(),
        };
        let document = BrowserDocument::current().map_err(to_js)?;
        let inner = Glossary::new(document, terms, config).map_err(to_js)?;
        Ok(Self { inner })
    }

    pub fn show(&self) {
        self.inner.show();
    }

    pub fn hide(&self) {
        self.inner.hide();
    }

    pub fn toggle(&self) {
        self.inner.toggle();
    }

    #[wasm_bindgen(js_name = findTerm)]
    pub fn find_term(&self, term: &str) {
        self.inner.find_term(term);
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    pub fn destroy(&self) {
        self.inner.destroy();
    }
}
