//! A collapsible glossary panel: open/close state, accessibility sweeps,
//! term lookup from inline references and a searchable, accordion-style
//! list of definitions, written against a small DOM capability.

pub mod accordion;
#[cfg(feature = "browser")]
pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod glossary;
pub mod list;
pub mod listeners;
pub mod memory;
pub mod selector;
pub mod tabindex;
pub mod terms;

pub use accordion::{Accordion, Disclosure};
#[cfg(feature = "browser")]
pub use browser::{BrowserDocument, GlossaryHandle};
pub use config::{GlossaryClasses, GlossaryConfig, SearchConfig, SearchMode, Selectors};
pub use dom::{Document, DomEvent, EventKind, Key};
pub use error::GlossaryError;
pub use glossary::Glossary;
pub use list::{RenderedItem, SearchableList, SortOrder, TermList};
pub use memory::{MemoryDocument, NodeId, Scaffold};
pub use tabindex::{remove_tabindex, restore_tabindex};
pub use terms::{TermIssue, TermRecord, audit_terms, load_terms, normalize_term, parse_terms};
