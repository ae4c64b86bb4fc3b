use crate::dom::{Document, EventKind, Handler};
use tracing::debug;

struct Registration<D: Document> {
    role: &'static str,
    kind: EventKind,
    listener: D::Listener,
}

/// Listeners attached by one owner, in registration order, so they can all be
/// detached again in a single pass.
pub struct ListenerRegistry<D: Document> {
    entries: Vec<Registration<D>>,
}

impl<D: Document> Default for ListenerRegistry<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D: Document> ListenerRegistry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` on `target`. A missing target is skipped and
    /// reported as `false`.
    pub fn attach(
        &mut self,
        doc: &D,
        target: Option<&D::Node>,
        role: &'static str,
        kind: EventKind,
        handler: Handler<D::Node>,
    ) -> bool {
        let Some(target) = target else {
            debug!(role, event = %kind, "no element, listener skipped");
            return false;
        };
        let listener = doc.listen(target, kind, handler);
        self.entries.push(Registration {
            role,
            kind,
            listener,
        });
        true
    }

    /// Detaches everything registered so far; returns how many were removed.
    pub fn drain(&mut self, doc: &D) -> usize {
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            debug!(role = entry.role, event = %entry.kind, "detaching listener");
            doc.unlisten(entry.listener);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn roles(&self) -> impl Iterator<Item = (&'static str, EventKind)> + '_ {
        self.entries.iter().map(|entry| (entry.role, entry.kind))
    }
}
