// src/application/services/change_watcher.rs
use tracing::trace;

use crate::domain::document::{Document, MutationKind, MutationRecord};

/// Signal that content below the watched container changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentChanged {
    pub child_list: usize,
    pub attributes: usize,
}

/// Observes mutations of the content container's subtree.
///
/// The watcher does not tell which items changed; any qualifying record turns
/// into one `ContentChanged` and the reaction re-scans everything.
/// Attribute records are routed through the same signal as child-list records.
#[derive(Debug, Clone, Default)]
pub struct ChangeWatcher {
    signals: usize,
}

impl ChangeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain pending mutations and report whether any concerned the container's
    /// subtree. Records for detached nodes or nodes outside the container are
    /// dropped.
    ///
    /// Without a container the whole document is watched, the same scope
    /// `content_items` falls back to. A child-list record on an ancestor of the
    /// container counts, since that is how a container inserted late shows up.
    pub fn poll<D: Document>(&mut self, doc: &mut D) -> Option<ContentChanged> {
        let records = doc.take_mutations();
        if records.is_empty() {
            return None;
        }
        let container = doc.content_container();
        let concerns_content = |record: &MutationRecord| match container {
            // any attached node
            None => doc.is_within(record.target, record.target),
            Some(container) => {
                doc.is_within(record.target, container)
                    || (record.kind == MutationKind::ChildList
                        && doc.is_within(container, record.target))
            }
        };

        let mut change = ContentChanged::default();
        for record in records.iter().filter(|r| concerns_content(*r)) {
            match record.kind {
                MutationKind::ChildList => change.child_list += 1,
                MutationKind::Attributes => change.attributes += 1,
            }
        }

        if change == ContentChanged::default() {
            trace!("Ignored {} mutations outside the container", records.len());
            return None;
        }
        self.signals += 1;
        trace!("Content changed: {:?}", change);
        Some(change)
    }

    /// Number of signals emitted so far
    pub fn signals(&self) -> usize {
        self.signals
    }
}
