// src/application/services/control_injector.rs
use tracing::{debug, instrument, trace};

use crate::application::services::blocked_set_store::BlockedSetStore;
use crate::config::{Labels, PageLayout};
use crate::domain::document::{ControlSpec, Document, NodeId};
use crate::domain::error::DomainResult;

/// Places the block and unblock affordances into the document.
///
/// Injection is strictly conditional: a control is only created where none
/// exists, so repeated passes converge and never feed the change watcher with
/// fresh mutations.
#[derive(Debug, Clone)]
pub struct ControlInjector {
    block_label: String,
    unblock_label: String,
    panel_title: String,
    anchor_heading: String,
}

impl ControlInjector {
    pub fn new(labels: &Labels, layout: &PageLayout) -> Self {
        Self {
            block_label: labels.block.clone(),
            unblock_label: labels.unblock.clone(),
            panel_title: labels.panel_title.clone(),
            anchor_heading: layout.anchor_heading.clone(),
        }
    }

    pub fn block_label(&self) -> &str {
        &self.block_label
    }

    /// Give `tag_element` a block control unless it already has one.
    /// Returns whether a control was injected.
    pub fn ensure_block_control<D: Document>(
        &self,
        doc: &mut D,
        tag_element: NodeId,
    ) -> DomainResult<bool> {
        if doc.control_of(tag_element)?.is_some() {
            return Ok(false);
        }
        doc.append_control(tag_element, &ControlSpec::block(&self.block_label))?;
        trace!("Injected block control into {}", tag_element);
        Ok(true)
    }

    /// Locate the summary list, creating the panel in front of the anchor
    /// heading if needed. `None` while the anchor is not on the page.
    #[instrument(skip(self, doc), level = "debug")]
    pub fn ensure_panel<D: Document>(&self, doc: &mut D) -> DomainResult<Option<NodeId>> {
        if let Some(list) = doc.summary_list() {
            return Ok(Some(list));
        }

        let Some(anchor) = doc.find_heading(&self.anchor_heading) else {
            debug!(
                "Anchor heading '{}' not found, summary panel deferred",
                self.anchor_heading
            );
            return Ok(None);
        };

        let list = doc.insert_summary_panel(anchor, &self.panel_title)?;
        debug!("Summary panel created before '{}'", self.anchor_heading);
        Ok(Some(list))
    }

    /// Replace all summary rows with one row per blocked tag.
    /// Returns false when the panel could not be placed.
    #[instrument(skip(self, doc, store), level = "debug", fields(tags = store.len()))]
    pub fn render_panel<D: Document>(
        &self,
        doc: &mut D,
        store: &BlockedSetStore,
    ) -> DomainResult<bool> {
        let Some(list) = self.ensure_panel(doc)? else {
            return Ok(false);
        };

        doc.clear_children(list)?;
        for tag in store.all() {
            let control = ControlSpec::unblock(&self.unblock_label, tag.clone());
            doc.append_summary_entry(list, &tag, &control)?;
        }
        Ok(true)
    }
}
