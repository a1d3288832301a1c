// src/application/services/tag_blocker.rs
use tracing::{debug, info, instrument, warn};

use crate::application::services::blocked_set_store::BlockedSetStore;
use crate::application::services::change_watcher::ChangeWatcher;
use crate::application::services::control_injector::ControlInjector;
use crate::application::services::visibility_filter::{FilterReport, VisibilityFilter};
use crate::config::Settings;
use crate::domain::command::Command;
use crate::domain::document::{ControlBinding, Document, NodeId};
use crate::domain::error::DomainResult;
use crate::domain::tag::{BlockedTag, TagTextExtractor};

/// What happened when a control was activated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// Command derived from the control, if any
    pub command: Option<Command>,
    /// The host's default action (following the tag link) must not run
    pub default_prevented: bool,
    /// The event must not bubble to the host's own handlers
    pub propagation_stopped: bool,
    /// The blocked set changed
    pub changed: bool,
}

/// Result of a full synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub filter: FilterReport,
    pub panel_rendered: bool,
}

/// Keeps a document consistent with the blocked set.
///
/// Owns the document and the store for the lifetime of a page. All entry
/// points take `&mut self` and finish with the document settled: every item's
/// visibility matches the current set and no watcher signal is pending.
#[derive(Debug)]
pub struct TagBlocker<D: Document> {
    document: D,
    store: BlockedSetStore,
    injector: ControlInjector,
    filter: VisibilityFilter,
    watcher: ChangeWatcher,
    max_settle_passes: usize,
}

impl<D: Document> TagBlocker<D> {
    pub fn new(document: D, store: BlockedSetStore, settings: &Settings) -> DomainResult<Self> {
        debug!("Creating new TagBlocker");
        Ok(Self {
            document,
            store,
            injector: ControlInjector::new(&settings.labels, &settings.layout),
            filter: VisibilityFilter::new(TagTextExtractor::new(&settings.labels.block)?),
            watcher: ChangeWatcher::new(),
            max_settle_passes: settings.max_settle_passes.max(1),
        })
    }

    /// Page-load entry point: place the panel, filter everything, settle
    #[instrument(skip(self), level = "debug")]
    pub fn initialize(&mut self) -> DomainResult<SyncReport> {
        let report = self.synchronize()?;
        self.settle()?;
        info!(
            "Initialized: {} of {} items hidden",
            report.filter.blocked, report.filter.scanned
        );
        Ok(report)
    }

    /// Full re-synchronization: rebuild the summary panel, then run a filter pass
    #[instrument(skip(self), level = "debug")]
    pub fn synchronize(&mut self) -> DomainResult<SyncReport> {
        let panel_rendered = self.injector.render_panel(&mut self.document, &self.store)?;
        let filter = self
            .filter
            .apply(&mut self.document, &self.store, &self.injector)?;
        Ok(SyncReport {
            filter,
            panel_rendered,
        })
    }

    /// Apply a command to the store; on change re-synchronize before returning.
    /// Returns whether the blocked set changed.
    #[instrument(skip(self), level = "debug", fields(command = %command))]
    pub fn dispatch(&mut self, command: Command) -> DomainResult<bool> {
        let changed = self.store.execute(&command)?;

        if changed {
            self.synchronize()?;
            self.settle()?;
        }
        Ok(changed)
    }

    /// Activate the control at `control`, as a click on it would.
    ///
    /// Block controls sit inside tag links, so their activation always
    /// suppresses the link's navigation and event bubbling, even when the tag
    /// text turns out to be unusable.
    #[instrument(skip(self), level = "debug")]
    pub fn activate(&mut self, control: NodeId) -> DomainResult<Activation> {
        let Some(binding) = self.document.control_binding(control) else {
            debug!("Node {} is not a control", control);
            return Ok(Activation::default());
        };

        let mut activation = Activation::default();
        let command = match binding {
            ControlBinding::Block => {
                activation.default_prevented = true;
                activation.propagation_stopped = true;
                self.block_command(control)?
            }
            ControlBinding::Unblock(tag) => Some(Command::Unblock(tag)),
        };

        if let Some(command) = command {
            activation.changed = self.dispatch(command.clone())?;
            activation.command = Some(command);
        }
        Ok(activation)
    }

    /// React to host-side changes: run filter passes until the watcher is quiet.
    /// Returns the number of passes run.
    pub fn on_content_changed(&mut self) -> DomainResult<usize> {
        self.settle()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Host-side access; call `on_content_changed` after mutating
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn store(&self) -> &BlockedSetStore {
        &self.store
    }

    /// Tear down, handing back the document and the store
    pub fn into_parts(self) -> (D, BlockedSetStore) {
        (self.document, self.store)
    }

    fn block_command(&self, control: NodeId) -> DomainResult<Option<Command>> {
        let Some(host) = self.document.control_host(control) else {
            debug!("Block control {} has no tag element", control);
            return Ok(None);
        };
        let text = self
            .filter
            .extractor()
            .extract(&self.document.inner_text(host)?);
        Ok(BlockedTag::new(&text).ok().map(Command::Block))
    }

    /// Drain watcher signals, running one filter pass per signal.
    ///
    /// Our own passes produce mutations too; they stop once a pass finds
    /// nothing to inject or toggle, usually on the second round. Every drained
    /// signal gets its pass, so visibility is current even when the cap is hit;
    /// records left by the last capped pass wait for the next call.
    fn settle(&mut self) -> DomainResult<usize> {
        let mut passes = 0;
        while let Some(change) = self.watcher.poll(&mut self.document) {
            passes += 1;
            debug!("Re-filtering after {:?}", change);
            self.react()?;
            if passes >= self.max_settle_passes {
                warn!(
                    "Document still changing after {} passes, giving up this round",
                    passes
                );
                break;
            }
        }
        Ok(passes)
    }

    /// Reaction to a change signal: filter pass, plus panel placement while the
    /// panel is still missing
    fn react(&mut self) -> DomainResult<FilterReport> {
        if self.document.summary_list().is_none() {
            self.injector.render_panel(&mut self.document, &self.store)?;
        }
        self.filter
            .apply(&mut self.document, &self.store, &self.injector)
    }
}
