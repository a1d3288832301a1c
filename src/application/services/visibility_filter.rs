// src/application/services/visibility_filter.rs
use tracing::{debug, instrument, trace};

use crate::application::services::blocked_set_store::BlockedSetStore;
use crate::application::services::control_injector::ControlInjector;
use crate::domain::document::{Document, NodeId, Visibility};
use crate::domain::error::DomainResult;
use crate::domain::tag::TagTextExtractor;

/// Outcome of one filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Content items looked at
    pub scanned: usize,
    /// Items switched from shown to hidden
    pub hidden: usize,
    /// Items switched from hidden to shown
    pub shown: usize,
    /// Block controls created
    pub controls_injected: usize,
    /// Items hidden after the pass, changed or not
    pub blocked: usize,
}

impl FilterReport {
    /// Whether the pass wrote anything to the document
    pub fn changed(&self) -> bool {
        self.hidden > 0 || self.shown > 0 || self.controls_injected > 0
    }
}

/// Recomputes the visibility of every content item from the blocked set
#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    extractor: TagTextExtractor,
}

impl VisibilityFilter {
    pub fn new(extractor: TagTextExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &TagTextExtractor {
        &self.extractor
    }

    /// One full pass over all items currently in the document.
    ///
    /// Visibility is written only where it differs from the target, so a
    /// second pass without intervening changes writes nothing.
    #[instrument(skip_all, level = "debug", fields(blocked_tags = store.len()))]
    pub fn apply<D: Document>(
        &self,
        doc: &mut D,
        store: &BlockedSetStore,
        injector: &ControlInjector,
    ) -> DomainResult<FilterReport> {
        let mut report = FilterReport::default();

        for item in doc.content_items() {
            report.scanned += 1;
            let (tags, injected) = self.item_tags(doc, item, injector)?;
            report.controls_injected += injected;

            let target = if tags.iter().any(|t| store.contains_value(t)) {
                Visibility::Hidden
            } else {
                Visibility::Shown
            };
            if target == Visibility::Hidden {
                report.blocked += 1;
            }

            if doc.visibility(item)? != target {
                doc.set_visibility(item, target)?;
                match target {
                    Visibility::Hidden => {
                        debug!("Article blocked with tags: {}", tags.join(", "));
                        report.hidden += 1;
                    }
                    Visibility::Shown => {
                        debug!("Article unblocked with tags: {}", tags.join(", "));
                        report.shown += 1;
                    }
                }
            }
        }

        trace!("Filter pass: {:?}", report);
        Ok(report)
    }

    /// Normalized tags of one item, making sure each tag carries a control.
    /// Empty tag texts are dropped; they never match.
    fn item_tags<D: Document>(
        &self,
        doc: &mut D,
        item: NodeId,
        injector: &ControlInjector,
    ) -> DomainResult<(Vec<String>, usize)> {
        let mut tags = Vec::new();
        let mut injected = 0;
        for tag_element in doc.tag_elements(item)? {
            if injector.ensure_block_control(doc, tag_element)? {
                injected += 1;
            }
            let text = self.extractor.extract(&doc.inner_text(tag_element)?);
            if !text.is_empty() {
                tags.push(text);
            }
        }
        Ok((tags, injected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Labels, PageLayout};
    use crate::domain::tag::BlockedTag;
    use crate::infrastructure::dom::HtmlDocument;
    use crate::util::testing::{feed_document, memory_storage};
    use rstest::*;

    struct Fixture {
        doc: HtmlDocument,
        store: BlockedSetStore,
        filter: VisibilityFilter,
        injector: ControlInjector,
    }

    impl Fixture {
        fn run(&mut self) -> FilterReport {
            self.filter
                .apply(&mut self.doc, &self.store, &self.injector)
                .unwrap()
        }

        fn visibility(&self, index: usize) -> Visibility {
            let item = self.doc.content_items()[index];
            self.doc.visibility(item).unwrap()
        }

        fn block(&mut self, tag: &str) {
            self.store.add(&BlockedTag::new(tag).unwrap()).unwrap();
        }
    }

    #[fixture]
    fn fx() -> Fixture {
        Fixture {
            doc: feed_document(),
            store: BlockedSetStore::load(memory_storage(), "blockedTags"),
            filter: VisibilityFilter::new(TagTextExtractor::new("Block").unwrap()),
            injector: ControlInjector::new(&Labels::default(), &PageLayout::default()),
        }
    }

    #[rstest]
    fn given_empty_set_when_apply_then_all_shown_and_controls_injected(mut fx: Fixture) {
        let report = fx.run();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.controls_injected, 3);
        assert_eq!(report.hidden, 0);
        assert_eq!(report.blocked, 0);
        for i in 0..3 {
            assert_eq!(fx.visibility(i), Visibility::Shown);
        }
    }

    #[rstest]
    fn given_one_of_items_tags_blocked_when_apply_then_item_hidden(mut fx: Fixture) {
        fx.block("politics");
        let report = fx.run();

        assert_eq!(report.hidden, 1);
        assert_eq!(fx.visibility(0), Visibility::Hidden);
        assert_eq!(fx.visibility(1), Visibility::Shown);
        assert_eq!(fx.visibility(2), Visibility::Shown);
    }

    #[rstest]
    fn given_hidden_item_when_tag_unblocked_then_shown_again(mut fx: Fixture) {
        fx.block("politics");
        fx.run();

        fx.store.remove(&BlockedTag::new("politics").unwrap()).unwrap();
        let report = fx.run();

        assert_eq!(report.shown, 1);
        assert_eq!(fx.visibility(0), Visibility::Shown);
    }

    #[rstest]
    fn given_completed_pass_when_apply_again_then_no_mutation(mut fx: Fixture) {
        fx.block("cats");
        assert!(fx.run().changed());
        fx.doc.take_mutations();

        let report = fx.run();
        assert!(!report.changed());
        assert_eq!(report.blocked, 1);
        assert!(fx.doc.take_mutations().is_empty());
    }

    #[rstest]
    fn given_item_without_tags_when_everything_blocked_then_still_shown(mut fx: Fixture) {
        for t in ["funny", "politics", "cats", "no tags here"] {
            fx.block(t);
        }
        fx.run();
        assert_eq!(fx.visibility(2), Visibility::Shown);
    }

    #[rstest]
    fn given_item_hidden_by_host_when_not_blocked_then_shown(mut fx: Fixture) {
        let item = fx.doc.content_items()[1];
        fx.doc.set_visibility(item, Visibility::Hidden).unwrap();

        let report = fx.run();
        assert_eq!(report.shown, 1);
        assert_eq!(fx.visibility(1), Visibility::Shown);
    }

    #[test]
    fn given_constructed_item_list_when_apply_then_works_without_watcher() {
        let mut doc = HtmlDocument::parse(
            concat!(
                "<html><body>",
                "<article><div class=\"post-tags\"><a>Funny</a><a>Politics</a></div></article>",
                "<article><div class=\"post-tags\"><a> </a></div></article>",
                "</body></html>"
            ),
            PageLayout::default(),
        );
        let mut store = BlockedSetStore::load(memory_storage(), "blockedTags");
        store.add(&BlockedTag::new("funny").unwrap()).unwrap();
        let filter = VisibilityFilter::new(TagTextExtractor::new("Block").unwrap());
        let injector = ControlInjector::new(&Labels::default(), &PageLayout::default());

        let report = filter.apply(&mut doc, &store, &injector).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.hidden, 1);
        assert_eq!(report.controls_injected, 3);
    }
}
