// src/domain/document.rs
use std::fmt;

use crate::domain::error::DomainResult;
use crate::domain::tag::BlockedTag;

/// Handle of a node inside a host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// What an injected control does when activated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlBinding {
    /// Block the tag of the hosting tag element, read at activation time
    Block,
    /// Unblock exactly this tag
    Unblock(BlockedTag),
}

/// Description of a control to inject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSpec {
    pub label: String,
    pub binding: ControlBinding,
}

impl ControlSpec {
    pub fn block<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            binding: ControlBinding::Block,
        }
    }

    pub fn unblock<S: Into<String>>(label: S, tag: BlockedTag) -> Self {
        Self {
            label: label.into(),
            binding: ControlBinding::Unblock(tag),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Node insertion or removal below the target
    ChildList,
    /// Attribute change on the target
    Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
}

/// The host page as seen by the blocking engine.
///
/// Implementations own the tree and its layout conventions (which nodes are
/// content items, which are tag elements, where the "recent items" heading
/// lives). Every change must be recorded and handed out by `take_mutations`,
/// including changes made through this trait.
pub trait Document {
    /// Container whose subtree holds the content items
    fn content_container(&self) -> Option<NodeId>;

    /// All content items currently attached, in document order
    fn content_items(&self) -> Vec<NodeId>;

    /// Tag elements of one content item, in document order
    fn tag_elements(&self, item: NodeId) -> DomainResult<Vec<NodeId>>;

    /// Rendered text of a node, including the text of injected controls
    fn inner_text(&self, node: NodeId) -> DomainResult<String>;

    /// The control already present inside a tag element, if any
    fn control_of(&self, tag_element: NodeId) -> DomainResult<Option<NodeId>>;

    /// Append a control as last child of `parent`
    fn append_control(&mut self, parent: NodeId, control: &ControlSpec) -> DomainResult<NodeId>;

    /// Binding of a control node; `None` for anything that is not a control
    fn control_binding(&self, node: NodeId) -> Option<ControlBinding>;

    /// Tag element hosting a block control
    fn control_host(&self, control: NodeId) -> Option<NodeId>;

    fn visibility(&self, item: NodeId) -> DomainResult<Visibility>;

    fn set_visibility(&mut self, item: NodeId, visibility: Visibility) -> DomainResult<()>;

    /// List element of the summary panel, if the panel exists
    fn summary_list(&self) -> Option<NodeId>;

    /// Heading whose text equals `text`, used as the panel anchor
    fn find_heading(&self, text: &str) -> Option<NodeId>;

    /// Insert the summary panel right before the section header owning `anchor`.
    /// Returns the list element of the new panel.
    fn insert_summary_panel(&mut self, anchor: NodeId, title: &str) -> DomainResult<NodeId>;

    /// Append one summary row (`tag` text followed by its control) to `list`
    fn append_summary_entry(
        &mut self,
        list: NodeId,
        tag: &BlockedTag,
        control: &ControlSpec,
    ) -> DomainResult<NodeId>;

    /// Detach all children of a node
    fn clear_children(&mut self, node: NodeId) -> DomainResult<()>;

    /// True when `node` is `ancestor` or lies in its attached subtree
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool;

    /// Drain the mutation records collected since the previous call
    fn take_mutations(&mut self) -> Vec<MutationRecord>;
}
