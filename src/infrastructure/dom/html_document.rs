// src/infrastructure/dom/html_document.rs
use std::fmt::Write as _;

use select::predicate::Name;
use tracing::{debug, instrument, trace};

use crate::config::PageLayout;
use crate::domain::document::{
    ControlBinding, ControlSpec, Document, MutationKind, MutationRecord, NodeId, Visibility,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tag::BlockedTag;

const CONTROL_ATTR: &str = "data-tagblock";
const CONTROL_TAG_ATTR: &str = "data-tag";
const BLOCK_CONTROL_STYLE: &str = "margin-left: 5px";

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable HTML tree standing in for a live page.
///
/// Parsed with `select`, held as an arena of nodes. Detached nodes stay in the
/// arena but are unreachable from the root. Every structural or attribute
/// change is appended to the mutation log drained by `take_mutations`.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    layout: PageLayout,
    mutations: Vec<MutationRecord>,
}

impl HtmlDocument {
    /// Parse a full page
    #[instrument(skip(html, layout), level = "debug", fields(len = html.len()))]
    pub fn parse(html: &str, layout: PageLayout) -> Self {
        let mut doc = Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            layout,
            mutations: Vec::new(),
        };

        let parsed = select::document::Document::from(html);
        if let Some(html_node) = parsed.find(Name("html")).next() {
            let root = doc.root;
            doc.import(root, html_node);
        }
        debug!("Parsed document with {} nodes", doc.nodes.len());
        doc
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Append parsed `html` below `parent`, as the host page does when it
    /// lazily loads more content. Returns the top-level nodes inserted.
    #[instrument(skip(self, html), level = "debug")]
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> DomainResult<Vec<NodeId>> {
        self.element(parent)?;
        let parsed = select::document::Document::from(html);
        let Some(body) = parsed.find(Name("body")).next() else {
            return Ok(Vec::new());
        };

        let before = self.node(parent)?.children.len();
        for child in body.children() {
            self.import(parent, child);
        }
        let inserted = self.node(parent)?.children[before..].to_vec();
        if !inserted.is_empty() {
            self.record(MutationKind::ChildList, parent);
        }
        Ok(inserted)
    }

    /// Detach `node` from its parent
    pub fn remove(&mut self, node: NodeId) -> DomainResult<()> {
        let parent = self
            .node(node)?
            .parent
            .ok_or_else(|| DomainError::Document(format!("Node {} is not attached", node)))?;
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
        self.record(MutationKind::ChildList, parent);
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomainResult<()> {
        match &mut self.nodes.get_mut(node.0).ok_or(DomainError::NodeNotFound(node))?.kind {
            NodeKind::Element { attrs, .. } => {
                match attrs.iter_mut().find(|(k, _)| k == name) {
                    Some((_, v)) => *v = value.to_string(),
                    None => attrs.push((name.to_string(), value.to_string())),
                }
            }
            _ => {
                return Err(DomainError::Document(format!(
                    "Node {} is not an element",
                    node
                )))
            }
        }
        self.record(MutationKind::Attributes, node);
        Ok(())
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// First attached element with the given id attribute
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attribute(*n, "id") == Some(id))
    }

    /// Attached elements with the given tag name, in document order
    pub fn elements_named(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.is_named(*n, name))
            .collect()
    }

    /// Serialize the attached tree back to HTML
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        for child in &self.nodes[self.root.0].children {
            self.serialize(*child, &mut out);
        }
        out
    }

    /// Serialize one attached subtree
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if node.0 < self.nodes.len() {
            self.serialize(node, &mut out);
        }
        out
    }

    fn import(&mut self, parent: NodeId, node: select::node::Node) {
        let kind = if let Some(name) = node.name() {
            NodeKind::Element {
                name: name.to_lowercase(),
                attrs: node
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        } else if let Some(text) = node.as_text() {
            NodeKind::Text(text.to_string())
        } else if let Some(comment) = node.as_comment() {
            NodeKind::Comment(comment.to_string())
        } else {
            return;
        };

        let id = self.push_node(parent, kind);
        for child in node.children() {
            self.import(id, child);
        }
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn new_element(&mut self, parent: NodeId, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push_node(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attrs,
            },
        )
    }

    fn new_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_node(parent, NodeKind::Text(text.to_string()))
    }

    /// Build a control element below `parent` without recording anything
    fn build_control(&mut self, parent: NodeId, control: &ControlSpec) -> NodeId {
        let attrs = match &control.binding {
            ControlBinding::Block => vec![
                (CONTROL_ATTR.to_string(), "block".to_string()),
                ("style".to_string(), BLOCK_CONTROL_STYLE.to_string()),
            ],
            ControlBinding::Unblock(tag) => vec![
                (CONTROL_ATTR.to_string(), "unblock".to_string()),
                (CONTROL_TAG_ATTR.to_string(), tag.value().to_string()),
            ],
        };
        let button = self.new_element(parent, "button", attrs);
        self.new_text(button, &control.label);
        button
    }

    fn node(&self, node: NodeId) -> DomainResult<&NodeData> {
        self.nodes.get(node.0).ok_or(DomainError::NodeNotFound(node))
    }

    fn element(&self, node: NodeId) -> DomainResult<&NodeData> {
        let data = self.node(node)?;
        match data.kind {
            NodeKind::Element { .. } => Ok(data),
            _ => Err(DomainError::Document(format!(
                "Node {} is not an element",
                node
            ))),
        }
    }

    fn record(&mut self, kind: MutationKind, target: NodeId) {
        trace!("Mutation {:?} on {}", kind, target);
        self.mutations.push(MutationRecord { kind, target });
    }

    fn is_named(&self, node: NodeId, name: &str) -> bool {
        self.tag_name(node)
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn matches_selector(&self, node: NodeId, selector: &str) -> bool {
        if let Some(id) = selector.strip_prefix('#') {
            self.attribute(node, "id") == Some(id)
        } else if let Some(class) = selector.strip_prefix('.') {
            self.has_class(node, class)
        } else {
            self.is_named(node, selector)
        }
    }

    /// Attached descendants of `node` (excluding itself), in document order
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(data) = self.nodes.get(node.0) else {
            return out;
        };
        let mut stack: Vec<NodeId> = data.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(node.0).and_then(|n| n.parent), move |p| {
            self.nodes[p.0].parent
        })
    }

    fn is_attached(&self, node: NodeId) -> bool {
        node == self.root || self.ancestors(node).any(|a| a == self.root)
    }

    fn style_display(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "style").and_then(|style| {
            parse_style(style)
                .into_iter()
                .rev()
                .find(|(k, _)| k == "display")
                .map(|(_, v)| v)
        })
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Root => {}
            NodeKind::Text(text) => {
                let raw_parent = self.nodes[node.0]
                    .parent
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(|n| n == "script" || n == "style");
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{}-->", text);
            }
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    let _ = write!(out, " {}=\"{}\"", k, escape_attr(v));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                for child in &self.nodes[node.0].children {
                    self.serialize(*child, out);
                }
                let _ = write!(out, "</{}>", name);
            }
        }
    }
}

impl Document for HtmlDocument {
    fn content_container(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.matches_selector(*n, &self.layout.container))
    }

    fn content_items(&self) -> Vec<NodeId> {
        let scope = self.content_container().unwrap_or(self.root);
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.is_named(*n, &self.layout.item_element))
            .collect()
    }

    fn tag_elements(&self, item: NodeId) -> DomainResult<Vec<NodeId>> {
        self.element(item)?;
        let tags = self
            .descendants(item)
            .into_iter()
            .filter(|n| self.is_named(*n, &self.layout.tag_element))
            .filter(|n| {
                self.ancestors(*n)
                    .take_while(|a| *a != item)
                    .any(|a| self.has_class(a, &self.layout.tag_container_class))
            })
            .collect();
        Ok(tags)
    }

    fn inner_text(&self, node: NodeId) -> DomainResult<String> {
        let data = self.node(node)?;
        if let NodeKind::Text(text) = &data.kind {
            return Ok(text.clone());
        }
        let mut text = String::new();
        for n in self.descendants(node) {
            if let NodeKind::Text(t) = &self.nodes[n.0].kind {
                text.push_str(t);
            }
        }
        Ok(text)
    }

    fn control_of(&self, tag_element: NodeId) -> DomainResult<Option<NodeId>> {
        self.element(tag_element)?;
        Ok(self
            .descendants(tag_element)
            .into_iter()
            .find(|n| self.is_named(*n, "button")))
    }

    fn append_control(&mut self, parent: NodeId, control: &ControlSpec) -> DomainResult<NodeId> {
        self.element(parent)?;
        let button = self.build_control(parent, control);
        self.record(MutationKind::ChildList, parent);
        Ok(button)
    }

    fn control_binding(&self, node: NodeId) -> Option<ControlBinding> {
        match self.attribute(node, CONTROL_ATTR)? {
            "block" => Some(ControlBinding::Block),
            "unblock" => self
                .attribute(node, CONTROL_TAG_ATTR)
                .and_then(|t| BlockedTag::new(t).ok())
                .map(ControlBinding::Unblock),
            _ => None,
        }
    }

    fn control_host(&self, control: NodeId) -> Option<NodeId> {
        self.ancestors(control)
            .find(|a| self.is_named(*a, &self.layout.tag_element))
    }

    fn visibility(&self, item: NodeId) -> DomainResult<Visibility> {
        self.element(item)?;
        Ok(match self.style_display(item).as_deref() {
            Some("none") => Visibility::Hidden,
            _ => Visibility::Shown,
        })
    }

    fn set_visibility(&mut self, item: NodeId, visibility: Visibility) -> DomainResult<()> {
        self.element(item)?;
        let display = match visibility {
            Visibility::Hidden => "none",
            Visibility::Shown => "block",
        };
        let mut style = parse_style(self.attribute(item, "style").unwrap_or_default());
        style.retain(|(k, _)| k != "display");
        style.push(("display".to_string(), display.to_string()));
        let style = style
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attribute(item, "style", &style)
    }

    fn summary_list(&self) -> Option<NodeId> {
        self.element_by_id(&self.layout.panel_list_id)
    }

    fn find_heading(&self, text: &str) -> Option<NodeId> {
        self.descendants(self.root).into_iter().find(|n| {
            self.has_class(*n, &self.layout.heading_class)
                && self
                    .inner_text(*n)
                    .is_ok_and(|t| t.trim() == text)
        })
    }

    fn insert_summary_panel(&mut self, anchor: NodeId, title: &str) -> DomainResult<NodeId> {
        let header = self
            .node(anchor)?
            .parent
            .ok_or_else(|| DomainError::Document(format!("Anchor {} has no parent", anchor)))?;
        let container = self.nodes[header.0].parent.ok_or_else(|| {
            DomainError::Document(format!("Anchor header {} has no parent", header))
        })?;

        let section = self.new_element(container, "section", Vec::new());
        let section_header = self.new_element(section, "header", Vec::new());
        let heading = self.new_element(
            section_header,
            "div",
            vec![("class".to_string(), self.layout.heading_class.clone())],
        );
        self.new_text(heading, title);
        let list = self.new_element(
            section,
            "ul",
            vec![("id".to_string(), self.layout.panel_list_id.clone())],
        );

        // new_element appended the section; move it in front of the header
        let siblings = &mut self.nodes[container.0].children;
        siblings.pop();
        let position = siblings.iter().position(|c| *c == header).unwrap_or(siblings.len());
        siblings.insert(position, section);

        self.record(MutationKind::ChildList, container);
        Ok(list)
    }

    fn append_summary_entry(
        &mut self,
        list: NodeId,
        tag: &BlockedTag,
        control: &ControlSpec,
    ) -> DomainResult<NodeId> {
        self.element(list)?;
        let item = self.new_element(list, "li", Vec::new());
        self.new_text(item, &format!("{} ", tag.value()));
        self.build_control(item, control);
        self.record(MutationKind::ChildList, list);
        Ok(item)
    }

    fn clear_children(&mut self, node: NodeId) -> DomainResult<()> {
        let data = self
            .nodes
            .get_mut(node.0)
            .ok_or(DomainError::NodeNotFound(node))?;
        let children = std::mem::take(&mut data.children);
        if children.is_empty() {
            return Ok(());
        }
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.record(MutationKind::ChildList, node);
        Ok(())
    }

    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        if node.0 >= self.nodes.len() || !self.is_attached(node) {
            return false;
        }
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }
}

/// `"a: b; c: d"` into ordered pairs with lower-cased property names
fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::{feed_page, LAZY_ARTICLE};

    fn doc() -> HtmlDocument {
        HtmlDocument::parse(&feed_page(), PageLayout::default())
    }

    fn tag_texts(doc: &HtmlDocument, item: NodeId) -> Vec<String> {
        doc.tag_elements(item)
            .unwrap()
            .into_iter()
            .map(|t| doc.inner_text(t).unwrap().trim().to_string())
            .collect()
    }

    #[test]
    fn given_feed_page_when_parse_then_finds_items_and_their_tags() {
        let doc = doc();
        let items = doc.content_items();
        assert_eq!(items.len(), 3);
        assert_eq!(tag_texts(&doc, items[0]), vec!["Funny", "Politics"]);
        assert_eq!(tag_texts(&doc, items[1]), vec!["Cats"]);
        assert!(tag_texts(&doc, items[2]).is_empty());
    }

    #[test]
    fn given_links_outside_tag_container_when_tag_elements_then_ignored() {
        let doc = doc();
        let first = doc.content_items()[0];
        // the article title link is not a tag
        assert!(!tag_texts(&doc, first).iter().any(|t| t.contains("Title")));
    }

    #[test]
    fn given_tag_element_when_append_control_then_text_includes_label_and_mutation_recorded() {
        let mut doc = doc();
        let item = doc.content_items()[1];
        let tag = doc.tag_elements(item).unwrap()[0];
        assert_eq!(doc.control_of(tag).unwrap(), None);

        let control = doc.append_control(tag, &ControlSpec::block("Block")).unwrap();
        assert_eq!(doc.control_of(tag).unwrap(), Some(control));
        assert_eq!(doc.inner_text(tag).unwrap().trim(), "CatsBlock");
        assert_eq!(doc.control_binding(control), Some(ControlBinding::Block));
        assert_eq!(doc.control_host(control), Some(tag));
        assert_eq!(
            doc.take_mutations(),
            vec![MutationRecord {
                kind: MutationKind::ChildList,
                target: tag
            }]
        );
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn given_item_when_set_visibility_then_style_keeps_other_declarations() {
        let mut doc = doc();
        let item = doc.content_items()[0];
        doc.set_attribute(item, "style", "color: red").unwrap();
        assert_eq!(doc.visibility(item).unwrap(), Visibility::Shown);

        doc.set_visibility(item, Visibility::Hidden).unwrap();
        assert_eq!(doc.visibility(item).unwrap(), Visibility::Hidden);
        assert_eq!(doc.attribute(item, "style"), Some("color: red; display: none"));

        doc.set_visibility(item, Visibility::Shown).unwrap();
        assert_eq!(doc.attribute(item, "style"), Some("color: red; display: block"));
    }

    #[test]
    fn given_recents_heading_when_insert_panel_then_section_precedes_its_header() {
        let mut doc = doc();
        let anchor = doc.find_heading("Recents").unwrap();
        let header = doc.ancestors(anchor).next().unwrap();

        let list = doc.insert_summary_panel(anchor, "Blocked Tag").unwrap();
        assert_eq!(doc.summary_list(), Some(list));

        let sidebar = doc.ancestors(header).next().unwrap();
        let siblings = doc.children(sidebar).to_vec();
        let section = doc.ancestors(list).next().unwrap();
        let section_pos = siblings.iter().position(|c| *c == section).unwrap();
        assert_eq!(siblings[section_pos + 1], header);
        assert!(doc.find_heading("Blocked Tag").is_some());
    }

    #[test]
    fn given_page_without_anchor_when_find_heading_then_none() {
        let doc = HtmlDocument::parse(
            "<html><body><article></article></body></html>",
            PageLayout::default(),
        );
        assert!(doc.find_heading("Recents").is_none());
        assert!(doc.summary_list().is_none());
    }

    #[test]
    fn given_summary_entry_when_binding_read_then_carries_its_tag() {
        let mut doc = doc();
        let anchor = doc.find_heading("Recents").unwrap();
        let list = doc.insert_summary_panel(anchor, "Blocked Tag").unwrap();
        let tag = BlockedTag::new("politics").unwrap();

        let entry = doc
            .append_summary_entry(list, &tag, &ControlSpec::unblock("Unblock", tag.clone()))
            .unwrap();
        let button = doc.children(entry)[1];
        assert_eq!(doc.inner_text(entry).unwrap(), "politics Unblock");
        assert_eq!(doc.control_binding(button), Some(ControlBinding::Unblock(tag)));
        assert_eq!(doc.control_host(button), None);

        doc.clear_children(list).unwrap();
        assert!(doc.children(list).is_empty());
        assert!(!doc.is_within(button, list));
    }

    #[test]
    fn given_lazy_content_when_append_html_then_new_item_is_within_container() {
        let mut doc = doc();
        let feed = doc.element_by_id("list-view").unwrap();
        doc.take_mutations();

        let inserted = doc.append_html(feed, LAZY_ARTICLE).unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(doc.content_items().len(), 4);

        let container = doc.content_container().unwrap();
        let records = doc.take_mutations();
        assert_eq!(records.len(), 1);
        assert!(doc.is_within(records[0].target, container));
    }

    #[test]
    fn given_removed_item_when_is_within_then_false() {
        let mut doc = doc();
        let item = doc.content_items()[0];
        let container = doc.content_container().unwrap();
        assert!(doc.is_within(item, container));

        doc.remove(item).unwrap();
        assert!(!doc.is_within(item, container));
        assert_eq!(doc.content_items().len(), 2);
    }

    #[test]
    fn given_document_when_to_html_then_controls_survive_reparse() {
        let mut doc = doc();
        let item = doc.content_items()[1];
        let tag = doc.tag_elements(item).unwrap()[0];
        doc.append_control(tag, &ControlSpec::block("Block")).unwrap();
        let second = doc.content_items()[1];
        doc.set_visibility(second, Visibility::Hidden).unwrap();

        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html><html>"));
        assert!(html.contains("data-tagblock=\"block\""));

        let reparsed = HtmlDocument::parse(&html, PageLayout::default());
        let item = reparsed.content_items()[1];
        let tag = reparsed.tag_elements(item).unwrap()[0];
        assert!(reparsed.control_of(tag).unwrap().is_some());
        assert_eq!(reparsed.visibility(item).unwrap(), Visibility::Hidden);
    }

    #[test]
    fn given_special_characters_when_serialize_then_escaped() {
        let doc = HtmlDocument::parse(
            "<html><body><p title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3</p></body></html>",
            PageLayout::default(),
        );
        let p = doc.elements_named("p")[0];
        assert_eq!(
            doc.outer_html(p),
            "<p title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3</p>"
        );
    }
}
