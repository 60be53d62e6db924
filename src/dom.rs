// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A simple arena-backed DOM.
//!
//! This is sufficient as a static parse tree, but don't build a
//! web browser using it. :)

use std::cell::{Ref, RefCell};

use tendril::StrTendril;

use crate::error::ParseError;
use crate::tokenizer::Attribute;
use crate::tree_builder::{NodeOrText, TreeSink};
use crate::LocalName;

/// Index of a node in its `Dom`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The different kinds of nodes in the DOM.
#[derive(Debug)]
pub enum NodeData {
    /// The `Document` itself.
    Document,

    /// A `DOCTYPE` with name, public id, and system id.
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
        force_quirks: bool,
    },

    /// A text node.
    Text { contents: StrTendril },

    /// A comment.
    Comment { contents: StrTendril },

    /// An element with attributes.
    Element {
        name: LocalName,
        attrs: Vec<Attribute>,
    },
}

/// A DOM node.
#[derive(Debug)]
pub struct Node {
    /// Parent node.
    pub parent: Option<NodeId>,
    /// Child nodes of this node.
    pub children: Vec<NodeId>,
    /// Represents this node's data.
    pub data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Node {
        Node {
            parent: None,
            children: vec![],
            data,
        }
    }
}

/// The DOM itself; the result of parsing.
pub struct Dom {
    nodes: RefCell<Vec<Node>>,

    /// Errors that occurred during parsing, in document order.
    pub errors: RefCell<Vec<ParseError>>,
}

impl Default for Dom {
    fn default() -> Dom {
        Dom {
            nodes: RefCell::new(vec![Node::new(NodeData::Document)]),
            errors: RefCell::new(vec![]),
        }
    }
}

impl Dom {
    /// The `Document` node.
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Ref<'_, Node> {
        Ref::map(self.nodes.borrow(), |nodes| &nodes[id.0])
    }

    fn new_node(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node::new(data));
        NodeId(nodes.len() - 1)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[id.0].parent
    }

    /// Append text to the text node at `target`, if it is one.
    fn append_to_existing_text(&self, target: NodeId, text: &str) -> bool {
        match self.nodes.borrow_mut()[target.0].data {
            NodeData::Text { ref mut contents } => {
                contents.push_slice(text);
                true
            },
            _ => false,
        }
    }

    fn insert_child(&self, parent: NodeId, index: usize, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        assert!(nodes[child.0].parent.is_none(), "node already has a parent");
        nodes[child.0].parent = Some(parent);
        nodes[parent.0].children.insert(index, child);
    }
}

impl TreeSink for Dom {
    type Handle = NodeId;
    type Output = Self;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&self, error: ParseError) {
        self.errors.borrow_mut().push(error);
    }

    fn get_document(&self) -> NodeId {
        self.document()
    }

    fn elem_name(&self, target: &NodeId) -> LocalName {
        match self.node(*target).data {
            NodeData::Element { ref name, .. } => name.clone(),
            _ => panic!("not an element!"),
        }
    }

    fn create_element(&self, name: LocalName, attrs: Vec<Attribute>) -> NodeId {
        self.new_node(NodeData::Element { name, attrs })
    }

    fn create_comment(&self, text: StrTendril) -> NodeId {
        self.new_node(NodeData::Comment { contents: text })
    }

    fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
        let index = self.node(*parent).children.len();
        let child = match child {
            NodeOrText::AppendText(text) => {
                // Append to an existing Text node if we have one.
                let last = self.node(*parent).children.last().copied();
                if let Some(last) = last {
                    if self.append_to_existing_text(last, &text) {
                        return;
                    }
                }
                self.new_node(NodeData::Text { contents: text })
            },
            NodeOrText::AppendNode(node) => node,
        };
        self.insert_child(*parent, index, child);
    }

    fn append_before_sibling(&self, sibling: &NodeId, child: NodeOrText<NodeId>) {
        let parent = self
            .parent_of(*sibling)
            .expect("sibling has no parent");
        let index = self
            .node(parent)
            .children
            .iter()
            .position(|c| c == sibling)
            .expect("sibling not found among its parent's children");

        let child = match child {
            NodeOrText::AppendText(text) => {
                // Merge with the previous sibling if it is a text node.
                if index > 0 {
                    let prev = self.node(parent).children[index - 1];
                    if self.append_to_existing_text(prev, &text) {
                        return;
                    }
                }
                self.new_node(NodeData::Text { contents: text })
            },
            NodeOrText::AppendNode(node) => {
                self.remove_from_parent(&node);
                node
            },
        };
        self.insert_child(parent, index, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &NodeId,
        prev_element: &NodeId,
        child: NodeOrText<NodeId>,
    ) {
        if self.parent_of(*element).is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
        force_quirks: bool,
    ) {
        let doctype = self.new_node(NodeData::Doctype {
            name,
            public_id,
            system_id,
            force_quirks,
        });
        let index = self.node(self.document()).children.len();
        self.insert_child(self.document(), index, doctype);
    }

    fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<Attribute>) {
        let mut nodes = self.nodes.borrow_mut();
        let existing = match nodes[target.0].data {
            NodeData::Element {
                attrs: ref mut existing,
                ..
            } => existing,
            _ => panic!("not an element"),
        };

        for attr in attrs {
            if !existing.iter().any(|e| e.name == attr.name) {
                existing.push(attr);
            }
        }
    }

    fn remove_from_parent(&self, target: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[target.0].parent.take() {
            nodes[parent.0].children.retain(|c| c != target);
        }
    }

    fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let children = std::mem::take(&mut nodes[node.0].children);
        for &child in &children {
            nodes[child.0].parent = Some(*new_parent);
        }
        nodes[new_parent.0].children.extend(children);
    }

    fn has_child_nodes(&self, target: &NodeId) -> bool {
        !self.node(*target).children.is_empty()
    }

    fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
        x == y
    }
}

#[cfg(test)]
mod tests {
    use super::{Dom, NodeData, NodeId};
    use crate::tokenizer::Attribute;
    use crate::tree_builder::{AppendNode, AppendText, TreeSink};

    fn text_of(dom: &Dom, id: NodeId) -> String {
        match dom.node(id).data {
            NodeData::Text { ref contents } => contents.to_string(),
            ref other => panic!("not text: {:?}", other),
        }
    }

    #[test]
    fn adjacent_text_merges() {
        let dom = Dom::default();
        let p = dom.create_element(local_name!("p"), vec![]);
        dom.append(&dom.document(), AppendNode(p));
        dom.append(&p, AppendText("foo".into()));
        dom.append(&p, AppendText("bar".into()));

        let children = dom.node(p).children.clone();
        assert_eq!(children.len(), 1);
        assert_eq!(text_of(&dom, children[0]), "foobar");
    }

    #[test]
    fn insert_before_sibling_merges_with_previous_text() {
        let dom = Dom::default();
        let body = dom.create_element(local_name!("body"), vec![]);
        let table = dom.create_element(local_name!("table"), vec![]);
        dom.append(&body, AppendText("a".into()));
        dom.append(&body, AppendNode(table));
        dom.append_before_sibling(&table, AppendText("b".into()));

        let children = dom.node(body).children.clone();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1], table);
        assert_eq!(text_of(&dom, children[0]), "ab");
    }

    #[test]
    fn parentless_element_falls_back_to_previous_element() {
        let dom = Dom::default();
        let table = dom.create_element(local_name!("table"), vec![]);
        let div = dom.create_element(local_name!("div"), vec![]);
        dom.append_based_on_parent_node(&table, &div, AppendText("x".into()));
        assert_eq!(dom.node(div).children.len(), 1);
        assert!(dom.node(table).children.is_empty());
    }

    #[test]
    fn reparent_moves_all_children() {
        let dom = Dom::default();
        let from = dom.create_element(local_name!("div"), vec![]);
        let to = dom.create_element(local_name!("b"), vec![]);
        let child = dom.create_comment("c".into());
        dom.append(&from, AppendNode(child));
        dom.append(&from, AppendText("t".into()));

        dom.reparent_children(&from, &to);
        assert!(dom.node(from).children.is_empty());
        assert_eq!(dom.node(to).children.len(), 2);
        assert_eq!(dom.node(child).parent, Some(to));

        dom.remove_from_parent(&child);
        assert_eq!(dom.node(to).children.len(), 1);
        assert_eq!(dom.node(child).parent, None);
    }

    #[test]
    fn missing_attrs_are_added() {
        let dom = Dom::default();
        let attr = |name: &str, value: &str| Attribute {
            name: name.into(),
            value: value.into(),
        };
        let body = dom.create_element(local_name!("body"), vec![attr("class", "a")]);
        dom.add_attrs_if_missing(&body, vec![attr("class", "b"), attr("id", "c")]);
        match dom.node(body).data {
            NodeData::Element { ref attrs, .. } => {
                assert_eq!(attrs.len(), 2);
                assert_eq!(&*attrs[0].value, "a");
                assert_eq!(&*attrs[1].value, "c");
            },
            _ => panic!("not an element"),
        };
    }
}
