//! Document - a live tree plus its pending change ledger
//!
//! Every mutating operation edits the arena and, when the affected node
//! is connected to the document root, appends a record to the pending
//! ledger. The ledger captures positional context at mutation time and is
//! drained by the page at tick boundaries. Mutations inside detached
//! subtrees are not recorded; attaching the subtree later records a
//! single insertion covering its final shape.

use crate::node::ElementData;
use crate::observer::{Change, RuleOp, RuleOpKind};
use crate::style::{CssRule, StyleError, StyleSheet};
use crate::{DomError, DomResult, DomTree, NodeData, NodeId};

/// One live document
#[derive(Debug)]
pub struct Document {
    tree: DomTree,
    root: NodeId,
    url: String,
    sheets: Vec<StyleSheet>,
    changes: Vec<Change>,
    rule_ops: Vec<RuleOp>,
    /// Whether the rule-mutation hook can address nested containers
    report_nested_rules: bool,
}

impl Document {
    pub(crate) fn new(url: &str, report_nested_rules: bool) -> Self {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        Self {
            tree,
            root,
            url: url.to_string(),
            sheets: Vec::new(),
            changes: Vec::new(),
            rule_ops: Vec::new(),
            report_nested_rules,
        }
    }

    /// Document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to the tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Check whether a node is attached under the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.tree.is_connected(self.root, node)
    }

    // ---- node creation (detached, unrecorded) ----

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.tree.create(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.create(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.tree.create(NodeData::Comment(text.to_string()))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.tree.create(NodeData::Doctype {
            name: name.to_string(),
        })
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.tree.create(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    // ---- structural mutation ----

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        let old_parent = self.tree.get(child).ok_or(DomError::NotFound)?.parent;
        let was_connected = old_parent.is_valid() && self.is_connected(child);

        self.tree.insert_before(parent, child, reference)?;

        if was_connected {
            self.changes.push(Change::ChildRemoved {
                parent: old_parent,
                node: child,
            });
        }
        if self.is_connected(parent) {
            let index = self.tree.child_index(child).unwrap_or(0);
            self.changes.push(Change::ChildInserted {
                parent,
                node: child,
                index,
            });
        }
        Ok(())
    }

    /// Detach a node from its parent
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        let parent = self.tree.get(node).ok_or(DomError::NotFound)?.parent;
        let was_connected = parent.is_valid() && self.is_connected(node);

        self.tree.detach(node)?;

        if was_connected {
            self.changes.push(Change::ChildRemoved { parent, node });
        }
        Ok(())
    }

    /// Replace the content of a text node
    pub fn set_text(&mut self, node: NodeId, value: &str) -> DomResult<()> {
        self.tree.set_text(node, value)?;
        if self.is_connected(node) {
            self.changes.push(Change::CharacterData {
                node,
                new_value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.tree.set_attribute(node, name, value)?;
        if self.is_connected(node) {
            self.changes.push(Change::Attribute {
                node,
                name: name.to_string(),
                new_value: Some(value.to_string()),
            });
        }
        Ok(())
    }

    /// Remove an attribute from an element
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        let removed = self.tree.remove_attribute(node, name)?;
        if removed && self.is_connected(node) {
            self.changes.push(Change::Attribute {
                node,
                name: name.to_string(),
                new_value: None,
            });
        }
        Ok(())
    }

    // ---- style object model ----

    /// Attach an empty stylesheet to an element
    pub fn add_stylesheet(&mut self, owner: NodeId) -> DomResult<()> {
        let node = self.tree.get(owner).ok_or(DomError::NotFound)?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType);
        }
        if self.sheets.iter().all(|s| s.owner() != owner) {
            self.sheets.push(StyleSheet::new(owner));
        }
        Ok(())
    }

    /// The stylesheet owned by an element, if any
    pub fn stylesheet(&self, owner: NodeId) -> Option<&StyleSheet> {
        self.sheets.iter().find(|s| s.owner() == owner)
    }

    /// Insert a plain rule
    pub fn insert_rule(
        &mut self,
        owner: NodeId,
        path: &[u32],
        index: u32,
        text: &str,
    ) -> Result<(), StyleError> {
        let rule = CssRule::Style {
            text: text.to_string(),
        };
        self.insert_rule_inner(owner, path, index, rule)
    }

    /// Insert an empty group rule
    pub fn insert_group_rule(
        &mut self,
        owner: NodeId,
        path: &[u32],
        index: u32,
        prelude: &str,
    ) -> Result<(), StyleError> {
        let rule = CssRule::Group {
            prelude: prelude.to_string(),
            rules: Vec::new(),
        };
        self.insert_rule_inner(owner, path, index, rule)
    }

    fn insert_rule_inner(
        &mut self,
        owner: NodeId,
        path: &[u32],
        index: u32,
        rule: CssRule,
    ) -> Result<(), StyleError> {
        let text = rule.text();
        let is_group = rule.is_group();
        let sheet = self
            .sheets
            .iter_mut()
            .find(|s| s.owner() == owner)
            .ok_or(StyleError::NoSheet)?;
        sheet.insert(path, index, rule)?;
        if self.report_nested_rules || path.is_empty() {
            self.rule_ops.push(RuleOp {
                owner,
                kind: RuleOpKind::Insert,
                path: path.to_vec(),
                index,
                text: Some(text),
                is_group,
            });
        }
        Ok(())
    }

    /// Delete a rule
    pub fn delete_rule(
        &mut self,
        owner: NodeId,
        path: &[u32],
        index: u32,
    ) -> Result<(), StyleError> {
        let sheet = self
            .sheets
            .iter_mut()
            .find(|s| s.owner() == owner)
            .ok_or(StyleError::NoSheet)?;
        sheet.delete(path, index)?;
        if self.report_nested_rules || path.is_empty() {
            self.rule_ops.push(RuleOp {
                owner,
                kind: RuleOpKind::Delete,
                path: path.to_vec(),
                index,
                text: None,
                is_group: false,
            });
        }
        Ok(())
    }

    // ---- pending ledger ----

    pub fn take_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn take_rule_ops(&mut self) -> Vec<RuleOp> {
        std::mem::take(&mut self.rule_ops)
    }

    pub(crate) fn discard_pending(&mut self) {
        self.changes.clear();
        self.rule_ops.clear();
    }
}
