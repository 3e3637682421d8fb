//! DOM Tree (arena-based allocation)
//!
//! Detaching a subtree unlinks it from its parent but never frees arena
//! slots, so a detached subtree stays readable by id. Observers rely on
//! this to describe nodes that were added and removed within one tick.

use crate::{Node, NodeData, NodeId};

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node not found")]
    NotFound,
    #[error("hierarchy request error")]
    HierarchyRequest,
    #[error("node is not a child of the given parent")]
    NotAChild,
    #[error("invalid node type for this operation")]
    InvalidNodeType,
}

/// Arena-based DOM tree
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new empty DOM tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocate a new detached node
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get_mut(id.index())
    }

    /// Number of allocated nodes (including detached ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child as the last child of parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (append if None)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<()> {
        self.get(parent).ok_or(DomError::NotFound)?;
        self.get(child).ok_or(DomError::NotFound)?;
        if child == parent || self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(r) = reference {
            let r_node = self.get(r).ok_or(DomError::NotFound)?;
            if r_node.parent != parent {
                return Err(DomError::NotAChild);
            }
            // Inserting a node before itself keeps its position.
            if r == child {
                return Ok(());
            }
        }

        // An attached child moves: unlink from its current parent first.
        if self.nodes[child.index()].parent.is_valid() {
            self.detach(child)?;
        }

        let (prev, next) = match reference {
            Some(r) => (self.nodes[r.index()].prev_sibling, r),
            None => (self.nodes[parent.index()].last_child, NodeId::NONE),
        };

        {
            let c = &mut self.nodes[child.index()];
            c.parent = parent;
            c.prev_sibling = prev;
            c.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
        Ok(())
    }

    /// Unlink a node from its parent (subtree stays allocated)
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        self.get(node).ok_or(DomError::NotFound)?;
        let (parent, prev, next) = {
            let n = &self.nodes[node.index()];
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        if !parent.is_valid() {
            return Ok(());
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let n = &mut self.nodes[node.index()];
        n.parent = NodeId::NONE;
        n.prev_sibling = NodeId::NONE;
        n.next_sibling = NodeId::NONE;
        Ok(())
    }

    /// Replace the content of a text node
    pub fn set_text(&mut self, node: NodeId, value: &str) -> DomResult<()> {
        let n = self.get_mut(node).ok_or(DomError::NotFound)?;
        match &mut n.data {
            NodeData::Text(t) => {
                *t = value.to_string();
                Ok(())
            }
            _ => Err(DomError::InvalidNodeType),
        }
    }

    /// Set an attribute on an element node
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let n = self.get_mut(node).ok_or(DomError::NotFound)?;
        n.as_element_mut()
            .ok_or(DomError::InvalidNodeType)?
            .set_attr(name, value);
        Ok(())
    }

    /// Remove an attribute from an element node
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let n = self.get_mut(node).ok_or(DomError::NotFound)?;
        Ok(n.as_element_mut()
            .ok_or(DomError::InvalidNodeType)?
            .remove_attr(name))
    }

    /// Iterate over the child ids of a node
    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildIter { tree: self, cursor: first }
    }

    /// Position of a node among its siblings
    pub fn child_index(&self, node: NodeId) -> Option<u32> {
        let n = self.get(node)?;
        if !n.parent.is_valid() {
            return None;
        }
        let mut index = 0;
        let mut cursor = self.nodes[n.parent.index()].first_child;
        while cursor.is_valid() {
            if cursor == node {
                return Some(index);
            }
            index += 1;
            cursor = self.nodes[cursor.index()].next_sibling;
        }
        None
    }

    /// Check whether `ancestor` is an ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = match self.get(node) {
            Some(n) => n.parent,
            None => return false,
        };
        while cursor.is_valid() {
            if cursor == ancestor {
                return true;
            }
            cursor = self.nodes[cursor.index()].parent;
        }
        false
    }

    /// Check whether `node` is `root` or attached under it
    pub fn is_connected(&self, root: NodeId, node: NodeId) -> bool {
        node == root || self.is_ancestor(root, node)
    }
}

struct ChildIter<'a> {
    tree: &'a DomTree,
    cursor: NodeId,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if !self.cursor.is_valid() {
            return None;
        }
        let current = self.cursor;
        self.cursor = self.tree.nodes[current.index()].next_sibling;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ElementData;

    fn elem(tree: &mut DomTree, tag: &str) -> NodeId {
        tree.create(NodeData::Element(ElementData::new(tag)))
    }

    #[test]
    fn test_append_and_children() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let a = elem(&mut tree, "a");
        let b = elem(&mut tree, "b");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();

        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![a, b]);
        assert_eq!(tree.child_index(a), Some(0));
        assert_eq!(tree.child_index(b), Some(1));
    }

    #[test]
    fn test_insert_before() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let a = elem(&mut tree, "a");
        let b = elem(&mut tree, "b");
        let c = elem(&mut tree, "c");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, c).unwrap();
        tree.insert_before(root, b, Some(c)).unwrap();

        let kids: Vec<_> = tree.children(root).collect();
        assert_eq!(kids, vec![a, b, c]);
    }

    #[test]
    fn test_detach_keeps_subtree_readable() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let div = elem(&mut tree, "div");
        let text = tree.create(NodeData::Text("hello".to_string()));
        tree.append_child(root, div).unwrap();
        tree.append_child(div, text).unwrap();

        tree.detach(div).unwrap();
        assert!(!tree.is_connected(root, div));
        assert_eq!(tree.children(div).count(), 1);
        assert_eq!(tree.get(text).unwrap().as_text(), Some("hello"));
    }

    #[test]
    fn test_move_relinks() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let a = elem(&mut tree, "a");
        let b = elem(&mut tree, "b");
        let x = elem(&mut tree, "x");
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();
        tree.append_child(a, x).unwrap();

        tree.append_child(b, x).unwrap();
        assert_eq!(tree.children(a).count(), 0);
        assert_eq!(tree.children(b).collect::<Vec<_>>(), vec![x]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let a = elem(&mut tree, "a");
        let b = elem(&mut tree, "b");
        tree.append_child(root, a).unwrap();
        tree.append_child(a, b).unwrap();

        assert_eq!(tree.append_child(b, a), Err(DomError::HierarchyRequest));
        assert_eq!(tree.append_child(a, a), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_insert_before_wrong_reference() {
        let mut tree = DomTree::new();
        let root = tree.create(NodeData::Document);
        let a = elem(&mut tree, "a");
        let stranger = elem(&mut tree, "s");
        assert_eq!(
            tree.insert_before(root, a, Some(stranger)),
            Err(DomError::NotAChild)
        );
    }
}
