//! Node registry - the mirror between live nodes and stable ids
//!
//! Ids come from a per-session monotonic counter and are never reused
//! while the session lives; `reset` discards the table but not the
//! counter. An id stays resolvable after its node is structurally
//! removed, so removal records emitted later in the stream keep meaning
//! until the next full snapshot rebuilds the table.

use std::collections::HashMap;

use rewind_dom::{ContextId, NodeId};
use serde::Serialize;

/// Stable identifier assigned to a live node for the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MirrorId(pub u64);

impl MirrorId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Bidirectional node ↔ id table
#[derive(Debug, Default)]
pub struct NodeRegistry {
    next: u64,
    by_node: HashMap<(ContextId, NodeId), MirrorId>,
    by_id: HashMap<MirrorId, (ContextId, NodeId)>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an id to a live node; idempotent for already-known nodes
    pub fn assign(&mut self, ctx: ContextId, node: NodeId) -> MirrorId {
        if let Some(&id) = self.by_node.get(&(ctx, node)) {
            return id;
        }
        let id = MirrorId(self.next);
        self.next += 1;
        self.by_node.insert((ctx, node), id);
        self.by_id.insert(id, (ctx, node));
        id
    }

    /// Id of a live node, if it has one
    pub fn lookup(&self, ctx: ContextId, node: NodeId) -> Option<MirrorId> {
        self.by_node.get(&(ctx, node)).copied()
    }

    /// Live node behind an id, if the table still holds it
    pub fn resolve(&self, id: MirrorId) -> Option<(ContextId, NodeId)> {
        self.by_id.get(&id).copied()
    }

    /// Discard the whole table; the id counter keeps running
    pub fn reset(&mut self) {
        self.by_node.clear();
        self.by_id.clear();
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The id the next assignment will take (used to detect ids that
    /// were introduced within the current batch)
    pub fn next_id(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(raw: u32) -> NodeId {
        // Test-only: fabricate arena ids without building a tree.
        let mut tree = rewind_dom::DomTree::new();
        let mut id = tree.create(rewind_dom::NodeData::Document);
        for _ in 0..raw {
            id = tree.create(rewind_dom::NodeData::Document);
        }
        id
    }

    #[test]
    fn test_assign_is_idempotent() {
        let mut reg = NodeRegistry::new();
        let n = node(3);
        let a = reg.assign(ContextId::ROOT, n);
        let b = reg.assign(ContextId::ROOT, n);
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_distinct_nodes_distinct_ids() {
        let mut reg = NodeRegistry::new();
        let a = reg.assign(ContextId::ROOT, node(0));
        let b = reg.assign(ContextId::ROOT, node(1));
        assert_ne!(a, b);
        assert_eq!(reg.resolve(a).map(|(c, _)| c), Some(ContextId::ROOT));
    }

    #[test]
    fn test_reset_keeps_counter_running() {
        let mut reg = NodeRegistry::new();
        let n = node(0);
        let before = reg.assign(ContextId::ROOT, n);
        reg.reset();
        assert!(reg.is_empty());
        assert_eq!(reg.resolve(before), None);

        let after = reg.assign(ContextId::ROOT, n);
        assert!(after.raw() > before.raw());
    }
}
