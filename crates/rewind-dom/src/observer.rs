//! Change notification surface
//!
//! Documents append typed change records to a pending ledger as they are
//! mutated; the page delivers the ledger to subscribers in one batch at
//! each tick boundary. All records reference live arena ids and carry the
//! positional context captured at mutation time.

use crate::{ContextId, NodeId, Page};

/// A structural, textual or attribute change in one document
#[derive(Debug, Clone)]
pub enum Change {
    /// A node (with its subtree) became connected under `parent`
    ChildInserted {
        parent: NodeId,
        node: NodeId,
        index: u32,
    },
    /// A connected node was detached
    ChildRemoved { parent: NodeId, node: NodeId },
    /// A connected text node changed content
    CharacterData { node: NodeId, new_value: String },
    /// A connected element changed an attribute (None = removed)
    Attribute {
        node: NodeId,
        name: String,
        new_value: Option<String>,
    },
}

/// Raw style-rule container operation
#[derive(Debug, Clone)]
pub struct RuleOp {
    /// Element owning the mutated sheet
    pub owner: NodeId,
    pub kind: RuleOpKind,
    /// Index path of the containing rule group (empty = top level)
    pub path: Vec<u32>,
    /// Position inside the container
    pub index: u32,
    /// Rule text for insertions
    pub text: Option<String>,
    /// Whether the inserted rule is a group container
    pub is_group: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOpKind {
    Insert,
    Delete,
}

/// Subscriber handle returned by [`Page::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberId(pub(crate) u32);

/// Batched page observation callbacks, delivered at tick boundaries.
///
/// Per tick and subscriber the order is: mutation batches per context,
/// style-op batches per context, viewport resize, frame attachments, then
/// `tick_complete` as the flush boundary.
pub trait PageObserver {
    fn mutations(&mut self, _page: &Page, _ctx: ContextId, _changes: &[Change]) {}

    fn style_ops(&mut self, _page: &Page, _ctx: ContextId, _ops: &[RuleOp]) {}

    fn viewport_resized(&mut self, _page: &Page, _width: u32, _height: u32) {}

    /// A nested browsing context's content document became available
    fn frame_attached(
        &mut self,
        _page: &Page,
        _host_ctx: ContextId,
        _host_node: NodeId,
        _content: ContextId,
    ) {
    }

    /// End of the tick: everything delivered above belongs to one batch
    fn tick_complete(&mut self, _page: &Page) {}
}
