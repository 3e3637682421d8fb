//! Change observer adapter
//!
//! Converts one context's raw host changes into mirror-id addressed
//! mutation records. Added subtrees are serialized from the live arena at
//! delivery time, registering every new node before any later record can
//! reference it. A node whose id was introduced earlier in the same batch
//! (because it arrived inside another addition's subtree) is not reported
//! a second time.

use rewind_dom::{Change, ContextId, Page};

use crate::event::MutationEntry;
use crate::registry::NodeRegistry;
use crate::snapshot::{self, SheetOwner};

/// Per-context change converter
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChangeAdapter {
    ctx: ContextId,
}

impl ChangeAdapter {
    pub fn new(ctx: ContextId) -> Self {
        Self { ctx }
    }

    /// Convert a delivered batch into mutation records
    pub fn convert(
        &self,
        page: &Page,
        changes: &[Change],
        registry: &mut NodeRegistry,
        owners: &mut Vec<SheetOwner>,
    ) -> Vec<MutationEntry> {
        let batch_mark = registry.next_id();
        let mut entries = Vec::with_capacity(changes.len());

        for change in changes {
            match change {
                Change::ChildInserted { parent, node, index } => {
                    if let Some(known) = registry.lookup(self.ctx, *node)
                        && known.raw() >= batch_mark
                    {
                        // Already described inside an earlier addition's
                        // serialized subtree this batch.
                        continue;
                    }
                    let Some(parent_id) = registry.lookup(self.ctx, *parent) else {
                        tracing::warn!(ctx = ?self.ctx, "insertion under unknown parent dropped");
                        continue;
                    };
                    let Some(subtree) =
                        snapshot::serialize_subtree(page, self.ctx, *node, registry, owners)
                    else {
                        tracing::warn!(ctx = ?self.ctx, "added node failed to serialize");
                        continue;
                    };
                    entries.push(MutationEntry::Addition {
                        parent: parent_id,
                        index: *index,
                        node: subtree,
                    });
                }
                Change::ChildRemoved { node, .. } => {
                    let Some(id) = registry.lookup(self.ctx, *node) else {
                        tracing::warn!(ctx = ?self.ctx, "removal of unknown node dropped");
                        continue;
                    };
                    entries.push(MutationEntry::Removal { id });
                }
                Change::CharacterData { node, new_value } => {
                    let Some(id) = registry.lookup(self.ctx, *node) else {
                        tracing::warn!(ctx = ?self.ctx, "text change on unknown node dropped");
                        continue;
                    };
                    entries.push(MutationEntry::TextChange {
                        id,
                        value: new_value.clone(),
                    });
                }
                Change::Attribute {
                    node,
                    name,
                    new_value,
                } => {
                    let Some(id) = registry.lookup(self.ctx, *node) else {
                        tracing::warn!(ctx = ?self.ctx, "attribute change on unknown node dropped");
                        continue;
                    };
                    entries.push(MutationEntry::AttributeChange {
                        id,
                        name: name.clone(),
                        value: new_value.clone(),
                    });
                }
            }
        }
        entries
    }
}
