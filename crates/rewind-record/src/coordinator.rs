//! Cross-document coordinator
//!
//! Tracks which browsing contexts feed the stream and in what flush
//! order (root first, then frames in activation order). A frame whose
//! content arrives before its host node has appeared in the stream is
//! gated: activation waits until a flush at which the host's mirror id
//! exists, so no nested-context event can ever precede the root event
//! that introduces its host.

use rewind_dom::{ContextId, NodeId, Page};

use crate::registry::{MirrorId, NodeRegistry};

#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingFrame {
    pub host_ctx: ContextId,
    pub host_node: NodeId,
    pub content: ContextId,
}

/// A frame activation whose host is known to the stream
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadyFrame {
    pub host_id: MirrorId,
    pub host_ctx: ContextId,
    pub host_node: NodeId,
    pub content: ContextId,
}

#[derive(Debug)]
pub(crate) struct Coordinator {
    contexts: Vec<ContextId>,
    pending: Vec<PendingFrame>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            contexts: vec![ContextId::ROOT],
            pending: Vec::new(),
        }
    }

    /// Tracked contexts in flush order
    pub fn contexts(&self) -> &[ContextId] {
        &self.contexts
    }

    pub fn is_tracked(&self, ctx: ContextId) -> bool {
        self.contexts.contains(&ctx)
    }

    fn track(&mut self, ctx: ContextId) {
        if !self.contexts.contains(&ctx) {
            self.contexts.push(ctx);
        }
    }

    /// Queue a newly announced frame for gated activation
    pub fn queue_frame(&mut self, host_ctx: ContextId, host_node: NodeId, content: ContextId) {
        if self.is_tracked(content) {
            return;
        }
        self.pending.push(PendingFrame {
            host_ctx,
            host_node,
            content,
        });
    }

    /// Drain activations whose host node has a mirror id; the rest stay
    /// gated for a later flush
    pub fn take_ready(&mut self, registry: &NodeRegistry) -> Vec<ReadyFrame> {
        let mut ready = Vec::new();
        self.pending.retain(|frame| {
            match registry.lookup(frame.host_ctx, frame.host_node) {
                Some(host_id) => {
                    ready.push(ReadyFrame {
                        host_id,
                        host_ctx: frame.host_ctx,
                        host_node: frame.host_node,
                        content: frame.content,
                    });
                    false
                }
                None => true,
            }
        });
        for frame in &ready {
            self.track(frame.content);
        }
        ready
    }

    /// Rebuild tracking after a full snapshot: every announced frame
    /// whose host was serialized (and therefore registered) is active;
    /// its content is already inlined in the snapshot, so activation
    /// emits nothing.
    pub fn sync_after_snapshot(&mut self, page: &Page, registry: &NodeRegistry) {
        self.contexts.clear();
        self.contexts.push(ContextId::ROOT);
        for info in page.frames() {
            if registry.lookup(info.host_ctx, info.host_node).is_some() {
                self.track(info.content);
            }
        }
        self.pending
            .retain(|frame| !self.contexts.contains(&frame.content));
    }
}
