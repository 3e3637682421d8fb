//! Page - root document, nested browsing contexts, tick delivery
//!
//! The page owns every document of the browsing-context tree, the
//! viewport, the event loop and the subscriber list. `tick` is the
//! scheduling boundary: all changes made since the previous tick are
//! delivered to subscribers as one batch per context, queued frame
//! attachments are announced, then the clock advances and due timers
//! fire.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::event_loop::{Clock, EventLoop, TimerId};
use crate::observer::{PageObserver, SubscriberId};
use crate::{ContextId, Document, DomError, DomResult, NodeId};

/// Host feature set, resolved once per page
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Whether the style-rule hook can address nested rule containers
    pub nested_rule_addressing: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            nested_rule_addressing: true,
        }
    }
}

/// A nested browsing context hosted by an element
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub host_ctx: ContextId,
    pub host_node: NodeId,
    pub content: ContextId,
}

#[derive(Debug)]
struct FrameState {
    info: FrameInfo,
    announced: bool,
}

/// Shared page handle
pub type PageHandle = Rc<RefCell<Page>>;

/// The observed host environment
pub struct Page {
    documents: Vec<Document>,
    frames: Vec<FrameState>,
    pending_attach: Vec<usize>,
    pending_resize: Option<(u32, u32)>,
    viewport: (u32, u32),
    caps: Capabilities,
    event_loop: EventLoop,
    subscribers: Vec<(SubscriberId, Weak<RefCell<dyn PageObserver>>)>,
    next_subscriber: u32,
}

impl Page {
    /// Create a page with default capabilities
    pub fn new(url: &str) -> Self {
        Self::with_capabilities(url, Capabilities::default())
    }

    /// Create a page with an explicit capability set
    pub fn with_capabilities(url: &str, caps: Capabilities) -> Self {
        Self {
            documents: vec![Document::new(url, caps.nested_rule_addressing)],
            frames: Vec::new(),
            pending_attach: Vec::new(),
            pending_resize: None,
            viewport: (800, 600),
            caps,
            event_loop: EventLoop::new(),
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    /// Wrap a page for sharing with subscribers
    pub fn shared(url: &str) -> PageHandle {
        Rc::new(RefCell::new(Self::new(url)))
    }

    /// The root browsing context
    pub fn root_context(&self) -> ContextId {
        ContextId::ROOT
    }

    /// Host capability set
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Viewport size
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Resize the viewport (coalesced per tick)
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.pending_resize = Some((width, height));
    }

    /// Document of a browsing context
    pub fn document(&self, ctx: ContextId) -> Option<&Document> {
        self.documents.get(ctx.index())
    }

    /// Mutable document of a browsing context
    pub fn document_mut(&mut self, ctx: ContextId) -> Option<&mut Document> {
        self.documents.get_mut(ctx.index())
    }

    // ---- frames ----

    /// Make a nested context's content document available for `host_node`.
    ///
    /// The content exists immediately but is only announced to subscribers
    /// at a later tick boundary, modeling asynchronous sub-document load.
    pub fn attach_frame_content(
        &mut self,
        host_ctx: ContextId,
        host_node: NodeId,
        url: &str,
    ) -> DomResult<ContextId> {
        let doc = self.documents.get(host_ctx.index()).ok_or(DomError::NotFound)?;
        let node = doc.tree().get(host_node).ok_or(DomError::NotFound)?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType);
        }
        if self
            .frames
            .iter()
            .any(|f| f.info.host_ctx == host_ctx && f.info.host_node == host_node)
        {
            return Err(DomError::HierarchyRequest);
        }

        let content = ContextId(self.documents.len() as u32);
        self.documents
            .push(Document::new(url, self.caps.nested_rule_addressing));
        self.frames.push(FrameState {
            info: FrameInfo {
                host_ctx,
                host_node,
                content,
            },
            announced: false,
        });
        self.pending_attach.push(self.frames.len() - 1);
        tracing::debug!(?host_ctx, ?content, "frame content attached, announcement queued");
        Ok(content)
    }

    /// Announced frames, in attach order
    pub fn frames(&self) -> impl Iterator<Item = FrameInfo> + '_ {
        self.frames
            .iter()
            .filter(|f| f.announced)
            .map(|f| f.info)
    }

    /// Content context of an announced frame host
    pub fn frame_content(&self, host_ctx: ContextId, host_node: NodeId) -> Option<ContextId> {
        self.frames
            .iter()
            .find(|f| f.announced && f.info.host_ctx == host_ctx && f.info.host_node == host_node)
            .map(|f| f.info.content)
    }

    // ---- clock and timers ----

    /// Monotonic clock handle
    pub fn clock(&self) -> Clock {
        self.event_loop.clock()
    }

    /// Current time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.event_loop.now_ms()
    }

    /// Arm a one-shot timer
    pub fn set_timeout(&mut self, delay_ms: u64, callback: Box<dyn FnMut()>) -> TimerId {
        self.event_loop.set_timeout(delay_ms, callback)
    }

    /// Arm a recurring timer
    pub fn set_interval(&mut self, period_ms: u64, callback: Box<dyn FnMut()>) -> TimerId {
        self.event_loop.set_interval(period_ms, callback)
    }

    /// Cancel a timer
    pub fn clear_timer(&mut self, id: TimerId) {
        self.event_loop.clear_timer(id);
    }

    // ---- subscription ----

    /// Register an observer; it is held weakly and pruned when dropped
    pub fn subscribe(&mut self, observer: Weak<RefCell<dyn PageObserver>>) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, observer));
        id
    }

    /// Detach an observer immediately
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    // ---- tick ----

    /// End the current script turn: deliver batches, announce frames,
    /// advance the clock by `advance_ms` and fire due timers.
    pub fn tick(&mut self, advance_ms: u64) {
        let mut announced = vec![false; self.documents.len()];
        announced[ContextId::ROOT.index()] = true;
        for frame in &self.frames {
            if frame.announced {
                announced[frame.info.content.index()] = true;
            }
        }

        let mut batches = Vec::new();
        for (i, doc) in self.documents.iter_mut().enumerate() {
            if !announced[i] {
                continue;
            }
            let changes = doc.take_changes();
            let ops = doc.take_rule_ops();
            if !changes.is_empty() || !ops.is_empty() {
                batches.push((ContextId(i as u32), changes, ops));
            }
        }

        let resize = self.pending_resize.take();

        let mut attachments = Vec::new();
        for frame_idx in std::mem::take(&mut self.pending_attach) {
            let frame = &mut self.frames[frame_idx];
            frame.announced = true;
            attachments.push(frame.info);
            // The announcement snapshot subsumes anything recorded while
            // the context was still unannounced.
            self.documents[frame.info.content.index()].discard_pending();
        }

        self.subscribers.retain(|(_, weak)| weak.strong_count() > 0);
        let subs: Vec<Rc<RefCell<dyn PageObserver>>> = self
            .subscribers
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .collect();

        if !subs.is_empty() {
            tracing::debug!(
                batches = batches.len(),
                attachments = attachments.len(),
                "tick boundary"
            );
        }
        for sub in &subs {
            let mut observer = sub.borrow_mut();
            for (ctx, changes, ops) in &batches {
                if !changes.is_empty() {
                    observer.mutations(self, *ctx, changes);
                }
                if !ops.is_empty() {
                    observer.style_ops(self, *ctx, ops);
                }
            }
            if let Some((w, h)) = resize {
                observer.viewport_resized(self, w, h);
            }
            for info in &attachments {
                observer.frame_attached(self, info.host_ctx, info.host_node, info.content);
            }
            observer.tick_complete(self);
        }

        self.event_loop.advance(advance_ms);
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("documents", &self.documents.len())
            .field("frames", &self.frames.len())
            .field("viewport", &self.viewport)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
