//! Session lifecycle and the recording pipeline
//!
//! A [`Session`] owns the registry, buffers, style tracker, checkpoint
//! scheduler, coordinator and emitter for one recording. The inner
//! recorder subscribes to the page and does all work inside the host's
//! tick callbacks; `record` validates options, emits the initial
//! Meta + FullSnapshot pair, and arms the time trigger. Stopping
//! detaches the subscription, cancels the timer and closes the stream;
//! a batch still in flight at stop time is discarded.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rewind_dom::{
    Change, ContextId, NodeId, Page, PageHandle, PageObserver, RuleOp, SubscriberId,
};

use crate::adapter::ChangeAdapter;
use crate::buffer::MutationBuffer;
use crate::checkpoint::CheckpointScheduler;
use crate::coordinator::Coordinator;
use crate::emitter::EventEmitter;
use crate::error::RecordError;
use crate::event::{
    CustomData, Event, EventData, FullSnapshotData, IncrementalData, MetaData, MutationEntry,
};
use crate::registry::NodeRegistry;
use crate::snapshot::{self, SheetOwner};
use crate::stylesheet::{AddressingMode, StyleRuleTracker};

/// Recording configuration
pub struct RecordOptions {
    /// Sink invoked once per finished event, in emission order
    pub emit: Box<dyn FnMut(Event)>,
    /// Count trigger: checkpoint after every k-th buffer flush
    pub checkout_every_nth: Option<u32>,
    /// Time trigger: checkpoint at the next flush after every t ms
    pub checkout_every_nms: Option<u64>,
}

/// Start recording a page.
///
/// Emits the initial Meta + FullSnapshot pair synchronously, then
/// captures every change batch until [`Session::stop`].
pub fn record(page: &PageHandle, options: RecordOptions) -> Result<Session, RecordError> {
    if options.checkout_every_nth == Some(0) {
        return Err(RecordError::Config {
            reason: "checkout_every_nth must be positive".to_string(),
        });
    }
    if options.checkout_every_nms == Some(0) {
        return Err(RecordError::Config {
            reason: "checkout_every_nms must be positive".to_string(),
        });
    }

    let (caps, clock) = {
        let page = page.borrow();
        (page.capabilities(), page.clock())
    };
    let mode = if caps.nested_rule_addressing {
        AddressingMode::Nested
    } else {
        tracing::warn!("host lacks nested rule addressing, style capture degrades to flat");
        AddressingMode::FlatOnly
    };

    let recorder = Rc::new(RefCell::new(Recorder {
        registry: NodeRegistry::new(),
        buffers: BTreeMap::new(),
        tracker: StyleRuleTracker::new(mode),
        scheduler: CheckpointScheduler::new(options.checkout_every_nth),
        coordinator: Coordinator::new(),
        emitter: EventEmitter::new(options.emit, clock),
        fresh_sheets: Vec::new(),
        pending_resize: None,
        stopped: false,
    }));

    recorder.borrow_mut().take_checkpoint(&page.borrow());

    let subscriber = {
        let observer: Rc<RefCell<dyn PageObserver>> = recorder.clone();
        let weak: Weak<RefCell<dyn PageObserver>> = Rc::downgrade(&observer);
        page.borrow_mut().subscribe(weak)
    };

    if let Some(period) = options.checkout_every_nms {
        let flag = recorder.borrow().scheduler.time_flag();
        let timer = page
            .borrow_mut()
            .set_interval(period, Box::new(move || flag.set(true)));
        recorder.borrow_mut().scheduler.set_timer(timer);
    }

    tracing::info!("recording session started");
    Ok(Session {
        recorder,
        page: Rc::downgrade(page),
        subscriber: Some(subscriber),
    })
}

/// An active recording
pub struct Session {
    recorder: Rc<RefCell<Recorder>>,
    page: Weak<RefCell<Page>>,
    subscriber: Option<SubscriberId>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn is_recording(&self) -> bool {
        !self.recorder.borrow().stopped
    }

    /// Inject a tagged payload into the stream at the current position
    pub fn add_custom_event(
        &self,
        tag: &str,
        payload: serde_json::Value,
    ) -> Result<(), RecordError> {
        let mut recorder = self.recorder.borrow_mut();
        if recorder.stopped {
            return Err(RecordError::NotRecording);
        }
        recorder.emitter.emit(EventData::Custom(CustomData {
            tag: tag.to_string(),
            payload,
        }));
        Ok(())
    }

    /// Stop recording: detach, cancel timers, close the stream.
    /// Idempotent; any batch still in flight is discarded.
    pub fn stop(&mut self) {
        let timer = {
            let mut recorder = self.recorder.borrow_mut();
            if recorder.stopped {
                return;
            }
            recorder.stopped = true;
            recorder.emitter.close();
            recorder.scheduler.take_timer()
        };
        if let Some(page) = self.page.upgrade() {
            let mut page = page.borrow_mut();
            if let Some(id) = self.subscriber.take() {
                page.unsubscribe(id);
            }
            if let Some(id) = timer {
                page.clear_timer(id);
            }
        }
        tracing::info!("recording session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Recorder {
    registry: NodeRegistry,
    buffers: BTreeMap<ContextId, MutationBuffer>,
    tracker: StyleRuleTracker,
    scheduler: CheckpointScheduler,
    coordinator: Coordinator,
    emitter: EventEmitter,
    /// Sheet owners introduced by this tick's additions, adopted at flush
    fresh_sheets: Vec<SheetOwner>,
    pending_resize: Option<(u32, u32)>,
    stopped: bool,
}

impl Recorder {
    fn buffer(&mut self, ctx: ContextId) -> &mut MutationBuffer {
        self.buffers.entry(ctx).or_default()
    }

    fn adopt_sheet(&mut self, page: &Page, owner: SheetOwner) {
        if let Some(doc) = page.document(owner.ctx)
            && let Some(sheet) = doc.stylesheet(owner.node)
        {
            self.tracker.adopt(owner.container, sheet.rules());
        }
    }

    /// Emit the Meta + FullSnapshot pair and rebuild all derived state
    fn take_checkpoint(&mut self, page: &Page) {
        let Some(root_doc) = page.document(ContextId::ROOT) else {
            tracing::warn!("root document unavailable, checkpoint skipped");
            return;
        };
        let (width, height) = page.viewport();
        self.emitter.emit(EventData::Meta(MetaData {
            href: root_doc.url().to_string(),
            width,
            height,
        }));

        self.registry.reset();
        self.tracker.reset();
        self.fresh_sheets.clear();
        self.buffers.clear();

        let mut owners = Vec::new();
        let node =
            match snapshot::serialize_document(page, ContextId::ROOT, &mut self.registry, &mut owners)
            {
                Some(node) => node,
                None => return,
            };
        for owner in owners {
            self.adopt_sheet(page, owner);
        }
        self.emitter.emit(EventData::FullSnapshot(FullSnapshotData { node }));
        self.coordinator.sync_after_snapshot(page, &self.registry);
        tracing::debug!(nodes = self.registry.len(), "full snapshot taken");
    }

    /// Tick boundary: activate gated frames, package buffers, emit, and
    /// let the scheduler intercept with a checkpoint
    fn flush(&mut self, page: &Page) {
        for owner in std::mem::take(&mut self.fresh_sheets) {
            self.adopt_sheet(page, owner);
        }

        for frame in self.coordinator.take_ready(&self.registry) {
            let mut owners = Vec::new();
            let Some(subtree) =
                snapshot::serialize_document(page, frame.content, &mut self.registry, &mut owners)
            else {
                continue;
            };
            for owner in owners {
                self.adopt_sheet(page, owner);
            }
            let index = page
                .document(frame.host_ctx)
                .map(|d| d.tree().children(frame.host_node).count() as u32)
                .unwrap_or(0);
            self.buffer(frame.content).push(MutationEntry::Addition {
                parent: frame.host_id,
                index,
                node: subtree,
            });
        }

        let mut emitted = false;
        for ctx in self.coordinator.contexts().to_vec() {
            if let Some(buffer) = self.buffers.get_mut(&ctx)
                && let Some(records) = buffer.flush()
            {
                self.emitter
                    .emit(EventData::IncrementalSnapshot(IncrementalData::Mutation {
                        records,
                    }));
                emitted = true;
            }
        }
        if let Some((width, height)) = self.pending_resize.take() {
            self.emitter
                .emit(EventData::IncrementalSnapshot(IncrementalData::ViewportResize {
                    width,
                    height,
                }));
            emitted = true;
        }
        for delta in self.tracker.flush() {
            self.emitter
                .emit(EventData::IncrementalSnapshot(IncrementalData::StyleRule(delta)));
            emitted = true;
        }

        if emitted && self.scheduler.after_flush() {
            self.take_checkpoint(page);
        }
    }
}

impl PageObserver for Recorder {
    fn mutations(&mut self, page: &Page, ctx: ContextId, changes: &[Change]) {
        if self.stopped {
            return;
        }
        if !self.coordinator.is_tracked(ctx) {
            // Gated context: its activation snapshot subsumes this batch.
            tracing::trace!(?ctx, "batch from gated context discarded");
            return;
        }
        let adapter = ChangeAdapter::new(ctx);
        let mut owners = Vec::new();
        let entries = adapter.convert(page, changes, &mut self.registry, &mut owners);
        self.fresh_sheets.extend(owners);
        self.buffer(ctx).extend(entries);
    }

    fn style_ops(&mut self, _page: &Page, ctx: ContextId, ops: &[RuleOp]) {
        if self.stopped || !self.coordinator.is_tracked(ctx) {
            return;
        }
        for op in ops {
            let Some(container) = self.registry.lookup(ctx, op.owner) else {
                tracing::trace!(?ctx, "rule op on unknown owner dropped");
                continue;
            };
            self.tracker.apply(container, op);
        }
    }

    fn viewport_resized(&mut self, _page: &Page, width: u32, height: u32) {
        if self.stopped {
            return;
        }
        self.pending_resize = Some((width, height));
    }

    fn frame_attached(
        &mut self,
        _page: &Page,
        host_ctx: ContextId,
        host_node: NodeId,
        content: ContextId,
    ) {
        if self.stopped {
            return;
        }
        self.coordinator.queue_frame(host_ctx, host_node, content);
    }

    fn tick_complete(&mut self, page: &Page) {
        if self.stopped {
            return;
        }
        self.flush(page);
    }
}
