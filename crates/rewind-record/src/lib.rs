//! Rewind Record - incremental recording and checkpoint engine
//!
//! Observes a live [`rewind_dom::Page`] and produces a compact, ordered,
//! replayable event stream: the full structural state at checkpoints and
//! every structural, textual, attribute and style-rule change in
//! between. Bursty change notifications from any number of browsing
//! contexts become a single strictly ordered stream with explicit
//! consistency guarantees between full and incremental state.
//!
//! # Example
//! ```rust
//! use rewind_dom::Page;
//! use rewind_record::{record, RecordOptions};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let page = Page::shared("https://example.test/");
//! let events = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&events);
//!
//! let mut session = record(&page, RecordOptions {
//!     emit: Box::new(move |event| sink.borrow_mut().push(event)),
//!     checkout_every_nth: None,
//!     checkout_every_nms: None,
//! }).unwrap();
//!
//! {
//!     let mut page = page.borrow_mut();
//!     let ctx = page.root_context();
//!     let doc = page.document_mut(ctx).unwrap();
//!     let root = doc.root();
//!     let div = doc.create_element("div");
//!     doc.append_child(root, div).unwrap();
//! }
//! page.borrow_mut().tick(16);
//!
//! session.stop();
//! // Meta, FullSnapshot, one IncrementalSnapshot.
//! assert_eq!(events.borrow().len(), 3);
//! ```

mod adapter;
mod buffer;
mod checkpoint;
mod coordinator;
mod emitter;
mod error;
mod event;
mod registry;
mod session;
mod snapshot;
mod stylesheet;

pub use error::RecordError;
pub use event::{
    CustomData, Event, EventData, FullSnapshotData, IncrementalData, MetaData, MutationEntry,
    RuleAdd, RuleRemove, SerializedKind, SerializedNode, SerializedRule, StyleRuleDelta,
};
pub use registry::{MirrorId, NodeRegistry};
pub use session::{record, RecordOptions, Session};
