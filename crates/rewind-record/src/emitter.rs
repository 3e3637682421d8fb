//! Event emitter
//!
//! Terminal stage of the pipeline: assigns the monotonic sequence number
//! and a host-clock timestamp, then hands the finished event to the
//! sink synchronously. After close, emission is dropped silently —
//! nothing reaches the sink once the session has stopped.

use rewind_dom::Clock;

use crate::event::{Event, EventData};

pub(crate) struct EventEmitter {
    sink: Box<dyn FnMut(Event)>,
    clock: Clock,
    seq: u64,
    closed: bool,
}

impl EventEmitter {
    pub fn new(sink: Box<dyn FnMut(Event)>, clock: Clock) -> Self {
        Self {
            sink,
            clock,
            seq: 0,
            closed: false,
        }
    }

    pub fn emit(&mut self, data: EventData) {
        if self.closed {
            tracing::trace!("event dropped, stream closed");
            return;
        }
        let event = Event {
            seq: self.seq,
            timestamp_ms: self.clock.now_ms(),
            data,
        };
        self.seq += 1;
        (self.sink)(event);
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("seq", &self.seq)
            .field("closed", &self.closed)
            .finish()
    }
}
