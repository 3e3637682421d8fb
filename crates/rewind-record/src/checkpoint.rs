//! Checkpoint scheduler
//!
//! Two independent triggers decide when a Meta + FullSnapshot pair
//! replaces the registry. The count trigger fires after every k-th
//! buffer flush since the last checkpoint. The time trigger is a
//! recurring host timer that only marks a pending flag; the pair
//! materializes at the next flush, so idle periods never synthesize a
//! checkpoint and the pair always sits at a real change boundary.

use std::cell::Cell;
use std::rc::Rc;

use rewind_dom::TimerId;

#[derive(Debug)]
pub(crate) struct CheckpointScheduler {
    count_threshold: Option<u32>,
    flushes_since_checkpoint: u32,
    time_pending: Rc<Cell<bool>>,
    timer: Option<TimerId>,
}

impl CheckpointScheduler {
    pub fn new(count_threshold: Option<u32>) -> Self {
        Self {
            count_threshold,
            flushes_since_checkpoint: 0,
            time_pending: Rc::new(Cell::new(false)),
            timer: None,
        }
    }

    /// Flag shared with the recurring timer callback
    pub fn time_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.time_pending)
    }

    pub fn set_timer(&mut self, id: TimerId) {
        self.timer = Some(id);
    }

    /// Hand back the armed timer for cancellation at stop
    pub fn take_timer(&mut self) -> Option<TimerId> {
        self.timer.take()
    }

    /// Account one buffer flush; true when a checkpoint must follow
    pub fn after_flush(&mut self) -> bool {
        self.flushes_since_checkpoint += 1;
        let mut fire = false;
        if let Some(k) = self.count_threshold
            && self.flushes_since_checkpoint >= k
        {
            tracing::debug!(k, "count trigger fired");
            fire = true;
        }
        if self.time_pending.get() {
            tracing::debug!("time trigger materialized at flush");
            self.time_pending.set(false);
            fire = true;
        }
        if fire {
            self.flushes_since_checkpoint = 0;
        }
        fire
    }
}
