use std::cell::{Cell, RefCell};
use std::time::Instant;

use crate::clock::{CallbackTable, Clock, ClockCallback, fire_due_timeouts, fire_frame_callbacks};
use crate::foundation::ids::CallbackId;

/// Monotonic millisecond source.
pub trait TimeSource {
    fn now_millis(&self) -> f64;
}

/// Wall-clock time measured from the moment the source was created.
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_millis(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Host hook for display-frame scheduling (vsync, a render loop, ...).
pub trait FrameScheduler {
    /// Ask the host to call [`RealtimeClock::on_frame`] on the next display frame.
    fn request_frame(&self);
    /// Withdraw a pending request.
    fn cancel_frame(&self);
}

/// Clock backed by wall time.
///
/// A display frame is requested from the host only while at least one frame callback is
/// registered. Timeouts are not tied to frames; the host fires them through
/// [`RealtimeClock::fire_due_timeouts`], using [`RealtimeClock::next_deadline`] to schedule.
pub struct RealtimeClock {
    source: Box<dyn TimeSource>,
    scheduler: Box<dyn FrameScheduler>,
    callbacks: RefCell<CallbackTable>,
    frame_requested: Cell<bool>,
}

impl RealtimeClock {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self::with_source(Box::new(MonotonicTime::new()), scheduler)
    }

    pub fn with_source(source: Box<dyn TimeSource>, scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            source,
            scheduler,
            callbacks: RefCell::new(CallbackTable::default()),
            frame_requested: Cell::new(false),
        }
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested.get()
    }

    /// Display-frame entry point called by the host.
    pub fn on_frame(&self) {
        self.frame_requested.set(false);
        let time = self.time();
        tracing::trace!(time, "display frame");
        fire_frame_callbacks(&self.callbacks, time);
        self.update_frame_request();
    }

    /// Fire every timeout that is due by now; returns how many fired.
    pub fn fire_due_timeouts(&self) -> usize {
        let fired = fire_due_timeouts(&self.callbacks, self.time());
        self.update_frame_request();
        fired
    }

    /// Earliest pending timeout deadline in clock milliseconds.
    pub fn next_deadline(&self) -> Option<f64> {
        self.callbacks.borrow().next_deadline()
    }

    fn update_frame_request(&self) {
        let wants_frame = self.callbacks.borrow().frame_count() > 0;
        if wants_frame && !self.frame_requested.get() {
            self.frame_requested.set(true);
            self.scheduler.request_frame();
        } else if !wants_frame && self.frame_requested.get() {
            self.frame_requested.set(false);
            self.scheduler.cancel_frame();
        }
    }
}

impl Clock for RealtimeClock {
    fn time(&self) -> f64 {
        self.source.now_millis()
    }

    fn has_frame_callback(&self, id: CallbackId) -> bool {
        self.callbacks.borrow().has_frame(id)
    }

    fn add_frame_callback(&self, id: CallbackId, callback: ClockCallback) {
        self.callbacks.borrow_mut().add_frame(id, callback);
        self.update_frame_request();
    }

    fn remove_frame_callback(&self, id: CallbackId) {
        self.callbacks.borrow_mut().remove_frame(id);
        self.update_frame_request();
    }

    fn has_timeout_callback(&self, id: CallbackId) -> bool {
        self.callbacks.borrow().has_timeout(id)
    }

    fn add_timeout_callback(&self, delay: f64, id: CallbackId, callback: ClockCallback) {
        let due = self.time() + delay;
        self.callbacks.borrow_mut().add_timeout(due, id, callback);
    }

    fn remove_timeout_callback(&self, id: CallbackId) {
        self.callbacks.borrow_mut().remove_timeout(id);
    }

    fn destroy(&self) {
        self.callbacks.borrow_mut().clear();
        self.update_frame_request();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clock/realtime.rs"]
mod tests;
