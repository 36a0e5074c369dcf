use std::cell::{Cell, RefCell};

use crate::clock::{CallbackTable, Clock, ClockCallback, fire_due_timeouts, fire_frame_callbacks};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::ids::CallbackId;

/// Discrete clock advanced one frame at a time by its owner.
///
/// Time is derived from the frame counter, `frame / fps * 1000` ms, so two runs that issue
/// the same operations between the same ticks observe identical timestamps.
pub struct FrameClock {
    fps: Fps,
    frame: Cell<u64>,
    callbacks: RefCell<CallbackTable>,
}

impl FrameClock {
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            frame: Cell::new(0),
            callbacks: RefCell::new(CallbackTable::default()),
        }
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn frame(&self) -> FrameIndex {
        FrameIndex(self.frame.get())
    }

    /// Number of registered frame callbacks; zero means the stage is idle.
    pub fn frame_callback_count(&self) -> usize {
        self.callbacks.borrow().frame_count()
    }

    /// Advance one frame, then fire frame callbacks followed by due timeouts.
    pub fn next_frame(&self) {
        self.frame.set(self.frame.get() + 1);
        let time = self.time();
        tracing::trace!(frame = self.frame.get(), time, "frame tick");
        fire_frame_callbacks(&self.callbacks, time);
        fire_due_timeouts(&self.callbacks, time);
    }
}

impl Clock for FrameClock {
    fn time(&self) -> f64 {
        self.fps.frame_to_millis(self.frame())
    }

    fn has_frame_callback(&self, id: CallbackId) -> bool {
        self.callbacks.borrow().has_frame(id)
    }

    fn add_frame_callback(&self, id: CallbackId, callback: ClockCallback) {
        self.callbacks.borrow_mut().add_frame(id, callback);
    }

    fn remove_frame_callback(&self, id: CallbackId) {
        self.callbacks.borrow_mut().remove_frame(id);
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
    }
}

#[cfg(test)]
#[path = "../../tests/unit/clock/frame.rs"]
mod tests;
