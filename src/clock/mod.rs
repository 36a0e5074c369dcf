//! Time sources driving every animation on a stage.
//!
//! A [`Clock`] reports a monotonically non-decreasing time in milliseconds and invokes
//! registered frame callbacks once per tick. Two implementations exist:
//!
//! - [`FrameClock`]: a discrete clock advanced explicitly, one frame at a time, for
//!   deterministic offline export.
//! - [`RealtimeClock`]: a wall-clock source that asks its host for display frames only while
//!   at least one frame callback is registered.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{FutureExt as _, LocalBoxFuture};
use indexmap::IndexMap;

use crate::foundation::ids::CallbackId;

/// Frame and timeout callbacks receive the clock time (ms) at which they fire.
pub type ClockCallback = Rc<dyn Fn(f64)>;

/// Shared interface of the discrete and real-time clocks.
///
/// All methods take `&self`; implementations use interior mutability so that callbacks may
/// register or remove other callbacks while the clock is firing.
pub trait Clock {
    /// Current time in milliseconds.
    fn time(&self) -> f64;

    fn has_frame_callback(&self, id: CallbackId) -> bool;

    /// Register a per-tick callback. Re-registering an id replaces the callback and keeps
    /// its position in the firing order.
    fn add_frame_callback(&self, id: CallbackId, callback: ClockCallback);

    fn remove_frame_callback(&self, id: CallbackId);

    fn has_timeout_callback(&self, id: CallbackId) -> bool;

    /// Register a one-shot callback due `delay` ms from now. Re-registering an id replaces
    /// the previous registration.
    fn add_timeout_callback(&self, delay: f64, id: CallbackId, callback: ClockCallback);

    fn remove_timeout_callback(&self, id: CallbackId);

    /// Drop every registration without firing anything.
    fn destroy(&self);

    /// Future that completes once `delay` ms of clock time have elapsed.
    fn timeout(&self, delay: f64) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = RefCell::new(Some(tx));
        self.add_timeout_callback(
            delay,
            CallbackId::next(),
            Rc::new(move |_| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(());
                }
            }),
        );
        rx.map(|_| ()).boxed_local()
    }
}

#[derive(Default)]
pub(crate) struct CallbackTable {
    frames: IndexMap<CallbackId, ClockCallback>,
    timeouts: IndexMap<CallbackId, (f64, ClockCallback)>,
}

impl CallbackTable {
    pub(crate) fn has_frame(&self, id: CallbackId) -> bool {
        self.frames.contains_key(&id)
    }

    pub(crate) fn add_frame(&mut self, id: CallbackId, callback: ClockCallback) {
        self.frames.insert(id, callback);
    }

    pub(crate) fn remove_frame(&mut self, id: CallbackId) {
        self.frames.shift_remove(&id);
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn has_timeout(&self, id: CallbackId) -> bool {
        self.timeouts.contains_key(&id)
    }

    pub(crate) fn add_timeout(&mut self, due: f64, id: CallbackId, callback: ClockCallback) {
        self.timeouts.shift_remove(&id);
        self.timeouts.insert(id, (due, callback));
    }

    pub(crate) fn remove_timeout(&mut self, id: CallbackId) {
        self.timeouts.shift_remove(&id);
    }

    pub(crate) fn next_deadline(&self) -> Option<f64> {
        self.timeouts.values().map(|(due, _)| *due).reduce(f64::min)
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
        self.timeouts.clear();
    }
}

/// Fire every frame callback registered at the start of the tick, in registration order.
///
/// No borrow of the table is held while a callback runs, and callbacks removed by an
/// earlier callback in the same tick are skipped.
pub(crate) fn fire_frame_callbacks(table: &RefCell<CallbackTable>, time: f64) {
    let ids: Vec<CallbackId> = table.borrow().frames.keys().copied().collect();
    for id in ids {
        let callback = table.borrow().frames.get(&id).cloned();
        if let Some(callback) = callback {
            callback(time);
        }
    }
}

/// Fire and unregister every timeout due at or before `time`, in registration order.
pub(crate) fn fire_due_timeouts(table: &RefCell<CallbackTable>, time: f64) -> usize {
    let ids: Vec<CallbackId> = table.borrow().timeouts.keys().copied().collect();
    let mut fired = 0;
    for id in ids {
        let due = {
            let mut table = table.borrow_mut();
            match table.timeouts.get(&id) {
                Some((due, _)) if *due <= time => table.timeouts.shift_remove(&id),
                _ => None,
            }
        };
        if let Some((_, callback)) = due {
            callback(time);
            fired += 1;
        }
    }
    fired
}

mod frame;
mod realtime;

pub use frame::FrameClock;
pub use realtime::{FrameScheduler, MonotonicTime, RealtimeClock, TimeSource};
