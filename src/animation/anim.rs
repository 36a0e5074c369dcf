use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::{FutureExt as _, LocalBoxFuture, Shared};

use crate::animation::ease::Easing;
use crate::clock::Clock;
use crate::foundation::error::{AnimationAborted, StageError, StageResult};
use crate::foundation::ids::CallbackId;

/// Interpolation contract for animated values.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t`.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

/// Playback direction across iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationDirection {
    #[default]
    Normal,
    Reverse,
    Alternate,
    AlternateReverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationPlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationPhase {
    Before,
    Active,
    After,
    Idle,
}

/// Immutable timing parameters of an [`Animation`], all times in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTiming {
    pub duration: f64,
    pub easing: Easing,
    pub delay: f64,
    pub end_delay: f64,
    pub direction: AnimationDirection,
    /// May be `f64::INFINITY`.
    pub iteration_count: f64,
    pub iteration_start: f64,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            duration: 0.0,
            easing: Easing::Linear,
            delay: 0.0,
            end_delay: 0.0,
            direction: AnimationDirection::Normal,
            iteration_count: 1.0,
            iteration_start: 0.0,
        }
    }
}

impl AnimationTiming {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn active_duration(&self) -> f64 {
        if self.duration == 0.0 || self.iteration_count == 0.0 {
            return 0.0;
        }
        self.duration * self.iteration_count
    }

    pub fn end_time(&self) -> f64 {
        (self.delay + self.active_duration() + self.end_delay).max(0.0)
    }
}

/// Shared, cloneable completion result of an [`Animation`].
pub type FinishedFuture = Shared<LocalBoxFuture<'static, Result<(), AnimationAborted>>>;

struct FinishedSignal {
    sender: Option<oneshot::Sender<Result<(), AnimationAborted>>>,
    future: FinishedFuture,
}

impl FinishedSignal {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        let future = rx
            .map(|result| result.unwrap_or(Err(AnimationAborted)))
            .boxed_local()
            .shared();
        Self {
            sender: Some(tx),
            future,
        }
    }

    fn is_settled(&self) -> bool {
        self.sender.is_none()
    }

    fn settle(&mut self, result: Result<(), AnimationAborted>) {
        if let Some(tx) = self.sender.take() {
            let _ = tx.send(result);
        }
    }
}

#[derive(Default)]
struct PlaybackState {
    start_time: Option<f64>,
    hold_time: Option<f64>,
    playback_rate: f64,
    previous_current_time: Option<f64>,
}

type UpdateCallback = Box<dyn Fn(f64, &Animation)>;
type FinishedCallback = Box<dyn Fn(bool, &Animation)>;

struct AnimationInner {
    id: CallbackId,
    clock: Rc<dyn Clock>,
    timing: AnimationTiming,
    on_update: UpdateCallback,
    on_finished: FinishedCallback,
    state: RefCell<PlaybackState>,
    finished: RefCell<FinishedSignal>,
}

impl Drop for AnimationInner {
    fn drop(&mut self) {
        self.clock.remove_frame_callback(self.id);
    }
}

/// Time-driven progress generator following the Web Animations timing model, without
/// pending states: every state change and callback happens synchronously.
///
/// `on_update` receives the eased progress whenever it is recomputed; `on_finished` is
/// called once when the animation finishes (`false`) or is canceled (`true`). The
/// animation registers itself on the clock only while it is running, and no internal
/// borrow is held while either callback runs, so callbacks may drive other animations
/// (or this one).
///
/// Cloning yields another handle to the same animation.
#[derive(Clone)]
pub struct Animation {
    inner: Rc<AnimationInner>,
}

impl PartialEq for Animation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.inner.id)
            .field("timing", &self.inner.timing)
            .field("play_state", &self.play_state())
            .finish()
    }
}

impl Animation {
    pub fn new(
        clock: Rc<dyn Clock>,
        timing: AnimationTiming,
        on_update: impl Fn(f64, &Animation) + 'static,
        on_finished: impl Fn(bool, &Animation) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(AnimationInner {
                id: CallbackId::next(),
                clock,
                timing,
                on_update: Box::new(on_update),
                on_finished: Box::new(on_finished),
                state: RefCell::new(PlaybackState {
                    playback_rate: 1.0,
                    ..PlaybackState::default()
                }),
                finished: RefCell::new(FinishedSignal::new()),
            }),
        }
    }

    /// Token under which this animation registers its frame callback.
    pub fn id(&self) -> CallbackId {
        self.inner.id
    }

    pub fn timing(&self) -> &AnimationTiming {
        &self.inner.timing
    }

    fn timeline_time(&self) -> f64 {
        self.inner.clock.time()
    }

    pub fn current_time(&self) -> Option<f64> {
        self.compute_current_time(false)
    }

    fn compute_current_time(&self, ignore_hold_time: bool) -> Option<f64> {
        let (hold, start, rate) = {
            let st = self.inner.state.borrow();
            (st.hold_time, st.start_time, st.playback_rate)
        };
        if !ignore_hold_time && hold.is_some() {
            return hold;
        }
        let start = start?;
        Some((self.timeline_time() - start) * rate)
    }

    /// Seek to `seek_time` (ms of local time).
    pub fn set_current_time(&self, seek_time: Option<f64>) -> StageResult<()> {
        self.seek(seek_time, false)
    }

    fn seek(&self, seek_time: Option<f64>, silent: bool) -> StageResult<()> {
        let Some(seek_time) = seek_time else {
            if self.current_time().is_some() {
                return Err(StageError::animation(
                    "seek time is unresolved while current time is resolved",
                ));
            }
            return Ok(());
        };
        let now = self.timeline_time();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.hold_time.is_some() || st.start_time.is_none() || st.playback_rate == 0.0 {
                st.hold_time = Some(seek_time);
            } else {
                st.start_time = Some(now - seek_time / st.playback_rate);
            }
            st.previous_current_time = None;
        }
        if !silent {
            self.update_finished(true);
        }
        Ok(())
    }

    /// Start time on the clock, reported only while it governs the current time.
    ///
    /// A finished animation keeps its current time pinned by the hold time, so at most one
    /// of [`Animation::start_time`] and [`Animation::hold_time`] is ever `Some`.
    pub fn start_time(&self) -> Option<f64> {
        let st = self.inner.state.borrow();
        match st.hold_time {
            Some(_) => None,
            None => st.start_time,
        }
    }

    pub fn hold_time(&self) -> Option<f64> {
        self.inner.state.borrow().hold_time
    }

    pub fn set_start_time(&self, start_time: Option<f64>) {
        let previous = self.current_time();
        {
            let mut st = self.inner.state.borrow_mut();
            st.previous_current_time = previous;
            st.start_time = start_time;
            if start_time.is_some() {
                if st.playback_rate != 0.0 {
                    st.hold_time = None;
                }
            } else {
                st.hold_time = previous;
            }
        }
        self.update_finished(true);
    }

    pub fn play(&self) -> StageResult<()> {
        self.play_internal(true)
    }

    fn play_internal(&self, auto_rewind: bool) -> StageResult<()> {
        let current = self.current_time();
        let end = self.end_time();
        let rate = self.playback_rate();
        let mut seek_time = None;
        if auto_rewind {
            if rate >= 0.0 && current.is_none_or(|t| t < 0.0 || t >= end) {
                seek_time = Some(0.0);
            } else if rate < 0.0 && current.is_none_or(|t| t <= 0.0 || t > end) {
                if end == f64::INFINITY {
                    return Err(StageError::animation(
                        "cannot play backwards: animation end is positive infinity",
                    ));
                }
                seek_time = Some(end);
            }
        }
        let now = self.timeline_time();
        {
            let mut st = self.inner.state.borrow_mut();
            if seek_time.is_none() && st.start_time.is_none() && current.is_none() {
                seek_time = Some(0.0);
            }
            if seek_time.is_some() {
                st.hold_time = seek_time;
            }
            if st.hold_time.is_some() {
                st.start_time = None;
            }
            let Some(hold) = st.hold_time else {
                // Already running and no seek requested.
                return Ok(());
            };
            if st.playback_rate != 0.0 {
                st.start_time = Some(now - hold / st.playback_rate);
                st.hold_time = None;
            } else {
                st.start_time = Some(now);
            }
        }
        self.update_finished(false);
        Ok(())
    }

    pub fn pause(&self) -> StageResult<()> {
        if self.play_state() == AnimationPlayState::Paused {
            return Ok(());
        }
        let mut seek_time = None;
        if self.current_time().is_none() {
            if self.playback_rate() >= 0.0 {
                seek_time = Some(0.0);
            } else {
                let end = self.end_time();
                if end == f64::INFINITY {
                    return Err(StageError::animation(
                        "cannot pause backwards: animation end is positive infinity",
                    ));
                }
                seek_time = Some(end);
            }
        }
        let now = self.timeline_time();
        {
            let mut st = self.inner.state.borrow_mut();
            if seek_time.is_some() {
                st.hold_time = seek_time;
            }
            if let (Some(start), None) = (st.start_time, st.hold_time) {
                st.hold_time = Some((now - start) * st.playback_rate);
            }
            st.start_time = None;
        }
        self.update_finished(false);
        Ok(())
    }

    fn update_finished(&self, did_seek: bool) {
        let unconstrained = self.compute_current_time(!did_seek);
        let end = self.end_time();
        let now = self.timeline_time();
        {
            let mut st = self.inner.state.borrow_mut();
            if let (Some(unconstrained), Some(_)) = (unconstrained, st.start_time) {
                let rate = st.playback_rate;
                if rate > 0.0 && unconstrained >= end {
                    st.hold_time = Some(if did_seek {
                        unconstrained
                    } else {
                        st.previous_current_time.map_or(end, |p| p.max(end))
                    });
                } else if rate < 0.0 && unconstrained <= 0.0 {
                    st.hold_time = Some(if did_seek {
                        unconstrained
                    } else {
                        st.previous_current_time.map_or(0.0, |p| p.min(0.0))
                    });
                } else if rate != 0.0 {
                    if did_seek && let Some(hold) = st.hold_time {
                        st.start_time = Some(now - hold / rate);
                    }
                    st.hold_time = None;
                }
            }
        }
        let current = self.current_time();
        self.inner.state.borrow_mut().previous_current_time = current;

        let is_finished = self.play_state() == AnimationPlayState::Finished;
        let handled = self.inner.finished.borrow().is_settled();
        if is_finished && !handled {
            self.notify_on_update();
            // Settled before `on_finished` so that a callback restarting playback gets a
            // fresh result.
            self.inner.finished.borrow_mut().settle(Ok(()));
            self.notify_on_finished(false);
        } else if !is_finished {
            self.notify_on_update();
        }
        if !is_finished && self.inner.finished.borrow().is_settled() {
            *self.inner.finished.borrow_mut() = FinishedSignal::new();
        }
        self.update_frame_callback();
    }

    fn finish_limit(&self) -> Option<f64> {
        let rate = self.playback_rate();
        let end = self.end_time();
        if rate == 0.0 || (rate > 0.0 && end == f64::INFINITY) {
            return None;
        }
        Some(if rate > 0.0 { end } else { 0.0 })
    }

    /// Jump to the end (or the start, when playing backwards) and finish.
    pub fn finish(&self) -> StageResult<()> {
        let limit = self.finish_limit().ok_or_else(|| {
            StageError::animation(
                "cannot finish: playback rate is 0, or playing forwards towards an infinite end",
            )
        })?;
        self.finish_at(limit)
    }

    fn finish_at(&self, limit: f64) -> StageResult<()> {
        self.seek(Some(limit), true)?;
        let now = self.timeline_time();
        {
            let mut st = self.inner.state.borrow_mut();
            if st.start_time.is_none() {
                st.start_time = Some(now - limit / st.playback_rate);
            }
        }
        self.update_finished(true);
        Ok(())
    }

    /// Abort playback. A non-idle animation notifies `on_finished(true)` and rejects its
    /// outstanding finished result; canceling an idle animation does neither.
    pub fn cancel(&self) {
        if self.play_state() != AnimationPlayState::Idle {
            self.notify_on_finished(true);
            let mut finished = self.inner.finished.borrow_mut();
            finished.settle(Err(AnimationAborted));
            *finished = FinishedSignal::new();
        }
        {
            let mut st = self.inner.state.borrow_mut();
            st.hold_time = None;
            st.start_time = None;
        }
        self.update_frame_callback();
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.state.borrow().playback_rate
    }

    /// Change the rate while preserving the current time.
    pub fn set_playback_rate(&self, rate: f64) {
        let previous = self.current_time();
        self.inner.state.borrow_mut().playback_rate = rate;
        if previous.is_some() {
            // A resolved seek time never fails.
            let _ = self.seek(previous, false);
        }
    }

    /// Negate the playback rate and continue playing; the rate is rolled back on failure.
    pub fn reverse(&self) -> StageResult<()> {
        let original = self.playback_rate();
        self.inner.state.borrow_mut().playback_rate = -original;
        self.play_internal(false).inspect_err(|_| {
            self.inner.state.borrow_mut().playback_rate = original;
        })
    }

    pub fn play_state(&self) -> AnimationPlayState {
        let current = self.current_time();
        let (start, rate) = {
            let st = self.inner.state.borrow();
            (st.start_time, st.playback_rate)
        };
        match (current, start) {
            (None, None) => AnimationPlayState::Idle,
            (_, None) => AnimationPlayState::Paused,
            (Some(t), Some(_))
                if (rate > 0.0 && t >= self.end_time()) || (rate < 0.0 && t <= 0.0) =>
            {
                AnimationPlayState::Finished
            }
            _ => AnimationPlayState::Running,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.inner.timing.end_time()
    }

    pub fn active_duration(&self) -> f64 {
        self.inner.timing.active_duration()
    }

    pub fn phase(&self) -> AnimationPhase {
        let Some(local) = self.current_time() else {
            return AnimationPhase::Idle;
        };
        let timing = &self.inner.timing;
        let backwards = self.playback_rate() < 0.0;
        let end = self.end_time();
        let before_active = timing.delay.min(end).max(0.0);
        let active_after = (timing.delay + self.active_duration()).min(end).max(0.0);
        if local < before_active || (backwards && local == before_active) {
            AnimationPhase::Before
        } else if local > active_after || (!backwards && local == active_after) {
            AnimationPhase::After
        } else {
            AnimationPhase::Active
        }
    }

    /// Time spent inside the active interval; defined only in the active phase.
    pub fn active_time(&self) -> Option<f64> {
        match self.phase() {
            AnimationPhase::Active => Some(self.current_time()? - self.inner.timing.delay),
            _ => None,
        }
    }

    /// Active time with both fill directions applied: clamped to the start of the active
    /// interval before it and to its end after it.
    fn filled_active_time(&self, phase: AnimationPhase) -> Option<f64> {
        let local = self.current_time()?;
        let delay = self.inner.timing.delay;
        match phase {
            AnimationPhase::Before => Some((local - delay).max(0.0)),
            AnimationPhase::Active => Some(local - delay),
            AnimationPhase::After => Some((local - delay).min(self.active_duration()).max(0.0)),
            AnimationPhase::Idle => None,
        }
    }

    fn overall_progress_in(&self, phase: AnimationPhase) -> Option<f64> {
        let active = self.filled_active_time(phase)?;
        let timing = &self.inner.timing;
        let overall = if timing.duration == 0.0 {
            if phase == AnimationPhase::Before {
                0.0
            } else {
                timing.iteration_count
            }
        } else {
            active / timing.duration
        };
        Some(overall + timing.iteration_start)
    }

    /// Iterations completed so far, including the iteration start offset.
    pub fn overall_progress(&self) -> Option<f64> {
        self.overall_progress_in(self.phase())
    }

    fn simple_iteration_progress_in(&self, phase: AnimationPhase) -> Option<f64> {
        let overall = self.overall_progress_in(phase)?;
        let timing = &self.inner.timing;
        let mut simple = if overall == f64::INFINITY {
            timing.iteration_start % 1.0
        } else {
            overall % 1.0
        };
        if simple == 0.0
            && matches!(phase, AnimationPhase::Active | AnimationPhase::After)
            && self.filled_active_time(phase) == Some(self.active_duration())
            && timing.iteration_count != 0.0
        {
            simple = 1.0;
        }
        Some(simple)
    }

    fn current_iteration_in(&self, phase: AnimationPhase) -> Option<f64> {
        let overall = self.overall_progress_in(phase)?;
        if phase == AnimationPhase::After && self.inner.timing.iteration_count == f64::INFINITY {
            return Some(f64::INFINITY);
        }
        if self.simple_iteration_progress_in(phase) == Some(1.0) {
            return Some(overall.floor() - 1.0);
        }
        Some(overall.floor())
    }

    /// Zero-based index of the iteration in progress.
    pub fn current_iteration(&self) -> Option<f64> {
        self.current_iteration_in(self.phase())
    }

    fn is_forwards_in(&self, phase: AnimationPhase) -> bool {
        let direction = self.inner.timing.direction;
        match direction {
            AnimationDirection::Normal => true,
            AnimationDirection::Reverse => false,
            AnimationDirection::Alternate | AnimationDirection::AlternateReverse => {
                let Some(mut d) = self.current_iteration_in(phase) else {
                    return true;
                };
                if direction == AnimationDirection::AlternateReverse {
                    d += 1.0;
                }
                d % 2.0 == 0.0 || d == f64::INFINITY
            }
        }
    }

    /// Eased progress within the current iteration.
    pub fn progress(&self) -> Option<f64> {
        let phase = self.phase();
        let simple = self.simple_iteration_progress_in(phase)?;
        let forwards = self.is_forwards_in(phase);
        let directed = if forwards { simple } else { 1.0 - simple };
        let before = (phase == AnimationPhase::Before && forwards)
            || (phase == AnimationPhase::After && !forwards);
        Some(self.inner.timing.easing.apply(directed, before))
    }

    /// Resolves when the animation finishes; rejects with [`AnimationAborted`] on cancel.
    pub fn finished(&self) -> FinishedFuture {
        self.inner.finished.borrow().future.clone()
    }

    /// Resolves when the animation either finishes or is canceled.
    pub fn finished_or_canceled(&self) -> LocalBoxFuture<'static, ()> {
        self.finished().map(|_| ()).boxed_local()
    }

    /// Finish when possible, otherwise cancel.
    pub fn finish_or_cancel(&self) {
        match self.finish_limit() {
            Some(limit) => {
                if let Err(err) = self.finish_at(limit) {
                    tracing::warn!(%err, "finish failed, canceling");
                    self.cancel();
                }
            }
            None => self.cancel(),
        }
    }

    fn notify_on_update(&self) {
        let progress = match self.phase() {
            AnimationPhase::Before => Some(0.0),
            AnimationPhase::Active => self.progress(),
            AnimationPhase::After => Some(1.0),
            AnimationPhase::Idle => None,
        };
        if let Some(progress) = progress {
            (self.inner.on_update)(progress, self);
        }
    }

    fn notify_on_finished(&self, canceled: bool) {
        (self.inner.on_finished)(canceled, self);
    }

    fn update_frame_callback(&self) {
        let clock = &self.inner.clock;
        if self.play_state() == AnimationPlayState::Running {
            if !clock.has_frame_callback(self.inner.id) {
                let weak: Weak<AnimationInner> = Rc::downgrade(&self.inner);
                clock.add_frame_callback(
                    self.inner.id,
                    Rc::new(move |_| {
                        if let Some(inner) = weak.upgrade() {
                            Animation { inner }.update_finished(false);
                        }
                    }),
                );
            }
        } else {
            clock.remove_frame_callback(self.inner.id);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
