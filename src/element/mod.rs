//! Slots and their transition protocol.
//!
//! Every named slot on a stage is an [`Element`]. Content slots ([`ContentElement`]) own a
//! visual object and cross-fade between objects; animation and effect slots drive other
//! slots or overlay layers instead.
//!
//! A transition is a restartable procedure of at most two steps. The first step may start
//! an asynchronous construction and returns [`TransitionStep::Pending`]; the driver awaits
//! that future and resumes the transition, whose final step applies every change
//! synchronously and returns [`TransitionStep::Done`].

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, LocalBoxFuture};
use indexmap::IndexMap;

use crate::foundation::error::StageResult;
use crate::matcher::Matcher;
use crate::property::element::ElementProperties;
use crate::property::value::PropertyValue;

pub mod animation;
pub mod audio;
pub mod choice;
pub mod content;
pub mod effect;
pub mod image;
pub(crate) mod multimap;
pub mod text;
pub mod video;

pub use animation::AnimationElement;
pub use audio::{AudioKind, AudioVolumeSetting};
pub use choice::ChoiceKind;
pub use content::{ContentElement, ContentKind};
pub use effect::{BuiltinEffects, CrossFadeEffect, Effect, EffectElement, EffectFactory, EffectLayer};
pub use image::ImageKind;
pub use text::TextKind;
pub use video::VideoKind;

/// Placement context passed along with a slot's properties.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TransitionOptions {
    #[default]
    None,
    /// 1-based index of a figure among `count` visible figures.
    Figure { index: u32, count: u32 },
    Avatar { position_x: f64, position_y: f64 },
}

/// Outcome of one transition step.
pub enum TransitionStep {
    /// Await the future, then resume.
    Pending(LocalBoxFuture<'static, ()>),
    Done,
}

impl TransitionStep {
    pub(crate) fn ready() -> Self {
        Self::Pending(Box::pin(future::ready(())))
    }
}

impl std::fmt::Debug for TransitionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(_) => f.write_str("Pending"),
            Self::Done => f.write_str("Done"),
        }
    }
}

pub trait TransitionProcedure {
    fn resume(&mut self) -> StageResult<TransitionStep>;
}

/// One in-flight transition of one slot.
pub struct Transition {
    procedure: Box<dyn TransitionProcedure>,
    done: bool,
}

impl Transition {
    pub fn new(procedure: impl TransitionProcedure + 'static) -> Self {
        Self {
            procedure: Box::new(procedure),
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Run the next step. Resuming a finished transition is a no-op returning `Done`.
    pub fn resume(&mut self) -> StageResult<TransitionStep> {
        if self.done {
            return Ok(TransitionStep::Done);
        }
        let step = self.procedure.resume()?;
        if matches!(step, TransitionStep::Done) {
            self.done = true;
        }
        Ok(step)
    }

    /// Drive the transition to completion.
    pub async fn run(mut self) -> StageResult<()> {
        loop {
            match self.resume()? {
                TransitionStep::Pending(pending) => pending.await,
                TransitionStep::Done => return Ok(()),
            }
        }
    }

    /// Drive a batch step by step: every transition runs its current step before any of
    /// them is resumed again. A failing transition is dropped from the batch; the first
    /// failure is returned once the others are done.
    pub async fn run_all(transitions: Vec<Transition>) -> StageResult<()> {
        let mut active = transitions;
        let mut first_error = None;
        while !active.is_empty() {
            let mut pending = Vec::with_capacity(active.len());
            let mut next = Vec::with_capacity(active.len());
            for mut transition in active {
                match transition.resume() {
                    Ok(TransitionStep::Pending(step)) => {
                        pending.push(step);
                        next.push(transition);
                    }
                    Ok(TransitionStep::Done) => {}
                    Err(err) => {
                        tracing::warn!(%err, "transition failed");
                        first_error.get_or_insert(err);
                    }
                }
            }
            future::join_all(pending).await;
            active = next;
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A named slot.
pub trait Element {
    fn transition(&self, properties: ElementProperties, options: TransitionOptions) -> Transition;

    /// Whether any running transition has a property name accepted by `matcher`.
    fn has_transition(&self, matcher: &dyn Matcher) -> bool;

    /// Completes once every matching transition has settled.
    fn wait(&self, matcher: &dyn Matcher) -> LocalBoxFuture<'static, ()>;

    /// Finish every matching transition now.
    fn snap(&self, matcher: &dyn Matcher);

    /// Set matching numeric properties to `fraction` of the way from `start` to `end`,
    /// both resolved by this slot.
    fn animate(
        &self,
        matcher: &dyn Matcher,
        start: &PropertyValue,
        end: &PropertyValue,
        fraction: f64,
    ) -> StageResult<()>;

    /// Restore matching properties to their own resolved values.
    fn deanimate(&self, matcher: &dyn Matcher) -> StageResult<()>;

    fn destroy(&self);
}

/// Ordered slots of a stage by name.
pub type ElementMap = IndexMap<String, Rc<dyn Element>>;

/// Shared handle on a stage's slots.
pub type ElementRegistry = Rc<RefCell<ElementMap>>;
