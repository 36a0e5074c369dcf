//! Effect slots: named one-shot effects played over overlay layers.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::{self, FutureExt as _, LocalBoxFuture};
use indexmap::IndexMap;

use crate::animation::anim::{Animation, AnimationPlayState, AnimationTiming};
use crate::clock::Clock;
use crate::element::{Element, Transition, TransitionOptions, TransitionProcedure, TransitionStep};
use crate::foundation::error::{StageError, StageResult};
use crate::matcher::Matcher;
use crate::property::element::ElementProperties;
use crate::property::resolved::EffectResolved;
use crate::property::value::PropertyValue;

/// Overlay an effect draws on.
pub trait EffectLayer {
    /// Put the layer on top at full opacity.
    fn show(&self);

    fn set_opacity(&self, opacity: f64);

    fn hide(&self);
}

pub trait Effect {
    /// Prepare resources; the effect is played only after this completes.
    fn load(&self) -> LocalBoxFuture<'static, anyhow::Result<()>>;

    fn play(&self) -> StageResult<()>;

    /// Jump to the end and remove the effect's overlay.
    fn finish(&self);

    fn is_finished(&self) -> bool;

    /// Completes once the effect finishes or is canceled.
    fn finished(&self) -> LocalBoxFuture<'static, ()>;
}

/// Constructs effects by name.
pub trait EffectFactory {
    fn create(
        &self,
        name: &str,
        parameters: &[serde_json::Value],
        clock: Rc<dyn Clock>,
    ) -> StageResult<Rc<dyn Effect>>;
}

/// Effects available on every stage, drawing on layers registered by effect name.
#[derive(Default)]
pub struct BuiltinEffects {
    layers: IndexMap<String, Rc<dyn EffectLayer>>,
}

impl BuiltinEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, effect: impl Into<String>, layer: Rc<dyn EffectLayer>) -> Self {
        self.layers.insert(effect.into(), layer);
        self
    }

    fn layer(&self, name: &str) -> StageResult<Rc<dyn EffectLayer>> {
        self.layers
            .get(name)
            .cloned()
            .ok_or_else(|| StageError::validation(format!("no layer for effect \"{name}\"")))
    }
}

impl EffectFactory for BuiltinEffects {
    fn create(
        &self,
        name: &str,
        parameters: &[serde_json::Value],
        clock: Rc<dyn Clock>,
    ) -> StageResult<Rc<dyn Effect>> {
        match name {
            "cross-fade" => {
                let duration = parameters
                    .first()
                    .and_then(serde_json::Value::as_f64)
                    .ok_or_else(|| {
                        StageError::validation("cross-fade expects a duration in milliseconds")
                    })?;
                Ok(Rc::new(CrossFadeEffect::new(self.layer(name)?, clock, duration)))
            }
            _ => Err(StageError::validation(format!("unsupported effect \"{name}\""))),
        }
    }
}

/// Fades a snapshot layer from opaque to transparent.
pub struct CrossFadeEffect {
    layer: Rc<dyn EffectLayer>,
    clock: Rc<dyn Clock>,
    duration: f64,
    animation: RefCell<Option<Animation>>,
}

impl CrossFadeEffect {
    pub fn new(layer: Rc<dyn EffectLayer>, clock: Rc<dyn Clock>, duration: f64) -> Self {
        Self {
            layer,
            clock,
            duration,
            animation: RefCell::new(None),
        }
    }

    fn animation(&self) -> Option<Animation> {
        self.animation.borrow().clone()
    }
}

impl Effect for CrossFadeEffect {
    fn load(&self) -> LocalBoxFuture<'static, anyhow::Result<()>> {
        future::ready(Ok(())).boxed_local()
    }

    fn play(&self) -> StageResult<()> {
        self.layer.show();
        let layer = Rc::clone(&self.layer);
        let animation = Animation::new(
            Rc::clone(&self.clock),
            AnimationTiming::with_duration(self.duration),
            move |progress, _| layer.set_opacity(1.0 - progress),
            |_, _| {},
        );
        *self.animation.borrow_mut() = Some(animation.clone());
        animation.play()
    }

    fn finish(&self) {
        if let Some(animation) = self.animation() {
            animation.finish_or_cancel();
        }
        self.layer.hide();
    }

    fn is_finished(&self) -> bool {
        self.animation().is_none_or(|animation| {
            !matches!(
                animation.play_state(),
                AnimationPlayState::Running | AnimationPlayState::Paused
            )
        })
    }

    fn finished(&self) -> LocalBoxFuture<'static, ()> {
        match self.animation() {
            Some(animation) => animation.finished_or_canceled(),
            None => future::ready(()).boxed_local(),
        }
    }
}

#[derive(Default)]
struct EffectState {
    properties: Option<ElementProperties>,
    effect: Option<Rc<dyn Effect>>,
}

struct EffectInner {
    name: String,
    factory: Rc<dyn EffectFactory>,
    clock: Rc<dyn Clock>,
    state: RefCell<EffectState>,
}

#[derive(Clone)]
pub struct EffectElement {
    inner: Rc<EffectInner>,
}

impl EffectElement {
    pub fn new(name: impl Into<String>, factory: Rc<dyn EffectFactory>, clock: Rc<dyn Clock>) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                name: name.into(),
                factory,
                clock,
                state: RefCell::new(EffectState::default()),
            }),
        }
    }

    fn playing_effect(&self, matcher: &dyn Matcher) -> Option<Rc<dyn Effect>> {
        if !matcher.matches("playback") {
            return None;
        }
        self.inner
            .state
            .borrow()
            .effect
            .clone()
            .filter(|effect| !effect.is_finished())
    }
}

type Loading = Rc<RefCell<Option<anyhow::Result<()>>>>;

enum EffectPhase {
    Start,
    Store,
    Play { effect: Rc<dyn Effect>, loading: Loading },
    Finished,
}

struct EffectTransition {
    element: EffectElement,
    properties: Option<ElementProperties>,
    phase: EffectPhase,
}

impl EffectTransition {
    fn start(&mut self, properties: &ElementProperties) -> StageResult<TransitionStep> {
        let inner = &self.element.inner;
        if inner.state.borrow().properties.as_ref() == Some(properties) {
            self.phase = EffectPhase::Store;
            return Ok(TransitionStep::ready());
        }
        let resolved = EffectResolved::resolve(properties)?;
        let Some(name) = resolved.name else {
            self.phase = EffectPhase::Store;
            return Ok(TransitionStep::ready());
        };
        let effect = inner
            .factory
            .create(&name, &resolved.parameters, Rc::clone(&inner.clock))?;
        tracing::debug!(element = %inner.name, effect = %name, "loading effect");
        let loading: Loading = Rc::new(RefCell::new(None));
        let result = Rc::clone(&loading);
        let pending = effect
            .load()
            .map(move |loaded| *result.borrow_mut() = Some(loaded))
            .boxed_local();
        self.phase = EffectPhase::Play { effect, loading };
        Ok(TransitionStep::Pending(pending))
    }
}

impl TransitionProcedure for EffectTransition {
    fn resume(&mut self) -> StageResult<TransitionStep> {
        let inner = Rc::clone(&self.element.inner);
        match std::mem::replace(&mut self.phase, EffectPhase::Finished) {
            EffectPhase::Start => {
                let Some(properties) = self.properties.take() else {
                    return Ok(TransitionStep::Done);
                };
                let step = self.start(&properties);
                self.properties = Some(properties);
                step
            }
            EffectPhase::Store => {
                inner.state.borrow_mut().properties = self.properties.take();
                Ok(TransitionStep::Done)
            }
            EffectPhase::Play { effect, loading } => {
                match loading.borrow_mut().take() {
                    None => {
                        return Err(StageError::transition(format!(
                            "{} resumed before its effect finished loading",
                            inner.name
                        )));
                    }
                    Some(Err(err)) => {
                        return Err(StageError::Other(
                            err.context(format!("failed to load effect for {}", inner.name)),
                        ));
                    }
                    Some(Ok(())) => {}
                }
                let old = inner.state.borrow_mut().effect.take();
                if let Some(old) = old {
                    old.finish();
                }
                {
                    let mut state = inner.state.borrow_mut();
                    state.properties = self.properties.take();
                    state.effect = Some(Rc::clone(&effect));
                }
                effect.play()?;
                Ok(TransitionStep::Done)
            }
            EffectPhase::Finished => Ok(TransitionStep::Done),
        }
    }
}

impl Element for EffectElement {
    fn transition(&self, properties: ElementProperties, _options: TransitionOptions) -> Transition {
        Transition::new(EffectTransition {
            element: self.clone(),
            properties: Some(properties),
            phase: EffectPhase::Start,
        })
    }

    fn has_transition(&self, matcher: &dyn Matcher) -> bool {
        self.playing_effect(matcher).is_some()
    }

    fn wait(&self, matcher: &dyn Matcher) -> LocalBoxFuture<'static, ()> {
        match self.playing_effect(matcher) {
            Some(effect) => effect.finished(),
            None => future::ready(()).boxed_local(),
        }
    }

    fn snap(&self, matcher: &dyn Matcher) {
        if !matcher.matches("playback") {
            return;
        }
        let effect = self.inner.state.borrow_mut().effect.take();
        if let Some(effect) = effect {
            effect.finish();
        }
    }

    fn animate(
        &self,
        _matcher: &dyn Matcher,
        _start: &PropertyValue,
        _end: &PropertyValue,
        _fraction: f64,
    ) -> StageResult<()> {
        Ok(())
    }

    fn deanimate(&self, _matcher: &dyn Matcher) -> StageResult<()> {
        Ok(())
    }

    fn destroy(&self) {
        let effect = self.inner.state.borrow_mut().effect.take();
        if let Some(effect) = effect {
            effect.finish();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/element/effect.rs"]
mod tests;
